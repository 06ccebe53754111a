//! `PostgreSQL`-backed tutor profile store.

use crate::{cents_from_db, cents_to_db};
use async_trait::async_trait;
use sqlx::PgPool;
use tutorlink_core::error::{CoreError, Result};
use tutorlink_core::store::TutorStore;
use tutorlink_core::types::{Money, RatingAggregate, TutorProfile, UserId};
use uuid::Uuid;

type TutorRow = (Uuid, i64, f64, i32);

fn profile_from_row(row: TutorRow) -> Result<TutorProfile> {
    let (id, rate_cents, average, count) = row;
    let count = u32::try_from(count)
        .map_err(|_| CoreError::storage(format!("negative rating count for tutor {id}")))?;
    Ok(TutorProfile {
        id: UserId::from_uuid(id),
        hourly_rate: Money::from_cents(cents_from_db(rate_cents)?),
        rating: RatingAggregate::from_parts(average, count),
    })
}

/// `PostgreSQL` implementation of [`TutorStore`].
#[derive(Clone)]
pub struct PostgresTutorStore {
    pool: PgPool,
}

impl PostgresTutorStore {
    /// Creates a new `PostgresTutorStore`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TutorStore for PostgresTutorStore {
    async fn get(&self, id: UserId) -> Result<Option<TutorProfile>> {
        let row: Option<TutorRow> = sqlx::query_as(
            "SELECT id, hourly_rate_cents, average_rating, total_ratings
             FROM tutors WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::storage(format!("failed to fetch tutor: {e}")))?;
        row.map(profile_from_row).transpose()
    }

    async fn upsert(&self, profile: TutorProfile) -> Result<()> {
        sqlx::query(
            "INSERT INTO tutors (id, hourly_rate_cents, average_rating, total_ratings)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (id) DO UPDATE
             SET hourly_rate_cents = EXCLUDED.hourly_rate_cents,
                 average_rating = EXCLUDED.average_rating,
                 total_ratings = EXCLUDED.total_ratings",
        )
        .bind(profile.id.as_uuid())
        .bind(cents_to_db(profile.hourly_rate.cents())?)
        .bind(profile.rating.average)
        .bind(i32::try_from(profile.rating.count).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::storage(format!("failed to upsert tutor: {e}")))?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn set_hourly_rate(&self, id: UserId, rate: Money) -> Result<TutorProfile> {
        let row: Option<TutorRow> = sqlx::query_as(
            "UPDATE tutors SET hourly_rate_cents = $2
             WHERE id = $1
             RETURNING id, hourly_rate_cents, average_rating, total_ratings",
        )
        .bind(id.as_uuid())
        .bind(cents_to_db(rate.cents())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::storage(format!("failed to update rate: {e}")))?;

        row.map(profile_from_row)
            .transpose()?
            .ok_or_else(|| CoreError::not_found("tutor", id))
    }

    #[tracing::instrument(skip(self, rating))]
    async fn update_rating(
        &self,
        id: UserId,
        expected_count: u32,
        rating: RatingAggregate,
    ) -> Result<bool> {
        let updated = sqlx::query(
            "UPDATE tutors SET average_rating = $3, total_ratings = $4
             WHERE id = $1 AND total_ratings = $2",
        )
        .bind(id.as_uuid())
        .bind(i32::try_from(expected_count).unwrap_or(i32::MAX))
        .bind(rating.average)
        .bind(i32::try_from(rating.count).unwrap_or(i32::MAX))
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::storage(format!("failed to update rating aggregate: {e}")))?
        .rows_affected();

        if updated == 1 {
            return Ok(true);
        }

        // Lost the compare-and-set, or the tutor is gone; tell them apart.
        let exists: Option<(i32,)> = sqlx::query_as("SELECT total_ratings FROM tutors WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoreError::storage(format!("failed to re-read tutor: {e}")))?;
        match exists {
            None => Err(CoreError::not_found("tutor", id)),
            Some(_) => Ok(false),
        }
    }
}
