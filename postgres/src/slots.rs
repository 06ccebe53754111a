//! `PostgreSQL`-backed slot store.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::{PgPool, Postgres, Transaction};
use std::hash::{Hash, Hasher};
use tutorlink_core::availability::ensure_no_overlap;
use tutorlink_core::error::{CoreError, Result};
use tutorlink_core::store::SlotStore;
use tutorlink_core::types::{DateRange, Slot, SlotId, TimeRange, UserId};
use uuid::Uuid;

type SlotRow = (Uuid, Uuid, NaiveDate, NaiveTime, NaiveTime, bool);

pub(crate) fn slot_from_row(row: SlotRow) -> Result<Slot> {
    let (id, tutor_id, date, start, end, is_booked) = row;
    let time = TimeRange::new(start, end)
        .map_err(|e| CoreError::storage(format!("corrupt slot row {id}: {e}")))?;
    let mut slot = Slot::new(
        SlotId::from_uuid(id),
        UserId::from_uuid(tutor_id),
        date,
        time,
    );
    slot.is_booked = is_booked;
    Ok(slot)
}

/// Advisory-lock key for one tutor's calendar day.
///
/// `DefaultHasher` uses fixed keys, so the value is stable across
/// processes sharing the database.
fn tutor_day_key(tutor_id: UserId, date: NaiveDate) -> i64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    tutor_id.as_uuid().hash(&mut hasher);
    date.hash(&mut hasher);
    #[allow(clippy::cast_possible_wrap)]
    let key = hasher.finish() as i64;
    key
}

/// `PostgreSQL` implementation of [`SlotStore`].
#[derive(Clone)]
pub struct PostgresSlotStore {
    pool: PgPool,
}

impl PostgresSlotStore {
    /// Creates a new `PostgresSlotStore`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Take the per-(tutor, date) advisory lock for the open transaction
    /// and load that day's slots for the overlap check.
    async fn lock_day(
        tx: &mut Transaction<'_, Postgres>,
        tutor_id: UserId,
        date: NaiveDate,
    ) -> Result<Vec<Slot>> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(tutor_day_key(tutor_id, date))
            .execute(&mut **tx)
            .await
            .map_err(|e| CoreError::storage(format!("failed to take day lock: {e}")))?;

        let rows: Vec<SlotRow> = sqlx::query_as(
            "SELECT id, tutor_id, slot_date, start_time, end_time, is_booked
             FROM slots
             WHERE tutor_id = $1 AND slot_date = $2",
        )
        .bind(tutor_id.as_uuid())
        .bind(date)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| CoreError::storage(format!("failed to load day slots: {e}")))?;

        rows.into_iter().map(slot_from_row).collect()
    }
}

#[async_trait]
impl SlotStore for PostgresSlotStore {
    #[tracing::instrument(skip(self), fields(slot_id = %slot.id, tutor_id = %slot.tutor_id))]
    async fn insert(&self, slot: Slot) -> Result<Slot> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CoreError::storage(format!("failed to begin transaction: {e}")))?;

        let existing = Self::lock_day(&mut tx, slot.tutor_id, slot.date).await?;
        ensure_no_overlap(&slot, existing.iter())?;

        sqlx::query(
            "INSERT INTO slots (id, tutor_id, slot_date, start_time, end_time, is_booked)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(slot.id.as_uuid())
        .bind(slot.tutor_id.as_uuid())
        .bind(slot.date)
        .bind(slot.time.start())
        .bind(slot.time.end())
        .bind(slot.is_booked)
        .execute(&mut *tx)
        .await
        .map_err(|e| CoreError::storage(format!("failed to insert slot: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| CoreError::storage(format!("failed to commit slot insert: {e}")))?;
        Ok(slot)
    }

    #[tracing::instrument(skip(self), fields(slot_id = %slot.id))]
    async fn update(&self, slot: Slot) -> Result<Slot> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CoreError::storage(format!("failed to begin transaction: {e}")))?;

        // Serialize against writers targeting the slot's (possibly new) day.
        let neighbors = Self::lock_day(&mut tx, slot.tutor_id, slot.date).await?;
        ensure_no_overlap(&slot, neighbors.iter())?;

        let updated = sqlx::query(
            "UPDATE slots
             SET slot_date = $2, start_time = $3, end_time = $4
             WHERE id = $1 AND is_booked = FALSE",
        )
        .bind(slot.id.as_uuid())
        .bind(slot.date)
        .bind(slot.time.start())
        .bind(slot.time.end())
        .execute(&mut *tx)
        .await
        .map_err(|e| CoreError::storage(format!("failed to update slot: {e}")))?
        .rows_affected();

        if updated == 0 {
            let row: Option<(bool,)> = sqlx::query_as("SELECT is_booked FROM slots WHERE id = $1")
                .bind(slot.id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| CoreError::storage(format!("failed to re-read slot: {e}")))?;
            return match row {
                None => Err(CoreError::not_found("slot", slot.id)),
                Some(_) => Err(CoreError::invalid_state(
                    "booked slots cannot be edited until released",
                )),
            };
        }

        tx.commit()
            .await
            .map_err(|e| CoreError::storage(format!("failed to commit slot update: {e}")))?;
        Ok(slot)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: SlotId) -> Result<()> {
        let deleted = sqlx::query("DELETE FROM slots WHERE id = $1 AND is_booked = FALSE")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::storage(format!("failed to delete slot: {e}")))?
            .rows_affected();

        if deleted == 1 {
            return Ok(());
        }

        let row: Option<(bool,)> = sqlx::query_as("SELECT is_booked FROM slots WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoreError::storage(format!("failed to re-read slot: {e}")))?;
        match row {
            None => Err(CoreError::not_found("slot", id)),
            Some(_) => Err(CoreError::invalid_state(
                "booked slots cannot be deleted until released",
            )),
        }
    }

    async fn get(&self, id: SlotId) -> Result<Option<Slot>> {
        let row: Option<SlotRow> = sqlx::query_as(
            "SELECT id, tutor_id, slot_date, start_time, end_time, is_booked
             FROM slots WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::storage(format!("failed to fetch slot: {e}")))?;

        row.map(slot_from_row).transpose()
    }

    async fn list_open(&self, tutor_id: UserId, range: DateRange) -> Result<Vec<Slot>> {
        let rows: Vec<SlotRow> = sqlx::query_as(
            "SELECT id, tutor_id, slot_date, start_time, end_time, is_booked
             FROM slots
             WHERE tutor_id = $1
               AND is_booked = FALSE
               AND ($2::date IS NULL OR slot_date >= $2)
               AND ($3::date IS NULL OR slot_date <= $3)
             ORDER BY slot_date ASC, start_time ASC",
        )
        .bind(tutor_id.as_uuid())
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CoreError::storage(format!("failed to list slots: {e}")))?;

        rows.into_iter().map(slot_from_row).collect()
    }
}
