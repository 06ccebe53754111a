//! `PostgreSQL`-backed booking store.
//!
//! Booking creation and cancellation are the two multi-row writes in the
//! system; both run in a single transaction so the slot flag and the
//! booking row can never disagree.

use crate::{cents_from_db, cents_to_db};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tutorlink_core::error::{CoreError, Result};
use tutorlink_core::store::{BookingStore, CancelOutcome};
use tutorlink_core::types::{
    Booking, BookingId, BookingStatus, Money, PaymentStatus, RatingScore, Role, SlotId, TimeRange,
    UserId,
};
use uuid::Uuid;

type BookingRow = (
    Uuid,                 // id
    Uuid,                 // student_id
    Uuid,                 // tutor_id
    Uuid,                 // slot_id
    NaiveDate,            // session_date
    NaiveTime,            // start_time
    NaiveTime,            // end_time
    String,               // subject
    Option<String>,       // description
    i64,                  // amount_cents
    String,               // status
    String,               // payment_status
    Option<String>,       // meeting_link
    Option<i16>,          // rating
    Option<String>,       // rating_comment
    DateTime<Utc>,        // created_at
);

const BOOKING_COLUMNS: &str = "id, student_id, tutor_id, slot_id, session_date, start_time, \
     end_time, subject, description, amount_cents, status, payment_status, meeting_link, \
     rating, rating_comment, created_at";

fn booking_from_row(row: BookingRow) -> Result<Booking> {
    let (
        id,
        student_id,
        tutor_id,
        slot_id,
        date,
        start,
        end,
        subject,
        description,
        amount_cents,
        status,
        payment_status,
        meeting_link,
        rating,
        rating_comment,
        created_at,
    ) = row;

    let time = TimeRange::new(start, end)
        .map_err(|e| CoreError::storage(format!("corrupt booking row {id}: {e}")))?;
    let rating = rating
        .map(|score| {
            u8::try_from(score)
                .map_err(|_| CoreError::storage(format!("corrupt rating in booking {id}")))
                .and_then(RatingScore::try_new)
        })
        .transpose()?;

    Ok(Booking {
        id: BookingId::from_uuid(id),
        student_id: UserId::from_uuid(student_id),
        tutor_id: UserId::from_uuid(tutor_id),
        slot_id: SlotId::from_uuid(slot_id),
        date,
        time,
        subject,
        description,
        amount: Money::from_cents(cents_from_db(amount_cents)?),
        status: BookingStatus::parse(&status)?,
        payment_status: PaymentStatus::parse(&payment_status)?,
        meeting_link,
        rating,
        rating_comment,
        created_at,
    })
}

/// `PostgreSQL` implementation of [`BookingStore`].
#[derive(Clone)]
pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    /// Creates a new `PostgresBookingStore`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: BookingId) -> Result<Option<Booking>> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| CoreError::storage(format!("failed to fetch booking: {e}")))?;
        row.map(booking_from_row).transpose()
    }

    async fn fetch_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: BookingId,
    ) -> Result<Option<Booking>> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| CoreError::storage(format!("failed to fetch booking: {e}")))?;
        row.map(booking_from_row).transpose()
    }

    /// Fetch after a conditional write reported one affected row.
    async fn fetch_required(&self, id: BookingId) -> Result<Booking> {
        self.fetch(id)
            .await?
            .ok_or_else(|| CoreError::storage(format!("booking {id} vanished after update")))
    }
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    #[tracing::instrument(skip(self, booking), fields(booking_id = %booking.id, slot_id = %booking.slot_id))]
    async fn create(&self, booking: Booking) -> Result<Booking> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CoreError::storage(format!("failed to begin transaction: {e}")))?;

        // The claim: succeed iff exactly one row flips false -> true.
        let claimed = sqlx::query("UPDATE slots SET is_booked = TRUE WHERE id = $1 AND is_booked = FALSE")
            .bind(booking.slot_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| CoreError::storage(format!("failed to claim slot: {e}")))?
            .rows_affected();

        if claimed == 0 {
            // One re-read to classify the race before surfacing it.
            let row: Option<(bool,)> = sqlx::query_as("SELECT is_booked FROM slots WHERE id = $1")
                .bind(booking.slot_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| CoreError::storage(format!("failed to re-read slot: {e}")))?;
            return match row {
                None => Err(CoreError::not_found("slot", booking.slot_id)),
                Some(_) => Err(CoreError::conflict("slot is already booked")),
            };
        }

        sqlx::query(
            "INSERT INTO bookings (id, student_id, tutor_id, slot_id, session_date, start_time, \
             end_time, subject, description, amount_cents, status, payment_status, meeting_link, \
             rating, rating_comment, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
        )
        .bind(booking.id.as_uuid())
        .bind(booking.student_id.as_uuid())
        .bind(booking.tutor_id.as_uuid())
        .bind(booking.slot_id.as_uuid())
        .bind(booking.date)
        .bind(booking.time.start())
        .bind(booking.time.end())
        .bind(&booking.subject)
        .bind(&booking.description)
        .bind(cents_to_db(booking.amount.cents())?)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(&booking.meeting_link)
        .bind(booking.rating.map(|score| i16::from(score.value())))
        .bind(&booking.rating_comment)
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| CoreError::storage(format!("failed to insert booking: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| CoreError::storage(format!("failed to commit booking: {e}")))?;
        Ok(booking)
    }

    async fn get(&self, id: BookingId) -> Result<Option<Booking>> {
        self.fetch(id).await
    }

    async fn list_for_user(
        &self,
        user: UserId,
        role: Role,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>> {
        let scope_column = match role {
            Role::Student => "student_id",
            Role::Tutor => "tutor_id",
        };
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings
             WHERE {scope_column} = $1 AND ($2::text IS NULL OR status = $2)
             ORDER BY created_at DESC"
        ))
        .bind(user.as_uuid())
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CoreError::storage(format!("failed to list bookings: {e}")))?;

        rows.into_iter().map(booking_from_row).collect()
    }

    #[tracing::instrument(skip(self, meeting_link))]
    async fn complete(&self, id: BookingId, meeting_link: Option<String>) -> Result<Booking> {
        let updated = sqlx::query(
            "UPDATE bookings
             SET status = 'completed', meeting_link = COALESCE($2, meeting_link)
             WHERE id = $1 AND status = 'confirmed'",
        )
        .bind(id.as_uuid())
        .bind(meeting_link)
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::storage(format!("failed to complete booking: {e}")))?
        .rows_affected();

        if updated == 1 {
            return self.fetch_required(id).await;
        }
        match self.fetch(id).await? {
            None => Err(CoreError::not_found("booking", id)),
            Some(booking) => Err(CoreError::invalid_state(format!(
                "cannot complete a {} booking",
                booking.status
            ))),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn cancel(&self, id: BookingId) -> Result<CancelOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| CoreError::storage(format!("failed to begin transaction: {e}")))?;

        // Guarded flip; RETURNING tells us which slot to release.
        let flipped: Option<(Uuid,)> = sqlx::query_as(
            "UPDATE bookings SET status = 'cancelled'
             WHERE id = $1 AND status = 'confirmed'
             RETURNING slot_id",
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| CoreError::storage(format!("failed to cancel booking: {e}")))?;

        if let Some((slot_id,)) = flipped {
            sqlx::query("UPDATE slots SET is_booked = FALSE WHERE id = $1")
                .bind(slot_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| CoreError::storage(format!("failed to release slot: {e}")))?;

            let booking = Self::fetch_in_tx(&mut tx, id)
                .await?
                .ok_or_else(|| CoreError::storage(format!("booking {id} vanished mid-cancel")))?;
            tx.commit()
                .await
                .map_err(|e| CoreError::storage(format!("failed to commit cancel: {e}")))?;
            return Ok(CancelOutcome::Cancelled(booking));
        }

        // Nothing flipped: missing, terminal, or an idempotent retry.
        let booking = Self::fetch_in_tx(&mut tx, id)
            .await?
            .ok_or_else(|| CoreError::not_found("booking", id))?;
        match booking.status {
            BookingStatus::Completed => Err(CoreError::invalid_state(
                "completed bookings cannot be cancelled",
            )),
            BookingStatus::Cancelled => {
                // Re-apply the release so a retry also heals a slot left
                // locked by outside interference.
                sqlx::query("UPDATE slots SET is_booked = FALSE WHERE id = $1")
                    .bind(booking.slot_id.as_uuid())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| CoreError::storage(format!("failed to release slot: {e}")))?;
                tx.commit()
                    .await
                    .map_err(|e| CoreError::storage(format!("failed to commit cancel: {e}")))?;
                Ok(CancelOutcome::AlreadyCancelled(booking))
            }
            BookingStatus::Confirmed => Err(CoreError::storage(format!(
                "booking {id} reported confirmed after a failed cancel flip"
            ))),
        }
    }

    async fn set_meeting_link(&self, id: BookingId, link: String) -> Result<Booking> {
        let updated = sqlx::query(
            "UPDATE bookings SET meeting_link = $2 WHERE id = $1 AND status = 'confirmed'",
        )
        .bind(id.as_uuid())
        .bind(link)
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::storage(format!("failed to set meeting link: {e}")))?
        .rows_affected();

        if updated == 1 {
            return self.fetch_required(id).await;
        }
        match self.fetch(id).await? {
            None => Err(CoreError::not_found("booking", id)),
            Some(_) => Err(CoreError::invalid_state(
                "meeting links can only be set on confirmed bookings",
            )),
        }
    }

    #[tracing::instrument(skip(self, comment))]
    async fn record_rating(
        &self,
        id: BookingId,
        score: RatingScore,
        comment: Option<String>,
    ) -> Result<Booking> {
        let updated = sqlx::query(
            "UPDATE bookings SET rating = $2, rating_comment = $3
             WHERE id = $1 AND status = 'completed' AND rating IS NULL",
        )
        .bind(id.as_uuid())
        .bind(i16::from(score.value()))
        .bind(comment)
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::storage(format!("failed to record rating: {e}")))?
        .rows_affected();

        if updated == 1 {
            return self.fetch_required(id).await;
        }
        match self.fetch(id).await? {
            None => Err(CoreError::not_found("booking", id)),
            Some(booking) if booking.rating.is_some() => {
                Err(CoreError::invalid_state("booking is already rated"))
            }
            Some(_) => Err(CoreError::invalid_state(
                "only completed bookings can be rated",
            )),
        }
    }

    async fn mark_paid(&self, id: BookingId) -> Result<Booking> {
        let updated = sqlx::query("UPDATE bookings SET payment_status = 'paid' WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::storage(format!("failed to mark booking paid: {e}")))?
            .rows_affected();

        if updated == 0 {
            return Err(CoreError::not_found("booking", id));
        }
        self.fetch_required(id).await
    }
}
