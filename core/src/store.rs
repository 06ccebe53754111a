//! Persistence ports for the scheduling core.
//!
//! These traits are deliberately minimal and carry the concurrency
//! contracts the domain invariants depend on. An adapter that satisfies the
//! documented conditions makes the service layer correct under concurrent
//! requests without any locking above the store:
//!
//! - [`SlotStore::insert`] / [`SlotStore::update`] serialize the overlap
//!   check and the write per (tutor, date): two concurrent writes of
//!   overlapping ranges for the same tutor and day must not both succeed.
//! - [`BookingStore::create`] claims the slot (`is_booked` false → true)
//!   and persists the booking as one atomic unit: of N concurrent creates
//!   against one slot, exactly one succeeds.
//! - [`BookingStore::cancel`] flips the status and releases the slot in one
//!   transaction; a cancelled booking with a still-locked slot is
//!   unrepresentable.
//! - [`TutorStore::update_rating`] is compare-and-set on the prior rating
//!   count so concurrent aggregate updates cannot lose a score.
//!
//! Reads take no locks and may observe slightly stale snapshots.
//!
//! # Implementations
//!
//! - `tutorlink-postgres`: production adapter (advisory locks, conditional
//!   writes, transactions).
//! - `tutorlink-testing`: deterministic in-memory adapter for tests.

use crate::error::Result;
use crate::types::{
    Booking, BookingId, BookingStatus, DateRange, Money, RatingAggregate, RatingScore, Role, Slot,
    SlotId, TutorProfile, UserId,
};
use async_trait::async_trait;

/// Result of a cancellation attempt that did not error.
///
/// Distinguishing a real transition from an idempotent retry lets the
/// caller emit the `booking.cancelled` event exactly once.
#[derive(Clone, Debug, PartialEq)]
pub enum CancelOutcome {
    /// This call performed the `confirmed → cancelled` transition and
    /// released the slot.
    Cancelled(Booking),
    /// The booking was already cancelled; nothing changed.
    AlreadyCancelled(Booking),
}

impl CancelOutcome {
    /// The booking in its post-call state.
    #[must_use]
    pub const fn booking(&self) -> &Booking {
        match self {
            Self::Cancelled(booking) | Self::AlreadyCancelled(booking) => booking,
        }
    }
}

/// Persistence for availability slots.
#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Persist a new slot.
    ///
    /// The overlap check against existing slots for the same (tutor, date)
    /// and the insert must be serialized against concurrent inserts and
    /// updates for that key.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::Conflict`] if the slot overlaps an existing one;
    /// [`crate::CoreError::Storage`] on adapter failure.
    async fn insert(&self, slot: Slot) -> Result<Slot>;

    /// Replace a slot's calendar values.
    ///
    /// Applies only while the stored slot is unbooked, and re-validates
    /// overlap against all *other* slots for the target (tutor, date) under
    /// the same serialization as [`SlotStore::insert`].
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::NotFound`] if the slot is gone;
    /// [`crate::CoreError::InvalidState`] if it is booked;
    /// [`crate::CoreError::Conflict`] on overlap;
    /// [`crate::CoreError::Storage`] on adapter failure.
    async fn update(&self, slot: Slot) -> Result<Slot>;

    /// Permanently remove an unbooked slot.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::NotFound`] if the slot is gone;
    /// [`crate::CoreError::InvalidState`] if it is booked;
    /// [`crate::CoreError::Storage`] on adapter failure.
    async fn delete(&self, id: SlotId) -> Result<()>;

    /// Fetch one slot.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::Storage`] on adapter failure.
    async fn get(&self, id: SlotId) -> Result<Option<Slot>>;

    /// Unbooked slots for a tutor, optionally bounded by date, sorted by
    /// (date, start time) ascending.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::Storage`] on adapter failure.
    async fn list_open(&self, tutor_id: UserId, range: DateRange) -> Result<Vec<Slot>>;
}

/// Persistence for bookings.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Persist a booking, atomically claiming its slot.
    ///
    /// The claim is a conditional write (the slot's `is_booked` flips
    /// false → true only if it is currently false) and the booking insert
    /// commits in the same atomic unit. On a failed claim the adapter
    /// re-reads the slot to report the precise failure.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::NotFound`] if the slot no longer exists;
    /// [`crate::CoreError::Conflict`] if it is already booked;
    /// [`crate::CoreError::Storage`] on adapter failure.
    async fn create(&self, booking: Booking) -> Result<Booking>;

    /// Fetch one booking.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::Storage`] on adapter failure.
    async fn get(&self, id: BookingId) -> Result<Option<Booking>>;

    /// Bookings where `user` participates in the given role, optionally
    /// filtered by status, sorted by creation time descending.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::Storage`] on adapter failure.
    async fn list_for_user(
        &self,
        user: UserId,
        role: Role,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>>;

    /// Transition a confirmed booking to completed, optionally attaching a
    /// meeting link, via a conditional write on the current status.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::NotFound`] if the booking is gone;
    /// [`crate::CoreError::InvalidState`] if it is not confirmed;
    /// [`crate::CoreError::Storage`] on adapter failure.
    async fn complete(&self, id: BookingId, meeting_link: Option<String>) -> Result<Booking>;

    /// Cancel a confirmed booking and release its slot in one transaction.
    ///
    /// Cancelling an already-cancelled booking is a no-op success (the slot
    /// release is re-applied, healing any out-of-band lock).
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::NotFound`] if the booking is gone;
    /// [`crate::CoreError::InvalidState`] if it is completed;
    /// [`crate::CoreError::Storage`] on adapter failure.
    async fn cancel(&self, id: BookingId) -> Result<CancelOutcome>;

    /// Attach a meeting link to a confirmed booking.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::NotFound`] if the booking is gone;
    /// [`crate::CoreError::InvalidState`] if it is not confirmed;
    /// [`crate::CoreError::Storage`] on adapter failure.
    async fn set_meeting_link(&self, id: BookingId, link: String) -> Result<Booking>;

    /// Record the one-and-only rating on a completed booking via a
    /// conditional write (`status = completed AND rating IS NULL`).
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::NotFound`] if the booking is gone;
    /// [`crate::CoreError::InvalidState`] if it is not completed or already
    /// rated; [`crate::CoreError::Storage`] on adapter failure.
    async fn record_rating(
        &self,
        id: BookingId,
        score: RatingScore,
        comment: Option<String>,
    ) -> Result<Booking>;

    /// Flip the payment flag to paid. Idempotent.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::NotFound`] if the booking is gone;
    /// [`crate::CoreError::Storage`] on adapter failure.
    async fn mark_paid(&self, id: BookingId) -> Result<Booking>;
}

/// Persistence for tutor pricing/rating state.
#[async_trait]
pub trait TutorStore: Send + Sync {
    /// Fetch one tutor profile.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::Storage`] on adapter failure.
    async fn get(&self, id: UserId) -> Result<Option<TutorProfile>>;

    /// Insert or replace a profile (registration and fixtures).
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::Storage`] on adapter failure.
    async fn upsert(&self, profile: TutorProfile) -> Result<()>;

    /// Change a tutor's hourly rate. Existing bookings keep their frozen
    /// amounts.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::NotFound`] if the profile is gone;
    /// [`crate::CoreError::Storage`] on adapter failure.
    async fn set_hourly_rate(&self, id: UserId, rate: Money) -> Result<TutorProfile>;

    /// Compare-and-set the rating aggregate: applies `rating` only if the
    /// stored count still equals `expected_count`, returning whether the
    /// write took effect.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::NotFound`] if the profile is gone;
    /// [`crate::CoreError::Storage`] on adapter failure.
    async fn update_rating(
        &self,
        id: UserId,
        expected_count: u32,
        rating: RatingAggregate,
    ) -> Result<bool>;
}
