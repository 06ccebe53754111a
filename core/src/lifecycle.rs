//! Booking lifecycle state machine.
//!
//! `confirmed` is the only non-terminal status; it may move to `completed`
//! or `cancelled` and nothing leaves a terminal status. The transition rule
//! is a pure function; the stores enforce the same rule with conditional
//! writes so a raced request cannot slip through between check and write.

use crate::error::{CoreError, Result};
use crate::events::{DomainEvent, Notifier};
use crate::store::{BookingStore, CancelOutcome};
use crate::types::{Actor, Booking, BookingId, BookingStatus};
use std::sync::Arc;

/// Validates a requested status transition.
///
/// # Errors
///
/// Returns [`CoreError::InvalidState`] unless the transition is
/// `confirmed → completed` or `confirmed → cancelled`.
pub fn ensure_transition(current: BookingStatus, target: BookingStatus) -> Result<()> {
    let allowed = current == BookingStatus::Confirmed
        && matches!(target, BookingStatus::Completed | BookingStatus::Cancelled);
    if allowed {
        Ok(())
    } else {
        Err(CoreError::invalid_state(format!(
            "cannot transition booking from {current} to {target}"
        )))
    }
}

/// Orchestrates booking status changes.
#[derive(Clone)]
pub struct LifecycleService {
    bookings: Arc<dyn BookingStore>,
    notifier: Arc<dyn Notifier>,
}

impl LifecycleService {
    /// Creates a new `LifecycleService`.
    #[must_use]
    pub fn new(bookings: Arc<dyn BookingStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { bookings, notifier }
    }

    /// Move a booking to `target`, optionally attaching a meeting link.
    ///
    /// A `cancelled` target routes through [`LifecycleService::cancel`] so
    /// the slot release and idempotence rules apply.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] if the booking does not exist;
    /// [`CoreError::Forbidden`] unless the actor participates in it;
    /// [`CoreError::InvalidState`] for any transition the state machine
    /// rejects.
    #[tracing::instrument(skip(self), fields(actor_id = %actor.id, booking_id = %id))]
    pub async fn update_status(
        &self,
        actor: &Actor,
        id: BookingId,
        target: BookingStatus,
        meeting_link: Option<String>,
    ) -> Result<Booking> {
        if target == BookingStatus::Cancelled {
            return self.cancel(actor, id, None).await;
        }

        let booking = self.fetch_involving(actor, id).await?;
        ensure_transition(booking.status, target)?;

        let updated = self.bookings.complete(id, meeting_link).await?;
        tracing::info!(status = %updated.status, "booking status updated");
        Ok(updated)
    }

    /// Attach a meeting link to a confirmed booking without changing status.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] if the booking does not exist;
    /// [`CoreError::Forbidden`] unless the actor participates in it;
    /// [`CoreError::InvalidState`] if the booking is not confirmed.
    pub async fn set_meeting_link(
        &self,
        actor: &Actor,
        id: BookingId,
        link: String,
    ) -> Result<Booking> {
        let booking = self.fetch_involving(actor, id).await?;
        if booking.status != BookingStatus::Confirmed {
            return Err(CoreError::invalid_state(
                "meeting links can only be set on confirmed bookings",
            ));
        }
        self.bookings.set_meeting_link(id, link).await
    }

    /// Cancel a booking, releasing its slot for re-booking.
    ///
    /// The status flip and the slot release commit as one atomic unit in
    /// the store. Cancelling an already-cancelled booking is a no-op
    /// success so client retries are harmless; only a real transition
    /// publishes `booking.cancelled`.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] if the booking does not exist;
    /// [`CoreError::Forbidden`] unless the actor participates in it;
    /// [`CoreError::InvalidState`] if the booking is completed.
    #[tracing::instrument(skip(self, reason), fields(actor_id = %actor.id, booking_id = %id))]
    pub async fn cancel(
        &self,
        actor: &Actor,
        id: BookingId,
        reason: Option<String>,
    ) -> Result<Booking> {
        let booking = self.fetch_involving(actor, id).await?;
        match booking.status {
            BookingStatus::Cancelled => return Ok(booking),
            BookingStatus::Completed => {
                return Err(CoreError::invalid_state(
                    "completed bookings cannot be cancelled",
                ));
            }
            BookingStatus::Confirmed => {}
        }

        match self.bookings.cancel(id).await? {
            CancelOutcome::Cancelled(cancelled) => {
                tracing::info!(slot_id = %cancelled.slot_id, "booking cancelled, slot released");
                self.notifier
                    .publish(DomainEvent::BookingCancelled {
                        booking_id: cancelled.id,
                        student_id: cancelled.student_id,
                        tutor_id: cancelled.tutor_id,
                        reason,
                    })
                    .await;
                Ok(cancelled)
            }
            // Lost a cancel/cancel race; the winner already published.
            CancelOutcome::AlreadyCancelled(cancelled) => Ok(cancelled),
        }
    }

    async fn fetch_involving(&self, actor: &Actor, id: BookingId) -> Result<Booking> {
        let booking = self
            .bookings
            .get(id)
            .await?
            .ok_or_else(|| CoreError::not_found("booking", id))?;
        if !booking.involves(actor.id) {
            return Err(CoreError::forbidden(
                "booking belongs to a different student and tutor",
            ));
        }
        Ok(booking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmed_reaches_both_terminals() {
        assert!(ensure_transition(BookingStatus::Confirmed, BookingStatus::Completed).is_ok());
        assert!(ensure_transition(BookingStatus::Confirmed, BookingStatus::Cancelled).is_ok());
    }

    #[test]
    fn test_terminal_states_are_sealed() {
        for terminal in [BookingStatus::Completed, BookingStatus::Cancelled] {
            for target in [
                BookingStatus::Confirmed,
                BookingStatus::Completed,
                BookingStatus::Cancelled,
            ] {
                assert!(ensure_transition(terminal, target).is_err());
            }
        }
    }

    #[test]
    fn test_no_self_transition_on_confirmed() {
        assert!(ensure_transition(BookingStatus::Confirmed, BookingStatus::Confirmed).is_err());
    }
}
