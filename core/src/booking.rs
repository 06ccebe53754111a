//! Booking engine: reserving a slot, pricing, and booking reads.
//!
//! Creation follows a strict sequence: resolve slot → reject if booked →
//! resolve tutor → price → persist-and-claim atomically. The claim is the
//! at-most-once guarantee for the whole subsystem and is delegated to
//! [`BookingStore::create`]'s conditional-write contract, so no lock is
//! held across the service steps.

use crate::environment::Clock;
use crate::error::{CoreError, Result};
use crate::events::{DomainEvent, Notifier};
use crate::payment::PaymentGateway;
use crate::store::{BookingStore, SlotStore, TutorStore};
use crate::types::{
    Actor, Booking, BookingId, BookingStatus, Money, Role, SlotId, TimeRange, UserId,
};
use std::sync::Arc;

/// Price of a session: the tutor's hourly rate prorated to the window.
///
/// Fractional hours are permitted; the result is frozen onto the booking
/// and never recomputed, even if the tutor's rate later changes.
#[must_use]
pub fn booking_amount(hourly_rate: Money, time: &TimeRange) -> Money {
    hourly_rate.prorate(time.minutes())
}

/// Request payload for creating a booking.
#[derive(Clone, Debug)]
pub struct BookingRequest {
    /// Slot to reserve.
    pub slot_id: SlotId,
    /// Tutor the student expects to own the slot.
    pub tutor_id: UserId,
    /// Subject the student wants help with.
    pub subject: String,
    /// Optional free-form note.
    pub description: Option<String>,
}

/// Orchestrates booking creation and reads.
#[derive(Clone)]
pub struct BookingService {
    slots: Arc<dyn SlotStore>,
    bookings: Arc<dyn BookingStore>,
    tutors: Arc<dyn TutorStore>,
    notifier: Arc<dyn Notifier>,
    payments: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    /// Creates a new `BookingService`.
    #[must_use]
    pub fn new(
        slots: Arc<dyn SlotStore>,
        bookings: Arc<dyn BookingStore>,
        tutors: Arc<dyn TutorStore>,
        notifier: Arc<dyn Notifier>,
        payments: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            slots,
            bookings,
            tutors,
            notifier,
            payments,
            clock,
        }
    }

    /// Reserve a slot for the acting student.
    ///
    /// On success the slot is claimed, the booking is persisted with its
    /// frozen amount, a `booking.created` event is published, and the
    /// amount is handed to the payment collaborator; gateway failure is
    /// logged, never propagated, since the booking stands and payment can
    /// be retried out of band.
    ///
    /// # Errors
    ///
    /// [`CoreError::Forbidden`] unless the actor is a student;
    /// [`CoreError::Validation`] on an empty subject or a slot/tutor
    /// mismatch; [`CoreError::NotFound`] for a missing slot or tutor;
    /// [`CoreError::Conflict`] if the slot is (or becomes) booked.
    #[tracing::instrument(skip(self, request), fields(student_id = %actor.id, slot_id = %request.slot_id))]
    pub async fn create_booking(&self, actor: &Actor, request: BookingRequest) -> Result<Booking> {
        if actor.role != Role::Student {
            return Err(CoreError::forbidden("only students can book sessions"));
        }
        if request.subject.trim().is_empty() {
            return Err(CoreError::validation("subject is required"));
        }

        let slot = self
            .slots
            .get(request.slot_id)
            .await?
            .ok_or_else(|| CoreError::not_found("slot", request.slot_id))?;
        if slot.tutor_id != request.tutor_id {
            return Err(CoreError::validation(
                "slot does not belong to the requested tutor",
            ));
        }
        if slot.is_booked {
            return Err(CoreError::conflict("slot is already booked"));
        }

        let tutor = self
            .tutors
            .get(request.tutor_id)
            .await?
            .ok_or_else(|| CoreError::not_found("tutor", request.tutor_id))?;

        let amount = booking_amount(tutor.hourly_rate, &slot.time);
        let booking = Booking::create(
            BookingId::new(),
            actor.id,
            &slot,
            request.subject,
            request.description,
            amount,
            self.clock.now(),
        );

        // The atomic claim: between the unbooked check above and here,
        // another request may have taken the slot; the conditional write in
        // the store settles the race and surfaces it as Conflict.
        let booking = self.bookings.create(booking).await?;
        tracing::info!(booking_id = %booking.id, amount = %booking.amount, "booking created");

        self.notifier
            .publish(DomainEvent::BookingCreated {
                booking_id: booking.id,
                student_id: booking.student_id,
                tutor_id: booking.tutor_id,
                amount: booking.amount,
            })
            .await;

        if let Err(err) = self
            .payments
            .create_payment_intent(booking.id, booking.amount)
            .await
        {
            tracing::warn!(booking_id = %booking.id, error = %err, "payment hand-off failed");
        }

        Ok(booking)
    }

    /// Fetch a booking visible to the actor.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] if the booking does not exist;
    /// [`CoreError::Forbidden`] unless the actor is its student or tutor.
    pub async fn get_booking(&self, actor: &Actor, id: BookingId) -> Result<Booking> {
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

    /// Bookings scoped to the actor, newest first.
    ///
    /// `role` selects which side of the actor's bookings to list and
    /// defaults to the actor's own role.
    ///
    /// # Errors
    ///
    /// [`CoreError::Storage`] on adapter failure.
    pub async fn list_bookings(
        &self,
        actor: &Actor,
        role: Option<Role>,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>> {
        self.bookings
            .list_for_user(actor.id, role.unwrap_or(actor.role), status)
            .await
    }

    /// Record payment success reported by the payment collaborator.
    ///
    /// Trusted call: the gateway authenticates the collaborator upstream.
    /// Not a lifecycle transition: only the payment flag changes.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] if the booking does not exist.
    #[tracing::instrument(skip(self))]
    pub async fn confirm_payment(&self, id: BookingId) -> Result<Booking> {
        let booking = self.bookings.mark_paid(id).await?;
        tracing::info!(booking_id = %booking.id, "payment confirmed");
        Ok(booking)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn range(start: (u32, u32), end: (u32, u32)) -> TimeRange {
        TimeRange::new(
            chrono::NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            chrono::NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_one_hour_session_costs_the_hourly_rate() {
        let amount = booking_amount(Money::from_dollars(40), &range((9, 0), (10, 0)));
        assert_eq!(amount, Money::from_dollars(40));
    }

    #[test]
    fn test_fractional_hours_prorate() {
        let amount = booking_amount(Money::from_dollars(40), &range((9, 0), (10, 30)));
        assert_eq!(amount, Money::from_dollars(60));

        let quarter = booking_amount(Money::from_dollars(40), &range((9, 0), (9, 15)));
        assert_eq!(quarter, Money::from_dollars(10));
    }
}
