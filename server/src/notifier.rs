//! Tracing-backed notification collaborator.
//!
//! Stands in for the email/push pipeline: every semantic event is logged
//! as a structured record. Delivery is fire-and-forget by contract, so
//! swapping in a real transport later cannot change core behavior.

use async_trait::async_trait;
use tutorlink_core::events::{DomainEvent, Notifier};

/// Notifier that emits each event as a structured log line.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    /// Creates a new `TracingNotifier`.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for TracingNotifier {
    async fn publish(&self, event: DomainEvent) {
        match &event {
            DomainEvent::BookingCreated {
                booking_id,
                student_id,
                tutor_id,
                amount,
            } => tracing::info!(
                %booking_id, %student_id, %tutor_id, %amount,
                "event: booking.created"
            ),
            DomainEvent::BookingCancelled {
                booking_id,
                student_id,
                tutor_id,
                reason,
            } => tracing::info!(
                %booking_id, %student_id, %tutor_id,
                reason = reason.as_deref().unwrap_or("-"),
                "event: booking.cancelled"
            ),
            DomainEvent::RatingAdded {
                booking_id,
                student_id,
                tutor_id,
                score,
            } => tracing::info!(
                %booking_id, %student_id, %tutor_id, %score,
                "event: rating.added"
            ),
        }
    }
}
