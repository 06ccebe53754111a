//! Semantic domain events and the notification port.
//!
//! The core emits events at the points the rest of the platform cares
//! about; delivery (email, push) is entirely the notification
//! collaborator's concern. Publishing is fire-and-forget: the core neither
//! retries nor awaits delivery outcomes, and a lost notification never
//! fails the triggering request.

use crate::types::{BookingId, Money, RatingScore, UserId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Events emitted by the scheduling core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A student reserved a slot.
    BookingCreated {
        /// The new booking.
        booking_id: BookingId,
        /// Reserving student.
        student_id: UserId,
        /// Owning tutor.
        tutor_id: UserId,
        /// Frozen price of the session.
        amount: Money,
    },
    /// A confirmed booking was cancelled and its slot released.
    BookingCancelled {
        /// The cancelled booking.
        booking_id: BookingId,
        /// Reserving student.
        student_id: UserId,
        /// Owning tutor.
        tutor_id: UserId,
        /// Caller-supplied cancellation reason.
        reason: Option<String>,
    },
    /// A completed booking received its rating.
    RatingAdded {
        /// The rated booking.
        booking_id: BookingId,
        /// Rating student.
        student_id: UserId,
        /// Rated tutor.
        tutor_id: UserId,
        /// Submitted score.
        score: RatingScore,
    },
}

/// Notification collaborator port.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publish one event. Implementations must not fail the caller; log
    /// and drop on delivery problems.
    async fn publish(&self, event: DomainEvent);
}

/// Notifier that discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn publish(&self, _event: DomainEvent) {}
}
