//! Application state for the TutorLink HTTP server.

use std::sync::Arc;
use tutorlink_core::environment::Clock;
use tutorlink_core::events::Notifier;
use tutorlink_core::payment::PaymentGateway;
use tutorlink_core::store::{BookingStore, SlotStore, TutorStore};
use tutorlink_core::{
    availability::AvailabilityService, booking::BookingService, lifecycle::LifecycleService,
    rating::RatingService, tutor::TutorService,
};

/// Application state shared across all HTTP handlers.
///
/// Holds one instance of each core service; services are cheap to clone
/// (a few `Arc`s), so the state clones per request.
#[derive(Clone)]
pub struct AppState {
    /// Slot CRUD.
    pub availability: AvailabilityService,
    /// Booking engine.
    pub bookings: BookingService,
    /// Status state machine.
    pub lifecycle: LifecycleService,
    /// Rating aggregator.
    pub ratings: RatingService,
    /// Tutor profiles.
    pub tutors: TutorService,
}

impl AppState {
    /// Wire the services over the given ports.
    ///
    /// The production binary passes the `PostgreSQL` adapters; tests pass
    /// the in-memory ones. Everything downstream is identical.
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
            availability: AvailabilityService::new(slots.clone()),
            bookings: BookingService::new(
                slots,
                bookings.clone(),
                tutors.clone(),
                notifier.clone(),
                payments,
                clock,
            ),
            lifecycle: LifecycleService::new(bookings.clone(), notifier.clone()),
            ratings: RatingService::new(bookings, tutors.clone(), notifier),
            tutors: TutorService::new(tutors),
        }
    }
}
