//! Fixture builders and the service test harness.

#![allow(clippy::expect_used)] // Fixture builders fail loudly on malformed literals

use crate::memory::InMemoryStore;
use crate::mocks::{FixedClock, RecordingNotifier, RecordingPaymentGateway};
use chrono::{NaiveDate, NaiveTime};
use std::sync::Arc;
use tutorlink_core::availability::AvailabilityService;
use tutorlink_core::booking::BookingService;
use tutorlink_core::lifecycle::LifecycleService;
use tutorlink_core::rating::RatingService;
use tutorlink_core::store::TutorStore;
use tutorlink_core::tutor::TutorService;
use tutorlink_core::types::{Actor, Money, Role, TutorProfile, UserId};

/// Parse a `YYYY-MM-DD` literal.
#[must_use]
pub fn date(s: &str) -> NaiveDate {
    s.parse().expect("valid date literal")
}

/// Build a time from hours and minutes.
#[must_use]
pub fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time literal")
}

/// A fresh student actor.
#[must_use]
pub fn student() -> Actor {
    Actor::new(UserId::new(), Role::Student)
}

/// A fresh tutor actor.
#[must_use]
pub fn tutor() -> Actor {
    Actor::new(UserId::new(), Role::Tutor)
}

/// Every service wired over one in-memory store, with recording
/// collaborators and a fixed clock.
pub struct TestHarness {
    /// Shared backing store (direct reads for assertions).
    pub store: Arc<InMemoryStore>,
    /// Records published domain events.
    pub notifier: Arc<RecordingNotifier>,
    /// Records payment hand-offs.
    pub payments: Arc<RecordingPaymentGateway>,
    /// Deterministic clock.
    pub clock: Arc<FixedClock>,
    /// Slot CRUD service.
    pub availability: AvailabilityService,
    /// Booking engine.
    pub bookings: BookingService,
    /// Status state machine.
    pub lifecycle: LifecycleService,
    /// Rating aggregator.
    pub ratings: RatingService,
    /// Tutor profile service.
    pub tutors: TutorService,
}

impl TestHarness {
    /// Wires everything over a fresh store.
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let payments = Arc::new(RecordingPaymentGateway::new());
        let clock = Arc::new(FixedClock::default_instant());

        let availability = AvailabilityService::new(store.clone());
        let bookings = BookingService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            notifier.clone(),
            payments.clone(),
            clock.clone(),
        );
        let lifecycle = LifecycleService::new(store.clone(), notifier.clone());
        let ratings = RatingService::new(store.clone(), store.clone(), notifier.clone());
        let tutors = TutorService::new(store.clone());

        Self {
            store,
            notifier,
            payments,
            clock,
            availability,
            bookings,
            lifecycle,
            ratings,
            tutors,
        }
    }

    /// Seed a tutor profile and return its actor.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory upsert fails (it cannot).
    pub async fn seed_tutor(&self, rate_dollars: u64) -> Actor {
        let actor = tutor();
        let profile = TutorProfile::new(actor.id, Money::from_dollars(rate_dollars));
        self.store
            .upsert(profile)
            .await
            .expect("in-memory upsert cannot fail");
        actor
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
