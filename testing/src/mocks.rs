//! Recording collaborator doubles and a fixed clock.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex;
use tutorlink_core::environment::Clock;
use tutorlink_core::events::{DomainEvent, Notifier};
use tutorlink_core::payment::{PaymentGateway, PaymentGatewayError};
use tutorlink_core::types::{BookingId, Money};

/// Notifier that records every published event for assertions.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far, in order.
    pub async fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, event: DomainEvent) {
        self.events.lock().await.push(event);
    }
}

/// Payment gateway that records hand-offs and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingPaymentGateway {
    intents: Mutex<Vec<(BookingId, Money)>>,
    failing: Mutex<bool>,
}

impl RecordingPaymentGateway {
    /// Creates a gateway that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent hand-offs fail (or succeed again).
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.lock().await = failing;
    }

    /// Snapshot of the recorded (booking, amount) hand-offs.
    pub async fn intents(&self) -> Vec<(BookingId, Money)> {
        self.intents.lock().await.clone()
    }
}

#[async_trait]
impl PaymentGateway for RecordingPaymentGateway {
    async fn create_payment_intent(
        &self,
        booking_id: BookingId,
        amount: Money,
    ) -> Result<(), PaymentGatewayError> {
        if *self.failing.lock().await {
            return Err(PaymentGatewayError::Unavailable(
                "gateway configured to fail".to_string(),
            ));
        }
        self.intents.lock().await.push((booking_id, amount));
        Ok(())
    }
}

/// Clock pinned to a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    now: StdMutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Creates a clock pinned to `now`.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: StdMutex::new(now),
        }
    }

    /// Creates a clock pinned to an arbitrary but stable instant.
    #[must_use]
    pub fn default_instant() -> Self {
        Self::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0)
                .single()
                .map_or_else(Utc::now, |dt| dt),
        )
    }

    /// Advance the pinned instant.
    pub fn advance(&self, delta: Duration) {
        let mut now = self
            .now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *now += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self
            .now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
