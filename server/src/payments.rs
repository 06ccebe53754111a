//! Logging payment gateway stub.
//!
//! Stands in for the real payment processor integration: the hand-off is
//! logged and always accepted. Payment success flows back through
//! `POST /api/bookings/:id/payment-confirmation`.

use async_trait::async_trait;
use tutorlink_core::payment::{PaymentGateway, PaymentGatewayError};
use tutorlink_core::types::{BookingId, Money};

/// Payment gateway that logs every intent and always succeeds.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingPaymentGateway;

impl LoggingPaymentGateway {
    /// Creates a new `LoggingPaymentGateway`.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentGateway for LoggingPaymentGateway {
    async fn create_payment_intent(
        &self,
        booking_id: BookingId,
        amount: Money,
    ) -> Result<(), PaymentGatewayError> {
        tracing::info!(%booking_id, %amount, "payment intent requested");
        Ok(())
    }
}
