//! Payment collaborator port.
//!
//! After a booking is created the amount and booking id are handed off for
//! payment-intent creation. Capture, refunds, and webhooks live entirely in
//! the collaborator; the core only records the resulting paid flag (see
//! [`crate::booking::BookingService::confirm_payment`]).

use crate::types::{BookingId, Money};
use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a payment gateway.
///
/// Gateway failures are logged by the caller and never roll back the
/// booking that triggered the hand-off.
#[derive(Error, Debug, Clone)]
pub enum PaymentGatewayError {
    /// The gateway rejected the payment request.
    #[error("payment rejected: {0}")]
    Rejected(String),

    /// The gateway could not be reached or timed out.
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),
}

/// Abstraction over payment processors (Stripe and friends).
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent for a freshly created booking.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway rejects the request or is
    /// unreachable.
    async fn create_payment_intent(
        &self,
        booking_id: BookingId,
        amount: Money,
    ) -> Result<(), PaymentGatewayError>;
}
