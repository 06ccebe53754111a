//! Tutor profile reads and rate management.
//!
//! Registration and the rest of profile editing belong to the out-of-scope
//! account system; the scheduling core only needs the hourly rate (for
//! pricing) and the rating aggregate (for display), so those are the only
//! operations exposed here.

use crate::error::{CoreError, Result};
use crate::store::TutorStore;
use crate::types::{Actor, Money, Role, TutorProfile, UserId};
use std::sync::Arc;

/// Orchestrates tutor profile access.
#[derive(Clone)]
pub struct TutorService {
    tutors: Arc<dyn TutorStore>,
}

impl TutorService {
    /// Creates a new `TutorService`.
    #[must_use]
    pub fn new(tutors: Arc<dyn TutorStore>) -> Self {
        Self { tutors }
    }

    /// Fetch a tutor's pricing/rating profile.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] if no such tutor exists.
    pub async fn get_profile(&self, id: UserId) -> Result<TutorProfile> {
        self.tutors
            .get(id)
            .await?
            .ok_or_else(|| CoreError::not_found("tutor", id))
    }

    /// Change the acting tutor's hourly rate.
    ///
    /// Amounts on existing bookings are frozen and unaffected.
    ///
    /// # Errors
    ///
    /// [`CoreError::Forbidden`] unless the actor is a tutor changing their
    /// own rate; [`CoreError::Validation`] if the rate is zero;
    /// [`CoreError::NotFound`] if the profile does not exist.
    #[tracing::instrument(skip(self), fields(tutor_id = %actor.id))]
    pub async fn set_hourly_rate(&self, actor: &Actor, rate: Money) -> Result<TutorProfile> {
        if actor.role != Role::Tutor {
            return Err(CoreError::forbidden("only tutors have an hourly rate"));
        }
        if rate.is_zero() {
            return Err(CoreError::validation("hourly rate must be positive"));
        }
        let profile = self.tutors.set_hourly_rate(actor.id, rate).await?;
        tracing::info!(rate = %profile.hourly_rate, "hourly rate updated");
        Ok(profile)
    }
}
