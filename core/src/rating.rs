//! Rating aggregation for completed bookings.
//!
//! A student may rate a completed booking exactly once; the score folds
//! into the tutor's running average incrementally (never by re-scanning
//! history). The booking-side write is conditional, the tutor-side
//! aggregate update is compare-and-set with a small bounded retry.

use crate::error::{CoreError, Result};
use crate::events::{DomainEvent, Notifier};
use crate::store::{BookingStore, TutorStore};
use crate::types::{Actor, Booking, BookingId, BookingStatus, RatingScore};
use std::sync::Arc;

/// Attempts at the compare-and-set aggregate update before giving up.
const MAX_AGGREGATE_RETRIES: u32 = 3;

/// Orchestrates rating submission.
#[derive(Clone)]
pub struct RatingService {
    bookings: Arc<dyn BookingStore>,
    tutors: Arc<dyn TutorStore>,
    notifier: Arc<dyn Notifier>,
}

impl RatingService {
    /// Creates a new `RatingService`.
    #[must_use]
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        tutors: Arc<dyn TutorStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            bookings,
            tutors,
            notifier,
        }
    }

    /// Submit a rating for a completed booking.
    ///
    /// # Errors
    ///
    /// [`CoreError::Validation`] if the score is outside 1–5;
    /// [`CoreError::NotFound`] if the booking does not exist;
    /// [`CoreError::Forbidden`] unless the actor is the booking's student;
    /// [`CoreError::InvalidState`] if the booking is not completed or is
    /// already rated.
    #[tracing::instrument(skip(self, comment), fields(actor_id = %actor.id, booking_id = %id))]
    pub async fn add_rating(
        &self,
        actor: &Actor,
        id: BookingId,
        score: u8,
        comment: Option<String>,
    ) -> Result<Booking> {
        let score = RatingScore::try_new(score)?;

        let booking = self
            .bookings
            .get(id)
            .await?
            .ok_or_else(|| CoreError::not_found("booking", id))?;
        if booking.student_id != actor.id {
            return Err(CoreError::forbidden(
                "only the booking's student can rate the session",
            ));
        }
        if booking.status != BookingStatus::Completed {
            return Err(CoreError::invalid_state(
                "only completed bookings can be rated",
            ));
        }
        if booking.rating.is_some() {
            return Err(CoreError::invalid_state("booking is already rated"));
        }

        // Conditional write: settles concurrent submissions so at most one
        // score ever lands on the booking.
        let rated = self.bookings.record_rating(id, score, comment).await?;

        self.fold_into_aggregate(&rated, score).await?;
        tracing::info!(score = %score, "rating recorded");

        self.notifier
            .publish(DomainEvent::RatingAdded {
                booking_id: rated.id,
                student_id: rated.student_id,
                tutor_id: rated.tutor_id,
                score,
            })
            .await;

        Ok(rated)
    }

    /// Folds the score into the tutor aggregate under optimistic
    /// concurrency: re-read and retry when another rating landed between
    /// our read and the compare-and-set.
    async fn fold_into_aggregate(&self, booking: &Booking, score: RatingScore) -> Result<()> {
        for _ in 0..MAX_AGGREGATE_RETRIES {
            let profile = self
                .tutors
                .get(booking.tutor_id)
                .await?
                .ok_or_else(|| CoreError::not_found("tutor", booking.tutor_id))?;
            let updated = profile.rating.record(score);
            if self
                .tutors
                .update_rating(booking.tutor_id, profile.rating.count, updated)
                .await?
            {
                return Ok(());
            }
            tracing::debug!(tutor_id = %booking.tutor_id, "rating aggregate contention, retrying");
        }
        Err(CoreError::storage(format!(
            "rating aggregate for tutor {} kept changing after {MAX_AGGREGATE_RETRIES} attempts",
            booking.tutor_id
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::types::{RatingAggregate, RatingScore};
    use proptest::prelude::*;

    #[test]
    fn test_incremental_mean_matches_batch_mean() {
        let scores = [5u8, 4, 3, 5, 1, 2, 5, 4];
        let mut aggregate = RatingAggregate::new();
        for score in scores {
            aggregate = aggregate.record(RatingScore::try_new(score).unwrap());
        }

        let batch: f64 = scores.iter().map(|s| f64::from(*s)).sum::<f64>()
            / scores.len() as f64;
        assert_eq!(aggregate.count, scores.len() as u32);
        assert!((aggregate.average - batch).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_average_stays_within_score_bounds(scores in prop::collection::vec(1u8..=5, 1..200)) {
            let mut aggregate = RatingAggregate::new();
            for score in &scores {
                aggregate = aggregate.record(RatingScore::try_new(*score).unwrap());
            }
            prop_assert!(aggregate.average >= 1.0 - 1e-9);
            prop_assert!(aggregate.average <= 5.0 + 1e-9);
            prop_assert_eq!(aggregate.count as usize, scores.len());
        }

        #[test]
        fn prop_count_grows_by_one_per_score(
            average in 1.0f64..5.0,
            count in 0u32..10_000,
            score in 1u8..=5,
        ) {
            let aggregate = RatingAggregate::from_parts(average, count);
            let updated = aggregate.record(RatingScore::try_new(score).unwrap());
            prop_assert_eq!(updated.count, count + 1);
            // The new mean sits between the old mean and the new score.
            let lo = average.min(f64::from(score)) - 1e-9;
            let hi = average.max(f64::from(score)) + 1e-9;
            prop_assert!(updated.average >= lo && updated.average <= hi);
        }
    }
}
