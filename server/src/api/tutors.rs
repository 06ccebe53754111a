//! Tutor profile endpoints.
//!
//! - `GET /api/tutors/:id` - pricing and rating aggregate (public read)
//! - `PUT /api/tutors/:id/rate` - tutor updates their own hourly rate

use crate::error::AppError;
use crate::extractors::AuthContext;
use crate::server::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tutorlink_core::types::{Money, TutorProfile, UserId};
use uuid::Uuid;

/// A tutor profile as returned to clients.
#[derive(Debug, Serialize)]
pub struct TutorResponse {
    /// Tutor id.
    pub id: UserId,
    /// Current hourly rate in cents.
    pub hourly_rate_cents: u64,
    /// Weighted mean of all ratings (0 when unrated).
    pub average_rating: f64,
    /// Number of ratings received.
    pub total_ratings: u32,
}

impl From<TutorProfile> for TutorResponse {
    fn from(profile: TutorProfile) -> Self {
        Self {
            id: profile.id,
            hourly_rate_cents: profile.hourly_rate.cents(),
            average_rating: profile.rating.average,
            total_ratings: profile.rating.count,
        }
    }
}

/// Body for `PUT /api/tutors/:id/rate`.
#[derive(Debug, Deserialize)]
pub struct SetRateRequest {
    /// New hourly rate in cents; must be positive.
    pub hourly_rate_cents: u64,
}

/// Fetch a tutor's profile.
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TutorResponse>, AppError> {
    let profile = state.tutors.get_profile(UserId::from_uuid(id)).await?;
    Ok(Json(profile.into()))
}

/// Update the acting tutor's hourly rate.
///
/// Existing bookings keep their frozen amounts.
pub async fn set_hourly_rate(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<SetRateRequest>,
) -> Result<Json<TutorResponse>, AppError> {
    if auth.user_id != UserId::from_uuid(id) {
        return Err(AppError::forbidden("cannot edit another tutor's rate"));
    }
    let profile = state
        .tutors
        .set_hourly_rate(&auth.actor(), Money::from_cents(body.hourly_rate_cents))
        .await?;
    Ok(Json(profile.into()))
}
