//! Rating endpoint.
//!
//! `POST /api/bookings/:id/ratings` - the booking's student rates a
//! completed session, exactly once.

use crate::api::bookings::BookingResponse;
use crate::error::AppError;
use crate::extractors::AuthContext;
use crate::server::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tutorlink_core::types::BookingId;
use uuid::Uuid;

/// Body for `POST /api/bookings/:id/ratings`.
#[derive(Debug, Deserialize)]
pub struct AddRatingRequest {
    /// Score, 1–5.
    pub score: u8,
    /// Optional review text.
    pub comment: Option<String>,
}

/// Submit a rating for a completed booking.
pub async fn add_rating(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<AddRatingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let booking = state
        .ratings
        .add_rating(
            &auth.actor(),
            BookingId::from_uuid(id),
            body.score,
            body.comment,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(booking.into())))
}
