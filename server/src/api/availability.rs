//! Availability endpoints.
//!
//! - `POST /api/availability` - publish a slot
//! - `PUT /api/availability/:id` - edit an unbooked slot
//! - `DELETE /api/availability/:id` - remove an unbooked slot
//! - `GET /api/availability?tutor_id=&from=&to=` - open slots, sorted

use crate::error::AppError;
use crate::extractors::AuthContext;
use crate::server::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tutorlink_core::availability::SlotChanges;
use tutorlink_core::types::{DateRange, Slot, SlotId, UserId};
use uuid::Uuid;

// ============================================================================
// Request / Response Types
// ============================================================================

/// Body for `POST /api/availability`.
#[derive(Debug, Deserialize)]
pub struct CreateSlotRequest {
    /// Calendar date of the window.
    pub date: NaiveDate,
    /// Start of the window.
    pub start_time: NaiveTime,
    /// End of the window (exclusive).
    pub end_time: NaiveTime,
}

/// Body for `PUT /api/availability/:id`; absent fields keep their values.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSlotRequest {
    /// New date.
    pub date: Option<NaiveDate>,
    /// New start time.
    pub start_time: Option<NaiveTime>,
    /// New end time.
    pub end_time: Option<NaiveTime>,
}

/// Query for `GET /api/availability`.
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    /// Tutor whose calendar to read.
    pub tutor_id: Uuid,
    /// Earliest date to include.
    pub from: Option<NaiveDate>,
    /// Latest date to include.
    pub to: Option<NaiveDate>,
}

/// A slot as returned to clients.
#[derive(Debug, Serialize)]
pub struct SlotResponse {
    /// Slot id.
    pub id: SlotId,
    /// Owning tutor.
    pub tutor_id: UserId,
    /// Calendar date.
    pub date: NaiveDate,
    /// Start of the window.
    pub start_time: NaiveTime,
    /// End of the window.
    pub end_time: NaiveTime,
    /// Whether an active booking holds the slot.
    pub is_booked: bool,
}

impl From<Slot> for SlotResponse {
    fn from(slot: Slot) -> Self {
        Self {
            id: slot.id,
            tutor_id: slot.tutor_id,
            date: slot.date,
            start_time: slot.time.start(),
            end_time: slot.time.end(),
            is_booked: slot.is_booked,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Publish a new availability window for the acting tutor.
pub async fn create_slot(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<CreateSlotRequest>,
) -> Result<(StatusCode, Json<SlotResponse>), AppError> {
    let slot = state
        .availability
        .create_slot(&auth.actor(), body.date, body.start_time, body.end_time)
        .await?;
    Ok((StatusCode::CREATED, Json(slot.into())))
}

/// Edit an unbooked slot.
pub async fn update_slot(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateSlotRequest>,
) -> Result<Json<SlotResponse>, AppError> {
    let changes = SlotChanges {
        date: body.date,
        start: body.start_time,
        end: body.end_time,
    };
    let slot = state
        .availability
        .update_slot(&auth.actor(), SlotId::from_uuid(id), changes)
        .await?;
    Ok(Json(slot.into()))
}

/// Remove an unbooked slot.
pub async fn delete_slot(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .availability
        .delete_slot(&auth.actor(), SlotId::from_uuid(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Open slots for a tutor, sorted by (date, start time).
///
/// Public read: browsing availability needs no identity.
pub async fn list_availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<SlotResponse>>, AppError> {
    let slots = state
        .availability
        .list_availability(
            UserId::from_uuid(query.tutor_id),
            DateRange::new(query.from, query.to),
        )
        .await?;
    Ok(Json(slots.into_iter().map(SlotResponse::from).collect()))
}
