//! Booking endpoints.
//!
//! - `POST /api/bookings` - reserve a slot
//! - `GET /api/bookings` / `GET /api/bookings/:id` - scoped reads
//! - `PUT /api/bookings/:id` - status change and/or meeting link
//! - `DELETE /api/bookings/:id` - cancel (idempotent)
//! - `POST /api/bookings/:id/payment-confirmation` - collaborator callback

use crate::error::AppError;
use crate::extractors::AuthContext;
use crate::server::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tutorlink_core::booking::BookingRequest;
use tutorlink_core::types::{
    Booking, BookingId, BookingStatus, PaymentStatus, Role, SlotId, UserId,
};
use uuid::Uuid;

// ============================================================================
// Request / Response Types
// ============================================================================

/// Body for `POST /api/bookings`.
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    /// Slot to reserve.
    pub slot_id: Uuid,
    /// Tutor expected to own the slot.
    pub tutor_id: Uuid,
    /// Subject the student wants help with.
    pub subject: String,
    /// Optional free-form note.
    pub description: Option<String>,
}

/// Query for `GET /api/bookings`.
#[derive(Debug, Default, Deserialize)]
pub struct ListBookingsQuery {
    /// Which side of the caller's bookings to list (defaults to their role).
    pub role: Option<Role>,
    /// Restrict to one lifecycle status.
    pub status: Option<BookingStatus>,
}

/// Body for `PUT /api/bookings/:id`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBookingRequest {
    /// Target lifecycle status.
    pub status: Option<BookingStatus>,
    /// Meeting link to attach.
    pub meeting_link: Option<String>,
}

/// Optional body for `DELETE /api/bookings/:id`.
#[derive(Debug, Default, Deserialize)]
pub struct CancelBookingRequest {
    /// Why the booking is being cancelled.
    pub reason: Option<String>,
}

/// A booking as returned to clients.
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    /// Booking id.
    pub id: BookingId,
    /// Reserving student.
    pub student_id: UserId,
    /// Owning tutor.
    pub tutor_id: UserId,
    /// Reserved slot.
    pub slot_id: SlotId,
    /// Session date (frozen at creation).
    pub date: NaiveDate,
    /// Session start (frozen at creation).
    pub start_time: NaiveTime,
    /// Session end (frozen at creation).
    pub end_time: NaiveTime,
    /// Subject.
    pub subject: String,
    /// Student's note.
    pub description: Option<String>,
    /// Frozen price in cents.
    pub amount_cents: u64,
    /// Lifecycle status.
    pub status: BookingStatus,
    /// Payment collaborator flag.
    pub payment_status: PaymentStatus,
    /// Attached meeting link.
    pub meeting_link: Option<String>,
    /// Submitted rating, if any.
    pub rating: Option<u8>,
    /// Review text, if any.
    pub rating_comment: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            student_id: booking.student_id,
            tutor_id: booking.tutor_id,
            slot_id: booking.slot_id,
            date: booking.date,
            start_time: booking.time.start(),
            end_time: booking.time.end(),
            subject: booking.subject,
            description: booking.description,
            amount_cents: booking.amount.cents(),
            status: booking.status,
            payment_status: booking.payment_status,
            meeting_link: booking.meeting_link,
            rating: booking.rating.map(|score| score.value()),
            rating_comment: booking.rating_comment,
            created_at: booking.created_at,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Reserve a slot for the acting student.
pub async fn create_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    let booking = state
        .bookings
        .create_booking(
            &auth.actor(),
            BookingRequest {
                slot_id: SlotId::from_uuid(body.slot_id),
                tutor_id: UserId::from_uuid(body.tutor_id),
                subject: body.subject,
                description: body.description,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(booking.into())))
}

/// Fetch one booking visible to the caller.
pub async fn get_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state
        .bookings
        .get_booking(&auth.actor(), BookingId::from_uuid(id))
        .await?;
    Ok(Json(booking.into()))
}

/// Bookings scoped to the caller, newest first.
pub async fn list_bookings(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ListBookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = state
        .bookings
        .list_bookings(&auth.actor(), query.role, query.status)
        .await?;
    Ok(Json(bookings.into_iter().map(BookingResponse::from).collect()))
}

/// Change a booking's status and/or attach a meeting link.
pub async fn update_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let id = BookingId::from_uuid(id);
    let actor = auth.actor();

    let booking = match (body.status, body.meeting_link) {
        (Some(status), meeting_link) => {
            state
                .lifecycle
                .update_status(&actor, id, status, meeting_link)
                .await?
        }
        (None, Some(link)) => state.lifecycle.set_meeting_link(&actor, id, link).await?,
        (None, None) => {
            return Err(AppError::validation(
                "request must carry a status or a meeting link",
            ));
        }
    };
    Ok(Json(booking.into()))
}

/// Cancel a booking, releasing its slot. Idempotent.
pub async fn cancel_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelBookingRequest>>,
) -> Result<Json<BookingResponse>, AppError> {
    let reason = body.and_then(|Json(body)| body.reason);
    let booking = state
        .lifecycle
        .cancel(&auth.actor(), BookingId::from_uuid(id), reason)
        .await?;
    Ok(Json(booking.into()))
}

/// Payment collaborator callback: flips the payment flag to paid.
///
/// Authenticated upstream at the gateway like every collaborator call;
/// deliberately not a lifecycle transition.
pub async fn confirm_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state
        .bookings
        .confirm_payment(BookingId::from_uuid(id))
        .await?;
    Ok(Json(booking.into()))
}
