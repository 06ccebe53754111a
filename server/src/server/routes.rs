//! Router configuration for the TutorLink server.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{availability, bookings, ratings, tutors};
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// All business endpoints live under `/api` and require the gateway
/// identity headers; health checks are open.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Availability management
        .route(
            "/availability",
            post(availability::create_slot).get(availability::list_availability),
        )
        .route(
            "/availability/:id",
            put(availability::update_slot).delete(availability::delete_slot),
        )
        // Bookings
        .route(
            "/bookings",
            post(bookings::create_booking).get(bookings::list_bookings),
        )
        .route(
            "/bookings/:id",
            get(bookings::get_booking)
                .put(bookings::update_booking)
                .delete(bookings::cancel_booking),
        )
        .route("/bookings/:id/ratings", post(ratings::add_rating))
        .route(
            "/bookings/:id/payment-confirmation",
            post(bookings::confirm_payment),
        )
        // Tutor profiles
        .route("/tutors/:id", get(tutors::get_profile))
        .route("/tutors/:id/rate", put(tutors::set_hourly_rate));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
