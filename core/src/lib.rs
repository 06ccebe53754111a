//! # TutorLink Core
//!
//! Domain model and scheduling services for the TutorLink tutoring
//! marketplace.
//!
//! The crate is the functional core of the system: tutors publish
//! availability slots, students book them, bookings move through a small
//! lifecycle (`confirmed → completed | cancelled`), and completed bookings
//! feed a per-tutor rating aggregate.
//!
//! ## Core Concepts
//!
//! - **Rules**: overlap detection, pricing, status transitions, and rating
//!   math are pure functions, unit-testable without any storage.
//! - **Ports**: persistence ([`store`]), notification ([`events`]), payment
//!   ([`payment`]), and time ([`environment`]) are traits injected into the
//!   services.
//! - **Services**: one orchestrator per subsystem
//!   ([`availability::AvailabilityService`], [`booking::BookingService`],
//!   [`lifecycle::LifecycleService`], [`rating::RatingService`],
//!   [`tutor::TutorService`]), each taking an explicit [`types::Actor`]
//!   rather than reading identity from ambient state.
//!
//! ## Concurrency
//!
//! The invariants that matter (no double-booking, no overlapping slots,
//! atomic cancel-and-release) are contracts on the store traits: adapters
//! must serialize the overlap check per (tutor, date) and implement slot
//! claiming and cancellation as conditional writes or transactions. See
//! [`store`] for the exact contracts.

pub mod availability;
pub mod booking;
pub mod environment;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod payment;
pub mod rating;
pub mod store;
pub mod tutor;
pub mod types;

pub use error::{CoreError, Result};
