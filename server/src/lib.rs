//! # TutorLink Server
//!
//! The HTTP application for the TutorLink scheduling core: an axum router
//! over the core services, with identity arriving as trusted gateway
//! headers, errors mapped onto the domain taxonomy, and collaborator stubs
//! for payments and notifications.
//!
//! The binary wires the services over the `PostgreSQL` adapters; tests
//! wire the same router over the in-memory adapters from
//! `tutorlink-testing`.

pub mod api;
pub mod config;
pub mod error;
pub mod extractors;
pub mod notifier;
pub mod payments;
pub mod server;

pub use config::Config;
pub use error::AppError;
pub use server::routes::build_router;
pub use server::state::AppState;
