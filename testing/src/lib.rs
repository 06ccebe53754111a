//! # TutorLink Testing
//!
//! Deterministic test support for the scheduling core:
//!
//! - [`memory::InMemoryStore`]: one in-memory adapter implementing all
//!   three store ports with the same concurrency contracts as the
//!   `PostgreSQL` adapter (a single async mutex serializes every write, so
//!   the conditional-write semantics hold trivially).
//! - [`mocks`]: recording notifier and payment gateway, plus a fixed clock.
//! - [`fixtures`]: builders for actors, slots, and profiles, and a
//!   [`fixtures::TestHarness`] wiring every service over the in-memory
//!   adapter.
//!
//! Never compiled into production binaries.

pub mod fixtures;
pub mod memory;
pub mod mocks;

pub use fixtures::TestHarness;
pub use memory::InMemoryStore;
pub use mocks::{FixedClock, RecordingNotifier, RecordingPaymentGateway};
