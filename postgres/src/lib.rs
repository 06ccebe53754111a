//! # TutorLink `PostgreSQL`
//!
//! `PostgreSQL` implementations of the scheduling core's store ports using
//! sqlx with runtime-bound queries (the default build needs no database).
//!
//! How the store contracts are met:
//!
//! - **Slot non-overlap**: writes take a transaction-scoped advisory lock
//!   keyed on (tutor, date), then run the shared overlap rule against the
//!   day's rows before writing. Two concurrent writers for the same tutor
//!   and day serialize on the lock.
//! - **Slot claim**: booking creation flips `is_booked` with
//!   `... WHERE is_booked = FALSE` and inserts the booking row in the same
//!   transaction; zero rows affected means the race was lost.
//! - **Cancel**: the status flip (guarded on `status = 'confirmed'`) and
//!   the slot release commit together, so a cancelled booking with a
//!   still-locked slot is unrepresentable.
//! - **Rating aggregate**: compare-and-set guarded on `total_ratings`.
//!
//! # Example
//!
//! ```ignore
//! use tutorlink_postgres::{connect, run_migrations, PostgresSlotStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = connect("postgres://localhost/tutorlink", 10).await?;
//!     run_migrations(&pool).await?;
//!     let slots = PostgresSlotStore::new(pool);
//!     Ok(())
//! }
//! ```

mod bookings;
mod slots;
mod tutors;

pub use bookings::PostgresBookingStore;
pub use slots::PostgresSlotStore;
pub use tutors::PostgresTutorStore;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tutorlink_core::error::{CoreError, Result};

/// Open a connection pool against the given database URL.
///
/// # Errors
///
/// Returns the underlying sqlx error if the pool cannot be established.
pub async fn connect(url: &str, max_connections: u32) -> std::result::Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

/// Apply the embedded schema migrations.
///
/// # Errors
///
/// Returns [`CoreError::Storage`] if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| CoreError::storage(format!("migration failed: {e}")))?;
    Ok(())
}

/// Convert a cents value read from a `BIGINT` column.
pub(crate) fn cents_from_db(cents: i64) -> Result<u64> {
    u64::try_from(cents).map_err(|_| CoreError::storage(format!("negative amount in store: {cents}")))
}

/// Convert a cents value for binding into a `BIGINT` column.
pub(crate) fn cents_to_db(cents: u64) -> Result<i64> {
    i64::try_from(cents).map_err(|_| CoreError::storage(format!("amount out of range: {cents}")))
}
