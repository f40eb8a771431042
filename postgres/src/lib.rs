//! `PostgreSQL` persistence for the mentorship booking core.
//!
//! [`PostgresStore`] implements every store port of `mentorship-core` on one
//! connection pool:
//!
//! - slot, cart and booking reads and writes
//! - the atomic units of work (`commit_group`, `cancel_booking`,
//!   `close_slot`), each one transaction with `SELECT ... FOR UPDATE`
//! - read-only mentor reference data
//! - notification inserts
//!
//! Uniqueness rules are schema constraints (see `migrations/`), so they hold
//! across any number of server instances.
//!
//! # Example
//!
//! ```no_run
//! use mentorship_postgres::PostgresStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = sqlx::PgPool::connect("postgres://localhost/mentorship").await?;
//! let store = PostgresStore::new(pool);
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bookings;
mod carts;
mod directory;
mod error;
mod rows;
mod slots;

use mentorship_core::StoreError;
use sqlx::PgPool;

/// Every booking-core store port backed by one `PgPool`.
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` with default pool settings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the connection cannot be established.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))?;
        Ok(Self::new(pool))
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Round-trip a trivial query; used by readiness checks.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the database is unreachable.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| error::db_error("ping", e))?;
        Ok(())
    }
}
