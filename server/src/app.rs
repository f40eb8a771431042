//! Assembly of the running service.

use crate::config::Config;
use anyhow::Context;
use axum::Router;
use mentorship_core::{BookingEnvironment, StoreError, StoreFuture, SystemClock};
use mentorship_postgres::PostgresStore;
use mentorship_web::{build_router, AppState, ReadinessProbe};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

/// Readiness backed by a database round trip.
#[derive(Clone, Debug)]
pub struct DatabaseProbe(pub PostgresStore);

impl ReadinessProbe for DatabaseProbe {
    fn check(&self) -> StoreFuture<'_, Result<(), StoreError>> {
        Box::pin(self.0.ping())
    }
}

/// Connect the pool, apply migrations and build the router.
///
/// Returns the store alongside the router so the caller can close the pool
/// on shutdown.
///
/// # Errors
///
/// Fails if the database is unreachable or a migration fails.
pub async fn build_app(config: &Config) -> anyhow::Result<(Router, PostgresStore)> {
    let pool = PgPoolOptions::new()
        .max_connections(config.postgres.max_connections)
        .min_connections(config.postgres.min_connections)
        .acquire_timeout(Duration::from_secs(config.postgres.connect_timeout))
        .idle_timeout(Some(Duration::from_secs(config.postgres.idle_timeout)))
        .connect(&config.postgres.url)
        .await
        .with_context(|| format!("Failed to connect to {}", config.redacted_database_url()))?;
    tracing::info!("PostgreSQL connected");

    let store = PostgresStore::new(pool);
    if config.postgres.run_migrations {
        store.migrate().await.context("Failed to run migrations")?;
    }

    let shared = Arc::new(store.clone());
    let env = BookingEnvironment::from_store(shared.clone(), Arc::new(SystemClock), shared);
    let state = AppState::new(&env, Arc::new(DatabaseProbe(store.clone())));

    Ok((build_router(state), store))
}
