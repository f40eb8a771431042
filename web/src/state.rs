//! Application state for Axum handlers.

use mentorship_core::{
    BookingEngine, BookingEnvironment, BookingLifecycle, CartService, SlotService, StoreError,
    StoreFuture,
};
use std::sync::Arc;

/// Dependency check behind `GET /ready`.
pub trait ReadinessProbe: Send + Sync {
    /// Succeeds when the service can take traffic.
    fn check(&self) -> StoreFuture<'_, Result<(), StoreError>>;
}

/// Probe with no dependencies; used when the store is in-process.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysReady;

impl ReadinessProbe for AlwaysReady {
    fn check(&self) -> StoreFuture<'_, Result<(), StoreError>> {
        Box::pin(async { Ok(()) })
    }
}

/// Services shared by every handler. Cloned per request.
#[derive(Clone)]
pub struct AppState {
    /// Slot management
    pub slots: SlotService,
    /// Cart holds
    pub cart: CartService,
    /// Checkout
    pub engine: BookingEngine,
    /// Cancellation, listings and status changes
    pub lifecycle: BookingLifecycle,
    /// Readiness check
    pub readiness: Arc<dyn ReadinessProbe>,
}

impl AppState {
    /// Wire every service to `env`.
    #[must_use]
    pub fn new(env: &BookingEnvironment, readiness: Arc<dyn ReadinessProbe>) -> Self {
        Self {
            slots: SlotService::new(env.clone()),
            cart: CartService::new(env.clone()),
            engine: BookingEngine::new(env.clone()),
            lifecycle: BookingLifecycle::new(env.clone()),
            readiness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone() {
        fn assert_clone<T: Clone + Send + Sync>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test]
    async fn test_always_ready() {
        assert_eq!(AlwaysReady.check().await, Ok(()));
    }
}
