//! HTTP surface of the mentorship booking core.
//!
//! Thin axum handlers over the core services: extract identity and input,
//! call one service method, map the result.
//!
//! ```text
//! request ─► correlation id ─► trace span ─► Identity extractor
//!         ─► handler ─► SlotService / CartService / BookingEngine / BookingLifecycle
//!         ─► ApiResponse { success: true, .. }  or  AppError { success: false, code, .. }
//! ```
//!
//! # Example
//!
//! ```ignore
//! let env = BookingEnvironment::from_store(store, Arc::new(SystemClock), notifier);
//! let app = build_router(AppState::new(&env, Arc::new(AlwaysReady)));
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::AppError;
pub use extractors::{ApiJson, CorrelationId, Identity, USER_ID_HEADER, USER_ROLE_HEADER};
pub use middleware::{correlation_id_layer, CORRELATION_ID_HEADER};
pub use router::build_router;
pub use state::{AlwaysReady, AppState, ReadinessProbe};
