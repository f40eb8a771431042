//! HTTP request handlers, one module per resource.
//!
//! Successful responses share the envelope `{ "success": true, ... }` with
//! the payload fields flattened next to `success`.

pub mod bookings;
pub mod cart;
pub mod health;
pub mod slots;

use crate::error::AppError;
use axum::Json;
use serde::Serialize;
use std::str::FromStr;

pub use health::{health_check, readiness_check};

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always `true`
    pub success: bool,
    /// Payload fields
    #[serde(flatten)]
    pub data: T,
}

/// Wrap `data` in a success envelope.
pub const fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

/// Parse a path id, rejecting malformed input with 400.
pub(crate) fn parse_id<T: FromStr>(raw: &str, what: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::bad_request("INVALID_ID", format!("Invalid {what} id '{raw}'")))
}
