//! Error types for web handlers.
//!
//! [`AppError`] bridges the service error enums and HTTP responses. Every
//! domain error has a `From` impl, so handlers just use `?`.
//!
//! Error body:
//!
//! ```json
//! { "success": false, "code": "ALREADY_IN_CART", "message": "Slot is already in your cart" }
//! ```
//!
//! Checkout failures and field validation add an `errors` array.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mentorship_core::{
    CancelError, CartError, CheckoutError, SlotError, StatusError, StoreError,
};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Application error type for web handlers.
///
/// Holds the status, a machine-readable code and a user-facing message.
/// Server errors keep their cause in `source` for logging; it is never sent
/// to the client.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: &'static str,
    errors: Option<Value>,
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            errors: None,
            source: None,
        }
    }

    /// Attach the internal cause (logged, not exposed).
    #[must_use]
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach structured detail returned as `errors`.
    #[must_use]
    pub fn with_errors(mut self, errors: Value) -> Self {
        self.errors = Some(errors);
        self
    }

    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    /// 400 with one `{field, message}` entry per invalid field.
    #[must_use]
    pub fn validation(fields: &[(&str, String)]) -> Self {
        let errors = fields
            .iter()
            .map(|(field, message)| serde_json::json!({ "field": field, "message": message }))
            .collect();
        Self::bad_request("VALIDATION_ERROR", "Invalid request").with_errors(Value::Array(errors))
    }

    /// 401 Unauthorized.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    /// 403 Forbidden.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    /// 404 Not Found.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// 409 Conflict.
    #[must_use]
    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    /// 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR", message)
    }

    /// 503 Service Unavailable.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", message)
    }

    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    error = %source,
                    "Internal server error"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    "Internal server error"
                ),
            }
        }

        let body = ErrorResponse {
            success: false,
            code: self.code,
            message: self.message,
            errors: self.errors,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                let text = err.body_text();
                let detail = text
                    .strip_prefix("Failed to deserialize the JSON body into the target type: ")
                    .unwrap_or(&text);
                match detail.split_once(": ") {
                    Some((field, message)) if !field.contains(' ') => {
                        Self::validation(&[(field, message.to_string())])
                    }
                    _ => Self::validation(&[("body", detail.to_string())]),
                }
            }
            JsonRejection::JsonSyntaxError(err) => {
                Self::bad_request("INVALID_JSON", err.body_text())
            }
            JsonRejection::MissingJsonContentType(err) => {
                Self::bad_request("INVALID_JSON", err.body_text())
            }
            other => Self::bad_request("INVALID_JSON", other.body_text()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            // A constraint that the service did not translate still means a lost race
            StoreError::UniqueViolation(_) => {
                Self::conflict("CONFLICT", "The resource was modified concurrently")
            }
            StoreError::Corrupt(_) | StoreError::Database(_) => {
                Self::internal("An internal error occurred").with_source(err)
            }
        }
    }
}

impl From<SlotError> for AppError {
    fn from(err: SlotError) -> Self {
        let message = err.to_string();
        match err {
            SlotError::InvalidInput(_) | SlotError::InvalidTime(_) => {
                Self::bad_request("VALIDATION_ERROR", message)
            }
            SlotError::TooSoon => Self::bad_request("TOO_SOON", message),
            SlotError::NoPriceConfigured => Self::bad_request("NO_PRICE_CONFIGURED", message),
            SlotError::HasBooking => Self::bad_request("SLOT_HAS_BOOKING", message),
            SlotError::NotAvailable(_) => Self::bad_request("SLOT_NOT_AVAILABLE", message),
            SlotError::MentorNotFound | SlotError::NotFound => Self::not_found(message),
            SlotError::NotAMentor | SlotError::MentorUnavailable | SlotError::Forbidden => {
                Self::forbidden(message)
            }
            SlotError::SlotConflict => Self::conflict("SLOT_CONFLICT", message),
            SlotError::Store(store) => store.into(),
        }
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        let message = err.to_string();
        match err {
            CartError::NotAvailable(_) => Self::bad_request("SLOT_NOT_AVAILABLE", message),
            CartError::OutsideBookingWindow => {
                Self::bad_request("OUTSIDE_BOOKING_WINDOW", message)
            }
            CartError::SlotNotFound | CartError::ItemNotFound | CartError::CartNotFound => {
                Self::not_found(message)
            }
            CartError::Forbidden => Self::forbidden(message),
            CartError::AlreadyInCart => Self::conflict("ALREADY_IN_CART", message),
            CartError::Store(store) => store.into(),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        let message = err.to_string();
        match err {
            CheckoutError::EmptyCart => Self::bad_request("EMPTY_CART", message),
            CheckoutError::AllItemsInvalid(rejections) => {
                let error = Self::bad_request("CHECKOUT_FAILED", message);
                match serde_json::to_value(&rejections) {
                    Ok(errors) => error.with_errors(errors),
                    Err(e) => Self::internal("An internal error occurred").with_source(e),
                }
            }
            CheckoutError::Store(store) => store.into(),
        }
    }
}

impl From<CancelError> for AppError {
    fn from(err: CancelError) -> Self {
        let message = err.to_string();
        match err {
            CancelError::AlreadyCancelled => Self::bad_request("ALREADY_CANCELLED", message),
            CancelError::CannotCancelCompleted => {
                Self::bad_request("BOOKING_COMPLETED", message)
            }
            CancelError::HasPassedSlot => Self::bad_request("SLOT_PASSED", message),
            CancelError::NotFound => Self::not_found(message),
            CancelError::Forbidden => Self::forbidden(message),
            CancelError::Store(store) => store.into(),
        }
    }
}

impl From<StatusError> for AppError {
    fn from(err: StatusError) -> Self {
        let message = err.to_string();
        match err {
            StatusError::NotFound => Self::not_found(message),
            StatusError::InvalidTransition { .. } => {
                Self::bad_request("INVALID_TRANSITION", message)
            }
            StatusError::Store(store) => store.into(),
        }
    }
}
