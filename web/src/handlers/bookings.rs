//! Booking endpoints.
//!
//! - `POST /bookings/book-from-cart` (USER)
//! - `GET /bookings/all` (ADMIN), `/bookings/mentor` (MENTOR), `/bookings/user` (USER)
//! - `PATCH /bookings/:booking_id/cancel` (USER or MENTOR party)
//! - `PATCH /bookings/:booking_id/status` (ADMIN)

use super::{ok, parse_id, ApiResponse};
use crate::error::AppError;
use crate::extractors::{ApiJson, Identity};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use mentorship_core::{
    Booking, BookingId, BookingStatus, BookingWithItems, CheckoutOutcome, Role,
};
use serde::{Deserialize, Serialize};

/// A booking listing, newest first.
#[derive(Debug, Serialize)]
pub struct BookingsBody {
    /// Bookings with their items
    pub bookings: Vec<BookingWithItems>,
}

/// One booking with its items.
#[derive(Debug, Serialize)]
pub struct BookingBody {
    /// The booking
    pub booking: BookingWithItems,
}

/// A booking after a status change.
#[derive(Debug, Serialize)]
pub struct StatusBody {
    /// The booking row
    pub booking: Booking,
}

/// Body of `PATCH /bookings/:booking_id/status`.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    /// `CONFIRMED` or `COMPLETED`
    pub status: Option<String>,
}

/// Check out the caller's cart.
///
/// Responds 201 with one booking per mentor whose items were all still
/// bookable, plus an `errors` entry per rejected item. When nothing could be
/// booked the response is 400 with the same `errors` array.
pub async fn book_from_cart(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<CheckoutOutcome>>), AppError> {
    let user_id = identity.require(Role::User)?;
    let outcome = state.engine.book_from_cart(user_id).await?;

    if !outcome.errors.is_empty() {
        tracing::info!(
            %user_id,
            booked = outcome.bookings.len(),
            rejected = outcome.errors.len(),
            "Partial checkout"
        );
    }
    Ok((StatusCode::CREATED, ok(outcome)))
}

/// Every booking (ADMIN).
pub async fn list_all_bookings(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<BookingsBody>>, AppError> {
    identity.require(Role::Admin)?;
    let bookings = state.lifecycle.list_all().await?;
    Ok(ok(BookingsBody { bookings }))
}

/// Bookings of the calling mentor.
pub async fn list_mentor_bookings(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<BookingsBody>>, AppError> {
    let mentor_id = identity.require(Role::Mentor)?;
    let bookings = state.lifecycle.list_for_mentor(mentor_id).await?;
    Ok(ok(BookingsBody { bookings }))
}

/// Bookings of the calling student.
pub async fn list_user_bookings(
    identity: Identity,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<BookingsBody>>, AppError> {
    let student_id = identity.require(Role::User)?;
    let bookings = state.lifecycle.list_for_student(student_id).await?;
    Ok(ok(BookingsBody { bookings }))
}

/// Cancel a booking as its student or its mentor.
pub async fn cancel_booking(
    identity: Identity,
    State(state): State<AppState>,
    Path(booking_id): Path<String>,
) -> Result<Json<ApiResponse<BookingBody>>, AppError> {
    let actor_id = identity.require_any(&[Role::User, Role::Mentor])?;
    let booking_id: BookingId = parse_id(&booking_id, "booking")?;

    let booking = state.lifecycle.cancel(actor_id, booking_id).await?;
    Ok(ok(BookingBody { booking }))
}

/// Promote a booking (ADMIN).
pub async fn update_booking_status(
    identity: Identity,
    State(state): State<AppState>,
    Path(booking_id): Path<String>,
    ApiJson(request): ApiJson<StatusRequest>,
) -> Result<Json<ApiResponse<StatusBody>>, AppError> {
    identity.require(Role::Admin)?;
    let booking_id: BookingId = parse_id(&booking_id, "booking")?;
    let raw = request
        .status
        .ok_or_else(|| AppError::validation(&[("status", "status is required".to_string())]))?;
    let target: BookingStatus = raw
        .parse()
        .map_err(|e: mentorship_core::ParseEnumError| {
            AppError::validation(&[("status", e.to_string())])
        })?;

    let booking = state.lifecycle.transition(booking_id, target).await?;
    Ok(ok(StatusBody { booking }))
}
