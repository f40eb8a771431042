//! Router configuration.

use crate::handlers::{bookings, cart, health, slots};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Build the complete router.
///
/// Routes sit at the root; the gateway in front of the service owns any
/// prefix. Every response carries `X-Correlation-ID`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health checks (no identity)
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Slots
        .route("/slots/open", post(slots::open_slot))
        .route("/slots/close/:slot_id", delete(slots::close_slot))
        .route("/slots/my-slots", get(slots::my_slots))
        .route("/slots/mentor/:mentor_id", get(slots::mentor_slots))
        // Cart
        .route("/cart", get(cart::list_cart).post(cart::add_to_cart))
        .route("/cart/clearCart", delete(cart::clear_cart))
        .route("/cart/:item_id", delete(cart::remove_from_cart))
        // Bookings
        .route("/bookings/book-from-cart", post(bookings::book_from_cart))
        .route("/bookings/all", get(bookings::list_all_bookings))
        .route("/bookings/mentor", get(bookings::list_mentor_bookings))
        .route("/bookings/user", get(bookings::list_user_bookings))
        .route("/bookings/:booking_id/cancel", patch(bookings::cancel_booking))
        .route("/bookings/:booking_id/status", patch(bookings::update_booking_status))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
