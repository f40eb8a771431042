//! Business metrics for the booking core.
//!
//! Recorded through the `metrics` facade; the server installs a Prometheus
//! exporter. Without an installed recorder every call is a no-op, which is
//! what the tests rely on.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `mentorship_slots_total{action}` - Slots opened / closed
//! - `mentorship_cart_items_total{action}` - Holds added / removed / cleared
//! - `mentorship_bookings_total{status}` - Bookings created / cancelled / promoted
//! - `mentorship_booked_slots_total` - Slots consumed by checkout
//! - `mentorship_checkout_rejections_total{reason}` - Rejected cart items by reason
//! - `mentorship_notification_failures_total` - Swallowed notification errors

use metrics::{describe_counter, describe_histogram};

/// Register metric descriptions. Call once at startup.
pub fn register_business_metrics() {
    describe_counter!(
        "mentorship_slots_total",
        "Slots opened and closed by mentors, by action"
    );
    describe_counter!(
        "mentorship_cart_items_total",
        "Cart holds added, removed and cleared, by action"
    );
    describe_counter!(
        "mentorship_bookings_total",
        "Booking status changes (created, cancelled, confirmed, completed)"
    );
    describe_counter!(
        "mentorship_booked_slots_total",
        "Slots consumed by successful checkouts"
    );
    describe_counter!(
        "mentorship_checkout_rejections_total",
        "Cart items rejected at checkout, by reason"
    );
    describe_counter!(
        "mentorship_notification_failures_total",
        "Notifications that failed to send and were dropped"
    );
    describe_histogram!(
        "mentorship_checkout_groups",
        "Number of mentor groups per checkout"
    );

    tracing::info!("Business metrics registered");
}

/// Record a slot opened or closed.
pub fn record_slot(action: &'static str) {
    metrics::counter!("mentorship_slots_total", "action" => action).increment(1);
}

/// Record cart holds changing.
pub fn record_cart_items(action: &'static str, count: u64) {
    metrics::counter!("mentorship_cart_items_total", "action" => action).increment(count);
}

/// Record a booking status change.
pub fn record_booking(status: &'static str) {
    metrics::counter!("mentorship_bookings_total", "status" => status).increment(1);
}

/// Record slots consumed by one committed booking.
pub fn record_booked_slots(count: usize) {
    metrics::counter!("mentorship_booked_slots_total").increment(count as u64);
}

/// Record a rejected cart item.
pub fn record_checkout_rejection(reason: &'static str) {
    metrics::counter!("mentorship_checkout_rejections_total", "reason" => reason).increment(1);
}

/// Record the number of mentor groups in one checkout.
#[allow(clippy::cast_precision_loss)]
pub fn record_checkout_groups(groups: usize) {
    metrics::histogram!("mentorship_checkout_groups").record(groups as f64);
}

/// Record a swallowed notification failure.
pub fn record_notification_failure() {
    metrics::counter!("mentorship_notification_failures_total").increment(1);
}
