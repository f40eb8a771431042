//! Error types for the slot, cart and booking services.
//!
//! Every variant except the `Store` wrappers is an expected business outcome
//! (validation, state conflict, authorization, not-found) that the HTTP layer
//! maps to a 4xx status. Store failures are the only 5xx path.

use crate::checkout::CartItemRejection;
use crate::store::StoreError;
use crate::types::{BookingStatus, SlotStatus, SlotTimeError};
use thiserror::Error;

/// Errors from opening, closing and listing slots.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    /// Malformed date or time input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Slot time failed parsing or alignment
    #[error(transparent)]
    InvalidTime(#[from] SlotTimeError),

    /// The mentor account does not exist
    #[error("Mentor not found")]
    MentorNotFound,

    /// The caller's account is not a mentor
    #[error("User is not a mentor")]
    NotAMentor,

    /// The mentor is not verified or not a mentor (public listing)
    #[error("Mentor is not available for booking")]
    MentorUnavailable,

    /// Neither the mentor nor the mentor's category has a rate
    #[error("No price configured for this mentor or category")]
    NoPriceConfigured,

    /// The mentor already has a slot at that date and time
    #[error("A slot already exists at this date and time")]
    SlotConflict,

    /// Slot must be at least 48 hours away
    #[error("Slots can only be opened or closed at least 48 hours in advance")]
    TooSoon,

    /// No such slot
    #[error("Slot not found")]
    NotFound,

    /// The slot belongs to another mentor
    #[error("You can only manage your own slots")]
    Forbidden,

    /// A booking item references the slot
    #[error("Slot has a booking and cannot be closed")]
    HasBooking,

    /// The slot is not AVAILABLE
    #[error("Slot is {0} and cannot be closed")]
    NotAvailable(SlotStatus),

    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from cart operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    /// No such slot
    #[error("Slot not found")]
    SlotNotFound,

    /// The slot is not AVAILABLE
    #[error("Slot is {0}, not available")]
    NotAvailable(SlotStatus),

    /// The slot is not within the 48-hour booking window
    #[error("Slots can only be booked within 48 hours of their start time")]
    OutsideBookingWindow,

    /// An active hold on this slot already exists
    #[error("Slot is already in your cart")]
    AlreadyInCart,

    /// No such cart item
    #[error("Cart item not found")]
    ItemNotFound,

    /// The cart item belongs to another user
    #[error("You can only modify your own cart")]
    Forbidden,

    /// The user never created a cart
    #[error("Cart not found")]
    CartNotFound,

    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from checkout that produce no booking at all.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// The cart is missing or has no ACTIVE items
    #[error("Cart is empty")]
    EmptyCart,

    /// Every item was rejected; nothing was booked
    #[error("No cart item could be booked")]
    AllItemsInvalid(Vec<CartItemRejection>),

    /// Storage failure before any group was attempted
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from booking cancellation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CancelError {
    /// No such booking
    #[error("Booking not found")]
    NotFound,

    /// The caller is neither the student nor the mentor
    #[error("You are not allowed to cancel this booking")]
    Forbidden,

    /// Already CANCELLED
    #[error("Booking is already cancelled")]
    AlreadyCancelled,

    /// Already COMPLETED
    #[error("Completed bookings cannot be cancelled")]
    CannotCancelCompleted,

    /// At least one slot of the booking has started
    #[error("Booking contains a slot that has already passed")]
    HasPassedSlot,

    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from the booking status extension point.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StatusError {
    /// No such booking
    #[error("Booking not found")]
    NotFound,

    /// The transition is not part of the booking state machine
    #[error("Cannot move booking from {from} to {to}")]
    InvalidTransition {
        /// Current status
        from: BookingStatus,
        /// Requested status
        to: BookingStatus,
    },

    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),
}
