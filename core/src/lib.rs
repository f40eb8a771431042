//! # Mentorship Booking Core
//!
//! Slot, cart and booking rules for the mentorship booking platform.
//!
//! A mentor's bookable half-hour slot moves through:
//!
//! ```text
//!  open (≥48h ahead)        add to cart (≤48h ahead)       checkout
//! ──────────────────► AVAILABLE ─────────────────► hold ──────────► BOOKED
//!                        ▲  │                                          │
//!                        │  └── close (≥48h ahead) ──► deleted         │
//!                        └──────────────── cancel booking ◄────────────┘
//! ```
//!
//! ## Services
//!
//! - [`SlotService`]: open, close and list slots
//! - [`CartService`]: 30-minute holds on slots
//! - [`BookingEngine`]: checkout, one atomic booking per mentor
//! - [`BookingLifecycle`]: cancellation, listings, status promotion
//!
//! All services share a [`BookingEnvironment`] of injected ports
//! ([`store`]), so the same code runs on PostgreSQL and on the in-memory test
//! store.
//!
//! ## Example
//!
//! ```ignore
//! let env = BookingEnvironment::from_store(store, Arc::new(SystemClock), notifier);
//! let engine = BookingEngine::new(env.clone());
//!
//! let outcome = engine.book_from_cart(student_id).await?;
//! for rejection in &outcome.errors {
//!     println!("{} not booked: {}", rejection.cart_item_id, rejection.reason.as_str());
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cart;
pub mod checkout;
pub mod environment;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod notify;
pub mod slots;
pub mod store;
pub mod time_window;
pub mod types;

pub use cart::{CartContents, CartService};
pub use checkout::{BookingEngine, CartItemRejection, CheckoutOutcome, RejectionReason, SlotSnapshot};
pub use environment::{BookingEnvironment, Clock, SystemClock};
pub use error::{CancelError, CartError, CheckoutError, SlotError, StatusError};
pub use lifecycle::BookingLifecycle;
pub use slots::{MentorSlots, SlotService};
pub use store::{
    BookingStore, CartStore, CloseOutcome, CommitError, MentorDirectory, NewBooking,
    NotificationSink, SlotStore, StoreError, StoreFuture, TransitionError,
};
pub use types::*;
