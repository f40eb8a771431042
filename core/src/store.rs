//! Persistence ports.
//!
//! The services never talk to a database directly. They go through these
//! traits, which have two implementations:
//!
//! - `PostgresStore` (in `mentorship-postgres`): production, every multi-row
//!   mutation is one SQL transaction
//! - `InMemoryStore` (in `mentorship-testing`): fast, deterministic tests,
//!   every call runs under one lock
//!
//! # Contended rows
//!
//! Slot rows are mutated by checkout, cancellation and closure. Each of those
//! paths goes through exactly one method here ([`BookingStore::commit_group`],
//! [`BookingStore::cancel_booking`], [`SlotStore::close_slot`]) that reads the
//! current status and conditionally writes it as one atomic unit. Callers may
//! pre-check with plain reads for friendlier errors, but correctness never
//! depends on those reads.
//!
//! # Dyn Compatibility
//!
//! Methods return `Pin<Box<dyn Future>>` instead of using `async fn` so the
//! ports can be held as `Arc<dyn SlotStore>` in the environment.

use crate::types::{
    Booking, BookingId, BookingScope, BookingStatus, BookingWithItems, Cart, CartId, CartItem,
    CartItemDetails, CartItemId, MentorProfile, NotificationRequest, Slot, SlotFilter, SlotId,
    SlotStatus, UserId,
};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by every port method.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors shared by all store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    ///
    /// This is how a lost race on slot creation or cart holds surfaces.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Stored data could not be mapped back into domain types.
    #[error("Corrupt row: {0}")]
    Corrupt(String),

    /// Connection, query or transaction failure.
    #[error("Database error: {0}")]
    Database(String),
}

/// Result of an atomic slot close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The slot was deleted
    Closed,
    /// No such slot
    NotFound,
    /// A booking item references the slot
    HasBooking,
    /// The slot is not AVAILABLE
    NotAvailable(SlotStatus),
}

/// Failure of a per-mentor checkout transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitError {
    /// A slot of the group was no longer AVAILABLE when re-read under lock.
    ///
    /// `status` is `None` when the slot row disappeared.
    #[error("Slot {slot_id} is no longer available")]
    SlotUnavailable {
        /// The slot that lost the race
        slot_id: SlotId,
        /// Its status at commit time
        status: Option<SlotStatus>,
    },

    /// Storage failure; the transaction was rolled back.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure of an atomic booking status change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// No such booking
    #[error("Booking not found")]
    NotFound,

    /// The booking's status (re-read under lock) does not allow the change
    #[error("Booking is {0}")]
    InvalidState(BookingStatus),

    /// Storage failure; the transaction was rolled back
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything written by one per-mentor checkout transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    /// The booking row (status PENDING)
    pub booking: BookingWithItems,
    /// Cart items consumed by the booking, flipped to CHECKED_OUT
    pub cart_item_ids: Vec<CartItemId>,
}

/// Slot persistence.
pub trait SlotStore: Send + Sync {
    /// Insert a new slot.
    ///
    /// # Errors
    ///
    /// `StoreError::UniqueViolation` if the mentor already has a slot at that
    /// date and start time.
    fn insert_slot(&self, slot: Slot) -> StoreFuture<'_, Result<Slot, StoreError>>;

    /// Fetch one slot.
    fn get_slot(&self, slot_id: SlotId) -> StoreFuture<'_, Result<Option<Slot>, StoreError>>;

    /// A mentor's slots matching `filter`, ordered by date then start time.
    fn list_slots(
        &self,
        mentor_id: UserId,
        filter: SlotFilter,
    ) -> StoreFuture<'_, Result<Vec<Slot>, StoreError>>;

    /// Delete a slot if it is AVAILABLE and no booking item references it.
    ///
    /// Check and delete are atomic. Cart holds on the slot go with it.
    fn close_slot(&self, slot_id: SlotId) -> StoreFuture<'_, Result<CloseOutcome, StoreError>>;
}

/// Cart persistence.
pub trait CartStore: Send + Sync {
    /// The user's cart, if one was ever created.
    fn find_cart(&self, user_id: UserId) -> StoreFuture<'_, Result<Option<Cart>, StoreError>>;

    /// The user's cart, created with `candidate` if absent.
    ///
    /// Concurrent callers for the same user all get the same cart.
    fn get_or_create_cart(&self, candidate: Cart) -> StoreFuture<'_, Result<Cart, StoreError>>;

    /// Whether the user holds an ACTIVE item on the slot.
    fn has_active_item(
        &self,
        user_id: UserId,
        slot_id: SlotId,
    ) -> StoreFuture<'_, Result<bool, StoreError>>;

    /// Insert a hold.
    ///
    /// # Errors
    ///
    /// `StoreError::UniqueViolation` if an ACTIVE hold on the same slot by the
    /// same user already exists.
    fn insert_item(&self, item: CartItem) -> StoreFuture<'_, Result<CartItem, StoreError>>;

    /// Fetch one cart item.
    fn get_item(&self, item_id: CartItemId) -> StoreFuture<'_, Result<Option<CartItem>, StoreError>>;

    /// Delete one cart item. Returns whether it existed.
    fn delete_item(&self, item_id: CartItemId) -> StoreFuture<'_, Result<bool, StoreError>>;

    /// Delete every item of a cart. Returns how many were removed.
    fn clear_cart(&self, cart_id: CartId) -> StoreFuture<'_, Result<u64, StoreError>>;

    /// The user's ACTIVE items in insertion order, with live slot and mentor details.
    fn active_items(
        &self,
        user_id: UserId,
    ) -> StoreFuture<'_, Result<Vec<CartItemDetails>, StoreError>>;
}

/// Booking persistence and the atomic multi-row units of work.
pub trait BookingStore: Send + Sync {
    /// Run one per-mentor checkout transaction.
    ///
    /// Locks every referenced slot, re-verifies each is AVAILABLE, then
    /// inserts the booking and its items, flips the slots to BOOKED and marks
    /// the cart items CHECKED_OUT. Nothing is written if any slot fails the
    /// re-check.
    fn commit_group(
        &self,
        new_booking: NewBooking,
    ) -> StoreFuture<'_, Result<BookingWithItems, CommitError>>;

    /// Fetch one booking with its items.
    fn get_booking(
        &self,
        booking_id: BookingId,
    ) -> StoreFuture<'_, Result<Option<BookingWithItems>, StoreError>>;

    /// Bookings in `scope`, newest first.
    fn list_bookings(
        &self,
        scope: BookingScope,
    ) -> StoreFuture<'_, Result<Vec<BookingWithItems>, StoreError>>;

    /// Cancel a booking, its items, and release its slots in one transaction.
    ///
    /// The status is re-checked under lock: CANCELLED and COMPLETED bookings
    /// are rejected with `TransitionError::InvalidState`.
    fn cancel_booking(
        &self,
        booking_id: BookingId,
    ) -> StoreFuture<'_, Result<BookingWithItems, TransitionError>>;

    /// Move a booking to `target` if its current status is in `allowed_from`.
    fn update_booking_status(
        &self,
        booking_id: BookingId,
        allowed_from: &'static [BookingStatus],
        target: BookingStatus,
    ) -> StoreFuture<'_, Result<Booking, TransitionError>>;
}

/// Read access to mentor reference data owned by the profile collaborator.
pub trait MentorDirectory: Send + Sync {
    /// Profile of `user_id`, whatever its role.
    fn mentor_profile(
        &self,
        user_id: UserId,
    ) -> StoreFuture<'_, Result<Option<MentorProfile>, StoreError>>;
}

/// The notification collaborator.
///
/// Callers treat every send as fire-and-forget: failures are logged and
/// never fail the operation that triggered them.
pub trait NotificationSink: Send + Sync {
    /// Create one notification.
    fn create_notification(
        &self,
        request: NotificationRequest,
    ) -> StoreFuture<'_, Result<(), StoreError>>;
}
