//! In-memory store for fast, deterministic tests.
//!
//! [`InMemoryStore`] implements every persistence port of the booking core.
//! All tables sit behind one mutex, and each port method takes the lock once
//! and releases it before returning, so every call is atomic exactly like a
//! single SQL transaction in `PostgresStore`. The uniqueness constraints of
//! the schema are enforced here too:
//!
//! - one slot per (mentor, date, start time)
//! - one ACTIVE cart item per (user, slot)
//! - one non-cancelled booking item per slot

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Only panics on a poisoned lock

use mentorship_core::{
    Booking, BookingId, BookingItemStatus, BookingScope, BookingStatus, BookingStore,
    BookingWithItems, Cart, CartId, CartItem, CartItemDetails, CartItemId, CartItemStatus,
    CartStore, CloseOutcome, CommitError, MentorDirectory, MentorProfile, NewBooking, Slot,
    SlotFilter, SlotId, SlotStatus, SlotStore, StoreError, StoreFuture, TransitionError, UserId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Tables {
    mentors: HashMap<UserId, MentorProfile>,
    slots: HashMap<SlotId, Slot>,
    carts: HashMap<CartId, Cart>,
    // insertion order doubles as cart order
    cart_items: Vec<CartItem>,
    // insertion order; listings reverse it for newest first
    bookings: Vec<BookingWithItems>,
}

/// Single-lock implementation of every booking-core store port.
///
/// Cloning shares the underlying tables.
///
/// # Example
///
/// ```
/// use mentorship_testing::InMemoryStore;
///
/// let store = InMemoryStore::new();
/// assert_eq!(store.slot_count(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    fail_next_commit: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a mentor (or any user) profile.
    pub fn add_mentor(&self, profile: MentorProfile) {
        self.tables.lock().unwrap().mentors.insert(profile.user_id, profile);
    }

    /// Insert a slot directly, bypassing the 48-hour rule.
    ///
    /// Used to set up slots that are already inside the booking window.
    pub fn seed_slot(&self, slot: Slot) {
        self.tables.lock().unwrap().slots.insert(slot.id, slot);
    }

    /// Make the next `commit_group` call fail with a database error.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of slot rows.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.tables.lock().unwrap().slots.len()
    }

    /// Every cart item for `user_id`, whatever its status.
    #[must_use]
    pub fn cart_items_of(&self, user_id: UserId) -> Vec<CartItem> {
        self.tables
            .lock()
            .unwrap()
            .cart_items
            .iter()
            .filter(|item| item.user_id == user_id)
            .cloned()
            .collect()
    }

    /// Number of booking rows.
    #[must_use]
    pub fn booking_count(&self) -> usize {
        self.tables.lock().unwrap().bookings.len()
    }

    /// Number of non-cancelled booking items referencing `slot_id`.
    #[must_use]
    pub fn active_booking_items_for(&self, slot_id: SlotId) -> usize {
        self.tables
            .lock()
            .unwrap()
            .bookings
            .iter()
            .flat_map(|b| &b.items)
            .filter(|item| item.slot_id == slot_id && item.status != BookingItemStatus::Cancelled)
            .count()
    }
}

impl SlotStore for InMemoryStore {
    fn insert_slot(&self, slot: Slot) -> StoreFuture<'_, Result<Slot, StoreError>> {
        Box::pin(async move {
            let mut tables = self.tables.lock().unwrap();
            let taken = tables.slots.values().any(|existing| {
                existing.mentor_id == slot.mentor_id
                    && existing.date == slot.date
                    && existing.start_time == slot.start_time
            });
            if taken {
                return Err(StoreError::UniqueViolation(
                    "slots_mentor_date_start_key".to_string(),
                ));
            }
            tables.slots.insert(slot.id, slot.clone());
            Ok(slot)
        })
    }

    fn get_slot(&self, slot_id: SlotId) -> StoreFuture<'_, Result<Option<Slot>, StoreError>> {
        Box::pin(async move { Ok(self.tables.lock().unwrap().slots.get(&slot_id).cloned()) })
    }

    fn list_slots(
        &self,
        mentor_id: UserId,
        filter: SlotFilter,
    ) -> StoreFuture<'_, Result<Vec<Slot>, StoreError>> {
        Box::pin(async move {
            let tables = self.tables.lock().unwrap();
            let mut slots: Vec<Slot> = tables
                .slots
                .values()
                .filter(|slot| slot.mentor_id == mentor_id && filter.matches(slot))
                .cloned()
                .collect();
            slots.sort_by_key(|slot| (slot.date, slot.start_time));
            Ok(slots)
        })
    }

    fn close_slot(&self, slot_id: SlotId) -> StoreFuture<'_, Result<CloseOutcome, StoreError>> {
        Box::pin(async move {
            let mut tables = self.tables.lock().unwrap();
            let Some(slot) = tables.slots.get(&slot_id) else {
                return Ok(CloseOutcome::NotFound);
            };
            let status = slot.status;

            let referenced = tables
                .bookings
                .iter()
                .flat_map(|b| &b.items)
                .any(|item| item.slot_id == slot_id);
            if referenced {
                return Ok(CloseOutcome::HasBooking);
            }
            if status != SlotStatus::Available {
                return Ok(CloseOutcome::NotAvailable(status));
            }

            tables.slots.remove(&slot_id);
            tables.cart_items.retain(|item| item.slot_id != slot_id);
            Ok(CloseOutcome::Closed)
        })
    }
}

impl CartStore for InMemoryStore {
    fn find_cart(&self, user_id: UserId) -> StoreFuture<'_, Result<Option<Cart>, StoreError>> {
        Box::pin(async move {
            let tables = self.tables.lock().unwrap();
            Ok(tables.carts.values().find(|c| c.user_id == user_id).cloned())
        })
    }

    fn get_or_create_cart(&self, candidate: Cart) -> StoreFuture<'_, Result<Cart, StoreError>> {
        Box::pin(async move {
            let mut tables = self.tables.lock().unwrap();
            if let Some(existing) = tables.carts.values().find(|c| c.user_id == candidate.user_id) {
                return Ok(existing.clone());
            }
            tables.carts.insert(candidate.id, candidate.clone());
            Ok(candidate)
        })
    }

    fn has_active_item(
        &self,
        user_id: UserId,
        slot_id: SlotId,
    ) -> StoreFuture<'_, Result<bool, StoreError>> {
        Box::pin(async move {
            let tables = self.tables.lock().unwrap();
            Ok(tables.cart_items.iter().any(|item| {
                item.user_id == user_id
                    && item.slot_id == slot_id
                    && item.status == CartItemStatus::Active
            }))
        })
    }

    fn insert_item(&self, item: CartItem) -> StoreFuture<'_, Result<CartItem, StoreError>> {
        Box::pin(async move {
            let mut tables = self.tables.lock().unwrap();
            let duplicate = tables.cart_items.iter().any(|existing| {
                existing.user_id == item.user_id
                    && existing.slot_id == item.slot_id
                    && existing.status == CartItemStatus::Active
            });
            if duplicate {
                return Err(StoreError::UniqueViolation(
                    "cart_items_active_user_slot_idx".to_string(),
                ));
            }
            tables.cart_items.push(item.clone());
            Ok(item)
        })
    }

    fn get_item(&self, item_id: CartItemId) -> StoreFuture<'_, Result<Option<CartItem>, StoreError>> {
        Box::pin(async move {
            let tables = self.tables.lock().unwrap();
            Ok(tables.cart_items.iter().find(|item| item.id == item_id).cloned())
        })
    }

    fn delete_item(&self, item_id: CartItemId) -> StoreFuture<'_, Result<bool, StoreError>> {
        Box::pin(async move {
            let mut tables = self.tables.lock().unwrap();
            let before = tables.cart_items.len();
            tables.cart_items.retain(|item| item.id != item_id);
            Ok(tables.cart_items.len() < before)
        })
    }

    fn clear_cart(&self, cart_id: CartId) -> StoreFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move {
            let mut tables = self.tables.lock().unwrap();
            let before = tables.cart_items.len();
            tables.cart_items.retain(|item| item.cart_id != cart_id);
            Ok((before - tables.cart_items.len()) as u64)
        })
    }

    fn active_items(
        &self,
        user_id: UserId,
    ) -> StoreFuture<'_, Result<Vec<CartItemDetails>, StoreError>> {
        Box::pin(async move {
            let tables = self.tables.lock().unwrap();
            Ok(tables
                .cart_items
                .iter()
                .filter(|item| item.user_id == user_id && item.status == CartItemStatus::Active)
                .map(|item| CartItemDetails {
                    item: item.clone(),
                    mentor_name: tables.mentors.get(&item.mentor_id).map(|m| m.name.clone()),
                    slot_status: tables.slots.get(&item.slot_id).map(|s| s.status),
                })
                .collect())
        })
    }
}

impl BookingStore for InMemoryStore {
    fn commit_group(
        &self,
        new_booking: NewBooking,
    ) -> StoreFuture<'_, Result<BookingWithItems, CommitError>> {
        Box::pin(async move {
            if self.fail_next_commit.swap(false, Ordering::SeqCst) {
                return Err(CommitError::Store(StoreError::Database(
                    "injected commit failure".to_string(),
                )));
            }

            let mut tables = self.tables.lock().unwrap();

            for item in &new_booking.booking.items {
                let status = tables.slots.get(&item.slot_id).map(|s| s.status);
                if status != Some(SlotStatus::Available) {
                    return Err(CommitError::SlotUnavailable {
                        slot_id: item.slot_id,
                        status,
                    });
                }
                let double_booked = tables
                    .bookings
                    .iter()
                    .flat_map(|b| &b.items)
                    .any(|b| b.slot_id == item.slot_id && b.status != BookingItemStatus::Cancelled);
                if double_booked {
                    return Err(CommitError::SlotUnavailable {
                        slot_id: item.slot_id,
                        status,
                    });
                }
            }

            for item in &new_booking.booking.items {
                if let Some(slot) = tables.slots.get_mut(&item.slot_id) {
                    slot.status = SlotStatus::Booked;
                }
            }
            for cart_item in &mut tables.cart_items {
                if new_booking.cart_item_ids.contains(&cart_item.id) {
                    cart_item.status = CartItemStatus::CheckedOut;
                }
            }
            tables.bookings.push(new_booking.booking.clone());
            Ok(new_booking.booking)
        })
    }

    fn get_booking(
        &self,
        booking_id: BookingId,
    ) -> StoreFuture<'_, Result<Option<BookingWithItems>, StoreError>> {
        Box::pin(async move {
            let tables = self.tables.lock().unwrap();
            Ok(tables
                .bookings
                .iter()
                .find(|b| b.booking.id == booking_id)
                .cloned())
        })
    }

    fn list_bookings(
        &self,
        scope: BookingScope,
    ) -> StoreFuture<'_, Result<Vec<BookingWithItems>, StoreError>> {
        Box::pin(async move {
            let tables = self.tables.lock().unwrap();
            let mut bookings: Vec<BookingWithItems> = tables
                .bookings
                .iter()
                .rev()
                .filter(|b| match scope {
                    BookingScope::All => true,
                    BookingScope::Mentor(id) => b.booking.mentor_id == id,
                    BookingScope::Student(id) => b.booking.student_id == id,
                })
                .cloned()
                .collect();
            // stable: equal timestamps keep newest-inserted first
            bookings.sort_by(|a, b| b.booking.created_at.cmp(&a.booking.created_at));
            Ok(bookings)
        })
    }

    fn cancel_booking(
        &self,
        booking_id: BookingId,
    ) -> StoreFuture<'_, Result<BookingWithItems, TransitionError>> {
        Box::pin(async move {
            let mut guard = self.tables.lock().unwrap();
            let tables = &mut *guard;

            let Some(entry) = tables.bookings.iter_mut().find(|b| b.booking.id == booking_id) else {
                return Err(TransitionError::NotFound);
            };
            if entry.booking.status.is_terminal() {
                return Err(TransitionError::InvalidState(entry.booking.status));
            }

            entry.booking.status = BookingStatus::Cancelled;
            for item in &mut entry.items {
                item.status = BookingItemStatus::Cancelled;
                if let Some(slot) = tables.slots.get_mut(&item.slot_id) {
                    slot.status = SlotStatus::Available;
                }
            }
            Ok(entry.clone())
        })
    }

    fn update_booking_status(
        &self,
        booking_id: BookingId,
        allowed_from: &'static [BookingStatus],
        target: BookingStatus,
    ) -> StoreFuture<'_, Result<Booking, TransitionError>> {
        Box::pin(async move {
            let mut tables = self.tables.lock().unwrap();
            let Some(entry) = tables.bookings.iter_mut().find(|b| b.booking.id == booking_id) else {
                return Err(TransitionError::NotFound);
            };
            if !allowed_from.contains(&entry.booking.status) {
                return Err(TransitionError::InvalidState(entry.booking.status));
            }
            entry.booking.status = target;
            Ok(entry.booking.clone())
        })
    }
}

impl MentorDirectory for InMemoryStore {
    fn mentor_profile(
        &self,
        user_id: UserId,
    ) -> StoreFuture<'_, Result<Option<MentorProfile>, StoreError>> {
        Box::pin(async move { Ok(self.tables.lock().unwrap().mentors.get(&user_id).cloned()) })
    }
}
