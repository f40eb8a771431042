//! Checkout: turning a cart into bookings.
//!
//! # Algorithm
//!
//! ```text
//! ACTIVE cart items
//!     │  validate each independently (expiry, window, live slot status)
//!     ├──────────────► rejections (informational)
//!     ▼
//! valid items grouped by mentor (first-seen order)
//!     │  one atomic commit per group:
//!     │    lock slots → re-check AVAILABLE → booking + items
//!     │    → slots BOOKED → cart items CHECKED_OUT
//!     ├──────────────► lost race / store failure: group rejected, others unaffected
//!     ▼
//! bookings + rejections
//! ```
//!
//! The plain-read validation only produces friendly reasons. The commit's
//! locked re-check is what guarantees that two concurrent checkouts never
//! both book the same slot.

use crate::environment::BookingEnvironment;
use crate::error::CheckoutError;
use crate::metrics;
use crate::notify;
use crate::store::{CommitError, NewBooking, StoreError};
use crate::time_window::is_within_48_hours;
use crate::types::{
    Booking, BookingId, BookingItem, BookingItemId, BookingItemStatus, BookingStatus,
    BookingWithItems, CartItem, CartItemId, Money, SlotId, SlotStatus, SlotTime, UserId,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Why a cart item was not booked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionReason {
    /// The 30-minute hold lapsed
    Expired,
    /// The slot is in the past or more than 48 hours away
    #[serde(rename = "too-late-or-too-early")]
    OutsideWindow,
    /// The slot no longer exists
    SlotGone,
    /// The slot is booked by someone else
    AlreadyBooked,
    /// The mentor closed the slot
    SlotClosed,
    /// The item was valid but its mentor group could not be committed
    TransactionAborted,
}

impl RejectionReason {
    /// Wire representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::OutsideWindow => "too-late-or-too-early",
            Self::SlotGone => "slot-gone",
            Self::AlreadyBooked => "already-booked",
            Self::SlotClosed => "slot-closed",
            Self::TransactionAborted => "transaction-aborted",
        }
    }

    fn for_slot_status(status: Option<SlotStatus>) -> Self {
        match status {
            None => Self::SlotGone,
            Some(SlotStatus::Closed) => Self::SlotClosed,
            // AVAILABLE here means the active-item index caught a booking the
            // status had not reflected yet
            Some(SlotStatus::Booked | SlotStatus::Available) => Self::AlreadyBooked,
        }
    }
}

/// Slot data as the cart item captured it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSnapshot {
    /// Slot identifier
    pub slot_id: SlotId,
    /// Slot's mentor
    pub mentor_id: UserId,
    /// Slot date
    pub date: NaiveDate,
    /// Slot start
    pub start_time: SlotTime,
    /// Slot end
    pub end_time: SlotTime,
    /// Held price
    pub price: Money,
}

/// A cart item checkout refused, with the reason.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRejection {
    /// The rejected item
    pub cart_item_id: CartItemId,
    /// Why
    pub reason: RejectionReason,
    /// What the item was holding
    pub slot: SlotSnapshot,
}

impl CartItemRejection {
    fn new(item: &CartItem, reason: RejectionReason) -> Self {
        Self {
            cart_item_id: item.id,
            reason,
            slot: SlotSnapshot {
                slot_id: item.slot_id,
                mentor_id: item.mentor_id,
                date: item.date,
                start_time: item.start_time,
                end_time: item.end_time,
                price: item.price,
            },
        }
    }
}

/// Result of a checkout that booked at least one mentor group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOutcome {
    /// One booking per committed mentor group, in first-seen mentor order
    pub bookings: Vec<BookingWithItems>,
    /// Items that were not booked
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<CartItemRejection>,
}

/// Valid cart items grouped by mentor.
///
/// Mentors appear in the order their first item appears; items keep cart
/// order within a group.
#[must_use]
pub fn group_by_mentor(items: Vec<CartItem>) -> Vec<(UserId, Vec<CartItem>)> {
    let mut groups: Vec<(UserId, Vec<CartItem>)> = Vec::new();
    for item in items {
        match groups.iter_mut().find(|(mentor_id, _)| *mentor_id == item.mentor_id) {
            Some((_, group)) => group.push(item),
            None => groups.push((item.mentor_id, vec![item])),
        }
    }
    groups
}

/// Orchestrates checkout.
#[derive(Clone)]
pub struct BookingEngine {
    env: BookingEnvironment,
}

impl BookingEngine {
    /// Create a new booking engine.
    #[must_use]
    pub const fn new(env: BookingEnvironment) -> Self {
        Self { env }
    }

    /// Book every valid ACTIVE item in the user's cart, one booking per mentor.
    ///
    /// Partial success is normal: the outcome carries the created bookings
    /// and a rejection for every item that was not booked.
    ///
    /// # Errors
    ///
    /// - `EmptyCart`: no cart or no ACTIVE items; nothing happens
    /// - `AllItemsInvalid`: no group was committed; carries every rejection
    /// - `Store`: storage failed while reading the cart or its slots
    #[tracing::instrument(skip(self), fields(%user_id))]
    pub async fn book_from_cart(&self, user_id: UserId) -> Result<CheckoutOutcome, CheckoutError> {
        let now = self.env.clock.now();

        let items: Vec<CartItem> = self
            .env
            .carts
            .active_items(user_id)
            .await?
            .into_iter()
            .map(|details| details.item)
            .collect();

        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut errors = Vec::new();
        let mut valid = Vec::with_capacity(items.len());
        for item in items {
            match self.validate(&item, now).await? {
                None => valid.push(item),
                Some(reason) => {
                    tracing::debug!(cart_item_id = %item.id, reason = reason.as_str(), "Cart item rejected");
                    errors.push(CartItemRejection::new(&item, reason));
                }
            }
        }

        if valid.is_empty() {
            record_rejections(&errors);
            return Err(CheckoutError::AllItemsInvalid(errors));
        }

        let groups = group_by_mentor(valid);
        metrics::record_checkout_groups(groups.len());

        let mut bookings = Vec::with_capacity(groups.len());
        for (mentor_id, group) in groups {
            match self.commit(user_id, mentor_id, &group, now).await {
                Ok(booking) => {
                    let slots = booking.items.len();
                    notify::dispatch(
                        &self.env.notifier,
                        mentor_id,
                        "New booking",
                        format!("You have a new booking for {slots} slot(s)."),
                    );
                    bookings.push(booking);
                }
                Err(rejections) => errors.extend(rejections),
            }
        }

        record_rejections(&errors);

        if bookings.is_empty() {
            return Err(CheckoutError::AllItemsInvalid(errors));
        }

        tracing::info!(
            bookings = bookings.len(),
            rejected = errors.len(),
            "Checkout completed"
        );
        Ok(CheckoutOutcome { bookings, errors })
    }

    /// First failing rule, or `None` if the item may be booked.
    async fn validate(
        &self,
        item: &CartItem,
        now: DateTime<Utc>,
    ) -> Result<Option<RejectionReason>, StoreError> {
        if item.is_expired(now) {
            return Ok(Some(RejectionReason::Expired));
        }

        if !is_within_48_hours(item.date, item.start_time, now) {
            return Ok(Some(RejectionReason::OutsideWindow));
        }

        let reason = match self.env.slots.get_slot(item.slot_id).await? {
            None => Some(RejectionReason::SlotGone),
            Some(slot) => match slot.status {
                SlotStatus::Available => None,
                SlotStatus::Booked => Some(RejectionReason::AlreadyBooked),
                SlotStatus::Closed => Some(RejectionReason::SlotClosed),
            },
        };
        Ok(reason)
    }

    /// Commit one mentor group, or explain every item of it.
    async fn commit(
        &self,
        student_id: UserId,
        mentor_id: UserId,
        group: &[CartItem],
        now: DateTime<Utc>,
    ) -> Result<BookingWithItems, Vec<CartItemRejection>> {
        let new_booking = build_booking(student_id, mentor_id, group, now);

        match self.env.bookings.commit_group(new_booking).await {
            Ok(booking) => {
                metrics::record_booking("created");
                metrics::record_booked_slots(booking.items.len());
                tracing::info!(
                    booking_id = %booking.booking.id,
                    %mentor_id,
                    slots = booking.items.len(),
                    total = %booking.booking.total_price,
                    "Booking created"
                );
                Ok(booking)
            }
            Err(CommitError::SlotUnavailable { slot_id, status }) => {
                tracing::info!(%mentor_id, %slot_id, ?status, "Slot lost to a concurrent checkout");
                let raced = RejectionReason::for_slot_status(status);
                Err(group
                    .iter()
                    .map(|item| {
                        let reason = if item.slot_id == slot_id {
                            raced
                        } else {
                            RejectionReason::TransactionAborted
                        };
                        CartItemRejection::new(item, reason)
                    })
                    .collect())
            }
            Err(CommitError::Store(error)) => {
                tracing::error!(%mentor_id, %error, "Checkout transaction failed");
                Err(group
                    .iter()
                    .map(|item| CartItemRejection::new(item, RejectionReason::TransactionAborted))
                    .collect())
            }
        }
    }
}

fn build_booking(
    student_id: UserId,
    mentor_id: UserId,
    group: &[CartItem],
    now: DateTime<Utc>,
) -> NewBooking {
    let booking_id = BookingId::new();

    let items: Vec<BookingItem> = group
        .iter()
        .map(|item| BookingItem {
            id: BookingItemId::new(),
            booking_id,
            slot_id: item.slot_id,
            mentor_id,
            date: item.date,
            start_time: item.start_time,
            end_time: item.end_time,
            price: item.price,
            status: BookingItemStatus::Confirmed,
        })
        .collect();

    NewBooking {
        booking: BookingWithItems {
            booking: Booking {
                id: booking_id,
                student_id,
                mentor_id,
                total_price: items.iter().map(|i| i.price).sum(),
                status: BookingStatus::Pending,
                created_at: now,
                updated_at: now,
            },
            items,
        },
        cart_item_ids: group.iter().map(|item| item.id).collect(),
    }
}

fn record_rejections(errors: &[CartItemRejection]) {
    for rejection in errors {
        metrics::record_checkout_rejection(rejection.reason.as_str());
    }
}
