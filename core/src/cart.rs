//! Cart holds.
//!
//! A hold never changes the slot's status; it only reserves the user's intent
//! for 30 minutes. Checkout is what consumes slots.

use crate::environment::BookingEnvironment;
use crate::error::CartError;
use crate::metrics;
use crate::store::StoreError;
use crate::time_window::{is_within_48_hours, CART_HOLD};
use crate::types::{
    Cart, CartId, CartItem, CartItemDetails, CartItemId, CartItemStatus, Money, SlotId,
    SlotStatus, UserId,
};
use serde::Serialize;

/// A user's active holds with totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartContents {
    /// ACTIVE items in insertion order
    pub items: Vec<CartItemDetails>,
    /// Number of items
    pub total_items: usize,
    /// Sum of item prices
    pub total_price: Money,
}

/// Manages a user's cart.
#[derive(Clone)]
pub struct CartService {
    env: BookingEnvironment,
}

impl CartService {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(env: BookingEnvironment) -> Self {
        Self { env }
    }

    /// Hold `slot_id` for `user_id` for the next 30 minutes.
    ///
    /// # Errors
    ///
    /// - `SlotNotFound`
    /// - `NotAvailable`: the slot is booked or closed
    /// - `OutsideBookingWindow`: the slot is in the past or more than 48h away
    /// - `AlreadyInCart`: the user already holds this slot
    #[tracing::instrument(skip(self), fields(%user_id, %slot_id))]
    pub async fn add_item(&self, user_id: UserId, slot_id: SlotId) -> Result<CartItem, CartError> {
        let now = self.env.clock.now();

        let slot = self
            .env
            .slots
            .get_slot(slot_id)
            .await?
            .ok_or(CartError::SlotNotFound)?;

        if slot.status != SlotStatus::Available {
            return Err(CartError::NotAvailable(slot.status));
        }

        if !is_within_48_hours(slot.date, slot.start_time, now) {
            return Err(CartError::OutsideBookingWindow);
        }

        if self.env.carts.has_active_item(user_id, slot_id).await? {
            return Err(CartError::AlreadyInCart);
        }

        let cart = self
            .env
            .carts
            .get_or_create_cart(Cart {
                id: CartId::new(),
                user_id,
                created_at: now,
            })
            .await?;

        let item = CartItem {
            id: CartItemId::new(),
            cart_id: cart.id,
            user_id,
            slot_id,
            mentor_id: slot.mentor_id,
            date: slot.date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            price: slot.price,
            status: CartItemStatus::Active,
            expires_at: now + CART_HOLD,
            created_at: now,
        };

        let item = self.env.carts.insert_item(item).await.map_err(|e| match e {
            StoreError::UniqueViolation(_) => CartError::AlreadyInCart,
            other => CartError::Store(other),
        })?;

        metrics::record_cart_items("added", 1);
        tracing::debug!(cart_item_id = %item.id, expires_at = %item.expires_at, "Slot held in cart");
        Ok(item)
    }

    /// Remove one of the caller's cart items.
    ///
    /// # Errors
    ///
    /// - `ItemNotFound`
    /// - `Forbidden`: the item belongs to another user
    #[tracing::instrument(skip(self), fields(%user_id, %item_id))]
    pub async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<(), CartError> {
        let item = self
            .env
            .carts
            .get_item(item_id)
            .await?
            .ok_or(CartError::ItemNotFound)?;

        if item.user_id != user_id {
            return Err(CartError::Forbidden);
        }

        if !self.env.carts.delete_item(item_id).await? {
            return Err(CartError::ItemNotFound);
        }

        metrics::record_cart_items("removed", 1);
        Ok(())
    }

    /// Delete every item in the caller's cart.
    ///
    /// Returns the number removed; clearing an empty cart returns 0.
    ///
    /// # Errors
    ///
    /// `CartNotFound` if the user has never had a cart.
    #[tracing::instrument(skip(self), fields(%user_id))]
    pub async fn clear(&self, user_id: UserId) -> Result<u64, CartError> {
        let cart = self
            .env
            .carts
            .find_cart(user_id)
            .await?
            .ok_or(CartError::CartNotFound)?;

        let deleted = self.env.carts.clear_cart(cart.id).await?;
        metrics::record_cart_items("cleared", deleted);
        Ok(deleted)
    }

    /// The caller's ACTIVE holds. A user without a cart gets an empty listing.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Store` if the cart cannot be read.
    pub async fn list_items(&self, user_id: UserId) -> Result<CartContents, CartError> {
        let items = self.env.carts.active_items(user_id).await?;
        let total_price = items.iter().map(|d| d.item.price).sum();

        Ok(CartContents {
            total_items: items.len(),
            total_price,
            items,
        })
    }
}
