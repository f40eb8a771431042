//! Row → domain conversions.
//!
//! Every column read goes through [`column`], so a type mismatch or an
//! unknown status string surfaces as `StoreError::Corrupt` instead of a panic.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use mentorship_core::{
    Booking, BookingId, BookingItem, BookingItemId, BookingWithItems, Cart, CartId, CartItem,
    CartItemDetails, CartItemId, Money, MentorProfile, Slot, SlotId, SlotStatus, SlotTime,
    StoreError, UserId,
};
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row};
use std::str::FromStr;
use uuid::Uuid;

/// Column list shared by every slot query.
pub(crate) const SLOT_COLUMNS: &str =
    "id, mentor_id, slot_date, start_time, end_time, price_cents, status, created_at";

/// Column list shared by every cart item query, prefixed with `ci.`.
pub(crate) const CART_ITEM_COLUMNS: &str = "ci.id, ci.cart_id, ci.user_id, ci.slot_id, \
     ci.mentor_id, ci.slot_date, ci.start_time, ci.end_time, ci.price_cents, ci.status, \
     ci.expires_at, ci.created_at";

/// Column list shared by every booking query.
pub(crate) const BOOKING_COLUMNS: &str =
    "id, student_id, mentor_id, total_price_cents, status, created_at, updated_at";

/// Column list shared by every booking item query.
pub(crate) const BOOKING_ITEM_COLUMNS: &str = "id, booking_id, slot_id, mentor_id, slot_date, \
     start_time, end_time, price_cents, status";

pub(crate) fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Corrupt(format!("column {name}: {e}")))
}

fn parsed<T>(row: &PgRow, name: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = column(row, name)?;
    raw.parse()
        .map_err(|e: T::Err| StoreError::Corrupt(format!("column {name}: {e}")))
}

fn slot_time(row: &PgRow, name: &str) -> Result<SlotTime, StoreError> {
    let time: NaiveTime = column(row, name)?;
    SlotTime::from_naive(time).map_err(|e| StoreError::Corrupt(format!("column {name}: {e}")))
}

fn money(row: &PgRow, name: &str) -> Result<Money, StoreError> {
    column::<i64>(row, name).map(Money::from_cents)
}

fn optional_money(row: &PgRow, name: &str) -> Result<Option<Money>, StoreError> {
    column::<Option<i64>>(row, name).map(|cents| cents.map(Money::from_cents))
}

fn uuid(row: &PgRow, name: &str) -> Result<Uuid, StoreError> {
    column(row, name)
}

pub(crate) fn slot(row: &PgRow) -> Result<Slot, StoreError> {
    Ok(Slot {
        id: SlotId::from_uuid(uuid(row, "id")?),
        mentor_id: UserId::from_uuid(uuid(row, "mentor_id")?),
        date: column::<NaiveDate>(row, "slot_date")?,
        start_time: slot_time(row, "start_time")?,
        end_time: slot_time(row, "end_time")?,
        price: money(row, "price_cents")?,
        status: parsed(row, "status")?,
        created_at: column::<DateTime<Utc>>(row, "created_at")?,
    })
}

pub(crate) fn cart(row: &PgRow) -> Result<Cart, StoreError> {
    Ok(Cart {
        id: CartId::from_uuid(uuid(row, "id")?),
        user_id: UserId::from_uuid(uuid(row, "user_id")?),
        created_at: column(row, "created_at")?,
    })
}

pub(crate) fn cart_item(row: &PgRow) -> Result<CartItem, StoreError> {
    Ok(CartItem {
        id: CartItemId::from_uuid(uuid(row, "id")?),
        cart_id: CartId::from_uuid(uuid(row, "cart_id")?),
        user_id: UserId::from_uuid(uuid(row, "user_id")?),
        slot_id: SlotId::from_uuid(uuid(row, "slot_id")?),
        mentor_id: UserId::from_uuid(uuid(row, "mentor_id")?),
        date: column(row, "slot_date")?,
        start_time: slot_time(row, "start_time")?,
        end_time: slot_time(row, "end_time")?,
        price: money(row, "price_cents")?,
        status: parsed(row, "status")?,
        expires_at: column(row, "expires_at")?,
        created_at: column(row, "created_at")?,
    })
}

/// A cart item joined with `mentor_name` and `slot_status`.
pub(crate) fn cart_item_details(row: &PgRow) -> Result<CartItemDetails, StoreError> {
    let slot_status = column::<Option<String>>(row, "slot_status")?
        .map(|raw| {
            raw.parse::<SlotStatus>()
                .map_err(|e| StoreError::Corrupt(format!("column slot_status: {e}")))
        })
        .transpose()?;

    Ok(CartItemDetails {
        item: cart_item(row)?,
        mentor_name: column(row, "mentor_name")?,
        slot_status,
    })
}

pub(crate) fn booking(row: &PgRow) -> Result<Booking, StoreError> {
    Ok(Booking {
        id: BookingId::from_uuid(uuid(row, "id")?),
        student_id: UserId::from_uuid(uuid(row, "student_id")?),
        mentor_id: UserId::from_uuid(uuid(row, "mentor_id")?),
        total_price: money(row, "total_price_cents")?,
        status: parsed(row, "status")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

pub(crate) fn booking_item(row: &PgRow) -> Result<BookingItem, StoreError> {
    Ok(BookingItem {
        id: BookingItemId::from_uuid(uuid(row, "id")?),
        booking_id: BookingId::from_uuid(uuid(row, "booking_id")?),
        slot_id: SlotId::from_uuid(uuid(row, "slot_id")?),
        mentor_id: UserId::from_uuid(uuid(row, "mentor_id")?),
        date: column(row, "slot_date")?,
        start_time: slot_time(row, "start_time")?,
        end_time: slot_time(row, "end_time")?,
        price: money(row, "price_cents")?,
        status: parsed(row, "status")?,
    })
}

/// Attach items to their bookings, keeping booking order.
pub(crate) fn with_items(bookings: Vec<Booking>, mut items: Vec<BookingItem>) -> Vec<BookingWithItems> {
    bookings
        .into_iter()
        .map(|booking| {
            let (mine, rest): (Vec<_>, Vec<_>) =
                items.drain(..).partition(|item| item.booking_id == booking.id);
            items = rest;
            BookingWithItems {
                booking,
                items: mine,
            }
        })
        .collect()
}

pub(crate) fn mentor_profile(row: &PgRow) -> Result<MentorProfile, StoreError> {
    Ok(MentorProfile {
        user_id: UserId::from_uuid(uuid(row, "id")?),
        name: column(row, "name")?,
        role: parsed(row, "role")?,
        is_verified: column(row, "is_verified")?,
        price: optional_money(row, "price_cents")?,
        category_price: optional_money(row, "category_price_cents")?,
    })
}
