//! Domain types for the mentorship booking core.
//!
//! Identifiers, value objects and the persisted entities (slots, carts,
//! bookings) shared by every store implementation and the HTTP layer.

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a platform user (student, mentor or admin)
    UserId
);
uuid_id!(
    /// Identifier of a bookable slot
    SlotId
);
uuid_id!(
    /// Identifier of a user's cart
    CartId
);
uuid_id!(
    /// Identifier of a cart line item
    CartItemId
);
uuid_id!(
    /// Identifier of a booking
    BookingId
);
uuid_id!(
    /// Identifier of a booking line item
    BookingItemId
);

// ============================================================================
// Value objects
// ============================================================================

/// Monetary amount in minor units (cents).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Create a new amount from cents
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Get the amount in cents
    #[must_use]
    pub const fn cents(&self) -> i64 {
        self.0
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, (self.0 % 100).abs())
    }
}

/// Rejected `HH:MM` slot time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotTimeError {
    /// Not a 24h `HH:MM` string.
    #[error("invalid time '{0}': expected HH:MM (24h)")]
    Format(String),

    /// Minutes other than :00 or :30.
    #[error("invalid time '{0}': slots start on the hour or half hour")]
    Alignment(String),
}

/// Start or end time of a slot, always on a half-hour boundary.
///
/// Serialized as a 24h `"HH:MM"` string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SlotTime(NaiveTime);

impl SlotTime {
    /// Parse a `"HH:MM"` string, rejecting anything not aligned to :00 or :30.
    ///
    /// # Errors
    ///
    /// Returns [`SlotTimeError`] for malformed or misaligned input.
    pub fn parse(raw: &str) -> Result<Self, SlotTimeError> {
        let trimmed = raw.trim();
        if trimmed.len() != 5 {
            return Err(SlotTimeError::Format(raw.to_string()));
        }
        let time = NaiveTime::parse_from_str(trimmed, "%H:%M")
            .map_err(|_| SlotTimeError::Format(raw.to_string()))?;
        Self::from_naive(time).map_err(|_| SlotTimeError::Alignment(raw.to_string()))
    }

    /// Wrap a `NaiveTime` that sits on a half-hour boundary.
    ///
    /// # Errors
    ///
    /// Returns [`SlotTimeError::Alignment`] if minutes are not 0 or 30, or
    /// seconds are set.
    pub fn from_naive(time: NaiveTime) -> Result<Self, SlotTimeError> {
        if (time.minute() == 0 || time.minute() == 30) && time.second() == 0 && time.nanosecond() == 0
        {
            Ok(Self(time))
        } else {
            Err(SlotTimeError::Alignment(time.format("%H:%M:%S").to_string()))
        }
    }

    /// The underlying `NaiveTime`
    #[must_use]
    pub const fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl TryFrom<String> for SlotTime {
    type Error = SlotTimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SlotTime> for String {
    fn from(value: SlotTime) -> Self {
        value.to_string()
    }
}

/// Role attached to an authenticated caller by the identity collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Student / regular user
    User,
    /// Mentor offering slots
    Mentor,
    /// Platform administrator
    Admin,
}

/// Unknown status or role string read from storage or a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Storage / wire representation
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ParseEnumError::new($kind, s)),
                }
            }
        }
    };
}

string_enum!(Role, "role", { User => "USER", Mentor => "MENTOR", Admin => "ADMIN" });

// ============================================================================
// Statuses
// ============================================================================

/// Slot lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotStatus {
    /// Open for holds and checkout
    Available,
    /// Consumed by a non-cancelled booking
    Booked,
    /// Withdrawn by the mentor
    Closed,
}

string_enum!(SlotStatus, "slot status", {
    Available => "AVAILABLE",
    Booked => "BOOKED",
    Closed => "CLOSED",
});

/// Cart line item status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartItemStatus {
    /// Live hold on a slot
    Active,
    /// Consumed by a successful checkout
    CheckedOut,
}

string_enum!(CartItemStatus, "cart item status", {
    Active => "ACTIVE",
    CheckedOut => "CHECKED_OUT",
});

/// Booking status.
///
/// ```text
/// PENDING ──► CONFIRMED ──► COMPLETED
///    │            │
///    └────────────┴──► CANCELLED
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Created by checkout
    Pending,
    /// Promoted by an external process
    Confirmed,
    /// Cancelled by student or mentor (terminal)
    Cancelled,
    /// Session took place (terminal)
    Completed,
}

string_enum!(BookingStatus, "booking status", {
    Pending => "PENDING",
    Confirmed => "CONFIRMED",
    Cancelled => "CANCELLED",
    Completed => "COMPLETED",
});

impl BookingStatus {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }

    /// Statuses a promotion to `self` may start from.
    ///
    /// Cancellation is handled separately and is not a promotion.
    #[must_use]
    pub const fn promotable_from(&self) -> &'static [Self] {
        match self {
            Self::Confirmed => &[Self::Pending],
            Self::Completed => &[Self::Pending, Self::Confirmed],
            Self::Pending | Self::Cancelled => &[],
        }
    }
}

/// Booking line item status; mirrors the parent booking's cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingItemStatus {
    /// Slot is held by the booking
    Confirmed,
    /// Released by cancellation
    Cancelled,
}

string_enum!(BookingItemStatus, "booking item status", {
    Confirmed => "CONFIRMED",
    Cancelled => "CANCELLED",
});

// ============================================================================
// Entities
// ============================================================================

/// A mentor's single bookable half-hour window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    /// Slot identifier
    pub id: SlotId,
    /// Owning mentor
    pub mentor_id: UserId,
    /// Calendar day (time-zone naive)
    pub date: NaiveDate,
    /// Start time
    pub start_time: SlotTime,
    /// Start time + 30 minutes
    pub end_time: SlotTime,
    /// Price snapshotted at creation
    pub price: Money,
    /// Current status
    pub status: SlotStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// A user's cart. One per user, created on first add.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Cart identifier
    pub id: CartId,
    /// Owner
    pub user_id: UserId,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// A time-limited hold on one slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Item identifier
    pub id: CartItemId,
    /// Parent cart
    pub cart_id: CartId,
    /// Owner
    pub user_id: UserId,
    /// Held slot
    pub slot_id: SlotId,
    /// Slot's mentor
    pub mentor_id: UserId,
    /// Slot date snapshot
    pub date: NaiveDate,
    /// Slot start snapshot
    pub start_time: SlotTime,
    /// Slot end snapshot
    pub end_time: SlotTime,
    /// Slot price snapshot
    pub price: Money,
    /// Hold status
    pub status: CartItemStatus,
    /// Hold expiry (creation + 30 minutes)
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    /// Whether the hold has lapsed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Cart item as listed to its owner, with live slot and mentor details.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemDetails {
    /// The hold itself
    #[serde(flatten)]
    pub item: CartItem,
    /// Mentor display name, if known
    pub mentor_name: Option<String>,
    /// Current slot status (`None` if the slot no longer exists)
    pub slot_status: Option<SlotStatus>,
}

/// A student's purchase of one or more slots from a single mentor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Booking identifier
    pub id: BookingId,
    /// Purchasing student
    pub student_id: UserId,
    /// Mentor of every item
    pub mentor_id: UserId,
    /// Sum of item prices
    pub total_price: Money,
    /// Current status
    pub status: BookingStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

/// One purchased slot within a booking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingItem {
    /// Item identifier
    pub id: BookingItemId,
    /// Parent booking
    pub booking_id: BookingId,
    /// Purchased slot
    pub slot_id: SlotId,
    /// Slot's mentor
    pub mentor_id: UserId,
    /// Slot date
    pub date: NaiveDate,
    /// Slot start
    pub start_time: SlotTime,
    /// Slot end
    pub end_time: SlotTime,
    /// Price paid
    pub price: Money,
    /// Item status
    pub status: BookingItemStatus,
}

/// A booking together with its items.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingWithItems {
    /// The booking
    #[serde(flatten)]
    pub booking: Booking,
    /// Its items in cart order
    pub items: Vec<BookingItem>,
}

/// Reference data about a mentor, owned by the profile collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorProfile {
    /// The mentor's user id
    pub user_id: UserId,
    /// Display name
    pub name: String,
    /// Role of the account
    pub role: Role,
    /// Whether an admin verified the mentor
    pub is_verified: bool,
    /// Mentor's own rate per slot
    pub price: Option<Money>,
    /// Rate of the mentor's category, used when the mentor has none
    pub category_price: Option<Money>,
}

impl MentorProfile {
    /// Rate for a new slot: own rate first, then the category rate.
    #[must_use]
    pub fn effective_price(&self) -> Option<Money> {
        self.price.or(self.category_price)
    }
}

/// Notification create request handed to the notification collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    /// Recipient
    pub user_id: UserId,
    /// Short title
    pub title: String,
    /// Body text
    pub message: String,
}

// ============================================================================
// Queries
// ============================================================================

/// Optional filters for slot listings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotFilter {
    /// Only slots in this status
    pub status: Option<SlotStatus>,
    /// Only slots on this day
    pub date: Option<NaiveDate>,
    /// Only slots on or after this day
    pub start_date: Option<NaiveDate>,
    /// Only slots on or before this day
    pub end_date: Option<NaiveDate>,
}

impl SlotFilter {
    /// Whether `slot` passes every set filter.
    #[must_use]
    pub fn matches(&self, slot: &Slot) -> bool {
        self.status.is_none_or(|s| s == slot.status)
            && self.date.is_none_or(|d| d == slot.date)
            && self.start_date.is_none_or(|d| slot.date >= d)
            && self.end_date.is_none_or(|d| slot.date <= d)
    }
}

/// Per-status slot counts returned alongside a mentor's own listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotStatusCounts {
    /// AVAILABLE slots
    pub available: usize,
    /// BOOKED slots
    pub booked: usize,
    /// CLOSED slots
    pub closed: usize,
    /// All slots in the listing
    pub total: usize,
}

impl SlotStatusCounts {
    /// Tally a listing.
    #[must_use]
    pub fn tally(slots: &[Slot]) -> Self {
        slots.iter().fold(Self::default(), |mut counts, slot| {
            match slot.status {
                SlotStatus::Available => counts.available += 1,
                SlotStatus::Booked => counts.booked += 1,
                SlotStatus::Closed => counts.closed += 1,
            }
            counts.total += 1;
            counts
        })
    }
}

/// Which bookings a listing covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BookingScope {
    /// Every booking (admin)
    All,
    /// Bookings where the user is the mentor
    Mentor(UserId),
    /// Bookings where the user is the student
    Student(UserId),
}
