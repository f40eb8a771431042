//! Builders for common test data and a wired-up service harness.

#![allow(clippy::expect_used)] // Fixture inputs are hardcoded

use crate::in_memory::InMemoryStore;
use crate::mocks::{FixedClock, test_clock};
use crate::notifications::RecordingNotifier;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use mentorship_core::time_window::calculate_end_time;
use mentorship_core::{
    Booking, BookingEngine, BookingEnvironment, BookingId, BookingLifecycle, BookingStatus,
    BookingWithItems, CartService, Clock, Money, MentorProfile, Role, Slot, SlotId, SlotService,
    SlotStatus, SlotTime, UserId,
};
use std::sync::Arc;

/// Default slot price used by [`mentor`] and [`slot`]: 50.00
pub const DEFAULT_PRICE: Money = Money::from_cents(5000);

/// The instant [`test_clock`] starts at (2025-01-01 00:00:00 UTC).
#[must_use]
pub fn start_of_test() -> DateTime<Utc> {
    test_clock().now()
}

/// A calendar date.
///
/// # Panics
///
/// On an invalid date.
#[must_use]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture date")
}

/// A slot time from `"HH:MM"`.
///
/// # Panics
///
/// On a malformed or misaligned time.
#[must_use]
pub fn time(raw: &str) -> SlotTime {
    SlotTime::parse(raw).expect("valid fixture time")
}

/// A verified mentor with their own rate of [`DEFAULT_PRICE`].
#[must_use]
pub fn mentor(name: &str) -> MentorProfile {
    MentorProfile {
        user_id: UserId::new(),
        name: name.to_string(),
        role: Role::Mentor,
        is_verified: true,
        price: Some(DEFAULT_PRICE),
        category_price: None,
    }
}

/// A plain user profile (not a mentor).
#[must_use]
pub fn student(name: &str) -> MentorProfile {
    MentorProfile {
        role: Role::User,
        is_verified: false,
        price: None,
        ..mentor(name)
    }
}

/// An AVAILABLE slot priced at [`DEFAULT_PRICE`].
#[must_use]
pub fn slot(mentor_id: UserId, date: NaiveDate, start: &str) -> Slot {
    let start_time = time(start);
    Slot {
        id: SlotId::new(),
        mentor_id,
        date,
        start_time,
        end_time: calculate_end_time(start_time),
        price: DEFAULT_PRICE,
        status: SlotStatus::Available,
        created_at: start_of_test(),
    }
}

/// A PENDING booking with no items.
#[must_use]
pub fn empty_booking(student_id: UserId, mentor_id: UserId) -> BookingWithItems {
    BookingWithItems {
        booking: Booking {
            id: BookingId::new(),
            student_id,
            mentor_id,
            total_price: Money::ZERO,
            status: BookingStatus::Pending,
            created_at: start_of_test(),
            updated_at: start_of_test(),
        },
        items: Vec::new(),
    }
}

/// Every service wired to one [`InMemoryStore`], a [`FixedClock`] and a
/// [`RecordingNotifier`].
///
/// The clock starts at [`start_of_test`]; move it with `clock.advance`.
///
/// # Example
///
/// ```
/// use mentorship_testing::BookingHarness;
///
/// let harness = BookingHarness::new();
/// let ada = harness.add_mentor("Ada");
/// assert_eq!(harness.store.slot_count(), 0);
/// # let _ = ada;
/// ```
#[derive(Clone)]
pub struct BookingHarness {
    /// Backing store
    pub store: Arc<InMemoryStore>,
    /// Controllable time
    pub clock: Arc<FixedClock>,
    /// Captured notifications
    pub notifier: Arc<RecordingNotifier>,
    /// The environment handed to every service
    pub env: BookingEnvironment,
    /// Slot management
    pub slots: SlotService,
    /// Cart holds
    pub cart: CartService,
    /// Checkout
    pub engine: BookingEngine,
    /// Cancellation, listings, promotion
    pub lifecycle: BookingLifecycle,
}

impl BookingHarness {
    /// Wire a fresh harness.
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryStore::new()))
    }

    /// Wire a harness around an existing store.
    #[must_use]
    pub fn with_store(store: Arc<InMemoryStore>) -> Self {
        let clock = Arc::new(test_clock());
        let notifier = Arc::new(RecordingNotifier::new());
        let env = BookingEnvironment::from_store(store.clone(), clock.clone(), notifier.clone());
        Self::from_parts(store, clock, notifier, env)
    }

    /// Wire services around a caller-built environment.
    ///
    /// Used when a test swaps one port for a wrapper.
    #[must_use]
    pub fn from_parts(
        store: Arc<InMemoryStore>,
        clock: Arc<FixedClock>,
        notifier: Arc<RecordingNotifier>,
        env: BookingEnvironment,
    ) -> Self {
        Self {
            slots: SlotService::new(env.clone()),
            cart: CartService::new(env.clone()),
            engine: BookingEngine::new(env.clone()),
            lifecycle: BookingLifecycle::new(env.clone()),
            store,
            clock,
            notifier,
            env,
        }
    }

    /// Seed a verified mentor and return their id.
    #[must_use]
    pub fn add_mentor(&self, name: &str) -> UserId {
        let profile = mentor(name);
        let id = profile.user_id;
        self.store.add_mentor(profile);
        id
    }

    /// Seed an AVAILABLE slot starting `hours_ahead` hours from the clock's
    /// current time, bypassing the open-time lead rule.
    ///
    /// # Panics
    ///
    /// If the resulting start is not on a half-hour boundary.
    #[must_use]
    pub fn seed_slot_in(&self, mentor_id: UserId, hours_ahead: i64) -> Slot {
        let start = self.clock.now() + Duration::hours(hours_ahead);
        let start_time =
            SlotTime::from_naive(start.time()).expect("clock sits on a half-hour boundary");
        let slot = Slot {
            date: start.date_naive(),
            start_time,
            end_time: calculate_end_time(start_time),
            ..slot(mentor_id, start.date_naive(), "00:00")
        };
        self.store.seed_slot(slot.clone());
        slot
    }
}

impl Default for BookingHarness {
    fn default() -> Self {
        Self::new()
    }
}
