//! Injected dependencies.
//!
//! All external dependencies of the services are abstracted behind traits and
//! injected through [`BookingEnvironment`], so the same service code runs
//! against PostgreSQL in production and the in-memory doubles in tests.

use crate::store::{BookingStore, CartStore, MentorDirectory, NotificationSink, SlotStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Clock trait - abstracts time operations for testability
///
/// # Examples
///
/// ```ignore
/// // Production - uses system clock
/// let clock = SystemClock;
///
/// // Test - fixed time for deterministic tests
/// let clock = FixedClock::new(Utc::now());
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Everything the slot, cart and booking services need from the outside world.
///
/// Cloning is cheap (every field is an `Arc`).
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Time source, read once per operation
    pub clock: Arc<dyn Clock>,
    /// Slot persistence
    pub slots: Arc<dyn SlotStore>,
    /// Cart persistence
    pub carts: Arc<dyn CartStore>,
    /// Booking persistence and the atomic checkout/cancel units
    pub bookings: Arc<dyn BookingStore>,
    /// Mentor reference data
    pub mentors: Arc<dyn MentorDirectory>,
    /// Notification collaborator
    pub notifier: Arc<dyn NotificationSink>,
}

impl BookingEnvironment {
    /// Wire a single store that implements every persistence port.
    ///
    /// This is the normal production and test setup: one PostgreSQL pool or
    /// one in-memory store backs all four data ports.
    #[must_use]
    pub fn from_store<S>(store: Arc<S>, clock: Arc<dyn Clock>, notifier: Arc<dyn NotificationSink>) -> Self
    where
        S: SlotStore + CartStore + BookingStore + MentorDirectory + 'static,
    {
        Self {
            clock,
            slots: store.clone(),
            carts: store.clone(),
            bookings: store.clone(),
            mentors: store,
            notifier,
        }
    }
}
