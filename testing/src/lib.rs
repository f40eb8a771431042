//! # Mentorship Testing
//!
//! Test doubles and fixtures for the mentorship booking core.
//!
//! This crate provides:
//! - [`FixedClock`]: deterministic, manually advanced time
//! - [`InMemoryStore`]: every store port behind one lock
//! - [`RecordingNotifier`]: captures notifications, optionally failing
//! - [`BookingHarness`]: all services wired to the doubles
//!
//! ## Example
//!
//! ```ignore
//! use mentorship_testing::BookingHarness;
//!
//! #[tokio::test]
//! async fn student_books_a_slot() {
//!     let harness = BookingHarness::new();
//!     let mentor = harness.add_mentor("Ada");
//!     let slot = harness.seed_slot_in(mentor, 24);
//!
//!     harness.cart.add_item(student, slot.id).await.unwrap();
//!     let outcome = harness.engine.book_from_cart(student).await.unwrap();
//!     assert_eq!(outcome.bookings.len(), 1);
//! }
//! ```

pub mod fixtures;
pub mod in_memory;
pub mod notifications;

use chrono::{DateTime, Duration, Utc};
use mentorship_core::Clock;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Duration, Utc};
    use std::sync::{Arc, PoisonError, RwLock};

    /// Clock that only moves when told to.
    ///
    /// Clones share the same time, so a test can keep a handle and advance
    /// the clock the services read.
    ///
    /// # Example
    ///
    /// ```
    /// use mentorship_testing::mocks::FixedClock;
    /// use mentorship_core::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let before = clock.now();
    /// clock.advance(Duration::minutes(31));
    /// assert_eq!(clock.now() - before, Duration::minutes(31));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock at the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Jump to `time`.
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.write().unwrap_or_else(PoisonError::into_inner) = time;
        }

        /// Move forward by `by`.
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.write().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

pub use fixtures::BookingHarness;
pub use in_memory::InMemoryStore;
pub use mocks::{FixedClock, test_clock};
pub use notifications::RecordingNotifier;
