//! The 48-hour booking policy.
//!
//! Mentors open and close slots at least 48 hours ahead; students hold and
//! book a slot only inside the trailing 48 hours before it starts. All
//! functions are pure and take `now` from the caller, which reads its clock
//! once per operation.
//!
//! Slot dates and times are naive and interpreted as UTC.

use crate::types::SlotTime;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

/// Length of every slot.
pub const SLOT_LENGTH: Duration = Duration::minutes(30);

/// Lifetime of a cart hold.
pub const CART_HOLD: Duration = Duration::minutes(30);

/// Width of the booking window and of the open/close lead time.
pub const BOOKING_WINDOW: Duration = Duration::hours(48);

/// End of a slot starting at `start`.
///
/// The hour rolls over but the date does not: a slot at `23:30` ends at
/// `00:00` on the same calendar date.
#[must_use]
pub fn calculate_end_time(start: SlotTime) -> SlotTime {
    let (end, _wrapped_days) = start.as_naive().overflowing_add_signed(SLOT_LENGTH);
    // start is aligned to :00/:30, so start + 30min is too
    SlotTime::from_naive(end).unwrap_or(start)
}

/// Naive start instant of a slot.
#[must_use]
pub fn slot_datetime(date: NaiveDate, start: SlotTime) -> NaiveDateTime {
    date.and_time(start.as_naive())
}

fn until_start(date: NaiveDate, start: SlotTime, now: DateTime<Utc>) -> Duration {
    slot_datetime(date, start).and_utc() - now
}

/// True iff the slot starts 48 hours or more after `now`.
///
/// Gates opening and closing slots.
#[must_use]
pub fn is_at_least_48_hours_away(date: NaiveDate, start: SlotTime, now: DateTime<Utc>) -> bool {
    until_start(date, start, now) >= BOOKING_WINDOW
}

/// True iff the slot starts after `now` and no more than 48 hours later.
///
/// Gates adding to a cart and checkout.
#[must_use]
pub fn is_within_48_hours(date: NaiveDate, start: SlotTime, now: DateTime<Utc>) -> bool {
    let remaining = until_start(date, start, now);
    remaining > Duration::zero() && remaining <= BOOKING_WINDOW
}

/// True iff the slot's start is at or before `now`.
#[must_use]
pub fn has_started(date: NaiveDate, start: SlotTime, now: DateTime<Utc>) -> bool {
    until_start(date, start, now) <= Duration::zero()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn time(raw: &str) -> SlotTime {
        SlotTime::parse(raw).expect("valid slot time")
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).single().expect("valid instant")
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).expect("valid date")
    }

    #[test]
    fn end_time_adds_thirty_minutes() {
        assert_eq!(calculate_end_time(time("09:00")), time("09:30"));
        assert_eq!(calculate_end_time(time("09:30")), time("10:00"));
        assert_eq!(calculate_end_time(time("14:00")), time("14:30"));
    }

    #[test]
    fn end_time_wraps_midnight_without_moving_the_date() {
        assert_eq!(calculate_end_time(time("23:30")), time("00:00"));
    }

    #[test]
    fn at_least_48_hours_boundary_is_inclusive() {
        // exactly 48h after 2025-03-10 12:00
        assert!(is_at_least_48_hours_away(day(12), time("12:00"), now()));
        assert!(!is_at_least_48_hours_away(day(12), time("11:30"), now()));
        assert!(is_at_least_48_hours_away(day(12), time("14:00"), now()));
    }

    #[test]
    fn within_48_hours_excludes_past_and_far_future() {
        assert!(is_within_48_hours(day(12), time("12:00"), now()));
        assert!(is_within_48_hours(day(10), time("12:30"), now()));
        assert!(!is_within_48_hours(day(10), time("12:00"), now()));
        assert!(!is_within_48_hours(day(10), time("09:00"), now()));
        assert!(!is_within_48_hours(day(12), time("12:30"), now()));
    }

    #[test]
    fn has_started_at_start_instant() {
        assert!(has_started(day(10), time("12:00"), now()));
        assert!(!has_started(day(10), time("12:30"), now()));
    }

    proptest! {
        #[test]
        fn open_window_and_booking_window_only_share_the_boundary(offset_minutes in -6000i64..6000) {
            let start_instant = now() + Duration::minutes(offset_minutes * 30);
            let naive = start_instant.naive_utc();
            let start = SlotTime::from_naive(naive.time()).expect("aligned by construction");
            let openable = is_at_least_48_hours_away(naive.date(), start, now());
            let bookable = is_within_48_hours(naive.date(), start, now());
            let exactly_48h = start_instant - now() == BOOKING_WINDOW;
            prop_assert!(!(openable && bookable) || exactly_48h);
        }

        #[test]
        fn end_time_is_always_half_an_hour_later_modulo_a_day(half_hours in 0u32..48) {
            let start = SlotTime::from_naive(
                chrono::NaiveTime::from_hms_opt(half_hours / 2, (half_hours % 2) * 30, 0).expect("in range"),
            ).expect("aligned");
            let end = calculate_end_time(start);
            let delta = (end.as_naive() - start.as_naive()).num_minutes().rem_euclid(24 * 60);
            prop_assert_eq!(delta, 30);
        }
    }
}
