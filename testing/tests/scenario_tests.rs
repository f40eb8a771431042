//! End-to-end walks through the slot → cart → booking → cancel lifecycle.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)] // Test code can use unwrap/expect/panic

use chrono::{DateTime, Duration, Utc};
use mentorship_core::{
    BookingStatus, CartError, CheckoutError, Clock, RejectionReason, SlotError, SlotStatus,
    SlotStore, UserId,
};
use mentorship_testing::fixtures::{date, time};
use mentorship_testing::BookingHarness;

fn at(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
}

#[tokio::test]
async fn open_hold_and_duplicate_attempts() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");
    let student = UserId::new();

    // 50 hours before 2025-01-03 14:00
    harness.clock.set(at("2025-01-01T12:00:00Z"));
    let slot = harness
        .slots
        .open(mentor, date(2025, 1, 3), time("14:00"))
        .await
        .unwrap();
    assert_eq!(slot.end_time, time("14:30"));
    assert_eq!(slot.status, SlotStatus::Available);

    assert_eq!(
        harness.slots.open(mentor, date(2025, 1, 3), time("14:00")).await,
        Err(SlotError::SlotConflict)
    );

    // 46 hours before the slot
    harness.clock.set(at("2025-01-01T16:00:00Z"));
    let item = harness.cart.add_item(student, slot.id).await.unwrap();
    assert_eq!(item.expires_at, harness.clock.now() + Duration::minutes(30));

    assert!(matches!(
        harness.cart.add_item(student, slot.id).await,
        Err(CartError::AlreadyInCart)
    ));
}

#[tokio::test]
async fn concurrent_checkouts_of_one_slot() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");
    let (alice, bob) = (UserId::new(), UserId::new());
    let slot = harness.seed_slot_in(mentor, 30);
    harness.cart.add_item(alice, slot.id).await.unwrap();
    harness.cart.add_item(bob, slot.id).await.unwrap();

    let alice_engine = harness.engine.clone();
    let bob_engine = harness.engine.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { alice_engine.book_from_cart(alice).await }),
        tokio::spawn(async move { bob_engine.book_from_cart(bob).await })
    );
    let results = [a.unwrap(), b.unwrap()];

    let booked: usize = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|o| o.bookings.len())
        .sum();
    assert_eq!(booked, 1);

    let rejected: Vec<_> = results
        .iter()
        .filter_map(|r| match r {
            Err(CheckoutError::AllItemsInvalid(errors)) => Some(errors),
            _ => None,
        })
        .collect();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].len(), 1);
    assert_eq!(rejected[0][0].reason, RejectionReason::AlreadyBooked);
}

#[tokio::test]
async fn untouched_hold_expires_after_thirty_one_minutes() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");
    let student = UserId::new();
    let slot = harness.seed_slot_in(mentor, 30);
    harness.cart.add_item(student, slot.id).await.unwrap();

    harness.clock.advance(Duration::minutes(31));

    let result = harness.engine.book_from_cart(student).await;
    let Err(CheckoutError::AllItemsInvalid(errors)) = result else {
        panic!("expected the hold to be rejected, got {result:?}");
    };
    assert_eq!(errors[0].reason, RejectionReason::Expired);
    assert_eq!(harness.store.booking_count(), 0);
    assert_eq!(
        harness.store.get_slot(slot.id).await.unwrap().unwrap().status,
        SlotStatus::Available
    );
}

#[tokio::test]
async fn mentor_cancels_a_confirmed_booking_hours_before() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");
    let student = UserId::new();
    let slot = harness.seed_slot_in(mentor, 30);
    harness.cart.add_item(student, slot.id).await.unwrap();
    let outcome = harness.engine.book_from_cart(student).await.unwrap();
    let booking_id = outcome.bookings[0].booking.id;
    harness
        .lifecycle
        .transition(booking_id, BookingStatus::Confirmed)
        .await
        .unwrap();

    harness.clock.advance(Duration::hours(25));
    let cancelled = harness.lifecycle.cancel(mentor, booking_id).await.unwrap();

    assert_eq!(cancelled.booking.status, BookingStatus::Cancelled);
    assert_eq!(
        harness.store.get_slot(slot.id).await.unwrap().unwrap().status,
        SlotStatus::Available
    );
    harness.notifier.wait_for(2).await;
    assert_eq!(harness.notifier.sent_to(student).len(), 1);

    assert_eq!(
        harness.lifecycle.cancel(mentor, booking_id).await,
        Err(mentorship_core::CancelError::AlreadyCancelled)
    );
}
