//! Checkout against the in-memory store.
//!
//! Covers validation reasons, grouping by mentor, partial success, and the
//! locked re-check that keeps concurrent checkouts from double-booking.
//!
//! Run with: `cargo test --test checkout_tests -- --nocapture`

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)] // Test code can use unwrap/expect/panic

use chrono::Duration;
use mentorship_core::{
    BookingEngine, BookingEnvironment, BookingItemStatus, BookingStatus, CartItemStatus,
    CartStore, CheckoutError, CloseOutcome, Money, NotificationRequest, NotificationSink,
    RejectionReason, Slot, SlotFilter, SlotId, SlotStatus, SlotStore, StoreError, StoreFuture,
    UserId,
};
use mentorship_testing::{BookingHarness, InMemoryStore};
use std::sync::Arc;

/// Slot reads that always report AVAILABLE, as if every read happened just
/// before a competing checkout committed.
///
/// Forces checkout past its plain-read validation so the store's locked
/// re-check is the only thing standing between two students and one slot.
struct StaleSlotReads(Arc<InMemoryStore>);

impl SlotStore for StaleSlotReads {
    fn insert_slot(&self, slot: Slot) -> StoreFuture<'_, Result<Slot, StoreError>> {
        self.0.insert_slot(slot)
    }

    fn get_slot(&self, slot_id: SlotId) -> StoreFuture<'_, Result<Option<Slot>, StoreError>> {
        Box::pin(async move {
            let slot = self.0.get_slot(slot_id).await?;
            Ok(slot.map(|s| Slot {
                status: SlotStatus::Available,
                ..s
            }))
        })
    }

    fn list_slots(
        &self,
        mentor_id: UserId,
        filter: SlotFilter,
    ) -> StoreFuture<'_, Result<Vec<Slot>, StoreError>> {
        self.0.list_slots(mentor_id, filter)
    }

    fn close_slot(&self, slot_id: SlotId) -> StoreFuture<'_, Result<CloseOutcome, StoreError>> {
        self.0.close_slot(slot_id)
    }
}

fn stale_read_harness() -> BookingHarness {
    let base = BookingHarness::new();
    let env = BookingEnvironment {
        slots: Arc::new(StaleSlotReads(base.store.clone())),
        ..base.env.clone()
    };
    BookingHarness::from_parts(base.store, base.clock, base.notifier, env)
}

#[tokio::test]
async fn single_item_checkout_books_the_slot() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");
    let student = UserId::new();
    let slot = harness.seed_slot_in(mentor, 24);
    let item = harness.cart.add_item(student, slot.id).await.unwrap();

    let outcome = harness.engine.book_from_cart(student).await.unwrap();

    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.bookings.len(), 1);
    let booking = &outcome.bookings[0];
    assert_eq!(booking.booking.status, BookingStatus::Pending);
    assert_eq!(booking.booking.student_id, student);
    assert_eq!(booking.booking.mentor_id, mentor);
    assert_eq!(booking.booking.total_price, slot.price);
    assert_eq!(booking.items.len(), 1);
    assert_eq!(booking.items[0].status, BookingItemStatus::Confirmed);
    assert_eq!(booking.items[0].slot_id, slot.id);

    let stored = harness.store.get_slot(slot.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SlotStatus::Booked);

    let cart_items = harness.store.cart_items_of(student);
    assert_eq!(cart_items.len(), 1);
    assert_eq!(cart_items[0].id, item.id);
    assert_eq!(cart_items[0].status, CartItemStatus::CheckedOut);
}

#[tokio::test]
async fn empty_cart_is_rejected_without_side_effects() {
    let harness = BookingHarness::new();
    let student = UserId::new();

    assert!(matches!(
        harness.engine.book_from_cart(student).await,
        Err(CheckoutError::EmptyCart)
    ));

    // a cart whose items were all checked out is empty too
    let mentor = harness.add_mentor("Ada");
    let slot = harness.seed_slot_in(mentor, 24);
    harness.cart.add_item(student, slot.id).await.unwrap();
    harness.engine.book_from_cart(student).await.unwrap();

    assert!(matches!(
        harness.engine.book_from_cart(student).await,
        Err(CheckoutError::EmptyCart)
    ));
    assert_eq!(harness.store.booking_count(), 1);
}

#[tokio::test]
async fn items_are_grouped_into_one_booking_per_mentor() {
    let harness = BookingHarness::new();
    let ada = harness.add_mentor("Ada");
    let grace = harness.add_mentor("Grace");
    let student = UserId::new();

    let a1 = harness.seed_slot_in(ada, 10);
    let g1 = harness.seed_slot_in(grace, 11);
    let a2 = harness.seed_slot_in(ada, 12);
    for slot in [&a1, &g1, &a2] {
        harness.cart.add_item(student, slot.id).await.unwrap();
    }

    let outcome = harness.engine.book_from_cart(student).await.unwrap();

    assert!(outcome.errors.is_empty());
    assert_eq!(outcome.bookings.len(), 2);
    assert_eq!(outcome.bookings[0].booking.mentor_id, ada);
    assert_eq!(
        outcome.bookings[0].items.iter().map(|i| i.slot_id).collect::<Vec<_>>(),
        vec![a1.id, a2.id]
    );
    assert_eq!(outcome.bookings[0].booking.total_price, Money::from_cents(10_000));
    assert_eq!(outcome.bookings[1].booking.mentor_id, grace);
    assert_eq!(outcome.bookings[1].items.len(), 1);

    // one "New booking" notification per mentor
    harness.notifier.wait_for(2).await;
    assert_eq!(harness.notifier.sent_to(ada).len(), 1);
    assert_eq!(harness.notifier.sent_to(grace).len(), 1);
    assert_eq!(harness.notifier.sent_to(ada)[0].title, "New booking");
}

#[tokio::test]
async fn valid_mentor_group_books_while_invalid_group_is_explained() {
    let harness = BookingHarness::new();
    let ada = harness.add_mentor("Ada");
    let grace = harness.add_mentor("Grace");
    let student = UserId::new();
    let rival = UserId::new();

    let a1 = harness.seed_slot_in(ada, 10);
    let a2 = harness.seed_slot_in(ada, 11);
    let g1 = harness.seed_slot_in(grace, 12);
    let g2 = harness.seed_slot_in(grace, 13);
    for slot in [&a1, &g1, &a2, &g2] {
        harness.cart.add_item(student, slot.id).await.unwrap();
    }

    // grace's slots go to someone else first
    for slot in [&g1, &g2] {
        harness.cart.add_item(rival, slot.id).await.unwrap();
    }
    harness.engine.book_from_cart(rival).await.unwrap();

    let outcome = harness.engine.book_from_cart(student).await.unwrap();

    assert_eq!(outcome.bookings.len(), 1);
    assert_eq!(outcome.bookings[0].booking.mentor_id, ada);
    assert_eq!(outcome.errors.len(), 2);
    assert!(outcome
        .errors
        .iter()
        .all(|e| e.reason == RejectionReason::AlreadyBooked && e.slot.mentor_id == grace));
    assert_eq!(
        outcome.errors.iter().map(|e| e.slot.slot_id).collect::<Vec<_>>(),
        vec![g1.id, g2.id]
    );
}

#[tokio::test]
async fn expired_hold_is_rejected_even_though_slot_is_available() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");
    let student = UserId::new();
    let slot = harness.seed_slot_in(mentor, 24);
    let item = harness.cart.add_item(student, slot.id).await.unwrap();

    harness.clock.advance(Duration::minutes(31));

    let Err(CheckoutError::AllItemsInvalid(errors)) = harness.engine.book_from_cart(student).await
    else {
        panic!("expected every item to be rejected");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].cart_item_id, item.id);
    assert_eq!(errors[0].reason, RejectionReason::Expired);
    assert_eq!(errors[0].slot.slot_id, slot.id);
    assert_eq!(harness.store.booking_count(), 0);

    let stored = harness.store.get_slot(slot.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SlotStatus::Available);
}

#[tokio::test]
async fn hold_exactly_at_expiry_is_still_valid() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");
    let student = UserId::new();
    let slot = harness.seed_slot_in(mentor, 24);
    harness.cart.add_item(student, slot.id).await.unwrap();

    harness.clock.advance(Duration::minutes(30));

    assert!(harness.engine.book_from_cart(student).await.is_ok());
}

#[tokio::test]
async fn slot_that_started_is_too_late() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");
    let student = UserId::new();
    let slot = harness.seed_slot_in(mentor, 1);

    harness.clock.advance(Duration::minutes(45));
    harness.cart.add_item(student, slot.id).await.unwrap();
    // hold is still fresh, but the slot began five minutes ago
    harness.clock.advance(Duration::minutes(20));

    let Err(CheckoutError::AllItemsInvalid(errors)) = harness.engine.book_from_cart(student).await
    else {
        panic!("expected every item to be rejected");
    };
    assert_eq!(errors[0].reason, RejectionReason::OutsideWindow);
}

#[tokio::test]
async fn closed_and_deleted_slots_are_reported() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");
    let student = UserId::new();

    let closed = harness.seed_slot_in(mentor, 10);
    let gone = harness.seed_slot_in(mentor, 11);
    let fine = harness.seed_slot_in(mentor, 12);
    for slot in [&closed, &gone, &fine] {
        harness.cart.add_item(student, slot.id).await.unwrap();
    }

    harness.store.seed_slot(Slot {
        status: SlotStatus::Closed,
        ..closed.clone()
    });
    // the slot row disappears while the hold survives
    let holds = harness.store.cart_items_of(student);
    harness.store.close_slot(gone.id).await.unwrap();
    for item in holds.iter().filter(|i| i.slot_id == gone.id) {
        harness.store.insert_item(item.clone()).await.unwrap();
    }

    let outcome = harness.engine.book_from_cart(student).await.unwrap();

    assert_eq!(outcome.bookings.len(), 1);
    assert_eq!(outcome.bookings[0].items[0].slot_id, fine.id);
    let reasons: Vec<_> = outcome.errors.iter().map(|e| (e.slot.slot_id, e.reason)).collect();
    assert!(reasons.contains(&(closed.id, RejectionReason::SlotClosed)));
    assert!(reasons.contains(&(gone.id, RejectionReason::SlotGone)));
}

#[tokio::test]
async fn hold_outside_window_is_too_late_or_too_early() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");
    let student = UserId::new();
    let slot = harness.seed_slot_in(mentor, 48);
    harness.cart.add_item(student, slot.id).await.unwrap();

    // a hold placed at the window edge, then the clock jumps back
    harness.clock.advance(Duration::minutes(-1));

    let Err(CheckoutError::AllItemsInvalid(errors)) = harness.engine.book_from_cart(student).await
    else {
        panic!("expected every item to be rejected");
    };
    assert_eq!(errors[0].reason, RejectionReason::OutsideWindow);
}

#[tokio::test]
async fn two_students_racing_for_one_slot_yield_one_booking() {
    let harness = stale_read_harness();
    let mentor = harness.add_mentor("Ada");
    let (alice, bob) = (UserId::new(), UserId::new());
    let slot = harness.seed_slot_in(mentor, 24);
    harness.cart.add_item(alice, slot.id).await.unwrap();
    harness.cart.add_item(bob, slot.id).await.unwrap();

    let (first, second) = tokio::join!(
        harness.engine.book_from_cart(alice),
        harness.engine.book_from_cart(bob)
    );

    let results = [first, second];
    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].bookings.len(), 1);

    let losers: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
    assert_eq!(losers.len(), 1);
    let CheckoutError::AllItemsInvalid(errors) = losers[0] else {
        panic!("loser should get item errors, got {:?}", losers[0]);
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].reason, RejectionReason::AlreadyBooked);

    assert_eq!(harness.store.active_booking_items_for(slot.id), 1);
}

#[tokio::test]
async fn lost_race_aborts_the_whole_mentor_group() {
    let harness = stale_read_harness();
    let mentor = harness.add_mentor("Ada");
    let (alice, bob) = (UserId::new(), UserId::new());
    let contested = harness.seed_slot_in(mentor, 20);
    let sibling = harness.seed_slot_in(mentor, 21);

    harness.cart.add_item(alice, contested.id).await.unwrap();
    harness.engine.book_from_cart(alice).await.unwrap();

    // stale reads let bob hold and validate a slot alice already booked
    harness.cart.add_item(bob, sibling.id).await.unwrap();
    harness.cart.add_item(bob, contested.id).await.unwrap();

    let Err(CheckoutError::AllItemsInvalid(errors)) = harness.engine.book_from_cart(bob).await
    else {
        panic!("expected the group to be rejected");
    };

    let reasons: Vec<_> = errors.iter().map(|e| (e.slot.slot_id, e.reason)).collect();
    assert!(reasons.contains(&(contested.id, RejectionReason::AlreadyBooked)));
    assert!(reasons.contains(&(sibling.id, RejectionReason::TransactionAborted)));

    // the sibling was not booked and stays in bob's cart
    let stored = harness.store.get_slot(sibling.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SlotStatus::Available);
    assert!(harness
        .store
        .cart_items_of(bob)
        .iter()
        .all(|i| i.status == CartItemStatus::Active));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_checkouts_book_a_slot_once() {
    let harness = stale_read_harness();
    let mentor = harness.add_mentor("Ada");
    let slot = harness.seed_slot_in(mentor, 24);

    let students: Vec<UserId> = (0..20).map(|_| UserId::new()).collect();
    for student in &students {
        harness.cart.add_item(*student, slot.id).await.unwrap();
    }

    let handles: Vec<_> = students
        .iter()
        .map(|student| {
            let engine: BookingEngine = harness.engine.clone();
            let student = *student;
            tokio::spawn(async move { engine.book_from_cart(student).await })
        })
        .collect();

    let mut booked = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(outcome) => booked += outcome.bookings.len(),
            Err(CheckoutError::AllItemsInvalid(errors)) => {
                assert_eq!(errors[0].reason, RejectionReason::AlreadyBooked);
            }
            Err(other) => panic!("unexpected checkout failure: {other}"),
        }
    }

    assert_eq!(booked, 1);
    assert_eq!(harness.store.active_booking_items_for(slot.id), 1);
    assert_eq!(harness.store.booking_count(), 1);
}

#[tokio::test]
async fn storage_failure_in_one_group_leaves_other_groups_booked() {
    let harness = BookingHarness::new();
    let ada = harness.add_mentor("Ada");
    let grace = harness.add_mentor("Grace");
    let student = UserId::new();
    let a = harness.seed_slot_in(ada, 10);
    let g = harness.seed_slot_in(grace, 11);
    harness.cart.add_item(student, a.id).await.unwrap();
    harness.cart.add_item(student, g.id).await.unwrap();

    // ada's group commits first and fails
    harness.store.fail_next_commit();

    let outcome = harness.engine.book_from_cart(student).await.unwrap();

    assert_eq!(outcome.bookings.len(), 1);
    assert_eq!(outcome.bookings[0].booking.mentor_id, grace);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].slot.slot_id, a.id);
    assert_eq!(outcome.errors[0].reason, RejectionReason::TransactionAborted);
}

#[tokio::test]
async fn notification_failure_does_not_fail_checkout() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");
    let student = UserId::new();
    let slot = harness.seed_slot_in(mentor, 24);
    harness.cart.add_item(student, slot.id).await.unwrap();
    harness.notifier.fail_all();

    let outcome = harness.engine.book_from_cart(student).await.unwrap();

    assert_eq!(outcome.bookings.len(), 1);
    harness.notifier.wait_for(1).await;
    assert!(harness.notifier.sent().is_empty());
}

/// A notification sink that never finishes delivering.
struct StalledNotifier;

impl NotificationSink for StalledNotifier {
    fn create_notification(
        &self,
        _request: NotificationRequest,
    ) -> StoreFuture<'_, Result<(), StoreError>> {
        Box::pin(std::future::pending::<Result<(), StoreError>>())
    }
}

#[tokio::test]
async fn checkout_and_cancel_do_not_wait_for_delivery() {
    let base = BookingHarness::new();
    let env = BookingEnvironment {
        notifier: Arc::new(StalledNotifier),
        ..base.env.clone()
    };
    let harness = BookingHarness::from_parts(base.store, base.clock, base.notifier, env);
    let mentor = harness.add_mentor("Ada");
    let student = UserId::new();
    let slot = harness.seed_slot_in(mentor, 24);
    harness.cart.add_item(student, slot.id).await.unwrap();

    let outcome = tokio::time::timeout(
        std::time::Duration::from_secs(1),
        harness.engine.book_from_cart(student),
    )
    .await
    .expect("checkout waited on the notification sink")
    .unwrap();
    let booking_id = outcome.bookings[0].booking.id;

    let cancelled = tokio::time::timeout(
        std::time::Duration::from_secs(1),
        harness.lifecycle.cancel(student, booking_id),
    )
    .await
    .expect("cancellation waited on the notification sink")
    .unwrap();

    assert_eq!(cancelled.booking.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn rejections_serialize_with_kebab_case_reasons() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");
    let student = UserId::new();
    let slot = harness.seed_slot_in(mentor, 24);
    harness.cart.add_item(student, slot.id).await.unwrap();
    harness.clock.advance(Duration::hours(2));

    let Err(CheckoutError::AllItemsInvalid(errors)) = harness.engine.book_from_cart(student).await
    else {
        panic!("expected every item to be rejected");
    };

    let json = serde_json::to_value(&errors[0]).unwrap();
    assert_eq!(json["reason"], "expired");
    assert_eq!(json["slot"]["slotId"], slot.id.to_string());
    assert_eq!(json["slot"]["startTime"], slot.start_time.to_string());
}
