//! Slot opening, closing and listing against the in-memory store.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)]

use chrono::Duration;
use mentorship_core::{
    Clock, Money, MentorProfile, Role, SlotError, SlotFilter, SlotStatus, UserId,
};
use mentorship_testing::fixtures::{self, date, time};
use mentorship_testing::BookingHarness;

#[tokio::test]
async fn open_snapshots_mentor_price_and_derives_end_time() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");

    let slot = harness
        .slots
        .open(mentor, date(2025, 1, 5), time("14:00"))
        .await
        .unwrap();

    assert_eq!(slot.status, SlotStatus::Available);
    assert_eq!(slot.end_time, time("14:30"));
    assert_eq!(slot.price, fixtures::DEFAULT_PRICE);
    assert_eq!(harness.store.slot_count(), 1);
}

#[tokio::test]
async fn open_falls_back_to_category_price() {
    let harness = BookingHarness::new();
    let profile = MentorProfile {
        price: None,
        category_price: Some(Money::from_cents(3500)),
        ..fixtures::mentor("Grace")
    };
    let mentor = profile.user_id;
    harness.store.add_mentor(profile);

    let slot = harness
        .slots
        .open(mentor, date(2025, 1, 5), time("09:00"))
        .await
        .unwrap();

    assert_eq!(slot.price, Money::from_cents(3500));
}

#[tokio::test]
async fn open_without_any_rate_is_rejected() {
    let harness = BookingHarness::new();
    let profile = MentorProfile {
        price: None,
        category_price: None,
        ..fixtures::mentor("Linus")
    };
    let mentor = profile.user_id;
    harness.store.add_mentor(profile);

    let result = harness.slots.open(mentor, date(2025, 1, 5), time("09:00")).await;

    assert_eq!(result, Err(SlotError::NoPriceConfigured));
}

#[tokio::test]
async fn open_rejects_unknown_users_and_non_mentors() {
    let harness = BookingHarness::new();
    let student = fixtures::student("Sam");
    let student_id = student.user_id;
    harness.store.add_mentor(student);

    assert_eq!(
        harness.slots.open(UserId::new(), date(2025, 1, 5), time("09:00")).await,
        Err(SlotError::MentorNotFound)
    );
    assert_eq!(
        harness.slots.open(student_id, date(2025, 1, 5), time("09:00")).await,
        Err(SlotError::NotAMentor)
    );
}

#[tokio::test]
async fn open_enforces_48_hour_lead_time() {
    // clock: 2025-01-01 00:00
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");

    assert_eq!(
        harness.slots.open(mentor, date(2025, 1, 2), time("23:30")).await,
        Err(SlotError::TooSoon)
    );
    assert!(harness.slots.open(mentor, date(2025, 1, 3), time("00:00")).await.is_ok());
}

#[tokio::test]
async fn second_slot_at_same_instant_conflicts() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");

    harness.slots.open(mentor, date(2025, 1, 5), time("10:00")).await.unwrap();
    let again = harness.slots.open(mentor, date(2025, 1, 5), time("10:00")).await;

    assert_eq!(again, Err(SlotError::SlotConflict));
    assert_eq!(harness.store.slot_count(), 1);
}

#[tokio::test]
async fn different_mentors_may_share_a_start_time() {
    let harness = BookingHarness::new();
    let ada = harness.add_mentor("Ada");
    let grace = harness.add_mentor("Grace");

    harness.slots.open(ada, date(2025, 1, 5), time("10:00")).await.unwrap();
    harness.slots.open(grace, date(2025, 1, 5), time("10:00")).await.unwrap();

    assert_eq!(harness.store.slot_count(), 2);
}

#[tokio::test]
async fn concurrent_opens_of_the_same_slot_create_one_row() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");

    let attempts = (0..8).map(|_| harness.slots.open(mentor, date(2025, 1, 6), time("08:30")));
    let results = futures::future::join_all(attempts).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| *e == SlotError::SlotConflict));
    assert_eq!(harness.store.slot_count(), 1);
}

#[tokio::test]
async fn late_night_slot_rolls_end_time_over_midnight() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");

    let slot = harness.slots.open(mentor, date(2025, 1, 5), time("23:30")).await.unwrap();

    assert_eq!(slot.end_time, time("00:00"));
    assert_eq!(slot.date, date(2025, 1, 5));
}

#[tokio::test]
async fn close_deletes_an_available_slot() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");
    let slot = harness.slots.open(mentor, date(2025, 1, 5), time("10:00")).await.unwrap();

    harness.slots.close(mentor, slot.id).await.unwrap();

    assert_eq!(harness.store.slot_count(), 0);
}

#[tokio::test]
async fn close_checks_ownership_and_existence() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");
    let other = harness.add_mentor("Grace");
    let slot = harness.slots.open(mentor, date(2025, 1, 5), time("10:00")).await.unwrap();

    assert_eq!(harness.slots.close(other, slot.id).await, Err(SlotError::Forbidden));
    assert_eq!(
        harness.slots.close(mentor, mentorship_core::SlotId::new()).await,
        Err(SlotError::NotFound)
    );
    assert_eq!(harness.store.slot_count(), 1);
}

#[tokio::test]
async fn close_inside_48_hours_is_too_soon() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");
    let slot = harness.slots.open(mentor, date(2025, 1, 3), time("12:00")).await.unwrap();

    harness.clock.advance(Duration::hours(13));

    assert_eq!(harness.slots.close(mentor, slot.id).await, Err(SlotError::TooSoon));
}

#[tokio::test]
async fn booked_slot_cannot_be_closed_even_after_cancellation() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");
    let student = UserId::new();
    let slot = harness.slots.open(mentor, date(2025, 1, 5), time("10:00")).await.unwrap();

    // move inside the booking window, book, then move back out of it
    let opened_at = harness.clock.now();
    harness.clock.advance(Duration::hours(84));
    harness.cart.add_item(student, slot.id).await.unwrap();
    let outcome = harness.engine.book_from_cart(student).await.unwrap();
    harness.clock.set(opened_at);

    assert_eq!(harness.slots.close(mentor, slot.id).await, Err(SlotError::HasBooking));

    harness
        .lifecycle
        .cancel(student, outcome.bookings[0].booking.id)
        .await
        .unwrap();
    assert_eq!(harness.slots.close(mentor, slot.id).await, Err(SlotError::HasBooking));
}

#[tokio::test]
async fn close_removes_holds_on_the_slot() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");
    let student = UserId::new();
    let slot = harness.seed_slot_in(mentor, 72);

    // holds are only placed inside the window
    harness.clock.advance(Duration::hours(30));
    harness.cart.add_item(student, slot.id).await.unwrap();
    harness.clock.set(fixtures::start_of_test());

    harness.slots.close(mentor, slot.id).await.unwrap();

    assert!(harness.store.cart_items_of(student).is_empty());
}

#[tokio::test]
async fn mentor_listing_filters_and_counts() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");
    let student = UserId::new();

    let booked = harness.seed_slot_in(mentor, 24);
    harness.seed_slot_in(mentor, 25);
    harness.slots.open(mentor, date(2025, 1, 10), time("09:00")).await.unwrap();
    harness.slots.open(mentor, date(2025, 1, 9), time("09:00")).await.unwrap();

    harness.cart.add_item(student, booked.id).await.unwrap();
    harness.engine.book_from_cart(student).await.unwrap();

    let all = harness
        .slots
        .list_for_mentor(mentor, SlotFilter::default())
        .await
        .unwrap();
    assert_eq!(all.slots.len(), 4);
    assert_eq!((all.counts.available, all.counts.booked, all.counts.total), (3, 1, 4));
    let ordered: Vec<_> = all.slots.iter().map(|s| (s.date, s.start_time)).collect();
    let mut sorted = ordered.clone();
    sorted.sort();
    assert_eq!(ordered, sorted);

    let only_booked = harness
        .slots
        .list_for_mentor(
            mentor,
            SlotFilter {
                status: Some(SlotStatus::Booked),
                ..SlotFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(only_booked.slots.len(), 1);
    assert_eq!(only_booked.counts.total, 4);

    let ranged = harness
        .slots
        .list_for_mentor(
            mentor,
            SlotFilter {
                start_date: Some(date(2025, 1, 9)),
                end_date: Some(date(2025, 1, 9)),
                ..SlotFilter::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(ranged.slots.len(), 1);
    assert_eq!(ranged.counts.total, 1);
}

#[tokio::test]
async fn public_listing_shows_only_future_available_slots() {
    let harness = BookingHarness::new();
    let mentor = harness.add_mentor("Ada");
    let student = UserId::new();

    let booked = harness.seed_slot_in(mentor, 24);
    let open = harness.seed_slot_in(mentor, 26);
    harness.store.seed_slot(fixtures::slot(mentor, date(2024, 12, 30), "10:00"));

    harness.cart.add_item(student, booked.id).await.unwrap();
    harness.engine.book_from_cart(student).await.unwrap();

    let listed = harness
        .slots
        .list_available_for_mentor(
            mentor,
            SlotFilter {
                start_date: Some(date(2024, 12, 1)),
                ..SlotFilter::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(listed.iter().map(|s| s.id).collect::<Vec<_>>(), vec![open.id]);

    let yesterday = harness
        .slots
        .list_available_for_mentor(
            mentor,
            SlotFilter {
                date: Some(date(2024, 12, 30)),
                ..SlotFilter::default()
            },
        )
        .await
        .unwrap();
    assert!(yesterday.is_empty());
}

#[tokio::test]
async fn public_listing_requires_a_verified_mentor() {
    let harness = BookingHarness::new();
    let unverified = MentorProfile {
        is_verified: false,
        ..fixtures::mentor("New")
    };
    let unverified_id = unverified.user_id;
    harness.store.add_mentor(unverified);
    let plain = MentorProfile {
        role: Role::User,
        ..fixtures::mentor("Plain")
    };
    let plain_id = plain.user_id;
    harness.store.add_mentor(plain);

    assert_eq!(
        harness.slots.list_available_for_mentor(unverified_id, SlotFilter::default()).await,
        Err(SlotError::MentorUnavailable)
    );
    assert_eq!(
        harness.slots.list_available_for_mentor(plain_id, SlotFilter::default()).await,
        Err(SlotError::MentorUnavailable)
    );
    assert_eq!(
        harness.slots.list_available_for_mentor(UserId::new(), SlotFilter::default()).await,
        Err(SlotError::MentorNotFound)
    );
}
