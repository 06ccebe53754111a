//! End-to-end service tests over the in-memory adapter.
//!
//! Covers the observable properties the scheduling core guarantees:
//! no double-booking, no overlapping slots, amount freeze, cancellation
//! reversibility, exactly-once rating, and idempotent cancel.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

use chrono::Duration;
use tutorlink_core::availability::SlotChanges;
use tutorlink_core::booking::BookingRequest;
use tutorlink_core::error::CoreError;
use tutorlink_core::events::DomainEvent;
use tutorlink_core::types::{Actor, BookingStatus, Money, PaymentStatus, Role, SlotId};
use tutorlink_testing::fixtures::{date, student, time};
use tutorlink_testing::TestHarness;

fn request(slot_id: SlotId, tutor: &Actor) -> BookingRequest {
    BookingRequest {
        slot_id,
        tutor_id: tutor.id,
        subject: "Linear algebra".to_string(),
        description: None,
    }
}

#[tokio::test]
async fn booking_a_slot_freezes_price_and_flags_the_slot() {
    let harness = TestHarness::new();
    let tutor = harness.seed_tutor(40).await;
    let alice = student();

    let slot = harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(9, 0), time(10, 0))
        .await
        .unwrap();

    let booking = harness
        .bookings
        .create_booking(&alice, request(slot.id, &tutor))
        .await
        .unwrap();

    assert_eq!(booking.amount, Money::from_dollars(40));
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.payment_status, PaymentStatus::Pending);
    assert_eq!(booking.date, slot.date);
    assert_eq!(booking.time, slot.time);
    assert!(harness.store.slot(slot.id).await.unwrap().is_booked);

    // The amount and booking id were handed to the payment collaborator.
    assert_eq!(
        harness.payments.intents().await,
        vec![(booking.id, booking.amount)]
    );
    assert!(matches!(
        harness.notifier.events().await.as_slice(),
        [DomainEvent::BookingCreated { booking_id, .. }] if *booking_id == booking.id
    ));
}

#[tokio::test]
async fn second_student_gets_conflict_on_a_taken_slot() {
    let harness = TestHarness::new();
    let tutor = harness.seed_tutor(40).await;

    let slot = harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(9, 0), time(10, 0))
        .await
        .unwrap();

    harness
        .bookings
        .create_booking(&student(), request(slot.id, &tutor))
        .await
        .unwrap();

    let err = harness
        .bookings
        .create_booking(&student(), request(slot.id, &tutor))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));
}

#[tokio::test]
async fn overlapping_slot_creation_is_rejected() {
    let harness = TestHarness::new();
    let tutor = harness.seed_tutor(40).await;

    harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(9, 0), time(10, 0))
        .await
        .unwrap();

    // 09:30–10:30 straddles the existing 09:00–10:00 window.
    let err = harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(9, 30), time(10, 30))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));

    // A window that merely touches it is fine (half-open intervals).
    harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(10, 0), time(11, 0))
        .await
        .unwrap();

    // Same window on another day is fine too.
    harness
        .availability
        .create_slot(&tutor, date("2024-06-02"), time(9, 0), time(10, 0))
        .await
        .unwrap();
}

#[tokio::test]
async fn inverted_time_range_is_a_validation_error() {
    let harness = TestHarness::new();
    let tutor = harness.seed_tutor(40).await;

    let err = harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(10, 0), time(9, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn cancellation_releases_the_slot_for_rebooking() {
    let harness = TestHarness::new();
    let tutor = harness.seed_tutor(40).await;
    let alice = student();

    let slot = harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(9, 0), time(10, 0))
        .await
        .unwrap();
    let booking = harness
        .bookings
        .create_booking(&alice, request(slot.id, &tutor))
        .await
        .unwrap();

    let cancelled = harness
        .lifecycle
        .cancel(&alice, booking.id, Some("conflict came up".to_string()))
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert!(!harness.store.slot(slot.id).await.unwrap().is_booked);

    // The freed slot can be booked again by someone else.
    let rebooked = harness
        .bookings
        .create_booking(&student(), request(slot.id, &tutor))
        .await
        .unwrap();
    assert_eq!(rebooked.slot_id, slot.id);
}

#[tokio::test]
async fn cancel_is_idempotent_and_emits_one_event() {
    let harness = TestHarness::new();
    let tutor = harness.seed_tutor(40).await;
    let alice = student();

    let slot = harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(9, 0), time(10, 0))
        .await
        .unwrap();
    let booking = harness
        .bookings
        .create_booking(&alice, request(slot.id, &tutor))
        .await
        .unwrap();

    harness.lifecycle.cancel(&alice, booking.id, None).await.unwrap();
    let retried = harness.lifecycle.cancel(&alice, booking.id, None).await.unwrap();
    assert_eq!(retried.status, BookingStatus::Cancelled);

    let cancellations = harness
        .notifier
        .events()
        .await
        .into_iter()
        .filter(|event| matches!(event, DomainEvent::BookingCancelled { .. }))
        .count();
    assert_eq!(cancellations, 1);
}

#[tokio::test]
async fn completed_bookings_cannot_be_cancelled() {
    let harness = TestHarness::new();
    let tutor = harness.seed_tutor(40).await;
    let alice = student();

    let slot = harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(9, 0), time(10, 0))
        .await
        .unwrap();
    let booking = harness
        .bookings
        .create_booking(&alice, request(slot.id, &tutor))
        .await
        .unwrap();

    harness
        .lifecycle
        .update_status(&tutor, booking.id, BookingStatus::Completed, None)
        .await
        .unwrap();

    let err = harness
        .lifecycle
        .cancel(&alice, booking.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidState(_)));
}

#[tokio::test]
async fn rating_updates_the_tutor_aggregate_exactly_once() {
    let harness = TestHarness::new();
    let tutor = harness.seed_tutor(40).await;
    let alice = student();

    // Seed the aggregate at (4.8, 10): the next 5 lands at 53/11.
    let mut profile = harness.tutors.get_profile(tutor.id).await.unwrap();
    profile.rating = tutorlink_core::types::RatingAggregate::from_parts(4.8, 10);
    use tutorlink_core::store::TutorStore as _;
    harness.store.upsert(profile).await.unwrap();

    let slot = harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(9, 0), time(10, 0))
        .await
        .unwrap();
    let booking = harness
        .bookings
        .create_booking(&alice, request(slot.id, &tutor))
        .await
        .unwrap();

    // Rating a confirmed booking is premature.
    let premature = harness
        .ratings
        .add_rating(&alice, booking.id, 5, None)
        .await
        .unwrap_err();
    assert!(matches!(premature, CoreError::InvalidState(_)));

    harness
        .lifecycle
        .update_status(&tutor, booking.id, BookingStatus::Completed, None)
        .await
        .unwrap();

    let rated = harness
        .ratings
        .add_rating(&alice, booking.id, 5, Some("great session".to_string()))
        .await
        .unwrap();
    assert_eq!(rated.rating.map(|score| score.value()), Some(5));

    let profile = harness.tutors.get_profile(tutor.id).await.unwrap();
    assert_eq!(profile.rating.count, 11);
    assert!((profile.rating.average - 53.0 / 11.0).abs() < 1e-12);

    // Exactly once: a second submission fails regardless of score.
    let again = harness
        .ratings
        .add_rating(&alice, booking.id, 1, None)
        .await
        .unwrap_err();
    assert!(matches!(again, CoreError::InvalidState(_)));
    let profile = harness.tutors.get_profile(tutor.id).await.unwrap();
    assert_eq!(profile.rating.count, 11);
}

#[tokio::test]
async fn only_the_student_may_rate() {
    let harness = TestHarness::new();
    let tutor = harness.seed_tutor(40).await;
    let alice = student();

    let slot = harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(9, 0), time(10, 0))
        .await
        .unwrap();
    let booking = harness
        .bookings
        .create_booking(&alice, request(slot.id, &tutor))
        .await
        .unwrap();
    harness
        .lifecycle
        .update_status(&tutor, booking.id, BookingStatus::Completed, None)
        .await
        .unwrap();

    let err = harness
        .ratings
        .add_rating(&tutor, booking.id, 5, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)));
}

#[tokio::test]
async fn changing_the_rate_never_touches_existing_bookings() {
    let harness = TestHarness::new();
    let tutor = harness.seed_tutor(40).await;
    let alice = student();

    let first = harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(9, 0), time(10, 0))
        .await
        .unwrap();
    let second = harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(11, 0), time(12, 0))
        .await
        .unwrap();

    let frozen = harness
        .bookings
        .create_booking(&alice, request(first.id, &tutor))
        .await
        .unwrap();

    harness
        .tutors
        .set_hourly_rate(&tutor, Money::from_dollars(60))
        .await
        .unwrap();

    let unchanged = harness.store.booking(frozen.id).await.unwrap();
    assert_eq!(unchanged.amount, Money::from_dollars(40));

    // New bookings pick up the new rate.
    let repriced = harness
        .bookings
        .create_booking(&alice, request(second.id, &tutor))
        .await
        .unwrap();
    assert_eq!(repriced.amount, Money::from_dollars(60));
}

#[tokio::test]
async fn booked_slots_are_immutable_until_released() {
    let harness = TestHarness::new();
    let tutor = harness.seed_tutor(40).await;
    let alice = student();

    let slot = harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(9, 0), time(10, 0))
        .await
        .unwrap();
    harness
        .bookings
        .create_booking(&alice, request(slot.id, &tutor))
        .await
        .unwrap();

    let edit = harness
        .availability
        .update_slot(
            &tutor,
            slot.id,
            SlotChanges {
                start: Some(time(9, 30)),
                ..SlotChanges::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(edit, CoreError::InvalidState(_)));

    let delete = harness
        .availability
        .delete_slot(&tutor, slot.id)
        .await
        .unwrap_err();
    assert!(matches!(delete, CoreError::InvalidState(_)));

    // An unbooked slot deletes cleanly.
    let open = harness
        .availability
        .create_slot(&tutor, date("2024-06-02"), time(9, 0), time(10, 0))
        .await
        .unwrap();
    harness.availability.delete_slot(&tutor, open.id).await.unwrap();
    assert!(harness.store.slot(open.id).await.is_none());
}

#[tokio::test]
async fn ownership_is_enforced_on_slots_and_bookings() {
    let harness = TestHarness::new();
    let tutor = harness.seed_tutor(40).await;
    let impostor = harness.seed_tutor(99).await;
    let alice = student();

    let slot = harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(9, 0), time(10, 0))
        .await
        .unwrap();

    let err = harness
        .availability
        .delete_slot(&impostor, slot.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)));

    let booking = harness
        .bookings
        .create_booking(&alice, request(slot.id, &tutor))
        .await
        .unwrap();

    let stranger = student();
    let err = harness
        .bookings
        .get_booking(&stranger, booking.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)));

    // Both participants can read it.
    harness.bookings.get_booking(&alice, booking.id).await.unwrap();
    harness.bookings.get_booking(&tutor, booking.id).await.unwrap();
}

#[tokio::test]
async fn payment_gateway_failure_never_blocks_the_booking() {
    let harness = TestHarness::new();
    let tutor = harness.seed_tutor(40).await;

    harness.payments.set_failing(true).await;

    let slot = harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(9, 0), time(10, 0))
        .await
        .unwrap();
    let booking = harness
        .bookings
        .create_booking(&student(), request(slot.id, &tutor))
        .await
        .unwrap();

    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert!(harness.payments.intents().await.is_empty());

    // The collaborator later reports success out of band.
    let paid = harness.bookings.confirm_payment(booking.id).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn availability_listing_is_sorted_and_excludes_booked() {
    let harness = TestHarness::new();
    let tutor = harness.seed_tutor(40).await;
    let alice = student();

    let late = harness
        .availability
        .create_slot(&tutor, date("2024-06-02"), time(14, 0), time(15, 0))
        .await
        .unwrap();
    let early = harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(9, 0), time(10, 0))
        .await
        .unwrap();
    let taken = harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(11, 0), time(12, 0))
        .await
        .unwrap();
    harness
        .bookings
        .create_booking(&alice, request(taken.id, &tutor))
        .await
        .unwrap();

    let open = harness
        .availability
        .list_availability(tutor.id, tutorlink_core::types::DateRange::default())
        .await
        .unwrap();
    assert_eq!(
        open.iter().map(|slot| slot.id).collect::<Vec<_>>(),
        vec![early.id, late.id]
    );

    // Date bounds narrow the listing.
    let bounded = harness
        .availability
        .list_availability(
            tutor.id,
            tutorlink_core::types::DateRange::new(Some(date("2024-06-02")), None),
        )
        .await
        .unwrap();
    assert_eq!(bounded.len(), 1);
    assert_eq!(bounded[0].id, late.id);
}

#[tokio::test]
async fn booking_lists_are_scoped_filtered_and_newest_first() {
    let harness = TestHarness::new();
    let tutor = harness.seed_tutor(40).await;
    let alice = student();

    let first_slot = harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(9, 0), time(10, 0))
        .await
        .unwrap();
    let second_slot = harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(11, 0), time(12, 0))
        .await
        .unwrap();

    let older = harness
        .bookings
        .create_booking(&alice, request(first_slot.id, &tutor))
        .await
        .unwrap();
    harness.clock.advance(Duration::minutes(5));
    let newer = harness
        .bookings
        .create_booking(&alice, request(second_slot.id, &tutor))
        .await
        .unwrap();

    let mine = harness.bookings.list_bookings(&alice, None, None).await.unwrap();
    assert_eq!(
        mine.iter().map(|booking| booking.id).collect::<Vec<_>>(),
        vec![newer.id, older.id]
    );

    // The tutor sees the same sessions from the other side.
    let taught = harness
        .bookings
        .list_bookings(&tutor, Some(Role::Tutor), None)
        .await
        .unwrap();
    assert_eq!(taught.len(), 2);

    harness.lifecycle.cancel(&alice, older.id, None).await.unwrap();
    let cancelled_only = harness
        .bookings
        .list_bookings(&alice, None, Some(BookingStatus::Cancelled))
        .await
        .unwrap();
    assert_eq!(
        cancelled_only.iter().map(|b| b.id).collect::<Vec<_>>(),
        vec![older.id]
    );
}

#[tokio::test]
async fn meeting_link_rides_along_with_completion() {
    let harness = TestHarness::new();
    let tutor = harness.seed_tutor(40).await;
    let alice = student();

    let slot = harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(9, 0), time(10, 0))
        .await
        .unwrap();
    let booking = harness
        .bookings
        .create_booking(&alice, request(slot.id, &tutor))
        .await
        .unwrap();

    let linked = harness
        .lifecycle
        .set_meeting_link(&tutor, booking.id, "https://meet.example/xyz".to_string())
        .await
        .unwrap();
    assert_eq!(linked.meeting_link.as_deref(), Some("https://meet.example/xyz"));

    let completed = harness
        .lifecycle
        .update_status(&tutor, booking.id, BookingStatus::Completed, None)
        .await
        .unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);
    assert_eq!(
        completed.meeting_link.as_deref(),
        Some("https://meet.example/xyz")
    );
}
