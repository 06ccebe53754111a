//! Race tests for the at-most-once guarantees.
//!
//! The in-memory adapter honors the same store contracts as the
//! `PostgreSQL` adapter, so these tests pin the service-level behavior
//! under concurrent requests: one winner, everyone else a clean conflict.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

use futures::future::join_all;
use tutorlink_core::booking::BookingRequest;
use tutorlink_core::error::CoreError;
use tutorlink_core::events::DomainEvent;
use tutorlink_core::types::BookingStatus;
use tutorlink_testing::fixtures::{date, student, time};
use tutorlink_testing::TestHarness;

#[tokio::test]
async fn concurrent_bookings_of_one_slot_yield_exactly_one_success() {
    let harness = TestHarness::new();
    let tutor = harness.seed_tutor(40).await;

    let slot = harness
        .availability
        .create_slot(&tutor, date("2024-06-01"), time(9, 0), time(10, 0))
        .await
        .unwrap();

    let attempts = (0..16).map(|_| {
        let bookings = harness.bookings.clone();
        let tutor_id = tutor.id;
        let slot_id = slot.id;
        tokio::spawn(async move {
            let rival = student();
            bookings
                .create_booking(
                    &rival,
                    BookingRequest {
                        slot_id,
                        tutor_id,
                        subject: "Calculus".to_string(),
                        description: None,
                    },
                )
                .await
        })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task must not panic"))
        .collect();

    let successes = results.iter().filter(|result| result.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|result| matches!(result, Err(CoreError::Conflict(_))))
        .count();

    assert_eq!(successes, 1);
    assert_eq!(conflicts, results.len() - 1);
    assert!(harness.store.slot(slot.id).await.unwrap().is_booked);
}

#[tokio::test]
async fn concurrent_overlapping_slot_creates_yield_exactly_one_success() {
    let harness = TestHarness::new();
    let tutor = harness.seed_tutor(40).await;

    let attempts = (0..8).map(|i| {
        let availability = harness.availability.clone();
        let actor = tutor;
        tokio::spawn(async move {
            // All windows straddle 09:30, so at most one may survive.
            let start = time(9, u32::try_from(i).unwrap() * 5);
            let end = time(10, u32::try_from(i).unwrap() * 5);
            availability
                .create_slot(&actor, date("2024-06-01"), start, end)
                .await
        })
    });

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task must not panic"))
        .collect();

    let successes = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results
        .iter()
        .filter(|result| result.is_err())
        .all(|result| matches!(result, Err(CoreError::Conflict(_)))));
}

#[tokio::test]
async fn concurrent_cancels_produce_one_transition_and_one_event() {
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
        .create_booking(
            &alice,
            BookingRequest {
                slot_id: slot.id,
                tutor_id: tutor.id,
                subject: "Calculus".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();

    let attempts = (0..8).map(|_| {
        let lifecycle = harness.lifecycle.clone();
        let actor = alice;
        let id = booking.id;
        tokio::spawn(async move { lifecycle.cancel(&actor, id, None).await })
    });

    for joined in join_all(attempts).await {
        let cancelled = joined.expect("task must not panic").unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
    }

    let cancellations = harness
        .notifier
        .events()
        .await
        .into_iter()
        .filter(|event| matches!(event, DomainEvent::BookingCancelled { .. }))
        .count();
    assert_eq!(cancellations, 1);
    assert!(!harness.store.slot(slot.id).await.unwrap().is_booked);
}

#[tokio::test]
async fn concurrent_ratings_on_distinct_bookings_all_reach_the_aggregate() {
    let harness = TestHarness::new();
    let tutor = harness.seed_tutor(40).await;

    // Four completed bookings from four students.
    let mut rated = Vec::new();
    for hour in [9u32, 11, 13, 15] {
        let slot = harness
            .availability
            .create_slot(&tutor, date("2024-06-01"), time(hour, 0), time(hour + 1, 0))
            .await
            .unwrap();
        let owner = student();
        let booking = harness
            .bookings
            .create_booking(
                &owner,
                BookingRequest {
                    slot_id: slot.id,
                    tutor_id: tutor.id,
                    subject: "Physics".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();
        harness
            .lifecycle
            .update_status(&tutor, booking.id, BookingStatus::Completed, None)
            .await
            .unwrap();
        rated.push((owner, booking.id));
    }

    let attempts = rated.into_iter().map(|(owner, id)| {
        let ratings = harness.ratings.clone();
        tokio::spawn(async move { ratings.add_rating(&owner, id, 4, None).await })
    });

    for joined in join_all(attempts).await {
        joined.expect("task must not panic").unwrap();
    }

    // Compare-and-set retries mean no submission is lost.
    let profile = harness.tutors.get_profile(tutor.id).await.unwrap();
    assert_eq!(profile.rating.count, 4);
    assert!((profile.rating.average - 4.0).abs() < 1e-12);
}
