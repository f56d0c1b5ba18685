//! Property tests for lifecycle classification

#![allow(clippy::unwrap_used)] // Tests can unwrap

use chrono::Duration;
use parkslot_core::environment::Clock;
use parkslot_core::lifecycle::{average_amount, classify, time_remaining, TimeRemaining};
use parkslot_core::types::{ReservationId, ReservationStatus};
use parkslot_testing::properties::{arb_instant, arb_reservation, arb_reservations};
use parkslot_testing::{ReservationBuilder, test_clock};
use proptest::prelude::*;
use std::collections::HashSet;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn partition_is_disjoint_and_total(
        reservations in arb_reservations(test_clock().now(), 40),
        now in arb_instant(test_clock().now()),
    ) {
        let partition = classify(&reservations, now);

        let active: HashSet<ReservationId> = partition.active.iter().map(|r| r.id).collect();
        let history: HashSet<ReservationId> = partition.history.iter().map(|r| r.id).collect();
        let input: HashSet<ReservationId> = reservations.iter().map(|r| r.id).collect();

        prop_assert!(active.is_disjoint(&history));
        prop_assert_eq!(partition.len(), reservations.len());
        prop_assert_eq!(active.union(&history).copied().collect::<HashSet<_>>(), input);
    }

    #[test]
    fn completed_is_always_history(
        reservation in arb_reservation(test_clock().now()),
        now in arb_instant(test_clock().now()),
    ) {
        let mut reservation = reservation;
        reservation.status = ReservationStatus::Completed;
        let partition = classify(std::slice::from_ref(&reservation), now);
        prop_assert!(partition.active.is_empty());
        prop_assert_eq!(partition.history.len(), 1);
    }

    #[test]
    fn active_side_matches_window_and_status(
        reservations in arb_reservations(test_clock().now(), 40),
        now in arb_instant(test_clock().now()),
    ) {
        let partition = classify(&reservations, now);
        for r in &partition.active {
            prop_assert_eq!(r.status, ReservationStatus::Active);
            prop_assert!(r.end_time > now);
        }
        for r in &partition.history {
            prop_assert!(r.status == ReservationStatus::Completed || r.end_time <= now);
        }
    }

    #[test]
    fn classification_is_idempotent(
        reservations in arb_reservations(test_clock().now(), 40),
        now in arb_instant(test_clock().now()),
    ) {
        let first = classify(&reservations, now);
        let second = classify(&reservations, now);
        prop_assert_eq!(&first, &second);

        // Reclassifying either side on its own keeps it on that side
        prop_assert_eq!(classify(&first.active, now).active, first.active.clone());
        prop_assert_eq!(classify(&first.history, now).history, first.history.clone());
    }

    #[test]
    fn moving_now_past_end_moves_to_history(
        reservation in arb_reservation(test_clock().now()),
        overshoot in 0_i64..10_000,
    ) {
        let mut reservation = reservation;
        reservation.status = ReservationStatus::Active;

        let before = reservation.end_time - Duration::milliseconds(1);
        prop_assert_eq!(classify(std::slice::from_ref(&reservation), before).active.len(), 1);

        let after = reservation.end_time + Duration::minutes(overshoot);
        let partition = classify(std::slice::from_ref(&reservation), after);
        prop_assert_eq!(partition.history.len(), 1);
        prop_assert_eq!(partition.history[0].id, reservation.id);
        prop_assert_eq!(partition.history[0].status, ReservationStatus::Active);
    }

    #[test]
    fn order_is_preserved_on_both_sides(
        reservations in arb_reservations(test_clock().now(), 40),
        now in arb_instant(test_clock().now()),
    ) {
        let partition = classify(&reservations, now);
        let position = |id: ReservationId| reservations.iter().position(|r| r.id == id).unwrap();
        for side in [&partition.active, &partition.history] {
            let positions: Vec<usize> = side.iter().map(|r| position(r.id)).collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn average_never_exceeds_largest_amount(
        reservations in arb_reservations(test_clock().now(), 40),
    ) {
        let average = average_amount(&reservations);
        let max = reservations.iter().map(|r| r.amount).max().unwrap_or_default();
        prop_assert!(average <= max);
    }
}

#[test]
fn average_of_nothing_is_zero() {
    assert!(average_amount(&[]).is_zero());
}

#[test]
fn time_remaining_boundary() {
    let end = test_clock().now() + Duration::hours(3);
    let reservation = ReservationBuilder::new().ending_at(end).build();

    assert_eq!(time_remaining(&reservation, end), TimeRemaining::Expired);
    assert_eq!(
        time_remaining(&reservation, end - Duration::milliseconds(1)),
        TimeRemaining::Remaining { hours: 0, minutes: 0 }
    );
    assert_eq!(
        time_remaining(&reservation, end - Duration::minutes(125)).to_string(),
        "2h 5m remaining"
    );
}
