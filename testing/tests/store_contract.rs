//! Contract tests for the in-memory reservation store

#![allow(clippy::unwrap_used)] // Tests can unwrap

use chrono::Duration;
use futures::StreamExt;
use parkslot_core::environment::Clock;
use parkslot_core::store::{ReservationStore, Session, StoreError};
use parkslot_core::types::OwnerId;
use parkslot_testing::{InMemoryReservationStore, ManualClock, ReservationBuilder, test_clock};
use std::sync::Arc;
use tokio_test::{assert_pending, assert_ready};

fn setup() -> (InMemoryReservationStore, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(test_clock().now()));
    (InMemoryReservationStore::with_clock(clock.clone()), clock)
}

#[tokio::test]
async fn inverted_window_is_rejected_and_snapshot_unchanged() {
    let (store, _) = setup();
    let owner = OwnerId::new("driver");
    let session = Session::authenticated(owner.clone());

    store
        .create(&session, ReservationBuilder::new().build_input())
        .await
        .unwrap();
    let mut feed = store.subscribe(&owner).await.unwrap();
    let before = feed.next().await.unwrap().unwrap();

    let now = test_clock().now();
    let inverted = ReservationBuilder::new()
        .window(now + Duration::hours(3), now + Duration::hours(1))
        .build_input();
    let result = store.create(&session, inverted).await;
    assert!(matches!(result, Err(StoreError::InvalidInput(_))));

    let empty = ReservationBuilder::new()
        .window(now + Duration::hours(1), now + Duration::hours(1))
        .build_input();
    assert!(matches!(
        store.create(&session, empty).await,
        Err(StoreError::InvalidInput(_))
    ));

    assert_eq!(store.snapshot(&owner), before);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn slot_zero_is_rejected() {
    let (store, _) = setup();
    let session = Session::authenticated(OwnerId::new("driver"));
    let result = store
        .create(&session, ReservationBuilder::new().slot(0).build_input())
        .await;
    assert!(matches!(result, Err(StoreError::InvalidInput(_))));
    assert!(store.is_empty());
}

#[tokio::test]
async fn unauthenticated_check_precedes_validation() {
    let (store, _) = setup();
    let now = test_clock().now();
    let inverted = ReservationBuilder::new()
        .window(now + Duration::hours(2), now)
        .build_input();
    assert_eq!(
        store.create(&Session::anonymous(), inverted).await,
        Err(StoreError::Unauthenticated)
    );
}

#[tokio::test]
async fn first_item_is_the_current_snapshot() {
    let (store, _) = setup();
    let owner = OwnerId::new("driver");
    let session = Session::authenticated(owner.clone());
    for _ in 0..3 {
        store
            .create(&session, ReservationBuilder::new().build_input())
            .await
            .unwrap();
    }

    let mut feed = store.subscribe(&owner).await.unwrap();
    assert_eq!(feed.next().await.unwrap().unwrap().len(), 3);
}

#[tokio::test]
async fn snapshots_are_newest_first_with_insertion_tiebreak() {
    let (store, clock) = setup();
    let owner = OwnerId::new("driver");
    let session = Session::authenticated(owner.clone());

    let first = store
        .create(&session, ReservationBuilder::new().build_input())
        .await
        .unwrap();
    // Same created_at as `first`
    let second = store
        .create(&session, ReservationBuilder::new().build_input())
        .await
        .unwrap();
    clock.advance(Duration::minutes(1));
    let third = store
        .create(&session, ReservationBuilder::new().build_input())
        .await
        .unwrap();

    let ids: Vec<_> = store.snapshot(&owner).iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![third, second, first]);
}

#[tokio::test]
async fn burst_of_writes_coalesces_to_latest_state() {
    let (store, _) = setup();
    let owner = OwnerId::new("driver");
    let session = Session::authenticated(owner.clone());

    let mut feed = store.subscribe(&owner).await.unwrap();
    assert!(feed.next().await.unwrap().unwrap().is_empty());

    for _ in 0..5 {
        store
            .create(&session, ReservationBuilder::new().build_input())
            .await
            .unwrap();
    }

    // Whatever got coalesced, the next item carries every write
    let latest = feed.next().await.unwrap().unwrap();
    assert_eq!(latest.len(), 5);
}

#[tokio::test]
async fn sizes_never_go_backwards_on_a_feed() {
    let (store, _) = setup();
    let owner = OwnerId::new("driver");
    let session = Session::authenticated(owner.clone());
    let mut feed = store.subscribe(&owner).await.unwrap();

    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            for _ in 0..20 {
                store
                    .create(&session, ReservationBuilder::new().build_input())
                    .await
                    .unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let mut last = 0;
    while last < 20 {
        let snapshot = feed.next().await.unwrap().unwrap();
        assert!(snapshot.len() >= last);
        last = snapshot.len();
    }
    writer.await.unwrap();
}

#[tokio::test]
async fn overlapping_bookings_are_accepted() {
    let (store, _) = setup();
    let owner = OwnerId::new("driver");
    let session = Session::authenticated(owner.clone());
    let input = ReservationBuilder::new().slot(4).build_input();

    store.create(&session, input.clone()).await.unwrap();
    store.create(&session, input).await.unwrap();
    assert_eq!(store.snapshot(&owner).len(), 2);
}

#[tokio::test]
async fn feed_is_pending_until_the_next_write() {
    let (store, _) = setup();
    let owner = OwnerId::new("driver");
    let mut feed = store.subscribe(&owner).await.unwrap();
    feed.next().await.unwrap().unwrap();

    let mut next = tokio_test::task::spawn(feed.next());
    assert_pending!(next.poll());

    store
        .create(
            &Session::authenticated(owner.clone()),
            ReservationBuilder::new().build_input(),
        )
        .await
        .unwrap();
    assert!(next.is_woken());
    let snapshot = assert_ready!(next.poll()).unwrap().unwrap();
    assert_eq!(snapshot.len(), 1);
}
