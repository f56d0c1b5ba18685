//! In-memory reservation store for fast, deterministic testing.
//!
//! [`InMemoryReservationStore`] implements the full snapshot-feed contract of
//! [`ReservationStore`] on top of one `tokio::sync::watch` channel per owner:
//!
//! - a new subscriber immediately sees the latest snapshot
//! - writes replace the channel value, so bursts coalesce into the newest state
//! - dropping a feed drops its receiver, which [`InMemoryReservationStore::subscriber_count`] reflects
//!
//! Failure injection hooks let tests drive the error paths of callers.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only happens after a test already panicked

use parkslot_core::environment::{Clock, SystemClock};
use parkslot_core::store::{ReservationStore, Session, Snapshot, SnapshotStream, StoreError, newest_first};
use parkslot_core::types::{OwnerId, Reservation, ReservationId, ReservationInput};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::watch;

/// What a subscriber sees next on an owner's feed.
#[derive(Clone, Debug)]
enum FeedState {
    Snapshot(Snapshot),
    Terminated(StoreError),
}

#[derive(Debug)]
struct OwnerFeed {
    /// Insertion order; the feed publishes it newest first
    reservations: Vec<Reservation>,
    sender: watch::Sender<FeedState>,
}

impl OwnerFeed {
    fn new() -> Self {
        let (sender, _) = watch::channel(FeedState::Snapshot(Snapshot::from(Vec::new())));
        Self {
            reservations: Vec::new(),
            sender,
        }
    }

    fn snapshot(&self) -> Snapshot {
        newest_first(&self.reservations)
    }

    fn publish(&self) {
        self.sender.send_replace(FeedState::Snapshot(self.snapshot()));
    }
}

/// In-memory [`ReservationStore`].
///
/// Cloning is cheap and clones share the same data.
///
/// # Example
///
/// ```
/// use futures::StreamExt;
/// use parkslot_core::store::{ReservationStore, Session};
/// use parkslot_core::types::OwnerId;
/// use parkslot_testing::{InMemoryReservationStore, ReservationBuilder};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryReservationStore::new();
/// let owner = OwnerId::new("driver-1");
///
/// let mut feed = store.subscribe(&owner).await?;
/// assert!(feed.next().await.unwrap()?.is_empty());
///
/// let input = ReservationBuilder::new().build_input();
/// store.create(&Session::authenticated(owner.clone()), input).await?;
/// assert_eq!(feed.next().await.unwrap()?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct InMemoryReservationStore {
    clock: Arc<dyn Clock>,
    owners: Arc<RwLock<HashMap<OwnerId, OwnerFeed>>>,
    next_create_failure: Arc<Mutex<Option<StoreError>>>,
}

impl std::fmt::Debug for InMemoryReservationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryReservationStore")
            .field("owners", &self.owners.read().unwrap().len())
            .finish_non_exhaustive()
    }
}

impl InMemoryReservationStore {
    /// Create an empty store stamping `created_at` from the system clock
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store stamping `created_at` from `clock`
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            owners: Arc::new(RwLock::new(HashMap::new())),
            next_create_failure: Arc::new(Mutex::new(None)),
        }
    }

    /// Insert a fully formed reservation, bypassing validation.
    ///
    /// Useful for seeding states `create` never produces, such as a
    /// `Completed` status. Subscribers of the owner receive a new snapshot.
    pub fn seed(&self, reservation: Reservation) {
        let mut owners = self.owners.write().unwrap();
        let feed = owners
            .entry(reservation.owner_id.clone())
            .or_insert_with(OwnerFeed::new);
        feed.reservations.push(reservation);
        feed.publish();
    }

    /// Current snapshot for `owner`, newest first
    #[must_use]
    pub fn snapshot(&self, owner: &OwnerId) -> Snapshot {
        self.owners
            .read()
            .unwrap()
            .get(owner)
            .map_or_else(|| Snapshot::from(Vec::new()), OwnerFeed::snapshot)
    }

    /// Number of stored reservations across all owners
    #[must_use]
    pub fn len(&self) -> usize {
        self.owners
            .read()
            .unwrap()
            .values()
            .map(|feed| feed.reservations.len())
            .sum()
    }

    /// Check if the store holds no reservations
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live feeds currently open for `owner`
    #[must_use]
    pub fn subscriber_count(&self, owner: &OwnerId) -> usize {
        self.owners
            .read()
            .unwrap()
            .get(owner)
            .map_or(0, |feed| feed.sender.receiver_count())
    }

    /// Make the next `create` call fail with `error` after validation passes.
    pub fn fail_next_create(&self, error: StoreError) {
        *self.next_create_failure.lock().unwrap() = Some(error);
    }

    /// End every open feed of `owner` with a terminal `error`.
    ///
    /// Stored data is kept, and later subscriptions start a fresh feed.
    pub fn terminate_feed(&self, owner: &OwnerId, error: StoreError) {
        let mut owners = self.owners.write().unwrap();
        if let Some(feed) = owners.get_mut(owner) {
            let (fresh, _) = watch::channel(FeedState::Snapshot(feed.snapshot()));
            let old = std::mem::replace(&mut feed.sender, fresh);
            old.send_replace(FeedState::Terminated(error));
        }
    }

    /// Remove all reservations and close every feed (for test isolation)
    pub fn clear(&self) {
        self.owners.write().unwrap().clear();
    }

    fn take_create_failure(&self) -> Option<StoreError> {
        self.next_create_failure.lock().unwrap().take()
    }
}

impl Default for InMemoryReservationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReservationStore for InMemoryReservationStore {
    fn create<'a>(
        &'a self,
        session: &'a Session,
        input: ReservationInput,
    ) -> Pin<Box<dyn Future<Output = Result<ReservationId, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let owner = session.require_principal()?;
            input.check_window().map_err(StoreError::InvalidInput)?;
            if let Some(error) = self.take_create_failure() {
                return Err(error);
            }

            let id = ReservationId::new();
            let reservation = Reservation::from_input(id, owner.clone(), input, self.clock.now());

            let mut owners = self.owners.write().unwrap();
            let feed = owners.entry(owner.clone()).or_insert_with(OwnerFeed::new);
            feed.reservations.push(reservation);
            feed.publish();
            Ok(id)
        })
    }

    fn subscribe<'a>(
        &'a self,
        owner: &'a OwnerId,
    ) -> Pin<Box<dyn Future<Output = Result<SnapshotStream, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            let mut receiver = self
                .owners
                .write()
                .unwrap()
                .entry(owner.clone())
                .or_insert_with(OwnerFeed::new)
                .sender
                .subscribe();

            let stream = async_stream::stream! {
                loop {
                    let state = receiver.borrow_and_update().clone();
                    match state {
                        FeedState::Snapshot(snapshot) => yield Ok(snapshot),
                        FeedState::Terminated(error) => {
                            yield Err(error);
                            break;
                        }
                    }
                    if receiver.changed().await.is_err() {
                        break;
                    }
                }
            };
            Ok(Box::pin(stream) as SnapshotStream)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::ReservationBuilder;
    use crate::mocks::test_clock;
    use futures::StreamExt;

    fn store() -> InMemoryReservationStore {
        InMemoryReservationStore::with_clock(Arc::new(test_clock()))
    }

    #[tokio::test]
    async fn create_requires_a_principal() {
        let store = store();
        let result = store
            .create(&Session::anonymous(), ReservationBuilder::new().build_input())
            .await;
        assert_eq!(result, Err(StoreError::Unauthenticated));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn create_stamps_id_owner_and_created_at() {
        let store = store();
        let owner = OwnerId::new("driver");
        let id = store
            .create(&Session::authenticated(owner.clone()), ReservationBuilder::new().build_input())
            .await
            .unwrap();

        let snapshot = store.snapshot(&owner);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);
        assert_eq!(snapshot[0].owner_id, owner);
        assert_eq!(snapshot[0].created_at, test_clock().now());
    }

    #[tokio::test]
    async fn injected_failure_is_returned_once() {
        let store = store();
        let session = Session::authenticated(OwnerId::new("driver"));
        store.fail_next_create(StoreError::StoreUnavailable("backend down".into()));

        let first = store.create(&session, ReservationBuilder::new().build_input()).await;
        assert_eq!(first, Err(StoreError::StoreUnavailable("backend down".into())));
        assert!(store.is_empty());

        let second = store.create(&session, ReservationBuilder::new().build_input()).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn feeds_are_scoped_to_their_owner() {
        let store = store();
        let alice = OwnerId::new("alice");
        let bob = OwnerId::new("bob");

        let mut alice_feed = store.subscribe(&alice).await.unwrap();
        assert!(alice_feed.next().await.unwrap().unwrap().is_empty());

        store
            .create(&Session::authenticated(bob.clone()), ReservationBuilder::new().build_input())
            .await
            .unwrap();
        store
            .create(&Session::authenticated(alice.clone()), ReservationBuilder::new().build_input())
            .await
            .unwrap();

        let snapshot = alice_feed.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].owner_id, alice);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn dropping_a_feed_releases_the_subscription() {
        let store = store();
        let owner = OwnerId::new("driver");

        let feed = store.subscribe(&owner).await.unwrap();
        assert_eq!(store.subscriber_count(&owner), 1);
        drop(feed);
        assert_eq!(store.subscriber_count(&owner), 0);
    }

    #[tokio::test]
    async fn terminated_feed_yields_error_then_ends() {
        let store = store();
        let owner = OwnerId::new("driver");
        let mut feed = store.subscribe(&owner).await.unwrap();
        feed.next().await.unwrap().unwrap();

        store.terminate_feed(&owner, StoreError::StoreUnavailable("connection lost".into()));

        let item = feed.next().await.unwrap();
        assert_eq!(item, Err(StoreError::StoreUnavailable("connection lost".into())));
        assert!(feed.next().await.is_none());

        // A new subscription starts a fresh feed
        let mut again = store.subscribe(&owner).await.unwrap();
        assert!(again.next().await.unwrap().is_ok());
    }
}
