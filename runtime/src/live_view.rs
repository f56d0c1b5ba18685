//! Live view: keeps an owner's classified reservations current.
//!
//! # Overview
//!
//! A [`LiveView`] binds to one principal, subscribes to that principal's
//! snapshot feed, and republishes every snapshot as a classified
//! [`ReadModel`]:
//!
//! ```text
//! ┌──────────────────┐  snapshots   ┌────────────┐  Arc<ReadModel>  ┌──────────┐
//! │ ReservationStore │ ───────────▶ │ FeedWorker │ ───────────────▶ │ watchers │
//! └──────────────────┘              └────────────┘   (watch chan)   └──────────┘
//!                                   classify(snapshot, clock.now())
//! ```
//!
//! # States
//!
//! ```text
//!   Idle ──bind──▶ Loading ──first snapshot──▶ Ready ──snapshot──▶ Ready
//!    ▲                │                          │
//!    │                └──── store error ───▶ Failed
//!    └──────────── teardown / principal lost ────┘
//! ```
//!
//! The worker task is the only writer while bound. Every publication
//! replaces the whole model, so a watcher never sees a half-updated
//! partition.
//!
//! # Example
//!
//! ```ignore
//! let mut view = LiveView::new(store, clock);
//! view.bind(OwnerId::new("driver-7")).await;
//!
//! let model = view.changed().await;
//! println!("{} active, {} past", model.active.len(), model.history.len());
//!
//! view.teardown().await;
//! ```

use crate::metrics::LiveViewMetrics;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use parkslot_core::environment::Clock;
use parkslot_core::history::DashboardSummary;
use parkslot_core::lifecycle::classify;
use parkslot_core::store::{ReservationStore, Session, Snapshot, StoreError};
use parkslot_core::types::{OwnerId, Reservation};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Lifecycle phase of a [`LiveView`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ViewPhase {
    /// Not bound to any principal
    #[default]
    Idle,
    /// Bound, waiting for the first snapshot
    Loading,
    /// Showing the latest snapshot
    Ready,
    /// The feed ended with a store error
    Failed,
}

/// What a live view publishes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadModel {
    /// Current phase
    pub phase: ViewPhase,
    /// Bound principal, `None` when idle
    pub owner: Option<OwnerId>,
    /// Latest raw snapshot, newest first
    pub snapshot: Snapshot,
    /// Active side of `snapshot` at `classified_at`
    pub active: Vec<Reservation>,
    /// History side of `snapshot` at `classified_at`
    pub history: Vec<Reservation>,
    /// Instant the partition was computed for
    pub classified_at: Option<DateTime<Utc>>,
    /// Terminal store error, set only in [`ViewPhase::Failed`]
    pub error: Option<StoreError>,
}

impl Default for ReadModel {
    fn default() -> Self {
        Self::idle()
    }
}

impl ReadModel {
    /// Unbound model
    #[must_use]
    pub fn idle() -> Self {
        Self {
            phase: ViewPhase::Idle,
            owner: None,
            snapshot: Snapshot::from(Vec::new()),
            active: Vec::new(),
            history: Vec::new(),
            classified_at: None,
            error: None,
        }
    }

    fn pending(owner: OwnerId) -> Self {
        Self {
            phase: ViewPhase::Loading,
            owner: Some(owner),
            ..Self::idle()
        }
    }

    fn classified(owner: OwnerId, snapshot: Snapshot, now: DateTime<Utc>) -> Self {
        let partition = classify(&snapshot, now);
        Self {
            phase: ViewPhase::Ready,
            owner: Some(owner),
            snapshot,
            active: partition.active,
            history: partition.history,
            classified_at: Some(now),
            error: None,
        }
    }

    fn failed(owner: OwnerId, error: StoreError) -> Self {
        Self {
            phase: ViewPhase::Failed,
            owner: Some(owner),
            error: Some(error),
            ..Self::idle()
        }
    }

    /// Whether the view is waiting for its first snapshot
    #[must_use]
    pub fn loading(&self) -> bool {
        self.phase == ViewPhase::Loading
    }

    /// Whether a snapshot has been classified
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.phase == ViewPhase::Ready
    }

    /// Dashboard totals over this model's partition
    #[must_use]
    pub fn summary(&self, recent_limit: usize) -> DashboardSummary {
        DashboardSummary::from_sides(&self.active, &self.history, recent_limit)
    }
}

struct Binding {
    owner: OwnerId,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Live, classified view of one principal's reservations.
///
/// Dropping the view aborts its worker, which drops the store subscription.
pub struct LiveView {
    store: Arc<dyn ReservationStore>,
    clock: Arc<dyn Clock>,
    model: Arc<watch::Sender<Arc<ReadModel>>>,
    observer: watch::Receiver<Arc<ReadModel>>,
    binding: Option<Binding>,
}

impl std::fmt::Debug for LiveView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveView")
            .field("owner", &self.owner())
            .field("phase", &self.model.borrow().phase)
            .finish_non_exhaustive()
    }
}

impl LiveView {
    /// Create an idle view over `store`, classifying with `clock`.
    #[must_use]
    pub fn new(store: Arc<dyn ReservationStore>, clock: Arc<dyn Clock>) -> Self {
        let (sender, observer) = watch::channel(Arc::new(ReadModel::idle()));
        Self {
            store,
            clock,
            model: Arc::new(sender),
            observer,
            binding: None,
        }
    }

    /// Principal currently bound, if any
    #[must_use]
    pub fn owner(&self) -> Option<&OwnerId> {
        self.binding.as_ref().map(|binding| &binding.owner)
    }

    /// Bind to `owner` and start following their feed.
    ///
    /// Any previous binding is torn down first. The published model moves to
    /// [`ViewPhase::Loading`] immediately and to [`ViewPhase::Ready`] once the
    /// first snapshot arrives.
    #[tracing::instrument(skip(self, owner), fields(owner = %owner))]
    pub async fn bind(&mut self, owner: OwnerId) {
        if let Some(previous) = self.stop_worker().await {
            tracing::debug!(previous = %previous, "Replacing binding");
        }

        self.model
            .send_replace(Arc::new(ReadModel::pending(owner.clone())));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = FeedWorker {
            store: Arc::clone(&self.store),
            clock: Arc::clone(&self.clock),
            owner: owner.clone(),
            model: Arc::clone(&self.model),
            shutdown: shutdown_rx,
        };
        let task = tokio::spawn(worker.run());

        LiveViewMetrics::record_bind();
        tracing::info!("Live view bound");

        self.binding = Some(Binding {
            owner,
            shutdown: shutdown_tx,
            task,
        });
    }

    /// Stop following the feed and return to [`ViewPhase::Idle`].
    ///
    /// Waits for the worker to exit, so no snapshot is published after this
    /// returns. A no-op when unbound.
    pub async fn teardown(&mut self) {
        let Some(owner) = self.stop_worker().await else {
            return;
        };

        self.model.send_replace(Arc::new(ReadModel::idle()));
        LiveViewMetrics::record_teardown();
        tracing::info!(owner = %owner, "Live view torn down");
    }

    async fn stop_worker(&mut self) -> Option<OwnerId> {
        let binding = self.binding.take()?;

        let _ = binding.shutdown.send(true);
        if let Err(e) = binding.task.await {
            if e.is_panic() {
                tracing::error!(owner = %binding.owner, error = %e, "Live view worker panicked");
            }
        }
        Some(binding.owner)
    }

    /// Follow an authentication change.
    ///
    /// Losing the principal tears the view down; a different principal
    /// rebinds; the same principal keeps the current binding.
    pub async fn follow_session(&mut self, session: &Session) {
        match session.principal() {
            None => self.teardown().await,
            Some(owner) if self.owner() == Some(owner) => {}
            Some(owner) => self.bind(owner.clone()).await,
        }
    }

    /// Latest published model
    #[must_use]
    pub fn current(&self) -> Arc<ReadModel> {
        self.model.borrow().clone()
    }

    /// Subscribe to published models.
    ///
    /// The receiver starts at the current model.
    #[must_use]
    pub fn updates(&self) -> watch::Receiver<Arc<ReadModel>> {
        self.model.subscribe()
    }

    /// Wait for the next publication and return it.
    pub async fn changed(&mut self) -> Arc<ReadModel> {
        // The sender lives in `self`, so the channel cannot close here
        let _ = self.observer.changed().await;
        self.observer.borrow_and_update().clone()
    }

    /// Latest model, reclassified at the clock's current time.
    ///
    /// Reservations whose window ended since the last snapshot show up in
    /// history even though nothing was written to the store. Non-ready
    /// models are returned unchanged.
    #[must_use]
    pub fn read(&self) -> Arc<ReadModel> {
        let current = self.current();
        if current.phase != ViewPhase::Ready {
            return current;
        }
        let Some(owner) = current.owner.clone() else {
            return current;
        };
        Arc::new(ReadModel::classified(
            owner,
            Arc::clone(&current.snapshot),
            self.clock.now(),
        ))
    }
}

impl Drop for LiveView {
    fn drop(&mut self) {
        if let Some(binding) = self.binding.take() {
            binding.task.abort();
        }
    }
}

/// Drives one binding: subscribes, classifies, publishes.
struct FeedWorker {
    store: Arc<dyn ReservationStore>,
    clock: Arc<dyn Clock>,
    owner: OwnerId,
    model: Arc<watch::Sender<Arc<ReadModel>>>,
    shutdown: watch::Receiver<bool>,
}

impl FeedWorker {
    #[allow(clippy::cognitive_complexity)]
    async fn run(mut self) {
        let subscription = tokio::select! {
            result = self.store.subscribe(&self.owner) => result,
            _ = self.shutdown.changed() => return,
        };

        let mut feed = match subscription {
            Ok(feed) => feed,
            Err(e) => {
                self.fail(e);
                return;
            }
        };

        while !*self.shutdown.borrow() {
            tokio::select! {
                item = feed.next() => match item {
                    Some(Ok(snapshot)) => self.publish(snapshot),
                    Some(Err(e)) => {
                        self.fail(e);
                        break;
                    }
                    None => {
                        self.fail(StoreError::StoreUnavailable(
                            "snapshot feed ended".to_string(),
                        ));
                        break;
                    }
                },
                _ = self.shutdown.changed() => {
                    tracing::debug!(owner = %self.owner, "Shutdown signal received");
                    break;
                }
            }
        }
    }

    fn publish(&self, snapshot: Snapshot) {
        let started = Instant::now();
        let now = self.clock.now();
        let model = ReadModel::classified(self.owner.clone(), snapshot, now);

        LiveViewMetrics::record_snapshot(model.active.len(), model.history.len(), started.elapsed());
        tracing::debug!(
            owner = %self.owner,
            active = model.active.len(),
            history = model.history.len(),
            "Snapshot classified"
        );

        self.model.send_replace(Arc::new(model));
    }

    fn fail(&self, error: StoreError) {
        LiveViewMetrics::record_failure();
        tracing::error!(owner = %self.owner, error = %error, "Live view feed failed");
        self.model
            .send_replace(Arc::new(ReadModel::failed(self.owner.clone(), error)));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use parkslot_testing::{ReservationBuilder, test_clock};

    #[test]
    fn idle_model_is_empty_and_not_loading() {
        let model = ReadModel::idle();
        assert_eq!(model.phase, ViewPhase::Idle);
        assert!(!model.loading());
        assert!(model.snapshot.is_empty());
        assert!(model.error.is_none());
    }

    #[test]
    fn failed_model_is_empty_and_not_loading() {
        let model = ReadModel::failed(
            OwnerId::new("driver"),
            StoreError::StoreUnavailable("gone".into()),
        );
        assert!(!model.loading());
        assert!(model.active.is_empty() && model.history.is_empty());
        assert_eq!(model.error, Some(StoreError::StoreUnavailable("gone".into())));
    }

    #[test]
    fn classified_model_splits_snapshot() {
        let now = test_clock().now();
        let upcoming = ReservationBuilder::new().build();
        let past = ReservationBuilder::new().ending_at(now).build();
        let snapshot: Snapshot = vec![upcoming.clone(), past.clone()].into();

        let model = ReadModel::classified(OwnerId::new("driver"), snapshot, now);
        assert!(model.is_ready());
        assert_eq!(model.active, vec![upcoming]);
        assert_eq!(model.history, vec![past]);
        assert_eq!(model.classified_at, Some(now));

        let summary = model.summary(3);
        assert_eq!(summary.active_count, 1);
        assert_eq!(summary.history_count, 1);
        assert_eq!(summary.recent.len(), 1);
    }
}
