//! Reservation store abstraction.
//!
//! The [`ReservationStore`] trait is the only boundary between the reservation
//! core and whatever durable, push-capable backend holds the bookings. It has
//! two operations:
//!
//! - [`ReservationStore::create`] persists one reservation on behalf of the
//!   principal bound to a [`Session`].
//! - [`ReservationStore::subscribe`] opens a live feed of full snapshots of one
//!   owner's reservations.
//!
//! # Snapshot feed contract
//!
//! ```text
//! create ──► store ──► [r3, r2, r1] ──► [r4, r3, r2, r1] ──► ...
//!                        snapshot          snapshot
//! ```
//!
//! - The first item is the current full set, even when it is empty.
//! - Every item is the complete set ordered by `created_at`, newest first.
//! - Items are strictly ordered within a subscription. Several rapid writes may
//!   be coalesced into one item carrying the latest state.
//! - Dropping the stream cancels the subscription and releases store resources.
//! - A failure the store cannot recover from is delivered as one terminal
//!   `Err` item, after which the stream ends.
//!
//! # Implementations
//!
//! - `InMemoryReservationStore` in `parkslot-testing` (tests, demos)

use crate::types::{OwnerId, Reservation, ReservationId, ReservationInput};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced at the store boundary.
///
/// `Clone` and `PartialEq` so the error can be carried inside a published read
/// model and compared in tests.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreError {
    /// No principal is bound to the call
    #[error("Unauthenticated: no principal bound to the call")]
    Unauthenticated,

    /// Malformed create command (bad time window, start not in the future, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Transport or backend failure
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Explicit principal scope for store calls.
///
/// Replaces ambient "current user" state: every write carries the session it
/// is made under, and an anonymous session is rejected with
/// [`StoreError::Unauthenticated`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    principal: Option<OwnerId>,
}

impl Session {
    /// A session with no principal bound
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { principal: None }
    }

    /// A session bound to `owner`
    #[must_use]
    pub const fn authenticated(owner: OwnerId) -> Self {
        Self {
            principal: Some(owner),
        }
    }

    /// The bound principal, if any
    #[must_use]
    pub const fn principal(&self) -> Option<&OwnerId> {
        self.principal.as_ref()
    }

    /// The bound principal.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unauthenticated`] for an anonymous session.
    pub fn require_principal(&self) -> Result<&OwnerId, StoreError> {
        self.principal.as_ref().ok_or(StoreError::Unauthenticated)
    }
}

/// One complete, ordered listing of an owner's reservations.
///
/// Shared rather than copied so that every subscriber and every published
/// read model can hold the same allocation.
pub type Snapshot = Arc<[Reservation]>;

/// Live feed of snapshots for one owner.
pub type SnapshotStream = Pin<Box<dyn Stream<Item = Result<Snapshot, StoreError>> + Send>>;

/// Durable home of reservations with a live query per owner.
///
/// # Dyn Compatibility
///
/// Methods return `Pin<Box<dyn Future>>` instead of `impl Future` so the store
/// can be shared as `Arc<dyn ReservationStore>` between the booking service
/// and the live view.
pub trait ReservationStore: Send + Sync {
    /// Persist a new reservation owned by the session's principal.
    ///
    /// The store assigns `id` and `created_at`, sets the status to active and
    /// pushes the new snapshot to the owner's subscribers. Overlapping bookings
    /// for the same slot are accepted.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Unauthenticated`] if the session has no principal
    /// - [`StoreError::InvalidInput`] if `end_time <= start_time` or the slot is 0;
    ///   nothing is written in that case
    /// - [`StoreError::StoreUnavailable`] on backend failure
    fn create<'a>(
        &'a self,
        session: &'a Session,
        input: ReservationInput,
    ) -> Pin<Box<dyn Future<Output = Result<ReservationId, StoreError>> + Send + 'a>>;

    /// Open a live snapshot feed for `owner`.
    ///
    /// See the module docs for the feed contract.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StoreUnavailable`] if the feed cannot be opened.
    fn subscribe<'a>(
        &'a self,
        owner: &'a OwnerId,
    ) -> Pin<Box<dyn Future<Output = Result<SnapshotStream, StoreError>> + Send + 'a>>;
}

/// Order a snapshot the way the feed contract requires: newest `created_at` first.
///
/// `reservations` must be in insertion order; ties on `created_at` are broken
/// by putting the later insertion first.
#[must_use]
pub fn newest_first(reservations: &[Reservation]) -> Snapshot {
    let mut ordered: Vec<Reservation> = reservations.iter().rev().cloned().collect();
    ordered.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    ordered.into()
}
