//! # Parkslot Core
//!
//! Core types and pure logic for parking-slot reservations.
//!
//! This crate provides the pieces that do not need a runtime:
//!
//! - **Types** ([`types`]): reservations, identifiers and the cents-based [`types::Money`]
//! - **Store contract** ([`store`]): the [`store::ReservationStore`] trait, sessions and errors
//! - **Lifecycle** ([`lifecycle`]): active/history classification and aggregates
//! - **Catalog** ([`catalog`]): bookable parking lots
//! - **History** ([`history`]): listing queries and dashboard totals
//! - **Environment** ([`environment`]): injected dependencies such as the clock
//!
//! ## Architecture Principles
//!
//! - Classification is a pure function of `(reservations, now)`
//! - Every store call is explicitly scoped to a principal
//! - Time is injected through [`environment::Clock`], never read ambiently
//!
//! ## Example
//!
//! ```
//! use parkslot_core::lifecycle::classify;
//! use parkslot_core::Utc;
//!
//! let partition = classify(&[], Utc::now());
//! assert!(partition.is_empty());
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

pub mod catalog;
pub mod history;
pub mod lifecycle;
pub mod store;
pub mod types;

pub use lifecycle::{Partition, TimeRemaining, classify};
pub use store::{ReservationStore, Session, Snapshot, SnapshotStream, StoreError};
pub use types::{LotId, Money, OwnerId, Reservation, ReservationId, ReservationInput, ReservationStatus};

/// Environment module - Dependency injection traits
///
/// All external dependencies that are not the store are abstracted behind
/// traits here and injected by the caller.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use parkslot_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let before = clock.now();
    /// assert!(clock.now() >= before);
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
