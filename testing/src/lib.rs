//! # Parkslot Testing
//!
//! Testing utilities and helpers for Parkslot.
//!
//! This crate provides:
//! - [`InMemoryReservationStore`]: a complete in-memory [`ReservationStore`] with failure injection
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - Fixture builders ([`ReservationBuilder`])
//! - proptest strategies for domain types ([`properties`])
//!
//! ## Example
//!
//! ```ignore
//! use parkslot_testing::{InMemoryReservationStore, ManualClock, test_clock};
//! use parkslot_runtime::LiveView;
//!
//! #[tokio::test]
//! async fn test_booking_flow() {
//!     let clock = Arc::new(ManualClock::new(test_clock().now()));
//!     let store = Arc::new(InMemoryReservationStore::with_clock(clock.clone()));
//!     let mut view = LiveView::new(store.clone(), clock.clone());
//!     view.bind(OwnerId::new("driver")).await;
//!     // ...
//! }
//! ```
//!
//! [`ReservationStore`]: parkslot_core::store::ReservationStore

use chrono::{DateTime, Utc};
use parkslot_core::environment::Clock;

pub mod reservation_store;

pub use reservation_store::InMemoryReservationStore;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::Duration;
    use std::sync::{Arc, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use parkslot_testing::mocks::FixedClock;
    /// use parkslot_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when a test moves it.
    ///
    /// Clones share the same time, so a test can keep one handle and give
    /// another to the code under test.
    ///
    /// # Example
    ///
    /// ```
    /// use parkslot_testing::mocks::{ManualClock, test_clock};
    /// use parkslot_core::environment::Clock;
    /// use chrono::Duration;
    ///
    /// let clock = ManualClock::new(test_clock().now());
    /// let shared = clock.clone();
    /// clock.advance(Duration::hours(2));
    /// assert_eq!(shared.now(), test_clock().now() + Duration::hours(2));
    /// ```
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock starting at `time`
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Move the clock forward (or backward, for a negative duration)
        pub fn advance(&self, by: Duration) {
            if let Ok(mut time) = self.time.write() {
                *time += by;
            }
        }

        /// Jump to an absolute time
        pub fn set(&self, to: DateTime<Utc>) {
            if let Ok(mut time) = self.time.write() {
                *time = to;
            }
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.time.read().map_or_else(|poisoned| *poisoned.into_inner(), |time| *time)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Fixture builders for reservations and create commands.
pub mod fixtures {
    use super::{Clock, DateTime, Utc};
    use crate::mocks::test_clock;
    use chrono::Duration;
    use parkslot_core::types::{
        LotId, Money, OwnerId, Reservation, ReservationId, ReservationInput, ReservationStatus,
    };

    /// Builder for [`Reservation`] and [`ReservationInput`] values.
    ///
    /// Defaults: lot "1" (Downtown Plaza Parking, $5/h), slot 1, a two hour
    /// window starting one hour after [`test_clock`], amount $10.00, owner
    /// "test-owner", active, created at [`test_clock`].
    #[derive(Clone, Debug)]
    pub struct ReservationBuilder {
        reservation: Reservation,
    }

    impl Default for ReservationBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ReservationBuilder {
        /// Start from the defaults
        #[must_use]
        pub fn new() -> Self {
            let now = test_clock().now();
            Self {
                reservation: Reservation {
                    id: ReservationId::new(),
                    owner_id: OwnerId::new("test-owner"),
                    resource_id: LotId::new("1"),
                    resource_name: "Downtown Plaza Parking".to_string(),
                    resource_location: "Downtown".to_string(),
                    slot_number: 1,
                    start_time: now + Duration::hours(1),
                    end_time: now + Duration::hours(3),
                    status: ReservationStatus::Active,
                    amount: Money::from_cents(1000),
                    created_at: now,
                },
            }
        }

        /// Set the owner
        #[must_use]
        pub fn owner(mut self, owner: &OwnerId) -> Self {
            self.reservation.owner_id = owner.clone();
            self
        }

        /// Set the lot name and location
        #[must_use]
        pub fn lot(mut self, id: &str, name: &str, location: &str) -> Self {
            self.reservation.resource_id = LotId::new(id);
            self.reservation.resource_name = name.to_string();
            self.reservation.resource_location = location.to_string();
            self
        }

        /// Set the slot number
        #[must_use]
        pub const fn slot(mut self, slot_number: u32) -> Self {
            self.reservation.slot_number = slot_number;
            self
        }

        /// Set the window
        #[must_use]
        pub const fn window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
            self.reservation.start_time = start;
            self.reservation.end_time = end;
            self
        }

        /// Set the window to end at `end`, keeping the two hour length
        #[must_use]
        pub fn ending_at(self, end: DateTime<Utc>) -> Self {
            self.window(end - Duration::hours(2), end)
        }

        /// Set the stored status
        #[must_use]
        pub const fn status(mut self, status: ReservationStatus) -> Self {
            self.reservation.status = status;
            self
        }

        /// Set the amount in cents
        #[must_use]
        pub const fn amount_cents(mut self, cents: u64) -> Self {
            self.reservation.amount = Money::from_cents(cents);
            self
        }

        /// Set the creation time
        #[must_use]
        pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
            self.reservation.created_at = created_at;
            self
        }

        /// Build a stored reservation
        #[must_use]
        pub fn build(self) -> Reservation {
            self.reservation
        }

        /// Build the create command carrying the same caller fields
        #[must_use]
        pub fn build_input(self) -> ReservationInput {
            let r = self.reservation;
            ReservationInput {
                resource_id: r.resource_id,
                resource_name: r.resource_name,
                resource_location: r.resource_location,
                slot_number: r.slot_number,
                start_time: r.start_time,
                end_time: r.end_time,
                amount: r.amount,
            }
        }
    }
}

/// Test helpers and utilities
pub mod helpers {
    use tracing_subscriber::EnvFilter;

    /// Install a test-friendly tracing subscriber once per process.
    ///
    /// Honours `RUST_LOG`; later calls are no-ops.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
            .with_test_writer()
            .try_init();
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use super::{DateTime, Utc};
    use chrono::Duration;
    use parkslot_core::types::{
        LotId, Money, OwnerId, Reservation, ReservationId, ReservationStatus,
    };
    use proptest::prelude::*;

    /// Any stored status
    pub fn arb_status() -> impl Strategy<Value = ReservationStatus> {
        prop_oneof![Just(ReservationStatus::Active), Just(ReservationStatus::Completed)]
    }

    /// A reservation whose window lies within two days either side of `anchor`.
    pub fn arb_reservation(anchor: DateTime<Utc>) -> impl Strategy<Value = Reservation> {
        (
            -2880_i64..2880,
            1_i64..=1440,
            1_u32..=20,
            0_u64..100_000,
            arb_status(),
        )
            .prop_map(move |(start_offset, length, slot, cents, status)| {
                let start_time = anchor + Duration::minutes(start_offset);
                Reservation {
                    id: ReservationId::new(),
                    owner_id: OwnerId::new("prop-owner"),
                    resource_id: LotId::new("1"),
                    resource_name: "Downtown Plaza Parking".to_string(),
                    resource_location: "Downtown".to_string(),
                    slot_number: slot,
                    start_time,
                    end_time: start_time + Duration::minutes(length),
                    status,
                    amount: Money::from_cents(cents),
                    created_at: start_time - Duration::hours(1),
                }
            })
    }

    /// Up to `max` reservations around `anchor`
    pub fn arb_reservations(
        anchor: DateTime<Utc>,
        max: usize,
    ) -> impl Strategy<Value = Vec<Reservation>> {
        prop::collection::vec(arb_reservation(anchor), 0..=max)
    }

    /// An instant within three days either side of `anchor`, millisecond precision
    pub fn arb_instant(anchor: DateTime<Utc>) -> impl Strategy<Value = DateTime<Utc>> {
        (-259_200_000_i64..259_200_000).prop_map(move |ms| anchor + Duration::milliseconds(ms))
    }
}

// Re-export commonly used items
pub use fixtures::ReservationBuilder;
pub use mocks::{FixedClock, ManualClock, test_clock};
