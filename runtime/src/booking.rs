//! Booking service: turns a booking form into a store create.
//!
//! The store only enforces structural invariants (`end > start`, positive
//! slot). Everything the booking form knows about is checked here first:
//!
//! - the lot exists in the catalog
//! - the duration is one of the offered durations
//! - the slot is in `1..=min(available_slots, max_selectable_slots)`
//! - the start is strictly later than `now + min_lead_time`
//!
//! The amount is `price_per_hour × duration_hours`, computed once and stored
//! verbatim. A failed create is reported once; nothing is retried.

use crate::config::BookingConfig;
use crate::metrics::BookingMetrics;
use chrono::{DateTime, Duration, Utc};
use parkslot_core::catalog::Catalog;
use parkslot_core::environment::Clock;
use parkslot_core::store::{ReservationStore, Session, StoreError};
use parkslot_core::types::{LotId, ReservationId, ReservationInput};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Errors from [`BookingService::create`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// The request failed a client-side check and never reached the store
    #[error("Invalid booking: {0}")]
    Validation(String),

    /// The store rejected the create or could not be reached
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BookingError {
    /// Whether the request itself was malformed, either locally or per the store
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Store(StoreError::InvalidInput(_))
        )
    }

    const fn metric_reason(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::Store(StoreError::InvalidInput(_)) => "validation",
            Self::Store(StoreError::Unauthenticated) => "unauthenticated",
            Self::Store(StoreError::StoreUnavailable(_)) => "unavailable",
        }
    }
}

/// What the booking form submits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    /// Lot to book
    pub lot: LotId,
    /// Window start
    pub start_time: DateTime<Utc>,
    /// Window length in whole hours
    pub duration_hours: u32,
    /// Slot inside the lot
    pub slot_number: u32,
}

impl BookingRequest {
    /// Window end implied by the start and duration, `None` past the
    /// representable range
    #[must_use]
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
            .checked_add_signed(Duration::hours(i64::from(self.duration_hours)))
    }
}

/// Validates booking requests and creates reservations.
pub struct BookingService {
    store: Arc<dyn ReservationStore>,
    catalog: Arc<Catalog>,
    clock: Arc<dyn Clock>,
    config: BookingConfig,
}

impl BookingService {
    /// Create a booking service.
    #[must_use]
    pub fn new(
        store: Arc<dyn ReservationStore>,
        catalog: Arc<Catalog>,
        clock: Arc<dyn Clock>,
        config: BookingConfig,
    ) -> Self {
        Self {
            store,
            catalog,
            clock,
            config,
        }
    }

    /// The catalog requests are checked against
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Check `request` at the current time and build the create command.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] naming the first failed check.
    pub fn prepare(&self, request: &BookingRequest) -> Result<ReservationInput, BookingError> {
        let lot = self
            .catalog
            .get(&request.lot)
            .ok_or_else(|| BookingError::Validation(format!("unknown lot {}", request.lot)))?;

        if !self.config.allows_duration(request.duration_hours) {
            return Err(BookingError::Validation(format!(
                "duration of {} hours is not offered",
                request.duration_hours
            )));
        }

        let max_slot = lot.available_slots.min(self.config.max_selectable_slots);
        if request.slot_number == 0 || request.slot_number > max_slot {
            return Err(BookingError::Validation(format!(
                "slot {} is not selectable in {} (1..={max_slot})",
                request.slot_number, lot.name
            )));
        }

        let earliest = self
            .clock
            .now()
            .checked_add_signed(self.config.min_lead_time())
            .ok_or_else(|| BookingError::Validation("lead time out of range".to_string()))?;
        if request.start_time <= earliest {
            return Err(BookingError::Validation(format!(
                "start time {} must be after {earliest}",
                request.start_time
            )));
        }

        let end_time = request
            .end_time()
            .ok_or_else(|| BookingError::Validation("end time out of range".to_string()))?;

        let amount = lot
            .quote(request.duration_hours)
            .ok_or_else(|| BookingError::Validation("amount overflows".to_string()))?;

        Ok(ReservationInput {
            resource_id: lot.id.clone(),
            resource_name: lot.name.clone(),
            resource_location: lot.location.clone(),
            slot_number: request.slot_number,
            start_time: request.start_time,
            end_time,
            amount,
        })
    }

    /// Validate `request` and create the reservation for the session's principal.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Unauthenticated`] (wrapped) when the session has no principal
    /// - [`BookingError::Validation`] when a client-side check fails
    /// - any other [`StoreError`] the store reports
    #[tracing::instrument(skip(self, session), fields(lot = %request.lot, slot = request.slot_number))]
    pub async fn create(
        &self,
        session: &Session,
        request: BookingRequest,
    ) -> Result<ReservationId, BookingError> {
        BookingMetrics::record_attempt();

        let result = self.create_inner(session, &request).await;
        match &result {
            Ok(id) => {
                tracing::info!(reservation_id = %id, "Booking created");
            }
            Err(e) => {
                BookingMetrics::record_rejected(e.metric_reason());
                if e.is_invalid_input() {
                    tracing::debug!(error = %e, "Booking rejected");
                } else {
                    tracing::warn!(error = %e, "Booking failed");
                }
            }
        }
        result
    }

    async fn create_inner(
        &self,
        session: &Session,
        request: &BookingRequest,
    ) -> Result<ReservationId, BookingError> {
        session.require_principal()?;
        let input = self.prepare(request)?;

        let started = Instant::now();
        let id = self.store.create(session, input).await?;
        BookingMetrics::record_created(started.elapsed());
        Ok(id)
    }
}
