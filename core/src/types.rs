//! Domain types for parking-slot reservations.
//!
//! This module contains the identifiers, value objects and the single
//! [`Reservation`] entity shared by every other part of the workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a reservation, assigned by the store on creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReservationId(Uuid);

impl ReservationId {
    /// Creates a new random `ReservationId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the principal (user) that owns a reservation.
///
/// The value comes from whatever identity provider authenticated the caller,
/// so it is kept opaque.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OwnerId(String);

impl OwnerId {
    /// Wrap an identity-provider user id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a parking lot (the reserved resource).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LotId(String);

impl LotId {
    /// Wrap a lot identifier
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Non-negative monetary amount stored in cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount in dollars (rounded down)
    #[must_use]
    pub const fn dollars(&self) -> u64 {
        self.0 / 100
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts, `None` on overflow
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Adds two amounts, clamping at `u64::MAX` cents
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Multiplies by a quantity (e.g. hours), `None` on overflow
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Divides by a count, rounding down. Division by zero yields zero.
    #[must_use]
    pub const fn div_floor_or_zero(self, count: u64) -> Self {
        match self.0.checked_div(count) {
            Some(result) => Self(result),
            None => Self::ZERO,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl<'a> std::iter::Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// ============================================================================
// Reservation
// ============================================================================

/// Stored status of a reservation.
///
/// Every reservation is created `Active` and nothing in this workspace ever
/// rewrites it. Whether a reservation shows up as active or as history is
/// derived at read time from `end_time` (see [`crate::lifecycle`]), so this
/// field is advisory metadata rather than authoritative state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    /// Booked and not explicitly closed
    #[default]
    Active,
    /// Explicitly closed by some external process
    Completed,
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Completed => f.write_str("completed"),
        }
    }
}

/// Caller-supplied fields of a create command.
///
/// The owner is not part of the input: it comes from the [`crate::store::Session`]
/// bound to the call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationInput {
    /// Reserved parking lot
    pub resource_id: LotId,
    /// Display name of the lot at booking time
    pub resource_name: String,
    /// Area / neighbourhood of the lot at booking time
    pub resource_location: String,
    /// Slot inside the lot, starting at 1
    pub slot_number: u32,
    /// Window start
    pub start_time: DateTime<Utc>,
    /// Window end, strictly after `start_time`
    pub end_time: DateTime<Utc>,
    /// Price computed by the caller and stored verbatim
    pub amount: Money,
}

impl ReservationInput {
    /// Check the structural invariants the store enforces.
    ///
    /// # Errors
    ///
    /// Returns a human readable reason when `end_time <= start_time` or the
    /// slot number is zero.
    pub fn check_window(&self) -> Result<(), String> {
        if self.end_time <= self.start_time {
            return Err(format!(
                "end time {} must be after start time {}",
                self.end_time, self.start_time
            ));
        }
        if self.slot_number == 0 {
            return Err("slot number must be positive".to_string());
        }
        Ok(())
    }
}

/// One booked time window against one slot of a parking lot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Store-assigned identifier
    pub id: ReservationId,
    /// Principal that created the reservation
    pub owner_id: OwnerId,
    /// Reserved parking lot
    pub resource_id: LotId,
    /// Lot name captured at creation
    pub resource_name: String,
    /// Lot location captured at creation
    pub resource_location: String,
    /// Slot inside the lot
    pub slot_number: u32,
    /// Window start
    pub start_time: DateTime<Utc>,
    /// Window end
    pub end_time: DateTime<Utc>,
    /// Advisory status, see [`ReservationStatus`]
    pub status: ReservationStatus,
    /// Amount charged, computed client-side at creation
    pub amount: Money,
    /// Store-assigned creation time
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Materialize a stored reservation from a validated create command.
    #[must_use]
    pub fn from_input(
        id: ReservationId,
        owner_id: OwnerId,
        input: ReservationInput,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            resource_id: input.resource_id,
            resource_name: input.resource_name,
            resource_location: input.resource_location,
            slot_number: input.slot_number,
            start_time: input.start_time,
            end_time: input.end_time,
            status: ReservationStatus::Active,
            amount: input.amount,
            created_at,
        }
    }

    /// Whether this reservation belongs to the active partition at `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ReservationStatus::Active && self.end_time > now
    }

    /// Whether this reservation belongs to the history partition at `now`.
    ///
    /// Always the negation of [`Reservation::is_active_at`].
    #[must_use]
    pub fn is_history_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_active_at(now)
    }
}
