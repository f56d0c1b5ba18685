//! Booking lifecycle classification.
//!
//! Splits an owner's reservations into **active** and **history** at a given
//! instant and derives the aggregates the dashboard and history screens show.
//!
//! Everything here is a pure function of `(reservations, now)`. Nothing reads a
//! global clock and nothing rewrites the stored [`ReservationStatus`]: a
//! reservation whose window has ended simply classifies as history the next
//! time it is classified.
//!
//! | stored status | `end_time > now` | partition |
//! |---------------|------------------|-----------|
//! | `Active`      | yes              | active    |
//! | `Active`      | no               | history   |
//! | `Completed`   | any              | history   |
//!
//! [`ReservationStatus`]: crate::types::ReservationStatus

use crate::types::{Money, Reservation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const MILLIS_PER_MINUTE: i64 = 60 * 1000;
const MILLIS_PER_HOUR: i64 = 60 * MILLIS_PER_MINUTE;

/// Disjoint, exhaustive split of a reservation set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Reservations still running or upcoming, input order preserved
    pub active: Vec<Reservation>,
    /// Completed or elapsed reservations, input order preserved
    pub history: Vec<Reservation>,
}

impl Partition {
    /// Total number of reservations across both sides
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len() + self.history.len()
    }

    /// Whether both sides are empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.history.is_empty()
    }

    /// Sum of amounts over both sides
    #[must_use]
    pub fn total_spent(&self) -> Money {
        total_spent(&self.active).saturating_add(total_spent(&self.history))
    }
}

/// Partition `reservations` into active and history at `now`.
///
/// A reservation is active when its stored status is active and its window has
/// not ended (`end_time > now`); everything else is history. Each input lands
/// on exactly one side and relative order is kept on both sides.
#[must_use]
pub fn classify(reservations: &[Reservation], now: DateTime<Utc>) -> Partition {
    let (active, history) = reservations
        .iter()
        .cloned()
        .partition(|reservation| reservation.is_active_at(now));
    Partition { active, history }
}

/// Sum of `amount` over `reservations`, saturating on overflow.
#[must_use]
pub fn total_spent(reservations: &[Reservation]) -> Money {
    reservations.iter().map(|r| r.amount).sum()
}

/// Mean `amount` over `reservations`, rounded down to the cent.
///
/// Zero for an empty slice.
#[must_use]
pub fn average_amount(reservations: &[Reservation]) -> Money {
    total_spent(reservations).div_floor_or_zero(reservations.len() as u64)
}

/// Time left before a reservation ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRemaining {
    /// Window still open; whole hours and leftover whole minutes
    Remaining {
        /// Whole hours left
        hours: i64,
        /// Whole minutes left after the hours
        minutes: i64,
    },
    /// Window has ended
    Expired,
}

impl TimeRemaining {
    /// Whether the window has ended
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }
}

impl fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired => f.write_str("Expired"),
            Self::Remaining { hours, minutes } if *hours > 0 => {
                write!(f, "{hours}h {minutes}m remaining")
            }
            Self::Remaining { minutes, .. } => write!(f, "{minutes}m remaining"),
        }
    }
}

/// Time left until `reservation.end_time`, measured from `now`.
///
/// Integer division of the millisecond difference, so partial minutes are
/// dropped. `Expired` once the difference reaches zero.
#[must_use]
pub fn time_remaining(reservation: &Reservation, now: DateTime<Utc>) -> TimeRemaining {
    let diff = (reservation.end_time - now).num_milliseconds();
    if diff <= 0 {
        return TimeRemaining::Expired;
    }
    TimeRemaining::Remaining {
        hours: diff / MILLIS_PER_HOUR,
        minutes: (diff % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE,
    }
}

/// Length of a window as `"{h}h {m}m"`, or `"{m}m"` under an hour.
///
/// Inverted windows render as `"0m"`.
#[must_use]
pub fn format_duration(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    let diff = (end - start).num_milliseconds().max(0);
    let hours = diff / MILLIS_PER_HOUR;
    let minutes = (diff % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{LotId, OwnerId, ReservationId, ReservationStatus};
    use chrono::Duration;

    fn base_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn reservation(end: DateTime<Utc>, status: ReservationStatus, cents: u64) -> Reservation {
        Reservation {
            id: ReservationId::new(),
            owner_id: OwnerId::new("owner"),
            resource_id: LotId::new("3"),
            resource_name: "Mall Parking Complex".to_string(),
            resource_location: "Shopping District".to_string(),
            slot_number: 1,
            start_time: end - Duration::hours(2),
            end_time: end,
            status,
            amount: Money::from_cents(cents),
            created_at: end - Duration::hours(3),
        }
    }

    #[test]
    fn classify_splits_on_end_time_and_status() {
        let now = base_time();
        let upcoming = reservation(now + Duration::hours(1), ReservationStatus::Active, 300);
        let elapsed = reservation(now - Duration::hours(1), ReservationStatus::Active, 500);
        let closed = reservation(now + Duration::hours(5), ReservationStatus::Completed, 700);

        let partition = classify(&[upcoming.clone(), elapsed.clone(), closed.clone()], now);

        assert_eq!(partition.active, vec![upcoming]);
        assert_eq!(partition.history, vec![elapsed, closed]);
        assert_eq!(partition.len(), 3);
    }

    #[test]
    fn end_time_equal_to_now_is_history() {
        let now = base_time();
        let ending = reservation(now, ReservationStatus::Active, 100);
        let partition = classify(std::slice::from_ref(&ending), now);
        assert!(partition.active.is_empty());
        assert_eq!(partition.history, vec![ending]);
    }

    #[test]
    fn classify_preserves_input_order() {
        let now = base_time();
        let items: Vec<Reservation> = (1..=4)
            .map(|h| reservation(now + Duration::hours(h), ReservationStatus::Active, 100))
            .collect();
        let partition = classify(&items, now);
        assert_eq!(partition.active, items);
    }

    #[test]
    fn aggregates_over_partition() {
        let now = base_time();
        let items = vec![
            reservation(now - Duration::hours(1), ReservationStatus::Active, 1000),
            reservation(now - Duration::hours(2), ReservationStatus::Completed, 500),
            reservation(now + Duration::hours(2), ReservationStatus::Active, 250),
        ];
        let partition = classify(&items, now);

        assert_eq!(total_spent(&partition.history), Money::from_cents(1500));
        assert_eq!(average_amount(&partition.history), Money::from_cents(750));
        assert_eq!(partition.total_spent(), Money::from_cents(1750));
    }

    #[test]
    fn average_of_empty_partition_is_zero() {
        assert_eq!(average_amount(&[]), Money::ZERO);
        assert_eq!(total_spent(&[]), Money::ZERO);
    }

    #[test]
    fn time_remaining_at_end_is_expired() {
        let now = base_time();
        let r = reservation(now, ReservationStatus::Active, 100);
        assert_eq!(time_remaining(&r, now), TimeRemaining::Expired);
        assert_eq!(time_remaining(&r, now + Duration::minutes(5)), TimeRemaining::Expired);
        assert_eq!(time_remaining(&r, now).to_string(), "Expired");
    }

    #[test]
    fn time_remaining_one_millisecond_before_end_rounds_down() {
        let now = base_time();
        let r = reservation(now, ReservationStatus::Active, 100);
        let remaining = time_remaining(&r, now - Duration::milliseconds(1));
        assert_eq!(remaining, TimeRemaining::Remaining { hours: 0, minutes: 0 });
        assert!(!remaining.is_expired());
    }

    #[test]
    fn time_remaining_formats_hours_and_minutes() {
        let now = base_time();
        let r = reservation(
            now + Duration::minutes(135) + Duration::seconds(59),
            ReservationStatus::Active,
            100,
        );
        let remaining = time_remaining(&r, now);
        assert_eq!(remaining, TimeRemaining::Remaining { hours: 2, minutes: 15 });
        assert_eq!(remaining.to_string(), "2h 15m remaining");

        let short = reservation(now + Duration::minutes(42), ReservationStatus::Active, 100);
        assert_eq!(time_remaining(&short, now).to_string(), "42m remaining");
    }

    #[test]
    fn format_duration_matches_history_listing() {
        let start = base_time();
        assert_eq!(format_duration(start, start + Duration::hours(3)), "3h 0m");
        assert_eq!(format_duration(start, start + Duration::minutes(90)), "1h 30m");
        assert_eq!(format_duration(start, start + Duration::minutes(45)), "45m");
        assert_eq!(format_duration(start, start - Duration::minutes(10)), "0m");
    }
}
