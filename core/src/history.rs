//! Queries over classified reservations: history filtering and dashboard totals.

use crate::lifecycle::{Partition, average_amount, total_spent};
use crate::types::{Money, Reservation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Which lifecycle side a history listing keeps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusFilter {
    /// Keep everything
    #[default]
    All,
    /// Keep reservations that are active at the query time
    Active,
    /// Keep reservations that are history at the query time
    Completed,
}

/// Sort key for a history listing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortBy {
    /// Newest `created_at` first
    #[default]
    Date,
    /// Largest amount first
    Amount,
    /// Location, alphabetical
    Location,
}

/// Search, filter and sort options for a reservation listing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryQuery {
    /// Case-insensitive substring matched against lot name and location
    pub search: String,
    /// Lifecycle filter, evaluated at the query time
    pub status: StatusFilter,
    /// Ordering of the result
    pub sort: SortBy,
}

impl HistoryQuery {
    /// Query that keeps everything, newest first
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the search term
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    /// Set the status filter
    #[must_use]
    pub const fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    /// Set the sort key
    #[must_use]
    pub const fn with_sort(mut self, sort: SortBy) -> Self {
        self.sort = sort;
        self
    }

    /// Apply the query to `reservations` as seen at `now`.
    #[must_use]
    pub fn apply(&self, reservations: &[Reservation], now: DateTime<Utc>) -> Vec<Reservation> {
        let needle = self.search.trim().to_lowercase();
        let mut matched: Vec<Reservation> = reservations
            .iter()
            .filter(|r| {
                r.resource_name.to_lowercase().contains(&needle)
                    || r.resource_location.to_lowercase().contains(&needle)
            })
            .filter(|r| match self.status {
                StatusFilter::All => true,
                StatusFilter::Active => r.is_active_at(now),
                StatusFilter::Completed => r.is_history_at(now),
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| self.compare(a, b));
        matched
    }

    fn compare(&self, a: &Reservation, b: &Reservation) -> Ordering {
        match self.sort {
            SortBy::Date => b.created_at.cmp(&a.created_at),
            SortBy::Amount => b.amount.cmp(&a.amount),
            SortBy::Location => a
                .resource_location
                .to_lowercase()
                .cmp(&b.resource_location.to_lowercase()),
        }
    }
}

/// Totals shown on the dashboard and history screens.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// Reservations currently active
    pub active_count: usize,
    /// Reservations in history
    pub history_count: usize,
    /// Amount spent across active and history
    pub total_spent: Money,
    /// Amount spent on history only
    pub history_spent: Money,
    /// Mean history amount, zero when there is no history
    pub average_history_amount: Money,
    /// Most recent history entries, in partition order
    pub recent: Vec<Reservation>,
}

impl DashboardSummary {
    /// Summarize a partition, keeping at most `recent_limit` recent history entries.
    #[must_use]
    pub fn from_partition(partition: &Partition, recent_limit: usize) -> Self {
        Self::from_sides(&partition.active, &partition.history, recent_limit)
    }

    /// Summarize already classified sides.
    #[must_use]
    pub fn from_sides(active: &[Reservation], history: &[Reservation], recent_limit: usize) -> Self {
        let history_spent = total_spent(history);
        Self {
            active_count: active.len(),
            history_count: history.len(),
            total_spent: total_spent(active).saturating_add(history_spent),
            history_spent,
            average_history_amount: average_amount(history),
            recent: history.iter().take(recent_limit).cloned().collect(),
        }
    }
}
