//! Time-spent statistics.
//!
//! # Algorithm Summary
//!
//! One pass over the events in input order:
//! 1. Parse the event's interval; events that cannot yield a non-negative
//!    duration are recorded as skipped and contribute nothing
//! 2. Add the duration to the bucket of the event's civil date
//! 3. Add the duration to the bucket of the first matching category, or to
//!    [`UNCATEGORIZED`], in which case the event is also recorded as
//!    unrecognized
//!
//! Both groupings are filled from the same duration in the same step, so
//! their sums are always equal.

use std::collections::HashMap;

use chrono::Duration;

use crate::category::{RuleSet, UNCATEGORIZED};
use crate::civil_date::{CivilDate, sorted_keys};
use crate::event::{Event, SkipReason};

/// Accumulated duration per calendar day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayTotals(HashMap<CivilDate, Duration>);

impl DayTotals {
    pub fn get(&self, day: CivilDate) -> Option<Duration> {
        self.0.get(&day).copied()
    }

    /// Days with at least one contributing event, ascending.
    pub fn sorted_days(&self) -> Vec<CivilDate> {
        sorted_keys(&self.0)
    }

    /// `(day, total)` pairs, ascending by day.
    pub fn iter_sorted(&self) -> impl Iterator<Item = (CivilDate, Duration)> + '_ {
        self.sorted_days()
            .into_iter()
            .map(|day| (day, self.0[&day]))
    }

    pub fn total(&self) -> Duration {
        sum(self.0.values())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn add(&mut self, day: CivilDate, duration: Duration) {
        let entry = self.0.entry(day).or_insert_with(Duration::zero);
        *entry = saturating_add(*entry, duration);
    }
}

/// Accumulated duration per category name.
///
/// Only categories that received at least one event have a bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTotals(HashMap<String, Duration>);

impl CategoryTotals {
    pub fn get(&self, name: &str) -> Option<Duration> {
        self.0.get(name).copied()
    }

    /// Total for a category, zero if nothing was attributed to it.
    pub fn duration_of(&self, name: &str) -> Duration {
        self.get(name).unwrap_or_else(Duration::zero)
    }

    pub fn total(&self) -> Duration {
        sum(self.0.values())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn add(&mut self, name: &str, duration: Duration) {
        let entry = self
            .0
            .entry(name.to_string())
            .or_insert_with(Duration::zero);
        *entry = saturating_add(*entry, duration);
    }
}

fn sum<'a>(durations: impl Iterator<Item = &'a Duration>) -> Duration {
    durations.fold(Duration::zero(), |acc, d| saturating_add(acc, *d))
}

/// Durations here are never negative, so only the upper bound can be hit.
fn saturating_add(a: Duration, b: Duration) -> Duration {
    a.checked_add(&b).unwrap_or(Duration::MAX)
}

/// An event excluded from the totals, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEvent {
    pub event: Event,
    pub reason: SkipReason,
}

/// Result of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Statistics {
    pub day_totals: DayTotals,
    pub category_totals: CategoryTotals,
    /// Contributing events no rule matched, in input order.
    pub unrecognized: Vec<Event>,
    /// Non-contributing events, in input order. Never in `unrecognized`.
    pub skipped: Vec<SkippedEvent>,
}

impl Statistics {
    /// Sum of all contributing durations.
    pub fn grand_total(&self) -> Duration {
        self.day_totals.total()
    }

    /// Integer percentage of the grand total attributed to `category`.
    pub fn category_percentage(&self, category: &str) -> Option<i64> {
        percentage(self.category_totals.duration_of(category), self.grand_total())
    }
}

/// Truncating integer percentage of `part` in `total`, at millisecond
/// resolution.
///
/// Returns `None` when `total` is not positive, so callers decide how to
/// present a report with no recorded time.
pub fn percentage(part: Duration, total: Duration) -> Option<i64> {
    let total_ms = total.num_milliseconds();
    if total_ms <= 0 {
        return None;
    }
    let pct = i128::from(part.num_milliseconds()) * 100 / i128::from(total_ms);
    i64::try_from(pct).ok()
}

/// Computes per-day totals, per-category totals and the unrecognized events.
pub fn compute(events: &[Event], rules: &RuleSet) -> Statistics {
    let mut stats = Statistics::default();

    for event in events {
        let interval = match event.interval() {
            Ok(interval) => interval,
            Err(reason) => {
                tracing::warn!(
                    id = event.id.as_deref().unwrap_or("-"),
                    summary = %event.summary,
                    %reason,
                    "skipping event"
                );
                stats.skipped.push(SkippedEvent {
                    event: event.clone(),
                    reason,
                });
                continue;
            }
        };

        let duration = interval.duration();
        stats.day_totals.add(interval.civil_date(), duration);

        let category = rules.classify(event);
        stats.category_totals.add(category, duration);
        if category == UNCATEGORIZED {
            stats.unrecognized.push(event.clone());
        }
    }

    debug_assert_eq!(stats.day_totals.total(), stats.category_totals.total());
    tracing::debug!(
        events = events.len(),
        days = stats.day_totals.len(),
        categories = stats.category_totals.len(),
        unrecognized = stats.unrecognized.len(),
        skipped = stats.skipped.len(),
        "computed totals"
    );
    stats
}
