//! Core domain logic for the calendar tracker.
//!
//! This crate contains the pieces that turn a list of calendar events into
//! time-spent statistics:
//! - Civil dates: chronologically ordered day keys
//! - Category rules: ordered, first-match-wins classification of events
//! - Statistics: a single pass producing per-day and per-category totals

pub mod category;
pub mod civil_date;
pub mod event;
pub mod stats;

pub use category::{
    CategoryRule, CategorySpec, Field, Matcher, MatcherSpec, Pattern, RuleError, RuleSet,
    UNCATEGORIZED,
};
pub use civil_date::{CivilDate, sorted_keys};
pub use event::{Event, EventList, EventTime, Interval, SkipReason};
pub use stats::{CategoryTotals, DayTotals, SkippedEvent, Statistics, compute, percentage};
