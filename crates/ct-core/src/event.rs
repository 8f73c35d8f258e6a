//! Calendar events as delivered by the calendar service.

use std::fmt;

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::civil_date::CivilDate;

/// A calendar entry.
///
/// The shape mirrors the Google Calendar event resource so that API pages
/// and cache files deserialize directly. Fields the tracker does not use are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventTime>,
}

/// Start or end of an event.
///
/// Timed events carry an RFC 3339 `dateTime`; all-day events carry only a
/// `date`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventTime {
    /// A timed boundary from an RFC 3339 string.
    pub fn at(date_time: impl Into<String>) -> Self {
        Self {
            date_time: Some(date_time.into()),
            ..Self::default()
        }
    }

    /// An all-day boundary from a `YYYY-MM-DD` string.
    pub fn all_day(date: impl Into<String>) -> Self {
        Self {
            date: Some(date.into()),
            ..Self::default()
        }
    }
}

/// A list of events, as returned by one API page or stored in the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventList {
    #[serde(default)]
    pub items: Vec<Event>,
}

impl EventList {
    pub const fn new(items: Vec<Event>) -> Self {
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Why an event cannot contribute a duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingStart,
    MissingEnd,
    /// All-day events have a date but no instant.
    AllDay,
    UnparseableStart,
    UnparseableEnd,
    /// The end instant precedes the start instant.
    NegativeDuration,
}

impl SkipReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingStart => "missing start",
            Self::MissingEnd => "missing end",
            Self::AllDay => "all-day event",
            Self::UnparseableStart => "unparseable start",
            Self::UnparseableEnd => "unparseable end",
            Self::NegativeDuration => "ends before it starts",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The parsed time span of a timed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl Interval {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// The day the interval is accounted to: the date of its start.
    pub fn civil_date(&self) -> CivilDate {
        CivilDate::of(&self.start)
    }
}

impl Event {
    /// Parses the start and end instants.
    ///
    /// Returns the reason the event is non-contributing if either boundary is
    /// absent, all-day, unparseable, or the span is negative. A zero-length
    /// span is valid.
    pub fn interval(&self) -> Result<Interval, SkipReason> {
        let start = parse_boundary(
            self.start.as_ref(),
            SkipReason::MissingStart,
            SkipReason::UnparseableStart,
        )?;
        let end = parse_boundary(
            self.end.as_ref(),
            SkipReason::MissingEnd,
            SkipReason::UnparseableEnd,
        )?;

        if end < start {
            return Err(SkipReason::NegativeDuration);
        }
        Ok(Interval { start, end })
    }

    /// Raw start string for display, if any.
    pub fn start_text(&self) -> Option<&str> {
        self.start
            .as_ref()
            .and_then(|t| t.date_time.as_deref().or(t.date.as_deref()))
    }
}

fn parse_boundary(
    time: Option<&EventTime>,
    missing: SkipReason,
    unparseable: SkipReason,
) -> Result<DateTime<FixedOffset>, SkipReason> {
    let Some(time) = time else {
        return Err(missing);
    };
    match (&time.date_time, &time.date) {
        (Some(raw), _) => DateTime::parse_from_rfc3339(raw).map_err(|_| unparseable),
        (None, Some(_)) => Err(SkipReason::AllDay),
        (None, None) => Err(missing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed(start: &str, end: &str) -> Event {
        Event {
            summary: "Standup".to_string(),
            start: Some(EventTime::at(start)),
            end: Some(EventTime::at(end)),
            ..Event::default()
        }
    }

    #[test]
    fn parses_timed_interval() {
        let event = timed("2024-01-01T09:00:00Z", "2024-01-01T10:30:00Z");
        let interval = event.interval().unwrap();
        assert_eq!(interval.duration(), Duration::minutes(90));
        assert_eq!(interval.civil_date(), CivilDate::new(2024, 1, 1).unwrap());
    }

    #[test]
    fn offsets_are_respected_in_duration() {
        let event = timed("2024-01-01T09:00:00+02:00", "2024-01-01T09:00:00+01:00");
        assert_eq!(event.interval().unwrap().duration(), Duration::hours(1));
    }

    #[test]
    fn zero_length_event_is_valid() {
        let event = timed("2024-01-01T09:00:00Z", "2024-01-01T09:00:00Z");
        assert_eq!(event.interval().unwrap().duration(), Duration::zero());
    }

    #[test]
    fn missing_boundaries() {
        let mut event = timed("2024-01-01T09:00:00Z", "2024-01-01T10:00:00Z");
        event.end = None;
        assert_eq!(event.interval(), Err(SkipReason::MissingEnd));

        event.start = None;
        assert_eq!(event.interval(), Err(SkipReason::MissingStart));

        event.start = Some(EventTime::default());
        assert_eq!(event.interval(), Err(SkipReason::MissingStart));
    }

    #[test]
    fn unparseable_boundaries() {
        let event = timed("yesterday", "2024-01-01T10:00:00Z");
        assert_eq!(event.interval(), Err(SkipReason::UnparseableStart));

        let event = timed("2024-01-01T09:00:00Z", "2024-01-01 10:00");
        assert_eq!(event.interval(), Err(SkipReason::UnparseableEnd));
    }

    #[test]
    fn all_day_event_is_skipped() {
        let event = Event {
            start: Some(EventTime::all_day("2024-01-01")),
            end: Some(EventTime::all_day("2024-01-02")),
            ..Event::default()
        };
        assert_eq!(event.interval(), Err(SkipReason::AllDay));
        assert_eq!(event.start_text(), Some("2024-01-01"));
    }

    #[test]
    fn negative_duration_is_skipped() {
        let event = timed("2024-01-01T10:00:00Z", "2024-01-01T09:00:00Z");
        assert_eq!(event.interval(), Err(SkipReason::NegativeDuration));
    }

    #[test]
    fn deserializes_google_event_resource() {
        let json = r#"{
            "kind": "calendar#event",
            "id": "abc123",
            "status": "confirmed",
            "summary": "Sprint retro",
            "start": {"dateTime": "2024-01-05T15:00:00+01:00", "timeZone": "Europe/Warsaw"},
            "end": {"dateTime": "2024-01-05T16:00:00+01:00", "timeZone": "Europe/Warsaw"}
        }"#;
        let event: Event = serde_json::from_str(json).unwrap();

        assert_eq!(event.id.as_deref(), Some("abc123"));
        assert_eq!(event.summary, "Sprint retro");
        assert_eq!(event.description, "");
        assert_eq!(event.interval().unwrap().duration(), Duration::hours(1));
    }

    #[test]
    fn event_list_without_items_is_empty() {
        let list: EventList = serde_json::from_str(r#"{"kind": "calendar#events"}"#).unwrap();
        assert!(list.is_empty());
    }
}
