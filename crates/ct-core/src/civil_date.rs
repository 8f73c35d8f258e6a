//! Calendar dates used as aggregation keys.

use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone};
use serde::{Serialize, Serializer};

/// A calendar date with no time of day and no zone attached.
///
/// Field order matters: the derived `Ord` compares year, then month, then
/// day, which is ascending chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CivilDate {
    year: i32,
    month: u32,
    day: u32,
}

impl CivilDate {
    /// Creates a date, returning `None` if the triple is not a real date.
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self::from)
    }

    /// The date an instant falls on in its own offset.
    ///
    /// No zone conversion happens: `2024-01-01T23:30:00-05:00` is on
    /// 2024-01-01 even though it is already January 2nd in UTC.
    pub fn of<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self {
        Self::from(instant.date_naive())
    }
}

impl From<NaiveDate> for CivilDate {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }
}

impl fmt::Display for CivilDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl Serialize for CivilDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Returns the keys of a day-keyed map in ascending chronological order.
pub fn sorted_keys<V, S: BuildHasher>(map: &HashMap<CivilDate, V, S>) -> Vec<CivilDate> {
    let mut keys: Vec<CivilDate> = map.keys().copied().collect();
    // Map keys are distinct, so an unstable sort is still deterministic.
    keys.sort_unstable();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn date(year: i32, month: u32, day: u32) -> CivilDate {
        CivilDate::new(year, month, day).expect("valid test date")
    }

    #[test]
    fn orders_by_year_then_month_then_day() {
        assert!(date(2023, 12, 31) < date(2024, 1, 1));
        assert!(date(2024, 1, 31) < date(2024, 2, 1));
        assert!(date(2024, 2, 1) < date(2024, 2, 2));
        assert_eq!(date(2024, 2, 2), date(2024, 2, 2));
    }

    #[test]
    fn rejects_impossible_dates() {
        assert!(CivilDate::new(2023, 2, 29).is_none());
        assert!(CivilDate::new(2024, 13, 1).is_none());
        assert!(CivilDate::new(2024, 2, 29).is_some());
    }

    #[test]
    fn sorted_keys_are_ascending() {
        let mut map = HashMap::new();
        for d in [
            date(2024, 3, 1),
            date(2023, 12, 31),
            date(2024, 1, 15),
            date(2024, 1, 2),
        ] {
            map.insert(d, ());
        }

        assert_eq!(
            sorted_keys(&map),
            vec![
                date(2023, 12, 31),
                date(2024, 1, 2),
                date(2024, 1, 15),
                date(2024, 3, 1),
            ]
        );
    }

    #[test]
    fn sorting_sorted_keys_is_a_noop() {
        let map: HashMap<_, _> = [date(2024, 5, 2), date(2024, 5, 1), date(2025, 1, 1)]
            .into_iter()
            .map(|d| (d, 0))
            .collect();

        let once = sorted_keys(&map);
        let mut twice = once.clone();
        twice.sort_unstable();
        assert_eq!(once, twice);
    }

    #[test]
    fn sorted_keys_of_empty_map() {
        let map: HashMap<CivilDate, i64> = HashMap::new();
        assert!(sorted_keys(&map).is_empty());
    }

    #[test]
    fn civil_date_uses_the_instant_offset() {
        let instant = DateTime::parse_from_rfc3339("2024-01-01T23:30:00-05:00").unwrap();
        assert_eq!(CivilDate::of(&instant), date(2024, 1, 1));

        let utc = instant.with_timezone(&FixedOffset::east_opt(0).unwrap());
        assert_eq!(CivilDate::of(&utc), date(2024, 1, 2));
    }

    #[test]
    fn displays_as_iso_date() {
        assert_eq!(date(987, 3, 4).to_string(), "0987-03-04");
        assert_eq!(date(2024, 11, 30).to_string(), "2024-11-30");
    }
}
