//! Wall-clock time types for availability computation.
//!
//! Everything in slotbook is expressed in wall-clock time with no embedded
//! timezone: dates are `YYYY-MM-DD`, times are `HH:MM` (24-hour). This module
//! provides:
//!
//! - [`TimeInterval`]: a half-open `[start, end)` interval of wall-clock datetimes
//! - [`DateRange`]: an inclusive range of calendar dates
//! - parsing helpers and serde adapters for the textual formats

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Format used for wall-clock times (`HH:MM`).
pub const TIME_FORMAT: &str = "%H:%M";

/// Format used for calendar dates (`YYYY-MM-DD`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format used when writing wall-clock datetimes.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Errors produced while parsing textual dates and times.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    /// The value is not a valid `HH:MM` time.
    #[error("invalid time '{0}', expected HH:MM")]
    Time(String),

    /// The value is not a valid `YYYY-MM-DD` date.
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    Date(String),

    /// The value is not a valid datetime.
    #[error("invalid datetime '{0}', expected YYYY-MM-DDTHH:MM")]
    DateTime(String),
}

/// Parses a wall-clock time.
///
/// Accepts `HH:MM` as well as `HH:MM:SS`, which is what relational `time`
/// columns return. Seconds are truncated to keep minute precision.
pub fn parse_wall_time(value: &str) -> Result<NaiveTime, TimeParseError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S%.f"))
        .map(truncate_to_minute)
        .map_err(|_| TimeParseError::Time(value.to_string()))
}

/// Parses a `YYYY-MM-DD` calendar date.
pub fn parse_date(value: &str) -> Result<NaiveDate, TimeParseError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| TimeParseError::Date(value.to_string()))
}

/// Parses a wall-clock datetime.
///
/// Accepts `YYYY-MM-DDTHH:MM[:SS]` (a space separator works too). Values
/// carrying an offset (RFC 3339) are converted to UTC and the offset is
/// dropped, since the engine does no timezone normalization.
pub fn parse_wall_datetime(value: &str) -> Result<NaiveDateTime, TimeParseError> {
    let value = value.trim();
    const FORMATS: [&str; 6] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];

    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt);
        }
    }

    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.naive_utc())
        .map_err(|_| TimeParseError::DateTime(value.to_string()))
}

/// Returns the Sunday-first day-of-week index (0 = Sunday ... 6 = Saturday).
pub fn day_of_week(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

/// A half-open interval `[start, end)` of wall-clock datetimes.
///
/// Used both for occupied time (internal bookings, external busy reports)
/// and for the concrete occurrence of a weekly window on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeInterval {
    /// Start of the interval (inclusive).
    #[serde(with = "wall_datetime")]
    pub start: NaiveDateTime,
    /// End of the interval (exclusive).
    #[serde(with = "wall_datetime")]
    pub end: NaiveDateTime,
}

impl TimeInterval {
    /// Creates a new interval.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        assert!(start <= end, "TimeInterval start must be <= end");
        Self { start, end }
    }

    /// Creates a new interval, returning `None` when `start` is after `end`.
    pub fn try_new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Creates an interval from a start datetime and a length in minutes.
    pub fn from_minutes(start: NaiveDateTime, minutes: u32) -> Self {
        Self::new(start, saturating_add(start, Duration::minutes(i64::from(minutes))))
    }

    /// Covers a whole calendar day: `[date 00:00, date+1 00:00)`.
    ///
    /// On the last representable date the end is clamped to
    /// `NaiveDateTime::MAX`.
    pub fn for_date(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::MIN);
        Self::new(start, saturating_add(start, Duration::days(1)))
    }

    /// Returns the length of the interval.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Returns `true` if the interval covers no time.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Checks if a datetime falls within the interval (`start <= dt < end`).
    pub fn contains(&self, dt: NaiveDateTime) -> bool {
        self.start <= dt && dt < self.end
    }

    /// Half-open overlap test: `[s1, e1)` and `[s2, e2)` overlap iff
    /// `s1 < e2 && s2 < e1`.
    ///
    /// Intervals that merely touch (one ends exactly where the other starts)
    /// do not overlap.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First date (inclusive).
    pub start: NaiveDate,
    /// Last date (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a new inclusive date range.
    ///
    /// A range whose `start` is after `end` is valid but empty.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A single-day range.
    pub fn single(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    /// Returns `true` if the range contains no dates.
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Number of dates in the range.
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            ((self.end - self.start).num_days() + 1) as usize
        }
    }

    /// Checks if a date falls within the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Iterates every date from `start` to `end`, inclusive.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        std::iter::successors(Some(self.start), |d| d.succ_opt()).take_while(move |d| *d <= end)
    }

    /// The datetime span covered by the range: `[start 00:00, end+1 00:00)`.
    pub fn to_interval(&self) -> TimeInterval {
        let start = self.start.and_time(NaiveTime::MIN);
        let end = saturating_add(self.end.and_time(NaiveTime::MIN), Duration::days(1));
        TimeInterval::try_new(start, end).unwrap_or(TimeInterval { start, end: start })
    }
}

fn saturating_add(dt: NaiveDateTime, delta: Duration) -> NaiveDateTime {
    dt.checked_add_signed(delta).unwrap_or(NaiveDateTime::MAX)
}

/// Serde adapter for `HH:MM` wall-clock times.
pub mod wall_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(super::TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_wall_time(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for wall-clock datetimes.
pub mod wall_datetime {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&dt.format(super::DATETIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_wall_datetime(&raw).map_err(serde::de::Error::custom)
    }

    /// Same as the parent module, for `Option<NaiveDateTime>` fields.
    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            dt: &Option<NaiveDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match dt {
                Some(dt) => super::serialize(dt, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| super::super::parse_wall_datetime(&raw))
                .transpose()
                .map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    mod parsing {
        use super::*;

        #[test]
        fn wall_time_formats() {
            let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
            assert_eq!(parse_wall_time("09:00").unwrap(), nine);
            assert_eq!(parse_wall_time("09:00:00").unwrap(), nine);
            assert_eq!(parse_wall_time(" 09:00:45 ").unwrap(), nine);
            assert_eq!(
                parse_wall_time("9am"),
                Err(TimeParseError::Time("9am".to_string()))
            );
            assert!(parse_wall_time("25:00").is_err());
        }

        #[test]
        fn dates() {
            assert_eq!(parse_date("2025-03-03").unwrap(), date(2025, 3, 3));
            assert!(parse_date("03/03/2025").is_err());
        }

        #[test]
        fn wall_datetimes() {
            assert_eq!(
                parse_wall_datetime("2025-03-03T10:00").unwrap(),
                at(2025, 3, 3, 10, 0)
            );
            assert_eq!(
                parse_wall_datetime("2025-03-03 10:00:00").unwrap(),
                at(2025, 3, 3, 10, 0)
            );
            assert_eq!(
                parse_wall_datetime("2025-03-03T10:00:00+02:00").unwrap(),
                at(2025, 3, 3, 8, 0)
            );
            assert!(parse_wall_datetime("tomorrow").is_err());
        }

        #[test]
        fn sunday_first_day_of_week() {
            // 2025-03-02 is a Sunday
            assert_eq!(day_of_week(date(2025, 3, 2)), 0);
            assert_eq!(day_of_week(date(2025, 3, 3)), 1);
            assert_eq!(day_of_week(date(2025, 3, 8)), 6);
        }
    }

    mod time_interval {
        use super::*;

        #[test]
        fn creation() {
            let interval = TimeInterval::from_minutes(at(2025, 3, 3, 10, 0), 30);
            assert_eq!(interval.end, at(2025, 3, 3, 10, 30));
            assert_eq!(interval.duration(), Duration::minutes(30));
            assert!(!interval.is_empty());
        }

        #[test]
        #[should_panic(expected = "start must be <= end")]
        fn invalid_interval() {
            TimeInterval::new(at(2025, 3, 3, 12, 0), at(2025, 3, 3, 9, 0));
        }

        #[test]
        fn try_new_rejects_reversed() {
            assert!(TimeInterval::try_new(at(2025, 3, 3, 12, 0), at(2025, 3, 3, 9, 0)).is_none());
        }

        #[test]
        fn half_open_overlap() {
            let window = TimeInterval::new(at(2025, 3, 3, 9, 0), at(2025, 3, 3, 12, 0));

            // Inside
            let inside = TimeInterval::new(at(2025, 3, 3, 10, 0), at(2025, 3, 3, 10, 30));
            assert!(window.overlaps(&inside));
            assert!(inside.overlaps(&window));

            // Straddling either edge
            let early = TimeInterval::new(at(2025, 3, 3, 8, 0), at(2025, 3, 3, 9, 30));
            let late = TimeInterval::new(at(2025, 3, 3, 11, 30), at(2025, 3, 3, 13, 0));
            assert!(window.overlaps(&early));
            assert!(window.overlaps(&late));

            // Covering the whole window
            let covering = TimeInterval::new(at(2025, 3, 3, 0, 0), at(2025, 3, 4, 0, 0));
            assert!(window.overlaps(&covering));

            // Touching edges do not overlap
            let before = TimeInterval::new(at(2025, 3, 3, 8, 0), at(2025, 3, 3, 9, 0));
            let after = TimeInterval::new(at(2025, 3, 3, 12, 0), at(2025, 3, 3, 13, 0));
            assert!(!window.overlaps(&before));
            assert!(!window.overlaps(&after));
        }

        #[test]
        fn contains_is_half_open() {
            let interval = TimeInterval::new(at(2025, 3, 3, 9, 0), at(2025, 3, 3, 10, 0));
            assert!(interval.contains(at(2025, 3, 3, 9, 0)));
            assert!(!interval.contains(at(2025, 3, 3, 10, 0)));
        }

        #[test]
        fn for_date_spans_a_day() {
            let day = TimeInterval::for_date(date(2025, 3, 3));
            assert_eq!(day.start, at(2025, 3, 3, 0, 0));
            assert_eq!(day.end, at(2025, 3, 4, 0, 0));
        }

        #[test]
        fn last_representable_day_is_clamped() {
            let day = TimeInterval::for_date(NaiveDate::MAX);
            assert_eq!(day.start, NaiveDate::MAX.and_time(NaiveTime::MIN));
            assert_eq!(day.end, NaiveDateTime::MAX);
            assert!(day.contains(NaiveDate::MAX.and_hms_opt(12, 0, 0).unwrap()));

            let late = NaiveDate::MAX.and_hms_opt(23, 0, 0).unwrap();
            let long = TimeInterval::from_minutes(late, 120);
            assert_eq!(long.end, NaiveDateTime::MAX);
        }

        #[test]
        fn serializes_as_wall_clock_text() {
            let interval = TimeInterval::new(at(2025, 3, 3, 9, 0), at(2025, 3, 3, 10, 0));
            let json = serde_json::to_value(interval).unwrap();
            assert_eq!(json["start"], "2025-03-03T09:00:00");
            assert_eq!(json["end"], "2025-03-03T10:00:00");
        }
    }

    mod date_range {
        use super::*;

        #[test]
        fn iterates_inclusive() {
            let range = DateRange::new(date(2025, 2, 27), date(2025, 3, 2));
            let days: Vec<_> = range.days().collect();
            assert_eq!(
                days,
                vec![
                    date(2025, 2, 27),
                    date(2025, 2, 28),
                    date(2025, 3, 1),
                    date(2025, 3, 2)
                ]
            );
            assert_eq!(range.len(), 4);
        }

        #[test]
        fn reversed_range_is_empty() {
            let range = DateRange::new(date(2025, 3, 5), date(2025, 3, 1));
            assert!(range.is_empty());
            assert_eq!(range.len(), 0);
            assert_eq!(range.days().count(), 0);
        }

        #[test]
        fn interval_covers_last_day() {
            let range = DateRange::new(date(2025, 3, 3), date(2025, 3, 4));
            let interval = range.to_interval();
            assert_eq!(interval.start, at(2025, 3, 3, 0, 0));
            assert_eq!(interval.end, at(2025, 3, 5, 0, 0));
            assert!(interval.contains(at(2025, 3, 4, 23, 59)));
        }

        #[test]
        fn range_ending_on_max_date() {
            let last = NaiveDate::MAX;
            let range = DateRange::new(last.pred_opt().unwrap(), last);
            assert_eq!(range.days().count(), 2);
            assert_eq!(range.to_interval().end, NaiveDateTime::MAX);
        }
    }
}
