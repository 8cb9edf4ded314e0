//! Calendar dates and quality-check timestamps as stored on disk.
//!
//! Dates are 8-digit `YYYYMMDD` strings; check times append a wall-clock
//! time without a separator: `YYYYMMDDhh:mm:ss`.

use std::fmt;
use std::str::FromStr;

use chrono::{Days, Local, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ModelError;

/// A calendar date rendered as `YYYYMMDD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabDate(NaiveDate);

impl LabDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Today in the local timezone.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    /// Parse `YYYYMMDD`. `YYYY-MM-DD` is accepted as well and normalised.
    pub fn parse(value: &str) -> Result<Self, ModelError> {
        let trimmed = value.trim();
        let parsed = if trimmed.len() == 8 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            parse_compact(trimmed)
        } else {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
        };
        parsed.map(Self).ok_or_else(|| ModelError::InvalidDate {
            value: value.to_string(),
        })
    }

    /// Strict `YYYYMMDD` parse, used for file names and check-time prefixes.
    pub fn parse_compact(value: &str) -> Option<Self> {
        if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        parse_compact(value).map(Self)
    }

    pub fn naive(self) -> NaiveDate {
        self.0
    }

    /// Date `days` after this one. Saturates at the calendar maximum.
    pub fn plus_days(self, days: u32) -> Self {
        self.0
            .checked_add_days(Days::new(u64::from(days)))
            .map_or(self, Self)
    }

    /// Signed number of days from `self` until `later`.
    pub fn days_until(self, later: LabDate) -> i64 {
        (later.0 - self.0).num_days()
    }
}

fn parse_compact(digits: &str) -> Option<NaiveDate> {
    let year = digits.get(0..4)?.parse().ok()?;
    let month = digits.get(4..6)?.parse().ok()?;
    let day = digits.get(6..8)?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

impl fmt::Display for LabDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y%m%d"))
    }
}

impl FromStr for LabDate {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for LabDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LabDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Serde helper for optional dates where older documents wrote `""` or `null`.
pub mod optional {
    use serde::{Deserialize, Deserializer};

    use super::LabDate;

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<LabDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            Some(s) if !s.trim().is_empty() => LabDate::parse(&s)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}

/// Timestamp of a quality check: `YYYYMMDDhh:mm:ss`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CheckTime {
    date: LabDate,
    time: NaiveTime,
}

impl CheckTime {
    pub fn new(date: LabDate, time: NaiveTime) -> Self {
        Self { date, time }
    }

    /// Midnight on `date`; used for the check seeded at dish creation.
    pub fn start_of_day(date: LabDate) -> Self {
        Self {
            date,
            time: NaiveTime::MIN,
        }
    }

    pub fn now() -> Self {
        let now = Local::now().naive_local();
        let time = now.time();
        Self {
            date: LabDate(now.date()),
            time: time.with_nanosecond(0).unwrap_or(time),
        }
    }

    pub fn parse(value: &str) -> Result<Self, ModelError> {
        let err = || ModelError::InvalidCheckTime {
            value: value.to_string(),
        };
        let trimmed = value.trim();
        if trimmed.len() != 16 {
            return Err(err());
        }
        let date = trimmed
            .get(0..8)
            .and_then(LabDate::parse_compact)
            .ok_or_else(err)?;
        let time = trimmed
            .get(8..)
            .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M:%S").ok())
            .ok_or_else(err)?;
        Ok(Self { date, time })
    }

    pub fn date(self) -> LabDate {
        self.date
    }
}

impl fmt::Display for CheckTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.date, self.time.format("%H:%M:%S"))
    }
}

impl FromStr for CheckTime {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for CheckTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CheckTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Date part of a quality-check key. Structured checks are keyed by a full
/// check time; older free-text notes were keyed by a bare date.
pub fn check_key_date(key: &str) -> Option<LabDate> {
    if key.contains(':') {
        key.get(0..8).and_then(LabDate::parse_compact)
    } else {
        LabDate::parse_compact(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> LabDate {
        LabDate::from_ymd(y, m, d).unwrap_or_else(|| panic!("bad test date"))
    }

    #[test]
    fn parses_compact_and_dashed_dates() {
        assert_eq!(LabDate::parse("20250127"), Ok(date(2025, 1, 27)));
        assert_eq!(LabDate::parse("2025-01-27"), Ok(date(2025, 1, 27)));
        assert_eq!(date(2025, 1, 27).to_string(), "20250127");
    }

    #[test]
    fn rejects_impossible_dates() {
        assert!(LabDate::parse("20250230").is_err());
        assert!(LabDate::parse("2025013").is_err());
        assert!(LabDate::parse("").is_err());
        assert!(LabDate::parse_compact("2025-01-27").is_none());
    }

    #[test]
    fn plus_days_crosses_month_boundaries() {
        assert_eq!(date(2025, 1, 27).plus_days(60), date(2025, 3, 28));
        assert_eq!(date(2025, 1, 27).days_until(date(2025, 3, 28)), 60);
        assert_eq!(date(2025, 3, 28).days_until(date(2025, 1, 27)), -60);
    }

    #[test]
    fn check_time_display_matches_storage_format() {
        let ct = CheckTime::parse("2025012714:05:09").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(ct.date(), date(2025, 1, 27));
        assert_eq!(ct.to_string(), "2025012714:05:09");
        assert_eq!(
            CheckTime::start_of_day(date(2025, 1, 27)).to_string(),
            "2025012700:00:00"
        );
    }

    #[test]
    fn check_time_rejects_other_shapes() {
        assert!(CheckTime::parse("20250127").is_err());
        assert!(CheckTime::parse("2025-01-27T14:05:09").is_err());
        assert!(CheckTime::parse("2025012725:00:00").is_err());
    }

    #[test]
    fn check_key_date_handles_both_key_styles() {
        assert_eq!(check_key_date("2025012714:05:09"), Some(date(2025, 1, 27)));
        assert_eq!(check_key_date("20250127"), Some(date(2025, 1, 27)));
        assert_eq!(check_key_date("yesterday"), None);
    }

    #[test]
    fn optional_dates_treat_blank_as_missing() {
        #[derive(serde::Deserialize)]
        struct Probe {
            #[serde(default, deserialize_with = "optional::deserialize")]
            when: Option<LabDate>,
        }

        let blank: Probe =
            serde_json::from_str(r#"{"when": ""}"#).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(blank.when, None);
        let null: Probe =
            serde_json::from_str(r#"{"when": null}"#).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(null.when, None);
        let absent: Probe = serde_json::from_str("{}").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(absent.when, None);
        let set: Probe =
            serde_json::from_str(r#"{"when": "20250330"}"#).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(set.when, Some(date(2025, 3, 30)));
    }
}
