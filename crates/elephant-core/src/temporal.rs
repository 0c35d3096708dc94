//! Temporal context derived for media items at upload time.
//!
//! Every media item records the weekday, a coarse time-of-day bucket and the
//! season of its upload. The buckets are computed once, in an explicit UTC
//! offset supplied by configuration, and never recomputed afterwards.

use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Coarse bucket for the local hour of an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    /// 00:00-05:59
    Night,
    /// 06:00-11:59
    Morning,
    /// 12:00-17:59
    Afternoon,
    /// 18:00-23:59
    Evening,
}

impl TimeOfDay {
    /// Bucket a 24-hour clock hour.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=5 => Self::Night,
            6..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            _ => Self::Evening,
        }
    }
}

/// Meteorological season (northern hemisphere).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    /// Bucket a calendar month (1 = January).
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            9..=11 => Self::Fall,
            _ => Self::Winter,
        }
    }
}

/// Frozen temporal facts about an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalContext {
    /// English weekday name, e.g. "Monday"
    pub day_of_week: String,
    pub time_of_day: TimeOfDay,
    pub season: Season,
}

impl TemporalContext {
    /// Compute the context of `instant` as observed in `offset`.
    pub fn at(instant: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local = instant.with_timezone(&offset);
        Self {
            day_of_week: weekday_name(local.weekday()).to_string(),
            time_of_day: TimeOfDay::from_hour(local.hour()),
            season: Season::from_month(local.month()),
        }
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Parse a configured UTC offset such as `+05:30`, `-08:00`, `Z` or `UTC`.
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("utc") || trimmed == "Z" {
        return Ok(utc_offset());
    }
    trimmed
        .parse::<FixedOffset>()
        .map_err(|e| Error::Config(format!("Invalid UTC offset '{}': {}", trimmed, e)))
}

/// The zero offset.
pub fn utc_offset() -> FixedOffset {
    Utc.fix()
}
