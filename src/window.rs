// src/window.rs - Clipping merged output to a time window

use chrono::{Duration, NaiveDateTime};

use crate::error::MergeError;

/// Accepted absolute forms for --start/--end. These do not need to match the
/// formats used in the log files.
const ABSOLUTE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parse a window bound, either absolute (`2023-07-14 14:13:00.100`,
/// `2023-07-14T14:13`, `2023-07-14`) or relative to `now` (`15m`, `2h`,
/// `30s`, `1d`).
pub fn parse_time_bound(text: &str, now: NaiveDateTime) -> Result<NaiveDateTime, MergeError> {
    let text = text.trim();
    let invalid = || MergeError::InvalidTimeBound {
        value: text.to_string(),
    };

    if text.ends_with(|c: char| matches!(c.to_ascii_lowercase(), 's' | 'm' | 'h' | 'd')) {
        return parse_relative(text, now).ok_or_else(invalid);
    }

    // "," is accepted as the decimal point
    let normalized = text.replacen(',', ".", 1);
    for format in ABSOLUTE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Ok(dt);
        }
    }
    chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(invalid)
}

// "<n><unit>" meaning n units before now
fn parse_relative(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let split = text.find(|c: char| !c.is_ascii_digit())?;
    let (qty, unit) = text.split_at(split);
    if qty.is_empty() || unit.len() != 1 {
        return None;
    }
    let span = humantime::parse_duration(&format!("{}{}", qty, unit.to_ascii_lowercase())).ok()?;
    let span = Duration::from_std(span).ok()?;
    now.checked_sub_signed(span)
}

/// Inclusive time range used to select entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Default for TimeWindow {
    fn default() -> Self {
        TimeWindow {
            start: NaiveDateTime::MIN,
            end: NaiveDateTime::MAX,
        }
    }
}

impl TimeWindow {
    pub fn new(start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> Result<Self, MergeError> {
        let window = TimeWindow {
            start: start.unwrap_or(NaiveDateTime::MIN),
            end: end.unwrap_or(NaiveDateTime::MAX),
        };
        if window.end <= window.start {
            return Err(MergeError::EmptyWindow);
        }
        Ok(window)
    }

    /// Build a window from optional --start/--end strings.
    pub fn from_bounds(
        start: Option<&str>,
        end: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<Self, MergeError> {
        let start = start.map(|s| parse_time_bound(s, now)).transpose()?;
        let end = end.map(|s| parse_time_bound(s, now)).transpose()?;
        Self::new(start, end)
    }

    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }

    pub fn is_unbounded(&self) -> bool {
        self.start == NaiveDateTime::MIN && self.end == NaiveDateTime::MAX
    }
}
