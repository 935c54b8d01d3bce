// src/formats/parsers.rs - Parse routines for the built-in timestamp syntaxes
//
// Each routine receives the raw timestamp substring captured by its variant's
// pattern. The patterns are permissive, so calendar validation happens here.

use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone,
};
use once_cell::sync::Lazy;
use regex::Regex;

use super::variant::ParsedTimestamp;
use crate::error::TimestampError;

static ISO_PARTS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^([0-9]{4})-?([0-9]{2})-?([0-9]{2})",          // date
        r"(?:[T\s])?([0-9]{2}):?([0-9]{2}):?([0-9]{2})", // time
        r"(?:[,.]([0-9]+))?",                             // fraction
        r"(Z|[+-][0-9]{2}(?::?[0-9]{2})?)?$",             // offset
    ))
    .expect("ISO parts regex must compile")
});

/// ISO-8601-like timestamps, with optional fraction and offset.
pub fn parse_iso8601(raw: &str) -> Result<ParsedTimestamp, TimestampError> {
    let caps = ISO_PARTS_RE
        .captures(raw)
        .ok_or(TimestampError::Malformed("ISO-8601"))?;

    let field = |i: usize| -> Result<u32, TimestampError> {
        caps[i]
            .parse()
            .map_err(|_| TimestampError::InvalidNumber(caps[i].to_string()))
    };
    let year = field(1)? as i32;
    let (month, day) = (field(2)?, field(3)?);
    let (hour, minute, second) = (field(4)?, field(5)?, field(6)?);
    let nanos = match caps.get(7) {
        Some(fraction) => fraction_to_nanos(fraction.as_str())?,
        None => 0,
    };

    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        TimestampError::InvalidDate(format!("{:04}-{:02}-{:02}", year, month, day))
    })?;
    let naive = date.and_hms_nano_opt(hour, minute, second, nanos).ok_or_else(|| {
        TimestampError::InvalidTime(format!("{:02}:{:02}:{:02}", hour, minute, second))
    })?;

    match caps.get(8) {
        None => Ok(ParsedTimestamp::Naive(naive)),
        Some(offset) => {
            let offset = parse_utc_offset(offset.as_str())?;
            offset
                .from_local_datetime(&naive)
                .single()
                .map(ParsedTimestamp::Aware)
                .ok_or_else(|| TimestampError::OutOfRange(format!("{} at offset {}", naive, offset)))
        }
    }
}

/// "Z", "+HH", "+HHMM" or "+HH:MM"
fn parse_utc_offset(text: &str) -> Result<FixedOffset, TimestampError> {
    let invalid = || TimestampError::InvalidOffset(text.to_string());
    if text == "Z" {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }
    let (sign, rest) = if let Some(rest) = text.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = text.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(invalid());
    };

    let digits = rest.replacen(':', "", 1);
    if !matches!(digits.len(), 2 | 4) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = if digits.len() == 4 {
        digits[2..].parse().map_err(|_| invalid())?
    } else {
        0
    };
    if minutes >= 60 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Sub-second digits of any length, truncated to nanosecond precision.
fn fraction_to_nanos(digits: &str) -> Result<u32, TimestampError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimestampError::InvalidFraction(digits.to_string()));
    }
    // ASCII only from here, so byte and char lengths agree
    let mut padded = digits[..digits.len().min(9)].to_string();
    while padded.len() < 9 {
        padded.push('0');
    }
    padded
        .parse()
        .map_err(|_| TimestampError::InvalidFraction(digits.to_string()))
}

/// BSD syslog "Mon dd HH:MM:SS", which carries no year.
pub fn parse_syslog(raw: &str, year: i32) -> Result<ParsedTimestamp, TimestampError> {
    // Day may be space padded ("Jul  4"), collapse runs of whitespace first
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let dt = NaiveDateTime::parse_from_str(&format!("{} {}", year, normalized), "%Y %b %d %H:%M:%S")?;
    Ok(ParsedTimestamp::Naive(dt))
}

/// Python http.server style "dd/Mon/YYYY HH:MM:SS".
pub fn parse_http_server(raw: &str) -> Result<ParsedTimestamp, TimestampError> {
    let dt = NaiveDateTime::parse_from_str(raw, "%d/%b/%Y %H:%M:%S")?;
    Ok(ParsedTimestamp::Naive(dt))
}

/// Combined access log "dd/Mon/YYYY:HH:MM:SS +HHMM".
pub fn parse_access_log(raw: &str) -> Result<ParsedTimestamp, TimestampError> {
    let dt = DateTime::parse_from_str(raw, "%d/%b/%Y:%H:%M:%S %z")?;
    Ok(ParsedTimestamp::Aware(dt))
}

/// Seconds since the epoch with a fractional part, e.g. "1694561169.550987".
pub fn parse_epoch_float(raw: &str) -> Result<ParsedTimestamp, TimestampError> {
    let (secs, frac) = raw
        .split_once('.')
        .ok_or(TimestampError::Malformed("fractional epoch"))?;
    let secs: i64 = secs
        .parse()
        .map_err(|_| TimestampError::InvalidNumber(secs.to_string()))?;
    epoch_to_local(secs, fraction_to_nanos(frac)?)
}

/// 13-digit milliseconds since the epoch.
pub fn parse_epoch_millis(raw: &str) -> Result<ParsedTimestamp, TimestampError> {
    let millis: i64 = raw
        .parse()
        .map_err(|_| TimestampError::InvalidNumber(raw.to_string()))?;
    let nanos = (millis.rem_euclid(1000) * 1_000_000) as u32;
    epoch_to_local(millis.div_euclid(1000), nanos)
}

/// 10-digit seconds since the epoch.
pub fn parse_epoch_seconds(raw: &str) -> Result<ParsedTimestamp, TimestampError> {
    let secs: i64 = raw
        .parse()
        .map_err(|_| TimestampError::InvalidNumber(raw.to_string()))?;
    epoch_to_local(secs, 0)
}

// Epoch values are shown in local wall-clock time
fn epoch_to_local(secs: i64, nanos: u32) -> Result<ParsedTimestamp, TimestampError> {
    Local
        .timestamp_opt(secs, nanos)
        .earliest()
        .map(|dt| ParsedTimestamp::Naive(dt.naive_local()))
        .ok_or_else(|| TimestampError::OutOfRange(format!("epoch value {}", secs)))
}
