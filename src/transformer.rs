// src/transformer.rs - Per-stream timestamp extraction

use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Datelike, Local, NaiveDateTime};
use tracing::warn;

use crate::ansi::strip_escape_sequences;
use crate::error::{FormatError, TimestampError};
use crate::formats::{FormatVariant, ParsedTimestamp};

/// Metadata about the file a stream was read from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileContext {
    /// Year the file was created (or last modified), for formats without a year.
    pub creation_year: Option<i32>,
}

impl FileContext {
    pub fn with_year(year: i32) -> Self {
        FileContext {
            creation_year: Some(year),
        }
    }

    /// Read the file's creation time, falling back to its modification time.
    /// Missing metadata is not an error; year-less formats then use the
    /// current year.
    pub fn from_path(path: &Path) -> Self {
        let stamp = std::fs::metadata(path).and_then(|meta| meta.created().or_else(|_| meta.modified()));
        match stamp {
            Ok(time) => FileContext {
                creation_year: Some(year_of(time)),
            },
            Err(e) => {
                warn!(
                    file = %path.display(),
                    error = %e,
                    "no file timestamp available, year-less timestamps will use the current year"
                );
                FileContext::default()
            }
        }
    }
}

fn year_of(time: SystemTime) -> i32 {
    DateTime::<Local>::from(time).year()
}

/// A line split into its timestamp and the remaining text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResult {
    pub timestamp: Option<NaiveDateTime>,
    pub residual: String,
}

/// Extracts timestamps from the lines of one stream using a single format.
#[derive(Debug, Clone)]
pub struct LineTransformer {
    variant: FormatVariant,
    file_context: Option<FileContext>,
}

impl LineTransformer {
    pub fn new(variant: FormatVariant) -> Self {
        LineTransformer {
            variant,
            file_context: None,
        }
    }

    pub fn with_file_context(mut self, context: FileContext) -> Self {
        self.file_context = Some(context);
        self
    }

    pub fn variant(&self) -> &FormatVariant {
        &self.variant
    }

    pub fn file_context(&self) -> Option<&FileContext> {
        self.file_context.as_ref()
    }

    /// Split `line` into (timestamp, residual text).
    ///
    /// Lines that do not start with a timestamp (e.g. stack trace
    /// continuations) yield no timestamp and the line indented by one space,
    /// so they stay aligned with their timestamped siblings. A line whose
    /// timestamp matches the pattern but is not a valid date is an error.
    pub fn parse(&self, line: &str) -> Result<ParseResult, FormatError> {
        let regex = self.variant.regex();
        let (timestamp, residual) = match regex.captures(line) {
            Some(caps) => {
                let raw = caps
                    .get(self.variant.spec().timestamp_group)
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                let parsed = self
                    .variant
                    .parse_timestamp(raw, self.file_context.as_ref())?;
                let timestamp = self.normalize(raw, parsed)?;
                let residual =
                    regex.replacen(line, 1, self.variant.spec().strip_replacement.as_str());
                (Some(timestamp), residual.into_owned())
            }
            None => (None, format!(" {}", line)),
        };

        Ok(ParseResult {
            timestamp,
            residual: strip_escape_sequences(&residual).trim_end().to_string(),
        })
    }

    fn normalize(&self, raw: &str, parsed: ParsedTimestamp) -> Result<NaiveDateTime, FormatError> {
        match parsed {
            ParsedTimestamp::Aware(_) if !self.variant.has_timezone() => Err(FormatError::parse(
                self.variant.name(),
                raw,
                TimestampError::UnexpectedOffset,
            )),
            parsed => Ok(parsed.into_naive()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{FormatRegistry, TimestampKind};
    use chrono::{NaiveDate, Timelike};

    fn expected() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 7, 14)
            .unwrap()
            .and_hms_milli_opt(14, 13, 0, 100)
            .unwrap()
    }

    fn parse_sample(line: &str) -> ParseResult {
        FormatRegistry::builtin()
            .bind(line)
            .unwrap()
            .parse(line)
            .unwrap()
    }

    #[test]
    fn test_iso_lines() {
        for line in [
            "2023-07-14 14:13:00,100 message",
            "2023-07-14T14:13:00,100 message",
            "2023-07-14 14:13:00.100 message",
            "2023-07-14T14:13:00.100 message",
        ] {
            let result = parse_sample(line);
            assert_eq!(result.timestamp, Some(expected()), "line {:?}", line);
            assert_eq!(result.residual, "message");
        }

        let result = parse_sample("2023-07-14 14:13:00 message");
        assert_eq!(result.timestamp, Some(expected().with_nanosecond(0).unwrap()));
    }

    #[test]
    fn test_timezone_equivalence() {
        let zulu = parse_sample("2023-07-14T14:13:00Z message");
        let offset = parse_sample("2023-07-14T14:13:00+00:00 message");
        let compact = parse_sample("2023-07-14T14:13:00+0000 message");
        assert_eq!(zulu.timestamp, offset.timestamp);
        assert_eq!(zulu.timestamp, compact.timestamp);
        assert_eq!(zulu.timestamp, Some(expected().with_nanosecond(0).unwrap()));
    }

    #[test]
    fn test_offset_dropped_not_converted() {
        let result = parse_sample("2023-07-14 14:13:00.100+05:00 message");
        assert_eq!(result.timestamp, Some(expected()));
    }

    #[test]
    fn test_epoch_equivalence() {
        let float = parse_sample("1689343980.100 message");
        let millis = parse_sample("1689343980100 message");
        let secs = parse_sample("1689343980 message");
        assert_eq!(float.timestamp, millis.timestamp);
        assert_eq!(
            float.timestamp.map(|ts| ts.with_nanosecond(0).unwrap()),
            secs.timestamp
        );
        assert_eq!(secs.residual, "message");
    }

    #[test]
    fn test_http_server_keeps_leading_context() {
        let line = r#"::1 - - [14/Jul/2023 14:13:00] "GET /log1.txt HTTP/1.1" 200 -"#;
        let result = parse_sample(line);
        assert_eq!(result.timestamp, Some(expected().with_nanosecond(0).unwrap()));
        assert_eq!(result.residual, r#"::1 - "GET /log1.txt HTTP/1.1" 200 -"#);
    }

    #[test]
    fn test_access_log_offset_discarded() {
        let line = r#"91.194.60.14 - - [14/Jul/2023:14:13:00 +0200] "GET / HTTP/1.1" 200 1027"#;
        let result = parse_sample(line);
        assert_eq!(result.timestamp, Some(expected().with_nanosecond(0).unwrap()));
        assert!(!result.residual.contains("14/Jul/2023"));
        assert!(result.residual.starts_with("91.194.60.14 - "));
    }

    #[test]
    fn test_syslog_year_from_file_context() {
        let line = "Jul 14 08:00:02 host proc: msg";
        let transformer = FormatRegistry::builtin()
            .bind(line)
            .unwrap()
            .with_file_context(FileContext::with_year(2023));
        let result = transformer.parse(line).unwrap();
        let ts = result.timestamp.unwrap();
        assert_eq!(ts.year(), 2023);
        assert_eq!(result.residual, "host proc: msg");
    }

    #[test]
    fn test_syslog_without_context_uses_current_year() {
        let line = "Jul 14 08:00:02 host proc: msg";
        let result = parse_sample(line);
        assert_eq!(result.timestamp.unwrap().year(), Local::now().year());
    }

    #[test]
    fn test_unmatched_line_is_indented() {
        let transformer = FormatRegistry::builtin()
            .bind("2023-07-14 14:13:00 message")
            .unwrap();
        let result = transformer.parse("    at com.example.Main(Main.java:10)").unwrap();
        assert_eq!(result.timestamp, None);
        assert_eq!(result.residual, "     at com.example.Main(Main.java:10)");
    }

    #[test]
    fn test_residual_is_stripped_of_escapes_and_trailing_space() {
        let transformer = FormatRegistry::builtin()
            .bind("2023-07-14 14:13:00 message")
            .unwrap();
        let result = transformer
            .parse("2023-07-14 14:13:00 \x1b[31mERROR\x1b[0m failed   ")
            .unwrap();
        assert_eq!(result.residual, "ERROR failed");

        let result = transformer.parse("\x1b[33mcontinued\x1b[0m  ").unwrap();
        assert_eq!(result.residual, " continued");
    }

    #[test]
    fn test_invalid_calendar_value_is_an_error() {
        let transformer = FormatRegistry::builtin()
            .bind("2023-07-14 14:13:00 message")
            .unwrap();
        match transformer.parse("2023-23-99 55:99:88 message") {
            Err(FormatError::TimestampParse { variant, raw, .. }) => {
                assert_eq!(variant, "ISOFormat");
                assert_eq!(raw, "2023-23-99 55:99:88");
            }
            other => panic!("expected TimestampParse, got {:?}", other),
        }
    }

    #[test]
    fn test_residual_never_contains_timestamp() {
        let registry = FormatRegistry::builtin();
        for line in [
            "2023-07-14T14:13:00.100+00:00 message",
            "Jul 14 08:00:02 host proc: msg",
            "1689343980.100 message",
            "1689343980100 message",
        ] {
            let transformer = registry.bind(line).unwrap();
            let caps = transformer.variant().regex().captures(line).unwrap();
            let raw = caps
                .get(transformer.variant().spec().timestamp_group)
                .unwrap()
                .as_str();
            let result = transformer.parse(line).unwrap();
            assert!(!result.residual.contains(raw), "line {:?}", line);
        }
    }

    #[test]
    fn test_custom_template_round_trip() {
        let mut registry = FormatRegistry::builtin();
        registry.compile_custom(r"(\w+ - )((...) )").unwrap();
        let line = "INFO - 2023-07-14 14:13:00 message";
        let transformer = registry.bind(line).unwrap();
        assert_eq!(transformer.variant().kind(), TimestampKind::Iso8601);

        let result = transformer.parse(line).unwrap();
        assert_eq!(result.timestamp, Some(expected().with_nanosecond(0).unwrap()));
        assert_eq!(result.residual, "INFO - message");
    }

    #[test]
    fn test_custom_template_without_leading_context() {
        let mut registry = FormatRegistry::builtin();
        registry.compile_custom(r"(\[(...)\] )").unwrap();
        let line = "[1689343980] started";
        let transformer = registry.bind(line).unwrap();
        assert_eq!(transformer.variant().kind(), TimestampKind::EpochSeconds);
        assert_eq!(transformer.parse(line).unwrap().residual, "started");
    }

    #[test]
    fn test_only_leftmost_span_is_stripped() {
        let transformer = FormatRegistry::builtin()
            .bind("1689343980 message")
            .unwrap();
        let result = transformer.parse("1689343980 1689343980 again").unwrap();
        assert_eq!(result.residual, "1689343980 again");
    }
}
