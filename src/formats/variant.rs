// src/formats/variant.rs - Timestamp format descriptors

use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDateTime};
use regex::Regex;

use super::parsers;
use crate::error::{FormatError, TimestampError};
use crate::transformer::FileContext;

/// The built-in timestamp syntaxes, in detection precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampKind {
    /// `YYYY[-]MM[-]DD[T ]HH[:]MM[:]SS[{,.}fff][Z|+HH[:MM]]`
    Iso8601,
    /// `Mon dd HH:MM:SS`, year taken from the file or the clock
    Syslog,
    /// `::1 - - [22/Sep/2023 21:58:40] "GET /log1.txt HTTP/1.1" 200 -`
    HttpServer,
    /// `91.194.60.14 - - [16/Sep/2023:19:05:06 +0000] "GET / HTTP/1.1" 200 1027`
    AccessLog,
    /// `1694561169.550987`
    EpochFloat,
    /// `1694561169550`
    EpochMillis,
    /// `1694561169`
    EpochSeconds,
}

impl TimestampKind {
    pub const ALL: [TimestampKind; 7] = [
        TimestampKind::Iso8601,
        TimestampKind::Syslog,
        TimestampKind::HttpServer,
        TimestampKind::AccessLog,
        TimestampKind::EpochFloat,
        TimestampKind::EpochMillis,
        TimestampKind::EpochSeconds,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TimestampKind::Iso8601 => "ISOFormat",
            TimestampKind::Syslog => "BDHMS",
            TimestampKind::HttpServer => "PythonHttpServerLog",
            TimestampKind::AccessLog => "HttpServerAccessLog",
            TimestampKind::EpochFloat => "FloatSecondsSinceEpoch",
            TimestampKind::EpochMillis => "MilliSecondsSinceEpoch",
            TimestampKind::EpochSeconds => "SecondsSinceEpoch",
        }
    }

    /// Regex for the timestamp itself, without delimiters or capture groups.
    /// Digits are ASCII only; `\d` would also admit other scripts' digits.
    pub fn core_pattern(&self) -> &'static str {
        match self {
            TimestampKind::Iso8601 => concat!(
                r"[0-9]{4}-?[0-9]{2}-?[0-9]{2}",             // date, optional separators
                r"[T\s]?[0-9]{2}:?[0-9]{2}:?[0-9]{2}",       // time, optional separators
                r"(?:[,.][0-9]+)?",                          // sub-second precision
                r"(?:Z|[+-][0-9]{2}:?(?:[0-9]{2})?)?",       // timezone offset
            ),
            TimestampKind::Syslog => {
                r"[JFMASOND][a-z]{2}\s(?:\s|[0-9])[0-9]\s[0-9]{2}:[0-9]{2}:[0-9]{2}"
            }
            TimestampKind::HttpServer => r"[0-9]{2}/\w+/[0-9]{4}\s[0-9]{2}:[0-9]{2}:[0-9]{2}",
            TimestampKind::AccessLog => {
                r"[0-9]{2}/\w+/[0-9]{4}:[0-9]{2}:[0-9]{2}:[0-9]{2}\s[+-][0-9]{4}"
            }
            TimestampKind::EpochFloat => r"[0-9]{10}\.[0-9]+",
            TimestampKind::EpochMillis => r"[0-9]{13}",
            TimestampKind::EpochSeconds => r"[0-9]{10}",
        }
    }

    /// Whether the parse routine can yield an offset-aware value.
    pub fn has_timezone(&self) -> bool {
        matches!(self, TimestampKind::Iso8601 | TimestampKind::AccessLog)
    }

    /// The descriptor registered for this syntax at startup.
    pub fn builtin_spec(&self) -> VariantSpec {
        let core = self.core_pattern();
        let (pattern, timestamp_group, strip_replacement) = match self {
            // leading text before the bracket is kept in group 1
            TimestampKind::HttpServer | TimestampKind::AccessLog => {
                (format!(r"(.*)(-\s\[({})\]\s)", core), 3, "${1}")
            }
            _ => (format!(r"(({})\s)", core), 2, ""),
        };
        VariantSpec {
            name: self.name().to_string(),
            kind: *self,
            pattern,
            timestamp_group,
            strip_replacement: strip_replacement.to_string(),
            has_timezone: self.has_timezone(),
        }
    }

    pub fn parse(
        &self,
        raw: &str,
        file_context: Option<&FileContext>,
    ) -> Result<ParsedTimestamp, TimestampError> {
        match self {
            TimestampKind::Iso8601 => parsers::parse_iso8601(raw),
            TimestampKind::Syslog => {
                let year = file_context
                    .and_then(|ctx| ctx.creation_year)
                    .unwrap_or_else(|| Local::now().year());
                parsers::parse_syslog(raw, year)
            }
            TimestampKind::HttpServer => parsers::parse_http_server(raw),
            TimestampKind::AccessLog => parsers::parse_access_log(raw),
            TimestampKind::EpochFloat => parsers::parse_epoch_float(raw),
            TimestampKind::EpochMillis => parsers::parse_epoch_millis(raw),
            TimestampKind::EpochSeconds => parsers::parse_epoch_seconds(raw),
        }
    }
}

/// Plain data describing one timestamp syntax. Custom formats are derived by
/// cloning a built-in spec and replacing its pattern and capture convention.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantSpec {
    pub name: String,
    pub kind: TimestampKind,
    /// Matched at the start of a line.
    pub pattern: String,
    /// Capture group holding the raw timestamp.
    pub timestamp_group: usize,
    /// Replacement for the matched span, e.g. `${1}` to keep leading context.
    pub strip_replacement: String,
    pub has_timezone: bool,
}

/// A parse routine's result before timezone normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedTimestamp {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
}

impl ParsedTimestamp {
    /// Drop any offset, keeping the wall-clock time as written.
    pub fn into_naive(self) -> NaiveDateTime {
        match self {
            ParsedTimestamp::Naive(dt) => dt,
            ParsedTimestamp::Aware(dt) => dt.naive_local(),
        }
    }
}

/// A registered, compiled timestamp syntax.
#[derive(Debug, Clone)]
pub struct FormatVariant {
    spec: VariantSpec,
    regex: Regex,
}

impl FormatVariant {
    /// Compile `spec`, checking its capture convention against the pattern.
    pub fn compile(spec: VariantSpec) -> Result<Self, String> {
        let regex = Regex::new(&format!("^(?:{})", spec.pattern))
            .map_err(|e| format!("pattern does not compile: {}", e))?;

        // captures_len counts the implicit whole-match group 0
        let groups = regex.captures_len();
        if spec.timestamp_group == 0 || spec.timestamp_group >= groups {
            return Err(format!(
                "timestamp group {} not present, pattern has {} capture group(s)",
                spec.timestamp_group,
                groups - 1
            ));
        }
        if let Some(group) = replacement_group(&spec.strip_replacement) {
            if group >= groups {
                return Err(format!(
                    "replacement refers to group {} but pattern has {} capture group(s)",
                    group,
                    groups - 1
                ));
            }
        }

        Ok(FormatVariant { spec, regex })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn kind(&self) -> TimestampKind {
        self.spec.kind
    }

    pub fn spec(&self) -> &VariantSpec {
        &self.spec
    }

    pub fn has_timezone(&self) -> bool {
        self.spec.has_timezone
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }

    pub(crate) fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Run the variant's parse routine on an extracted timestamp substring.
    pub fn parse_timestamp(
        &self,
        raw: &str,
        file_context: Option<&FileContext>,
    ) -> Result<ParsedTimestamp, FormatError> {
        self.spec
            .kind
            .parse(raw, file_context)
            .map_err(|source| FormatError::parse(&self.spec.name, raw, source))
    }
}

// "${n}" -> n
fn replacement_group(replacement: &str) -> Option<usize> {
    replacement
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .and_then(|n| n.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_specs_compile() {
        for kind in TimestampKind::ALL {
            let variant = FormatVariant::compile(kind.builtin_spec())
                .unwrap_or_else(|e| panic!("{} failed: {}", kind.name(), e));
            assert_eq!(variant.kind(), kind);
        }
    }

    #[test]
    fn test_compile_rejects_missing_group() {
        let spec = VariantSpec {
            timestamp_group: 3,
            ..TimestampKind::Iso8601.builtin_spec()
        };
        let err = FormatVariant::compile(spec).unwrap_err();
        assert!(err.contains("timestamp group 3"), "{}", err);
    }

    #[test]
    fn test_compile_rejects_bad_replacement() {
        let spec = VariantSpec {
            strip_replacement: "${4}".to_string(),
            ..TimestampKind::HttpServer.builtin_spec()
        };
        assert!(FormatVariant::compile(spec).is_err());
    }

    #[test]
    fn test_pattern_is_anchored() {
        let variant = FormatVariant::compile(TimestampKind::EpochSeconds.builtin_spec()).unwrap();
        assert!(variant.is_match("1689343980 message"));
        assert!(!variant.is_match("id 1689343980 message"));
    }

    #[test]
    fn test_core_patterns_reject_non_ascii_digits() {
        let iso = FormatVariant::compile(TimestampKind::Iso8601.builtin_spec()).unwrap();
        assert!(!iso.is_match("\u{0662}\u{0660}\u{0662}\u{0663}-07-14 14:13:00 message"));
        assert!(!iso.is_match("2023-07-14T14:13:00+\u{0660}\u{0665} message"));

        let float = FormatVariant::compile(TimestampKind::EpochFloat.builtin_spec()).unwrap();
        assert!(!float.is_match("1689343980.\u{0665}\u{0665} message"));
    }

    #[test]
    fn test_aware_kinds_flag_timezone() {
        let aware = parsers::parse_access_log("14/Jul/2023:14:13:00 +0000").unwrap();
        assert!(matches!(aware, ParsedTimestamp::Aware(_)));
        assert!(TimestampKind::AccessLog.has_timezone());
        assert!(TimestampKind::Iso8601.has_timezone());
        assert!(!TimestampKind::EpochSeconds.has_timezone());
    }
}
