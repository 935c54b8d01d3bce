use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("no match for any timestamp pattern in {line:?}")]
    NoFormatMatch { line: String },

    #[error("invalid custom timestamp format '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// A hand-built or built-in format whose pattern and capture
    /// convention disagree.
    #[error("invalid timestamp format '{name}': {reason}")]
    InvalidVariant { name: String, reason: String },

    #[error("cannot parse timestamp {raw:?} as {variant}: {source}")]
    TimestampParse {
        variant: String,
        raw: String,
        #[source]
        source: TimestampError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FormatError {
    pub(crate) fn parse(variant: &str, raw: &str, source: TimestampError) -> Self {
        FormatError::TimestampParse {
            variant: variant.to_string(),
            raw: raw.to_string(),
            source,
        }
    }
}

/// Why a matched timestamp substring could not be turned into a datetime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimestampError {
    #[error("not a valid {0} timestamp")]
    Malformed(&'static str),

    #[error("invalid date {0}")]
    InvalidDate(String),

    #[error("invalid time {0}")]
    InvalidTime(String),

    #[error("invalid offset '{0}'")]
    InvalidOffset(String),

    #[error("invalid fraction '{0}'")]
    InvalidFraction(String),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("{0} out of range")]
    OutOfRange(String),

    #[error("format does not support timezone offsets")]
    UnexpectedOffset,

    #[error(transparent)]
    Chrono(#[from] chrono::ParseError),
}

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error(transparent)]
    InvalidFormat(#[from] FormatError),

    #[error("{}:{}: {}", .file.display(), .line, .source)]
    Format {
        file: PathBuf,
        line: usize,
        #[source]
        source: FormatError,
    },

    #[error("cannot read '{}': {}", .file.display(), .source)]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid time value {value:?} (expected YYYY-MM-DD[ HH:MM[:SS[.fff]]] or a relative time like 15m)")]
    InvalidTimeBound { value: String },

    #[error("invalid start/end times - start must be before end")]
    EmptyWindow,

    #[error("'{}' is empty, cannot detect its timestamp format", .file.display())]
    EmptyInput { file: PathBuf },
}

impl MergeError {
    pub(crate) fn format(file: &std::path::Path, line: usize, source: FormatError) -> Self {
        match source {
            FormatError::Io(source) => MergeError::Io {
                file: file.to_path_buf(),
                source,
            },
            source => MergeError::Format {
                file: file.to_path_buf(),
                line,
                source,
            },
        }
    }
}
