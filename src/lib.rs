// src/lib.rs
pub mod ansi;
pub mod config;
pub mod error;
pub mod formats;
pub mod merge;
pub mod multiline;
pub mod output_format;
pub mod pipeline;
pub mod transformer;
pub mod window;

pub use error::*;
pub use pipeline::*;

pub use ansi::strip_escape_sequences;
pub use config::{ColorChoice, MergeConfig};
pub use formats::{FormatRegistry, FormatVariant, TimestampKind, VariantSpec};
pub use merge::{MergedRow, Merger};
pub use multiline::{collapse_lines, CollapseConfig, LogEntry};
pub use transformer::{FileContext, LineTransformer, ParseResult};
pub use window::{parse_time_bound, TimeWindow};
