// src/formats.rs - Timestamp format catalog, detection and custom formats

pub mod custom;
pub mod parsers;
pub mod registry;
pub mod variant;

pub use custom::PLACEHOLDER;
pub use registry::FormatRegistry;
pub use variant::{FormatVariant, ParsedTimestamp, TimestampKind, VariantSpec};
