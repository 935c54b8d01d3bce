// src/formats/custom.rs - User-defined timestamp formats
//
// A template is a regex in which "(...)" marks where the timestamp goes:
//
//     Log line                                  Template
//     INFO - 2022-01-01 12:34:56 log message    (\w+ - )((...) )
//     [INFO] 2022-01-01 12:34:56 log message    (\[\w+\] )((...) )
//     [2022-01-01 12:34:56|INFO] log message    (\[)((...)\|)
//
// The group enclosing the placeholder is removed from matching lines. An
// optional group before it holds leading text that is kept.

use tracing::debug;

use super::registry::FormatRegistry;
use super::variant::{FormatVariant, TimestampKind, VariantSpec};
use crate::error::FormatError;

/// Marks the timestamp position in a custom template.
pub const PLACEHOLDER: &str = "(...)";

impl FormatRegistry {
    /// Synthesize one format per built-in timestamp syntax from `template`
    /// and append them after every format registered so far.
    ///
    /// Nothing is registered if any synthesized pattern is invalid. Returns
    /// the number of formats added.
    pub fn compile_custom(&mut self, template: &str) -> Result<usize, FormatError> {
        let invalid = |reason: String| FormatError::InvalidTemplate {
            template: template.to_string(),
            reason,
        };

        match template.matches(PLACEHOLDER).count() {
            0 => return Err(invalid(format!("must contain '{}' placeholder", PLACEHOLDER))),
            1 => {}
            n => {
                return Err(invalid(format!(
                    "must contain exactly one '{}' placeholder, found {}",
                    PLACEHOLDER, n
                )))
            }
        }

        let has_leading_context = has_leading_context(template);
        let (timestamp_group, strip_replacement) = if has_leading_context {
            (3, "${1}")
        } else {
            (2, "")
        };

        let mut compiled = Vec::with_capacity(TimestampKind::ALL.len());
        for (offset, kind) in TimestampKind::ALL.into_iter().enumerate() {
            let core = format!("({})", kind.core_pattern());
            let spec = VariantSpec {
                name: format!(
                    "Custom{}_{}",
                    kind.name(),
                    suffix_label(self.custom_suffix + offset)
                ),
                pattern: template.replacen(PLACEHOLDER, &core, 1),
                timestamp_group,
                strip_replacement: strip_replacement.to_string(),
                ..kind.builtin_spec()
            };
            compiled.push(FormatVariant::compile(spec).map_err(invalid)?);
        }

        let added = compiled.len();
        self.custom_suffix += added;
        for variant in compiled {
            debug!(format = variant.name(), pattern = %variant.spec().pattern, "registered custom format");
            self.push_variant(variant);
        }
        Ok(added)
    }
}

/// True when the template opens with a group that closes before the
/// placeholder, e.g. `(\w+ - )((...) )`.
fn has_leading_context(template: &str) -> bool {
    match template.find(')') {
        Some(close) => !template[..close].contains("..."),
        None => false,
    }
}

/// A, B, ..., Z, AA, AB, ...
fn suffix_label(mut index: usize) -> String {
    let mut label = Vec::new();
    loop {
        label.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    label.reverse();
    String::from_utf8(label).unwrap_or_default()
}
