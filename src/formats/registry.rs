// src/formats/registry.rs - Registered timestamp formats and detection

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use super::variant::{FormatVariant, TimestampKind, VariantSpec};
use crate::error::FormatError;
use crate::transformer::{FileContext, LineTransformer};

/// The set of known timestamp formats.
///
/// Registration order is detection precedence: built-ins first, in
/// `TimestampKind::ALL` order, then custom formats in the order they were
/// compiled. Registration needs `&mut self` and detection `&self`, so the set
/// is frozen for as long as any detection or binding borrows it.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    variants: Vec<FormatVariant>,
    pub(super) custom_suffix: usize,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FormatRegistry {
    /// A registry with no formats at all.
    pub fn empty() -> Self {
        FormatRegistry {
            variants: Vec::new(),
            custom_suffix: 0,
        }
    }

    /// A registry holding the built-in formats.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for kind in TimestampKind::ALL {
            registry
                .register(kind.builtin_spec())
                .expect("built-in timestamp formats must compile");
        }
        registry
    }

    /// Append a format. Fails if the pattern does not compile or its capture
    /// groups do not agree with the timestamp group and replacement.
    pub fn register(&mut self, spec: VariantSpec) -> Result<&FormatVariant, FormatError> {
        let name = spec.name.clone();
        let variant =
            FormatVariant::compile(spec).map_err(|reason| FormatError::InvalidVariant { name, reason })?;
        self.push_variant(variant);
        Ok(&self.variants[self.variants.len() - 1])
    }

    pub(super) fn push_variant(&mut self, variant: FormatVariant) {
        self.variants.push(variant);
    }

    pub fn variants(&self) -> &[FormatVariant] {
        &self.variants
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FormatVariant> {
        self.variants.iter().find(|v| v.name() == name)
    }

    /// First registered format whose pattern matches the start of `sample`.
    pub fn detect(&self, sample: &str) -> Result<&FormatVariant, FormatError> {
        let sample = sample.trim_end_matches(['\r', '\n']);
        match self.variants.iter().find(|v| v.is_match(sample)) {
            Some(variant) => {
                debug!(format = variant.name(), "detected timestamp format");
                Ok(variant)
            }
            None => Err(FormatError::NoFormatMatch {
                line: sample.to_string(),
            }),
        }
    }

    /// Detect the format of `sample` and bind a transformer for its stream.
    pub fn bind(&self, sample: &str) -> Result<LineTransformer, FormatError> {
        Ok(LineTransformer::new(self.detect(sample)?.clone()))
    }

    /// Bind using the first line of `reader`.
    pub fn bind_reader<R: BufRead>(&self, mut reader: R) -> Result<LineTransformer, FormatError> {
        let mut first_line = String::new();
        reader.read_line(&mut first_line)?;
        self.bind(&first_line)
    }

    /// Bind using the first line of the file at `path`, attaching its
    /// creation year for formats that carry no year.
    pub fn bind_file(&self, path: &Path) -> Result<LineTransformer, FormatError> {
        let transformer = self.bind_reader(BufReader::new(File::open(path)?))?;
        let context = FileContext::from_path(path);
        debug!(
            file = %path.display(),
            format = transformer.variant().name(),
            year = ?context.creation_year,
            "bound line transformer"
        );
        Ok(transformer.with_file_context(context))
    }
}
