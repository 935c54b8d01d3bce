// src/pipeline.rs - Reading, parsing and merging a set of log files

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info};

use crate::config::MergeConfig;
use crate::error::MergeError;
use crate::formats::FormatRegistry;
use crate::merge::{MergedRow, Merger};
use crate::multiline::{collapse_lines, CollapseConfig, LogEntry};
use crate::transformer::LineTransformer;
use crate::window::TimeWindow;

pub type EntryStream = Box<dyn Iterator<Item = Result<LogEntry, MergeError>>>;

/// Lines of a reader with trailing whitespace removed. Invalid UTF-8 is
/// replaced rather than rejected.
pub struct LossyLines<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: BufRead> LossyLines<R> {
    pub fn new(reader: R) -> Self {
        LossyLines {
            reader,
            buffer: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for LossyLines<R> {
    type Item = std::io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buffer.clear();
        match self.reader.read_until(b'\n', &mut self.buffer) {
            Ok(0) => None,
            Ok(_) => Some(Ok(String::from_utf8_lossy(&self.buffer).trim_end().to_string())),
            Err(e) => Some(Err(e)),
        }
    }
}

/// Merges the configured log files into time-ordered rows.
pub struct LogMerger {
    config: MergeConfig,
    registry: FormatRegistry,
    window: TimeWindow,
}

impl LogMerger {
    pub fn new(config: MergeConfig) -> Result<Self, MergeError> {
        Self::with_clock(config, Local::now().naive_local())
    }

    /// Like `new`, resolving relative --start/--end against `now`.
    pub fn with_clock(config: MergeConfig, now: NaiveDateTime) -> Result<Self, MergeError> {
        let mut registry = FormatRegistry::builtin();
        for template in &config.timestamp_formats {
            let added = registry.compile_custom(template)?;
            debug!(template = %template, added, "compiled custom timestamp format");
        }

        let window = TimeWindow::from_bounds(config.start.as_deref(), config.end.as_deref(), now)?;

        Ok(LogMerger {
            config,
            registry,
            window,
        })
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Display names of the merged files, in column order.
    pub fn file_names(&self) -> Vec<String> {
        self.config
            .files
            .iter()
            .map(|p| p.display().to_string())
            .collect()
    }

    /// Bind a transformer for every file up front, so a file with an
    /// unknown format fails before any output is produced.
    pub fn transformers(&self) -> Result<Vec<LineTransformer>, MergeError> {
        self.config
            .files
            .iter()
            .map(|path| self.bind(path))
            .collect()
    }

    fn bind(&self, path: &Path) -> Result<LineTransformer, MergeError> {
        let io_error = |source| MergeError::Io {
            file: path.to_path_buf(),
            source,
        };
        if std::fs::metadata(path).map_err(io_error)?.len() == 0 {
            return Err(MergeError::EmptyInput {
                file: path.to_path_buf(),
            });
        }
        let transformer = self
            .registry
            .bind_file(path)
            .map_err(|e| MergeError::format(path, 1, e))?;
        info!(
            file = %path.display(),
            format = transformer.variant().name(),
            "detected timestamp format"
        );
        Ok(transformer)
    }

    fn entry_stream(&self, path: &Path, transformer: LineTransformer) -> Result<EntryStream, MergeError> {
        let file = File::open(path).map_err(|source| MergeError::Io {
            file: path.to_path_buf(),
            source,
        })?;
        let path: PathBuf = path.to_path_buf();
        let window = self.window;

        let lines = LossyLines::new(BufReader::new(file))
            .enumerate()
            .map(move |(index, line)| {
                let line = line.map_err(|source| MergeError::Io {
                    file: path.clone(),
                    source,
                })?;
                transformer
                    .parse(&line)
                    .map_err(|e| MergeError::format(&path, index + 1, e))
            });

        let collapse = CollapseConfig {
            max_entry_lines: self.config.max_entry_lines,
        };
        Ok(Box::new(collapse_lines(lines, collapse).filter(
            move |entry| match entry {
                Ok(entry) => window.contains(entry.timestamp),
                Err(_) => true,
            },
        )))
    }

    /// Lazily merged rows; errors surface as the affected line is reached.
    pub fn rows(&self) -> Result<Merger<EntryStream>, MergeError> {
        let transformers = self.transformers()?;
        let streams = self
            .config
            .files
            .iter()
            .zip(transformers)
            .map(|(path, transformer)| self.entry_stream(path, transformer))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Merger::new(streams))
    }

    pub fn merge(&self) -> Result<Vec<MergedRow>, MergeError> {
        self.rows()?.collect()
    }
}
