use chrono::NaiveDateTime;

use crate::transformer::ParseResult;

/// A timestamped log entry, possibly spanning several input lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: NaiveDateTime,
    pub text: String,
    pub line_count: usize,
    pub start_line: usize,
}

#[derive(Debug, Clone)]
pub struct CollapseConfig {
    pub max_entry_lines: usize,
}

impl Default for CollapseConfig {
    fn default() -> Self {
        Self {
            max_entry_lines: 10_000,
        }
    }
}

/// Folds lines without a timestamp into the preceding timestamped entry.
///
/// Lines seen before the first timestamp are grouped under
/// `NaiveDateTime::MIN`.
pub struct MultilineCollapser {
    config: CollapseConfig,
    current: Option<LogEntry>,
    global_line_number: usize,
}

impl MultilineCollapser {
    pub fn new(config: CollapseConfig) -> Self {
        Self {
            config,
            current: None,
            global_line_number: 0,
        }
    }

    /// Feed one parsed line; returns an entry when the line completes one.
    pub fn add_line(&mut self, line: ParseResult) -> Option<LogEntry> {
        self.global_line_number += 1;

        if line.timestamp.is_none() {
            if let Some(entry) = self.current.as_mut() {
                if entry.line_count < self.config.max_entry_lines {
                    entry.text.push('\n');
                    entry.text.push_str(&line.residual);
                    entry.line_count += 1;
                    return None;
                }
            }
        }

        // a full entry continues under its own timestamp
        let timestamp = line
            .timestamp
            .or_else(|| self.current.as_ref().map(|entry| entry.timestamp))
            .unwrap_or(NaiveDateTime::MIN);
        self.replace_current(timestamp, line.residual)
    }

    pub fn flush(&mut self) -> Option<LogEntry> {
        self.current.take()
    }

    fn replace_current(&mut self, timestamp: NaiveDateTime, text: String) -> Option<LogEntry> {
        self.current.replace(LogEntry {
            timestamp,
            text,
            line_count: 1,
            start_line: self.global_line_number,
        })
    }
}

/// Iterator adapter collapsing a stream of parse results into entries.
pub struct Collapse<I> {
    inner: I,
    collapser: MultilineCollapser,
    done: bool,
}

impl<I, E> Iterator for Collapse<I>
where
    I: Iterator<Item = Result<ParseResult, E>>,
{
    type Item = Result<LogEntry, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        for line in self.inner.by_ref() {
            match line {
                Ok(line) => {
                    if let Some(entry) = self.collapser.add_line(line) {
                        return Some(Ok(entry));
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        self.done = true;
        self.collapser.flush().map(Ok)
    }
}

pub fn collapse_lines<I, E>(lines: I, config: CollapseConfig) -> Collapse<I::IntoIter>
where
    I: IntoIterator<Item = Result<ParseResult, E>>,
{
    Collapse {
        inner: lines.into_iter(),
        collapser: MultilineCollapser::new(config),
        done: false,
    }
}
