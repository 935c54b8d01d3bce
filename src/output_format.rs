use std::io::Write;

use chrono::NaiveDateTime;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::ansi::ColorScheme;
use crate::merge::MergedRow;

const TIMESTAMP_WIDTH: usize = 23;
const DEFAULT_WIDTH: usize = 120;
const MIN_COLUMN_WIDTH: usize = 10;
const SEPARATOR: &str = " | ";

/// `YYYY-MM-DD HH:MM:SS.mmm`, empty for entries that had no timestamp.
pub fn format_timestamp(timestamp: NaiveDateTime) -> String {
    if timestamp == NaiveDateTime::MIN {
        String::new()
    } else {
        timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
    }
}

/// Width of the attached terminal, if any.
pub fn terminal_width() -> Option<usize> {
    terminal_size::terminal_size().map(|(terminal_size::Width(w), _)| w as usize)
}

/// Renders merged rows as fixed-width side-by-side columns.
pub struct TableFormatter {
    file_names: Vec<String>,
    line_numbers: bool,
    total_width: usize,
    colors: ColorScheme,
}

impl TableFormatter {
    pub fn new(file_names: Vec<String>, line_numbers: bool) -> Self {
        Self {
            file_names,
            line_numbers,
            total_width: DEFAULT_WIDTH,
            colors: ColorScheme::new(false),
        }
    }

    /// Total width, 0 = terminal width (or 120 when not on a terminal).
    pub fn with_width(mut self, width: usize) -> Self {
        self.total_width = if width > 0 {
            width
        } else {
            terminal_width().unwrap_or(DEFAULT_WIDTH)
        };
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.colors = ColorScheme::new(use_colors);
        self
    }

    fn line_number_width(&self) -> usize {
        if self.line_numbers {
            4
        } else {
            0
        }
    }

    /// Width of each file column.
    pub fn column_width(&self) -> usize {
        let files = self.file_names.len().max(1);
        let mut fixed = TIMESTAMP_WIDTH + files * SEPARATOR.len();
        if self.line_numbers {
            fixed += self.line_number_width() + SEPARATOR.len();
        }
        (self.total_width.saturating_sub(fixed) / files).max(MIN_COLUMN_WIDTH)
    }

    pub fn write_header<W: Write>(&self, output: &mut W) -> std::io::Result<()> {
        let column_width = self.column_width();
        let mut cells = Vec::new();
        if self.line_numbers {
            cells.push(pad("line", self.line_number_width()));
        }
        cells.push(pad("timestamp", TIMESTAMP_WIDTH));
        for name in &self.file_names {
            cells.push(pad(&truncate(name, column_width), column_width));
        }
        let header = cells.join(SEPARATOR);
        let rule = "-".repeat(header.width());
        writeln!(
            output,
            "{}{}{}",
            self.colors.header,
            header.trim_end(),
            self.colors.reset
        )?;
        writeln!(output, "{}", rule)
    }

    pub fn write_row<W: Write>(&self, output: &mut W, row: &MergedRow) -> std::io::Result<()> {
        let column_width = self.column_width();
        let wrapped: Vec<Vec<String>> = row
            .cells
            .iter()
            .map(|cell| wrap(cell, column_width))
            .collect();
        let height = wrapped.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let timestamp = format_timestamp(row.timestamp);

        for i in 0..height {
            let mut line = String::new();
            if self.line_numbers {
                let number = if i == 0 {
                    row.line_number.to_string()
                } else {
                    String::new()
                };
                line.push_str(&format!("{:>width$}", number, width = self.line_number_width()));
                line.push_str(SEPARATOR);
            }
            if i == 0 && !timestamp.is_empty() {
                line.push_str(self.colors.timestamp);
                line.push_str(&timestamp);
                line.push_str(self.colors.reset);
            } else {
                line.push_str(&" ".repeat(TIMESTAMP_WIDTH));
            }
            for cell in &wrapped {
                line.push_str(SEPARATOR);
                let text = cell.get(i).map(String::as_str).unwrap_or("");
                line.push_str(&pad(text, column_width));
            }
            writeln!(output, "{}", line.trim_end())?;
        }
        Ok(())
    }

    pub fn write_all<'a, W, I>(&self, output: &mut W, rows: I) -> std::io::Result<()>
    where
        W: Write,
        I: IntoIterator<Item = &'a MergedRow>,
    {
        self.write_header(output)?;
        for row in rows {
            self.write_row(output, row)?;
        }
        Ok(())
    }
}

// Widths are terminal columns, so wide (CJK, emoji) characters count twice
fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

fn truncate(text: &str, width: usize) -> String {
    let mut used = 0;
    text.chars()
        .take_while(|c| {
            used += c.width().unwrap_or(0);
            used <= width
        })
        .collect()
}

/// Split on newlines, then hard-wrap each line at `width` columns.
fn wrap(text: &str, width: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let width = width.max(1);
    let mut lines = Vec::new();
    for line in text.split('\n') {
        let mut current = String::new();
        let mut used = 0;
        for c in line.chars() {
            let char_width = c.width().unwrap_or(0);
            if used + char_width > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                used = 0;
            }
            current.push(c);
            used += char_width;
        }
        lines.push(current);
    }
    lines
}

/// CSV export of merged rows: optional line column, timestamp, one column per file.
pub struct CsvFormatter {
    file_names: Vec<String>,
    line_numbers: bool,
}

impl CsvFormatter {
    pub fn new(file_names: Vec<String>, line_numbers: bool) -> Self {
        Self {
            file_names,
            line_numbers,
        }
    }

    pub fn write_all<'a, W, I>(&self, output: W, rows: I) -> csv::Result<()>
    where
        W: Write,
        I: IntoIterator<Item = &'a MergedRow>,
    {
        let mut writer = csv::Writer::from_writer(output);

        let mut header: Vec<&str> = Vec::new();
        if self.line_numbers {
            header.push("line");
        }
        header.push("timestamp");
        header.extend(self.file_names.iter().map(String::as_str));
        writer.write_record(&header)?;

        for row in rows {
            let mut record = Vec::with_capacity(row.cells.len() + 2);
            if self.line_numbers {
                record.push(row.line_number.to_string());
            }
            record.push(format_timestamp(row.timestamp));
            record.extend(row.cells.iter().cloned());
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(number: usize, cells: &[&str]) -> MergedRow {
        MergedRow {
            line_number: number,
            timestamp: NaiveDate::from_ymd_opt(2023, 7, 14)
                .unwrap()
                .and_hms_milli_opt(14, 13, 0, 100)
                .unwrap(),
            cells: cells.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(row(1, &[]).timestamp), "2023-07-14 14:13:00.100");
        assert_eq!(format_timestamp(NaiveDateTime::MIN), "");
    }

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap("ab\n cd", 4), vec!["ab", " cd"]);
        assert!(wrap("", 4).is_empty());
        assert_eq!(wrap("a\n\nb", 4), vec!["a", "", "b"]);
    }

    #[test]
    fn test_wrap_counts_display_columns() {
        // each CJK character takes two columns
        assert_eq!(wrap("日本語ab", 4), vec!["日本", "語ab"]);
        assert_eq!(wrap("日本", 1), vec!["日", "本"]);
    }

    #[test]
    fn test_pad_and_truncate_wide_text() {
        assert_eq!(pad("日本", 6), "日本  ");
        assert_eq!(pad("toolong", 3), "toolong");
        assert_eq!(truncate("日本語", 5), "日本");
        assert_eq!(truncate("abc", 5), "abc");
    }

    #[test]
    fn test_wide_cells_keep_columns_aligned() {
        let table = TableFormatter::new(vec!["a.log".into(), "b.log".into()], false).with_width(80);
        let mut output = Vec::new();
        table
            .write_all(&mut output, &[row(1, &["日本語", "x"]), row(2, &["abcdef", "y"])])
            .unwrap();
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        let second_separator = |line: &str| {
            let at = line.rfind(SEPARATOR).unwrap();
            line[..at].width()
        };
        assert_eq!(second_separator(lines[2]), second_separator(lines[3]));
    }

    #[test]
    fn test_column_width_splits_remaining_space() {
        let table = TableFormatter::new(vec!["a.log".into(), "b.log".into()], false).with_width(80);
        // 80 - 23 - 2 * 3 = 51, split across two files
        assert_eq!(table.column_width(), 25);
    }

    #[test]
    fn test_column_width_has_a_floor() {
        let table = TableFormatter::new(vec!["a.log".into()], true).with_width(20);
        assert_eq!(table.column_width(), MIN_COLUMN_WIDTH);
    }

    #[test]
    fn test_table_output() {
        let table = TableFormatter::new(vec!["a.log".into(), "b.log".into()], true).with_width(80);
        let mut output = Vec::new();
        table
            .write_all(&mut output, &[row(1, &["started", ""]), row(2, &["", "one\n two"])])
            .unwrap();
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].starts_with("line | timestamp"));
        assert!(lines[0].contains("a.log"));
        assert!(lines[1].chars().all(|c| c == '-'));
        assert!(lines[2].starts_with("   1 | 2023-07-14 14:13:00.100 | started"));
        assert!(lines[3].ends_with("| one"));
        assert!(lines[4].ends_with("|  two"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn test_table_colors() {
        let table = TableFormatter::new(vec!["a.log".into()], false)
            .with_width(80)
            .with_colors(true);
        let mut output = Vec::new();
        table.write_all(&mut output, &[row(1, &["x"])]).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("\x1b[1m"));
        assert!(text.contains("\x1b[34m2023-07-14 14:13:00.100\x1b[0m"));
    }

    #[test]
    fn test_csv_output() {
        let csv = CsvFormatter::new(vec!["a.log".into(), "b.log".into()], false);
        let mut output = Vec::new();
        csv.write_all(&mut output, &[row(1, &["hello, world", "line1\nline2"])])
            .unwrap();
        let text = String::from_utf8(output).unwrap();
        assert_eq!(
            text,
            "timestamp,a.log,b.log\n2023-07-14 14:13:00.100,\"hello, world\",\"line1\nline2\"\n"
        );
    }
}
