use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use is_terminal::IsTerminal;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use logmerge::output_format::{CsvFormatter, TableFormatter};
use logmerge::{ColorChoice, LogMerger, MergeConfig};

#[derive(Parser)]
#[command(name = "logmerge")]
#[command(about = "View multiple log files side by side, merged by timestamp")]
#[command(version)]
#[command(after_help = "\
Start and end times can be given as YYYY-MM-DD HH:MM:SS.SSS, with seconds and
milliseconds optional and \",\" allowed as the decimal point. A \"T\" may separate
date and time to avoid quoting on the command line. Relative times such as \"15m\"
(15 minutes ago) are accepted with units s, m, h and d.

Custom timestamp formats are regexes with \"(...)\" where the timestamp goes, e.g.
  (\\w+ - )((...) )      for  INFO - 2022-01-01 12:34:56 log message
  (\\[\\w+\\] )((...) )  for  [INFO] 2022-01-01 12:34:56 log message")]
struct Args {
    /// Log files to merge
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Start of the time window to merge
    #[arg(short = 's', long)]
    start: Option<String>,

    /// End of the time window to merge
    #[arg(short = 'e', long)]
    end: Option<String>,

    /// Total output width (default: terminal width)
    #[arg(short = 'w', long, default_value = "0")]
    width: usize,

    /// Add a line number column
    #[arg(short = 'n', long = "line-numbers")]
    line_numbers: bool,

    /// Save merged logs to a CSV file instead of printing a table
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Custom timestamp format (repeatable)
    #[arg(long = "timestamp-format", value_name = "TEMPLATE", action = ArgAction::Append)]
    timestamp_formats: Vec<String>,

    /// Color the table output
    #[arg(long, value_enum, default_value = "auto")]
    color: ColorChoice,

    /// Debug mode - show format detection details
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn into_config(self) -> MergeConfig {
        MergeConfig {
            files: self.files,
            timestamp_formats: self.timestamp_formats,
            start: self.start,
            end: self.end,
            line_numbers: self.line_numbers,
            csv_output: self.csv,
            width: self.width,
            color: self.color,
            ..Default::default()
        }
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("logmerge=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();
    init_tracing(args.debug);

    if let Err(e) = run(args.into_config()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(config: MergeConfig) -> Result<()> {
    let merger = LogMerger::new(config.clone())?;
    let file_names = merger.file_names();
    let rows = merger.merge()?;

    if let Some(csv_path) = &config.csv_output {
        let file = File::create(csv_path)
            .with_context(|| format!("Failed to create CSV file '{}'", csv_path.display()))?;
        CsvFormatter::new(file_names, config.line_numbers)
            .write_all(BufWriter::new(file), &rows)
            .with_context(|| format!("Failed to write CSV file '{}'", csv_path.display()))?;
        return Ok(());
    }

    let stdout = io::stdout();
    let use_colors = config.color.should_use_colors(stdout.is_terminal());
    let mut output = BufWriter::new(stdout.lock());
    let result = TableFormatter::new(file_names, config.line_numbers)
        .with_width(config.width)
        .with_colors(use_colors)
        .write_all(&mut output, &rows)
        .and_then(|_| output.flush());

    match result {
        // Handle broken pipe gracefully
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other.context("Failed to write output"),
    }
}
