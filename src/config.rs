use std::path::PathBuf;

/// When to color the table output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorChoice {
    #[default]
    #[value(name = "auto", help = "Color when writing to a terminal")]
    Auto,
    #[value(name = "always")]
    Always,
    #[value(name = "never")]
    Never,
}

impl ColorChoice {
    pub fn should_use_colors(&self, is_terminal: bool) -> bool {
        match self {
            ColorChoice::Auto => is_terminal,
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

/// Configuration for a merge run
#[derive(Debug, Clone)]
pub struct MergeConfig {
    pub files: Vec<PathBuf>,
    /// Custom timestamp templates, compiled in order before detection
    pub timestamp_formats: Vec<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub line_numbers: bool,
    pub csv_output: Option<PathBuf>,
    /// Total display width, 0 = terminal width
    pub width: usize,
    pub color: ColorChoice,
    pub max_entry_lines: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        MergeConfig {
            files: Vec::new(),
            timestamp_formats: Vec::new(),
            start: None,
            end: None,
            line_numbers: false,
            csv_output: None,
            width: 0,
            color: ColorChoice::Auto,
            max_entry_lines: 10_000,
        }
    }
}
