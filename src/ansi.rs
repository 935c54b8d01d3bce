use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// SGR sequences only: ESC [ n(;n)* m
static SGR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[\d+(?:;\d+)*m").expect("SGR regex must compile"));

/// Remove terminal color/style escape sequences from `text`.
///
/// Removal is repeated until no sequence remains, since deleting an inner
/// sequence can splice the surrounding bytes into a new one.
pub fn strip_escape_sequences(text: &str) -> Cow<'_, str> {
    let mut stripped = SGR_RE.replace_all(text, "");
    while SGR_RE.is_match(&stripped) {
        stripped = Cow::Owned(SGR_RE.replace_all(&stripped, "").into_owned());
    }
    stripped
}

/// Escape codes used when rendering the merged table to a terminal.
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: &'static str,
    pub timestamp: &'static str,
    pub reset: &'static str,
}

impl ColorScheme {
    pub fn new(use_colors: bool) -> Self {
        if use_colors {
            Self {
                header: "\x1b[1m",    // Bold column headers
                timestamp: "\x1b[34m", // Blue for timestamps
                reset: "\x1b[0m",
            }
        } else {
            Self {
                header: "",
                timestamp: "",
                reset: "",
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_simple_color() {
        assert_eq!(strip_escape_sequences("\x1b[31mERROR\x1b[0m boom"), "ERROR boom");
    }

    #[test]
    fn test_strip_compound_params() {
        assert_eq!(
            strip_escape_sequences("\x1b[1;32;40mok\x1b[0m"),
            "ok"
        );
    }

    #[test]
    fn test_strip_leaves_plain_text_borrowed() {
        let text = "no escapes [here] m";
        assert!(matches!(strip_escape_sequences(text), Cow::Borrowed(_)));
    }

    #[test]
    fn test_strip_ignores_non_sgr_sequences() {
        // cursor movement is not part of the SGR grammar
        assert_eq!(strip_escape_sequences("\x1b[2Jclear"), "\x1b[2Jclear");
    }

    #[test]
    fn test_strip_idempotent() {
        let samples = [
            "\x1b[31mred\x1b[0m",
            "\x1b[\x1b[1mm",
            "plain",
            "\x1b[1;2mA\x1b[mB",
            "\x1b[\x1b[1m1mspliced",
        ];
        for sample in samples {
            let once = strip_escape_sequences(sample).into_owned();
            let twice = strip_escape_sequences(&once).into_owned();
            assert_eq!(once, twice, "sample {:?}", sample);
        }
    }

    #[test]
    fn test_color_scheme_disabled_is_empty() {
        let scheme = ColorScheme::new(false);
        assert!(scheme.header.is_empty());
        assert!(scheme.reset.is_empty());
    }
}
