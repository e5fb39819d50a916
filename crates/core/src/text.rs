//! Markup to text normalization.
//!
//! Court pages render most values as whitespace-polluted markup. These
//! helpers turn those fragments into canonical strings and numbers.

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::Document;

static SCRIPT_ELEMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<script.*?</script>").unwrap());
static SCRIPT_OPENING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<script.*?>").unwrap());
static LINE_BREAK_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br.*?>").unwrap());
static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// An ordered find/replace pass applied to markup before it is rendered.
#[derive(Debug, Clone)]
pub struct Replace {
    pub pattern: Regex,
    pub replacement: String,
}

impl Replace {
    /// Builds a replace pass from a regex pattern.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regex; patterns are literals in
    /// the adapters.
    pub fn new(pattern: &str, replacement: impl Into<String>) -> Self {
        Self { pattern: Regex::new(pattern).unwrap(), replacement: replacement.into() }
    }

    /// `<br>` (any form) to a line break.
    pub fn line_breaks() -> Self {
        Self { pattern: LINE_BREAK_TAG.clone(), replacement: "\n".to_string() }
    }
}

/// Removes `<script>` elements from a markup string.
///
/// Content-bearing elements go first, then self-closing or unterminated
/// opening tags.
pub fn strip_script_tags(markup: &str) -> String {
    let stripped = SCRIPT_ELEMENT.replace_all(markup, "");
    SCRIPT_OPENING.replace_all(&stripped, "").into_owned()
}

/// Renders a markup fragment to plain text.
///
/// The `replaces` run in order on the raw markup, which is then parsed as a
/// detached fragment. Duplicated line breaks in the resulting text are
/// removed until none remain.
///
/// # Example
///
/// ```rust
/// use juscrape_core::text::{Replace, html_to_text};
///
/// let text = html_to_text("<p>Intime-se.<br>Cumpra-se.</p>", &[Replace::line_breaks()]);
/// assert_eq!(text, "Intime-se.\nCumpra-se.");
/// ```
pub fn html_to_text(markup: &str, replaces: &[Replace]) -> String {
    let mut prepared = markup.to_string();
    for replace in replaces {
        prepared = replace.pattern.replace_all(&prepared, replace.replacement.as_str()).into_owned();
    }

    let text = match Document::parse_fragment(&prepared) {
        Ok(doc) => doc.text_content(),
        Err(_) => prepared,
    };
    remove_duplicated_line_breaks(&text).trim().to_string()
}

fn remove_duplicated_line_breaks(text: &str) -> String {
    let mut current = text.to_string();
    while current.contains("\n\n") {
        current = current.replace("\n\n", "\n");
    }
    current
}

/// Collapses runs of blank lines into a single empty line and trims.
///
/// Whitespace-only lines count as blank and are emptied.
pub fn collapse_blank_lines(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        let line = if line.trim().is_empty() { "" } else { line };
        if line.is_empty() && lines.last().is_some_and(|last| last.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}

/// Drops every blank line and trims.
pub fn strip_blank_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Trims whitespace and any of `chars` from both ends.
///
/// # Example
///
/// ```rust
/// use juscrape_core::text::extended_trim;
///
/// assert_eq!(extended_trim(" , Rua A, 10 ,, ", &[',']), "Rua A, 10");
/// ```
pub fn extended_trim(text: &str, chars: &[char]) -> String {
    text.trim_matches(|c: char| c.is_whitespace() || chars.contains(&c)).to_string()
}

/// Removes line breaks and squashes whitespace runs into one space.
pub fn squash_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").trim().to_string()
}

/// Parses a Brazilian currency amount (`R$ 1.234,56`).
///
/// Returns `None` when the text has no digits.
pub fn parse_currency(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '-')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    cleaned.parse().ok()
}
