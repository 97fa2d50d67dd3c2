//! Post-processing: deterministic cleanup of extracted text.
//!
//! pdfium text layers, tesseract output and Word documents all leak
//! artefacts that confuse the entity extractors downstream: Windows line
//! endings, zero-width characters pasted from web templates, trailing
//! blanks on every line, and long runs of empty lines where layout columns
//! used to be. These rules remove them without touching content.
//!
//! ## Rule Order
//!
//! Line endings are normalised first so the per-line rules see every line;
//! invisible characters are removed before trimming so a line holding only a
//! zero-width space becomes blank and collapses with its neighbours.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to extracted text.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Replace form feeds (page breaks in OCR output) with newlines
/// 4. Trim trailing whitespace per line
/// 5. Collapse 3+ consecutive blank lines down to 1
/// 6. Trim the whole text
pub fn clean_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = s.replace('\u{000C}', "\n");
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

/// Trimmed character count, the unit every length threshold is expressed in.
pub fn trimmed_char_count(text: &str) -> usize {
    text.trim().chars().count()
}
