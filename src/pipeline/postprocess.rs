//! Post-processing: deterministic cleanup of the model's reply before it is
//! formatted.
//!
//! The formatter works line by line, so anything that changes what a "line"
//! is must be fixed first:
//!
//! - an outer ` ```markdown ... ``` ` fence turns every line into content of
//!   a code block the formatter does not understand;
//! - `\r\n` / `\r` endings leave stray carriage returns in cells and labels;
//! - zero-width characters and BOMs defeat the keyword matching used for
//!   headings and highlighting.
//!
//! Rules run in this order: fences, line endings, invisible characters.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw model reply.
pub fn clean_response(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    remove_invisible_chars(&s)
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```(?:markdown|md)?\r?\n(.*?)\r?\n```\s*$").expect("valid fence regex")
});

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}
