//! Line classifier turning a model reply into [`DisplayBlock`]s.
//!
//! This is not a markdown parser. Each line is looked at once, in order:
//!
//! 1. a line containing `|` opens or continues a table; the first such line
//!    is the header row, lines containing `---` are separators and dropped,
//!    the rest are data rows. The table is emitted as soon as the following
//!    line has no `|` (or the input ends).
//! 2. outside a table, a few fixed phrases mark headings;
//! 3. `- key: value` bullets become labeled fields; bullets with no `:` or
//!    with nothing at all after it are dropped;
//! 4. any other non-blank line not starting with `#` becomes a labeled
//!    field if it has a `:`, otherwise a paragraph.
//!
//! Emphasis is removed by deleting every `*`. The function is total: any
//! input, including the empty string, yields a (possibly empty) block list.

use super::{classify, DisplayBlock, Table};

const HEADING1_PHRASES: [&str; 1] = ["laboratory report analysis"];
const HEADING2_PHRASES: [&str; 3] = [
    "patient information",
    "complete blood count",
    "key findings",
];

/// Format a model reply into display blocks, in input order.
pub fn format(text: &str) -> Vec<DisplayBlock> {
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::new();
    let mut table: Option<Table> = None;

    for (i, line) in lines.iter().enumerate() {
        if line.contains('|') {
            match table.as_mut() {
                None => {
                    table = Some(Table {
                        headers: split_cells(line),
                        rows: Vec::new(),
                    });
                }
                Some(_) if line.contains("---") => {}
                Some(t) => {
                    let row = split_cells(line);
                    if !row.is_empty() {
                        t.rows.push(row);
                    }
                }
            }

            let next_continues = lines.get(i + 1).is_some_and(|next| next.contains('|'));
            if !next_continues {
                if let Some(t) = table.take() {
                    blocks.push(DisplayBlock::Table(t));
                }
            }
            continue;
        }

        if let Some(block) = classify_line(line) {
            blocks.push(block);
        }
    }

    blocks
}

/// Classify one line that is not part of a table.
fn classify_line(line: &str) -> Option<DisplayBlock> {
    let lower = line.to_lowercase();

    if HEADING1_PHRASES.iter().any(|p| lower.contains(p)) {
        return Some(DisplayBlock::Heading1 {
            text: heading_text(line),
        });
    }
    if HEADING2_PHRASES.iter().any(|p| lower.contains(p)) {
        return Some(DisplayBlock::Heading2 {
            text: heading_text(line),
        });
    }

    if let Some(rest) = line.strip_prefix("- ") {
        let (key, value) = rest.split_once(':')?;
        if value.is_empty() {
            return None;
        }
        return Some(labeled_field(key, value));
    }

    if line.trim().is_empty() || line.starts_with('#') {
        return None;
    }

    match line.split_once(':') {
        Some((key, value)) => Some(labeled_field(key, value)),
        None => Some(DisplayBlock::Paragraph {
            text: strip_emphasis(line).trim().to_string(),
        }),
    }
}

fn labeled_field(key: &str, value: &str) -> DisplayBlock {
    let value = strip_emphasis(value).trim().to_string();
    DisplayBlock::LabeledField {
        label: strip_emphasis(key).trim().to_string(),
        value_class: classify(&value),
        value,
    }
}

fn heading_text(line: &str) -> String {
    strip_emphasis(line).trim().to_string()
}

/// Split a table line on `|`, trim and de-emphasise each cell, drop empties.
fn split_cells(line: &str) -> Vec<String> {
    line.split('|')
        .map(|cell| strip_emphasis(cell.trim()))
        .filter(|cell| !cell.is_empty())
        .collect()
}

/// Remove every `*` (covers both `**bold**` and `*italic*`).
pub fn strip_emphasis(s: &str) -> String {
    s.replace('*', "")
}
