//! Structured view of a report analysis.
//!
//! The model is prompted to answer with a small markdown subset: section
//! headings, `- key: value` bullets and pipe tables. [`format`] turns that
//! text into an ordered list of [`DisplayBlock`]s, and [`html`] renders the
//! blocks. Highlighting is a three-way [`ValueClass`] derived from the text
//! of a value; it is never parsed numerically.

pub mod format;
pub mod html;

pub use format::format;

use serde::{Deserialize, Serialize};

/// Highlight class of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueClass {
    /// Flagged "high"/"low", or out of range in a results table.
    Abnormal,
    /// Mentions "normal".
    Normal,
    /// Anything else.
    Neutral,
}

impl ValueClass {
    /// CSS class used by the HTML renderer.
    pub fn css_class(self) -> &'static str {
        match self {
            ValueClass::Abnormal => "value-abnormal",
            ValueClass::Normal => "value-normal",
            ValueClass::Neutral => "value-neutral",
        }
    }
}

/// Classify a value by case-insensitive substring match.
///
/// "high" or "low" anywhere wins over "normal", so `"Normal-low"` is
/// abnormal. Words that merely contain the tokens ("below") match too.
pub fn classify(value: &str) -> ValueClass {
    let lower = value.to_lowercase();
    if lower.contains("high") || lower.contains("low") {
        ValueClass::Abnormal
    } else if lower.contains("normal") {
        ValueClass::Normal
    } else {
        ValueClass::Neutral
    }
}

/// One unit of formatted output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayBlock {
    Heading1 {
        text: String,
    },
    Heading2 {
        text: String,
    },
    Paragraph {
        text: String,
    },
    LabeledField {
        label: String,
        value: String,
        value_class: ValueClass,
    },
    Table(Table),
}

/// A table region: one header row and any number of data rows.
///
/// Rows are not padded: a row may have fewer or more cells than there are
/// headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Highlight class of the cell at `rows[row][col]`.
    ///
    /// A cell under a header mentioning "result" or "value" is abnormal when
    /// the row has another cell after it (taken to be the reference range)
    /// and the cell itself says neither "normal" nor "n/a". Every other cell
    /// falls back to [`classify`]. Out-of-bounds positions are neutral.
    pub fn cell_class(&self, row: usize, col: usize) -> ValueClass {
        let Some(cells) = self.rows.get(row) else {
            return ValueClass::Neutral;
        };
        let Some(cell) = cells.get(col) else {
            return ValueClass::Neutral;
        };

        let is_result_column = self
            .headers
            .get(col)
            .map(|h| {
                let h = h.to_lowercase();
                h.contains("result") || h.contains("value")
            })
            .unwrap_or(false);
        let has_range = cells.get(col + 1).is_some_and(|next| !next.is_empty());
        let lower = cell.to_lowercase();

        if is_result_column && has_range && !lower.contains("normal") && !lower.contains("n/a") {
            ValueClass::Abnormal
        } else {
            classify(cell)
        }
    }

    /// Highlight classes of every cell, row by row.
    pub fn cell_classes(&self) -> Vec<Vec<ValueClass>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(r, cells)| (0..cells.len()).map(|c| self.cell_class(r, c)).collect())
            .collect()
    }
}
