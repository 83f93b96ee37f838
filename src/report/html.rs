//! HTML rendering of display blocks.
//!
//! Output is semantic markup with class names only (`field`, `field-label`,
//! `value-abnormal`, …); styling is left to whatever stylesheet the host page
//! provides. All text is escaped. Rendering is deterministic: the same
//! blocks always produce the same bytes.

use super::{DisplayBlock, Table};
use crate::error::MedScanError;
use std::path::Path;

/// One analysed report as shown in a document: file name plus its blocks.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RenderedReport {
    pub file_name: String,
    pub blocks: Vec<DisplayBlock>,
}

/// Render blocks as an HTML fragment.
pub fn render_html(blocks: &[DisplayBlock]) -> String {
    let mut w = Html::new();
    for block in blocks {
        render_block(&mut w, block);
    }
    w.finish()
}

/// Render a complete HTML page with one section per report.
pub fn render_document(title: &str, reports: &[RenderedReport]) -> String {
    let mut w = Html::new();
    w.push("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    w.push("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    w.push(format!("<title>{}</title>\n", esc(title)));
    w.push("</head>\n<body>\n<main class=\"analyses\">\n");

    for report in reports {
        w.push("<section class=\"analysis\">\n");
        w.push(format!(
            "<header><h2 class=\"analysis-title\">Analysis Results - {}</h2></header>\n",
            esc(&report.file_name)
        ));
        w.push("<div class=\"analysis-body\">\n");
        for block in &report.blocks {
            render_block(&mut w, block);
        }
        w.push("</div>\n</section>\n");
    }

    w.push("</main>\n</body>\n</html>\n");
    w.finish()
}

/// Write a rendered document to `path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_document(path: impl AsRef<Path>, html: &str) -> Result<(), MedScanError> {
    let path = path.as_ref();
    let write_err = |source| MedScanError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("html.tmp");
    tokio::fs::write(&tmp_path, html).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

// ── Internal ─────────────────────────────────────────────────────────────

struct Html {
    buf: String,
}

impl Html {
    fn new() -> Self {
        Self {
            buf: String::with_capacity(4 * 1024),
        }
    }

    fn push<S: AsRef<str>>(&mut self, s: S) {
        self.buf.push_str(s.as_ref());
    }

    fn finish(self) -> String {
        self.buf
    }
}

fn render_block(w: &mut Html, block: &DisplayBlock) {
    match block {
        DisplayBlock::Heading1 { text } => {
            w.push(format!("<h1 class=\"report-title\">{}</h1>\n", esc(text)));
        }
        DisplayBlock::Heading2 { text } => {
            w.push(format!("<h2 class=\"report-section\">{}</h2>\n", esc(text)));
        }
        DisplayBlock::Paragraph { text } => {
            w.push(format!("<p>{}</p>\n", esc(text)));
        }
        DisplayBlock::LabeledField {
            label,
            value,
            value_class,
        } => {
            w.push(format!(
                "<div class=\"field\"><span class=\"field-label\">{}:</span> \
                 <span class=\"field-value {}\">{}</span></div>\n",
                esc(label),
                value_class.css_class(),
                esc(value)
            ));
        }
        DisplayBlock::Table(table) => render_table(w, table),
    }
}

fn render_table(w: &mut Html, table: &Table) {
    w.push("<div class=\"table-wrap\"><table>\n<thead><tr>");
    for header in &table.headers {
        w.push(format!("<th>{}</th>", esc(header)));
    }
    w.push("</tr></thead>\n<tbody>\n");

    for (r, row) in table.rows.iter().enumerate() {
        let stripe = if r % 2 == 0 { "row-even" } else { "row-odd" };
        w.push(format!("<tr class=\"{stripe}\">"));
        for (c, cell) in row.iter().enumerate() {
            w.push(format!(
                "<td class=\"{}\">{}</td>",
                table.cell_class(r, c).css_class(),
                esc(cell)
            ));
        }
        w.push("</tr>\n");
    }

    w.push("</tbody>\n</table></div>\n");
}

fn esc(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
