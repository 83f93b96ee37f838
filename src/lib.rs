//! # medscan-report
//!
//! Read photographed or scanned medical lab reports with a Vision Language
//! Model and turn its reply into structured, highlighted display blocks.
//!
//! ## Why this crate?
//!
//! Lab reports arrive as phone photos and scans: skewed, cropped, full of
//! tables. OCR alone gives a soup of numbers. Instead each image is sent to a
//! VLM together with a fixed instruction asking for a structured markdown
//! summary (patient information, a results table, key findings). The reply is
//! then parsed line by line into [`DisplayBlock`]s, with values marked
//! abnormal (high/low) or normal so a front end can colour them.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image file
//!  │
//!  ├─ 1. Input     read bytes, detect media type
//!  ├─ 2. Encode    size checks, base64 data URL
//!  ├─ 3. VLM       one chat-completions call per image, sequential
//!  ├─ 4. Clean     strip fences and invisible characters
//!  ├─ 5. Format    markdown-ish text → DisplayBlock list
//!  └─ 6. Render    HTML document or terminal output
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medscan_report::{
//!     analyze_batch, clean_response, format, load_images, AnalyzerConfigBuilder, VisionClient,
//! };
//! use std::path::PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Key from MEDSCAN_API_KEY, endpoint and model from MEDSCAN_API_URL / MEDSCAN_MODEL.
//!     let config = AnalyzerConfigBuilder::from_env().build()?;
//!     let client = VisionClient::new(config.clone())?;
//!
//!     let images = load_images(&[PathBuf::from("cbc.jpg")]).await?;
//!     let outcome = analyze_batch(&client, &images, &config).await;
//!     for analysis in &outcome.analyses {
//!         let blocks = format(&clean_response(&analysis.text));
//!         println!("{}: {} blocks", analysis.file_name, blocks.len());
//!     }
//!     if let Some(e) = outcome.error {
//!         eprintln!("batch stopped: {e}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `medscan` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! medscan-report = { version = "0.1", default-features = false }
//! ```
//!
//! ## Not medical advice
//!
//! The output is a reading aid. Values and flags come from a language model
//! and may be wrong; always check against the original report.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod session;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::analyze_batch;
pub use config::{AnalyzerConfig, AnalyzerConfigBuilder};
pub use error::{ErrorCategory, MedScanError};
pub use output::{BatchOutcome, BatchStats, ImageAnalysis};
pub use pipeline::input::{load_images, partition_uploads, ReportImage};
pub use pipeline::llm::{ReportAnalyzer, VisionClient};
pub use pipeline::postprocess::clean_response;
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
pub use report::html::{render_document, render_html, write_document, RenderedReport};
pub use report::{classify, format, DisplayBlock, Table, ValueClass};
pub use session::{run_analysis, update, ReportId, SessionEvent, SessionState};
pub use stream::{analyze_stream, AnalysisStream};
