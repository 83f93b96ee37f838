//! Pipeline stages for analysing one report image.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ postprocess ──▶ report::format
//! (file)    (base64)   (VLM)   (cleanup)       (display blocks)
//! ```
//!
//! 1. [`input`]: load a file into a [`input::ReportImage`] and detect its media type
//! 2. [`encode`]: size checks, base64 and the data-URL used in the request body
//! 3. [`llm`]: the chat-completions call; the only stage with network I/O
//! 4. [`postprocess`]: strip fences and invisible characters from the reply

pub mod encode;
pub mod input;
pub mod llm;
pub mod postprocess;
