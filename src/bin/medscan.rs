//! CLI binary for medscan-report.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AnalyzerConfig`, runs one session over the given images and prints
//! the formatted results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use medscan_report::{
    clean_response, format, load_images, partition_uploads, render_document, run_analysis, update,
    write_document, AnalysisProgressCallback, AnalyzerConfigBuilder, DisplayBlock, ProgressCallback,
    RenderedReport, SessionEvent, SessionState, Table, ValueClass, VisionClient,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

fn paint(s: &str, class: ValueClass) -> String {
    match class {
        ValueClass::Abnormal => red(s),
        ValueClass::Normal => green(s),
        ValueClass::Neutral => s.to_string(),
    }
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live progress bar plus one log line per
/// image.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-image wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Analyzing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Analyzing {total} report image(s)…"))
        ));
    }

    fn on_image_start(&self, index: usize, _total: usize, file_name: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(index, Instant::now());
        }
        self.bar.set_message(file_name.to_string());
    }

    fn on_image_complete(&self, index: usize, total: usize, text_len: usize) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} Image {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            index,
            total,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_image_error(&self, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['\u{2026}']).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Image {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        eprintln!("{}", batch_summary(total, success_count, failed));
    }
}

/// Closing line of a run. Images after the first failure are never sent, so
/// they count as "not analysed" rather than failed.
fn batch_summary(total: usize, success_count: usize, failed: usize) -> String {
    if failed == 0 && success_count == total {
        return format!(
            "{} {} image(s) analysed successfully",
            green("✔"),
            bold(&success_count.to_string())
        );
    }
    format!(
        "{} {}/{} image(s) analysed  ({} failed, {} not analysed)",
        if success_count == 0 {
            red("✘")
        } else {
            cyan("⚠")
        },
        bold(&success_count.to_string()),
        total,
        red(&failed.to_string()),
        total.saturating_sub(success_count + failed),
    )
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse one report, formatted in the terminal
  medscan cbc.jpg

  # Several reports into one HTML document
  medscan cbc.jpg lipids.png -o results.html

  # Structured display blocks as JSON
  medscan --json cbc.jpg > blocks.json

  # The model's reply, untouched
  medscan --raw cbc.jpg

  # Another OpenAI-compatible endpoint
  medscan --endpoint http://localhost:8000/v1/chat/completions --model llava cbc.jpg

NOTES:
  Images are analysed one at a time, in the order given. The first failure
  stops the run; results obtained before it are still printed and the exit
  code is non-zero.

  Output is a reading aid, not medical advice.

ENVIRONMENT VARIABLES:
  MEDSCAN_API_KEY     Bearer credential for the endpoint (required)
  MEDSCAN_API_URL     Chat-completions URL (default https://api.x.ai/v1/chat/completions)
  MEDSCAN_MODEL       Vision model ID (default grok-vision-beta)
  RUST_LOG            Override log filter
"#;

/// Analyse medical report images with a Vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "medscan",
    version,
    about = "Analyse medical report images with a Vision LLM",
    long_about = "Send photographed or scanned lab reports (PNG/JPEG) to a vision model, \
then print the findings as structured sections, fields and tables with abnormal values \
highlighted. Works with any OpenAI-compatible chat-completions endpoint.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Report images (PNG or JPEG).
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Write an HTML document to this file instead of printing to stdout.
    #[arg(short, long, env = "MEDSCAN_OUTPUT")]
    output: Option<PathBuf>,

    /// Print display blocks as JSON.
    #[arg(long, conflicts_with_all = ["raw", "output"])]
    json: bool,

    /// Print the model's reply without formatting.
    #[arg(long, conflicts_with = "output")]
    raw: bool,

    /// Bearer credential for the endpoint.
    #[arg(long, env = "MEDSCAN_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Chat-completions endpoint URL.
    #[arg(long, env = "MEDSCAN_API_URL")]
    endpoint: Option<String>,

    /// Vision model ID.
    #[arg(long, env = "MEDSCAN_MODEL")]
    model: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "MEDSCAN_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max output tokens per image.
    #[arg(long, env = "MEDSCAN_MAX_TOKENS", default_value_t = 2500)]
    max_tokens: usize,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "MEDSCAN_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "MEDSCAN_TIMEOUT")]
    timeout: Option<u64>,

    /// Disable progress bar.
    #[arg(long, env = "MEDSCAN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MEDSCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, env = "MEDSCAN_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn AnalysisProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;
    let client = VisionClient::new(config.clone()).context("Failed to create API client")?;

    // ── Load images ──────────────────────────────────────────────────────
    let (accepted, skipped) = partition_uploads(&cli.images);
    if !cli.quiet {
        for path in &skipped {
            eprintln!(
                "{} {} skipped: only PNG and JPEG images are accepted",
                cyan("⚠"),
                path.display()
            );
        }
    }
    if accepted.is_empty() {
        anyhow::bail!("No PNG or JPEG images to analyse");
    }
    let images = load_images(&accepted)
        .await
        .context("Failed to read input images")?;

    // ── Run analysis ─────────────────────────────────────────────────────
    let state = update(SessionState::new(), SessionEvent::FilesAdded(images));
    let state = run_analysis(state, &client, &config).await;

    let reports: Vec<RenderedReport> = state
        .analyses
        .values()
        .map(|a| RenderedReport {
            file_name: a.file_name.clone(),
            blocks: format(&clean_response(&a.text)),
        })
        .collect();

    // ── Output ───────────────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let html = render_document("Medical Report Analysis", &reports);
        write_document(output_path, &html)
            .await
            .context("Failed to write HTML report")?;
        if !cli.quiet {
            eprintln!(
                "{}  {} report(s)  →  {}",
                if state.error.is_none() {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                reports.len(),
                bold(&output_path.display().to_string()),
            );
        }
    } else if cli.json {
        let json = serde_json::to_string_pretty(&reports).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        for analysis in state.analyses.values() {
            writeln!(out, "{}", bold(&format!("Analysis Results - {}", analysis.file_name)))?;
            if cli.raw {
                out.write_all(analysis.text.as_bytes())?;
                if !analysis.text.ends_with('\n') {
                    writeln!(out)?;
                }
            } else {
                let blocks = format(&clean_response(&analysis.text));
                write_blocks(&mut out, &blocks)?;
            }
            writeln!(out)?;
        }
    }

    if let Some(ref error) = state.error {
        let pending = state.pending().len();
        anyhow::bail!("Analysis stopped: {error} ({pending} image(s) not analysed)");
    }

    Ok(())
}

/// Map CLI args to `AnalyzerConfig`.
async fn build_config(
    cli: &Cli,
    progress: Option<ProgressCallback>,
) -> Result<medscan_report::AnalyzerConfig> {
    let mut builder = AnalyzerConfigBuilder::from_env()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref url) = cli.endpoint {
        builder = builder.endpoint(url);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }
    if let Some(secs) = cli.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

// ── Terminal rendering ───────────────────────────────────────────────────────

fn write_blocks(out: &mut impl Write, blocks: &[DisplayBlock]) -> io::Result<()> {
    for block in blocks {
        match block {
            DisplayBlock::Heading1 { text } => {
                writeln!(out, "\n{}", bold(&cyan(&text.to_uppercase())))?;
            }
            DisplayBlock::Heading2 { text } => {
                writeln!(out, "\n{}", bold(text))?;
            }
            DisplayBlock::Paragraph { text } => writeln!(out, "{text}")?,
            DisplayBlock::LabeledField {
                label,
                value,
                value_class,
            } => {
                writeln!(out, "  {}: {}", dim(label), paint(value, *value_class))?;
            }
            DisplayBlock::Table(table) => write_table(out, table)?,
        }
    }
    Ok(())
}

fn write_table(out: &mut impl Write, table: &Table) -> io::Result<()> {
    let columns = table
        .rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(table.headers.len()))
        .max()
        .unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for (i, h) in table.headers.iter().enumerate() {
        widths[i] = widths[i].max(h.chars().count());
    }
    for row in &table.rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let header: Vec<String> = table
        .headers
        .iter()
        .enumerate()
        .map(|(i, h)| bold(&pad(h, widths[i])))
        .collect();
    writeln!(out, "  {}", header.join("  "))?;
    let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    writeln!(out, "  {}", dim(&rule.join("  ")))?;

    for (r, row) in table.rows.iter().enumerate() {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(c, cell)| paint(&pad(cell, widths[c]), table.cell_class(r, c)))
            .collect();
        writeln!(out, "  {}", cells.join("  "))?;
    }
    Ok(())
}

/// Pad to `width` chars; ANSI codes are applied after padding.
fn pad(s: &str, width: usize) -> String {
    let n = s.chars().count();
    format!("{s}{}", " ".repeat(width.saturating_sub(n)))
}
