//! CLI binary for gr-convert.
//!
//! A thin shim over the library crate: builds a `FileQueue` from the
//! positional arguments, maps flags onto `ConversionRequest` and
//! `ConverterConfig`, and prints the run report.

use anyhow::{Context, Result};
use clap::Parser;
use gr_convert::{
    run_to_dir, ConversionOutcome, ConversionProgressCallback, ConversionRequest,
    ConverterConfig, FileQueue, InputFile, ProgressCallback, RunReport, RunSummary, TargetFormat,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the queue plus a log line per
/// file.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-file wall-clock start times, keyed by queue index.
    start_times: Mutex<HashMap<usize, Instant>>,
    skipped: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(0);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            skipped: AtomicUsize::new(0),
        })
    }

    fn elapsed(&self, index: usize) -> String {
        let ms = self
            .start_times
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&index)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);
        dim(&format!("{:.1}s", ms as f64 / 1000.0))
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total} queued file(s)…"))
        ));
    }

    fn on_file_start(&self, index: usize, _total: usize, name: &str) {
        self.start_times
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(index, Instant::now());
        self.bar.set_message(name.to_string());
    }

    fn on_file_complete(&self, index: usize, _total: usize, artifact: &str, byte_len: usize) {
        self.bar.println(format!(
            "  {} {:<40}  {}  {}",
            green("✓"),
            artifact,
            dim(&format!("{byte_len:>9} bytes")),
            self.elapsed(index),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, _total: usize, error: &str) {
        // Keep long errors on one line.
        let msg = match error.char_indices().nth(100) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };
        self.bar.println(format!(
            "  {} {}  {}",
            red("✗"),
            red(&msg),
            self.elapsed(index)
        ));
        self.bar.inc(1);
    }

    fn on_file_skipped(&self, _index: usize, _total: usize, name: &str) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!("  {} {}", dim("–"), dim(&format!("{name} (skipped)"))));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, routed: usize, succeeded: usize) {
        self.bar.finish_and_clear();
        let failed = routed.saturating_sub(succeeded);
        let skipped = self.skipped.load(Ordering::SeqCst);

        if failed == 0 {
            eprintln!(
                "{} {} artifact(s) written  {}",
                green("✔"),
                bold(&succeeded.to_string()),
                dim(&format!("{skipped} skipped")),
            );
        } else {
            eprintln!(
                "{} {}/{} conversions succeeded  ({} failed, {} skipped)",
                if succeeded == 0 { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                routed,
                red(&failed.to_string()),
                skipped,
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Re-encode images as JPEG at 80% quality
  grconvert --to jpeg --quality 80 holiday.png scan.webp

  # Merge every queued image into GR_Converted_Docs.pdf
  grconvert --to pdf page1.jpg page2.png page3.webp -d out/

  # DOCX to PDF
  grconvert --to pdf report.docx

  # Inspect the queue after dropping the second file
  grconvert --remove 1 --list a.png b.png c.png

  # Machine-readable report; fail the process on any failed file
  grconvert --to png --json --strict *.jpg > report.json

ROUTES:
  Source            Target       Artifact
  ────────────────  ───────────  ─────────────────────────────
  .docx             pdf          <stem>_GR.pdf
  .pdf              docx         <stem>_GR.docx (placeholder text)
  .jpg .png .webp   pdf          GR_Converted_Docs.pdf (all images, ends the run)
  any image         png, jpeg    <stem>_GR.png / <stem>_GR.jpeg
  anything else     any          skipped

ENVIRONMENT VARIABLES:
  GRCONVERT_TO            Default target format
  GRCONVERT_QUALITY       Default JPEG quality (1-100)
  GRCONVERT_OUTPUT_DIR    Default output directory
  RUST_LOG                Override log filter (e.g. gr_convert=debug)
"#;

/// Convert images, DOCX and PDF files between formats.
#[derive(Parser, Debug)]
#[command(
    name = "grconvert",
    version,
    about = "Convert images, DOCX and PDF files between formats",
    long_about = "Queue one or more files and convert them to a single target format. \
Images are re-encoded as PNG or JPEG, or merged into one PDF; DOCX documents are rendered \
to PDF; PDFs become a placeholder DOCX.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Files to queue, in order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Target format: png, jpeg (jpg), pdf, docx.
    #[arg(short, long, env = "GRCONVERT_TO", required_unless_present = "list")]
    to: Option<TargetFormat>,

    /// JPEG quality in percent (1–100). Only JPEG output reads it.
    #[arg(short, long, env = "GRCONVERT_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Directory that receives the artifacts.
    #[arg(short = 'd', long, env = "GRCONVERT_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Remove the queued file at INDEX (0-based) before converting.
    /// Repeatable; applied in order, so later indices see the shifted queue.
    #[arg(long, value_name = "INDEX")]
    remove: Vec<usize>,

    /// Print the queue and exit without converting.
    #[arg(long)]
    list: bool,

    /// Print the run report (or the queue, with --list) as JSON on stdout.
    #[arg(long, env = "GRCONVERT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "GRCONVERT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "GRCONVERT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(long, env = "GRCONVERT_QUIET")]
    quiet: bool,

    /// Exit with an error if any conversion failed.
    #[arg(long, env = "GRCONVERT_STRICT")]
    strict: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level logs; verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.list;
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

    // ── Build queue ──────────────────────────────────────────────────────
    let mut queue = FileQueue::new();
    for path in &cli.inputs {
        let file = InputFile::from_path(path)
            .with_context(|| format!("Cannot queue {}", path.display()))?;
        queue.add([file]);
    }
    for &index in &cli.remove {
        let removed = queue
            .remove_at(index)
            .with_context(|| format!("--remove {index}"))?;
        if !cli.quiet && !cli.json {
            eprintln!("{} removed {}", dim("–"), removed.name());
        }
    }

    if cli.list {
        return print_queue(&queue, cli.json);
    }

    // ── Build request + config ───────────────────────────────────────────
    let target = cli.to.context("--to is required")?;
    let request = ConversionRequest::from_percent(target, cli.quality);

    let mut builder = ConverterConfig::builder();
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let report = run_to_dir(&queue, &request, &config, &cli.output_dir)
        .await
        .context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet && !show_progress {
        print_report(&report, &cli.output_dir);
    } else if !cli.quiet {
        eprintln!(
            "   {}  →  {}",
            dim(&format!("{}ms total", report.stats.total_duration_ms)),
            bold(&cli.output_dir.display().to_string()),
        );
    }

    if cli.strict {
        report.into_result().context("Some files failed to convert")?;
    }
    Ok(())
}

/// `--list`: one line per queued file, or a JSON array.
fn print_queue(queue: &FileQueue, json: bool) -> Result<()> {
    if json {
        let entries: Vec<_> = queue
            .iter()
            .enumerate()
            .map(|(index, f)| {
                serde_json::json!({
                    "index": index,
                    "name": f.name(),
                    "bytes": f.byte_size(),
                    "mime": f.mime_hint(),
                })
            })
            .collect();
        let out = serde_json::to_string_pretty(&entries).context("Failed to serialise queue")?;
        println!("{out}");
        return Ok(());
    }

    if queue.is_empty() {
        println!("(queue is empty)");
    }
    for (index, f) in queue.iter().enumerate() {
        let mime = if f.mime_hint().is_empty() {
            "?"
        } else {
            f.mime_hint()
        };
        println!("{index:>3}  {:<40}  {:>10} bytes  {}", f.name(), f.byte_size(), dim(mime));
    }
    Ok(())
}

/// Plain summary when the progress bar is off.
fn print_report(report: &RunReport, dir: &std::path::Path) {
    for outcome in &report.outcomes {
        match outcome {
            ConversionOutcome::Success { artifact, .. } => eprintln!(
                "{} {} ({} bytes)",
                green("✓"),
                dir.join(&artifact.file_name).display(),
                artifact.byte_len
            ),
            ConversionOutcome::Failure { error, .. } => eprintln!("{} {}", red("✗"), error),
        }
    }
    for name in &report.skipped {
        eprintln!("{} {} (skipped)", dim("–"), name);
    }

    let s = &report.stats;
    match report.summary() {
        RunSummary::AllSucceeded => eprintln!(
            "Converted {} route(s) in {}ms ({} skipped, {} not reached)",
            s.succeeded, s.total_duration_ms, s.skipped, s.not_reached
        ),
        RunSummary::SomeFailed { failed, total } => eprintln!(
            "{}/{} route(s) failed in {}ms ({} skipped, {} not reached)",
            failed, total, s.total_duration_ms, s.skipped, s.not_reached
        ),
    }
}
