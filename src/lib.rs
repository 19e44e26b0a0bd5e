//! # gr-convert
//!
//! Convert a queue of user files between image, PDF and DOCX formats.
//!
//! ## Routes
//!
//! Each queued file is classified by its extension and the requested target
//! format, then handled by exactly one route:
//!
//! ```text
//! source            target       route              artifact
//! ───────────────── ──────────── ────────────────── ──────────────────────
//! .docx             pdf          DocxToPdf          <stem>_GR.pdf
//! .pdf              docx         PdfToDocx (stub)   <stem>_GR.docx
//! .jpg/.png/.webp   pdf          ImageBatchToPdf    GR_Converted_Docs.pdf
//! image/*           png | jpeg   ImageToImage       <stem>_GR.png|jpeg
//! anything else     any          (skipped)          none
//! ```
//!
//! The image batch route takes *every* image in the queue, writes one page
//! per image into a single PDF and ends the run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gr_convert::{run_to_dir, ConversionRequest, ConverterConfig, FileQueue, InputFile, TargetFormat};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut queue = FileQueue::new();
//!     queue.add([
//!         InputFile::from_path("holiday.png")?,
//!         InputFile::from_path("report.docx")?,
//!     ]);
//!
//!     let request = ConversionRequest::new(TargetFormat::Jpeg).with_quality(0.8);
//!     let report = run_to_dir(&queue, &request, &ConverterConfig::default(), "out").await?;
//!     for artifact in report.artifacts() {
//!         println!("{} ({} bytes)", artifact.file_name, artifact.byte_len);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `grconvert` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! gr-convert = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod queue;
pub mod route;
pub mod sink;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionRequest, ConverterConfig, ConverterConfigBuilder, TargetFormat};
pub use convert::{run, run_sync, run_to_dir};
pub use error::{ConvertError, RouteError, Stage};
pub use output::{Artifact, ArtifactSummary, ConversionOutcome, RunReport, RunStats, RunSummary};
pub use pipeline::markup::{DocxMarkupExtractor, MarkupError, MarkupExtractor};
pub use pipeline::render::{MarkupRenderer, PageLayout, PdfMarkupRenderer, RenderError, RenderedPdf};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use queue::{FileQueue, InputFile};
pub use route::Route;
pub use sink::{ArtifactSink, DirectorySink, MemorySink};
pub use stream::{run_stream, OutcomeStream};
