//! Sequential conversion dispatcher.
//!
//! Walks the queue in order, classifies each file into a [`Route`], runs
//! that route's converter and hands the artifact to an [`ArtifactSink`].
//!
//! - A failed route is recorded as [`ConversionOutcome::Failure`] and the
//!   walk moves on to the next file.
//! - The image-batch route consumes every image in the queue at once and
//!   ends the walk.
//!
//! Use [`crate::stream::run_stream`] to observe outcomes while the run is
//! still in progress.

use crate::config::{ConversionRequest, ConverterConfig, TargetFormat};
use crate::error::{ConvertError, RouteError, Stage};
use crate::output::{Artifact, ArtifactSummary, ConversionOutcome, RunReport, RunStats};
use crate::pipeline::markup::{DocxMarkupExtractor, MarkupExtractor};
use crate::pipeline::pdf::PdfBuilder;
use crate::pipeline::render::{MarkupRenderer, PageLayout, PdfMarkupRenderer};
use crate::pipeline::{docx, input, raster};
use crate::progress::ConversionProgressCallback;
use crate::queue::{FileQueue, InputFile};
use crate::route::{self, Route};
use crate::sink::{ArtifactSink, DirectorySink};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert every file in `queue` to `request.target`.
///
/// Files are processed strictly one after another. Artifacts are delivered
/// to `sink` as soon as their route succeeds and are never rolled back.
///
/// # Returns
/// `Ok(RunReport)` even when some routes failed; check
/// [`RunReport::summary`] or call [`RunReport::into_result`].
///
/// # Errors
/// Only for an invalid `config` ([`ConvertError::InvalidConfig`]).
pub async fn run(
    queue: &FileQueue,
    request: &ConversionRequest,
    config: &ConverterConfig,
    sink: &dyn ArtifactSink,
) -> Result<RunReport, ConvertError> {
    dispatch(queue, request, config, sink, |_| {}).await
}

/// Run a conversion and write the artifacts into `dir`.
///
/// The directory is created up front; every artifact is written with an
/// atomic temp-file-and-rename.
pub async fn run_to_dir(
    queue: &FileQueue,
    request: &ConversionRequest,
    config: &ConverterConfig,
    dir: impl AsRef<Path>,
) -> Result<RunReport, ConvertError> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ConvertError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;
    run(queue, request, config, &DirectorySink::new(dir)).await
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(
    queue: &FileQueue,
    request: &ConversionRequest,
    config: &ConverterConfig,
    sink: &dyn ArtifactSink,
) -> Result<RunReport, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(queue, request, config, sink))
}

// ── Dispatch loop ────────────────────────────────────────────────────────

/// The run loop shared by [`run`] and [`crate::stream::run_stream`].
///
/// `on_outcome` sees each outcome right after it is recorded.
pub(crate) async fn dispatch<F>(
    queue: &FileQueue,
    request: &ConversionRequest,
    config: &ConverterConfig,
    sink: &dyn ArtifactSink,
    mut on_outcome: F,
) -> Result<RunReport, ConvertError>
where
    F: FnMut(&ConversionOutcome) + Send,
{
    config.validate()?;

    let start = Instant::now();
    let files = queue.list();
    let target = request.target;
    let mut state = RunState::new(files.len(), config.progress_callback.as_deref());
    info!("Starting run: {} queued file(s) → {}", files.len(), target);
    state.notify(|cb, total| cb.on_run_start(total));

    let mut not_reached = 0;
    // The first file that will trigger the image batch. Batch members
    // queued before it are held back rather than skipped.
    let batch_trigger = files
        .iter()
        .position(|f| f.is_image() && classify(f, target).is_some_and(Route::is_batch));

    for (index, file) in files.iter().enumerate() {
        if batch_trigger.is_some_and(|t| index < t) && in_image_batch(file, target) {
            debug!("'{}' held for the image batch", file.name());
            continue;
        }

        let Some(ext) = file.extension() else {
            let reason = RouteError::UnknownExtension {
                file: file.name().to_string(),
            };
            state.skip(index, file, &reason.to_string());
            continue;
        };

        let route = Route::classify(&ext, target);
        debug!("'{}' (.{}) → {}", file.name(), ext, route);

        let result = match route {
            Route::Unsupported => {
                state.skip(index, file, &format!("no route from .{ext} to {target}"));
                continue;
            }
            Route::ImageToImage | Route::ImageBatchToPdf if !file.is_image() => {
                state.skip(index, file, "not an image");
                continue;
            }
            Route::ImageToImage => {
                state.start(index, file);
                convert_image(file, request, config).await
            }
            Route::ImageBatchToPdf => {
                let images: Vec<&InputFile> = files
                    .iter()
                    .filter(|f| in_image_batch(f, target))
                    .collect();
                not_reached = files[index + 1..]
                    .iter()
                    .filter(|f| !in_image_batch(f, target))
                    .count();
                state.start(index, file);
                convert_image_batch(&images, config).await
            }
            Route::DocxToPdf => {
                state.start(index, file);
                convert_docx(file, config).await
            }
            Route::PdfToDocx => {
                state.start(index, file);
                convert_pdf(file, config).await
            }
        };

        let delivered = result.and_then(|artifact| deliver(sink, state.claim_name(artifact)));
        let outcome = match delivered {
            Ok(artifact) => {
                info!(
                    "Converted '{}' → {} ({} bytes)",
                    file.name(),
                    artifact.file_name,
                    artifact.byte_len
                );
                state.notify(|cb, total| {
                    cb.on_file_complete(index, total, &artifact.file_name, artifact.byte_len)
                });
                ConversionOutcome::Success {
                    source: file.name().to_string(),
                    route,
                    artifact,
                }
            }
            Err(error) => {
                warn!("{}", error);
                state.notify(|cb, total| cb.on_file_error(index, total, &error.to_string()));
                ConversionOutcome::Failure {
                    source: file.name().to_string(),
                    route,
                    error,
                }
            }
        };
        on_outcome(&outcome);
        state.outcomes.push(outcome);

        if route.is_batch() {
            if not_reached > 0 {
                info!("Batch route ends the run; {} file(s) not reached", not_reached);
            }
            break;
        }
    }

    let routed = state.outcomes.len();
    let succeeded = state.outcomes.iter().filter(|o| o.is_success()).count();
    let stats = RunStats {
        queued: files.len(),
        routed,
        succeeded,
        failed: routed - succeeded,
        skipped: state.skipped.len(),
        not_reached,
        total_duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Run complete: {}/{} route(s) succeeded, {} skipped, {}ms",
        succeeded, routed, stats.skipped, stats.total_duration_ms
    );
    state.notify(|cb, _| cb.on_run_complete(routed, succeeded));

    Ok(RunReport {
        target,
        outcomes: state.outcomes,
        skipped: state.skipped,
        stats,
    })
}

/// Mutable bookkeeping for one pass over the queue.
struct RunState<'a> {
    total: usize,
    callback: Option<&'a dyn ConversionProgressCallback>,
    outcomes: Vec<ConversionOutcome>,
    skipped: Vec<String>,
    names: HashSet<String>,
}

impl<'a> RunState<'a> {
    fn new(total: usize, callback: Option<&'a dyn ConversionProgressCallback>) -> Self {
        Self {
            total,
            callback,
            outcomes: Vec::new(),
            skipped: Vec::new(),
            names: HashSet::new(),
        }
    }

    fn notify(&self, f: impl FnOnce(&dyn ConversionProgressCallback, usize)) {
        if let Some(cb) = self.callback {
            f(cb, self.total);
        }
    }

    fn start(&self, index: usize, file: &InputFile) {
        self.notify(|cb, total| cb.on_file_start(index, total, file.name()));
    }

    fn skip(&mut self, index: usize, file: &InputFile, reason: &str) {
        debug!("Skipping '{}': {}", file.name(), reason);
        self.notify(|cb, total| cb.on_file_skipped(index, total, file.name()));
        self.skipped.push(file.name().to_string());
    }

    /// Give `artifact` a name no earlier artifact of this run has used.
    fn claim_name(&mut self, mut artifact: Artifact) -> Artifact {
        let mut name = artifact.file_name.clone();
        let mut n = 1;
        while self.names.contains(&name) {
            name = route::numbered_name(&artifact.file_name, n);
            n += 1;
        }
        if name != artifact.file_name {
            debug!("'{}' already produced this run; using '{}'", artifact.file_name, name);
            artifact.file_name = name.clone();
        }
        self.names.insert(name);
        artifact
    }
}

fn classify(file: &InputFile, target: TargetFormat) -> Option<Route> {
    file.extension().map(|ext| Route::classify(&ext, target))
}

/// Files the image batch collects: image-typed content not claimed by the
/// DOCX route.
fn in_image_batch(file: &InputFile, target: TargetFormat) -> bool {
    file.is_image() && classify(file, target) != Some(Route::DocxToPdf)
}

fn deliver(sink: &dyn ArtifactSink, artifact: Artifact) -> Result<ArtifactSummary, RouteError> {
    let summary = artifact.summary();
    sink.deliver(artifact).map_err(|e| RouteError::Delivery {
        artifact: summary.file_name.clone(),
        detail: e.to_string(),
    })?;
    Ok(summary)
}

// ── Route converters ─────────────────────────────────────────────────────

async fn convert_image(
    file: &InputFile,
    request: &ConversionRequest,
    config: &ConverterConfig,
) -> Result<Artifact, RouteError> {
    let bytes = input::read_source(file).await?;
    let target = request.target;
    let quality = request.jpeg_quality();
    let name = file.name().to_string();

    let encoded = blocking(file.name(), Stage::Encode, move || {
        raster::transcode(&name, &bytes, target, quality)
    })
    .await?;

    Ok(Artifact::new(
        route::artifact_name(file.name(), &config.output_suffix, target),
        target,
        encoded,
    ))
}

/// One PDF page per image, in queue order. Any failure fails the batch.
async fn convert_image_batch(
    images: &[&InputFile],
    config: &ConverterConfig,
) -> Result<Artifact, RouteError> {
    let mut sources = Vec::with_capacity(images.len());
    for file in images {
        sources.push((file.name().to_string(), input::read_source(file).await?));
    }
    let quality = config.pdf_image_quality;

    let (pdf, pages) = blocking(&config.batch_file_name, Stage::Assemble, move || {
        let mut pdf = PdfBuilder::new();
        for (name, bytes) in &sources {
            let img = raster::decode(name, bytes)?;
            let (jpeg, grayscale) = raster::encode_for_pdf(&img, quality)
                .map_err(|e| stage_error(name, Stage::Encode, e))?;
            pdf.add_image_page(&jpeg, img.width(), img.height(), grayscale);
            debug!(
                "Page {}: '{}' ({}x{})",
                pdf.page_count(),
                name,
                img.width(),
                img.height()
            );
        }
        let pages = pdf.page_count();
        Ok((pdf.finish(), pages))
    })
    .await?;

    Ok(
        Artifact::new(config.batch_file_name.clone(), TargetFormat::Pdf, pdf)
            .with_pages(pages)
            .with_source_count(images.len()),
    )
}

async fn convert_docx(file: &InputFile, config: &ConverterConfig) -> Result<Artifact, RouteError> {
    let bytes = input::read_source(file).await?;
    let extractor: Arc<dyn MarkupExtractor> = config
        .markup_extractor
        .clone()
        .unwrap_or_else(|| Arc::new(DocxMarkupExtractor));
    let renderer: Arc<dyn MarkupRenderer> = config
        .markup_renderer
        .clone()
        .unwrap_or_else(|| Arc::new(PdfMarkupRenderer));
    let layout = PageLayout {
        font_size: config.font_size,
        margin_pt: config.margin_pt,
    };
    let name = file.name().to_string();

    let rendered = blocking(file.name(), Stage::Render, move || {
        let markup = extractor
            .extract(&bytes)
            .map_err(|e| stage_error(&name, Stage::Extract, e))?;
        debug!("'{}': {} bytes of markup", name, markup.len());
        renderer
            .render(&markup, &layout)
            .map_err(|e| stage_error(&name, Stage::Render, e))
    })
    .await?;

    Ok(Artifact::new(
        route::artifact_name(file.name(), &config.output_suffix, TargetFormat::Pdf),
        TargetFormat::Pdf,
        rendered.bytes,
    )
    .with_pages(rendered.pages))
}

/// Placeholder DOCX. The PDF content is only sniffed, never interpreted.
async fn convert_pdf(file: &InputFile, config: &ConverterConfig) -> Result<Artifact, RouteError> {
    let bytes = input::read_source(file).await?;
    if !input::has_pdf_magic(&bytes) {
        warn!(
            "'{}' does not start with %PDF (found {:?}); writing the placeholder anyway",
            file.name(),
            String::from_utf8_lossy(&input::magic_of(&bytes))
        );
    }
    let text = config.placeholder_text.clone();
    let name = file.name().to_string();

    let docx = blocking(file.name(), Stage::Encode, move || {
        docx::placeholder_docx(&text).map_err(|e| stage_error(&name, Stage::Encode, e))
    })
    .await?;

    Ok(Artifact::new(
        route::artifact_name(file.name(), &config.output_suffix, TargetFormat::Docx),
        TargetFormat::Docx,
        docx,
    ))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Run CPU-bound codec work off the async executor.
async fn blocking<T, F>(subject: &str, stage: Stage, work: F) -> Result<T, RouteError>
where
    F: FnOnce() -> Result<T, RouteError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| stage_error(subject, stage, format!("worker task failed: {e}")))?
}

fn stage_error(file: &str, stage: Stage, detail: impl std::fmt::Display) -> RouteError {
    RouteError::Conversion {
        file: file.to_string(),
        stage,
        detail: detail.to_string(),
    }
}
