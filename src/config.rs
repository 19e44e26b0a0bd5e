//! Configuration types for file conversion.
//!
//! Two structs split the knobs by lifetime:
//!
//! * [`ConversionRequest`] — what the user picked for *this* run: the target
//!   format and the lossy-encode quality.
//! * [`ConverterConfig`] — how the converter behaves across runs: output
//!   naming, PDF layout, progress reporting and the pluggable document
//!   collaborators. Built via [`ConverterConfigBuilder`].

use crate::error::ConvertError;
use crate::pipeline::markup::MarkupExtractor;
use crate::pipeline::render::{MarkupRenderer, PageLayout};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Suffix appended to the stem of every per-file artifact.
pub const DEFAULT_SUFFIX: &str = "_GR";

/// Fixed name of the merged image-to-PDF artifact.
pub const DEFAULT_BATCH_FILE_NAME: &str = "GR_Converted_Docs.pdf";

/// Body text of the PDF → DOCX stub.
pub const DEFAULT_PLACEHOLDER_TEXT: &str =
    "This document was converted from PDF. Text extraction from PDF files is not supported; \
     the original content was not transferred.";

/// Default lossy-encode quality (0.0–1.0).
pub const DEFAULT_QUALITY: f32 = 0.9;

// ── Target format ────────────────────────────────────────────────────────

/// The format every queued file is converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Png,
    Jpeg,
    Pdf,
    Docx,
}

impl TargetFormat {
    /// Extension used for artifact names (without the dot).
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Png => "png",
            TargetFormat::Jpeg => "jpeg",
            TargetFormat::Pdf => "pdf",
            TargetFormat::Docx => "docx",
        }
    }

    /// IANA media type of artifacts in this format.
    pub fn media_type(self) -> &'static str {
        match self {
            TargetFormat::Png => "image/png",
            TargetFormat::Jpeg => "image/jpeg",
            TargetFormat::Pdf => "application/pdf",
            TargetFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    /// `true` for the raster targets handled by the image-to-image route.
    pub fn is_raster(self) -> bool {
        matches!(self, TargetFormat::Png | TargetFormat::Jpeg)
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TargetFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(TargetFormat::Png),
            "jpeg" | "jpg" => Ok(TargetFormat::Jpeg),
            "pdf" => Ok(TargetFormat::Pdf),
            "docx" => Ok(TargetFormat::Docx),
            other => Err(ConvertError::InvalidConfig(format!(
                "unknown target format '{other}' (expected png, jpeg, pdf or docx)"
            ))),
        }
    }
}

// ── Per-run request ──────────────────────────────────────────────────────

/// Target format plus lossy quality for one dispatcher run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub target: TargetFormat,
    /// Lossy-encode quality in `[0, 1]`. Only JPEG output reads it.
    pub quality: f32,
}

impl ConversionRequest {
    pub fn new(target: TargetFormat) -> Self {
        Self {
            target,
            quality: DEFAULT_QUALITY,
        }
    }

    /// Set the quality, clamped to `[0, 1]`. NaN falls back to the default.
    pub fn with_quality(mut self, quality: f32) -> Self {
        self.quality = if quality.is_nan() {
            DEFAULT_QUALITY
        } else {
            quality.clamp(0.0, 1.0)
        };
        self
    }

    /// Build from an integer percentage as entered by a user (1–100).
    pub fn from_percent(target: TargetFormat, percent: u8) -> Self {
        Self::new(target).with_quality(f32::from(percent.clamp(1, 100)) / 100.0)
    }

    /// Quality on the 1–100 scale the JPEG encoder expects.
    pub fn jpeg_quality(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

// ── Converter configuration ──────────────────────────────────────────────

/// Behaviour of the converter that stays fixed across runs.
///
/// # Example
/// ```rust
/// use gr_convert::ConverterConfig;
///
/// let config = ConverterConfig::builder()
///     .output_suffix("_converted")
///     .font_size(12.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.output_suffix, "_converted");
/// ```
#[derive(Clone)]
pub struct ConverterConfig {
    /// Appended to the source stem for per-file artifacts. Default: `_GR`.
    pub output_suffix: String,

    /// Name of the single artifact produced by the image batch route.
    pub batch_file_name: String,

    /// Paragraph written by the PDF → DOCX stub.
    pub placeholder_text: String,

    /// JPEG quality (1–100) used when embedding images into PDF pages. Default: 90.
    pub pdf_image_quality: u8,

    /// Body font size, in points, for DOCX → PDF rendering. Default: 11.
    pub font_size: f32,

    /// Page margin, in points, for DOCX → PDF rendering. Default: 56 (≈ 20 mm).
    pub margin_pt: f32,

    /// Receives per-file lifecycle events.
    pub progress_callback: Option<ProgressCallback>,

    /// Overrides the built-in DOCX → markup extractor.
    pub markup_extractor: Option<Arc<dyn MarkupExtractor>>,

    /// Overrides the built-in markup → PDF renderer.
    pub markup_renderer: Option<Arc<dyn MarkupRenderer>>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            output_suffix: DEFAULT_SUFFIX.to_string(),
            batch_file_name: DEFAULT_BATCH_FILE_NAME.to_string(),
            placeholder_text: DEFAULT_PLACEHOLDER_TEXT.to_string(),
            pdf_image_quality: 90,
            font_size: 11.0,
            margin_pt: 56.0,
            progress_callback: None,
            markup_extractor: None,
            markup_renderer: None,
        }
    }
}

impl fmt::Debug for ConverterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterConfig")
            .field("output_suffix", &self.output_suffix)
            .field("batch_file_name", &self.batch_file_name)
            .field("placeholder_text", &self.placeholder_text)
            .field("pdf_image_quality", &self.pdf_image_quality)
            .field("font_size", &self.font_size)
            .field("margin_pt", &self.margin_pt)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .field(
                "markup_extractor",
                &self.markup_extractor.as_ref().map(|_| "<dyn MarkupExtractor>"),
            )
            .field(
                "markup_renderer",
                &self.markup_renderer.as_ref().map(|_| "<dyn MarkupRenderer>"),
            )
            .finish()
    }
}

impl ConverterConfig {
    /// Check the constraints [`ConverterConfigBuilder::build`] enforces.
    ///
    /// Fields are public, so the dispatcher re-checks before each run.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.batch_file_name.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "batch file name must not be empty".into(),
            ));
        }
        if self.batch_file_name.contains(['/', '\\']) {
            return Err(ConvertError::InvalidConfig(format!(
                "batch file name must not contain path separators, got '{}'",
                self.batch_file_name
            )));
        }
        if self.output_suffix.contains(['/', '\\', '.']) {
            return Err(ConvertError::InvalidConfig(format!(
                "output suffix must not contain '/', '\\' or '.', got '{}'",
                self.output_suffix
            )));
        }
        PageLayout {
            font_size: self.font_size,
            margin_pt: self.margin_pt,
        }
        .check()
        .map_err(|e| ConvertError::InvalidConfig(e.to_string()))
    }

    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.output_suffix = suffix.into();
        self
    }

    pub fn batch_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.batch_file_name = name.into();
        self
    }

    pub fn placeholder_text(mut self, text: impl Into<String>) -> Self {
        self.config.placeholder_text = text.into();
        self
    }

    pub fn pdf_image_quality(mut self, q: u8) -> Self {
        self.config.pdf_image_quality = q.clamp(1, 100);
        self
    }

    pub fn font_size(mut self, pt: f32) -> Self {
        self.config.font_size = pt.clamp(6.0, 48.0);
        self
    }

    pub fn margin_pt(mut self, pt: f32) -> Self {
        self.config.margin_pt = pt.max(0.0);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn markup_extractor(mut self, extractor: Arc<dyn MarkupExtractor>) -> Self {
        self.config.markup_extractor = Some(extractor);
        self
    }

    pub fn markup_renderer(mut self, renderer: Arc<dyn MarkupRenderer>) -> Self {
        self.config.markup_renderer = Some(renderer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, ConvertError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
