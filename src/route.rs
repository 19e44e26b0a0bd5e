//! Route classification and artifact naming.
//!
//! A route is decided purely from the source extension and the target
//! format; file content is never inspected here.

use crate::config::TargetFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source extensions accepted by the image-to-PDF batch route.
pub const BATCH_IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

/// The conversion procedure chosen for one queued file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Decode a raster image and re-encode it as PNG or JPEG.
    ImageToImage,
    /// Merge every queued image into one multi-page PDF.
    ImageBatchToPdf,
    /// DOCX → markup → PDF.
    DocxToPdf,
    /// PDF → placeholder DOCX.
    PdfToDocx,
    /// No converter for this pair; the file is skipped.
    Unsupported,
}

impl Route {
    /// Classify a `(source extension, target)` pair.
    ///
    /// `ext` must already be lower-cased (see
    /// [`crate::queue::InputFile::extension`]).
    pub fn classify(ext: &str, target: TargetFormat) -> Self {
        match (ext, target) {
            ("docx", TargetFormat::Pdf) => Route::DocxToPdf,
            ("pdf", TargetFormat::Docx) => Route::PdfToDocx,
            (e, TargetFormat::Pdf) if BATCH_IMAGE_EXTENSIONS.contains(&e) => {
                Route::ImageBatchToPdf
            }
            (_, t) if t.is_raster() => Route::ImageToImage,
            _ => Route::Unsupported,
        }
    }

    /// Batch routes consume the whole queue and end the run.
    pub fn is_batch(self) -> bool {
        matches!(self, Route::ImageBatchToPdf)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Route::ImageToImage => "image → image",
            Route::ImageBatchToPdf => "images → pdf (batch)",
            Route::DocxToPdf => "docx → pdf",
            Route::PdfToDocx => "pdf → docx",
            Route::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

/// Artifact name for a one-to-one route: `<stem><suffix>.<target-ext>`.
///
/// The stem is everything before the *first* `.` of the source name's final
/// path component, so `photo.backup.png` becomes `photo_GR.jpeg` and
/// `uploads/a.png` becomes `a_GR.jpeg`.
pub fn artifact_name(source_name: &str, suffix: &str, target: TargetFormat) -> String {
    let base = base_name(source_name);
    let stem = base.split('.').next().unwrap_or(base);
    format!("{stem}{suffix}.{}", target.extension())
}

/// `name` with ` (n)` inserted before its extension: `a_GR (1).png`.
pub fn numbered_name(name: &str, n: usize) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({n}).{ext}"),
        _ => format!("{name} ({n})"),
    }
}

/// Final component of a `/` or `\` separated name.
pub(crate) fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}
