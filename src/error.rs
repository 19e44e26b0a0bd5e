//! Error types for the gr-convert library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertError`] — **Fatal**: the run cannot proceed at all (bad
//!   queue index, unreadable output directory, invalid configuration).
//!   Returned as `Err(ConvertError)` from the top-level `run*` functions.
//!
//! * [`RouteError`] — **Non-fatal**: a single file (or a single batch)
//!   failed to convert but every other file is unaffected. Stored inside
//!   [`crate::output::ConversionOutcome::Failure`] so callers can inspect
//!   partial success instead of losing the whole run to one bad file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the gr-convert library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Queue errors ──────────────────────────────────────────────────────
    /// `FileQueue::remove_at` was called with an index outside `[0, len)`.
    #[error("Queue index {index} is out of range (queue holds {len} files)")]
    IndexOutOfRange { index: usize, len: usize },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Run errors ────────────────────────────────────────────────────────
    /// Some files converted but at least one failed.
    ///
    /// Returned by [`crate::output::RunReport::into_result`] when the
    /// caller wants to treat any file failure as an error.
    #[error("{failed}/{total} conversions failed")]
    PartialFailure {
        succeeded: usize,
        failed: usize,
        total: usize,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output artifact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Which collaborator stage of a route failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// DOCX → markup extraction.
    Extract,
    /// Markup → paginated PDF rendering.
    Render,
    /// Image or document encoding.
    Encode,
    /// PDF document assembly.
    Assemble,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Extract => "extract",
            Stage::Render => "render",
            Stage::Encode => "encode",
            Stage::Assemble => "assemble",
        };
        f.write_str(s)
    }
}

/// A non-fatal error for a single route.
///
/// Stored in [`crate::output::ConversionOutcome::Failure`]. The run
/// continues with the next queued file.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum RouteError {
    /// File name has no `.`, so no source extension can be derived.
    #[error("'{file}': no file extension")]
    UnknownExtension { file: String },

    /// Bytes could not be decoded as an image.
    #[error("'{file}': image decode failed: {detail}")]
    Decode { file: String, detail: String },

    /// A collaborator stage (extraction, rendering, encoding) failed.
    #[error("'{file}': {stage} stage failed: {detail}")]
    Conversion {
        file: String,
        stage: Stage,
        detail: String,
    },

    /// Source content could not be read.
    #[error("'{file}': read failed: {detail}")]
    Read { file: String, detail: String },

    /// The artifact was produced but the sink refused it.
    #[error("'{artifact}': delivery failed: {detail}")]
    Delivery { artifact: String, detail: String },
}

impl RouteError {
    /// Name of the file (or artifact) the error refers to.
    pub fn subject(&self) -> &str {
        match self {
            RouteError::UnknownExtension { file }
            | RouteError::Decode { file, .. }
            | RouteError::Conversion { file, .. }
            | RouteError::Read { file, .. } => file,
            RouteError::Delivery { artifact, .. } => artifact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_display() {
        let e = ConvertError::PartialFailure {
            succeeded: 2,
            failed: 1,
            total: 3,
        };
        let msg = e.to_string();
        assert!(msg.contains("1/3"), "got: {msg}");
    }

    #[test]
    fn index_out_of_range_display() {
        let e = ConvertError::IndexOutOfRange { index: 4, len: 2 };
        let msg = e.to_string();
        assert!(msg.contains("index 4"), "got: {msg}");
        assert!(msg.contains("2 files"), "got: {msg}");
    }

    #[test]
    fn conversion_error_names_stage() {
        let e = RouteError::Conversion {
            file: "report.docx".into(),
            stage: Stage::Extract,
            detail: "missing word/document.xml".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("report.docx"));
        assert!(msg.contains("extract stage"));
    }

    #[test]
    fn subject_returns_file_or_artifact() {
        let decode = RouteError::Decode {
            file: "x.png".into(),
            detail: "bad header".into(),
        };
        assert_eq!(decode.subject(), "x.png");

        let delivery = RouteError::Delivery {
            artifact: "x_GR.jpeg".into(),
            detail: "disk full".into(),
        };
        assert_eq!(delivery.subject(), "x_GR.jpeg");
    }

    #[test]
    fn route_error_serialises_to_json() {
        let e = RouteError::Conversion {
            file: "a.docx".into(),
            stage: Stage::Render,
            detail: "boom".into(),
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("\"render\""), "got: {json}");
    }
}
