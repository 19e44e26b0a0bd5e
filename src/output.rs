//! Result types produced by a dispatcher run.

use crate::config::TargetFormat;
use crate::error::{ConvertError, RouteError};
use crate::route::Route;
use serde::{Deserialize, Serialize};

/// An encoded output blob with its suggested file name.
///
/// Ownership moves into the [`crate::sink::ArtifactSink`] on delivery; the
/// run report keeps only an [`ArtifactSummary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub file_name: String,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
    /// Number of queued files that went into this artifact.
    pub source_count: usize,
    /// Page count for paged formats (PDF); `None` otherwise.
    pub pages: Option<usize>,
}

impl Artifact {
    pub fn new(file_name: impl Into<String>, target: TargetFormat, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: target.media_type(),
            bytes,
            source_count: 1,
            pages: None,
        }
    }

    pub fn with_pages(mut self, pages: usize) -> Self {
        self.pages = Some(pages);
        self
    }

    pub fn with_source_count(mut self, n: usize) -> Self {
        self.source_count = n;
        self
    }

    /// Describe the artifact without its bytes.
    pub fn summary(&self) -> ArtifactSummary {
        ArtifactSummary {
            file_name: self.file_name.clone(),
            media_type: self.media_type.to_string(),
            byte_len: self.bytes.len(),
            source_count: self.source_count,
            pages: self.pages,
        }
    }
}

/// What the run report remembers about a delivered artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSummary {
    pub file_name: String,
    pub media_type: String,
    pub byte_len: usize,
    pub source_count: usize,
    pub pages: Option<usize>,
}

/// Result of one routed conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionOutcome {
    Success {
        /// Name of the queued file that triggered the route.
        source: String,
        route: Route,
        artifact: ArtifactSummary,
    },
    Failure {
        source: String,
        route: Route,
        error: RouteError,
    },
}

impl ConversionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionOutcome::Success { .. })
    }

    pub fn route(&self) -> Route {
        match self {
            ConversionOutcome::Success { route, .. } | ConversionOutcome::Failure { route, .. } => {
                *route
            }
        }
    }

    pub fn source(&self) -> &str {
        match self {
            ConversionOutcome::Success { source, .. }
            | ConversionOutcome::Failure { source, .. } => source,
        }
    }

    pub fn artifact(&self) -> Option<&ArtifactSummary> {
        match self {
            ConversionOutcome::Success { artifact, .. } => Some(artifact),
            ConversionOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&RouteError> {
        match self {
            ConversionOutcome::Success { .. } => None,
            ConversionOutcome::Failure { error, .. } => Some(error),
        }
    }
}

/// Aggregate verdict of a run, as reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunSummary {
    AllSucceeded,
    SomeFailed { failed: usize, total: usize },
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Files in the queue when the run started.
    pub queued: usize,
    /// Routes that were attempted (a batch counts once).
    pub routed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Files skipped: no extension, unsupported pair, or non-image source
    /// for an image target.
    pub skipped: usize,
    /// Files left untouched because a batch route ended the run.
    pub not_reached: usize,
    pub total_duration_ms: u64,
}

/// Everything a run produced, minus the artifact bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub target: TargetFormat,
    pub outcomes: Vec<ConversionOutcome>,
    /// Names of skipped files, in queue order.
    pub skipped: Vec<String>,
    pub stats: RunStats,
}

impl RunReport {
    pub fn summary(&self) -> RunSummary {
        if self.stats.failed == 0 {
            RunSummary::AllSucceeded
        } else {
            RunSummary::SomeFailed {
                failed: self.stats.failed,
                total: self.stats.routed,
            }
        }
    }

    /// Summaries of every delivered artifact, in delivery order.
    pub fn artifacts(&self) -> impl Iterator<Item = &ArtifactSummary> {
        self.outcomes.iter().filter_map(ConversionOutcome::artifact)
    }

    /// Treat any failed route as an error.
    pub fn into_result(self) -> Result<Self, ConvertError> {
        match self.summary() {
            RunSummary::AllSucceeded => Ok(self),
            RunSummary::SomeFailed { failed, total } => Err(ConvertError::PartialFailure {
                succeeded: self.stats.succeeded,
                failed,
                total,
            }),
        }
    }
}
