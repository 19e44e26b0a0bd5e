//! Artifact delivery: where finished conversions go.
//!
//! The dispatcher hands each [`Artifact`] to an [`ArtifactSink`] as soon as
//! its route succeeds. Delivery is irreversible; a later failure never
//! removes artifacts that were already delivered.

use crate::output::Artifact;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Receives finished artifacts.
pub trait ArtifactSink: Send + Sync {
    /// Take ownership of `artifact`. An `Err` becomes a
    /// [`crate::error::RouteError::Delivery`] for that route.
    fn deliver(&self, artifact: Artifact) -> std::io::Result<()>;
}

/// Writes artifacts into a directory.
///
/// Each write goes to a temp file in the same directory and is renamed into
/// place, so readers never see a half-written file. An existing file of the
/// same name (left by an earlier run) is replaced. Names that are not a
/// single plain file name are refused, so nothing lands outside `dir`.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn target_for(&self, file_name: &str) -> std::io::Result<PathBuf> {
        let mut parts = Path::new(file_name).components();
        match (parts.next(), parts.next()) {
            (Some(Component::Normal(_)), None) if !file_name.contains(['/', '\\']) => {
                Ok(self.dir.join(file_name))
            }
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("refusing artifact name '{file_name}': not a plain file name"),
            )),
        }
    }
}

impl ArtifactSink for DirectorySink {
    fn deliver(&self, artifact: Artifact) -> std::io::Result<()> {
        let target = self.target_for(&artifact.file_name)?;
        std::fs::create_dir_all(&self.dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&artifact.bytes)?;
        tmp.flush()?;
        tmp.persist(&target).map_err(|e| e.error)?;

        debug!(
            "Wrote {} ({} bytes)",
            target.display(),
            artifact.bytes.len()
        );
        Ok(())
    }
}

/// Keeps every delivered artifact in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    artifacts: Mutex<Vec<Artifact>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything delivered so far, in delivery order.
    pub fn take(&self) -> Vec<Artifact> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Artifact>> {
        // A poisoned lock still holds a valid Vec.
        self.artifacts.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ArtifactSink for MemorySink {
    fn deliver(&self, artifact: Artifact) -> std::io::Result<()> {
        self.lock().push(artifact);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetFormat;

    #[test]
    fn directory_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("out"));
        sink.deliver(Artifact::new("a_GR.png", TargetFormat::Png, b"abc".to_vec()))
            .unwrap();
        let written = std::fs::read(dir.path().join("out/a_GR.png")).unwrap();
        assert_eq!(written, b"abc");
    }

    #[test]
    fn directory_sink_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path());
        sink.deliver(Artifact::new("x.pdf", TargetFormat::Pdf, b"old".to_vec()))
            .unwrap();
        sink.deliver(Artifact::new("x.pdf", TargetFormat::Pdf, b"new".to_vec()))
            .unwrap();
        assert_eq!(std::fs::read(dir.path().join("x.pdf")).unwrap(), b"new");
        // No temp files left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn directory_sink_refuses_names_that_escape() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let sink = DirectorySink::new(&out);
        for name in ["../x.png", "/tmp/x.png", "sub/x.png", r"sub\x.png", "..", ".", ""] {
            let err = sink
                .deliver(Artifact::new(name, TargetFormat::Png, b"abc".to_vec()))
                .unwrap_err();
            assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput, "name={name:?}");
        }
        assert!(!dir.path().join("x.png").exists());
        assert!(!out.exists());
    }

    #[test]
    fn memory_sink_collects_in_order() {
        let sink = MemorySink::new();
        sink.deliver(Artifact::new("1.png", TargetFormat::Png, vec![1])).unwrap();
        sink.deliver(Artifact::new("2.png", TargetFormat::Png, vec![2])).unwrap();
        assert_eq!(sink.len(), 2);
        let names: Vec<_> = sink.take().into_iter().map(|a| a.file_name).collect();
        assert_eq!(names, ["1.png", "2.png"]);
        assert!(sink.is_empty());
    }
}
