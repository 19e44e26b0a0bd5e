//! The file queue: an ordered, user-owned list of files awaiting conversion.
//!
//! [`InputFile`] is immutable and cheap to clone. Its content is never read
//! when the file is queued; the dispatcher reads it on demand through
//! [`InputFile::read`], once per conversion.

use crate::error::ConvertError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Where an [`InputFile`]'s bytes come from.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// A file on disk, read lazily.
    Path(PathBuf),
    /// Bytes already held in memory (shared, never copied on clone).
    Memory(Arc<[u8]>),
}

/// One user-selected file.
#[derive(Debug, Clone)]
pub struct InputFile {
    name: String,
    byte_size: u64,
    mime_hint: String,
    source: FileSource,
}

impl InputFile {
    /// Queue a file from disk. Only metadata is read here.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let meta = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => ConvertError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => ConvertError::FileNotFound {
                path: path.to_path_buf(),
            },
        })?;
        if !meta.is_file() {
            return Err(ConvertError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_hint = mime_from_name(&name).to_string();

        Ok(Self {
            name,
            byte_size: meta.len(),
            mime_hint,
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    /// Queue in-memory bytes under the given name.
    ///
    /// Only the final path component of `name` is kept, so a client-side
    /// path like `C:\scans\a.png` is queued as `a.png`. The MIME hint is
    /// guessed from the name's extension.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let name: String = name.into();
        let name = crate::route::base_name(&name).to_string();
        let bytes: Arc<[u8]> = bytes.into();
        let mime_hint = mime_from_name(&name).to_string();
        Self {
            name,
            byte_size: bytes.len() as u64,
            mime_hint,
            source: FileSource::Memory(bytes),
        }
    }

    /// Replace the MIME hint (e.g. with one reported by an upload form).
    pub fn with_mime_hint(mut self, mime: impl Into<String>) -> Self {
        self.mime_hint = mime.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    /// MIME type as reported or guessed. May be empty and is not trusted
    /// for decoding.
    pub fn mime_hint(&self) -> &str {
        &self.mime_hint
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }

    /// Lower-cased text after the last `.`, or `None` if the name has no `.`.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    /// `true` when the MIME hint says this is an image.
    pub fn is_image(&self) -> bool {
        self.mime_hint.starts_with("image/")
    }

    /// Read the full content.
    pub async fn read(&self) -> std::io::Result<Arc<[u8]>> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(Arc::clone(bytes)),
            FileSource::Path(path) => Ok(tokio::fs::read(path).await?.into()),
        }
    }
}

/// Guess a MIME type from a file name's extension. Empty when unknown.
pub fn mime_from_name(name: &str) -> &'static str {
    let ext = match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => return "",
    };
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "",
    }
}

/// Ordered collection of queued files.
///
/// Insertion order is preserved and duplicate names are kept as separate
/// entries. Removing an entry shifts every later entry down by one index,
/// so callers must re-resolve indices after each removal.
#[derive(Debug, Clone, Default)]
pub struct FileQueue {
    files: Vec<InputFile>,
}

impl FileQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append files, keeping their relative order.
    pub fn add(&mut self, files: impl IntoIterator<Item = InputFile>) {
        self.files.extend(files);
    }

    /// Remove and return the file at `index`.
    pub fn remove_at(&mut self, index: usize) -> Result<InputFile, ConvertError> {
        if index >= self.files.len() {
            return Err(ConvertError::IndexOutOfRange {
                index,
                len: self.files.len(),
            });
        }
        Ok(self.files.remove(index))
    }

    /// Current contents in queue order.
    pub fn list(&self) -> &[InputFile] {
        &self.files
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn get(&self, index: usize) -> Option<&InputFile> {
        self.files.get(index)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InputFile> {
        self.files.iter()
    }
}

impl FromIterator<InputFile> for FileQueue {
    fn from_iter<I: IntoIterator<Item = InputFile>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

impl Extend<InputFile> for FileQueue {
    fn extend<I: IntoIterator<Item = InputFile>>(&mut self, iter: I) {
        self.files.extend(iter);
    }
}

impl<'a> IntoIterator for &'a FileQueue {
    type Item = &'a InputFile;
    type IntoIter = std::slice::Iter<'a, InputFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}
