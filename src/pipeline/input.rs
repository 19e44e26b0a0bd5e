//! Input access: read a queued file's bytes and check magic numbers.
//!
//! Queued files are never buffered eagerly; each route reads what it
//! needs here, right before converting.

use crate::error::RouteError;
use crate::queue::InputFile;
use std::sync::Arc;
use tracing::debug;

/// Leading bytes of every PDF file.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Leading bytes of a ZIP container (and therefore of every DOCX).
pub const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// Read the full content of a queued file.
pub async fn read_source(file: &InputFile) -> Result<Arc<[u8]>, RouteError> {
    let bytes = file.read().await.map_err(|e| RouteError::Read {
        file: file.name().to_string(),
        detail: e.to_string(),
    })?;
    debug!("Read '{}' ({} bytes)", file.name(), bytes.len());
    Ok(bytes)
}

/// `true` when `bytes` starts with `%PDF`.
pub fn has_pdf_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// `true` when `bytes` starts with a ZIP local-file header.
pub fn has_zip_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC)
}

/// First four bytes, zero-padded, for diagnostics.
pub fn magic_of(bytes: &[u8]) -> [u8; 4] {
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    magic
}
