//! Reading and writing rule documents on disk.
//!
//! Writes go to a temporary file in the target's directory which then
//! replaces the target, so a reader never sees a partly written document.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use narrator_rules::Document;

use crate::StoreError;

/// Load and validate the document at `path`.
pub fn read_document(path: &Path) -> Result<Document, StoreError> {
    let raw = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let document = Document::load(&raw).map_err(|source| StoreError::Schema {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), rules = document.rules().len(), "loaded rule document");
    Ok(document)
}

/// Replace the document at `path` with `document`.
pub fn write_document(path: &Path, document: &Document) -> Result<(), StoreError> {
    let write_err = |source: std::io::Error| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir).map_err(write_err)?;
    file.write_all(document.to_json_string().as_bytes())
        .map_err(write_err)?;
    file.as_file().sync_all().map_err(write_err)?;
    file.persist(path).map_err(|e| write_err(e.error))?;

    debug!(path = %path.display(), "wrote rule document");
    Ok(())
}
