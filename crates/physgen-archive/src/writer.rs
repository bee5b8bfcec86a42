//! Streaming archive writer.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use physgen_types::{PhysgenError, PhysgenResult};

use crate::dataset::Dataset;
use crate::{FORMAT_VERSION, MAGIC, MAX_ENTRY_LEN};

/// Appends datasets to a new archive file.
///
/// Each dataset path may be written once. Nothing is guaranteed to be on
/// disk until [`ArchiveWriter::finish`] returns.
pub struct ArchiveWriter {
    path: PathBuf,
    out: BufWriter<File>,
    written: HashSet<String>,
}

impl ArchiveWriter {
    /// Creates (truncating) `path` and writes the header.
    pub fn create(path: &Path) -> PhysgenResult<Self> {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        out.write_all(MAGIC)?;
        out.write_all(&FORMAT_VERSION.to_le_bytes())?;
        Ok(Self {
            path: path.to_path_buf(),
            out,
            written: HashSet::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if `path` has already been written.
    pub fn contains(&self, path: &str) -> bool {
        self.written.contains(path)
    }

    /// Number of datasets written so far.
    pub fn len(&self) -> usize {
        self.written.len()
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }

    /// Appends one dataset.
    pub fn write(&mut self, path: &str, dataset: &Dataset) -> PhysgenResult<()> {
        validate_path(path)?;
        if self.written.contains(path) {
            return Err(PhysgenError::Archive(format!(
                "dataset '{path}' written twice"
            )));
        }

        let body = bincode::serialize(&(path, dataset))
            .map_err(|e| PhysgenError::Serialization(e.to_string()))?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&body)?;
        let compressed = encoder.finish()?;

        if compressed.len() > MAX_ENTRY_LEN {
            return Err(PhysgenError::Archive(format!(
                "dataset '{path}' is too large ({} bytes compressed)",
                compressed.len()
            )));
        }
        let len = compressed.len() as u32;
        self.out.write_all(&len.to_le_bytes())?;
        self.out.write_all(&compressed)?;
        self.written.insert(path.to_string());
        Ok(())
    }

    /// Flushes and syncs the file to disk.
    pub fn finish(self) -> PhysgenResult<PathBuf> {
        let file = self
            .out
            .into_inner()
            .map_err(|e| PhysgenError::Io(e.into_error()))?;
        file.sync_all()?;
        tracing::debug!(path = %self.path.display(), datasets = self.written.len(), "archive closed");
        Ok(self.path)
    }
}

fn validate_path(path: &str) -> PhysgenResult<()> {
    if path.is_empty() || path.starts_with('/') || path.ends_with('/') || path.contains("//") {
        return Err(PhysgenError::Archive(format!("invalid dataset path '{path}'")));
    }
    Ok(())
}
