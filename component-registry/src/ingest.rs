//! Ingestion pipeline: uploaded archive to stored component version.
//!
//! Archives are gzip-compressed tarballs carrying the descriptor file at their
//! root. The whole archive is unpacked and validated in memory before the first
//! storage call, so a rejected or cancelled upload never leaves files behind.

use crate::error::{AppError, AppResult};
use crate::storage::StorageBackend;
use crate::types::{ComponentDescriptor, ComponentName, ComponentVersionRecord, File, DESCRIPTOR_FILE};
use crate::validation::{
    normalize_entry_path, validate_entry_count, validate_file_size, ValidationError,
    ValidationResult, MAX_ARCHIVE_ENTRIES, MAX_UNPACKED_SIZE, MAX_UPLOAD_SIZE,
};
use bytes::Bytes;
use flate2::read::GzDecoder;
use semver::Version;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;
use tar::Archive;
use tracing::{debug, info, warn};

/// Bounds applied while unpacking an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestLimits {
    /// Compressed archive size in bytes.
    pub max_archive_size: u64,
    /// Sum of all unpacked file sizes in bytes.
    pub max_unpacked_size: u64,
    /// Number of tar entries, directories included.
    pub max_entries: usize,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self {
            max_archive_size: MAX_UPLOAD_SIZE,
            max_unpacked_size: MAX_UNPACKED_SIZE,
            max_entries: MAX_ARCHIVE_ENTRIES,
        }
    }
}

fn malformed(e: std::io::Error) -> ValidationError {
    ValidationError::InvalidFormat {
        reason: format!("archive is not a readable gzip tarball: {e}"),
    }
}

/// Unpack a gzip tarball into its regular files, in archive order.
///
/// Directory, link and other non-regular entries are skipped. A name that
/// appears twice keeps its position and takes the later content.
pub fn extract_files(data: &[u8], limits: &IngestLimits) -> ValidationResult<Vec<File>> {
    validate_file_size(data.len() as u64, Some(limits.max_archive_size))?;

    let mut archive = Archive::new(GzDecoder::new(Cursor::new(data)));
    let mut files: Vec<File> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unpacked: u64 = 0;
    let mut seen = 0usize;

    for entry in archive.entries().map_err(malformed)? {
        let mut entry = entry.map_err(malformed)?;
        seen += 1;
        validate_entry_count(seen, Some(limits.max_entries))?;

        let raw_path = entry.path().map_err(malformed)?.to_string_lossy().to_string();
        if !entry.header().entry_type().is_file() {
            debug!(entry = %raw_path, "Skipping non-regular archive entry");
            continue;
        }

        let Some(name) = normalize_entry_path(&raw_path)? else {
            continue;
        };

        unpacked = unpacked.saturating_add(entry.size());
        if unpacked > limits.max_unpacked_size {
            return Err(ValidationError::FileTooLarge {
                actual: unpacked,
                max: limits.max_unpacked_size,
            });
        }

        let mut content = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut content).map_err(malformed)?;
        let file = File::new(name.clone(), content);

        match positions.get(&name) {
            Some(&position) => {
                warn!(entry = %name, "Duplicate archive entry, keeping the later one");
                files[position] = file;
            }
            None => {
                positions.insert(name, files.len());
                files.push(file);
            }
        }
    }

    debug!(files = files.len(), entries = seen, unpacked_bytes = unpacked, "Archive unpacked");
    Ok(files)
}

/// [`extract_files`] on the blocking thread pool.
pub async fn unpack_archive(data: Bytes, limits: IngestLimits) -> AppResult<Vec<File>> {
    let files = tokio::task::spawn_blocking(move || extract_files(&data, &limits))
        .await
        .map_err(|e| AppError::InternalError(format!("archive extraction task failed: {e}")))??;
    Ok(files)
}

/// Check an unpacked file set and derive the component identity from its descriptor.
///
/// The descriptor's name and version are authoritative; a caller-supplied name or
/// version that disagrees is rejected rather than reconciled.
pub fn validate_package(
    name: &ComponentName,
    declared_version: Option<&Version>,
    files: Vec<File>,
) -> ValidationResult<ComponentVersionRecord> {
    if files.is_empty() {
        return Err(ValidationError::EmptyArchive);
    }

    let descriptor_file = files
        .iter()
        .find(|f| f.is_descriptor())
        .ok_or_else(|| ValidationError::MissingDescriptor {
            file: DESCRIPTOR_FILE.to_string(),
        })?;
    let descriptor = ComponentDescriptor::parse(&descriptor_file.content)?;

    if &descriptor.name != name {
        return Err(ValidationError::NameMismatch {
            requested: name.to_string(),
            descriptor: descriptor.name.to_string(),
        });
    }

    if let Some(declared) = declared_version {
        if declared != &descriptor.version {
            return Err(ValidationError::VersionMismatch {
                declared: declared.to_string(),
                descriptor: descriptor.version.to_string(),
            });
        }
    }

    if !files.iter().any(|f| f.name == descriptor.main) {
        return Err(ValidationError::MissingEntryFile {
            entry: descriptor.main.clone(),
        });
    }

    Ok(ComponentVersionRecord { descriptor, files })
}

/// Turns uploaded archives into stored component versions.
#[derive(Clone)]
pub struct Ingestor {
    backend: Arc<dyn StorageBackend>,
    limits: IngestLimits,
}

impl Ingestor {
    pub fn new(backend: Arc<dyn StorageBackend>, limits: IngestLimits) -> Self {
        Self { backend, limits }
    }

    pub fn limits(&self) -> &IngestLimits {
        &self.limits
    }

    /// Unpack, validate and store one component version.
    ///
    /// Storage failures surface unchanged: if some files were written before the
    /// backend failed, nothing is rolled back. Indexing is left to the caller.
    pub async fn ingest(
        &self,
        name: &ComponentName,
        declared_version: Option<&Version>,
        archive: Bytes,
    ) -> AppResult<ComponentVersionRecord> {
        let archive_size = archive.len();
        let files = unpack_archive(archive, self.limits).await?;
        let record = validate_package(name, declared_version, files)?;
        let version = record.version().clone();

        self.backend
            .save_component(name, &version, record.files.clone())
            .await?;

        info!(
            component = %name,
            version = %version,
            files = record.files.len(),
            archive_size,
            backend = self.backend.name(),
            "Component version ingested"
        );
        Ok(record)
    }
}
