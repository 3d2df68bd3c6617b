//! Storage backend contract and adapters.
//!
//! The registry core talks to storage only through [`StorageBackend`]. A backend
//! persists one index document plus named file blobs per component version, and
//! never needs transactions: the index read-merge-write is a provided method built
//! on two primitive calls, and the core treats the index as advisory.
//!
//! Two adapters ship with the crate:
//!
//! - [`LocalStorage`]: a directory tree, `<root>/components/<name>/<version>/<file>`.
//! - [`MemoryStorage`]: process-local maps, for tests and ephemeral instances.

use crate::index::merge_documents;
use crate::types::{
    ComponentDescriptor, ComponentName, ComponentTree, File, IndexDocument, DESCRIPTOR_FILE,
};
use async_trait::async_trait;
use bytes::Bytes;
use semver::{Version, VersionReq};

mod local;
mod memory;

pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Errors raised by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage {operation} failed for '{key}': {source}")]
    Io {
        operation: &'static str,
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stored object '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    /// Carries the partial document that was not merged so the caller can retry it.
    #[error("failed to upsert {} index entries: {source}", .partial.len())]
    IndexUpsert {
        partial: IndexDocument,
        #[source]
        source: Box<StorageError>,
    },

    #[error("refusing to save {name}@{version}: no files supplied")]
    EmptyFileSet {
        name: ComponentName,
        version: Version,
    },

    #[error("refusing to save {name}@{version}: '{}' is missing", DESCRIPTOR_FILE)]
    MissingDescriptor {
        name: ComponentName,
        version: Version,
    },

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn io(operation: &'static str, key: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::Io {
            operation,
            key: key.into(),
            source,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Capability contract every storage backend implements.
///
/// Backends bound their own I/O and fail explicitly instead of hanging; the core
/// adds no timeouts or retries.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Backend identifier for logs.
    fn name(&self) -> &'static str;

    /// Read the raw index document, `None` if none has been written yet.
    async fn read_index(&self) -> StorageResult<Option<IndexDocument>>;

    /// Replace the index document.
    async fn write_index(&self, document: &IndexDocument) -> StorageResult<()>;

    /// The current index, empty on a cold start.
    async fn get_index(&self) -> StorageResult<IndexDocument> {
        Ok(self.read_index().await?.unwrap_or_default())
    }

    /// Shallow-merge `partial` over the stored index.
    ///
    /// Read-modify-write with no transaction: concurrent upserts may lose one
    /// side's entries. Any failure is reported as [`StorageError::IndexUpsert`]
    /// holding `partial`.
    async fn upsert_index(&self, partial: IndexDocument) -> StorageResult<()> {
        let outcome = async {
            let current = self.get_index().await?;
            let merged = merge_documents(current, partial.clone());
            self.write_index(&merged).await
        }
        .await;

        outcome.map_err(|source| StorageError::IndexUpsert {
            partial,
            source: Box::new(source),
        })
    }

    /// Enumerate every stored version that has a descriptor.
    async fn get_component_tree(&self) -> StorageResult<ComponentTree>;

    /// Load the descriptor of one stored version, `None` if it does not exist.
    async fn get_component(
        &self,
        name: &ComponentName,
        version: &Version,
    ) -> StorageResult<Option<ComponentDescriptor>>;

    /// Host-compatibility range declared by one stored version.
    async fn get_host_range(
        &self,
        name: &ComponentName,
        version: &Version,
    ) -> StorageResult<Option<VersionReq>> {
        Ok(self
            .get_component(name, version)
            .await?
            .map(|descriptor| descriptor.host_range))
    }

    /// Read one file of a stored version, `None` if it does not exist.
    async fn get_file(
        &self,
        name: &ComponentName,
        version: &Version,
        file: &str,
    ) -> StorageResult<Option<Bytes>>;

    /// Persist a version's complete file set, replacing any previous upload of the
    /// same name and version.
    ///
    /// Implementations call [`check_file_set`] first. There is no cross-file
    /// atomicity guarantee; adapters write the descriptor last so a partially
    /// written version is not enumerated.
    async fn save_component(
        &self,
        name: &ComponentName,
        version: &Version,
        files: Vec<File>,
    ) -> StorageResult<()>;
}

/// Precondition shared by every `save_component` implementation.
pub fn check_file_set(name: &ComponentName, version: &Version, files: &[File]) -> StorageResult<()> {
    if files.is_empty() {
        return Err(StorageError::EmptyFileSet {
            name: name.clone(),
            version: version.clone(),
        });
    }

    if !files.iter().any(File::is_descriptor) {
        return Err(StorageError::MissingDescriptor {
            name: name.clone(),
            version: version.clone(),
        });
    }

    Ok(())
}

/// Split a file set into the descriptor and everything else, so adapters can
/// write the descriptor last.
pub(crate) fn descriptor_last(files: Vec<File>) -> (Vec<File>, Vec<File>) {
    files.into_iter().partition(|f| !f.is_descriptor())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name() -> ComponentName {
        ComponentName::new("widget").unwrap()
    }

    #[test]
    fn test_check_file_set_rejects_empty_and_descriptorless_sets() {
        let version = Version::new(1, 0, 0);

        assert!(matches!(
            check_file_set(&name(), &version, &[]),
            Err(StorageError::EmptyFileSet { .. })
        ));
        assert!(matches!(
            check_file_set(&name(), &version, &[File::new("main.js", "code")]),
            Err(StorageError::MissingDescriptor { .. })
        ));
        assert!(check_file_set(
            &name(),
            &version,
            &[File::new(DESCRIPTOR_FILE, "{}"), File::new("main.js", "code")]
        )
        .is_ok());
    }

    #[test]
    fn test_descriptor_last_partition() {
        let (rest, descriptor) = descriptor_last(vec![
            File::new(DESCRIPTOR_FILE, "{}"),
            File::new("main.js", "code"),
            File::new("styles.css", "css"),
        ]);

        assert_eq!(rest.len(), 2);
        assert_eq!(descriptor.len(), 1);
        assert!(descriptor[0].is_descriptor());
    }
}
