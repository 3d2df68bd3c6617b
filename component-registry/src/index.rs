//! Index store: the advisory "latest version" document.
//!
//! The index is a cache over storage, never an authority on what exists. Merges
//! are read-modify-write without a transaction, so concurrent merges may drop one
//! side's entries; [`IndexStore::rebuild`] recomputes the whole document from the
//! stored component tree.

use crate::storage::{StorageBackend, StorageResult};
use crate::types::{ComponentName, IndexDocument, IndexEntry};
use semver::Version;
use std::sync::Arc;
use tracing::{debug, info};

/// Shallow-merge `partial` over `current`.
///
/// Keys present in `partial` replace the same keys in `current`; every other key
/// of `current` survives unchanged.
pub fn merge_documents(current: IndexDocument, partial: IndexDocument) -> IndexDocument {
    current.into_iter().chain(partial).collect()
}

/// Read and merge access to the index document of one storage backend.
#[derive(Clone)]
pub struct IndexStore {
    backend: Arc<dyn StorageBackend>,
}

impl IndexStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// The current index, empty if none has been written yet.
    pub async fn get(&self) -> StorageResult<IndexDocument> {
        let index = self.backend.get_index().await?;
        debug!(backend = self.backend.name(), entries = index.len(), "Index read");
        Ok(index)
    }

    /// Merge `partial` into the stored index.
    pub async fn merge(&self, partial: IndexDocument) -> StorageResult<()> {
        let entries = partial.len();
        self.backend.upsert_index(partial).await?;
        debug!(backend = self.backend.name(), entries, "Index merged");
        Ok(())
    }

    /// Point `name` at `version`.
    pub async fn record(&self, name: ComponentName, version: Version) -> StorageResult<()> {
        self.merge(IndexDocument::single(name, IndexEntry::now(version)))
            .await
    }

    /// Latest known version of `name`, if the index has an entry for it.
    pub async fn latest(&self, name: &ComponentName) -> StorageResult<Option<Version>> {
        Ok(self.get().await?.get(name).map(|entry| entry.latest.clone()))
    }

    /// Replace the index with one computed from storage: every component points
    /// at its highest stored version.
    pub async fn rebuild(&self) -> StorageResult<IndexDocument> {
        let tree = self.backend.get_component_tree().await?;
        let document: IndexDocument = tree
            .into_iter()
            .filter_map(|(name, versions)| {
                let latest = versions.into_iter().next_back()?;
                Some((name, IndexEntry::now(latest)))
            })
            .collect();

        self.backend.write_index(&document).await?;
        info!(
            backend = self.backend.name(),
            components = document.len(),
            "Index rebuilt from storage"
        );
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::types::{File, DESCRIPTOR_FILE};

    fn name(n: &str) -> ComponentName {
        ComponentName::new(n).unwrap()
    }

    fn entry(major: u64) -> IndexEntry {
        IndexEntry::now(Version::new(major, 0, 0))
    }

    #[test]
    fn test_merge_documents_overwrites_only_shared_keys() {
        let current: IndexDocument = [(name("a"), entry(1)), (name("b"), entry(1))]
            .into_iter()
            .collect();
        let partial: IndexDocument = [(name("b"), entry(2)), (name("c"), entry(3))]
            .into_iter()
            .collect();

        let merged = merge_documents(current, partial);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get(&name("a")).unwrap().latest, Version::new(1, 0, 0));
        assert_eq!(merged.get(&name("b")).unwrap().latest, Version::new(2, 0, 0));
        assert_eq!(merged.get(&name("c")).unwrap().latest, Version::new(3, 0, 0));
    }

    #[test]
    fn test_merge_into_empty_document() {
        let merged = merge_documents(IndexDocument::new(), IndexDocument::single(name("a"), entry(1)));
        assert_eq!(merged.len(), 1);
    }

    #[tokio::test]
    async fn test_cold_start_is_empty_not_an_error() {
        let store = IndexStore::new(Arc::new(MemoryStorage::new()));
        assert!(store.get().await.unwrap().is_empty());
        assert!(store.latest(&name("widget")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sequential_merges_accumulate() {
        let store = IndexStore::new(Arc::new(MemoryStorage::new()));

        store.record(name("a"), Version::new(1, 0, 0)).await.unwrap();
        store.record(name("b"), Version::new(2, 0, 0)).await.unwrap();

        let index = store.get().await.unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(
            store.latest(&name("a")).await.unwrap(),
            Some(Version::new(1, 0, 0))
        );
    }

    #[tokio::test]
    async fn test_rebuild_uses_highest_stored_version() {
        let storage = Arc::new(MemoryStorage::new());
        for version in ["1.0.0", "1.10.0", "1.2.0"] {
            let v = Version::parse(version).unwrap();
            storage
                .save_component(
                    &name("widget"),
                    &v,
                    vec![File::new(
                        DESCRIPTOR_FILE,
                        format!(
                            r#"{{"name":"widget","version":"{version}","main":"m.js","hostVersion":"*"}}"#
                        ),
                    )],
                )
                .await
                .unwrap();
        }

        let store = IndexStore::new(storage);
        store.record(name("stale"), Version::new(9, 0, 0)).await.unwrap();

        let rebuilt = store.rebuild().await.unwrap();
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(
            store.latest(&name("widget")).await.unwrap(),
            Some(Version::new(1, 10, 0))
        );
        assert!(store.latest(&name("stale")).await.unwrap().is_none());
    }
}
