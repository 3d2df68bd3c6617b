//! In-process storage adapter.

use super::{check_file_set, StorageBackend, StorageError, StorageResult};
use crate::types::{
    ComponentDescriptor, ComponentName, ComponentTree, File, IndexDocument, DESCRIPTOR_FILE,
};
use async_trait::async_trait;
use bytes::Bytes;
use semver::Version;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

type VersionKey = (ComponentName, Version);

/// Keeps the index and all component files in memory. Contents are lost when the
/// process exits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    index: RwLock<Option<IndexDocument>>,
    components: RwLock<BTreeMap<VersionKey, BTreeMap<String, Bytes>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored component versions.
    pub async fn version_count(&self) -> usize {
        self.components.read().await.len()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn read_index(&self) -> StorageResult<Option<IndexDocument>> {
        Ok(self.index.read().await.clone())
    }

    async fn write_index(&self, document: &IndexDocument) -> StorageResult<()> {
        *self.index.write().await = Some(document.clone());
        debug!(entries = document.len(), "Index written");
        Ok(())
    }

    async fn get_component_tree(&self) -> StorageResult<ComponentTree> {
        let components = self.components.read().await;
        let mut tree = ComponentTree::new();
        for ((name, version), files) in components.iter() {
            if files.contains_key(DESCRIPTOR_FILE) {
                tree.insert(name.clone(), version.clone());
            }
        }
        Ok(tree)
    }

    async fn get_component(
        &self,
        name: &ComponentName,
        version: &Version,
    ) -> StorageResult<Option<ComponentDescriptor>> {
        let Some(content) = self.get_file(name, version, DESCRIPTOR_FILE).await? else {
            return Ok(None);
        };

        ComponentDescriptor::parse(&content)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                key: format!("{name}/{version}/{DESCRIPTOR_FILE}"),
                reason: e.to_string(),
            })
    }

    async fn get_file(
        &self,
        name: &ComponentName,
        version: &Version,
        file: &str,
    ) -> StorageResult<Option<Bytes>> {
        let components = self.components.read().await;
        Ok(components
            .get(&(name.clone(), version.clone()))
            .and_then(|files| files.get(file))
            .cloned())
    }

    async fn save_component(
        &self,
        name: &ComponentName,
        version: &Version,
        files: Vec<File>,
    ) -> StorageResult<()> {
        check_file_set(name, version, &files)?;

        let stored: BTreeMap<String, Bytes> = files
            .into_iter()
            .map(|file| (file.name, file.content))
            .collect();
        let count = stored.len();

        self.components
            .write()
            .await
            .insert((name.clone(), version.clone()), stored);
        debug!(component = %name, version = %version, files = count, "Component version stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IndexEntry;

    fn widget() -> ComponentName {
        ComponentName::new("widget").unwrap()
    }

    fn descriptor(version: &str) -> File {
        File::new(
            DESCRIPTOR_FILE,
            format!(
                r#"{{"name":"widget","version":"{version}","main":"main.js","hostVersion":"^1.0.0"}}"#
            ),
        )
    }

    #[tokio::test]
    async fn test_upsert_merges_instead_of_overwriting() {
        let storage = MemoryStorage::new();
        let gadget = ComponentName::new("gadget").unwrap();

        storage
            .upsert_index(IndexDocument::single(
                widget(),
                IndexEntry::now(Version::new(1, 0, 0)),
            ))
            .await
            .unwrap();
        storage
            .upsert_index(IndexDocument::single(
                gadget.clone(),
                IndexEntry::now(Version::new(2, 0, 0)),
            ))
            .await
            .unwrap();

        let index = storage.get_index().await.unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(&widget()).unwrap().latest, Version::new(1, 0, 0));
        assert_eq!(index.get(&gadget).unwrap().latest, Version::new(2, 0, 0));
    }

    #[tokio::test]
    async fn test_resave_is_wholesale_replacement() {
        let storage = MemoryStorage::new();
        let version = Version::new(1, 0, 0);

        for _ in 0..2 {
            storage
                .save_component(
                    &widget(),
                    &version,
                    vec![descriptor("1.0.0"), File::new("main.js", "code")],
                )
                .await
                .unwrap();
        }

        assert_eq!(storage.version_count().await, 1);
        let tree = storage.get_component_tree().await.unwrap();
        assert_eq!(tree.versions(&widget()).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_descriptor_is_reported() {
        let storage = MemoryStorage::new();
        let version = Version::new(1, 0, 0);
        storage
            .save_component(&widget(), &version, vec![File::new(DESCRIPTOR_FILE, "{}")])
            .await
            .unwrap();

        assert!(matches!(
            storage.get_component(&widget(), &version).await,
            Err(StorageError::Corrupt { .. })
        ));
    }
}
