//! Filesystem storage adapter.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/index.json
//! <root>/components/<name>/<version>/package.json
//! <root>/components/<name>/<version>/<other files...>
//! ```
//!
//! Components live in their own subdirectory, so no component name can shadow
//! the index file or its temp sibling.

use super::{check_file_set, descriptor_last, StorageBackend, StorageError, StorageResult};
use crate::types::{ComponentDescriptor, ComponentName, ComponentTree, File, IndexDocument};
use crate::validation::validate_safe_path;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::future::try_join_all;
use semver::Version;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

const COMPONENTS_DIR: &str = "components";

/// Stores components as plain files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    index_file: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, index_file: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            index_file: index_file.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(&self.index_file)
    }

    fn components_dir(&self) -> PathBuf {
        self.root.join(COMPONENTS_DIR)
    }

    fn version_dir(&self, name: &ComponentName, version: &Version) -> PathBuf {
        self.components_dir()
            .join(name.as_str())
            .join(version.to_string())
    }

    fn file_path(
        &self,
        name: &ComponentName,
        version: &Version,
        file: &str,
    ) -> StorageResult<PathBuf> {
        validate_safe_path(file).map_err(|e| StorageError::Corrupt {
            key: file.to_string(),
            reason: format!("unsafe file name: {e}"),
        })?;
        Ok(self.version_dir(name, version).join(file))
    }
}

/// Read a file, mapping "not found" to `None`.
async fn read_optional(path: &Path) -> StorageResult<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "File not found");
            Ok(None)
        }
        Err(e) => Err(StorageError::io("read", path.display().to_string(), e)),
    }
}

/// Save file content, creating parent directories as needed.
async fn save_file(path: &Path, content: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::io("create_dir_all", parent.display().to_string(), e))?;
    }

    fs::write(path, content)
        .await
        .map_err(|e| StorageError::io("write", path.display().to_string(), e))?;
    debug!(path = %path.display(), size = content.len(), "File saved");
    Ok(())
}

/// Write through a sibling temp file and rename, so readers never see a torn document.
async fn replace_file(path: &Path, content: &[u8]) -> StorageResult<()> {
    let tmp = path.with_extension("tmp");
    save_file(&tmp, content).await?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| StorageError::io("rename", path.display().to_string(), e))
}

/// List subdirectory names, skipping dot-entries. A missing directory is empty.
async fn list_dirs(dir: &Path) -> StorageResult<Vec<String>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io("read_dir", dir.display().to_string(), e)),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StorageError::io("read_dir", dir.display().to_string(), e))?
    {
        let is_dir = entry
            .file_type()
            .await
            .map(|t| t.is_dir())
            .unwrap_or(false);
        let name = entry.file_name().to_string_lossy().to_string();
        if is_dir && !name.starts_with('.') {
            names.push(name);
        }
    }
    Ok(names)
}

#[async_trait]
impl StorageBackend for LocalStorage {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn read_index(&self) -> StorageResult<Option<IndexDocument>> {
        let path = self.index_path();
        let Some(content) = read_optional(&path).await? else {
            return Ok(None);
        };

        serde_json::from_slice(&content)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                key: path.display().to_string(),
                reason: e.to_string(),
            })
    }

    async fn write_index(&self, document: &IndexDocument) -> StorageResult<()> {
        let path = self.index_path();
        let content = serde_json::to_vec_pretty(document).map_err(|e| StorageError::Corrupt {
            key: path.display().to_string(),
            reason: e.to_string(),
        })?;
        replace_file(&path, &content).await?;
        info!(path = %path.display(), entries = document.len(), "Index written");
        Ok(())
    }

    async fn get_component_tree(&self) -> StorageResult<ComponentTree> {
        let mut tree = ComponentTree::new();
        let components = self.components_dir();

        for dir_name in list_dirs(&components).await? {
            let Ok(name) = ComponentName::new(&dir_name) else {
                warn!(directory = %dir_name, "Skipping directory with invalid component name");
                continue;
            };

            for version_dir in list_dirs(&components.join(&dir_name)).await? {
                let Ok(version) = Version::parse(&version_dir) else {
                    warn!(component = %name, directory = %version_dir, "Skipping non-semver version directory");
                    continue;
                };

                let descriptor = self.version_dir(&name, &version).join(crate::types::DESCRIPTOR_FILE);
                match fs::try_exists(&descriptor).await {
                    Ok(true) => {
                        tree.insert(name.clone(), version);
                    }
                    Ok(false) => {
                        debug!(component = %name, version = %version, "Version has no descriptor yet");
                    }
                    Err(e) => {
                        return Err(StorageError::io(
                            "stat",
                            descriptor.display().to_string(),
                            e,
                        ))
                    }
                }
            }
        }

        debug!(components = tree.names().count(), "Enumerated component tree");
        Ok(tree)
    }

    async fn get_component(
        &self,
        name: &ComponentName,
        version: &Version,
    ) -> StorageResult<Option<ComponentDescriptor>> {
        let path = self.file_path(name, version, crate::types::DESCRIPTOR_FILE)?;
        let Some(content) = read_optional(&path).await? else {
            return Ok(None);
        };

        ComponentDescriptor::parse(&content)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                key: path.display().to_string(),
                reason: e.to_string(),
            })
    }

    async fn get_file(
        &self,
        name: &ComponentName,
        version: &Version,
        file: &str,
    ) -> StorageResult<Option<Bytes>> {
        let path = self.file_path(name, version, file)?;
        Ok(read_optional(&path).await?.map(Bytes::from))
    }

    async fn save_component(
        &self,
        name: &ComponentName,
        version: &Version,
        files: Vec<File>,
    ) -> StorageResult<()> {
        check_file_set(name, version, &files)?;

        let dir = self.version_dir(name, version);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => info!(component = %name, version = %version, "Replacing previously stored version"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::io("remove_dir_all", dir.display().to_string(), e)),
        }

        let (rest, descriptor) = descriptor_last(files);

        let mut writes = Vec::with_capacity(rest.len());
        for file in &rest {
            let path = self.file_path(name, version, &file.name)?;
            writes.push(async move { save_file(&path, &file.content).await });
        }
        try_join_all(writes).await?;

        for file in &descriptor {
            let path = self.file_path(name, version, &file.name)?;
            save_file(&path, &file.content).await?;
        }

        info!(
            component = %name,
            version = %version,
            files = rest.len() + descriptor.len(),
            root = %self.root.display(),
            "Component version stored"
        );
        Ok(())
    }
}
