//! Registry facade: the single entry point the transport layer calls.

use crate::error::AppResult;
use crate::index::IndexStore;
use crate::ingest::{IngestLimits, Ingestor};
use crate::resolver::VersionTreeResolver;
use crate::storage::StorageBackend;
use crate::types::{ComponentName, IndexDocument};
use bytes::Bytes;
use semver::{Version, VersionReq};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// A request for the best version of one component.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub name: ComponentName,
    pub host_version: Version,
    pub requested: VersionReq,
    /// Version the caller already holds, if any.
    pub known_version: Option<Version>,
}

/// Result of a successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// The caller's version is still the one that resolves.
    NoUpdate { version: Version },
    Updated { version: Version, code: Bytes },
}

impl FetchOutcome {
    pub fn version(&self) -> &Version {
        match self {
            FetchOutcome::NoUpdate { version } | FetchOutcome::Updated { version, .. } => version,
        }
    }
}

/// Acknowledgment of a stored component version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishAck {
    pub name: ComponentName,
    pub version: Version,
    pub files: usize,
}

pub struct Registry {
    backend: Arc<dyn StorageBackend>,
    index: IndexStore,
    resolver: VersionTreeResolver,
    ingestor: Ingestor,
}

impl Registry {
    pub fn new(backend: Arc<dyn StorageBackend>, limits: IngestLimits) -> Self {
        let index = IndexStore::new(backend.clone());
        Self {
            resolver: VersionTreeResolver::new(backend.clone()),
            ingestor: Ingestor::new(backend.clone(), limits),
            index,
            backend,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn resolver(&self) -> &VersionTreeResolver {
        &self.resolver
    }

    /// Resolve a component and fetch its code unless the caller already has it.
    pub async fn get(&self, request: &FetchRequest) -> AppResult<FetchOutcome> {
        let resolution = self
            .resolver
            .resolve(&request.name, &request.host_version, &request.requested)
            .await?;

        if request.known_version.as_ref() == Some(&resolution.version) {
            debug!(component = %request.name, version = %resolution.version, "Caller is up to date");
            return Ok(FetchOutcome::NoUpdate {
                version: resolution.version,
            });
        }

        let code = resolution.code().await?;
        Ok(FetchOutcome::Updated {
            version: resolution.version,
            code,
        })
    }

    /// Ingest an uploaded archive, make the new version resolvable, then index it.
    ///
    /// The version is resolvable as soon as its files are stored. A failed index
    /// merge is still returned as an error, but does not hide the stored version.
    pub async fn save(
        &self,
        name: &ComponentName,
        declared_version: Option<&Version>,
        archive: Bytes,
    ) -> AppResult<PublishAck> {
        let record = self.ingestor.ingest(name, declared_version, archive).await?;
        self.resolver
            .record(
                name,
                record.version(),
                record.descriptor.host_range.clone(),
            )
            .await;
        self.index
            .record(name.clone(), record.version().clone())
            .await?;

        info!(component = %name, version = %record.version(), "Component published");
        Ok(PublishAck {
            name: name.clone(),
            version: record.version().clone(),
            files: record.files.len(),
        })
    }

    /// Current advisory index.
    pub async fn index(&self) -> AppResult<IndexDocument> {
        Ok(self.index.get().await?)
    }

    /// Recompute the advisory index from storage.
    pub async fn rebuild_index(&self) -> AppResult<IndexDocument> {
        Ok(self.index.rebuild().await?)
    }
}
