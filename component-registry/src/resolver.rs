//! Version tree resolver.
//!
//! Picks, for a host version and a requested range, the highest published
//! version that satisfies both. The per-component version lists and the
//! per-version host ranges are cached for the lifetime of the resolver: a stored
//! version's host range never changes once observed, so neither cache is ever
//! invalidated, only extended.

use crate::error::{AppError, AppResult};
use crate::storage::{StorageBackend, StorageResult};
use crate::types::ComponentName;
use bytes::Bytes;
use futures_util::future::try_join_all;
use semver::{Version, VersionReq};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

type RangeCell = Arc<OnceCell<VersionReq>>;

/// Memoized host-compatibility ranges, one cell per `(name, version)`.
///
/// A cell is filled by the first caller to reach it; concurrent callers for the
/// same key wait on that fetch instead of issuing their own. Only ranges that
/// were actually read are memoized: a missing descriptor leaves the cell empty
/// so the next caller fetches again.
#[derive(Default)]
pub struct HostRangeTable {
    cells: Mutex<HashMap<(ComponentName, Version), RangeCell>>,
}

impl HostRangeTable {
    fn cell(&self, name: &ComponentName, version: &Version) -> RangeCell {
        let mut cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
        cells
            .entry((name.clone(), version.clone()))
            .or_default()
            .clone()
    }

    /// Host range of `name@version`, fetched from `backend` on first access.
    ///
    /// `None` means the version has no readable descriptor right now. Neither
    /// that nor a fetch error is memoized, so a later call retries.
    pub async fn get_or_fetch(
        &self,
        backend: &dyn StorageBackend,
        name: &ComponentName,
        version: &Version,
    ) -> StorageResult<Option<VersionReq>> {
        let cell = self.cell(name, version);
        let fetched = cell
            .get_or_try_init(|| async {
                debug!(component = %name, version = %version, "Fetching host range");
                match backend.get_host_range(name, version).await {
                    Ok(Some(range)) => Ok(range),
                    Ok(None) => Err(None),
                    Err(e) => Err(Some(e)),
                }
            })
            .await;

        match fetched {
            Ok(range) => Ok(Some(range.clone())),
            Err(None) => Ok(None),
            Err(Some(e)) => Err(e),
        }
    }

    /// Store the range of a freshly saved version, replacing any earlier one.
    pub fn insert(&self, name: &ComponentName, version: &Version, range: VersionReq) {
        let mut cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
        cells.insert(
            (name.clone(), version.clone()),
            Arc::new(OnceCell::new_with(Some(range))),
        );
    }

    /// Whether `name@version` has a memoized range.
    pub fn contains(&self, name: &ComponentName, version: &Version) -> bool {
        self.cells
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(name.clone(), version.clone()))
            .is_some_and(|cell| cell.initialized())
    }

    pub fn len(&self) -> usize {
        self.cells
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fetches the entry file of a resolved version on demand.
#[derive(Clone)]
pub struct CodeAccessor {
    backend: Arc<dyn StorageBackend>,
    name: ComponentName,
    version: Version,
}

impl CodeAccessor {
    pub fn new(backend: Arc<dyn StorageBackend>, name: ComponentName, version: Version) -> Self {
        Self {
            backend,
            name,
            version,
        }
    }

    /// Read the descriptor, then the file it names as entry point.
    pub async fn fetch(&self) -> AppResult<Bytes> {
        let descriptor = self
            .backend
            .get_component(&self.name, &self.version)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Component '{}' version {} is no longer stored",
                    self.name, self.version
                ))
            })?;

        let code = self
            .backend
            .get_file(&self.name, &self.version, &descriptor.main)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Entry file '{}' of component '{}' version {} is missing",
                    descriptor.main, self.name, self.version
                ))
            })?;

        debug!(component = %self.name, version = %self.version, size = code.len(), "Fetched component code");
        Ok(code)
    }
}

/// A successful resolution: the chosen version and a deferred code fetch.
#[derive(Clone)]
pub struct Resolution {
    pub name: ComponentName,
    pub version: Version,
    accessor: CodeAccessor,
}

impl Resolution {
    /// Fetch the component's code. Nothing is read from storage until this is called.
    pub async fn code(&self) -> AppResult<Bytes> {
        self.accessor.fetch().await
    }
}

/// Resolves component requests against the stored version tree.
pub struct VersionTreeResolver {
    backend: Arc<dyn StorageBackend>,
    versions: RwLock<HashMap<ComponentName, BTreeSet<Version>>>,
    host_ranges: HostRangeTable,
}

impl VersionTreeResolver {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            versions: RwLock::new(HashMap::new()),
            host_ranges: HostRangeTable::default(),
        }
    }

    pub fn host_ranges(&self) -> &HostRangeTable {
        &self.host_ranges
    }

    /// Published versions of `name`, enumerating storage on a cache miss.
    ///
    /// Names absent from storage are not cached, so a version published by
    /// another process becomes visible on the next request.
    pub async fn versions(&self, name: &ComponentName) -> StorageResult<Option<BTreeSet<Version>>> {
        if let Some(versions) = self.versions.read().await.get(name) {
            return Ok(Some(versions.clone()));
        }

        let tree = self.backend.get_component_tree().await?;
        let mut cache = self.versions.write().await;
        for (component, versions) in tree {
            cache.entry(component).or_default().extend(versions);
        }
        info!(
            backend = self.backend.name(),
            components = cache.len(),
            "Loaded component tree"
        );
        Ok(cache.get(name).cloned())
    }

    /// Make a freshly saved version resolvable without re-enumerating storage.
    pub async fn record(&self, name: &ComponentName, version: &Version, host_range: VersionReq) {
        self.host_ranges.insert(name, version, host_range);

        let mut cache = self.versions.write().await;
        match cache.get_mut(name) {
            Some(versions) => {
                versions.insert(version.clone());
            }
            // Not loaded yet: the next lookup enumerates storage and sees it.
            None => debug!(component = %name, version = %version, "Version tree not loaded, skipping cache update"),
        }
    }

    /// Highest version of `name` inside `requested` whose host range admits `host_version`.
    pub async fn resolve(
        &self,
        name: &ComponentName,
        host_version: &Version,
        requested: &VersionReq,
    ) -> AppResult<Resolution> {
        let versions = self
            .versions(name)
            .await?
            .filter(|versions| !versions.is_empty())
            .ok_or_else(|| AppError::NotFound(format!("Component '{name}' is not published")))?;

        let candidates: Vec<Version> = versions
            .into_iter()
            .filter(|v| requested.matches(v))
            .collect();
        if candidates.is_empty() {
            return Err(AppError::NotFound(format!(
                "Component '{name}' has no version matching '{requested}'"
            )));
        }

        let backend = self.backend.as_ref();
        let ranges = try_join_all(
            candidates
                .iter()
                .map(|version| self.host_ranges.get_or_fetch(backend, name, version)),
        )
        .await?;

        // Versions whose descriptor is unreadable right now are not candidates.
        let readable: Vec<(Version, VersionReq)> = candidates
            .into_iter()
            .zip(ranges)
            .filter_map(|(version, range)| match range {
                Some(range) => Some((version, range)),
                None => {
                    warn!(component = %name, version = %version, "Skipping version without a readable descriptor");
                    None
                }
            })
            .collect();
        if readable.is_empty() {
            return Err(AppError::NotFound(format!(
                "Component '{name}' has no readable version matching '{requested}'"
            )));
        }

        let chosen = readable
            .iter()
            .filter(|(_, range)| range.matches(host_version))
            .map(|(version, _)| version)
            .max()
            .cloned();

        let Some(version) = chosen else {
            return Err(AppError::Incompatible {
                name: name.clone(),
                host_version: host_version.clone(),
                candidates: readable.into_iter().map(|(version, _)| version).collect(),
            });
        };

        debug!(
            component = %name,
            host = %host_version,
            requested = %requested,
            version = %version,
            "Resolved component version"
        );
        Ok(Resolution {
            name: name.clone(),
            version: version.clone(),
            accessor: CodeAccessor::new(self.backend.clone(), name.clone(), version),
        })
    }
}
