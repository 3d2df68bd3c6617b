//! Common test utilities and helpers
//!
//! Archive builders, a backend wrapper that records calls and can inject index
//! failures, and registry setup helpers shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use component_registry::storage::{StorageBackend, StorageError, StorageResult};
use component_registry::{
    ComponentDescriptor, ComponentName, ComponentTree, File, IndexDocument, IngestLimits,
    LocalStorage, MemoryStorage, Registry,
};
use flate2::write::GzEncoder;
use flate2::Compression;
use semver::{Version, VersionReq};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Build a gzip tarball from `(path, content)` pairs, in order.
pub fn tarball(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, *content)
            .expect("append tar entry");
    }
    builder
        .into_inner()
        .expect("finish tar")
        .finish()
        .expect("finish gzip")
}

/// Descriptor JSON with the canonical keys.
pub fn descriptor(name: &str, version: &str, main: &str, host_range: &str) -> String {
    serde_json::json!({
        "name": name,
        "version": version,
        "main": main,
        "hostVersion": host_range,
        "peerDependencies": {"react": "^16.8.3"}
    })
    .to_string()
}

/// Code served for `name@version` by archives built with [`component_archive`].
pub fn code_for(name: &str, version: &str) -> String {
    format!("export default function {name}() {{ return '{version}'; }}")
}

/// A complete, valid component archive with `package.json` and `index.js`.
pub fn component_archive(name: &str, version: &str, host_range: &str) -> Bytes {
    let descriptor = descriptor(name, version, "index.js", host_range);
    let code = code_for(name, version);
    Bytes::from(tarball(&[
        ("package.json", descriptor.as_bytes()),
        ("index.js", code.as_bytes()),
    ]))
}

pub fn name(n: &str) -> ComponentName {
    ComponentName::new(n).expect("valid component name")
}

pub fn v(s: &str) -> Version {
    Version::parse(s).expect("valid version")
}

pub fn req(s: &str) -> VersionReq {
    VersionReq::parse(s).expect("valid range")
}

/// Wraps a backend, counting calls and optionally failing index writes.
pub struct RecordingBackend {
    inner: Arc<dyn StorageBackend>,
    pub saves: AtomicUsize,
    pub tree_scans: AtomicUsize,
    pub descriptor_reads: AtomicUsize,
    pub file_reads: AtomicUsize,
    pub fail_index_writes: AtomicBool,
}

impl RecordingBackend {
    pub fn new(inner: Arc<dyn StorageBackend>) -> Self {
        Self {
            inner,
            saves: AtomicUsize::new(0),
            tree_scans: AtomicUsize::new(0),
            descriptor_reads: AtomicUsize::new(0),
            file_reads: AtomicUsize::new(0),
            fail_index_writes: AtomicBool::new(false),
        }
    }

    pub fn memory() -> Arc<Self> {
        Arc::new(Self::new(Arc::new(MemoryStorage::new())))
    }

    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn tree_scans(&self) -> usize {
        self.tree_scans.load(Ordering::SeqCst)
    }

    pub fn descriptor_reads(&self) -> usize {
        self.descriptor_reads.load(Ordering::SeqCst)
    }

    pub fn file_reads(&self) -> usize {
        self.file_reads.load(Ordering::SeqCst)
    }

    pub fn fail_index_writes(&self, fail: bool) {
        self.fail_index_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageBackend for RecordingBackend {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn read_index(&self) -> StorageResult<Option<IndexDocument>> {
        self.inner.read_index().await
    }

    async fn write_index(&self, document: &IndexDocument) -> StorageResult<()> {
        if self.fail_index_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("index writes disabled".to_string()));
        }
        self.inner.write_index(document).await
    }

    async fn get_component_tree(&self) -> StorageResult<ComponentTree> {
        self.tree_scans.fetch_add(1, Ordering::SeqCst);
        self.inner.get_component_tree().await
    }

    async fn get_component(
        &self,
        name: &ComponentName,
        version: &Version,
    ) -> StorageResult<Option<ComponentDescriptor>> {
        self.descriptor_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_component(name, version).await
    }

    async fn get_file(
        &self,
        name: &ComponentName,
        version: &Version,
        file: &str,
    ) -> StorageResult<Option<Bytes>> {
        self.file_reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_file(name, version, file).await
    }

    async fn save_component(
        &self,
        name: &ComponentName,
        version: &Version,
        files: Vec<File>,
    ) -> StorageResult<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save_component(name, version, files).await
    }
}

/// A registry over a recording in-memory backend.
pub fn recording_registry() -> (Registry, Arc<RecordingBackend>) {
    let backend = RecordingBackend::memory();
    let registry = Registry::new(backend.clone(), IngestLimits::default());
    (registry, backend)
}

/// A registry over a local backend in a fresh temporary directory.
pub fn local_registry() -> (Registry, TempDir) {
    let temp_dir = TempDir::new().expect("create temp dir");
    (local_registry_at(temp_dir.path()), temp_dir)
}

/// A registry with empty caches over an existing local storage root.
pub fn local_registry_at(root: &Path) -> Registry {
    let backend = Arc::new(LocalStorage::new(root, "index.json"));
    Registry::new(backend, IngestLimits::default())
}
