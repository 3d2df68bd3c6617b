//! Strong type definitions for registry identifiers and records
//!
//! Component names, descriptors, files and the advisory index are wrapped in
//! dedicated types so names are always normalized and versions are always
//! parsed semantic versions by the time they reach storage.

use crate::validation::{
    normalize_entry_path, parse_range, parse_version, validate_component_name, ValidationError,
    ValidationResult, MAX_DESCRIPTOR_SIZE,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Name of the descriptor file every component archive carries at its root.
pub const DESCRIPTOR_FILE: &str = "package.json";

/// A validated, lower-cased component name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ComponentName(String);

impl ComponentName {
    /// Validate and normalize a component name.
    pub fn new(name: &str) -> ValidationResult<Self> {
        validate_component_name(name).map(ComponentName)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ComponentName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ComponentName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<ComponentName> for String {
    fn from(name: ComponentName) -> Self {
        name.0
    }
}

impl AsRef<str> for ComponentName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Parsed contents of a component's descriptor file.
///
/// Known keys are validated; everything else is kept verbatim in `metadata`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentDescriptor {
    pub name: ComponentName,
    pub version: Version,
    /// Path of the file served as the component's code.
    pub main: String,
    /// Host versions this component version declares support for.
    #[serde(rename = "hostVersion")]
    pub host_range: VersionReq,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

#[derive(Deserialize)]
struct RawDescriptor {
    name: Option<String>,
    version: Option<String>,
    #[serde(alias = "entry")]
    main: Option<String>,
    #[serde(rename = "hostVersion", alias = "hostRange")]
    host_version: Option<String>,
    #[serde(flatten)]
    metadata: Map<String, Value>,
}

fn required(field: &str, value: Option<String>) -> ValidationResult<String> {
    value.ok_or_else(|| ValidationError::InvalidFormat {
        reason: format!("descriptor is missing required field '{field}'"),
    })
}

impl ComponentDescriptor {
    /// Parse and validate descriptor JSON.
    pub fn parse(content: &[u8]) -> ValidationResult<Self> {
        if content.len() > MAX_DESCRIPTOR_SIZE {
            return Err(ValidationError::FileTooLarge {
                actual: content.len() as u64,
                max: MAX_DESCRIPTOR_SIZE as u64,
            });
        }

        let raw: RawDescriptor =
            serde_json::from_slice(content).map_err(|e| ValidationError::InvalidFormat {
                reason: format!("descriptor is not valid JSON: {e}"),
            })?;

        let name = ComponentName::new(&required("name", raw.name)?)?;
        let version = parse_version("version", &required("version", raw.version)?)?;
        let main_raw = required("main", raw.main)?;
        let main = normalize_entry_path(&main_raw)?.ok_or_else(|| ValidationError::InvalidFormat {
            reason: format!("descriptor entry '{main_raw}' does not name a file"),
        })?;
        let host_range = parse_range("hostVersion", &required("hostVersion", raw.host_version)?)?;

        Ok(Self {
            name,
            version,
            main,
            host_range,
            metadata: raw.metadata,
        })
    }
}

/// One file of a component version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub name: String,
    pub content: Bytes,
}

impl File {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn is_descriptor(&self) -> bool {
        self.name == DESCRIPTOR_FILE
    }
}

/// A complete, validated component version as handed to storage.
#[derive(Debug, Clone)]
pub struct ComponentVersionRecord {
    pub descriptor: ComponentDescriptor,
    pub files: Vec<File>,
}

impl ComponentVersionRecord {
    pub fn name(&self) -> &ComponentName {
        &self.descriptor.name
    }

    pub fn version(&self) -> &Version {
        &self.descriptor.version
    }

    pub fn file(&self, name: &str) -> Option<&File> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// Advisory pointer to the most recently published version of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub latest: Version,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl IndexEntry {
    pub fn now(latest: Version) -> Self {
        Self {
            latest,
            updated_at: Utc::now(),
        }
    }
}

/// The whole index: one entry per component name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexDocument(BTreeMap<ComponentName, IndexEntry>);

impl IndexDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// A document holding a single entry.
    pub fn single(name: ComponentName, entry: IndexEntry) -> Self {
        let mut doc = Self::new();
        doc.insert(name, entry);
        doc
    }

    pub fn insert(&mut self, name: ComponentName, entry: IndexEntry) -> Option<IndexEntry> {
        self.0.insert(name, entry)
    }

    pub fn get(&self, name: &ComponentName) -> Option<&IndexEntry> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ComponentName, &IndexEntry)> {
        self.0.iter()
    }
}

impl IntoIterator for IndexDocument {
    type Item = (ComponentName, IndexEntry);
    type IntoIter = std::collections::btree_map::IntoIter<ComponentName, IndexEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(ComponentName, IndexEntry)> for IndexDocument {
    fn from_iter<I: IntoIterator<Item = (ComponentName, IndexEntry)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Published versions per component, as enumerated from stored descriptors.
///
/// Host-compatibility ranges are not part of the tree; they are fetched per
/// `(name, version)` on demand by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentTree(BTreeMap<ComponentName, BTreeSet<Version>>);

impl ComponentTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: ComponentName, version: Version) -> bool {
        self.0.entry(name).or_default().insert(version)
    }

    pub fn versions(&self, name: &ComponentName) -> Option<&BTreeSet<Version>> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &ComponentName> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ComponentName, &BTreeSet<Version>)> {
        self.0.iter()
    }
}

impl IntoIterator for ComponentTree {
    type Item = (ComponentName, BTreeSet<Version>);
    type IntoIter = std::collections::btree_map::IntoIter<ComponentName, BTreeSet<Version>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
