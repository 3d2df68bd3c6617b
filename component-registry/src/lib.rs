//! # Component Registry
//!
//! A registry for versioned UI components. Each published component version
//! declares the range of host application versions it supports; a fetch names
//! the host version and a requested component range, and gets back the highest
//! version satisfying both.
//!
//! ## Key Modules
//!
//! - [`registry`]: the facade handlers call (`get` / `save`)
//! - [`resolver`]: version selection against the stored version tree
//! - [`ingest`]: archive unpacking and descriptor validation
//! - [`index`]: the advisory "latest version" document
//! - [`storage`]: the backend contract and its local and in-memory adapters
//! - [`validation`]: input validation utilities
//! - [`server`], [`handlers`]: the HTTP surface
//! - [`config`], [`state`], [`error`]: configuration, shared state, error taxonomy

pub mod config;
pub mod error;
pub mod handlers;
pub mod index;
pub mod ingest;
pub mod registry;
pub mod resolver;
pub mod server;
pub mod state;
pub mod storage;
pub mod types;
pub mod validation;

// Re-export key types for convenience
pub use config::Config;
pub use error::{ApiErrorResponse, AppError, AppResult, ErrorCode};
pub use index::{merge_documents, IndexStore};
pub use ingest::{IngestLimits, Ingestor};
pub use registry::{FetchOutcome, FetchRequest, PublishAck, Registry};
pub use resolver::{Resolution, VersionTreeResolver};
pub use server::{build_router, run_server};
pub use state::{AppState, SuccessResponse};
pub use storage::{LocalStorage, MemoryStorage, StorageBackend, StorageError};
pub use types::{
    ComponentDescriptor, ComponentName, ComponentTree, ComponentVersionRecord, File, IndexDocument,
    IndexEntry, DESCRIPTOR_FILE,
};
pub use validation::{ValidationError, ValidationResult};
