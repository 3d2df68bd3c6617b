//! # Application State Management
//!
//! Shared state handed to every request handler.
//!
//! ```rust,no_run
//! use component_registry::config::Config;
//! use component_registry::state::AppState;
//!
//! let config = Config::default();
//! let state = AppState::from_config(config);
//! assert_eq!(state.registry.backend_name(), "local");
//! ```

use crate::config::Config;
use crate::registry::Registry;
use serde::Serialize;
use std::sync::Arc;

/// Application state containing the registry and its configuration.
///
/// Cloned per request; both fields are reference counted.
#[derive(Clone)]
pub struct AppState {
    /// The registry facade every handler delegates to
    pub registry: Arc<Registry>,
    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(registry: Arc<Registry>, config: Arc<Config>) -> Self {
        Self { registry, config }
    }

    /// Build the configured backend and a registry on top of it.
    pub fn from_config(config: Config) -> Self {
        let backend = config.storage.build_backend();
        let registry = Registry::new(backend, config.ingest_limits());
        Self::new(Arc::new(registry), Arc::new(config))
    }
}

/// Standardized success response for API consistency.
///
/// Serializes to: `{"message": "Operation completed successfully"}`
#[derive(Serialize)]
pub struct SuccessResponse {
    /// Human-readable success message describing the completed operation
    pub message: String,
}
