//! # Input Validation Utilities
//!
//! Validation for everything that crosses the registry boundary: component
//! names, versions and ranges, archive entry paths, and upload sizes. All checks
//! run before any storage call, so a rejected request has no side effects.

pub mod error;
pub mod http;
pub mod limits;
pub mod manifests;
pub mod paths;
pub mod result;

pub use self::{
    error::ValidationError,
    http::{validate_hostname, validate_multipart_limits},
    limits::{
        validate_entry_count, validate_file_size, MAX_ARCHIVE_ENTRIES, MAX_COMPONENT_NAME_LENGTH,
        MAX_DESCRIPTOR_SIZE, MAX_FILENAME_LENGTH, MAX_MULTIPART_FIELDS, MAX_PATH_DEPTH,
        MAX_RANGE_LENGTH, MAX_REQUEST_BODY_SIZE, MAX_UNPACKED_SIZE, MAX_UPLOAD_SIZE,
        MAX_VERSION_LENGTH,
    },
    manifests::{parse_range, parse_version, validate_component_name, validate_version},
    paths::{normalize_entry_path, validate_safe_path},
    result::ValidationResult,
};
