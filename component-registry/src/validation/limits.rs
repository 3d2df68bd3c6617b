//! # Input Validation: Size Limits & Thresholds
//!
//! Constants bounding uploads and archive extraction, plus the checks that
//! enforce them. Per-deployment overrides live in [`crate::config::LimitsConfig`].

use crate::validation::error::ValidationError;
use crate::validation::result::ValidationResult;

/// Maximum allowed compressed archive size for uploads (100 MB)
pub const MAX_UPLOAD_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum allowed request body size (120 MB) - allows overhead for multipart encoding
pub const MAX_REQUEST_BODY_SIZE: usize = 120 * 1024 * 1024;

/// Maximum total size of all files after decompression (200 MB)
pub const MAX_UNPACKED_SIZE: u64 = 200 * 1024 * 1024;

/// Maximum number of regular files accepted from one archive
pub const MAX_ARCHIVE_ENTRIES: usize = 2048;

/// Maximum allowed descriptor size (1 MB)
pub const MAX_DESCRIPTOR_SIZE: usize = 1024 * 1024;

/// Maximum allowed number of multipart fields
pub const MAX_MULTIPART_FIELDS: usize = 10;

/// Maximum allowed component name length
pub const MAX_COMPONENT_NAME_LENGTH: usize = 214;

/// Maximum allowed version string length
pub const MAX_VERSION_LENGTH: usize = 64;

/// Maximum allowed version range expression length
pub const MAX_RANGE_LENGTH: usize = 256;

/// Maximum allowed filename length
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Maximum allowed path depth for relative paths
pub const MAX_PATH_DEPTH: usize = 10;

/// Validate file size against limits.
///
/// `max_size` defaults to [`MAX_UPLOAD_SIZE`].
pub fn validate_file_size(size: u64, max_size: Option<u64>) -> ValidationResult<()> {
    let limit = max_size.unwrap_or(MAX_UPLOAD_SIZE);

    if size > limit {
        return Err(ValidationError::FileTooLarge {
            actual: size,
            max: limit,
        });
    }

    Ok(())
}

/// Validate the number of files unpacked from an archive.
pub fn validate_entry_count(count: usize, max_entries: Option<usize>) -> ValidationResult<()> {
    let limit = max_entries.unwrap_or(MAX_ARCHIVE_ENTRIES);

    if count > limit {
        return Err(ValidationError::TooManyEntries {
            actual: count,
            max: limit,
        });
    }

    Ok(())
}
