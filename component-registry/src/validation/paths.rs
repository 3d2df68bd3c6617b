//! # Input Validation: Path and Filename Validation
//!
//! Helpers for archive entry names and storage keys, preventing path traversal
//! and names that cannot be stored portably.

use crate::validation::error::ValidationError;
use crate::validation::limits::{MAX_FILENAME_LENGTH, MAX_PATH_DEPTH};
use crate::validation::result::ValidationResult;
use std::path::{Component, Path, PathBuf};

/// Characters that are not portable across filesystems or object stores.
const UNSAFE_CHARACTERS: [char; 8] = ['\\', ':', '*', '?', '"', '<', '>', '|'];

/// Validate that a relative path is safe to use as a storage key.
///
/// Rejects absolute paths, any `..` component, excessive depth, overlong
/// segments, and characters that some backends cannot store.
///
/// ```rust
/// use component_registry::validation::validate_safe_path;
///
/// assert!(validate_safe_path("widget/1.0.0/main.bundle").is_ok());
/// assert!(validate_safe_path("../../../etc/passwd").is_err());
/// assert!(validate_safe_path("/etc/passwd").is_err());
/// ```
pub fn validate_safe_path<P: AsRef<Path>>(path: P) -> ValidationResult<PathBuf> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy();

    if path_str.is_empty() {
        return Err(ValidationError::TooShort { actual: 0, min: 1 });
    }

    if path_str.contains('\0') {
        return Err(ValidationError::NullBytes);
    }

    if path_str.chars().any(|c| c.is_control()) {
        return Err(ValidationError::ControlCharacters);
    }

    if path.is_absolute() || path_str.starts_with('/') {
        return Err(ValidationError::AbsolutePath {
            path: path_str.to_string(),
        });
    }

    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(ValidationError::PathTraversal {
            path: path_str.to_string(),
        });
    }

    let depth = path.components().count();
    if depth > MAX_PATH_DEPTH {
        return Err(ValidationError::PathTooDeep {
            actual: depth,
            max: MAX_PATH_DEPTH,
        });
    }

    for component in path.components() {
        let segment = component.as_os_str().len();
        if segment > MAX_FILENAME_LENGTH {
            return Err(ValidationError::TooLong {
                actual: segment,
                max: MAX_FILENAME_LENGTH,
            });
        }
    }

    if path_str.contains("//") || path_str.chars().any(|c| UNSAFE_CHARACTERS.contains(&c)) {
        return Err(ValidationError::InvalidCharacters {
            input: path_str.to_string(),
        });
    }

    Ok(path.to_path_buf())
}

/// Normalize an archive entry name into the file name stored for a component.
///
/// Leading `./` segments are dropped so `./main.js` and `main.js` name the same
/// file. Returns `None` for entries that name the archive root itself.
pub fn normalize_entry_path(raw: &str) -> ValidationResult<Option<String>> {
    let mut trimmed = raw;
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    let trimmed = trimmed.trim_end_matches('/');

    if trimmed.is_empty() || trimmed == "." {
        return Ok(None);
    }

    validate_safe_path(trimmed)?;
    Ok(Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_safe_path() {
        // Valid paths
        assert!(validate_safe_path("widget/1.0.0").is_ok());
        assert!(validate_safe_path("assets/icons/close.svg").is_ok());
        assert!(validate_safe_path("chunks/[id].js").is_ok());

        // Invalid paths
        assert!(validate_safe_path("../../../etc/passwd").is_err());
        assert!(validate_safe_path("/etc/passwd").is_err());
        assert!(validate_safe_path("path/with/../traversal").is_err());
        assert!(validate_safe_path("path/with/null\0byte").is_err());
        assert!(validate_safe_path("c:evil").is_err());
        assert!(validate_safe_path("").is_err());
    }

    #[test]
    fn test_validate_safe_path_depth() {
        let deep = vec!["d"; MAX_PATH_DEPTH + 1].join("/");
        assert!(matches!(
            validate_safe_path(&deep),
            Err(ValidationError::PathTooDeep { .. })
        ));
    }

    #[test]
    fn test_normalize_entry_path() {
        assert_eq!(
            normalize_entry_path("./package.json").unwrap().as_deref(),
            Some("package.json")
        );
        assert_eq!(
            normalize_entry_path("dist/main.js").unwrap().as_deref(),
            Some("dist/main.js")
        );
        assert_eq!(normalize_entry_path("./").unwrap(), None);
        assert_eq!(normalize_entry_path(".").unwrap(), None);
        assert!(normalize_entry_path("../escape.js").is_err());
        assert!(normalize_entry_path("/abs.js").is_err());
    }
}
