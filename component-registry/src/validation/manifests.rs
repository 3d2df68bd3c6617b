//! # Input Validation: Component Identity
//!
//! Validation for component names, versions and version ranges. Versions and
//! ranges are parsed with `semver`, so ordering and range containment follow
//! semantic-version precedence rather than string comparison.

use crate::validation::error::ValidationError;
use crate::validation::limits::{MAX_COMPONENT_NAME_LENGTH, MAX_RANGE_LENGTH, MAX_VERSION_LENGTH};
use crate::validation::result::ValidationResult;
use semver::{Version, VersionReq};

/// Validate a component name and return its normalized (lower-cased) form.
///
/// Names may contain ASCII letters, digits, `.`, `-` and `_`, and must not start
/// with `.` or `_`. Upper-case input is accepted and folded so `Widget` and
/// `widget` address the same component.
pub fn validate_component_name(name: &str) -> ValidationResult<String> {
    if name.is_empty() {
        return Err(ValidationError::TooShort { actual: 0, min: 1 });
    }

    if name.len() > MAX_COMPONENT_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            actual: name.len(),
            max: MAX_COMPONENT_NAME_LENGTH,
        });
    }

    if name.contains('\0') {
        return Err(ValidationError::NullBytes);
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(ValidationError::ControlCharacters);
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return Err(ValidationError::InvalidCharacters {
            input: name.to_string(),
        });
    }

    if name.starts_with('.') || name.starts_with('_') {
        return Err(ValidationError::InvalidFormat {
            reason: "component names cannot start with . or _".to_string(),
        });
    }

    Ok(name.to_ascii_lowercase())
}

/// Validate version strings before handing them to the semver parser.
///
/// Cheap character and length checks so hostile input never reaches the parser
/// or a log line unbounded.
pub fn validate_version(version: &str) -> ValidationResult<String> {
    if version.is_empty() {
        return Err(ValidationError::TooShort { actual: 0, min: 1 });
    }

    if version.len() > MAX_VERSION_LENGTH {
        return Err(ValidationError::TooLong {
            actual: version.len(),
            max: MAX_VERSION_LENGTH,
        });
    }

    if version.contains('\0') {
        return Err(ValidationError::NullBytes);
    }

    if version.chars().any(|c| c.is_control()) {
        return Err(ValidationError::ControlCharacters);
    }

    if !version
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+'))
    {
        return Err(ValidationError::InvalidCharacters {
            input: version.to_string(),
        });
    }

    Ok(version.to_string())
}

/// Parse a semantic version, naming `field` in the error.
pub fn parse_version(field: &'static str, value: &str) -> ValidationResult<Version> {
    let value = value.trim();
    validate_version(value)?;
    Version::parse(value).map_err(|e| ValidationError::InvalidVersion {
        field,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a semantic version range such as `^1.2.0`, `>=1.0.0, <2.0.0` or `*`.
///
/// A bare version (`1.2.0`) pins exactly that version, as npm reads it.
pub fn parse_range(field: &'static str, value: &str) -> ValidationResult<VersionReq> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::TooShort { actual: 0, min: 1 });
    }

    if value.len() > MAX_RANGE_LENGTH {
        return Err(ValidationError::TooLong {
            actual: value.len(),
            max: MAX_RANGE_LENGTH,
        });
    }

    if value.chars().any(|c| c.is_control()) {
        return Err(ValidationError::ControlCharacters);
    }

    if Version::parse(value).is_ok() {
        return VersionReq::parse(&format!("={value}")).map_err(|e| ValidationError::InvalidRange {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        });
    }

    VersionReq::parse(value)
        .or_else(|e| VersionReq::parse(&comma_separated(value)).map_err(|_| e))
        .map_err(|e| ValidationError::InvalidRange {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Rewrite a whitespace-separated range (`>=1.0.0 <2.0.0`, `>= 1.0.0`) into the
/// comma-separated form `semver` parses. Operators standing alone attach to the
/// version that follows them.
fn comma_separated(value: &str) -> String {
    let mut comparators: Vec<String> = Vec::new();
    let mut pending_op = String::new();

    for token in value.split_whitespace() {
        let token = token.trim_end_matches(',');
        if token.is_empty() {
            continue;
        }
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending_op.push_str(token);
            continue;
        }
        comparators.push(format!("{pending_op}{token}"));
        pending_op.clear();
    }

    comparators.join(", ")
}
