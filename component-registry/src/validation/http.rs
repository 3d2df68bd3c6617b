//! # Input Validation: HTTP
//!
//! Validation helpers for the HTTP surface: bind hostnames and multipart uploads.

use crate::validation::error::ValidationError;
use crate::validation::limits::{MAX_MULTIPART_FIELDS, MAX_UPLOAD_SIZE};
use crate::validation::result::ValidationResult;
use regex::Regex;
use std::sync::OnceLock;

/// RFC 1123 hostname pattern.
fn hostname_regex() -> &'static Regex {
    static HOSTNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    HOSTNAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$")
            .expect("Hostname regex should compile - this is a static RFC 1123 pattern")
    })
}

/// Validate a hostname or IPv4 address used for binding the server.
pub fn validate_hostname(hostname: &str) -> ValidationResult<String> {
    if hostname.is_empty() {
        return Err(ValidationError::TooShort { actual: 0, min: 1 });
    }

    if hostname.len() > 253 {
        return Err(ValidationError::TooLong {
            actual: hostname.len(),
            max: 253,
        });
    }

    if hostname.contains('\0') {
        return Err(ValidationError::NullBytes);
    }

    if hostname.chars().any(|c| c.is_control()) {
        return Err(ValidationError::ControlCharacters);
    }

    if !hostname_regex().is_match(hostname) {
        return Err(ValidationError::InvalidCharacters {
            input: hostname.to_string(),
        });
    }

    Ok(hostname.to_string())
}

/// Validate multipart upload limits to prevent memory exhaustion.
///
/// `max_total` defaults to [`MAX_UPLOAD_SIZE`].
pub fn validate_multipart_limits(
    field_count: usize,
    total_size: u64,
    max_total: Option<u64>,
) -> ValidationResult<()> {
    if field_count > MAX_MULTIPART_FIELDS {
        return Err(ValidationError::TooLong {
            actual: field_count,
            max: MAX_MULTIPART_FIELDS,
        });
    }

    let size_limit = max_total.unwrap_or(MAX_UPLOAD_SIZE);
    if total_size > size_limit {
        return Err(ValidationError::FileTooLarge {
            actual: total_size,
            max: size_limit,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_hostname() {
        assert!(validate_hostname("example.com").is_ok());
        assert!(validate_hostname("localhost").is_ok());
        assert!(validate_hostname("0.0.0.0").is_ok());
        assert!(validate_hostname("127.0.0.1").is_ok());

        assert!(validate_hostname("").is_err());
        assert!(validate_hostname("-invalid.com").is_err());
        assert!(validate_hostname("invalid-.com").is_err());
        assert!(validate_hostname(".invalid.com").is_err());
        assert!(validate_hostname("host;malicious").is_err());
    }

    #[test]
    fn test_validate_multipart_limits() {
        assert!(validate_multipart_limits(1, 1024 * 1024, None).is_ok());
        assert!(validate_multipart_limits(MAX_MULTIPART_FIELDS + 1, 1024, None).is_err());
        assert!(validate_multipart_limits(1, MAX_UPLOAD_SIZE + 1, None).is_err());
        assert!(validate_multipart_limits(1, 2048, Some(1024)).is_err());
    }
}
