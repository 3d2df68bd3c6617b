//! # Validation Result Type

use crate::validation::error::ValidationError;

/// Result of a validation check; the error always names what was rejected.
pub type ValidationResult<T> = Result<T, ValidationError>;
