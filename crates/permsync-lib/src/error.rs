//! Error types for `permsync-lib`.
//!
//! Store backends map their native failures into `Storage` so callers
//! only ever see `PermsError`.

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for permission scheme operations.
#[derive(Error, Debug)]
pub enum PermsError {
    // === Lookup Errors ===
    /// No role carries the requested name.
    #[error("Role not found: {name}")]
    RoleNotFound { name: String },

    /// No scheme matches the requested id or name.
    #[error("Scheme not found: {id}")]
    SchemeNotFound { id: String },

    /// A role or scheme with this name already exists.
    #[error("{kind} name already taken: {name}")]
    NameTaken { kind: &'static str, name: String },

    // === Validation Errors ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Multiple validation errors occurred.
    #[error("Validation errors: {errors:?}")]
    ValidationErrors { errors: Vec<ValidationError> },

    /// Unknown scheme scope.
    #[error("Invalid scheme scope: {scope}")]
    InvalidScope { scope: String },

    // === JSONL Errors ===
    /// Failed to parse a line of an export stream.
    #[error("JSONL parse error at line {line}: {reason}")]
    JsonlParse { line: usize, reason: String },

    // === Migration Errors ===
    /// An operation needs a migration that has not completed yet.
    #[error("Migration not completed: {key}")]
    MigrationIncomplete { key: String },

    /// Scheme creation failed after the scheme row was written.
    ///
    /// The partially created scheme and its roles were deleted before this
    /// error was returned.
    #[error("Creating scheme '{scheme}' failed and was rolled back: {source}")]
    PartialFailure {
        scheme: String,
        #[source]
        source: Box<PermsError>,
    },

    // === Storage Errors ===
    /// Underlying persistence failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// File not found at the specified path.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    // === I/O Errors ===
    /// File system or sink I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single field validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl PermsError {
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn from_validation_errors(errors: Vec<ValidationError>) -> Self {
        if errors.len() == 1 {
            let err = &errors[0];
            Self::Validation {
                field: err.field.clone(),
                reason: err.message.clone(),
            }
        } else {
            Self::ValidationErrors { errors }
        }
    }

    #[must_use]
    pub fn role_not_found(name: impl Into<String>) -> Self {
        Self::RoleNotFound { name: name.into() }
    }

    #[must_use]
    pub fn scheme_not_found(id: impl Into<String>) -> Self {
        Self::SchemeNotFound { id: id.into() }
    }

    /// True for lookup misses (`RoleNotFound`, `SchemeNotFound`).
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::RoleNotFound { .. } | Self::SchemeNotFound { .. })
    }

    /// True for malformed input rather than store or I/O trouble.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::ValidationErrors { .. }
                | Self::InvalidScope { .. }
                | Self::JsonlParse { .. }
                | Self::NameTaken { .. }
        )
    }
}

/// Result type using `PermsError`.
pub type Result<T> = std::result::Result<T, PermsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_validation_error_collapses() {
        let err = PermsError::from_validation_errors(vec![ValidationError::new("name", "empty")]);
        assert!(matches!(err, PermsError::Validation { ref field, .. } if field == "name"));
    }

    #[test]
    fn partial_failure_keeps_source() {
        let err = PermsError::PartialFailure {
            scheme: "s1".to_string(),
            source: Box::new(PermsError::Storage("disk full".to_string())),
        };
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("Storage error: disk full"));
        assert!(err.to_string().contains("rolled back"));
    }

    #[test]
    fn not_found_classification() {
        assert!(PermsError::role_not_found("x").is_not_found());
        assert!(PermsError::scheme_not_found("x").is_not_found());
        assert!(!PermsError::Storage("x".into()).is_not_found());
    }
}
