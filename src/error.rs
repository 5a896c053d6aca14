//! Error types for `permsync`.
//!
//! Library errors pass through unchanged; the binary adds database,
//! workspace and configuration failures and maps every category to a
//! process exit code.

use std::path::PathBuf;

use permsync_lib::PermsError;
use thiserror::Error;

/// Primary error type for the `permsync` binary.
#[derive(Error, Debug)]
pub enum PermsyncError {
    // === Library Errors ===
    #[error(transparent)]
    Perms(#[from] PermsError),

    // === Database Errors ===
    /// `SQLite` failure.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    // === Workspace Errors ===
    /// No `.permsync/` directory was found.
    #[error("Not initialized: run 'permsync init' first")]
    NotInitialized,

    /// `init` found an existing database.
    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    // === Config Errors ===
    /// Invalid configuration value.
    #[error("Config error: {0}")]
    Config(String),

    /// YAML parse or serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PermsyncError {
    /// Process exit code for this error.
    ///
    /// - 2: invalid input
    /// - 3: a role or scheme was not found
    /// - 4: no workspace
    /// - 1: anything else
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Perms(inner) if inner.is_validation() => 2,
            Self::Perms(inner) if inner.is_not_found() => 3,
            Self::Config(_) | Self::Yaml(_) => 2,
            Self::NotInitialized => 4,
            _ => 1,
        }
    }
}

/// Result type using `PermsyncError`.
pub type Result<T> = std::result::Result<T, PermsyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_by_category() {
        let validation = PermsyncError::from(PermsError::validation("name", "bad"));
        assert_eq!(validation.exit_code(), 2);

        let missing = PermsyncError::from(PermsError::role_not_found("ghost"));
        assert_eq!(missing.exit_code(), 3);

        assert_eq!(PermsyncError::NotInitialized.exit_code(), 4);
        assert_eq!(
            PermsyncError::from(PermsError::Storage("disk".into())).exit_code(),
            1
        );
    }

    #[test]
    fn library_errors_display_transparently() {
        let err = PermsyncError::from(PermsError::role_not_found("ghost"));
        assert_eq!(err.to_string(), "Role not found: ghost");
    }
}
