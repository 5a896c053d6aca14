//! Configuration management for `permsync`.
//!
//! Configuration is loaded from `.permsync/config.yaml` with support for:
//! - Workspace discovery by walking up from the current directory
//! - Environment variable overrides (`PERMSYNC_DIR`, `PERMSYNC_DB`)
//! - A `--db` flag that overrides both
//!
//! Missing keys fall back to defaults.

use std::fs;
use std::path::{Path, PathBuf};

use permsync_lib::migration::{MigrationOptions, SchemeSeed};
use permsync_lib::permissions::ExportOptions;
use serde::{Deserialize, Serialize};

use crate::error::{PermsyncError, Result};
use crate::storage::SqliteStorage;
use crate::sync::history::HistoryConfig;

pub const WORKSPACE_DIR: &str = ".permsync";
pub const CONFIG_FILE: &str = "config.yaml";
pub const DEFAULT_DB: &str = "permsync.db";
pub const EXPORT_FILE: &str = "permissions.jsonl";
pub const HISTORY_DIR: &str = ".history";

pub const DIR_ENV: &str = "PERMSYNC_DIR";
pub const DB_ENV: &str = "PERMSYNC_DB";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub include_default_roles: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            include_default_roles: ExportOptions::default().include_default_roles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationSettings {
    /// Schemes seeded by the default-scheme migration.
    pub default_schemes: Vec<SchemeSeed>,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            default_schemes: MigrationOptions::default().scheme_seeds,
        }
    }
}

/// Contents of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database path, relative to the workspace directory.
    pub database: PathBuf,
    pub export: ExportSettings,
    pub history: HistoryConfig,
    pub migration: MigrationSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DB),
            export: ExportSettings::default(),
            history: HistoryConfig::default(),
            migration: MigrationSettings::default(),
        }
    }
}

impl Config {
    /// Load a config file; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) if text.trim().is_empty() => Ok(Self::default()),
            Ok(text) => {
                let config: Self = serde_yaml::from_str(&text)?;
                config.validate()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.database.as_os_str().is_empty() {
            return Err(PermsyncError::Config("database cannot be empty".into()));
        }
        if self.history.enabled && self.history.max_count == 0 {
            return Err(PermsyncError::Config(
                "history.max_count must be at least 1".into(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn export_options(&self) -> ExportOptions {
        ExportOptions {
            include_default_roles: self.export.include_default_roles,
        }
    }

    #[must_use]
    pub fn migration_options(&self) -> MigrationOptions {
        MigrationOptions {
            scheme_seeds: self.migration.default_schemes.clone(),
        }
    }
}

/// A discovered `.permsync/` directory and its config.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub dir: PathBuf,
    pub config: Config,
}

impl Workspace {
    /// Load the workspace rooted at `dir` (the `.permsync` directory itself).
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` if `dir` does not exist, or a config error.
    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(PermsyncError::NotInitialized);
        }
        let dir = dunce::canonicalize(dir)?;
        let config = Config::load(&dir.join(CONFIG_FILE))?;
        Ok(Self { dir, config })
    }

    /// Find the nearest `.permsync` directory at or above `start`.
    ///
    /// # Errors
    ///
    /// Returns `NotInitialized` if no ancestor has one.
    pub fn discover(start: &Path) -> Result<Self> {
        let start = dunce::canonicalize(start)?;
        start
            .ancestors()
            .map(|dir| dir.join(WORKSPACE_DIR))
            .find(|candidate| candidate.is_dir())
            .map_or(Err(PermsyncError::NotInitialized), |dir| Self::load(&dir))
    }

    /// Database path from the config, relative to the workspace directory.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.dir.join(&self.config.database)
    }

    #[must_use]
    pub fn export_path(&self) -> PathBuf {
        self.dir.join(EXPORT_FILE)
    }

    #[must_use]
    pub fn history_dir(&self) -> PathBuf {
        self.dir.join(HISTORY_DIR)
    }
}

/// Where the current command reads and writes.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub workspace: Option<Workspace>,
    pub db_path: PathBuf,
}

impl Resolved {
    #[must_use]
    pub fn config(&self) -> Config {
        self.workspace
            .as_ref()
            .map_or_else(Config::default, |ws| ws.config.clone())
    }
}

/// Resolve the workspace and database path.
///
/// Precedence for the database: `cli_db`, then `env_db`, then the workspace
/// config. A workspace is required only when neither override is given.
///
/// # Errors
///
/// Returns `NotInitialized` when no database can be located.
pub fn resolve(
    cwd: &Path,
    cli_db: Option<&Path>,
    env_dir: Option<PathBuf>,
    env_db: Option<PathBuf>,
) -> Result<Resolved> {
    let workspace = match env_dir {
        Some(dir) => Some(Workspace::load(&dir)?),
        None => match Workspace::discover(cwd) {
            Ok(ws) => Some(ws),
            Err(PermsyncError::NotInitialized) => None,
            Err(e) => return Err(e),
        },
    };

    let db_path = match (cli_db, env_db, &workspace) {
        (Some(path), _, _) => path.to_path_buf(),
        (None, Some(path), _) => path,
        (None, None, Some(ws)) => ws.db_path(),
        (None, None, None) => return Err(PermsyncError::NotInitialized),
    };
    tracing::debug!("Using database {}", db_path.display());

    Ok(Resolved { workspace, db_path })
}

/// Resolve from the process environment.
///
/// # Errors
///
/// See [`resolve`].
pub fn resolve_from_env(cli_db: Option<&Path>) -> Result<Resolved> {
    let cwd = std::env::current_dir()?;
    let env_path = |key: &str| {
        std::env::var_os(key)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    };
    resolve(&cwd, cli_db, env_path(DIR_ENV), env_path(DB_ENV))
}

/// Open the database for the current command.
///
/// # Errors
///
/// Returns an error if resolution fails or the database cannot be opened.
pub fn open_storage(cli_db: Option<&Path>) -> Result<(Resolved, SqliteStorage)> {
    let resolved = resolve_from_env(cli_db)?;
    let storage = SqliteStorage::open(&resolved.db_path)?;
    Ok((resolved, storage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use permsync_lib::SchemeScope;
    use tempfile::TempDir;

    fn workspace_in(root: &Path, config: &str) -> PathBuf {
        let dir = root.join(WORKSPACE_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(CONFIG_FILE), config).unwrap();
        dir
    }

    #[test]
    fn defaults_when_file_missing() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(&temp.path().join("nope.yaml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.migration.default_schemes.len(), 2);
        assert!(config.export_options().include_default_roles);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "export:\n  include_default_roles: false\nmigration:\n  default_schemes:\n    - scope: channel\n      name: house\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert!(!config.export.include_default_roles);
        assert_eq!(config.database, PathBuf::from(DEFAULT_DB));
        assert_eq!(config.history, HistoryConfig::default());
        let seeds = config.migration_options().scheme_seeds;
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].scope, SchemeScope::Channel);
        assert_eq!(seeds[0].name.as_deref(), Some("house"));
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "history: [not, a, map]\n").unwrap();
        assert!(matches!(Config::load(&path), Err(PermsyncError::Yaml(_))));

        fs::write(&path, "history:\n  max_count: 0\n").unwrap();
        assert!(matches!(Config::load(&path), Err(PermsyncError::Config(_))));
    }

    #[test]
    fn discover_walks_up() {
        let temp = TempDir::new().unwrap();
        workspace_in(temp.path(), "database: custom.db\n");
        let nested = temp.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();

        let ws = Workspace::discover(&nested).unwrap();
        assert!(ws.dir.ends_with(WORKSPACE_DIR));
        assert!(ws.db_path().ends_with("custom.db"));
    }

    #[test]
    fn resolve_precedence() {
        let temp = TempDir::new().unwrap();
        workspace_in(temp.path(), "");

        let from_ws = resolve(temp.path(), None, None, None).unwrap();
        assert!(from_ws.db_path.ends_with(DEFAULT_DB));

        let from_env = resolve(temp.path(), None, None, Some("/tmp/env.db".into())).unwrap();
        assert_eq!(from_env.db_path, PathBuf::from("/tmp/env.db"));

        let from_cli = resolve(
            temp.path(),
            Some(Path::new("/tmp/cli.db")),
            None,
            Some("/tmp/env.db".into()),
        )
        .unwrap();
        assert_eq!(from_cli.db_path, PathBuf::from("/tmp/cli.db"));
    }

    #[test]
    fn resolve_without_workspace() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            resolve(temp.path(), None, None, None),
            Err(PermsyncError::NotInitialized)
        ));
        let resolved = resolve(temp.path(), Some(Path::new("x.db")), None, None).unwrap();
        assert!(resolved.workspace.is_none());
        assert_eq!(resolved.config(), Config::default());
    }
}
