//! Init command implementation.

use std::fs;
use std::path::Path;

use permsync_lib::migration::run_migrations;
use serde::Serialize;

use crate::cli::InitArgs;
use crate::config::{self, CONFIG_FILE, Config, WORKSPACE_DIR};
use crate::error::{PermsyncError, Result};
use crate::output::OutputContext;
use crate::storage::SqliteStorage;

const GITIGNORE: &str = r"# Database
*.db
*.db-shm
*.db-wal

# Export backups
.history/
";

#[derive(Serialize)]
struct InitOutput<'a> {
    workspace: &'a Path,
    database: &'a Path,
    migrations_applied: usize,
}

/// Execute the init command in the current directory.
///
/// # Errors
///
/// Returns an error if the directory or database cannot be created.
pub fn execute(args: &InitArgs, ctx: &OutputContext) -> Result<()> {
    let cwd = std::env::current_dir()?;
    init_at(&cwd.join(WORKSPACE_DIR), args.force, ctx)
}

fn init_at(dir: &Path, force: bool, ctx: &OutputContext) -> Result<()> {
    let config_path = dir.join(CONFIG_FILE);
    let config = Config::load(&config_path)?;
    let db_path = dir.join(&config.database);

    if db_path.exists() && !force {
        return Err(PermsyncError::AlreadyInitialized { path: db_path });
    }
    fs::create_dir_all(dir)?;

    if !config_path.exists() || force {
        let body = serde_yaml::to_string(&config)?;
        fs::write(&config_path, format!("# permsync workspace configuration\n{body}"))?;
    }

    let gitignore_path = dir.join(".gitignore");
    if !gitignore_path.exists() {
        fs::write(gitignore_path, GITIGNORE)?;
    }

    let mut storage = SqliteStorage::open(&db_path)?;
    let report = run_migrations(&mut storage, &config.migration_options())?;
    tracing::info!(path = %dir.display(), "Initialized workspace");

    if ctx.is_json() {
        ctx.json(&InitOutput {
            workspace: dir,
            database: &db_path,
            migrations_applied: report.applied.len(),
        })?;
    } else {
        ctx.line(format!(
            "Initialized permsync workspace in {}/ ({} migration(s) applied)",
            WORKSPACE_DIR,
            report.applied.len()
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use permsync_lib::PermissionStore;
    use tempfile::TempDir;

    #[test]
    fn init_creates_workspace_and_migrates() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(WORKSPACE_DIR);
        let ctx = OutputContext::from_flags(false, true);

        init_at(&dir, false, &ctx).unwrap();
        assert!(dir.join(CONFIG_FILE).is_file());
        assert!(dir.join(".gitignore").is_file());

        let ws = config::Workspace::load(&dir).unwrap();
        assert_eq!(ws.config, Config::default());
        let storage = SqliteStorage::open(&ws.db_path()).unwrap();
        assert_eq!(storage.count_schemes(None).unwrap(), 2);
    }

    #[test]
    fn second_init_needs_force() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(WORKSPACE_DIR);
        let ctx = OutputContext::from_flags(false, true);

        init_at(&dir, false, &ctx).unwrap();
        assert!(matches!(
            init_at(&dir, false, &ctx),
            Err(PermsyncError::AlreadyInitialized { .. })
        ));

        init_at(&dir, true, &ctx).unwrap();
        let storage = SqliteStorage::open(&dir.join(config::DEFAULT_DB)).unwrap();
        assert_eq!(storage.count_schemes(None).unwrap(), 2);
    }
}
