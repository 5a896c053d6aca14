//! Export command implementation.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use permsync_lib::permissions::ExportOptions;
use serde::Serialize;

use crate::cli::ExportArgs;
use crate::config::{self, Config, Resolved};
use crate::error::{PermsyncError, Result};
use crate::output::OutputContext;
use crate::sync::{self, Backup};

#[derive(Serialize)]
struct ExportOutput<'a> {
    path: &'a Path,
    schemes: usize,
    roles: usize,
}

/// Config defaults, with `--no-default-roles` able to switch the record off.
fn export_options(args: &ExportArgs, settings: &Config) -> ExportOptions {
    let mut options = settings.export_options();
    options.include_default_roles &= !args.no_default_roles;
    options
}

fn target_path(args: &ExportArgs, resolved: &Resolved) -> Result<Option<PathBuf>> {
    if args.workspace_file {
        let workspace = resolved
            .workspace
            .as_ref()
            .ok_or(PermsyncError::NotInitialized)?;
        return Ok(Some(workspace.export_path()));
    }
    Ok(args
        .output
        .clone()
        .filter(|path| path.as_os_str() != "-"))
}

/// Execute the export command.
///
/// Records go to stdout unless a file is given; the summary is only printed
/// for file exports so stdout stays a valid JSONL stream.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the export fails.
pub fn execute(args: &ExportArgs, db: Option<&Path>, ctx: &OutputContext) -> Result<()> {
    let (resolved, storage) = config::open_storage(db)?;
    let settings = resolved.config();
    let options = export_options(args, &settings);

    let Some(path) = target_path(args, &resolved)? else {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        sync::export_to_writer(&storage, &mut lock, &options)?;
        lock.flush()?;
        return Ok(());
    };

    let history_dir = resolved.workspace.as_ref().map(config::Workspace::history_dir);
    let backup = history_dir.as_deref().map(|dir| Backup {
        dir,
        config: &settings.history,
    });
    let summary = sync::export_to_file(&storage, &path, &options, backup)?;

    if ctx.is_json() {
        ctx.json(&ExportOutput {
            path: &path,
            schemes: summary.schemes,
            roles: summary.roles,
        })?;
    } else {
        ctx.line(format!(
            "Exported {} scheme(s) and {} role(s) to {}",
            summary.schemes,
            summary.roles,
            path.display()
        ));
    }
    Ok(())
}
