//! Import command implementation.

use std::io;
use std::path::{Path, PathBuf};

use permsync_lib::migration::run_migrations;
use permsync_lib::permissions::ImportSummary;

use crate::cli::ImportArgs;
use crate::config::{self, Resolved};
use crate::error::{PermsyncError, Result};
use crate::output::OutputContext;
use crate::sync;

fn source_path(args: &ImportArgs, resolved: &Resolved) -> Result<Option<PathBuf>> {
    if args.workspace_file {
        let workspace = resolved
            .workspace
            .as_ref()
            .ok_or(PermsyncError::NotInitialized)?;
        return Ok(Some(workspace.export_path()));
    }
    Ok(args.input.clone().filter(|path| path.as_os_str() != "-"))
}

/// Execute the import command.
///
/// Pending migrations run first so scheme creation is unlocked.
///
/// # Errors
///
/// Returns an error if a migration or the import fails. Schemes created by
/// a failed import are removed again.
pub fn execute(args: &ImportArgs, db: Option<&Path>, ctx: &OutputContext) -> Result<()> {
    let (resolved, mut storage) = config::open_storage(db)?;
    let report = run_migrations(&mut storage, &resolved.config().migration_options())?;
    if !report.applied.is_empty() {
        tracing::info!(applied = report.applied.len(), "Ran pending migrations before import");
    }

    let summary = match source_path(args, &resolved)? {
        Some(path) => sync::import_from_file(&mut storage, &path)?,
        None => sync::import_from_reader(&mut storage, io::stdin().lock())?,
    };

    if ctx.is_json() {
        ctx.json(&summary)?;
    } else {
        ctx.line(describe(&summary));
        for name in &summary.skipped {
            ctx.line(format!("  skipped {name} (already exists)"));
        }
    }
    Ok(())
}

fn describe(summary: &ImportSummary) -> String {
    format!(
        "Imported {} scheme(s), skipped {}, updated {} built-in role(s)",
        summary.created.len(),
        summary.skipped.len(),
        summary.default_roles_updated
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_line() {
        let summary = ImportSummary {
            created: vec!["a".into(), "b".into()],
            skipped: vec!["c".into()],
            default_roles_updated: 0,
        };
        assert_eq!(
            describe(&summary),
            "Imported 2 scheme(s), skipped 1, updated 0 built-in role(s)"
        );
    }
}
