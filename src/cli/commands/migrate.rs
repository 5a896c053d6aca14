//! Migrate command implementation.

use std::path::Path;

use permsync_lib::migration::{
    self, MigrationKey, MigrationReport, clear_migration, run_migration, run_migrations,
};

use crate::cli::MigrateArgs;
use crate::config;
use crate::error::Result;
use crate::format::{MigrationStatusRow, format_state_icon, pad_display};
use crate::output::OutputContext;
use crate::storage::SqliteStorage;

/// Execute the migrate command.
///
/// # Errors
///
/// Returns an error for an unknown `--rerun` key or a failed migration.
/// A failed migration's flag stays pending.
pub fn execute(args: &MigrateArgs, db: Option<&Path>, ctx: &OutputContext) -> Result<()> {
    let (resolved, mut storage) = config::open_storage(db)?;
    if args.status {
        return print_status(&storage, ctx);
    }

    let options = resolved.config().migration_options();
    let report = match args.rerun.as_deref() {
        Some(key) => {
            let key: MigrationKey = key.parse()?;
            clear_migration(&mut storage, key)?;
            run_migration(&mut storage, key, &options)?;
            MigrationReport {
                applied: vec![key],
                skipped: Vec::new(),
            }
        }
        None => run_migrations(&mut storage, &options)?,
    };
    print_report(&report, ctx)
}

pub(crate) fn print_report(report: &MigrationReport, ctx: &OutputContext) -> Result<()> {
    if ctx.is_json() {
        ctx.json(report)?;
        return Ok(());
    }
    if report.applied.is_empty() {
        ctx.line("All migrations already completed.");
    }
    for key in &report.applied {
        ctx.line(format!("Applied {key}"));
    }
    Ok(())
}

fn print_status(storage: &SqliteStorage, ctx: &OutputContext) -> Result<()> {
    let rows: Vec<MigrationStatusRow> = migration::migration_status(storage)?
        .into_iter()
        .map(MigrationStatusRow::from)
        .collect();

    if ctx.is_json() {
        ctx.json(&rows)?;
        return Ok(());
    }
    let width = rows.iter().map(|row| row.key.as_str().len()).max().unwrap_or(0);
    for row in &rows {
        ctx.line(format!(
            "{} {} {}",
            format_state_icon(row.state),
            pad_display(row.key.as_str(), width),
            row.description
        ));
    }
    Ok(())
}
