//! Reset command implementation.

use std::path::Path;

use permsync_lib::migration::reset_permissions_system;

use crate::cli::commands::migrate::print_report;
use crate::config;
use crate::error::Result;
use crate::output::OutputContext;

/// Execute the reset command.
///
/// Built-in roles get their default permissions back and the role
/// migrations run again. Schemes are left alone.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or a migration fails.
pub fn execute(db: Option<&Path>, ctx: &OutputContext) -> Result<()> {
    let (_, mut storage) = config::open_storage(db)?;
    let report = reset_permissions_system(&mut storage)?;
    if !ctx.is_json() {
        ctx.line("Permissions system reset to defaults.");
    }
    print_report(&report, ctx)
}
