//! Scheme command implementations.

use std::path::Path;

use permsync_lib::permissions::{create_scheme, delete_scheme, get_schemes};
use permsync_lib::query::SchemePage;
use permsync_lib::{PermissionStore, Scheme};

use crate::cli::{SchemeCreateArgs, SchemeListArgs, SchemeSubcommand};
use crate::config;
use crate::error::Result;
use crate::format::{SchemeSummary, format_scheme_line};
use crate::output::OutputContext;
use crate::storage::SqliteStorage;

/// Execute a scheme subcommand.
///
/// # Errors
///
/// Returns `MigrationIncomplete` when creating a scheme before the
/// default-scheme migration ran, `SchemeNotFound` for an unknown id, or
/// any store error.
pub fn execute(command: &SchemeSubcommand, db: Option<&Path>, ctx: &OutputContext) -> Result<()> {
    let (_, mut storage) = config::open_storage(db)?;
    match command {
        SchemeSubcommand::List(args) => list(&storage, args, ctx),
        SchemeSubcommand::Create(args) => {
            let created = create_scheme(&mut storage, &scheme_from_args(args))?;
            tracing::info!(scheme = %created.name, "Created scheme");
            print_one(&created, "Created", ctx)
        }
        SchemeSubcommand::Delete { id } => {
            let id = resolve_id(&storage, id)?;
            let deleted = delete_scheme(&mut storage, &id)?;
            print_one(&deleted, "Deleted", ctx)
        }
    }
}

fn scheme_from_args(args: &SchemeCreateArgs) -> Scheme {
    Scheme {
        name: args.name.clone().unwrap_or_default(),
        display_name: args.display_name.clone().unwrap_or_default(),
        description: args.description.clone().unwrap_or_default(),
        scope: args.scope,
        ..Scheme::default()
    }
}

/// Accept either a scheme id or its name.
fn resolve_id(storage: &SqliteStorage, id_or_name: &str) -> Result<String> {
    match storage.get_scheme(id_or_name) {
        Ok(scheme) => Ok(scheme.id),
        Err(e) if e.is_not_found() => Ok(storage.get_scheme_by_name(id_or_name)?.id),
        Err(e) => Err(e.into()),
    }
}

fn list(storage: &SqliteStorage, args: &SchemeListArgs, ctx: &OutputContext) -> Result<()> {
    let page = SchemePage {
        scope: args.scope,
        page: args.page,
        per_page: args.per_page,
    };
    let schemes = get_schemes(storage, &page)?;

    if ctx.is_json() {
        let summaries: Vec<SchemeSummary> = schemes.iter().map(SchemeSummary::from).collect();
        ctx.json(&summaries)?;
    } else if schemes.is_empty() {
        ctx.line("No schemes found.");
    } else {
        let width = schemes.iter().map(|s| s.name.len()).max().unwrap_or(0);
        for scheme in &schemes {
            ctx.line(format_scheme_line(scheme, width));
        }
        ctx.line(format!("\n{} scheme(s)", schemes.len()));
    }
    Ok(())
}

fn print_one(scheme: &Scheme, verb: &str, ctx: &OutputContext) -> Result<()> {
    if ctx.is_json() {
        ctx.json(&SchemeSummary::from(scheme))?;
        return Ok(());
    }
    ctx.line(format!("{verb} {} scheme {} ({})", scheme.scope, scheme.name, scheme.id));
    for role in scheme.role_names() {
        ctx.line(format!("  {role}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use permsync_lib::SchemeScope;
    use permsync_lib::migration::{MigrationOptions, run_migrations};

    #[test]
    fn resolve_by_id_or_name() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        run_migrations(&mut storage, &MigrationOptions::none()).unwrap();
        let args = SchemeCreateArgs {
            scope: SchemeScope::Channel,
            name: Some("house".into()),
            display_name: None,
            description: None,
        };
        let created = create_scheme(&mut storage, &scheme_from_args(&args)).unwrap();

        assert_eq!(resolve_id(&storage, &created.id).unwrap(), created.id);
        assert_eq!(resolve_id(&storage, "house").unwrap(), created.id);
        assert!(resolve_id(&storage, "ghost").is_err());
    }
}
