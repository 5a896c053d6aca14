//! Role command implementations.

use std::path::Path;

use permsync_lib::permissions::{get_role_by_name, patch_role};
use permsync_lib::query::RolePatch;
use permsync_lib::{PermissionStore, Role};

use crate::cli::{RolePatchArgs, RoleSubcommand};
use crate::config;
use crate::error::Result;
use crate::format::{RoleDetails, format_role_line, wrap_permissions};
use crate::output::OutputContext;

const PERMISSION_WIDTH: usize = 76;

/// Execute a role subcommand.
///
/// # Errors
///
/// Returns `RoleNotFound` for an unknown name, or a database error.
pub fn execute(command: &RoleSubcommand, db: Option<&Path>, ctx: &OutputContext) -> Result<()> {
    let (_, mut storage) = config::open_storage(db)?;
    match command {
        RoleSubcommand::Show { names } => {
            let roles = names
                .iter()
                .map(|name| get_role_by_name(&storage, name))
                .collect::<permsync_lib::Result<Vec<Role>>>()?;
            show(roles, ctx)
        }
        RoleSubcommand::List => {
            let mut roles = storage.list_roles()?;
            roles.sort_by(|a, b| a.name.cmp(&b.name));
            list(&roles, ctx)
        }
        RoleSubcommand::Patch(args) => {
            let role = patch_role(&mut storage, &args.name, &build_patch(args))?;
            tracing::info!(role = %role.name, "Patched role");
            show(vec![role], ctx)
        }
    }
}

fn build_patch(args: &RolePatchArgs) -> RolePatch {
    RolePatch {
        display_name: args.display_name.clone(),
        description: args.description.clone(),
        permissions: args.permissions.as_ref().map(|list| {
            list.iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .map(ToString::to_string)
                .collect()
        }),
    }
}

fn show(roles: Vec<Role>, ctx: &OutputContext) -> Result<()> {
    if ctx.is_json() {
        let details: Vec<RoleDetails> = roles.into_iter().map(RoleDetails::from).collect();
        ctx.json(&details)?;
        return Ok(());
    }
    for role in &roles {
        ctx.line(format_role_line(role, role.name.len()));
        if !role.display_name.is_empty() {
            ctx.line(format!("  {}", role.display_name));
        }
        if !role.description.is_empty() {
            ctx.line(format!("  {}", role.description));
        }
        for line in wrap_permissions(&role.permissions, PERMISSION_WIDTH) {
            ctx.line(format!("    {line}"));
        }
    }
    Ok(())
}

fn list(roles: &[Role], ctx: &OutputContext) -> Result<()> {
    if ctx.is_json() {
        let details: Vec<RoleDetails> = roles.iter().cloned().map(RoleDetails::from).collect();
        ctx.json(&details)?;
        return Ok(());
    }
    let width = roles.iter().map(|r| r.name.len()).max().unwrap_or(0);
    for role in roles {
        ctx.line(format_role_line(role, width));
    }
    ctx.line(format!("\n{} role(s)", roles.len()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_args_trim_and_drop_blanks() {
        let args = RolePatchArgs {
            name: "custom".into(),
            permissions: Some(vec![" a ".into(), String::new(), "b".into()]),
            ..RolePatchArgs::default()
        };
        let patch = build_patch(&args);
        let permissions: Vec<_> = patch.permissions.unwrap().into_iter().collect();
        assert_eq!(permissions, vec!["a", "b"]);
        assert!(patch.display_name.is_none());
    }
}
