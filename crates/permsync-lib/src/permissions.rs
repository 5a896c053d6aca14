//! Scheme service and permission export/import.
//!
//! Every operation here is generic over [`PermissionStore`]; none of them
//! assumes a transaction spanning more than one store call. Multi-step
//! writes record their undo actions in a [`Rollback`] and run it on every
//! error path.

use std::io::{BufRead, Write};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::defaults;
use crate::error::{PermsError, Result};
use crate::jsonl;
use crate::migration::MigrationKey;
use crate::model::{
    DEFAULT_RECORD_NAME, MigrationState, Role, RoleRecord, RoleSlot, Scheme, SchemeRecord,
    SchemeScope,
};
use crate::query::{RolePatch, SchemePage};
use crate::store::PermissionStore;
use crate::util;
use crate::validation::{RoleReferenceValidator, RoleValidator, SchemeValidator};

/// Schemes fetched per store call during export.
pub const EXPORT_PAGE_SIZE: usize = 100;

/// Options for [`export_permissions`].
#[derive(Debug, Clone, Copy)]
pub struct ExportOptions {
    /// Append the trailing `default` record with the built-in roles.
    pub include_default_roles: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_default_roles: true,
        }
    }
}

/// Counts reported by an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Scheme records written, excluding the `default` record.
    pub schemes: usize,
    /// Role definitions embedded across all records.
    pub roles: usize,
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Names of schemes created by this import.
    pub created: Vec<String>,
    /// Names of scheme records skipped because the scheme already existed.
    pub skipped: Vec<String>,
    /// Built-in roles whose permissions were replaced.
    pub default_roles_updated: usize,
}

// ============================================================================
// Rollback
// ============================================================================

/// Undo log for a multi-step write.
///
/// Ids are deleted in reverse order of registration. Cleanup failures are
/// logged; the caller still returns the error that triggered the rollback.
#[derive(Debug, Default)]
struct Rollback {
    roles: Vec<String>,
    schemes: Vec<String>,
}

impl Rollback {
    fn role(&mut self, id: &str) {
        self.roles.push(id.to_string());
    }

    fn scheme(&mut self, id: &str) {
        self.schemes.push(id.to_string());
    }

    fn run<S: PermissionStore + ?Sized>(self, store: &mut S) {
        for id in self.roles.iter().rev() {
            if let Err(e) = store.delete_role(id) {
                warn!(role_id = %id, error = %e, "Rollback could not delete role");
            }
        }
        for id in self.schemes.iter().rev() {
            if let Err(e) = store.delete_scheme(id) {
                warn!(scheme_id = %id, error = %e, "Rollback could not delete scheme");
            }
        }
    }
}

// ============================================================================
// Schemes
// ============================================================================

/// Create a scheme with one scheme-managed role per covered slot.
///
/// Scheme creation is unlocked by the default-scheme migration. Role
/// references on the input are ignored; fresh roles are generated from the
/// built-in role of each slot. A missing name or display name is generated.
///
/// # Errors
///
/// - `MigrationIncomplete` if the default-scheme migration has not completed
/// - `Validation`/`ValidationErrors` for malformed scheme data
/// - `NameTaken` if the scheme name exists
/// - `PartialFailure` if a role could not be created; the scheme and any
///   roles created so far have been deleted
pub fn create_scheme<S: PermissionStore + ?Sized>(store: &mut S, scheme: &Scheme) -> Result<Scheme> {
    let key = MigrationKey::DefaultSchemes;
    let state = MigrationState::from_flag(store.get_system(key.as_str())?.as_ref());
    if !state.is_completed() {
        return Err(PermsError::MigrationIncomplete {
            key: key.as_str().to_string(),
        });
    }
    create_scheme_unchecked(store, scheme)
}

/// [`create_scheme`] without the migration gate, used by the migration itself.
pub(crate) fn create_scheme_unchecked<S: PermissionStore + ?Sized>(
    store: &mut S,
    scheme: &Scheme,
) -> Result<Scheme> {
    let mut scheme = scheme.clone();
    scheme.id.clear();
    scheme.clear_roles();
    if scheme.name.trim().is_empty() {
        let now = Utc::now();
        scheme.name = util::generate_id("scheme-name", scheme.scope.as_str(), now, |candidate| {
            store.get_scheme_by_name(candidate).is_ok()
        });
    }
    if scheme.display_name.trim().is_empty() {
        scheme.display_name = generated_display_name(scheme.scope, &scheme.name);
    }
    SchemeValidator::validate(&scheme).map_err(PermsError::from_validation_errors)?;

    let saved = store.save_scheme(&scheme)?;
    let mut rollback = Rollback::default();
    rollback.scheme(&saved.id);

    match create_scheme_roles(store, saved, &mut rollback) {
        Ok(scheme) => {
            debug!(scheme = %scheme.name, scope = %scheme.scope, "Created scheme");
            Ok(scheme)
        }
        Err(source) => {
            rollback.run(store);
            Err(PermsError::PartialFailure {
                scheme: scheme.name,
                source: Box::new(source),
            })
        }
    }
}

fn generated_display_name(scope: SchemeScope, name: &str) -> String {
    let scope = match scope {
        SchemeScope::Team => "Team",
        SchemeScope::Channel => "Channel",
        SchemeScope::Unspecified => "Unscoped",
    };
    format!("{scope} Scheme {name}")
}

fn create_scheme_roles<S: PermissionStore + ?Sized>(
    store: &mut S,
    mut scheme: Scheme,
    rollback: &mut Rollback,
) -> Result<Scheme> {
    for slot in scheme.scope.slots() {
        let role = scheme_role(&scheme, *slot)?;
        let saved = store.save_role(&role)?;
        rollback.role(&saved.id);
        scheme.set_role(*slot, saved.name);
    }
    RoleReferenceValidator::validate(&scheme, &*store)?;
    store.update_scheme(&scheme)
}

fn scheme_role(scheme: &Scheme, slot: RoleSlot) -> Result<Role> {
    let permissions = defaults::permissions_for(slot.builtin_role())
        .ok_or_else(|| PermsError::role_not_found(slot.builtin_role()))?;
    let now = Utc::now();
    Ok(Role {
        id: String::new(),
        name: util::new_id("role"),
        display_name: format!("{} Role for Scheme {}", slot.label(), scheme.name),
        description: format!("{} role created by scheme {}", slot.label(), scheme.name),
        permissions,
        scheme_managed: true,
        built_in: false,
        created_at: now,
        updated_at: now,
    })
}

/// Delete a scheme together with its scheme-managed roles.
///
/// Referenced roles that are not scheme-managed are left alone. The scheme
/// row goes first so a scheme never outlives its roles; a role that cannot
/// be deleted afterwards is logged and left as an orphan.
///
/// # Errors
///
/// Returns `SchemeNotFound` for an unknown id, or any store error raised
/// before the scheme row was deleted.
pub fn delete_scheme<S: PermissionStore + ?Sized>(store: &mut S, id: &str) -> Result<Scheme> {
    let scheme = store.get_scheme(id)?;
    let mut managed = Vec::new();
    for name in scheme.role_names() {
        match store.get_role_by_name(name) {
            Ok(role) if role.scheme_managed => managed.push(role.id),
            Ok(_) => debug!(role = %name, "Keeping shared role"),
            Err(e) if e.is_not_found() => {
                warn!(scheme = %scheme.name, role = %name, "Scheme references a missing role");
            }
            Err(e) => return Err(e),
        }
    }

    store.delete_scheme(&scheme.id)?;
    for role_id in &managed {
        if let Err(e) = store.delete_role(role_id) {
            warn!(scheme = %scheme.name, role_id = %role_id, error = %e, "Could not delete scheme role");
        }
    }
    debug!(scheme = %scheme.name, "Deleted scheme");
    Ok(scheme)
}

/// One page of schemes, newest first.
///
/// # Errors
///
/// Returns a store error if the listing fails.
pub fn get_schemes<S: PermissionStore + ?Sized>(store: &S, page: &SchemePage) -> Result<Vec<Scheme>> {
    store.list_schemes(page.scope, page.offset(), page.limit())
}

// ============================================================================
// Roles
// ============================================================================

/// Fetch a role by its unique name.
///
/// # Errors
///
/// Returns `RoleNotFound` if no role carries `name`.
pub fn get_role_by_name<S: PermissionStore + ?Sized>(store: &S, name: &str) -> Result<Role> {
    store.get_role_by_name(name)
}

/// Fetch the named roles; unknown names are omitted.
///
/// # Errors
///
/// Returns a store error if the lookup fails.
pub fn get_roles_by_names<S: PermissionStore + ?Sized>(
    store: &S,
    names: &[String],
) -> Result<Vec<Role>> {
    store.get_roles_by_names(names)
}

/// Apply `patch` to the role named `name`.
///
/// # Errors
///
/// Returns `RoleNotFound` for an unknown name, or a validation error if the
/// patched role is malformed.
pub fn patch_role<S: PermissionStore + ?Sized>(
    store: &mut S,
    name: &str,
    patch: &RolePatch,
) -> Result<Role> {
    let mut role = store.get_role_by_name(name)?;
    if patch.is_empty() {
        return Ok(role);
    }
    patch.apply(&mut role);
    RoleValidator::validate(&role).map_err(PermsError::from_validation_errors)?;
    store.update_role(&role)
}

// ============================================================================
// Export
// ============================================================================

/// Write every scheme as one JSONL record, followed by the `default` record.
///
/// Output already written to `writer` is not retracted on error.
///
/// # Errors
///
/// Returns `RoleNotFound` if a scheme references a missing role, or the
/// first store, serialization or I/O error.
pub fn export_permissions<S, W>(
    store: &S,
    writer: &mut W,
    options: &ExportOptions,
) -> Result<ExportSummary>
where
    S: PermissionStore + ?Sized,
    W: Write + ?Sized,
{
    let mut summary = ExportSummary::default();
    let mut offset = 0;

    loop {
        let page = store.list_schemes(None, offset, EXPORT_PAGE_SIZE)?;
        if page.is_empty() {
            break;
        }
        offset += page.len();

        for scheme in &page {
            let roles = scheme
                .role_names()
                .into_iter()
                .map(|name| store.get_role_by_name(name))
                .collect::<Result<Vec<_>>>()?;
            jsonl::write_record(writer, &SchemeRecord::from_scheme(scheme, &roles))?;
            debug!(scheme = %scheme.name, roles = roles.len(), "Exported scheme");
            summary.schemes += 1;
            summary.roles += roles.len();
        }
    }

    if options.include_default_roles {
        let names: Vec<String> = defaults::BUILTIN_ROLE_NAMES
            .iter()
            .map(ToString::to_string)
            .collect();
        let roles = store.get_roles_by_names(&names)?;
        let record = SchemeRecord {
            name: DEFAULT_RECORD_NAME.to_string(),
            roles: roles.iter().map(RoleRecord::from).collect(),
            ..SchemeRecord::default()
        };
        jsonl::write_record(writer, &record)?;
        summary.roles += roles.len();
    }

    writer.flush()?;
    info!(schemes = summary.schemes, roles = summary.roles, "Export complete");
    Ok(summary)
}

// ============================================================================
// Import
// ============================================================================

/// Import an export stream.
///
/// Existing schemes are skipped by name, so importing the same stream twice
/// creates nothing the second time. If any record fails, every scheme this
/// call created is deleted before the error is returned. Built-in role
/// updates from the `default` record are not undone.
///
/// # Errors
///
/// - `JsonlParse` for a malformed line
/// - `MigrationIncomplete` if scheme creation is still locked
/// - `Validation` if a record references a role it does not define
/// - any error from scheme creation or the store
pub fn import_permissions<S, R>(store: &mut S, reader: R) -> Result<ImportSummary>
where
    S: PermissionStore + ?Sized,
    R: BufRead,
{
    let mut summary = ImportSummary::default();
    let mut created_ids = Vec::new();

    if let Err(e) = import_records(store, reader, &mut summary, &mut created_ids) {
        for id in created_ids.iter().rev() {
            if let Err(cleanup) = delete_scheme(store, id) {
                warn!(scheme_id = %id, error = %cleanup, "Could not remove imported scheme");
            }
        }
        return Err(e);
    }

    info!(
        created = summary.created.len(),
        skipped = summary.skipped.len(),
        default_roles = summary.default_roles_updated,
        "Import complete"
    );
    Ok(summary)
}

fn import_records<S, R>(
    store: &mut S,
    reader: R,
    summary: &mut ImportSummary,
    created_ids: &mut Vec<String>,
) -> Result<()>
where
    S: PermissionStore + ?Sized,
    R: BufRead,
{
    for item in jsonl::read_records(reader) {
        let (line, record) = item?;

        if record.is_default_roles() {
            summary.default_roles_updated += import_default_roles(store, &record)?;
            continue;
        }

        // Generated names would make every re-import a new scheme.
        if record.name.trim().is_empty() {
            return Err(PermsError::validation(
                "name",
                format!("line {line}: scheme records must carry a name"),
            ));
        }

        match store.get_scheme_by_name(&record.name) {
            Ok(_) => {
                debug!(line, scheme = %record.name, "Scheme exists, skipping");
                summary.skipped.push(record.name);
                continue;
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let role_defs = record_role_definitions(&record)?;
        let created = create_scheme(store, &record.to_scheme())?;
        created_ids.push(created.id.clone());

        for (slot, def) in role_defs {
            let mut role = store.get_role_by_name(created.role(slot))?;
            role.display_name.clone_from(&def.display_name);
            role.description.clone_from(&def.description);
            role.permissions.clone_from(&def.permissions);
            RoleValidator::validate(&role).map_err(PermsError::from_validation_errors)?;
            store.update_role(&role)?;
        }

        debug!(line, scheme = %created.name, "Imported scheme");
        summary.created.push(created.name);
    }
    Ok(())
}

/// Role definitions for each covered slot the record fills in.
fn record_role_definitions(record: &SchemeRecord) -> Result<Vec<(RoleSlot, &RoleRecord)>> {
    let mut defs = Vec::new();
    for slot in record.scope.slots() {
        let name = record.role(*slot);
        if name.is_empty() {
            continue;
        }
        let def = record.find_role(name).ok_or_else(|| {
            PermsError::validation(
                slot.field_name(),
                format!("scheme '{}' does not define role '{name}'", record.name),
            )
        })?;
        defs.push((*slot, def));
    }
    Ok(defs)
}

fn import_default_roles<S: PermissionStore + ?Sized>(
    store: &mut S,
    record: &SchemeRecord,
) -> Result<usize> {
    let mut updated = 0;
    for def in &record.roles {
        let mut role = match store.get_role_by_name(&def.name) {
            Ok(role) => role,
            Err(e) if e.is_not_found() => {
                warn!(role = %def.name, "Default record names an unknown role, skipping");
                continue;
            }
            Err(e) => return Err(e),
        };
        if role.permissions == def.permissions {
            continue;
        }
        role.permissions.clone_from(&def.permissions);
        RoleValidator::validate(&role).map_err(PermsError::from_validation_errors)?;
        store.update_role(&role)?;
        updated += 1;
    }
    Ok(updated)
}
