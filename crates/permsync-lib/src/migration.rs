//! One-time permission migrations gated by system flags.
//!
//! Each migration is keyed by a well-known flag name. A migration runs only
//! while its flag is not `"true"`, and the flag is written only after the
//! migration finished, so a failed run stays Pending and can be retried.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::defaults;
use crate::error::{PermsError, Result};
use crate::model::{MigrationState, Scheme, SchemeScope, SystemFlag};
use crate::permission::{self, Permission};
use crate::permissions::{self, create_scheme_unchecked};
use crate::store::PermissionStore;

/// Well-known migration flags, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MigrationKey {
    /// Seed missing built-in roles.
    #[serde(rename = "AdvancedPermissionsMigrationComplete")]
    AdvancedPermissions,
    /// Grant emoji permissions to system users and admins.
    #[serde(rename = "EmojisPermissionsMigrationComplete")]
    EmojisPermissions,
    /// Grant group mentions to the admin roles and channel users.
    #[serde(rename = "UseGroupMentionsPermissionMigrationComplete")]
    UseGroupMentions,
    /// Seed the default schemes; unlocks scheme creation.
    #[serde(rename = "migration_advanced_permissions_phase_2")]
    DefaultSchemes,
}

impl MigrationKey {
    pub const ALL: [Self; 4] = [
        Self::AdvancedPermissions,
        Self::EmojisPermissions,
        Self::UseGroupMentions,
        Self::DefaultSchemes,
    ];

    /// Migrations that only touch built-in roles.
    pub const ROLE_MIGRATIONS: [Self; 3] = [
        Self::AdvancedPermissions,
        Self::EmojisPermissions,
        Self::UseGroupMentions,
    ];

    /// Flag name stored in the systems table.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AdvancedPermissions => "AdvancedPermissionsMigrationComplete",
            Self::EmojisPermissions => "EmojisPermissionsMigrationComplete",
            Self::UseGroupMentions => "UseGroupMentionsPermissionMigrationComplete",
            Self::DefaultSchemes => "migration_advanced_permissions_phase_2",
        }
    }

    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::AdvancedPermissions => "create missing built-in roles",
            Self::EmojisPermissions => "grant emoji permissions",
            Self::UseGroupMentions => "grant group mentions",
            Self::DefaultSchemes => "seed default schemes",
        }
    }
}

impl fmt::Display for MigrationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationKey {
    type Err = PermsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| PermsError::validation("migration", format!("unknown migration key '{s}'")))
    }
}

/// A default scheme created by the default-scheme migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeSeed {
    pub scope: SchemeScope,
    /// Generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SchemeSeed {
    #[must_use]
    pub const fn scope(scope: SchemeScope) -> Self {
        Self {
            scope,
            name: None,
            display_name: None,
            description: None,
        }
    }

    fn to_scheme(&self) -> Scheme {
        Scheme {
            name: self.name.clone().unwrap_or_default(),
            display_name: self.display_name.clone().unwrap_or_default(),
            description: self.description.clone().unwrap_or_default(),
            scope: self.scope,
            ..Scheme::default()
        }
    }
}

/// Inputs to the migration pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOptions {
    pub scheme_seeds: Vec<SchemeSeed>,
}

impl Default for MigrationOptions {
    /// One team scheme and one channel scheme.
    fn default() -> Self {
        Self {
            scheme_seeds: vec![
                SchemeSeed::scope(SchemeScope::Team),
                SchemeSeed::scope(SchemeScope::Channel),
            ],
        }
    }
}

impl MigrationOptions {
    /// Options that seed no schemes.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            scheme_seeds: Vec::new(),
        }
    }
}

/// Which migrations a run applied and which were already complete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub applied: Vec<MigrationKey>,
    pub skipped: Vec<MigrationKey>,
}

/// State of one migration flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub key: MigrationKey,
    pub state: MigrationState,
}

// ============================================================================
// Flag handling
// ============================================================================

/// Read the typed state of `key`.
///
/// # Errors
///
/// Returns a store error if the flag cannot be read.
pub fn migration_state<S: PermissionStore + ?Sized>(
    store: &S,
    key: MigrationKey,
) -> Result<MigrationState> {
    Ok(MigrationState::from_flag(
        store.get_system(key.as_str())?.as_ref(),
    ))
}

/// State of every migration, in run order.
///
/// # Errors
///
/// Returns a store error if a flag cannot be read.
pub fn migration_status<S: PermissionStore + ?Sized>(store: &S) -> Result<Vec<MigrationStatus>> {
    MigrationKey::ALL
        .into_iter()
        .map(|key| {
            Ok(MigrationStatus {
                key,
                state: migration_state(store, key)?,
            })
        })
        .collect()
}

/// Delete the flag of `key` so the migration runs again.
///
/// Returns whether a flag was present.
///
/// # Errors
///
/// Returns a store error if the flag cannot be deleted.
pub fn clear_migration<S: PermissionStore + ?Sized>(store: &mut S, key: MigrationKey) -> Result<bool> {
    let existed = store.delete_system(key.as_str())?;
    debug!(key = %key, existed, "Cleared migration flag");
    Ok(existed)
}

fn mark_completed<S: PermissionStore + ?Sized>(store: &mut S, key: MigrationKey) -> Result<()> {
    let flag = SystemFlag::new(key.as_str(), MigrationState::COMPLETED_VALUE);
    if store.insert_system(&flag)? {
        return Ok(());
    }
    // The key exists: either another process completed it first, or it holds
    // a stale non-"true" value.
    if migration_state(store, key)?.is_completed() {
        warn!(key = %key, "Migration was completed concurrently");
    } else {
        store.save_system(&flag)?;
    }
    Ok(())
}

// ============================================================================
// Running
// ============================================================================

/// Run every Pending migration in order.
///
/// Stops at the first failure; migrations completed earlier in the run stay
/// Completed and the failed one stays Pending.
///
/// # Errors
///
/// Returns the first migration error.
pub fn run_migrations<S: PermissionStore + ?Sized>(
    store: &mut S,
    options: &MigrationOptions,
) -> Result<MigrationReport> {
    run_keys(store, &MigrationKey::ALL, options)
}

/// Run a single migration if it is Pending.
///
/// Returns whether it was applied.
///
/// # Errors
///
/// Returns the migration error; the flag stays Pending.
pub fn run_migration<S: PermissionStore + ?Sized>(
    store: &mut S,
    key: MigrationKey,
    options: &MigrationOptions,
) -> Result<bool> {
    let report = run_keys(store, &[key], options)?;
    Ok(!report.applied.is_empty())
}

fn run_keys<S: PermissionStore + ?Sized>(
    store: &mut S,
    keys: &[MigrationKey],
    options: &MigrationOptions,
) -> Result<MigrationReport> {
    let mut report = MigrationReport::default();
    for &key in keys {
        if migration_state(store, key)?.is_completed() {
            debug!(key = %key, "Migration already completed");
            report.skipped.push(key);
            continue;
        }

        apply(store, key, options)?;
        mark_completed(store, key)?;
        info!(key = %key, "Applied migration: {}", key.description());
        report.applied.push(key);
    }
    Ok(report)
}

fn apply<S: PermissionStore + ?Sized>(
    store: &mut S,
    key: MigrationKey,
    options: &MigrationOptions,
) -> Result<()> {
    match key {
        MigrationKey::AdvancedPermissions => seed_builtin_roles(store),
        MigrationKey::EmojisPermissions => {
            let emojis = [permission::CREATE_EMOJIS, permission::DELETE_EMOJIS];
            grant(store, defaults::SYSTEM_USER, &emojis)?;
            grant(
                store,
                defaults::SYSTEM_ADMIN,
                &[
                    permission::CREATE_EMOJIS,
                    permission::DELETE_EMOJIS,
                    permission::DELETE_OTHERS_EMOJIS,
                ],
            )
        }
        MigrationKey::UseGroupMentions => {
            for role in [
                defaults::SYSTEM_ADMIN,
                defaults::TEAM_ADMIN,
                defaults::CHANNEL_ADMIN,
                defaults::CHANNEL_USER,
            ] {
                grant(store, role, &[permission::USE_GROUP_MENTIONS])?;
            }
            Ok(())
        }
        MigrationKey::DefaultSchemes => seed_schemes(store, &options.scheme_seeds),
    }
}

fn seed_builtin_roles<S: PermissionStore + ?Sized>(store: &mut S) -> Result<()> {
    for role in defaults::default_roles() {
        match store.get_role_by_name(&role.name) {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                store.save_role(&role)?;
                debug!(role = %role.name, "Created built-in role");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

fn grant<S: PermissionStore + ?Sized>(
    store: &mut S,
    role_name: &str,
    grants: &[Permission],
) -> Result<()> {
    let mut role = store.get_role_by_name(role_name)?;
    let added = role.grant(grants.iter().map(|p| p.id));
    if added > 0 {
        store.update_role(&role)?;
        debug!(role = %role_name, added, "Granted permissions");
    }
    Ok(())
}

/// Create one scheme per seed; on failure every scheme seeded so far is
/// removed again.
fn seed_schemes<S: PermissionStore + ?Sized>(store: &mut S, seeds: &[SchemeSeed]) -> Result<()> {
    let mut created: Vec<String> = Vec::new();
    for seed in seeds {
        if let Some(name) = seed.name.as_deref() {
            if store.get_scheme_by_name(name).is_ok() {
                debug!(scheme = %name, "Seed scheme exists, skipping");
                continue;
            }
        }

        match create_scheme_unchecked(store, &seed.to_scheme()) {
            Ok(scheme) => {
                info!(scheme = %scheme.name, scope = %scheme.scope, "Seeded default scheme");
                created.push(scheme.id);
            }
            Err(e) => {
                for id in created.iter().rev() {
                    if let Err(cleanup) = permissions::delete_scheme(store, id) {
                        warn!(scheme_id = %id, error = %cleanup, "Could not remove seeded scheme");
                    }
                }
                return Err(e);
            }
        }
    }
    Ok(())
}

// ============================================================================
// Reset
// ============================================================================

/// Restore the built-in roles to their defaults and re-run the role migrations.
///
/// Missing built-in roles are recreated. Schemes, their roles and the
/// default-scheme flag are not touched.
///
/// # Errors
///
/// Returns the first store or migration error.
pub fn reset_permissions_system<S: PermissionStore + ?Sized>(store: &mut S) -> Result<MigrationReport> {
    for default in defaults::default_roles() {
        match store.get_role_by_name(&default.name) {
            Ok(mut role) => {
                role.permissions = default.permissions;
                role.built_in = true;
                role.scheme_managed = false;
                store.update_role(&role)?;
            }
            Err(e) if e.is_not_found() => {
                store.save_role(&default)?;
            }
            Err(e) => return Err(e),
        }
    }

    for key in MigrationKey::ROLE_MIGRATIONS {
        clear_migration(store, key)?;
    }
    let report = run_keys(store, &MigrationKey::ROLE_MIGRATIONS, &MigrationOptions::none())?;
    info!(applied = report.applied.len(), "Permissions system reset");
    Ok(report)
}
