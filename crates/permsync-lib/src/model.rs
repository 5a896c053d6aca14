//! Core data types for permsync-lib.
//!
//! Same serde format as the `permsync` binary so export files and
//! snapshots are interchangeable between the two store backends.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::PermsError;

/// Context a scheme applies to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
    Default,
)]
#[serde(rename_all = "snake_case")]
pub enum SchemeScope {
    Team,
    Channel,
    #[default]
    #[serde(rename = "")]
    Unspecified,
}

impl SchemeScope {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Team => "team",
            Self::Channel => "channel",
            Self::Unspecified => "",
        }
    }

    /// Role slots a scheme of this scope must fill.
    ///
    /// A team scheme also carries the channel defaults used inside the team.
    #[must_use]
    pub const fn slots(&self) -> &'static [RoleSlot] {
        match self {
            Self::Team => &RoleSlot::ALL,
            Self::Channel => &RoleSlot::CHANNEL,
            Self::Unspecified => &[],
        }
    }

    #[must_use]
    pub fn covers(&self, slot: RoleSlot) -> bool {
        self.slots().contains(&slot)
    }
}

impl fmt::Display for SchemeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchemeScope {
    type Err = PermsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "team" => Ok(Self::Team),
            "channel" => Ok(Self::Channel),
            "" => Ok(Self::Unspecified),
            other => Err(PermsError::InvalidScope {
                scope: other.to_string(),
            }),
        }
    }
}

/// One of the six default-role assignments a scheme can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoleSlot {
    TeamAdmin,
    TeamUser,
    TeamGuest,
    ChannelAdmin,
    ChannelUser,
    ChannelGuest,
}

impl RoleSlot {
    pub const ALL: [Self; 6] = [
        Self::TeamAdmin,
        Self::TeamUser,
        Self::TeamGuest,
        Self::ChannelAdmin,
        Self::ChannelUser,
        Self::ChannelGuest,
    ];

    pub const CHANNEL: [Self; 3] = [Self::ChannelAdmin, Self::ChannelUser, Self::ChannelGuest];

    /// Name of the built-in role whose permissions seed this slot.
    #[must_use]
    pub const fn builtin_role(&self) -> &'static str {
        match self {
            Self::TeamAdmin => crate::defaults::TEAM_ADMIN,
            Self::TeamUser => crate::defaults::TEAM_USER,
            Self::TeamGuest => crate::defaults::TEAM_GUEST,
            Self::ChannelAdmin => crate::defaults::CHANNEL_ADMIN,
            Self::ChannelUser => crate::defaults::CHANNEL_USER,
            Self::ChannelGuest => crate::defaults::CHANNEL_GUEST,
        }
    }

    /// Export field carrying this slot.
    #[must_use]
    pub const fn field_name(&self) -> &'static str {
        match self {
            Self::TeamAdmin => "default_team_admin_role",
            Self::TeamUser => "default_team_user_role",
            Self::TeamGuest => "default_team_guest_role",
            Self::ChannelAdmin => "default_channel_admin_role",
            Self::ChannelUser => "default_channel_user_role",
            Self::ChannelGuest => "default_channel_guest_role",
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::TeamAdmin => "Team Admin",
            Self::TeamUser => "Team User",
            Self::TeamGuest => "Team Guest",
            Self::ChannelAdmin => "Channel Admin",
            Self::ChannelUser => "Channel User",
            Self::ChannelGuest => "Channel Guest",
        }
    }
}

impl fmt::Display for RoleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A named bundle of default role assignments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Scheme {
    /// Store-assigned id (empty until saved).
    #[serde(default)]
    pub id: String,

    /// Unique machine name.
    pub name: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub scope: SchemeScope,

    #[serde(default)]
    pub default_team_admin_role: String,
    #[serde(default)]
    pub default_team_user_role: String,
    #[serde(default)]
    pub default_team_guest_role: String,
    #[serde(default)]
    pub default_channel_admin_role: String,
    #[serde(default)]
    pub default_channel_user_role: String,
    #[serde(default)]
    pub default_channel_guest_role: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Scheme {
    /// Role name assigned to `slot`, empty when unset.
    #[must_use]
    pub fn role(&self, slot: RoleSlot) -> &str {
        match slot {
            RoleSlot::TeamAdmin => &self.default_team_admin_role,
            RoleSlot::TeamUser => &self.default_team_user_role,
            RoleSlot::TeamGuest => &self.default_team_guest_role,
            RoleSlot::ChannelAdmin => &self.default_channel_admin_role,
            RoleSlot::ChannelUser => &self.default_channel_user_role,
            RoleSlot::ChannelGuest => &self.default_channel_guest_role,
        }
    }

    pub fn set_role(&mut self, slot: RoleSlot, name: impl Into<String>) {
        let name = name.into();
        match slot {
            RoleSlot::TeamAdmin => self.default_team_admin_role = name,
            RoleSlot::TeamUser => self.default_team_user_role = name,
            RoleSlot::TeamGuest => self.default_team_guest_role = name,
            RoleSlot::ChannelAdmin => self.default_channel_admin_role = name,
            RoleSlot::ChannelUser => self.default_channel_user_role = name,
            RoleSlot::ChannelGuest => self.default_channel_guest_role = name,
        }
    }

    /// Non-empty role references, in slot order.
    #[must_use]
    pub fn role_names(&self) -> Vec<&str> {
        RoleSlot::ALL
            .iter()
            .map(|slot| self.role(*slot))
            .filter(|name| !name.is_empty())
            .collect()
    }

    pub fn clear_roles(&mut self) {
        for slot in RoleSlot::ALL {
            self.set_role(slot, "");
        }
    }
}

/// A named set of permission identifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Role {
    #[serde(default)]
    pub id: String,

    /// Unique name, referenced by schemes.
    pub name: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub permissions: BTreeSet<String>,

    /// Created by a scheme and deleted together with it.
    #[serde(default)]
    pub scheme_managed: bool,

    /// One of the well-known default roles.
    #[serde(default)]
    pub built_in: bool,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Role {
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// Add permissions, returning how many were new.
    pub fn grant<'a>(&mut self, permissions: impl IntoIterator<Item = &'a str>) -> usize {
        let mut added = 0;
        for permission in permissions {
            if self.permissions.insert(permission.to_string()) {
                added += 1;
            }
        }
        added
    }
}

/// Durable key-value marker for one-time operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SystemFlag {
    pub name: String,
    pub value: String,
}

impl SystemFlag {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Typed view of a migration's completion flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationState {
    Pending,
    Completed,
}

impl MigrationState {
    pub const COMPLETED_VALUE: &'static str = "true";

    /// Only the exact value `"true"` counts as completed.
    #[must_use]
    pub fn from_flag(flag: Option<&SystemFlag>) -> Self {
        match flag {
            Some(flag) if flag.value == Self::COMPLETED_VALUE => Self::Completed,
            _ => Self::Pending,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Export records
// ============================================================================

/// Name of the trailing export record that carries the built-in roles.
pub const DEFAULT_RECORD_NAME: &str = "default";

/// Role definition embedded in an export record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct RoleRecord {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: BTreeSet<String>,
}

impl From<&Role> for RoleRecord {
    fn from(role: &Role) -> Self {
        Self {
            name: role.name.clone(),
            display_name: role.display_name.clone(),
            description: role.description.clone(),
            permissions: role.permissions.clone(),
        }
    }
}

/// One line of the export stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema, Default)]
pub struct SchemeRecord {
    #[serde(default)]
    pub display_name: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub scope: SchemeScope,
    #[serde(default)]
    pub default_team_admin_role: String,
    #[serde(default)]
    pub default_team_user_role: String,
    #[serde(default)]
    pub default_team_guest_role: String,
    #[serde(default)]
    pub default_channel_admin_role: String,
    #[serde(default)]
    pub default_channel_user_role: String,
    #[serde(default)]
    pub default_channel_guest_role: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<RoleRecord>,
}

impl SchemeRecord {
    /// True for the trailing built-in roles record.
    #[must_use]
    pub fn is_default_roles(&self) -> bool {
        self.name == DEFAULT_RECORD_NAME
    }

    /// Build a record from a scheme and the roles it references.
    #[must_use]
    pub fn from_scheme(scheme: &Scheme, roles: &[Role]) -> Self {
        Self {
            display_name: scheme.display_name.clone(),
            name: scheme.name.clone(),
            description: scheme.description.clone(),
            scope: scheme.scope,
            default_team_admin_role: scheme.default_team_admin_role.clone(),
            default_team_user_role: scheme.default_team_user_role.clone(),
            default_team_guest_role: scheme.default_team_guest_role.clone(),
            default_channel_admin_role: scheme.default_channel_admin_role.clone(),
            default_channel_user_role: scheme.default_channel_user_role.clone(),
            default_channel_guest_role: scheme.default_channel_guest_role.clone(),
            roles: roles.iter().map(RoleRecord::from).collect(),
        }
    }

    /// Record name of the role for `slot`, empty when unset.
    #[must_use]
    pub fn role(&self, slot: RoleSlot) -> &str {
        match slot {
            RoleSlot::TeamAdmin => &self.default_team_admin_role,
            RoleSlot::TeamUser => &self.default_team_user_role,
            RoleSlot::TeamGuest => &self.default_team_guest_role,
            RoleSlot::ChannelAdmin => &self.default_channel_admin_role,
            RoleSlot::ChannelUser => &self.default_channel_user_role,
            RoleSlot::ChannelGuest => &self.default_channel_guest_role,
        }
    }

    #[must_use]
    pub fn find_role(&self, name: &str) -> Option<&RoleRecord> {
        self.roles.iter().find(|role| role.name == name)
    }

    /// The scheme to create for this record.
    ///
    /// Role references are left empty: creation generates fresh roles.
    #[must_use]
    pub fn to_scheme(&self) -> Scheme {
        Scheme {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            description: self.description.clone(),
            scope: self.scope,
            ..Scheme::default()
        }
    }
}
