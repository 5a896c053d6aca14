//! Built-in roles and their default permission sets.

use std::collections::BTreeSet;

use chrono::Utc;

use crate::model::Role;
use crate::permission::{self, Permission};

pub const SYSTEM_ADMIN: &str = "system_admin";
pub const SYSTEM_USER: &str = "system_user";
pub const SYSTEM_GUEST: &str = "system_guest";
pub const TEAM_ADMIN: &str = "team_admin";
pub const TEAM_USER: &str = "team_user";
pub const TEAM_GUEST: &str = "team_guest";
pub const CHANNEL_ADMIN: &str = "channel_admin";
pub const CHANNEL_USER: &str = "channel_user";
pub const CHANNEL_GUEST: &str = "channel_guest";

/// Every built-in role name, system roles first.
pub const BUILTIN_ROLE_NAMES: [&str; 9] = [
    SYSTEM_ADMIN,
    SYSTEM_USER,
    SYSTEM_GUEST,
    TEAM_ADMIN,
    TEAM_USER,
    TEAM_GUEST,
    CHANNEL_ADMIN,
    CHANNEL_USER,
    CHANNEL_GUEST,
];

/// Permissions the system admin role must always carry.
pub const SYSTEM_ADMIN_REQUIRED: [&str; 4] = [
    permission::CREATE_EMOJIS.id,
    permission::DELETE_EMOJIS.id,
    permission::DELETE_OTHERS_EMOJIS.id,
    permission::USE_GROUP_MENTIONS.id,
];

const SYSTEM_USER_PERMISSIONS: &[Permission] = &[
    permission::LIST_PUBLIC_TEAMS,
    permission::JOIN_PUBLIC_TEAMS,
    permission::CREATE_DIRECT_CHANNEL,
    permission::CREATE_GROUP_CHANNEL,
    permission::VIEW_MEMBERS,
    permission::CREATE_TEAM,
    permission::CREATE_EMOJIS,
    permission::DELETE_EMOJIS,
];

const SYSTEM_GUEST_PERMISSIONS: &[Permission] = &[
    permission::CREATE_DIRECT_CHANNEL,
    permission::CREATE_GROUP_CHANNEL,
];

const TEAM_ADMIN_PERMISSIONS: &[Permission] = &[
    permission::EDIT_OTHERS_POSTS,
    permission::REMOVE_USER_FROM_TEAM,
    permission::MANAGE_TEAM,
    permission::IMPORT_TEAM,
    permission::MANAGE_TEAM_ROLES,
    permission::MANAGE_CHANNEL_ROLES,
    permission::MANAGE_INCOMING_WEBHOOKS,
    permission::MANAGE_OUTGOING_WEBHOOKS,
    permission::MANAGE_SLASH_COMMANDS,
    permission::DELETE_POST,
    permission::DELETE_OTHERS_POSTS,
    permission::CONVERT_PUBLIC_CHANNEL_TO_PRIVATE,
    permission::USE_GROUP_MENTIONS,
];

const TEAM_USER_PERMISSIONS: &[Permission] = &[
    permission::LIST_TEAM_CHANNELS,
    permission::JOIN_PUBLIC_CHANNELS,
    permission::READ_PUBLIC_CHANNEL,
    permission::VIEW_TEAM,
    permission::CREATE_PUBLIC_CHANNEL,
    permission::CREATE_PRIVATE_CHANNEL,
    permission::INVITE_USER,
    permission::ADD_USER_TO_TEAM,
];

const TEAM_GUEST_PERMISSIONS: &[Permission] = &[permission::VIEW_TEAM];

const CHANNEL_ADMIN_PERMISSIONS: &[Permission] = &[
    permission::MANAGE_CHANNEL_ROLES,
    permission::USE_GROUP_MENTIONS,
];

const CHANNEL_USER_PERMISSIONS: &[Permission] = &[
    permission::READ_CHANNEL,
    permission::ADD_REACTION,
    permission::REMOVE_REACTION,
    permission::MANAGE_PUBLIC_CHANNEL_MEMBERS,
    permission::MANAGE_PRIVATE_CHANNEL_MEMBERS,
    permission::UPLOAD_FILE,
    permission::GET_PUBLIC_LINK,
    permission::CREATE_POST,
    permission::EDIT_POST,
    permission::DELETE_POST,
    permission::USE_CHANNEL_MENTIONS,
    permission::USE_GROUP_MENTIONS,
    permission::USE_SLASH_COMMANDS,
    permission::MANAGE_PUBLIC_CHANNEL_PROPERTIES,
    permission::MANAGE_PRIVATE_CHANNEL_PROPERTIES,
    permission::DELETE_PUBLIC_CHANNEL,
    permission::DELETE_PRIVATE_CHANNEL,
];

const CHANNEL_GUEST_PERMISSIONS: &[Permission] = &[
    permission::READ_CHANNEL,
    permission::ADD_REACTION,
    permission::REMOVE_REACTION,
    permission::UPLOAD_FILE,
    permission::EDIT_POST,
    permission::CREATE_POST,
    permission::USE_CHANNEL_MENTIONS,
    permission::USE_SLASH_COMMANDS,
];

#[must_use]
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_ROLE_NAMES.contains(&name)
}

/// Default permission set for a built-in role, `None` for other names.
///
/// The system admin role carries every catalogued permission.
#[must_use]
pub fn permissions_for(name: &str) -> Option<BTreeSet<String>> {
    let table: &[Permission] = match name {
        SYSTEM_ADMIN => permission::ALL,
        SYSTEM_USER => SYSTEM_USER_PERMISSIONS,
        SYSTEM_GUEST => SYSTEM_GUEST_PERMISSIONS,
        TEAM_ADMIN => TEAM_ADMIN_PERMISSIONS,
        TEAM_USER => TEAM_USER_PERMISSIONS,
        TEAM_GUEST => TEAM_GUEST_PERMISSIONS,
        CHANNEL_ADMIN => CHANNEL_ADMIN_PERMISSIONS,
        CHANNEL_USER => CHANNEL_USER_PERMISSIONS,
        CHANNEL_GUEST => CHANNEL_GUEST_PERMISSIONS,
        _ => return None,
    };
    Some(table.iter().map(|p| p.id.to_string()).collect())
}

fn display_name_for(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the built-in role `name` with its default permissions.
#[must_use]
pub fn default_role(name: &str) -> Option<Role> {
    let permissions = permissions_for(name)?;
    let now = Utc::now();
    Some(Role {
        id: String::new(),
        name: name.to_string(),
        display_name: display_name_for(name),
        description: format!("Default permissions for the {} role", display_name_for(name)),
        permissions,
        scheme_managed: false,
        built_in: true,
        created_at: now,
        updated_at: now,
    })
}

/// All built-in roles with default permissions, in `BUILTIN_ROLE_NAMES` order.
#[must_use]
pub fn default_roles() -> Vec<Role> {
    BUILTIN_ROLE_NAMES
        .iter()
        .filter_map(|name| default_role(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RoleSlot;

    #[test]
    fn every_builtin_has_a_table() {
        for name in BUILTIN_ROLE_NAMES {
            assert!(permissions_for(name).is_some(), "{name}");
        }
        assert!(permissions_for("custom").is_none());
    }

    #[test]
    fn system_admin_carries_required_permissions() {
        let admin = default_role(SYSTEM_ADMIN).unwrap();
        for required in SYSTEM_ADMIN_REQUIRED {
            assert!(admin.has_permission(required), "missing {required}");
        }
        assert_eq!(admin.permissions.len(), permission::ALL.len());
        assert!(admin.built_in);
    }

    #[test]
    fn default_table_only_uses_catalogued_permissions() {
        for role in default_roles() {
            for id in &role.permissions {
                assert!(permission::is_known(id), "{} has unknown {id}", role.name);
            }
        }
    }

    #[test]
    fn slots_map_to_builtins() {
        for slot in RoleSlot::ALL {
            assert!(is_builtin(slot.builtin_role()));
        }
    }

    #[test]
    fn display_names() {
        assert_eq!(default_role(CHANNEL_GUEST).unwrap().display_name, "Channel Guest");
        assert_eq!(default_roles().len(), 9);
    }
}
