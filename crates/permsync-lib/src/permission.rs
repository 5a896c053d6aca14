//! Catalogue of permission identifiers.
//!
//! Roles store plain string ids; this table is what the built-in role
//! definitions and the migrations draw from.

use serde::Serialize;

/// Level a permission is checked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionScope {
    System,
    Team,
    Channel,
}

/// A known permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Permission {
    pub id: &'static str,
    pub scope: PermissionScope,
}

impl Permission {
    const fn system(id: &'static str) -> Self {
        Self {
            id,
            scope: PermissionScope::System,
        }
    }

    const fn team(id: &'static str) -> Self {
        Self {
            id,
            scope: PermissionScope::Team,
        }
    }

    const fn channel(id: &'static str) -> Self {
        Self {
            id,
            scope: PermissionScope::Channel,
        }
    }
}

// System
pub const MANAGE_SYSTEM: Permission = Permission::system("manage_system");
pub const MANAGE_ROLES: Permission = Permission::system("manage_roles");
pub const MANAGE_SCHEMES: Permission = Permission::system("manage_system_wide_schemes");
pub const CREATE_TEAM: Permission = Permission::system("create_team");
pub const LIST_PUBLIC_TEAMS: Permission = Permission::system("list_public_teams");
pub const JOIN_PUBLIC_TEAMS: Permission = Permission::system("join_public_teams");
pub const CREATE_DIRECT_CHANNEL: Permission = Permission::system("create_direct_channel");
pub const CREATE_GROUP_CHANNEL: Permission = Permission::system("create_group_channel");
pub const VIEW_MEMBERS: Permission = Permission::system("view_members");
pub const CREATE_EMOJIS: Permission = Permission::system("create_emojis");
pub const DELETE_EMOJIS: Permission = Permission::system("delete_emojis");
pub const DELETE_OTHERS_EMOJIS: Permission = Permission::system("delete_others_emojis");
pub const EDIT_OTHER_USERS: Permission = Permission::system("edit_other_users");
pub const MANAGE_OAUTH: Permission = Permission::system("manage_oauth");

// Team
pub const VIEW_TEAM: Permission = Permission::team("view_team");
pub const LIST_TEAM_CHANNELS: Permission = Permission::team("list_team_channels");
pub const JOIN_PUBLIC_CHANNELS: Permission = Permission::team("join_public_channels");
pub const READ_PUBLIC_CHANNEL: Permission = Permission::team("read_public_channel");
pub const CREATE_PUBLIC_CHANNEL: Permission = Permission::team("create_public_channel");
pub const CREATE_PRIVATE_CHANNEL: Permission = Permission::team("create_private_channel");
pub const INVITE_USER: Permission = Permission::team("invite_user");
pub const ADD_USER_TO_TEAM: Permission = Permission::team("add_user_to_team");
pub const REMOVE_USER_FROM_TEAM: Permission = Permission::team("remove_user_from_team");
pub const MANAGE_TEAM: Permission = Permission::team("manage_team");
pub const MANAGE_TEAM_ROLES: Permission = Permission::team("manage_team_roles");
pub const IMPORT_TEAM: Permission = Permission::team("import_team");
pub const MANAGE_INCOMING_WEBHOOKS: Permission = Permission::team("manage_incoming_webhooks");
pub const MANAGE_OUTGOING_WEBHOOKS: Permission = Permission::team("manage_outgoing_webhooks");
pub const MANAGE_SLASH_COMMANDS: Permission = Permission::team("manage_slash_commands");
pub const CONVERT_PUBLIC_CHANNEL_TO_PRIVATE: Permission =
    Permission::team("convert_public_channel_to_private");

// Channel
pub const READ_CHANNEL: Permission = Permission::channel("read_channel");
pub const CREATE_POST: Permission = Permission::channel("create_post");
pub const EDIT_POST: Permission = Permission::channel("edit_post");
pub const DELETE_POST: Permission = Permission::channel("delete_post");
pub const EDIT_OTHERS_POSTS: Permission = Permission::channel("edit_others_posts");
pub const DELETE_OTHERS_POSTS: Permission = Permission::channel("delete_others_posts");
pub const ADD_REACTION: Permission = Permission::channel("add_reaction");
pub const REMOVE_REACTION: Permission = Permission::channel("remove_reaction");
pub const UPLOAD_FILE: Permission = Permission::channel("upload_file");
pub const GET_PUBLIC_LINK: Permission = Permission::channel("get_public_link");
pub const USE_CHANNEL_MENTIONS: Permission = Permission::channel("use_channel_mentions");
pub const USE_GROUP_MENTIONS: Permission = Permission::channel("use_group_mentions");
pub const USE_SLASH_COMMANDS: Permission = Permission::channel("use_slash_commands");
pub const MANAGE_CHANNEL_ROLES: Permission = Permission::channel("manage_channel_roles");
pub const MANAGE_PUBLIC_CHANNEL_MEMBERS: Permission =
    Permission::channel("manage_public_channel_members");
pub const MANAGE_PRIVATE_CHANNEL_MEMBERS: Permission =
    Permission::channel("manage_private_channel_members");
pub const MANAGE_PUBLIC_CHANNEL_PROPERTIES: Permission =
    Permission::channel("manage_public_channel_properties");
pub const MANAGE_PRIVATE_CHANNEL_PROPERTIES: Permission =
    Permission::channel("manage_private_channel_properties");
pub const DELETE_PUBLIC_CHANNEL: Permission = Permission::channel("delete_public_channel");
pub const DELETE_PRIVATE_CHANNEL: Permission = Permission::channel("delete_private_channel");

/// Every catalogued permission.
pub const ALL: &[Permission] = &[
    MANAGE_SYSTEM,
    MANAGE_ROLES,
    MANAGE_SCHEMES,
    CREATE_TEAM,
    LIST_PUBLIC_TEAMS,
    JOIN_PUBLIC_TEAMS,
    CREATE_DIRECT_CHANNEL,
    CREATE_GROUP_CHANNEL,
    VIEW_MEMBERS,
    CREATE_EMOJIS,
    DELETE_EMOJIS,
    DELETE_OTHERS_EMOJIS,
    EDIT_OTHER_USERS,
    MANAGE_OAUTH,
    VIEW_TEAM,
    LIST_TEAM_CHANNELS,
    JOIN_PUBLIC_CHANNELS,
    READ_PUBLIC_CHANNEL,
    CREATE_PUBLIC_CHANNEL,
    CREATE_PRIVATE_CHANNEL,
    INVITE_USER,
    ADD_USER_TO_TEAM,
    REMOVE_USER_FROM_TEAM,
    MANAGE_TEAM,
    MANAGE_TEAM_ROLES,
    IMPORT_TEAM,
    MANAGE_INCOMING_WEBHOOKS,
    MANAGE_OUTGOING_WEBHOOKS,
    MANAGE_SLASH_COMMANDS,
    CONVERT_PUBLIC_CHANNEL_TO_PRIVATE,
    READ_CHANNEL,
    CREATE_POST,
    EDIT_POST,
    DELETE_POST,
    EDIT_OTHERS_POSTS,
    DELETE_OTHERS_POSTS,
    ADD_REACTION,
    REMOVE_REACTION,
    UPLOAD_FILE,
    GET_PUBLIC_LINK,
    USE_CHANNEL_MENTIONS,
    USE_GROUP_MENTIONS,
    USE_SLASH_COMMANDS,
    MANAGE_CHANNEL_ROLES,
    MANAGE_PUBLIC_CHANNEL_MEMBERS,
    MANAGE_PRIVATE_CHANNEL_MEMBERS,
    MANAGE_PUBLIC_CHANNEL_PROPERTIES,
    MANAGE_PRIVATE_CHANNEL_PROPERTIES,
    DELETE_PUBLIC_CHANNEL,
    DELETE_PRIVATE_CHANNEL,
];

/// Look up a catalogued permission by id.
#[must_use]
pub fn find(id: &str) -> Option<Permission> {
    ALL.iter().copied().find(|p| p.id == id)
}

#[must_use]
pub fn is_known(id: &str) -> bool {
    find(id).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique() {
        let ids: HashSet<&str> = ALL.iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), ALL.len());
    }

    #[test]
    fn lookup() {
        assert_eq!(find("create_emojis"), Some(CREATE_EMOJIS));
        assert_eq!(find("use_group_mentions").map(|p| p.scope), Some(PermissionScope::Channel));
        assert!(!is_known("fly"));
    }
}
