use chrono::{DateTime, Utc};
use permsync_lib::migration::{MigrationKey, MigrationStatus};
use permsync_lib::{MigrationState, Role, RoleSlot, Scheme, SchemeScope};
use serde::Serialize;

/// Scheme row for list views.
#[derive(Debug, Clone, Serialize)]
pub struct SchemeSummary {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub scope: SchemeScope,
    /// Role names keyed by export field, unset slots omitted.
    pub roles: Vec<SlotRole>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotRole {
    pub slot: &'static str,
    pub role: String,
}

impl From<&Scheme> for SchemeSummary {
    fn from(scheme: &Scheme) -> Self {
        let roles = RoleSlot::ALL
            .iter()
            .filter(|slot| !scheme.role(**slot).is_empty())
            .map(|slot| SlotRole {
                slot: slot.field_name(),
                role: scheme.role(*slot).to_string(),
            })
            .collect();
        Self {
            id: scheme.id.clone(),
            name: scheme.name.clone(),
            display_name: scheme.display_name.clone(),
            description: scheme.description.clone(),
            scope: scheme.scope,
            roles,
            created_at: scheme.created_at,
        }
    }
}

/// Role with derived counts for show views.
#[derive(Debug, Clone, Serialize)]
pub struct RoleDetails {
    #[serde(flatten)]
    pub role: Role,
    pub permission_count: usize,
}

impl From<Role> for RoleDetails {
    fn from(role: Role) -> Self {
        let permission_count = role.permissions.len();
        Self {
            role,
            permission_count,
        }
    }
}

/// One row of `migrate --status`.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatusRow {
    pub key: MigrationKey,
    pub state: MigrationState,
    pub description: &'static str,
}

impl From<MigrationStatus> for MigrationStatusRow {
    fn from(status: MigrationStatus) -> Self {
        Self {
            key: status.key,
            state: status.state,
            description: status.key.description(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_summary_omits_unset_slots() {
        let mut scheme = Scheme {
            name: "house".into(),
            scope: SchemeScope::Channel,
            ..Scheme::default()
        };
        scheme.set_role(RoleSlot::ChannelUser, "role-1");

        let summary = SchemeSummary::from(&scheme);
        assert_eq!(summary.roles.len(), 1);
        assert_eq!(summary.roles[0].slot, "default_channel_user_role");

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["scope"], "channel");
        assert_eq!(json["roles"][0]["role"], "role-1");
    }

    #[test]
    fn role_details_flatten_role_fields() {
        let mut role = Role {
            name: "custom".into(),
            ..Role::default()
        };
        role.grant(["a", "b"]);
        let json = serde_json::to_value(RoleDetails::from(role)).unwrap();
        assert_eq!(json["name"], "custom");
        assert_eq!(json["permission_count"], 2);
    }

    #[test]
    fn migration_row_serializes_flag_name() {
        let row = MigrationStatusRow::from(MigrationStatus {
            key: MigrationKey::DefaultSchemes,
            state: MigrationState::Pending,
        });
        insta::assert_json_snapshot!(row, @r#"
        {
          "key": "migration_advanced_permissions_phase_2",
          "state": "pending",
          "description": "seed default schemes"
        }
        "#);
    }
}
