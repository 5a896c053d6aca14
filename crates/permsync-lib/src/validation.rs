//! Validation helpers for schemes and roles.
//!
//! These routines enforce naming and scope constraints and return
//! structured validation errors without mutating storage.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{PermsError, ValidationError};
use crate::model::{DEFAULT_RECORD_NAME, Role, RoleSlot, Scheme, SchemeScope};
use crate::store::PermissionStore;

pub const MAX_NAME_LEN: usize = 64;
pub const MAX_DISPLAY_NAME_LEN: usize = 128;
pub const MAX_DESCRIPTION_LEN: usize = 1024;

static NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9_-]*$").unwrap_or_else(|_| unreachable!("static pattern"))
});

static PERMISSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9_]*$").unwrap_or_else(|_| unreachable!("static pattern"))
});

fn check_name(field: &str, name: &str, errors: &mut Vec<ValidationError>) {
    if name.trim().is_empty() {
        errors.push(ValidationError::new(field, "cannot be empty"));
        return;
    }
    if name.len() > MAX_NAME_LEN {
        errors.push(ValidationError::new(
            field,
            format!("exceeds {MAX_NAME_LEN} characters"),
        ));
    }
    if !NAME_RE.is_match(name) {
        errors.push(ValidationError::new(
            field,
            "may only contain lowercase letters, digits, '_' and '-'",
        ));
    }
}

fn check_display(
    display_name: &str,
    description: &str,
    errors: &mut Vec<ValidationError>,
) {
    if display_name.len() > MAX_DISPLAY_NAME_LEN {
        errors.push(ValidationError::new(
            "display_name",
            format!("exceeds {MAX_DISPLAY_NAME_LEN} characters"),
        ));
    }
    if description.len() > MAX_DESCRIPTION_LEN {
        errors.push(ValidationError::new(
            "description",
            format!("exceeds {MAX_DESCRIPTION_LEN} characters"),
        ));
    }
}

/// Validates scheme fields and the scope/role-slot invariant.
pub struct SchemeValidator;

impl SchemeValidator {
    /// Validate a scheme and return all validation errors found.
    ///
    /// # Errors
    ///
    /// Returns a `Vec<ValidationError>` if any validation rules are violated.
    pub fn validate(scheme: &Scheme) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        check_name("name", &scheme.name, &mut errors);
        if scheme.name == DEFAULT_RECORD_NAME {
            errors.push(ValidationError::new(
                "name",
                "'default' is reserved for the built-in roles record",
            ));
        }
        if scheme.display_name.trim().is_empty() {
            errors.push(ValidationError::new("display_name", "cannot be empty"));
        }
        check_display(&scheme.display_name, &scheme.description, &mut errors);

        if scheme.scope == SchemeScope::Unspecified {
            errors.push(ValidationError::new("scope", "must be 'team' or 'channel'"));
        }

        for slot in RoleSlot::ALL {
            if !scheme.scope.covers(slot) && !scheme.role(slot).is_empty() {
                errors.push(ValidationError::new(
                    slot.field_name(),
                    format!("must be empty for a {} scheme", scheme.scope),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Validates role fields and permission id format.
pub struct RoleValidator;

impl RoleValidator {
    /// Validate a role and return all validation errors found.
    ///
    /// # Errors
    ///
    /// Returns a `Vec<ValidationError>` if any validation rules are violated.
    pub fn validate(role: &Role) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        check_name("name", &role.name, &mut errors);
        check_display(&role.display_name, &role.description, &mut errors);

        for permission in &role.permissions {
            if !PERMISSION_RE.is_match(permission) {
                errors.push(ValidationError::new(
                    "permissions",
                    format!("invalid permission id '{permission}'"),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Checks that every role a scheme references exists.
pub struct RoleReferenceValidator;

impl RoleReferenceValidator {
    /// Validate role references, returning a `PermsError` on storage failures.
    ///
    /// # Errors
    ///
    /// Returns a `PermsError` if storage lookups fail or a reference dangles.
    pub fn validate<S: PermissionStore + ?Sized>(
        scheme: &Scheme,
        store: &S,
    ) -> Result<(), PermsError> {
        let mut errors = Vec::new();

        for slot in scheme.scope.slots() {
            let name = scheme.role(*slot);
            if name.is_empty() {
                errors.push(ValidationError::new(slot.field_name(), "is not set"));
                continue;
            }
            match store.get_role_by_name(name) {
                Ok(_) => {}
                Err(err) if err.is_not_found() => {
                    errors.push(ValidationError::new(
                        slot.field_name(),
                        format!("references missing role '{name}'"),
                    ));
                }
                Err(err) => return Err(err),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(PermsError::from_validation_errors(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn channel_scheme() -> Scheme {
        Scheme {
            name: "support".into(),
            display_name: "Support".into(),
            scope: SchemeScope::Channel,
            ..Scheme::default()
        }
    }

    #[test]
    fn valid_scheme_passes() {
        assert!(SchemeValidator::validate(&channel_scheme()).is_ok());
    }

    #[test]
    fn reserved_and_malformed_names_rejected() {
        let mut scheme = channel_scheme();
        scheme.name = "default".into();
        assert!(SchemeValidator::validate(&scheme).is_err());

        scheme.name = "Has Spaces".into();
        let errors = SchemeValidator::validate(&scheme).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "name"));

        scheme.name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(SchemeValidator::validate(&scheme).is_err());
    }

    #[test]
    fn uncovered_slot_must_be_empty() {
        let mut scheme = channel_scheme();
        scheme.default_team_admin_role = "someone".into();
        let errors = SchemeValidator::validate(&scheme).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "default_team_admin_role");
    }

    #[test]
    fn unspecified_scope_rejected() {
        let mut scheme = channel_scheme();
        scheme.scope = SchemeScope::Unspecified;
        let errors = SchemeValidator::validate(&scheme).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "scope"));
    }

    #[test]
    fn role_permission_format() {
        let mut role = Role {
            name: "r1".into(),
            ..Role::default()
        };
        role.grant(["read_channel"]);
        assert!(RoleValidator::validate(&role).is_ok());
        role.grant(["Bad Perm"]);
        let errors = RoleValidator::validate(&role).unwrap_err();
        assert_eq!(errors[0].field, "permissions");
    }

    #[test]
    fn dangling_reference_reported() {
        let mut store = InMemoryStore::new();
        let mut scheme = channel_scheme();
        scheme.set_role(RoleSlot::ChannelAdmin, "present-admin");
        scheme.set_role(RoleSlot::ChannelUser, "missing-user");
        scheme.set_role(RoleSlot::ChannelGuest, "missing-guest");
        store
            .save_role(&Role {
                name: "present-admin".into(),
                ..Role::default()
            })
            .unwrap();

        let err = RoleReferenceValidator::validate(&scheme, &store).unwrap_err();
        assert!(matches!(err, PermsError::ValidationErrors { ref errors } if errors.len() == 2));
    }
}
