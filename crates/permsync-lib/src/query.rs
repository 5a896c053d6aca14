//! Query and patch types for role and scheme operations.

use std::collections::BTreeSet;

use crate::model::{Role, SchemeScope};

/// Default and maximum page sizes for scheme listings.
pub const DEFAULT_PER_PAGE: usize = 60;
pub const MAX_PER_PAGE: usize = 200;

/// Fields to update on a role.
#[derive(Debug, Clone, Default)]
pub struct RolePatch {
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// Replaces the whole permission set.
    pub permissions: Option<BTreeSet<String>>,
}

impl RolePatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.description.is_none() && self.permissions.is_none()
    }

    /// Patch that only replaces permissions.
    #[must_use]
    pub fn permissions(permissions: BTreeSet<String>) -> Self {
        Self {
            permissions: Some(permissions),
            ..Self::default()
        }
    }

    /// Apply the set fields to `role`.
    pub fn apply(&self, role: &mut Role) {
        if let Some(ref display_name) = self.display_name {
            role.display_name.clone_from(display_name);
        }
        if let Some(ref description) = self.description {
            role.description.clone_from(description);
        }
        if let Some(ref permissions) = self.permissions {
            role.permissions.clone_from(permissions);
        }
    }
}

/// Page selector for scheme listings.
#[derive(Debug, Clone, Copy)]
pub struct SchemePage {
    pub scope: Option<SchemeScope>,
    /// Zero-based page number.
    pub page: usize,
    pub per_page: usize,
}

impl Default for SchemePage {
    fn default() -> Self {
        Self {
            scope: None,
            page: 0,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl SchemePage {
    #[must_use]
    pub fn scoped(scope: SchemeScope, page: usize, per_page: usize) -> Self {
        Self {
            scope: Some(scope),
            page,
            per_page,
        }
    }

    /// Page size clamped to `1..=MAX_PER_PAGE`.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.limit())
    }
}
