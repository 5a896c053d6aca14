//! Output formatting for `permsync`.
//!
//! JSON output uses the serde types in [`output`]; text output uses the
//! plain (non-ANSI) helpers in [`text`].
//!
//! # JSON Output Types
//!
//! - [`SchemeSummary`] - One scheme with its role references (scheme list)
//! - [`RoleDetails`] - A role with its permission count (role show/list)
//! - [`MigrationStatusRow`] - One migration flag (migrate --status)

mod output;
mod text;

pub use output::{MigrationStatusRow, RoleDetails, SchemeSummary, SlotRole};
pub use text::{
    format_role_line, format_scheme_line, format_state_icon, pad_display, wrap_permissions,
};
