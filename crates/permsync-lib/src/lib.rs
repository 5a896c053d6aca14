//! `permsync-lib` - In-process permission scheme library.
//!
//! Provides a standalone, SQLite-free API for roles, schemes and the
//! one-time permission migrations. Any backend implementing
//! [`PermissionStore`] can be driven by the service functions; the bundled
//! [`InMemoryStore`] persists to a JSON snapshot.
//!
//! # Quick Start
//!
//! ```no_run
//! use permsync_lib::{InMemoryStore, MigrationOptions, SchemeScope};
//! use permsync_lib::model::Scheme;
//! use permsync_lib::{migration, permissions};
//!
//! let mut store = InMemoryStore::open("path/to/.permsync/snapshot.json").unwrap();
//!
//! // Seed built-in roles and default schemes
//! migration::run_migrations(&mut store, &MigrationOptions::default()).unwrap();
//!
//! // Create
//! let scheme = Scheme { name: "support".into(), scope: SchemeScope::Channel, ..Default::default() };
//! permissions::create_scheme(&mut store, &scheme).unwrap();
//!
//! // Export
//! let mut out = Vec::new();
//! permissions::export_permissions(&store, &mut out, &Default::default()).unwrap();
//!
//! // Save back
//! store.save().unwrap();
//! ```

pub mod defaults;
pub mod error;
pub mod jsonl;
pub mod migration;
pub mod model;
pub mod permission;
pub mod permissions;
pub mod query;
pub mod store;
pub mod util;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use error::{PermsError, Result, ValidationError};
pub use migration::{MigrationKey, MigrationOptions, MigrationReport, SchemeSeed};
pub use model::{MigrationState, Role, RoleSlot, Scheme, SchemeRecord, SchemeScope, SystemFlag};
pub use permissions::{ExportOptions, ExportSummary, ImportSummary};
pub use query::{RolePatch, SchemePage};
pub use store::{InMemoryStore, PermissionStore};
