//! `SQLite` storage layer for `permsync`.
//!
//! [`SqliteStorage`] implements the library's `PermissionStore` trait on top
//! of three tables (`roles`, `schemes`, `systems`). Each trait call is one
//! statement, so every write is atomic on its own.

mod schema;
mod sqlite;

pub use schema::{SCHEMA_VERSION, apply_schema};
pub use sqlite::SqliteStorage;
