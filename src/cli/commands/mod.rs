//! Command implementations.

pub mod completions;
pub mod export;
pub mod import;
pub mod init;
pub mod migrate;
pub mod reset;
pub mod role;
pub mod schema;
pub mod scheme;
pub mod version;
