//! `permsync` - Permission scheme export/import and one-time migrations.
//!
//! This crate provides the `permsync` CLI on top of `permsync-lib`: a
//! `SQLite` implementation of the store trait, workspace configuration,
//! file-level export/import with history backups, and output formatting.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`cli`] - Command-line interface using clap
//! - [`storage`] - `SQLite` database layer
//! - [`sync`] - JSONL file export/import and history backups
//! - [`config`] - Workspace discovery and `config.yaml`
//! - [`error`] - Error types and exit codes
//! - [`format`] - Output formatting (text, JSON)
//! - [`output`] - Output mode selection
//! - [`logging`] - `tracing` subscriber setup

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod output;
pub mod storage;
pub mod sync;

pub use error::{PermsyncError, Result};
