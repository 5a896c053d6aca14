//! Command-line interface for `permsync`.
//!
//! This module provides the CLI parsing and command routing using clap.

pub mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use permsync_lib::SchemeScope;
use permsync_lib::query::DEFAULT_PER_PAGE;

use crate::logging;
use crate::output::OutputContext;

/// `permsync` - Permission scheme export/import and one-time migrations.
#[derive(Parser, Debug)]
#[command(name = "permsync")]
#[command(
    author,
    version,
    about = "Permission scheme export/import and one-time migrations (SQLite + JSONL)",
    long_about = None
)]
pub struct Cli {
    /// Output format: text (default) or json
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Database path (overrides PERMSYNC_DB and the workspace config)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Append JSON log lines to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a permsync workspace in the current directory
    Init(InitArgs),

    /// Export every scheme as JSONL
    Export(ExportArgs),

    /// Import schemes from JSONL
    Import(ImportArgs),

    /// Run pending one-time migrations
    Migrate(MigrateArgs),

    /// Restore built-in roles to their defaults and re-run role migrations
    Reset,

    /// Inspect and edit roles
    Role(RoleCommand),

    /// Manage schemes
    Scheme(SchemeCommand),

    /// Print the JSON Schema of an export record
    Schema,

    /// Generate shell completions
    Completions(CompletionsArgs),

    /// Show version information
    Version(VersionArgs),
}

#[derive(Args, Debug, Default)]
pub struct InitArgs {
    /// Reuse an existing database and rewrite the config template
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Output file ('-' or omitted for stdout)
    #[arg(short, long, value_name = "FILE", conflicts_with = "workspace_file")]
    pub output: Option<PathBuf>,

    /// Write to the workspace's permissions.jsonl
    #[arg(short = 'w', long)]
    pub workspace_file: bool,

    /// Leave out the trailing record with the built-in roles
    #[arg(long)]
    pub no_default_roles: bool,
}

#[derive(Args, Debug, Default)]
pub struct ImportArgs {
    /// Input file ('-' or omitted for stdin)
    #[arg(value_name = "FILE", conflicts_with = "workspace_file")]
    pub input: Option<PathBuf>,

    /// Read the workspace's permissions.jsonl
    #[arg(short = 'w', long)]
    pub workspace_file: bool,
}

#[derive(Args, Debug, Default)]
pub struct MigrateArgs {
    /// Show the state of every migration without running anything
    #[arg(long, conflicts_with = "rerun")]
    pub status: bool,

    /// Clear one migration's flag and run it again
    #[arg(long, value_name = "KEY")]
    pub rerun: Option<String>,
}

#[derive(Args, Debug)]
pub struct RoleCommand {
    #[command(subcommand)]
    pub command: RoleSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum RoleSubcommand {
    /// Show one or more roles by name
    Show {
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// List every role
    List,

    /// Update a role's display name, description or permissions
    Patch(RolePatchArgs),
}

#[derive(Args, Debug, Default)]
pub struct RolePatchArgs {
    pub name: String,

    #[arg(long)]
    pub display_name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Replace the permission set (comma-separated)
    #[arg(long, value_delimiter = ',', num_args = 0..)]
    pub permissions: Option<Vec<String>>,
}

#[derive(Args, Debug)]
pub struct SchemeCommand {
    #[command(subcommand)]
    pub command: SchemeSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum SchemeSubcommand {
    /// List schemes, newest first
    List(SchemeListArgs),

    /// Create a scheme and its roles
    Create(SchemeCreateArgs),

    /// Delete a scheme and the roles it created
    Delete {
        /// Scheme id or name
        id: String,
    },
}

#[derive(Args, Debug)]
pub struct SchemeListArgs {
    /// Only schemes of this scope (team or channel)
    #[arg(long, value_parser = parse_scope)]
    pub scope: Option<SchemeScope>,

    /// Zero-based page number
    #[arg(long, default_value_t = 0)]
    pub page: usize,

    #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
    pub per_page: usize,
}

#[derive(Args, Debug)]
pub struct SchemeCreateArgs {
    /// team or channel
    #[arg(long, value_parser = parse_scope)]
    pub scope: SchemeScope,

    /// Machine name (generated when omitted)
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub display_name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

#[derive(Args, Debug, Default)]
pub struct VersionArgs {
    /// Print only the version number
    #[arg(long)]
    pub short: bool,
}

fn parse_scope(value: &str) -> std::result::Result<SchemeScope, String> {
    match value.parse::<SchemeScope>() {
        Ok(SchemeScope::Unspecified) => Err("scope must be 'team' or 'channel'".to_string()),
        Ok(scope) => Ok(scope),
        Err(e) => Err(e.to_string()),
    }
}

/// Run the CLI.
///
/// Command failures are returned as [`crate::error::PermsyncError`] inside
/// the `anyhow` error so `main` can recover the exit code.
///
/// # Errors
///
/// Returns an error if logging cannot be initialized or the command fails.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    let ctx = OutputContext::from_flags(cli.json, cli.quiet);
    let db = cli.db.as_deref();
    tracing::debug!(command = cli.command.name(), "Dispatching");

    match cli.command {
        Commands::Init(args) => commands::init::execute(&args, &ctx)?,
        Commands::Export(args) => commands::export::execute(&args, db, &ctx)?,
        Commands::Import(args) => commands::import::execute(&args, db, &ctx)?,
        Commands::Migrate(args) => commands::migrate::execute(&args, db, &ctx)?,
        Commands::Reset => commands::reset::execute(db, &ctx)?,
        Commands::Role(role) => commands::role::execute(&role.command, db, &ctx)?,
        Commands::Scheme(scheme) => commands::scheme::execute(&scheme.command, db, &ctx)?,
        Commands::Schema => commands::schema::execute()?,
        Commands::Completions(args) => commands::completions::execute(args.shell),
        Commands::Version(args) => commands::version::execute(&args, &ctx)?,
    }

    Ok(())
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::Export(_) => "export",
            Self::Import(_) => "import",
            Self::Migrate(_) => "migrate",
            Self::Reset => "reset",
            Self::Role(role) => match role.command {
                RoleSubcommand::Show { .. } => "role show",
                RoleSubcommand::List => "role list",
                RoleSubcommand::Patch(_) => "role patch",
            },
            Self::Scheme(scheme) => match scheme.command {
                SchemeSubcommand::List(_) => "scheme list",
                SchemeSubcommand::Create(_) => "scheme create",
                SchemeSubcommand::Delete { .. } => "scheme delete",
            },
            Self::Schema => "schema",
            Self::Completions(_) => "completions",
            Self::Version(_) => "version",
        }
    }
}
