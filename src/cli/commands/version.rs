//! Version command implementation.

use serde::Serialize;

use crate::cli::VersionArgs;
use crate::error::Result;
use crate::output::OutputContext;

#[derive(Serialize)]
struct VersionOutput<'a> {
    version: &'a str,
    build: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    commit: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rust_version: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<&'a str>,
}

fn non_empty(value: Option<&'static str>) -> Option<&'static str> {
    value.filter(|s| !s.trim().is_empty())
}

/// Execute the version command.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn execute(args: &VersionArgs, ctx: &OutputContext) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");

    if args.short {
        println!("{version}");
        return Ok(());
    }

    let output = VersionOutput {
        version,
        build: if cfg!(debug_assertions) { "dev" } else { "release" },
        commit: non_empty(option_env!("VERGEN_GIT_SHA")),
        branch: non_empty(option_env!("VERGEN_GIT_BRANCH")),
        rust_version: non_empty(option_env!("VERGEN_RUSTC_SEMVER")),
        target: non_empty(option_env!("VERGEN_CARGO_TARGET_TRIPLE")),
    };

    if ctx.is_json() {
        ctx.json(&output)?;
        return Ok(());
    }

    let mut line = format!("permsync {} ({})", output.version, output.build);
    if let Some(commit) = output.commit {
        let short = commit.get(..7).unwrap_or(commit);
        match output.branch {
            Some(branch) => line.push_str(&format!(" {branch}@{short}")),
            None => line.push_str(&format!(" {short}")),
        }
    }
    ctx.line(line);
    if let Some(rust) = output.rust_version {
        ctx.line(format!("rustc {rust}"));
    }
    if let Some(target) = output.target {
        ctx.line(format!("target {target}"));
    }
    Ok(())
}
