use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use assert_cmd::Command;
use tempfile::TempDir;

/// A scratch directory to run `permsync` in.
pub struct PermsyncWorkspace {
    _temp: TempDir,
    pub root: PathBuf,
}

impl PermsyncWorkspace {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let root = temp.path().to_path_buf();
        Self { _temp: temp, root }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn db_path(&self) -> PathBuf {
        self.root.join(".permsync").join("permsync.db")
    }
}

pub struct RunOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout)
            .unwrap_or_else(|e| panic!("stdout is not JSON ({e}):\n{}", self.stdout))
    }
}

fn command(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("permsync").expect("permsync binary");
    cmd.current_dir(root)
        .env_remove("PERMSYNC_DB")
        .env_remove("PERMSYNC_DIR")
        .env_remove("PERMSYNC_LOG")
        .env_remove("PERMSYNC_LOG_FORMAT");
    cmd
}

/// Run `permsync` with `args` in the workspace root.
pub fn run_permsync<I, S>(workspace: &PermsyncWorkspace, args: I, label: &str) -> RunOutput
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    run_permsync_with_stdin(workspace, args, "", label)
}

pub fn run_permsync_with_stdin<I, S>(
    workspace: &PermsyncWorkspace,
    args: I,
    stdin: &str,
    label: &str,
) -> RunOutput
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let output = command(&workspace.root)
        .args(args)
        .write_stdin(stdin.to_string())
        .output()
        .unwrap_or_else(|e| panic!("{label}: failed to run permsync: {e}"));
    RunOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

/// Base command for assertion chains with `predicates`.
pub fn permsync_cmd(workspace: &PermsyncWorkspace) -> Command {
    command(&workspace.root)
}
