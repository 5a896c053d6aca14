//! `permsync` - Permission scheme export/import and one-time migrations.
//!
//! `SQLite` storage with JSONL export files. Every command runs to completion
//! and exits; there is no daemon.

use permsync::PermsyncError;
use permsync::cli::run;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        let code = e.downcast_ref::<PermsyncError>().map_or(1, PermsyncError::exit_code);
        std::process::exit(code);
    }
}
