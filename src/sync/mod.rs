//! File-level export and import of permission schemes.
//!
//! Exports are written to a temp file beside the target and renamed into
//! place, so a failed export never leaves a truncated `permissions.jsonl`.

pub mod history;

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use permsync_lib::PermsError;
use permsync_lib::permissions::{
    ExportOptions, ExportSummary, ImportSummary, export_permissions, import_permissions,
};
use permsync_lib::store::PermissionStore;

use crate::error::Result;
use history::HistoryConfig;

/// Backup settings applied before an export overwrites its target.
#[derive(Debug, Clone, Copy)]
pub struct Backup<'a> {
    pub dir: &'a Path,
    pub config: &'a HistoryConfig,
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Export every scheme to `path`.
///
/// # Errors
///
/// Returns an error if the backup, the export or the final rename fails.
/// The previous file is left untouched on failure.
pub fn export_to_file<S: PermissionStore + ?Sized>(
    store: &S,
    path: &Path,
    options: &ExportOptions,
    backup: Option<Backup<'_>>,
) -> Result<ExportSummary> {
    if let Some(backup) = backup {
        history::backup_before_export(path, backup.dir, backup.config)?;
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    let result = write_export(store, &tmp, options);
    match result {
        Ok(summary) => {
            fs::rename(&tmp, path)?;
            tracing::debug!("Wrote export to {}", path.display());
            Ok(summary)
        }
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                tracing::warn!("Failed to remove {}: {cleanup}", tmp.display());
            }
            Err(e)
        }
    }
}

fn write_export<S: PermissionStore + ?Sized>(
    store: &S,
    tmp: &Path,
    options: &ExportOptions,
) -> Result<ExportSummary> {
    let mut writer = BufWriter::new(File::create(tmp)?);
    let summary = export_permissions(store, &mut writer, options)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(summary)
}

/// Export every scheme to an arbitrary writer such as stdout.
///
/// # Errors
///
/// Returns the first store or write error.
pub fn export_to_writer<S, W>(store: &S, writer: &mut W, options: &ExportOptions) -> Result<ExportSummary>
where
    S: PermissionStore + ?Sized,
    W: Write,
{
    Ok(export_permissions(store, writer, options)?)
}

/// Import records from `path`.
///
/// # Errors
///
/// Returns `FileNotFound` if `path` does not exist, otherwise the import error.
pub fn import_from_file<S: PermissionStore + ?Sized>(store: &mut S, path: &Path) -> Result<ImportSummary> {
    if !path.is_file() {
        return Err(PermsError::FileNotFound(path.to_path_buf()).into());
    }
    let reader = BufReader::new(File::open(path)?);
    Ok(import_permissions(store, reader)?)
}

/// Import records from any reader such as stdin.
///
/// # Errors
///
/// Returns the import error.
pub fn import_from_reader<S, R>(store: &mut S, reader: R) -> Result<ImportSummary>
where
    S: PermissionStore + ?Sized,
    R: Read,
{
    Ok(import_permissions(store, BufReader::new(reader))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PermsyncError;
    use crate::storage::SqliteStorage;
    use permsync_lib::migration::{MigrationOptions, run_migrations};
    use tempfile::TempDir;

    fn migrated() -> SqliteStorage {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        run_migrations(&mut storage, &MigrationOptions::default()).unwrap();
        storage
    }

    #[test]
    fn export_writes_file_and_backs_up_previous() {
        crate::logging::init_test_logging();
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("permissions.jsonl");
        let history_dir = temp.path().join(".history");
        let config = HistoryConfig::default();
        let backup = Backup {
            dir: &history_dir,
            config: &config,
        };
        fs::write(&path, "old\n").unwrap();

        let storage = migrated();
        let summary =
            export_to_file(&storage, &path, &ExportOptions::default(), Some(backup)).unwrap();
        assert_eq!(summary.schemes, 2);

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(!temp_path(&path).exists());

        let backups = history::list_backups(&history_dir).unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&backups[0].path).unwrap(), "old\n");
    }

    #[test]
    fn import_from_missing_file() {
        let temp = TempDir::new().unwrap();
        let mut storage = migrated();
        let err = import_from_file(&mut storage, &temp.path().join("nope.jsonl")).unwrap_err();
        assert!(matches!(
            err,
            PermsyncError::Perms(PermsError::FileNotFound(_))
        ));
    }

    #[test]
    fn file_round_trip_between_databases() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.jsonl");
        let source = migrated();
        export_to_file(&source, &path, &ExportOptions::default(), None).unwrap();

        let mut target = SqliteStorage::open_in_memory().unwrap();
        run_migrations(&mut target, &MigrationOptions::none()).unwrap();
        let summary = import_from_file(&mut target, &path).unwrap();
        assert_eq!(summary.created.len(), 2);
        assert!(summary.skipped.is_empty());
    }

    #[test]
    fn import_from_reader_accepts_empty_input() {
        let mut storage = migrated();
        let summary = import_from_reader(&mut storage, &b""[..]).unwrap();
        assert_eq!(summary, ImportSummary::default());
    }
}
