//! `SQLite` implementation of `PermissionStore`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use permsync_lib::error::{PermsError, Result as PermsResult};
use permsync_lib::model::{Role, Scheme, SchemeScope, SystemFlag};
use permsync_lib::store::PermissionStore;
use permsync_lib::util;
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};

use crate::error::Result;
use crate::storage::schema::apply_schema;

const ROLE_COLUMNS: &str = "id, name, display_name, description, permissions, \
                            scheme_managed, built_in, created_at, updated_at";

const SCHEME_COLUMNS: &str = "id, name, display_name, description, scope, \
                              default_team_admin_role, default_team_user_role, \
                              default_team_guest_role, default_channel_admin_role, \
                              default_channel_user_role, default_channel_guest_role, \
                              created_at, updated_at";

/// Role, scheme and system-flag storage backed by a `SQLite` database.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStorage {
    /// Open (or create) a database file and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        apply_schema(&conn)?;
        tracing::debug!("Opened database {}", path.display());
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn, path: None })
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn role_id_exists(&self, id: &str) -> bool {
        self.conn
            .query_row("SELECT 1 FROM roles WHERE id = ?1", params![id], |_| Ok(()))
            .optional()
            .is_ok_and(|found| found.is_some())
    }

    fn scheme_id_exists(&self, id: &str) -> bool {
        self.conn
            .query_row("SELECT 1 FROM schemes WHERE id = ?1", params![id], |_| Ok(()))
            .optional()
            .is_ok_and(|found| found.is_some())
    }

    fn query_role(&self, column: &str, value: &str) -> PermsResult<Option<Role>> {
        let sql = format!("SELECT {ROLE_COLUMNS} FROM roles WHERE {column} = ?1");
        self.conn
            .query_row(&sql, params![value], role_from_row)
            .optional()
            .map_err(storage_err)
    }

    fn query_scheme(&self, column: &str, value: &str) -> PermsResult<Option<Scheme>> {
        let sql = format!("SELECT {SCHEME_COLUMNS} FROM schemes WHERE {column} = ?1");
        self.conn
            .query_row(&sql, params![value], scheme_from_row)
            .optional()
            .map_err(storage_err)
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn storage_err(e: rusqlite::Error) -> PermsError {
    PermsError::Storage(e.to_string())
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(e, rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation)
}

fn write_err(kind: &'static str, name: &str, e: rusqlite::Error) -> PermsError {
    if is_unique_violation(&e) {
        PermsError::NameTaken {
            kind,
            name: name.to_string(),
        }
    } else {
        storage_err(e)
    }
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn role_from_row(row: &Row<'_>) -> rusqlite::Result<Role> {
    let permissions: String = row.get(4)?;
    Ok(Role {
        id: row.get(0)?,
        name: row.get(1)?,
        display_name: row.get(2)?,
        description: row.get(3)?,
        permissions: util::parse_permission_list(&permissions),
        scheme_managed: row.get(5)?,
        built_in: row.get(6)?,
        created_at: timestamp(row, 7)?,
        updated_at: timestamp(row, 8)?,
    })
}

fn scheme_from_row(row: &Row<'_>) -> rusqlite::Result<Scheme> {
    let scope: String = row.get(4)?;
    let scope = SchemeScope::from_str(&scope)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    Ok(Scheme {
        id: row.get(0)?,
        name: row.get(1)?,
        display_name: row.get(2)?,
        description: row.get(3)?,
        scope,
        default_team_admin_role: row.get(5)?,
        default_team_user_role: row.get(6)?,
        default_team_guest_role: row.get(7)?,
        default_channel_admin_role: row.get(8)?,
        default_channel_user_role: row.get(9)?,
        default_channel_guest_role: row.get(10)?,
        created_at: timestamp(row, 11)?,
        updated_at: timestamp(row, 12)?,
    })
}

fn sql_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

// ============================================================================
// PermissionStore
// ============================================================================

impl PermissionStore for SqliteStorage {
    fn save_role(&mut self, role: &Role) -> PermsResult<Role> {
        let now = Utc::now();
        let mut new_role = role.clone();
        if new_role.id.is_empty() {
            new_role.id =
                util::generate_id("role", &new_role.name, now, |id| self.role_id_exists(id));
        }
        new_role.created_at = now;
        new_role.updated_at = now;

        self.conn
            .execute(
                &format!("INSERT INTO roles ({ROLE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
                params![
                    new_role.id,
                    new_role.name,
                    new_role.display_name,
                    new_role.description,
                    util::join_permission_list(&new_role.permissions),
                    new_role.scheme_managed,
                    new_role.built_in,
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ],
            )
            .map_err(|e| write_err("Role", &new_role.name, e))?;
        Ok(new_role)
    }

    fn update_role(&mut self, role: &Role) -> PermsResult<Role> {
        let changed = self
            .conn
            .execute(
                "UPDATE roles SET name = ?2, display_name = ?3, description = ?4, \
                 permissions = ?5, scheme_managed = ?6, built_in = ?7, updated_at = ?8 \
                 WHERE id = ?1",
                params![
                    role.id,
                    role.name,
                    role.display_name,
                    role.description,
                    util::join_permission_list(&role.permissions),
                    role.scheme_managed,
                    role.built_in,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| write_err("Role", &role.name, e))?;
        if changed == 0 {
            return Err(PermsError::role_not_found(role.id.clone()));
        }
        self.get_role(&role.id)
    }

    fn get_role(&self, id: &str) -> PermsResult<Role> {
        self.query_role("id", id)?
            .ok_or_else(|| PermsError::role_not_found(id))
    }

    fn get_role_by_name(&self, name: &str) -> PermsResult<Role> {
        self.query_role("name", name)?
            .ok_or_else(|| PermsError::role_not_found(name))
    }

    fn get_roles_by_names(&self, names: &[String]) -> PermsResult<Vec<Role>> {
        let mut roles = Vec::with_capacity(names.len());
        for name in names {
            if let Some(role) = self.query_role("name", name)? {
                roles.push(role);
            }
        }
        Ok(roles)
    }

    fn list_roles(&self) -> PermsResult<Vec<Role>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ROLE_COLUMNS} FROM roles ORDER BY name"))
            .map_err(storage_err)?;
        stmt.query_map([], role_from_row)
            .and_then(Iterator::collect)
            .map_err(storage_err)
    }

    fn delete_role(&mut self, id: &str) -> PermsResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM roles WHERE id = ?1", params![id])
            .map_err(storage_err)?;
        if changed == 0 {
            return Err(PermsError::role_not_found(id));
        }
        Ok(())
    }

    fn save_scheme(&mut self, scheme: &Scheme) -> PermsResult<Scheme> {
        let now = Utc::now();
        let mut new_scheme = scheme.clone();
        if new_scheme.id.is_empty() {
            new_scheme.id = util::generate_id("scheme", &new_scheme.name, now, |id| {
                self.scheme_id_exists(id)
            });
        }
        new_scheme.created_at = now;
        new_scheme.updated_at = now;

        self.conn
            .execute(
                &format!(
                    "INSERT INTO schemes ({SCHEME_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
                ),
                params![
                    new_scheme.id,
                    new_scheme.name,
                    new_scheme.display_name,
                    new_scheme.description,
                    new_scheme.scope.as_str(),
                    new_scheme.default_team_admin_role,
                    new_scheme.default_team_user_role,
                    new_scheme.default_team_guest_role,
                    new_scheme.default_channel_admin_role,
                    new_scheme.default_channel_user_role,
                    new_scheme.default_channel_guest_role,
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ],
            )
            .map_err(|e| write_err("Scheme", &new_scheme.name, e))?;
        Ok(new_scheme)
    }

    fn update_scheme(&mut self, scheme: &Scheme) -> PermsResult<Scheme> {
        let changed = self
            .conn
            .execute(
                "UPDATE schemes SET name = ?2, display_name = ?3, description = ?4, scope = ?5, \
                 default_team_admin_role = ?6, default_team_user_role = ?7, \
                 default_team_guest_role = ?8, default_channel_admin_role = ?9, \
                 default_channel_user_role = ?10, default_channel_guest_role = ?11, \
                 updated_at = ?12 WHERE id = ?1",
                params![
                    scheme.id,
                    scheme.name,
                    scheme.display_name,
                    scheme.description,
                    scheme.scope.as_str(),
                    scheme.default_team_admin_role,
                    scheme.default_team_user_role,
                    scheme.default_team_guest_role,
                    scheme.default_channel_admin_role,
                    scheme.default_channel_user_role,
                    scheme.default_channel_guest_role,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| write_err("Scheme", &scheme.name, e))?;
        if changed == 0 {
            return Err(PermsError::scheme_not_found(scheme.id.clone()));
        }
        self.get_scheme(&scheme.id)
    }

    fn get_scheme(&self, id: &str) -> PermsResult<Scheme> {
        self.query_scheme("id", id)?
            .ok_or_else(|| PermsError::scheme_not_found(id))
    }

    fn get_scheme_by_name(&self, name: &str) -> PermsResult<Scheme> {
        self.query_scheme("name", name)?
            .ok_or_else(|| PermsError::scheme_not_found(name))
    }

    fn list_schemes(
        &self,
        scope: Option<SchemeScope>,
        offset: usize,
        limit: usize,
    ) -> PermsResult<Vec<Scheme>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {SCHEME_COLUMNS} FROM schemes \
                 WHERE (?1 IS NULL OR scope = ?1) \
                 ORDER BY seq DESC LIMIT ?2 OFFSET ?3"
            ))
            .map_err(storage_err)?;
        stmt.query_map(
            params![scope.map(|s| s.as_str()), sql_count(limit), sql_count(offset)],
            scheme_from_row,
        )
        .and_then(Iterator::collect)
        .map_err(storage_err)
    }

    fn count_schemes(&self, scope: Option<SchemeScope>) -> PermsResult<usize> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT count(*) FROM schemes WHERE (?1 IS NULL OR scope = ?1)",
                params![scope.map(|s| s.as_str())],
                |row| row.get(0),
            )
            .map_err(storage_err)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn delete_scheme(&mut self, id: &str) -> PermsResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM schemes WHERE id = ?1", params![id])
            .map_err(storage_err)?;
        if changed == 0 {
            return Err(PermsError::scheme_not_found(id));
        }
        Ok(())
    }

    fn get_system(&self, name: &str) -> PermsResult<Option<SystemFlag>> {
        self.conn
            .query_row(
                "SELECT value FROM systems WHERE name = ?1",
                params![name],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map(|value| value.map(|value| SystemFlag::new(name, value)))
            .map_err(storage_err)
    }

    fn insert_system(&mut self, flag: &SystemFlag) -> PermsResult<bool> {
        let changed = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO systems (name, value) VALUES (?1, ?2)",
                params![flag.name, flag.value],
            )
            .map_err(storage_err)?;
        Ok(changed == 1)
    }

    fn save_system(&mut self, flag: &SystemFlag) -> PermsResult<()> {
        self.conn
            .execute(
                "INSERT INTO systems (name, value) VALUES (?1, ?2) \
                 ON CONFLICT(name) DO UPDATE SET value = excluded.value",
                params![flag.name, flag.value],
            )
            .map_err(storage_err)?;
        Ok(())
    }

    fn delete_system(&mut self, name: &str) -> PermsResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM systems WHERE name = ?1", params![name])
            .map_err(storage_err)?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use permsync_lib::defaults;
    use permsync_lib::migration::{self, MigrationKey, MigrationOptions};
    use permsync_lib::permissions::{self, ExportOptions};
    use tempfile::TempDir;

    fn make_role(name: &str) -> Role {
        let mut role = Role {
            name: name.to_string(),
            display_name: format!("{name} role"),
            ..Role::default()
        };
        role.grant(["read_channel", "create_post"]);
        role
    }

    fn make_scheme(name: &str, scope: SchemeScope) -> Scheme {
        Scheme {
            name: name.to_string(),
            display_name: name.to_uppercase(),
            scope,
            ..Scheme::default()
        }
    }

    #[test]
    fn role_crud() {
        let mut store = SqliteStorage::open_in_memory().unwrap();
        let saved = store.save_role(&make_role("r1")).unwrap();
        assert!(!saved.id.is_empty());

        let fetched = store.get_role_by_name("r1").unwrap();
        assert_eq!(fetched.id, saved.id);
        assert_eq!(fetched.permissions, saved.permissions);
        assert_eq!(store.get_role(&saved.id).unwrap().name, "r1");

        let mut renamed = fetched.clone();
        renamed.name = "r2".into();
        renamed.grant(["upload_file"]);
        let updated = store.update_role(&renamed).unwrap();
        assert_eq!(updated.permissions.len(), 3);
        assert!(store.get_role_by_name("r1").unwrap_err().is_not_found());

        store.delete_role(&saved.id).unwrap();
        assert!(store.delete_role(&saved.id).unwrap_err().is_not_found());
    }

    #[test]
    fn role_name_is_unique() {
        let mut store = SqliteStorage::open_in_memory().unwrap();
        store.save_role(&make_role("dup")).unwrap();
        let err = store.save_role(&make_role("dup")).unwrap_err();
        assert!(matches!(err, PermsError::NameTaken { kind: "Role", .. }));
    }

    #[test]
    fn roles_by_names_keeps_order_and_skips_missing() {
        let mut store = SqliteStorage::open_in_memory().unwrap();
        store.save_role(&make_role("a")).unwrap();
        store.save_role(&make_role("b")).unwrap();
        let roles = store
            .get_roles_by_names(&["b".into(), "missing".into(), "a".into()])
            .unwrap();
        let names: Vec<_> = roles.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(store.list_roles().unwrap()[0].name, "a");
    }

    #[test]
    fn schemes_list_newest_first_by_scope() {
        let mut store = SqliteStorage::open_in_memory().unwrap();
        store.save_scheme(&make_scheme("t1", SchemeScope::Team)).unwrap();
        store.save_scheme(&make_scheme("c1", SchemeScope::Channel)).unwrap();
        store.save_scheme(&make_scheme("c2", SchemeScope::Channel)).unwrap();

        let all = store.list_schemes(None, 0, 10).unwrap();
        let names: Vec<_> = all.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["c2", "c1", "t1"]);

        let channel = store.list_schemes(Some(SchemeScope::Channel), 1, 10).unwrap();
        assert_eq!(channel.len(), 1);
        assert_eq!(channel[0].name, "c1");
        assert_eq!(store.count_schemes(Some(SchemeScope::Team)).unwrap(), 1);
        assert_eq!(store.count_schemes(None).unwrap(), 3);
    }

    #[test]
    fn scheme_update_and_delete() {
        let mut store = SqliteStorage::open_in_memory().unwrap();
        let mut scheme = store.save_scheme(&make_scheme("s", SchemeScope::Channel)).unwrap();
        scheme.default_channel_user_role = "someone".into();
        let updated = store.update_scheme(&scheme).unwrap();
        assert_eq!(updated.default_channel_user_role, "someone");
        assert_eq!(updated.scope, SchemeScope::Channel);

        store.delete_scheme(&scheme.id).unwrap();
        assert!(store.get_scheme(&scheme.id).unwrap_err().is_not_found());
        assert!(
            store
                .save_scheme(&make_scheme("s", SchemeScope::Team))
                .is_ok()
        );
        assert!(matches!(
            store.save_scheme(&make_scheme("s", SchemeScope::Team)),
            Err(PermsError::NameTaken { kind: "Scheme", .. })
        ));
    }

    #[test]
    fn system_flags() {
        let mut store = SqliteStorage::open_in_memory().unwrap();
        assert!(store.get_system("k").unwrap().is_none());
        assert!(store.insert_system(&SystemFlag::new("k", "true")).unwrap());
        assert!(!store.insert_system(&SystemFlag::new("k", "other")).unwrap());
        assert_eq!(store.get_system("k").unwrap().unwrap().value, "true");

        store.save_system(&SystemFlag::new("k", "false")).unwrap();
        assert_eq!(store.get_system("k").unwrap().unwrap().value, "false");
        assert!(store.delete_system("k").unwrap());
        assert!(!store.delete_system("k").unwrap());
    }

    #[test]
    fn data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("permsync.db");
        {
            let mut store = SqliteStorage::open(&path).unwrap();
            migration::run_migrations(&mut store, &MigrationOptions::default()).unwrap();
        }
        let store = SqliteStorage::open(&path).unwrap();
        assert_eq!(store.path(), Some(path.as_path()));
        assert_eq!(store.count_schemes(None).unwrap(), 2);
        assert!(
            migration::migration_state(&store, MigrationKey::DefaultSchemes)
                .unwrap()
                .is_completed()
        );
        let admin = store.get_role_by_name(defaults::SYSTEM_ADMIN).unwrap();
        for permission in defaults::SYSTEM_ADMIN_REQUIRED {
            assert!(admin.has_permission(permission));
        }
    }

    #[test]
    fn export_import_between_databases() {
        crate::logging::init_test_logging();
        let mut source = SqliteStorage::open_in_memory().unwrap();
        migration::run_migrations(&mut source, &MigrationOptions::default()).unwrap();
        permissions::create_scheme(&mut source, &make_scheme("support", SchemeScope::Channel))
            .unwrap();

        let mut out = Vec::new();
        let summary =
            permissions::export_permissions(&source, &mut out, &ExportOptions::default()).unwrap();
        assert_eq!(summary.schemes, 3);

        let mut target = SqliteStorage::open_in_memory().unwrap();
        migration::run_migrations(&mut target, &MigrationOptions::none()).unwrap();
        let imported = permissions::import_permissions(&mut target, out.as_slice()).unwrap();
        assert_eq!(imported.created.len(), 3);
        assert_eq!(target.count_schemes(None).unwrap(), 3);

        let again = permissions::import_permissions(&mut target, out.as_slice()).unwrap();
        assert_eq!(again.skipped.len(), 3);
        assert_eq!(target.count_schemes(None).unwrap(), 3);
    }
}
