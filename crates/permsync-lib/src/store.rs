//! Store abstraction and the in-memory backend.
//!
//! `PermissionStore` is the seam every service operation is written
//! against. `InMemoryStore` keeps everything in maps and can persist a
//! JSON snapshot; the `permsync` binary provides a SQLite backend.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{PermsError, Result};
use crate::model::{Role, Scheme, SchemeScope, SystemFlag};
use crate::util;

/// Persistence operations for roles, schemes and system flags.
///
/// Each call is atomic on its own; there is no multi-call transaction.
pub trait PermissionStore {
    // === Roles ===

    /// Insert a new role, assigning an id when empty.
    ///
    /// # Errors
    ///
    /// Returns `NameTaken` if a role with the same name exists.
    fn save_role(&mut self, role: &Role) -> Result<Role>;

    /// Overwrite the role with `role.id`.
    ///
    /// # Errors
    ///
    /// Returns `RoleNotFound` for an unknown id, `NameTaken` on a rename clash.
    fn update_role(&mut self, role: &Role) -> Result<Role>;

    /// # Errors
    ///
    /// Returns `RoleNotFound` for an unknown id.
    fn get_role(&self, id: &str) -> Result<Role>;

    /// # Errors
    ///
    /// Returns `RoleNotFound` if no role has this name.
    fn get_role_by_name(&self, name: &str) -> Result<Role>;

    /// Fetch the roles whose names are listed; missing names are omitted.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    fn get_roles_by_names(&self, names: &[String]) -> Result<Vec<Role>>;

    /// All roles ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    fn list_roles(&self) -> Result<Vec<Role>>;

    /// # Errors
    ///
    /// Returns `RoleNotFound` for an unknown id.
    fn delete_role(&mut self, id: &str) -> Result<()>;

    // === Schemes ===

    /// Insert a new scheme, assigning an id when empty.
    ///
    /// # Errors
    ///
    /// Returns `NameTaken` if a scheme with the same name exists.
    fn save_scheme(&mut self, scheme: &Scheme) -> Result<Scheme>;

    /// Overwrite the scheme with `scheme.id`.
    ///
    /// # Errors
    ///
    /// Returns `SchemeNotFound` for an unknown id.
    fn update_scheme(&mut self, scheme: &Scheme) -> Result<Scheme>;

    /// # Errors
    ///
    /// Returns `SchemeNotFound` for an unknown id.
    fn get_scheme(&self, id: &str) -> Result<Scheme>;

    /// # Errors
    ///
    /// Returns `SchemeNotFound` if no scheme has this name.
    fn get_scheme_by_name(&self, name: &str) -> Result<Scheme>;

    /// A page of schemes, newest first, optionally filtered by scope.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    fn list_schemes(
        &self,
        scope: Option<SchemeScope>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Scheme>>;

    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    fn count_schemes(&self, scope: Option<SchemeScope>) -> Result<usize>;

    /// # Errors
    ///
    /// Returns `SchemeNotFound` for an unknown id.
    fn delete_scheme(&mut self, id: &str) -> Result<()>;

    // === System flags ===

    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    fn get_system(&self, name: &str) -> Result<Option<SystemFlag>>;

    /// Insert a flag unless the key exists; returns whether it was written.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    fn insert_system(&mut self, flag: &SystemFlag) -> Result<bool>;

    /// Insert or overwrite a flag.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    fn save_system(&mut self, flag: &SystemFlag) -> Result<()>;

    /// Remove a flag; returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on backend failure.
    fn delete_system(&mut self, name: &str) -> Result<bool>;
}

/// Serialized form of an `InMemoryStore`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    roles: Vec<Role>,
    /// Oldest first.
    #[serde(default)]
    schemes: Vec<Scheme>,
    #[serde(default)]
    systems: BTreeMap<String, String>,
}

/// In-memory permission store.
///
/// All data lives in memory. Use `open()` to load a snapshot file and
/// `save()` to persist back.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    /// Keyed by role name.
    roles: BTreeMap<String, Role>,
    /// Role id -> role name.
    role_ids: HashMap<String, String>,
    /// Insertion order, oldest first.
    schemes: Vec<Scheme>,
    systems: BTreeMap<String, String>,
    snapshot_path: Option<PathBuf>,
}

impl InMemoryStore {
    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open and load from a snapshot file.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` if the file is missing, or `Json` if it does not parse.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PermsError::FileNotFound(path.to_path_buf())
            } else {
                PermsError::Io(e)
            }
        })?;
        let snapshot: Snapshot = if raw.trim().is_empty() {
            Snapshot::default()
        } else {
            serde_json::from_str(&raw)?
        };

        let mut store = Self::new();
        store.snapshot_path = Some(path.to_path_buf());
        for role in snapshot.roles {
            store.role_ids.insert(role.id.clone(), role.name.clone());
            store.roles.insert(role.name.clone(), role);
        }
        store.schemes = snapshot.schemes;
        store.systems = snapshot.systems;

        tracing::debug!(
            roles = store.roles.len(),
            schemes = store.schemes.len(),
            "Loaded snapshot from {}",
            path.display()
        );
        Ok(store)
    }

    /// Save to the file that was opened.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if no file path is set, or `Io` on write failure.
    pub fn save(&self) -> Result<()> {
        let path = self
            .snapshot_path
            .as_ref()
            .ok_or_else(|| PermsError::Storage("No file path set; use save_to()".to_string()))?;
        self.save_to(path.clone())
    }

    /// Save to a specific file path with write-to-temp + rename.
    ///
    /// # Errors
    ///
    /// Returns `Io` on write failure.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let snapshot = Snapshot {
            roles: self.roles.values().cloned().collect(),
            schemes: self.schemes.clone(),
            systems: self.systems.clone(),
        };

        let tmp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path)?;
        serde_json::to_writer_pretty(&mut file, &snapshot)?;
        file.write_all(b"\n")?;
        file.flush()?;
        drop(file);

        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    #[must_use]
    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    #[must_use]
    pub fn scheme_count(&self) -> usize {
        self.schemes.len()
    }

    fn scheme_index(&self, id: &str) -> Result<usize> {
        self.schemes
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| PermsError::scheme_not_found(id))
    }
}

impl PermissionStore for InMemoryStore {
    fn save_role(&mut self, role: &Role) -> Result<Role> {
        if self.roles.contains_key(&role.name) {
            return Err(PermsError::NameTaken {
                kind: "Role",
                name: role.name.clone(),
            });
        }

        let now = Utc::now();
        let mut new_role = role.clone();
        if new_role.id.is_empty() {
            new_role.id = util::generate_id("role", &new_role.name, now, |id| {
                self.role_ids.contains_key(id)
            });
        } else if self.role_ids.contains_key(&new_role.id) {
            return Err(PermsError::Storage(format!(
                "role id collision: {}",
                new_role.id
            )));
        }
        new_role.created_at = now;
        new_role.updated_at = now;

        self.role_ids
            .insert(new_role.id.clone(), new_role.name.clone());
        self.roles.insert(new_role.name.clone(), new_role.clone());
        Ok(new_role)
    }

    fn update_role(&mut self, role: &Role) -> Result<Role> {
        let old_name = self
            .role_ids
            .get(&role.id)
            .cloned()
            .ok_or_else(|| PermsError::role_not_found(role.id.clone()))?;

        if old_name != role.name && self.roles.contains_key(&role.name) {
            return Err(PermsError::NameTaken {
                kind: "Role",
                name: role.name.clone(),
            });
        }

        let created_at = self
            .roles
            .remove(&old_name)
            .map_or_else(Utc::now, |r| r.created_at);
        let mut updated = role.clone();
        updated.created_at = created_at;
        updated.updated_at = Utc::now();

        self.role_ids.insert(updated.id.clone(), updated.name.clone());
        self.roles.insert(updated.name.clone(), updated.clone());
        Ok(updated)
    }

    fn get_role(&self, id: &str) -> Result<Role> {
        self.role_ids
            .get(id)
            .and_then(|name| self.roles.get(name))
            .cloned()
            .ok_or_else(|| PermsError::role_not_found(id))
    }

    fn get_role_by_name(&self, name: &str) -> Result<Role> {
        self.roles
            .get(name)
            .cloned()
            .ok_or_else(|| PermsError::role_not_found(name))
    }

    fn get_roles_by_names(&self, names: &[String]) -> Result<Vec<Role>> {
        Ok(names
            .iter()
            .filter_map(|name| self.roles.get(name))
            .cloned()
            .collect())
    }

    fn list_roles(&self) -> Result<Vec<Role>> {
        Ok(self.roles.values().cloned().collect())
    }

    fn delete_role(&mut self, id: &str) -> Result<()> {
        let name = self
            .role_ids
            .remove(id)
            .ok_or_else(|| PermsError::role_not_found(id))?;
        self.roles.remove(&name);
        Ok(())
    }

    fn save_scheme(&mut self, scheme: &Scheme) -> Result<Scheme> {
        if self.schemes.iter().any(|s| s.name == scheme.name) {
            return Err(PermsError::NameTaken {
                kind: "Scheme",
                name: scheme.name.clone(),
            });
        }

        let now = Utc::now();
        let mut new_scheme = scheme.clone();
        if new_scheme.id.is_empty() {
            new_scheme.id = util::generate_id("scheme", &new_scheme.name, now, |id| {
                self.schemes.iter().any(|s| s.id == id)
            });
        }
        new_scheme.created_at = now;
        new_scheme.updated_at = now;

        self.schemes.push(new_scheme.clone());
        Ok(new_scheme)
    }

    fn update_scheme(&mut self, scheme: &Scheme) -> Result<Scheme> {
        let idx = self.scheme_index(&scheme.id)?;
        if self
            .schemes
            .iter()
            .any(|s| s.id != scheme.id && s.name == scheme.name)
        {
            return Err(PermsError::NameTaken {
                kind: "Scheme",
                name: scheme.name.clone(),
            });
        }

        let mut updated = scheme.clone();
        updated.created_at = self.schemes[idx].created_at;
        updated.updated_at = Utc::now();
        self.schemes[idx] = updated.clone();
        Ok(updated)
    }

    fn get_scheme(&self, id: &str) -> Result<Scheme> {
        let idx = self.scheme_index(id)?;
        Ok(self.schemes[idx].clone())
    }

    fn get_scheme_by_name(&self, name: &str) -> Result<Scheme> {
        self.schemes
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| PermsError::scheme_not_found(name))
    }

    fn list_schemes(
        &self,
        scope: Option<SchemeScope>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Scheme>> {
        Ok(self
            .schemes
            .iter()
            .rev()
            .filter(|s| scope.is_none_or(|scope| s.scope == scope))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn count_schemes(&self, scope: Option<SchemeScope>) -> Result<usize> {
        Ok(self
            .schemes
            .iter()
            .filter(|s| scope.is_none_or(|scope| s.scope == scope))
            .count())
    }

    fn delete_scheme(&mut self, id: &str) -> Result<()> {
        let idx = self.scheme_index(id)?;
        self.schemes.remove(idx);
        Ok(())
    }

    fn get_system(&self, name: &str) -> Result<Option<SystemFlag>> {
        Ok(self
            .systems
            .get(name)
            .map(|value| SystemFlag::new(name, value.clone())))
    }

    fn insert_system(&mut self, flag: &SystemFlag) -> Result<bool> {
        if self.systems.contains_key(&flag.name) {
            return Ok(false);
        }
        self.systems.insert(flag.name.clone(), flag.value.clone());
        Ok(true)
    }

    fn save_system(&mut self, flag: &SystemFlag) -> Result<()> {
        self.systems.insert(flag.name.clone(), flag.value.clone());
        Ok(())
    }

    fn delete_system(&mut self, name: &str) -> Result<bool> {
        Ok(self.systems.remove(name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_role(name: &str) -> Role {
        Role {
            name: name.to_string(),
            ..Role::default()
        }
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
    fn test_save_and_get_role() {
        let mut store = InMemoryStore::new();
        let saved = store.save_role(&make_role("r1")).unwrap();
        assert_eq!(saved.id.len(), util::ID_LENGTH);

        let by_name = store.get_role_by_name("r1").unwrap();
        assert_eq!(by_name.id, saved.id);
        let by_id = store.get_role(&saved.id).unwrap();
        assert_eq!(by_id.name, "r1");
    }

    #[test]
    fn test_role_name_collision() {
        let mut store = InMemoryStore::new();
        store.save_role(&make_role("r1")).unwrap();
        let err = store.save_role(&make_role("r1")).unwrap_err();
        assert!(matches!(err, PermsError::NameTaken { kind: "Role", .. }));
    }

    #[test]
    fn test_get_missing_role() {
        let store = InMemoryStore::new();
        let err = store.get_role_by_name("nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_update_role_rename() {
        let mut store = InMemoryStore::new();
        let mut role = store.save_role(&make_role("before")).unwrap();
        role.name = "after".into();
        role.grant(["read_channel"]);
        store.update_role(&role).unwrap();

        assert!(store.get_role_by_name("before").is_err());
        let after = store.get_role_by_name("after").unwrap();
        assert!(after.has_permission("read_channel"));
        assert_eq!(store.role_count(), 1);
    }

    #[test]
    fn test_get_roles_by_names_skips_missing() {
        let mut store = InMemoryStore::new();
        store.save_role(&make_role("a")).unwrap();
        store.save_role(&make_role("b")).unwrap();
        let found = store
            .get_roles_by_names(&["a".to_string(), "zzz".to_string(), "b".to_string()])
            .unwrap();
        let names: Vec<&str> = found.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_delete_role() {
        let mut store = InMemoryStore::new();
        let role = store.save_role(&make_role("gone")).unwrap();
        store.delete_role(&role.id).unwrap();
        assert!(store.get_role_by_name("gone").is_err());
        assert!(store.delete_role(&role.id).is_err());
    }

    #[test]
    fn test_list_schemes_newest_first_with_scope() {
        let mut store = InMemoryStore::new();
        store
            .save_scheme(&make_scheme("t1", SchemeScope::Team))
            .unwrap();
        store
            .save_scheme(&make_scheme("c1", SchemeScope::Channel))
            .unwrap();
        store
            .save_scheme(&make_scheme("c2", SchemeScope::Channel))
            .unwrap();

        let all = store.list_schemes(None, 0, 100).unwrap();
        let names: Vec<&str> = all.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["c2", "c1", "t1"]);

        let channel = store
            .list_schemes(Some(SchemeScope::Channel), 1, 100)
            .unwrap();
        assert_eq!(channel.len(), 1);
        assert_eq!(channel[0].name, "c1");
        assert_eq!(store.count_schemes(Some(SchemeScope::Team)).unwrap(), 1);
    }

    #[test]
    fn test_scheme_name_unique() {
        let mut store = InMemoryStore::new();
        store
            .save_scheme(&make_scheme("dup", SchemeScope::Team))
            .unwrap();
        let err = store
            .save_scheme(&make_scheme("dup", SchemeScope::Channel))
            .unwrap_err();
        assert!(matches!(err, PermsError::NameTaken { kind: "Scheme", .. }));
    }

    #[test]
    fn test_update_and_delete_scheme() {
        let mut store = InMemoryStore::new();
        let mut scheme = store
            .save_scheme(&make_scheme("s", SchemeScope::Channel))
            .unwrap();
        scheme.description = "changed".into();
        store.update_scheme(&scheme).unwrap();
        assert_eq!(store.get_scheme(&scheme.id).unwrap().description, "changed");

        store.delete_scheme(&scheme.id).unwrap();
        assert!(store.get_scheme(&scheme.id).unwrap_err().is_not_found());
        assert!(store.get_scheme_by_name("s").is_err());
    }

    #[test]
    fn test_system_flags() {
        let mut store = InMemoryStore::new();
        let flag = SystemFlag::new("k", "true");
        assert!(store.get_system("k").unwrap().is_none());
        assert!(store.insert_system(&flag).unwrap());
        assert!(!store.insert_system(&SystemFlag::new("k", "other")).unwrap());
        assert_eq!(store.get_system("k").unwrap().unwrap().value, "true");

        store.save_system(&SystemFlag::new("k", "false")).unwrap();
        assert_eq!(store.get_system("k").unwrap().unwrap().value, "false");
        assert!(store.delete_system("k").unwrap());
        assert!(!store.delete_system("k").unwrap());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = InMemoryStore::new();
        let mut role = make_role("r1");
        role.grant(["create_post"]);
        store.save_role(&role).unwrap();
        store
            .save_scheme(&make_scheme("s1", SchemeScope::Team))
            .unwrap();
        store
            .save_scheme(&make_scheme("s2", SchemeScope::Channel))
            .unwrap();
        store.save_system(&SystemFlag::new("flag", "true")).unwrap();
        store.save_to(&path).unwrap();

        let loaded = InMemoryStore::open(&path).unwrap();
        assert_eq!(loaded.role_count(), 1);
        assert!(
            loaded
                .get_role_by_name("r1")
                .unwrap()
                .has_permission("create_post")
        );
        let names: Vec<String> = loaded
            .list_schemes(None, 0, 10)
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["s2", "s1"]);
        assert!(loaded.get_system("flag").unwrap().is_some());
        loaded.save().unwrap();
    }

    #[test]
    fn test_open_missing_file() {
        let err = InMemoryStore::open("/nonexistent/store.json").unwrap_err();
        assert!(matches!(err, PermsError::FileNotFound(_)));
    }

    #[test]
    fn test_save_without_path() {
        let store = InMemoryStore::new();
        assert!(matches!(store.save(), Err(PermsError::Storage(_))));
    }
}
