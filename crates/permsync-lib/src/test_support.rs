//! Store wrappers for exercising failure paths.

use crate::error::{PermsError, Result};
use crate::model::{Role, Scheme, SchemeScope, SystemFlag};
use crate::store::PermissionStore;

/// Delegates to an inner store and injects failures on request.
pub struct FailingStore<'a, S: PermissionStore> {
    inner: &'a mut S,
    role_saves_left: Option<usize>,
    role_deletes_left: Option<usize>,
    lose_flag_races: bool,
}

impl<'a, S: PermissionStore> FailingStore<'a, S> {
    pub fn new(inner: &'a mut S) -> Self {
        Self {
            inner,
            role_saves_left: None,
            role_deletes_left: None,
            lose_flag_races: false,
        }
    }

    /// Let `n` role saves succeed, then fail every later one.
    pub fn fail_role_saves_after(mut self, n: usize) -> Self {
        self.role_saves_left = Some(n);
        self
    }

    /// Let `n` role deletes succeed, then fail every later one.
    pub fn fail_role_deletes_after(mut self, n: usize) -> Self {
        self.role_deletes_left = Some(n);
        self
    }

    /// Write flags but report them as already present.
    pub fn lose_flag_races(mut self) -> Self {
        self.lose_flag_races = true;
        self
    }
}

impl<S: PermissionStore> PermissionStore for FailingStore<'_, S> {
    fn save_role(&mut self, role: &Role) -> Result<Role> {
        if let Some(left) = self.role_saves_left.as_mut() {
            if *left == 0 {
                return Err(PermsError::Storage(format!("injected failure saving {}", role.name)));
            }
            *left -= 1;
        }
        self.inner.save_role(role)
    }

    fn update_role(&mut self, role: &Role) -> Result<Role> {
        self.inner.update_role(role)
    }

    fn get_role(&self, id: &str) -> Result<Role> {
        self.inner.get_role(id)
    }

    fn get_role_by_name(&self, name: &str) -> Result<Role> {
        self.inner.get_role_by_name(name)
    }

    fn get_roles_by_names(&self, names: &[String]) -> Result<Vec<Role>> {
        self.inner.get_roles_by_names(names)
    }

    fn list_roles(&self) -> Result<Vec<Role>> {
        self.inner.list_roles()
    }

    fn delete_role(&mut self, id: &str) -> Result<()> {
        if let Some(left) = self.role_deletes_left.as_mut() {
            if *left == 0 {
                return Err(PermsError::Storage(format!("injected failure deleting {id}")));
            }
            *left -= 1;
        }
        self.inner.delete_role(id)
    }

    fn save_scheme(&mut self, scheme: &Scheme) -> Result<Scheme> {
        self.inner.save_scheme(scheme)
    }

    fn update_scheme(&mut self, scheme: &Scheme) -> Result<Scheme> {
        self.inner.update_scheme(scheme)
    }

    fn get_scheme(&self, id: &str) -> Result<Scheme> {
        self.inner.get_scheme(id)
    }

    fn get_scheme_by_name(&self, name: &str) -> Result<Scheme> {
        self.inner.get_scheme_by_name(name)
    }

    fn list_schemes(
        &self,
        scope: Option<SchemeScope>,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Scheme>> {
        self.inner.list_schemes(scope, offset, limit)
    }

    fn count_schemes(&self, scope: Option<SchemeScope>) -> Result<usize> {
        self.inner.count_schemes(scope)
    }

    fn delete_scheme(&mut self, id: &str) -> Result<()> {
        self.inner.delete_scheme(id)
    }

    fn get_system(&self, name: &str) -> Result<Option<SystemFlag>> {
        self.inner.get_system(name)
    }

    fn insert_system(&mut self, flag: &SystemFlag) -> Result<bool> {
        if self.lose_flag_races {
            self.inner.save_system(flag)?;
            return Ok(false);
        }
        self.inner.insert_system(flag)
    }

    fn save_system(&mut self, flag: &SystemFlag) -> Result<()> {
        self.inner.save_system(flag)
    }

    fn delete_system(&mut self, name: &str) -> Result<bool> {
        self.inner.delete_system(name)
    }
}
