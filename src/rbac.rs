//! Role-based access control.
//!
//! A [`RoleStore`] maps role names to flat permission sets. It is owned by the
//! caller and shared by handle (`Arc<RoleStore>`); lookups take a read lock and
//! administrative changes take the write lock.

use std::collections::{BTreeSet, HashMap, HashSet};

use parking_lot::RwLock;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct RoleStore {
    roles: RwLock<HashMap<String, HashSet<String>>>,
}

impl RoleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Define `name` with exactly `permissions`, replacing any previous set.
    pub fn define_role<I, P>(&self, name: impl Into<String>, permissions: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let name = name.into();
        let permissions: HashSet<String> = permissions.into_iter().map(Into::into).collect();
        info!(role = %name, permissions = permissions.len(), "role defined");
        self.roles.write().insert(name, permissions);
    }

    /// Remove a role. Returns whether it existed.
    pub fn remove_role(&self, name: &str) -> bool {
        let removed = self.roles.write().remove(name).is_some();
        if removed {
            info!(role = %name, "role removed");
        }
        removed
    }

    /// Whether `role` grants `permission`. Undefined roles grant nothing.
    #[must_use]
    pub fn check_permission(&self, role: &str, permission: &str) -> bool {
        let granted = self
            .roles
            .read()
            .get(role)
            .is_some_and(|permissions| permissions.contains(permission));
        debug!(%role, %permission, granted, "permission check");
        granted
    }

    /// Sorted permissions of `role`, or `None` if it is not defined.
    #[must_use]
    pub fn permissions(&self, role: &str) -> Option<BTreeSet<String>> {
        self.roles
            .read()
            .get(role)
            .map(|permissions| permissions.iter().cloned().collect())
    }

    /// Sorted names of every defined role.
    #[must_use]
    pub fn roles(&self) -> BTreeSet<String> {
        self.roles.read().keys().cloned().collect()
    }
}
