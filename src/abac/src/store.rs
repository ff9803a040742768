//! Permission record store
//!
//! The engine only reads from the store: one lookup per ability build, returning
//! the user together with the permission records of their role. Writers (role
//! management) live outside the engine and must call
//! [`AbilityEngine::invalidate_user`](crate::engine::AbilityEngine::invalidate_user)
//! after changing what a user is allowed to do.

use crate::error::Result;
use crate::types::{PermissionRecord, UserContext, UserId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Read interface of the permission store
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Load a user and the permissions of their role.
    ///
    /// Returns `Ok(None)` for an unknown user. Backend failures should be
    /// reported as [`AbacError::StoreUnavailable`](crate::AbacError::StoreUnavailable).
    async fn find_user_with_role_permissions(&self, user_id: UserId) -> Result<Option<UserContext>>;
}

#[derive(Debug, Clone)]
struct UserRecord {
    email: String,
    role: Option<String>,
}

/// In-memory permission store
///
/// Models the relational layout (users reference a role, roles own permission
/// records). Useful for tests and for embedding the engine without a database.
pub struct InMemoryPermissionStore {
    users: Arc<RwLock<HashMap<UserId, UserRecord>>>,
    roles: Arc<RwLock<HashMap<String, Vec<PermissionRecord>>>>,
}

impl InMemoryPermissionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            roles: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create or replace a role's permission set
    pub async fn put_role(&self, name: impl Into<String>, permissions: Vec<PermissionRecord>) {
        let mut roles = self.roles.write().await;
        roles.insert(name.into(), permissions);
    }

    /// Remove a role. Users keep referencing it and end up with no permissions.
    pub async fn remove_role(&self, name: &str) -> bool {
        let mut roles = self.roles.write().await;
        roles.remove(name).is_some()
    }

    /// Create or replace a user
    pub async fn put_user(&self, id: UserId, email: impl Into<String>, role: Option<&str>) {
        let mut users = self.users.write().await;
        users.insert(
            id,
            UserRecord {
                email: email.into(),
                role: role.map(str::to_string),
            },
        );
    }

    /// Remove a user
    pub async fn remove_user(&self, id: UserId) -> bool {
        let mut users = self.users.write().await;
        users.remove(&id).is_some()
    }
}

impl Default for InMemoryPermissionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn find_user_with_role_permissions(&self, user_id: UserId) -> Result<Option<UserContext>> {
        let user = {
            let users = self.users.read().await;
            match users.get(&user_id) {
                Some(user) => user.clone(),
                None => return Ok(None),
            }
        };

        let permissions = match &user.role {
            Some(role) => {
                let roles = self.roles.read().await;
                roles.get(role).cloned().unwrap_or_default()
            }
            None => Vec::new(),
        };

        Ok(Some(UserContext {
            id: user_id,
            email: user.email,
            role: user.role,
            permissions,
        }))
    }
}
