use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::{error::Result, models::*};

/// Storage for roles and user grants
#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn save_role(&self, role: Role) -> Result<()>;

    async fn get_role(&self, name: &str) -> Result<Option<Role>>;

    async fn list_roles(&self) -> Result<Vec<Role>>;

    async fn add_user_role(&self, user_id: Uuid, role: &str) -> Result<()>;

    async fn remove_user_role(&self, user_id: Uuid, role: &str) -> Result<()>;

    async fn user_roles(&self, user_id: Uuid) -> Result<BTreeSet<String>>;

    async fn add_user_permission(&self, user_id: Uuid, permission: Permission) -> Result<()>;

    async fn user_permissions(&self, user_id: Uuid) -> Result<BTreeSet<Permission>>;
}

/// In-memory role repository for testing and development
#[derive(Default)]
pub struct InMemoryRoleRepository {
    roles: DashMap<String, Role>,
    user_roles: DashMap<Uuid, BTreeSet<String>>,
    user_permissions: DashMap<Uuid, BTreeSet<Permission>>,
}

impl InMemoryRoleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn save_role(&self, role: Role) -> Result<()> {
        self.roles.insert(role.name.clone(), role);
        Ok(())
    }

    async fn get_role(&self, name: &str) -> Result<Option<Role>> {
        Ok(self.roles.get(name).map(|r| r.value().clone()))
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        let mut roles: Vec<Role> = self.roles.iter().map(|r| r.value().clone()).collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn add_user_role(&self, user_id: Uuid, role: &str) -> Result<()> {
        self.user_roles.entry(user_id).or_default().insert(role.to_string());
        Ok(())
    }

    async fn remove_user_role(&self, user_id: Uuid, role: &str) -> Result<()> {
        if let Some(mut roles) = self.user_roles.get_mut(&user_id) {
            roles.remove(role);
        }
        Ok(())
    }

    async fn user_roles(&self, user_id: Uuid) -> Result<BTreeSet<String>> {
        Ok(self.user_roles.get(&user_id).map(|r| r.value().clone()).unwrap_or_default())
    }

    async fn add_user_permission(&self, user_id: Uuid, permission: Permission) -> Result<()> {
        self.user_permissions.entry(user_id).or_default().insert(permission);
        Ok(())
    }

    async fn user_permissions(&self, user_id: Uuid) -> Result<BTreeSet<Permission>> {
        Ok(self
            .user_permissions
            .get(&user_id)
            .map(|p| p.value().clone())
            .unwrap_or_default())
    }
}
