use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::{RbacError, Result},
    models::*,
    repository::{InMemoryRoleRepository, RoleRepository},
};

/// Permission names checked by the NiCare services
pub mod permissions {
    pub const ENROLLEES_MANAGE: &str = "enrollees.manage";
    pub const FACILITIES_MANAGE: &str = "facilities.manage";
    pub const PREMIUMS_MANAGE: &str = "premiums.manage";
    pub const REFERRALS_CREATE: &str = "referrals.create";
    pub const REFERRALS_APPROVE: &str = "referrals.approve";
    pub const REFERRALS_VALIDATE_UTN: &str = "referrals.validate_utn";
    pub const PA_CODES_REQUEST: &str = "pa_codes.request";
    pub const PA_CODES_APPROVE: &str = "pa_codes.approve";
    pub const ADMISSIONS_MANAGE: &str = "admissions.manage";
    pub const BUNDLES_MANAGE: &str = "bundles.manage";
    pub const CLAIMS_CREATE: &str = "claims.create";
    pub const CLAIMS_SUBMIT: &str = "claims.submit";
    pub const CLAIMS_REVIEW: &str = "claims.review";
    pub const CLAIMS_PAY: &str = "claims.pay";
}

/// Role-based access control
pub struct AccessControl {
    repository: Arc<dyn RoleRepository>,
}

impl AccessControl {
    pub fn new(repository: Arc<dyn RoleRepository>) -> Self {
        Self { repository }
    }

    /// In-memory access control seeded with the standard NiCare roles
    pub async fn with_default_roles() -> Result<Self> {
        use permissions::*;

        let engine = Self::new(Arc::new(InMemoryRoleRepository::new()));
        let defaults: [(&str, &[&str]); 5] = [
            ("super_admin", &["*"]),
            ("enrollment_officer", &[ENROLLEES_MANAGE, PREMIUMS_MANAGE, FACILITIES_MANAGE]),
            (
                "facility_user",
                &[
                    REFERRALS_CREATE,
                    REFERRALS_VALIDATE_UTN,
                    PA_CODES_REQUEST,
                    ADMISSIONS_MANAGE,
                    CLAIMS_CREATE,
                    CLAIMS_SUBMIT,
                ],
            ),
            ("claims_officer", &[CLAIMS_REVIEW, CLAIMS_PAY]),
            (
                "medical_director",
                &[REFERRALS_APPROVE, PA_CODES_APPROVE, BUNDLES_MANAGE, CLAIMS_REVIEW],
            ),
        ];
        for (name, perms) in defaults {
            engine.define_role(name, perms).await?;
        }
        Ok(engine)
    }

    // =============================================================================
    // Role Management
    // =============================================================================

    /// Create or replace a role
    pub async fn define_role(&self, name: &str, permissions: &[&str]) -> Result<Role> {
        let role = Role::new(name, permissions)?;
        info!(role = name, permissions = role.permissions.len(), "defining role");
        self.repository.save_role(role.clone()).await?;
        Ok(role)
    }

    pub async fn roles(&self) -> Result<Vec<Role>> {
        self.repository.list_roles().await
    }

    pub async fn assign_role(&self, user_id: Uuid, role: &str) -> Result<()> {
        if self.repository.get_role(role).await?.is_none() {
            return Err(RbacError::RoleNotFound(role.to_string()));
        }
        info!(%user_id, role, "assigning role");
        self.repository.add_user_role(user_id, role).await
    }

    pub async fn revoke_role(&self, user_id: Uuid, role: &str) -> Result<()> {
        if self.repository.get_role(role).await?.is_none() {
            return Err(RbacError::RoleNotFound(role.to_string()));
        }
        info!(%user_id, role, "revoking role");
        self.repository.remove_user_role(user_id, role).await
    }

    /// Grant a permission directly to a user, outside any role
    pub async fn grant_permission(&self, user_id: Uuid, permission: &str) -> Result<()> {
        let permission = Permission::new(permission)?;
        info!(%user_id, %permission, "granting direct permission");
        self.repository.add_user_permission(user_id, permission).await
    }

    // =============================================================================
    // Checks
    // =============================================================================

    /// Union of role and direct permissions
    pub async fn permissions_for(&self, user_id: Uuid) -> Result<BTreeSet<Permission>> {
        let mut granted = self.repository.user_permissions(user_id).await?;
        for role_name in self.repository.user_roles(user_id).await? {
            match self.repository.get_role(&role_name).await? {
                Some(role) => granted.extend(role.permissions),
                // role deleted after assignment
                None => debug!(%user_id, role = %role_name, "skipping unknown role"),
            }
        }
        Ok(granted)
    }

    pub async fn check(&self, actor: &Actor, permission: &str) -> Result<bool> {
        let required = Permission::new(permission)?;
        let granted = self.permissions_for(actor.user_id).await?;
        Ok(granted.iter().any(|p| p.grants(&required)))
    }

    /// `check`, failing with `Forbidden` when the permission is missing
    pub async fn authorize(&self, actor: &Actor, permission: &str) -> Result<()> {
        if self.check(actor, permission).await? {
            return Ok(());
        }
        warn!(user_id = %actor.user_id, permission, "permission denied");
        Err(RbacError::Forbidden {
            user: actor.name.clone(),
            permission: permission.to_string(),
        })
    }
}
