//! Permission checks for the authenticated caller.
//!
//! A merchant owner holds every permission inside its own tenant. A staff
//! user holds exactly the codes granted by its role, and only while it is
//! active and belongs to the merchant named in the identity.

use crate::auth::context::RequestIdentity;
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::role_repository::RoleRepository;
use crate::repositories::user_repository::UserRepository;
use sqlx::SqlitePool;

/// Permission codes seeded by the migrations.
pub mod permissions {
    pub const USER_READ: &str = "user.read";
    pub const USER_CREATE: &str = "user.create";
    pub const USER_UPDATE: &str = "user.update";
    pub const USER_DELETE: &str = "user.delete";
    pub const ROLE_READ: &str = "role.read";
    pub const ROLE_CREATE: &str = "role.create";
    pub const SESSION_REVOKE_ALL: &str = "session.revoke_all";
    pub const MERCHANT_UPDATE: &str = "merchant.update";
}

pub struct AuthorizationGate<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AuthorizationGate<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Fails with `PermissionDenied` unless the caller holds `permission`.
    pub async fn require(&self, identity: &RequestIdentity, permission: &str) -> ServiceResult<()> {
        if self.has_permission(identity, permission).await? {
            return Ok(());
        }

        tracing::debug!(
            merchant_id = %identity.merchant_id(),
            user_id = identity.user_id().unwrap_or("-"),
            permission,
            "Permission denied"
        );
        Err(ServiceError::permission_denied(format!(
            "missing permission '{}'",
            permission
        )))
    }

    /// Fails unless the caller holds every code in `permissions`. Used before
    /// handing permissions to someone else.
    pub async fn require_all<S: AsRef<str>>(
        &self,
        identity: &RequestIdentity,
        permissions: &[S],
    ) -> ServiceResult<()> {
        for permission in permissions {
            self.require(identity, permission.as_ref()).await?;
        }
        Ok(())
    }

    /// Fails unless the caller holds every permission the role grants.
    /// Unknown roles pass here and are rejected by the service layer.
    pub async fn require_assignable_role(
        &self,
        identity: &RequestIdentity,
        role_id: &str,
    ) -> ServiceResult<()> {
        let codes = RoleRepository::new(self.pool)
            .get_permission_codes(role_id, identity.merchant_id())
            .await?;
        self.require_all(identity, &codes).await
    }

    pub async fn has_permission(
        &self,
        identity: &RequestIdentity,
        permission: &str,
    ) -> ServiceResult<bool> {
        let Some(user_id) = identity.user_id() else {
            return Ok(true);
        };

        let user = UserRepository::new(self.pool).get_user_by_id(user_id).await?;
        let Some(user) = user else {
            return Ok(false);
        };
        if user.merchant_id != identity.merchant_id() || !user.is_active() {
            return Ok(false);
        }
        let Some(role_id) = user.role_id else {
            return Ok(false);
        };

        let codes = RoleRepository::new(self.pool)
            .get_permission_codes(&role_id, identity.merchant_id())
            .await?;
        Ok(codes.iter().any(|code| code == permission))
    }
}
