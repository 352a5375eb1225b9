//! Roles and the permission catalog.
//!
//! Merchants read the catalog and the roles they can assign, and define
//! roles of their own from catalog permissions.

use crate::api::common::PaginationFilter;
use crate::database::models::{CreateRoleRequest, Permission, Role, RoleDetail};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::role_repository::RoleRepository;
use sqlx::SqlitePool;
use validator::Validate;

pub struct RoleService<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RoleService<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Roles the merchant can assign (its own plus system roles) and their total.
    pub async fn list_roles(
        &self,
        merchant_id: &str,
        pagination: &PaginationFilter,
    ) -> ServiceResult<(Vec<Role>, u64)> {
        pagination
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        let repo = RoleRepository::new(self.pool);
        let roles = repo.list_roles(merchant_id, pagination).await?;
        let total = repo.count_roles(merchant_id).await?;

        Ok((roles, total))
    }

    pub async fn list_permissions(&self) -> ServiceResult<Vec<Permission>> {
        Ok(RoleRepository::new(self.pool).list_permissions().await?)
    }

    /// Resolves catalog permission IDs, failing on the first unknown one.
    /// Repeated IDs collapse to one entry.
    pub async fn resolve_permissions(&self, ids: &[String]) -> ServiceResult<Vec<Permission>> {
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();

        let found = RoleRepository::new(self.pool)
            .get_permissions_by_ids(&ids)
            .await?;
        if let Some(missing) = ids.iter().find(|id| !found.iter().any(|p| &p.id == *id)) {
            return Err(ServiceError::not_found("Permission", missing));
        }

        Ok(found)
    }

    /// Creates a role owned by the merchant.
    ///
    /// # Errors
    /// Returns `ServiceError` for:
    /// - Validation failures
    /// - Unknown permission IDs
    /// - A name already used by a system role or another role of the merchant
    pub async fn create_role(
        &self,
        merchant_id: &str,
        request: CreateRoleRequest,
    ) -> ServiceResult<RoleDetail> {
        request
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        let permissions = self.resolve_permissions(&request.permission_ids).await?;

        let repo = RoleRepository::new(self.pool);
        if repo.role_name_exists(merchant_id, &request.name).await? {
            return Err(ServiceError::already_exists("Role", &request.name));
        }

        let permission_ids: Vec<String> = permissions.iter().map(|p| p.id.clone()).collect();
        let role = repo
            .create_role(
                merchant_id,
                &request.name,
                request.description.as_deref(),
                &permission_ids,
            )
            .await?;

        tracing::info!(merchant_id = %merchant_id, role_id = %role.id, "Role created");
        Ok(RoleDetail { role, permissions })
    }

    /// A role visible to the merchant together with its permissions.
    pub async fn get_role(&self, merchant_id: &str, role_id: &str) -> ServiceResult<RoleDetail> {
        let repo = RoleRepository::new(self.pool);
        let role = repo
            .get_role_for_merchant(role_id, merchant_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Role", role_id))?;
        let permissions = repo.get_role_permissions(&role.id).await?;

        Ok(RoleDetail { role, permissions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::NewMerchant;
    use crate::database::test_pool;
    use crate::repositories::merchant_repository::MerchantRepository;

    #[tokio::test]
    async fn test_rejects_oversized_page() {
        let pool = test_pool().await;
        let service = RoleService::new(&pool);
        let filter = PaginationFilter {
            page: Some(1),
            per_page: Some(500),
        };

        assert!(matches!(
            service.list_roles("m", &filter).await,
            Err(ServiceError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_lists_system_roles_and_catalog() {
        let pool = test_pool().await;
        let service = RoleService::new(&pool);

        let (roles, total) = service
            .list_roles("m", &PaginationFilter::default())
            .await
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(roles.len(), 2);
        assert_eq!(service.list_permissions().await.unwrap().len(), 8);
    }

    async fn merchant(pool: &SqlitePool, phone: &str) -> String {
        MerchantRepository::new(pool)
            .create_merchant(NewMerchant {
                name: "Shop".into(),
                phone: phone.into(),
                timezone: "UTC".into(),
                pin_hash: "hash".into(),
            })
            .await
            .unwrap()
            .id
    }

    fn role_request(name: &str, permission_ids: &[&str]) -> CreateRoleRequest {
        CreateRoleRequest {
            name: name.into(),
            description: None,
            permission_ids: permission_ids.iter().map(|id| id.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_create_then_get_role() {
        let pool = test_pool().await;
        let service = RoleService::new(&pool);
        let shop = merchant(&pool, "+1555").await;
        let other = merchant(&pool, "+1666").await;

        let created = service
            .create_role(
                &shop,
                role_request("Supervisor", &["perm-user-read", "perm-user-read", "perm-role-read"]),
            )
            .await
            .unwrap();
        let codes: Vec<_> = created.permissions.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["role.read", "user.read"]);

        let fetched = service.get_role(&shop, &created.role.id).await.unwrap();
        assert_eq!(fetched, created);
        assert!(matches!(
            service.get_role(&other, &created.role.id).await,
            Err(ServiceError::NotFound { .. })
        ));

        let manager = service.get_role(&other, "role-manager").await.unwrap();
        assert!(manager.role.is_system);
        assert_eq!(manager.permissions.len(), 5);
    }

    #[tokio::test]
    async fn test_create_role_rules() {
        let pool = test_pool().await;
        let service = RoleService::new(&pool);
        let shop = merchant(&pool, "+1555").await;
        let other = merchant(&pool, "+1666").await;

        assert!(matches!(
            service.create_role(&shop, role_request("", &[])).await,
            Err(ServiceError::Validation { .. })
        ));
        assert!(matches!(
            service
                .create_role(&shop, role_request("Ghost", &["perm-does-not-exist"]))
                .await,
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(
            service.create_role(&shop, role_request("Cashier", &[])).await,
            Err(ServiceError::AlreadyExists { .. })
        ));

        service.create_role(&shop, role_request("Baker", &[])).await.unwrap();
        assert!(matches!(
            service.create_role(&shop, role_request("Baker", &[])).await,
            Err(ServiceError::AlreadyExists { .. })
        ));
        assert!(service.create_role(&other, role_request("Baker", &[])).await.is_ok());
    }
}
