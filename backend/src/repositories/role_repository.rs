//! Database repository for roles and the permission catalog.
//!
//! A merchant sees its own roles plus the shared system roles
//! (`merchant_id IS NULL`). The permission catalog and the system roles are
//! seeded by migrations; merchants only add roles of their own.

use anyhow::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::api::common::PaginationFilter;
use crate::database::models::{Permission, Role};

/// Repository for role database operations.
pub struct RoleRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> RoleRepository<'a> {
    /// Creates a new RoleRepository instance.
    ///
    /// # Arguments
    /// * `pool` - Reference to SQLite connection pool
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Retrieves a role visible to the merchant.
    ///
    /// # Arguments
    /// * `id` - Role ID
    /// * `merchant_id` - Merchant the role must belong to, unless it is a system role
    ///
    /// # Returns
    /// `Some(Role)` if found, `None` for unknown roles and other merchants' roles
    pub async fn get_role_for_merchant(&self, id: &str, merchant_id: &str) -> Result<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, merchant_id, name, description, is_system
            FROM roles
            WHERE id = ? AND (merchant_id = ? OR merchant_id IS NULL)
            "#,
        )
        .bind(id)
        .bind(merchant_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(role)
    }

    /// Creates a merchant role and its grants in one transaction.
    ///
    /// # Arguments
    /// * `merchant_id` - Owner of the new role
    /// * `name` - Role name, unique within the merchant
    /// * `description` - Optional description
    /// * `permission_ids` - Catalog permission IDs to grant
    ///
    /// # Returns
    /// The created role
    pub async fn create_role(
        &self,
        merchant_id: &str,
        name: &str,
        description: Option<&str>,
        permission_ids: &[String],
    ) -> Result<Role> {
        let id = Uuid::now_v7().to_string();
        let mut tx = self.pool.begin().await?;

        let role = sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (id, merchant_id, name, description, is_system)
            VALUES (?, ?, ?, ?, 0)
            RETURNING id, merchant_id, name, description, is_system
            "#,
        )
        .bind(&id)
        .bind(merchant_id)
        .bind(name)
        .bind(description)
        .fetch_one(&mut *tx)
        .await?;

        for permission_id in permission_ids {
            sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES (?, ?)")
                .bind(&id)
                .bind(permission_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(role)
    }

    /// Checks whether a role name is already visible to the merchant.
    pub async fn role_name_exists(&self, merchant_id: &str, name: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM roles WHERE name = ? AND (merchant_id = ? OR merchant_id IS NULL)",
        )
        .bind(name)
        .bind(merchant_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Permissions granted by a role, ordered like the catalog.
    pub async fn get_role_permissions(&self, role_id: &str) -> Result<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.id, p.code, p.name, p.description, p.module
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = ?
            ORDER BY p.module, p.code
            "#,
        )
        .bind(role_id)
        .fetch_all(self.pool)
        .await?;

        Ok(permissions)
    }

    /// Catalog entries for the given IDs. Unknown IDs are simply absent.
    pub async fn get_permissions_by_ids(&self, ids: &[String]) -> Result<Vec<Permission>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT id, code, name, description, module FROM permissions WHERE id IN ({}) ORDER BY module, code",
            placeholders
        );
        let mut query = sqlx::query_as::<_, Permission>(&sql);
        for id in ids {
            query = query.bind(id);
        }

        Ok(query.fetch_all(self.pool).await?)
    }

    /// Retrieves a role name by ID.
    pub async fn get_role_name(&self, id: &str) -> Result<Option<String>> {
        let name = sqlx::query_scalar::<_, String>("SELECT name FROM roles WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(name)
    }

    /// Retrieves one page of the roles visible to a merchant, system roles first.
    pub async fn list_roles(
        &self,
        merchant_id: &str,
        pagination: &PaginationFilter,
    ) -> Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            r#"
            SELECT id, merchant_id, name, description, is_system
            FROM roles
            WHERE merchant_id = ? OR merchant_id IS NULL
            ORDER BY is_system DESC, name
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(merchant_id)
        .bind(pagination.limit() as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(self.pool)
        .await?;

        Ok(roles)
    }

    pub async fn count_roles(&self, merchant_id: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM roles WHERE merchant_id = ? OR merchant_id IS NULL",
        )
        .bind(merchant_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count as u64)
    }

    /// Retrieves the whole permission catalog.
    pub async fn list_permissions(&self) -> Result<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            "SELECT id, code, name, description, module FROM permissions ORDER BY module, code",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(permissions)
    }

    /// Permission codes granted by a role, provided the role is visible to the merchant.
    pub async fn get_permission_codes(&self, role_id: &str, merchant_id: &str) -> Result<Vec<String>> {
        let codes = sqlx::query_scalar::<_, String>(
            r#"
            SELECT p.code
            FROM role_permissions rp
            JOIN roles r ON r.id = rp.role_id
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = ? AND (r.merchant_id = ? OR r.merchant_id IS NULL)
            ORDER BY p.code
            "#,
        )
        .bind(role_id)
        .bind(merchant_id)
        .fetch_all(self.pool)
        .await?;

        Ok(codes)
    }

    #[cfg(test)]
    pub(crate) async fn insert_merchant_role(
        &self,
        id: &str,
        merchant_id: &str,
        name: &str,
        permission_codes: &[&str],
    ) -> Result<()> {
        sqlx::query("INSERT INTO roles (id, merchant_id, name, is_system) VALUES (?, ?, ?, 0)")
            .bind(id)
            .bind(merchant_id)
            .bind(name)
            .execute(self.pool)
            .await?;
        for code in permission_codes {
            sqlx::query(
                "INSERT INTO role_permissions (role_id, permission_id) SELECT ?, id FROM permissions WHERE code = ?",
            )
            .bind(id)
            .bind(code)
            .execute(self.pool)
            .await?;
        }
        Ok(())
    }
}
