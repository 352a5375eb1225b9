//! Database repository for staff user management operations.
//!
//! Every lookup is scoped to a merchant: usernames are only unique within
//! one tenant.

use crate::{
    api::common::PaginationFilter,
    database::models::{CreateUser, StaffSummary, USER_STATUS_ACTIVE, User, UserChanges},
};
use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, merchant_id, username, email, full_name, password_hash, role_id, status, last_login_at, created_at, updated_at";

/// Repository for user database operations.
///
/// Handles all persistence operations for the User entity,
/// maintaining relationships with merchants and roles.
pub struct UserRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Creates a new UserRepository instance.
    ///
    /// # Arguments
    /// * `pool` - Reference to SQLite connection pool
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates a new active user in the database.
    ///
    /// # Arguments
    /// * `user` - CreateUser DTO containing user details
    ///
    /// # Returns
    /// The newly created User with all fields populated
    pub async fn create_user(&self, user: CreateUser) -> Result<User> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now();

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, merchant_id, username, email, full_name, password_hash, role_id, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user.merchant_id)
        .bind(user.username)
        .bind(user.email)
        .bind(user.full_name)
        .bind(user.password_hash)
        .bind(user.role_id)
        .bind(USER_STATUS_ACTIVE)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        Ok(user)
    }

    /// Retrieves a user by their unique identifier.
    ///
    /// # Arguments
    /// * `id` - User ID (UUID format)
    ///
    /// # Returns
    /// `Some(User)` if found, `None` otherwise
    pub async fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Retrieves a user only if it belongs to the merchant.
    pub async fn get_user_for_merchant(&self, id: &str, merchant_id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ? AND merchant_id = ?"
        ))
        .bind(id)
        .bind(merchant_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Retrieves a merchant's user by username or email.
    ///
    /// # Arguments
    /// * `merchant_id` - Merchant the user must belong to
    /// * `login` - Username or email address
    pub async fn get_user_by_login(&self, merchant_id: &str, login: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE merchant_id = ? AND (username = ? OR email = ?)
            ORDER BY username = ? DESC
            LIMIT 1
            "#
        ))
        .bind(merchant_id)
        .bind(login)
        .bind(login)
        .bind(login)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Checks if a username is already taken within the merchant.
    pub async fn username_exists(&self, merchant_id: &str, username: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE merchant_id = ? AND username = ?",
        )
        .bind(merchant_id)
        .bind(username)
        .fetch_one(self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Retrieves one page of the merchant's users, newest first.
    pub async fn list_users_by_merchant(
        &self,
        merchant_id: &str,
        pagination: &PaginationFilter,
    ) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE merchant_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(merchant_id)
        .bind(pagination.limit() as i64)
        .bind(pagination.offset() as i64)
        .fetch_all(self.pool)
        .await?;

        Ok(users)
    }

    /// Get total count of users for a merchant
    pub async fn count_users_by_merchant(&self, merchant_id: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE merchant_id = ?")
            .bind(merchant_id)
            .fetch_one(self.pool)
            .await?;

        Ok(count as u64)
    }

    /// Active staff of a merchant with their role names, as shown on the
    /// merchant login screen.
    pub async fn list_active_staff(&self, merchant_id: &str) -> Result<Vec<StaffSummary>> {
        let staff = sqlx::query_as::<_, StaffSummary>(
            r#"
            SELECT u.id, u.username, u.full_name, r.name AS role_name
            FROM users u
            LEFT JOIN roles r ON u.role_id = r.id
            WHERE u.merchant_id = ? AND u.status = ?
            ORDER BY u.full_name, u.username
            "#,
        )
        .bind(merchant_id)
        .bind(USER_STATUS_ACTIVE)
        .fetch_all(self.pool)
        .await?;

        Ok(staff)
    }

    /// Records a successful sign-in.
    pub async fn touch_last_login(&self, id: &str) -> Result<()> {
        let now = Utc::now();
        sqlx::query("UPDATE users SET last_login_at = ?, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(now)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Applies the given changes to a merchant's user.
    ///
    /// # Returns
    /// The updated user, or `None` when no such user exists in the merchant
    pub async fn update_user(
        &self,
        id: &str,
        merchant_id: &str,
        changes: UserChanges,
    ) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                email = COALESCE(?, email),
                full_name = COALESCE(?, full_name),
                password_hash = COALESCE(?, password_hash),
                role_id = COALESCE(?, role_id),
                status = COALESCE(?, status),
                updated_at = ?
            WHERE id = ? AND merchant_id = ?
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(changes.email)
        .bind(changes.full_name)
        .bind(changes.password_hash)
        .bind(changes.role_id)
        .bind(changes.status)
        .bind(Utc::now())
        .bind(id)
        .bind(merchant_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Deletes a merchant's user. Returns false when nothing was deleted.
    pub async fn delete_user(&self, id: &str, merchant_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ? AND merchant_id = ?")
            .bind(id)
            .bind(merchant_id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
