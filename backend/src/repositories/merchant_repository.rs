//! Database repository for merchant (tenant) accounts.

use crate::database::models::{Merchant, NewMerchant};
use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

const MERCHANT_COLUMNS: &str = "id, name, phone, timezone, pin_hash, user_management_enabled, created_at, updated_at";

/// Repository for merchant database operations.
pub struct MerchantRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> MerchantRepository<'a> {
    /// Creates a new MerchantRepository instance.
    ///
    /// # Arguments
    /// * `pool` - Reference to SQLite connection pool
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates a merchant with user management disabled.
    ///
    /// # Arguments
    /// * `merchant` - Merchant fields with the PIN already hashed
    ///
    /// # Returns
    /// The newly created Merchant
    pub async fn create_merchant(&self, merchant: NewMerchant) -> Result<Merchant> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now();

        let merchant = sqlx::query_as::<_, Merchant>(&format!(
            r#"
            INSERT INTO merchants (id, name, phone, timezone, pin_hash, user_management_enabled, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?)
            RETURNING {MERCHANT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(merchant.name)
        .bind(merchant.phone)
        .bind(merchant.timezone)
        .bind(merchant.pin_hash)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await?;

        Ok(merchant)
    }

    /// Retrieves a merchant by its unique identifier.
    pub async fn get_merchant_by_id(&self, id: &str) -> Result<Option<Merchant>> {
        let merchant = sqlx::query_as::<_, Merchant>(&format!(
            "SELECT {MERCHANT_COLUMNS} FROM merchants WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(merchant)
    }

    /// Retrieves a merchant by its login phone number.
    pub async fn get_merchant_by_phone(&self, phone: &str) -> Result<Option<Merchant>> {
        let merchant = sqlx::query_as::<_, Merchant>(&format!(
            "SELECT {MERCHANT_COLUMNS} FROM merchants WHERE phone = ?"
        ))
        .bind(phone)
        .fetch_optional(self.pool)
        .await?;

        Ok(merchant)
    }

    /// Checks if a phone number is already registered.
    pub async fn phone_exists(&self, phone: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM merchants WHERE phone = ?")
            .bind(phone)
            .fetch_one(self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Turns the staff user-management feature on or off.
    ///
    /// # Returns
    /// The updated Merchant, or `None` if the merchant does not exist
    pub async fn set_user_management_enabled(
        &self,
        id: &str,
        enabled: bool,
    ) -> Result<Option<Merchant>> {
        let merchant = sqlx::query_as::<_, Merchant>(&format!(
            r#"
            UPDATE merchants SET user_management_enabled = ?, updated_at = ?
            WHERE id = ?
            RETURNING {MERCHANT_COLUMNS}
            "#
        ))
        .bind(enabled)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(merchant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;

    fn new_merchant(phone: &str) -> NewMerchant {
        NewMerchant {
            name: "Corner Shop".into(),
            phone: phone.into(),
            timezone: "Africa/Lagos".into(),
            pin_hash: "$2b$04$placeholder".into(),
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let pool = test_pool().await;
        let repo = MerchantRepository::new(&pool);

        let created = repo.create_merchant(new_merchant("+1555")).await.unwrap();
        assert!(!created.user_management_enabled);

        let by_phone = repo.get_merchant_by_phone("+1555").await.unwrap().unwrap();
        assert_eq!(by_phone.id, created.id);
        let by_id = repo.get_merchant_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id.name, "Corner Shop");

        assert!(repo.phone_exists("+1555").await.unwrap());
        assert!(!repo.phone_exists("+1666").await.unwrap());
        assert!(repo.get_merchant_by_phone("+1666").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_phone_is_rejected_by_storage() {
        let pool = test_pool().await;
        let repo = MerchantRepository::new(&pool);

        repo.create_merchant(new_merchant("+1555")).await.unwrap();
        assert!(repo.create_merchant(new_merchant("+1555")).await.is_err());
    }

    #[tokio::test]
    async fn test_toggle_user_management() {
        let pool = test_pool().await;
        let repo = MerchantRepository::new(&pool);
        let merchant = repo.create_merchant(new_merchant("+1555")).await.unwrap();

        let updated = repo
            .set_user_management_enabled(&merchant.id, true)
            .await
            .unwrap()
            .unwrap();
        assert!(updated.user_management_enabled);

        assert!(
            repo.set_user_management_enabled("missing", true)
                .await
                .unwrap()
                .is_none()
        );
    }
}
