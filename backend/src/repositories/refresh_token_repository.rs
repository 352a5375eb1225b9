//! Durable storage of issued refresh tokens.
//!
//! Every mutation is one atomic statement. Rotation relies on
//! `revoke_if_active`: of several concurrent calls for the same token, only
//! one can observe the row as still active and flip it.

use crate::auth::errors::{AuthError, AuthResult};
use crate::auth::models::PrincipalKind;
use crate::database::models::RefreshTokenRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

/// Persistence contract of the refresh-token lifecycle.
///
/// Inactive records (revoked or expired) are indistinguishable from missing
/// ones for every read.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Persists a freshly issued, active record.
    async fn create(&self, record: &RefreshTokenRecord) -> AuthResult<()>;

    /// Returns the record only if it is active at `now`.
    async fn find_active(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<RefreshTokenRecord>>;

    /// Marks the record revoked. Revoking an inactive or unknown token is a no-op.
    async fn revoke(&self, token: &str) -> AuthResult<()>;

    /// Revokes the record only if it is still active at `now`.
    ///
    /// # Returns
    /// `true` if this call performed the revocation
    async fn revoke_if_active(&self, token: &str, now: DateTime<Utc>) -> AuthResult<bool>;

    /// Revokes every record of the principal, returning how many changed.
    async fn revoke_all(&self, principal_id: &str) -> AuthResult<u64>;

    /// Deletes records that expired at or before `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> AuthResult<u64>;
}

#[derive(Debug, FromRow)]
struct RefreshTokenRow {
    id: String,
    principal_id: String,
    principal_kind: String,
    merchant_id: String,
    token: String,
    issued_at: i64,
    expires_at: i64,
    is_revoked: bool,
}

impl TryFrom<RefreshTokenRow> for RefreshTokenRecord {
    type Error = AuthError;

    fn try_from(row: RefreshTokenRow) -> Result<Self, Self::Error> {
        let principal_kind = row
            .principal_kind
            .parse::<PrincipalKind>()
            .map_err(AuthError::internal)?;

        Ok(RefreshTokenRecord {
            id: row.id,
            principal_id: row.principal_id,
            principal_kind,
            merchant_id: row.merchant_id,
            token: row.token,
            issued_at: from_unix(row.issued_at)?,
            expires_at: from_unix(row.expires_at)?,
            is_revoked: row.is_revoked,
        })
    }
}

fn from_unix(seconds: i64) -> AuthResult<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| AuthError::internal(format!("timestamp {} out of range", seconds)))
}

/// SQLite-backed `RefreshTokenStore`.
#[derive(Clone)]
pub struct RefreshTokenRepository {
    pool: SqlitePool,
}

impl RefreshTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for RefreshTokenRepository {
    async fn create(&self, record: &RefreshTokenRecord) -> AuthResult<()> {
        let now = Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (
                id, principal_id, principal_kind, merchant_id, token,
                issued_at, expires_at, is_revoked, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.principal_id)
        .bind(record.principal_kind.as_str())
        .bind(&record.merchant_id)
        .bind(&record.token)
        .bind(record.issued_at.timestamp())
        .bind(record.expires_at.timestamp())
        .bind(record.is_revoked)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_active(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<RefreshTokenRecord>> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT id, principal_id, principal_kind, merchant_id, token,
                   issued_at, expires_at, is_revoked
            FROM refresh_tokens
            WHERE token = ? AND is_revoked = 0 AND expires_at > ?
            "#,
        )
        .bind(token)
        .bind(now.timestamp())
        .fetch_optional(&self.pool)
        .await?;

        row.map(RefreshTokenRecord::try_from).transpose()
    }

    async fn revoke(&self, token: &str) -> AuthResult<()> {
        sqlx::query(
            "UPDATE refresh_tokens SET is_revoked = 1, updated_at = ? WHERE token = ? AND is_revoked = 0",
        )
        .bind(Utc::now().timestamp())
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn revoke_if_active(&self, token: &str, now: DateTime<Utc>) -> AuthResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET is_revoked = 1, updated_at = ?
            WHERE token = ? AND is_revoked = 0 AND expires_at > ?
            "#,
        )
        .bind(now.timestamp())
        .bind(token)
        .bind(now.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke_all(&self, principal_id: &str) -> AuthResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET is_revoked = 1, updated_at = ? WHERE principal_id = ? AND is_revoked = 0",
        )
        .bind(Utc::now().timestamp())
        .bind(principal_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ?")
            .bind(now.timestamp())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
