//! Core session lifecycle: issuing, rotating and revoking token pairs.
//!
//! Merchant and staff logins resolve and verify their principal elsewhere
//! (`services::merchant_service`, `services::user_service`) and then hand the
//! verified `SessionPrincipal` to `SessionService::open_session`. Everything
//! after that point is shared by both principal kinds.

use crate::auth::errors::{AuthError, AuthResult};
use crate::auth::models::{SessionPrincipal, TokenPair};
use crate::database::models::RefreshTokenRecord;
use crate::repositories::refresh_token_repository::RefreshTokenStore;
use crate::utils::jwt::{Claims, TokenIssuer};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Session service shared by every request.
#[derive(Clone)]
pub struct SessionService {
    issuer: Arc<TokenIssuer>,
    store: Arc<dyn RefreshTokenStore>,
}

impl SessionService {
    pub fn new(issuer: Arc<TokenIssuer>, store: Arc<dyn RefreshTokenStore>) -> Self {
        Self { issuer, store }
    }

    /// Issues a token pair for an already verified principal and persists the
    /// refresh record.
    pub async fn open_session(&self, principal: &SessionPrincipal) -> AuthResult<TokenPair> {
        let access = self.issuer.issue_access(principal)?;
        let refresh = self.issuer.issue_refresh(principal)?;

        let record = RefreshTokenRecord {
            id: Uuid::now_v7().to_string(),
            principal_id: principal.id.clone(),
            principal_kind: principal.kind,
            merchant_id: principal.merchant_id.clone(),
            token: refresh.token.clone(),
            issued_at: refresh.issued_at,
            expires_at: refresh.expires_at,
            is_revoked: false,
        };
        self.store.create(&record).await?;

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            expires_in: self.issuer.access_ttl_seconds(),
        })
    }

    /// Revokes one refresh token. Already inactive or unknown tokens succeed.
    pub async fn logout(&self, refresh_token: &str) -> AuthResult<()> {
        self.store.revoke(refresh_token).await
    }

    /// Revokes every refresh token of the principal.
    ///
    /// # Returns
    /// Number of records that were still unrevoked
    pub async fn logout_all(&self, principal_id: &str) -> AuthResult<u64> {
        let revoked = self.store.revoke_all(principal_id).await?;
        tracing::info!(principal_id = %principal_id, revoked, "Revoked all sessions");
        Ok(revoked)
    }

    /// Exchanges an active refresh token for a new pair.
    ///
    /// The presented token is revoked before anything new is issued. If
    /// issuing or persisting the replacement fails, the caller is left without
    /// a session rather than with two.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let now = Utc::now();

        let record = self
            .store
            .find_active(refresh_token, now)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.store.revoke_if_active(refresh_token, now).await? {
            tracing::warn!(
                principal_id = %record.principal_id,
                "Refresh token was consumed concurrently"
            );
            return Err(AuthError::InvalidCredentials);
        }

        self.open_session(&record.principal()).await
    }

    /// Validates an access token, returning its claims. Refresh tokens are
    /// rejected as `InvalidToken`.
    pub fn validate_access(&self, token: &str) -> AuthResult<Claims> {
        self.issuer.validate_access(token)
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        self.store.purge_expired(now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::PrincipalKind;
    use crate::database::test_pool;
    use crate::repositories::refresh_token_repository::RefreshTokenRepository;
    use async_trait::async_trait;
    use chrono::Duration;

    fn issuer() -> Arc<TokenIssuer> {
        Arc::new(
            TokenIssuer::new("session-test-secret", Duration::minutes(15), Duration::days(7))
                .unwrap(),
        )
    }

    async fn service() -> SessionService {
        let store = RefreshTokenRepository::new(test_pool().await);
        SessionService::new(issuer(), Arc::new(store))
    }

    #[tokio::test]
    async fn test_open_session_then_validate_access() {
        let sessions = service().await;
        let principal = SessionPrincipal::merchant("merchant-1");

        let pair = sessions.open_session(&principal).await.unwrap();
        let claims = sessions.validate_access(&pair.access_token).unwrap();

        assert_eq!(claims.sub, "merchant-1");
        assert_eq!(pair.expires_in, 15 * 60);
        assert_ne!(pair.access_token, pair.refresh_token);
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let sessions = service().await;
        let pair = sessions
            .open_session(&SessionPrincipal::merchant("m"))
            .await
            .unwrap();

        assert!(matches!(
            sessions.validate_access(&pair.refresh_token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_old_token_is_single_use() {
        let sessions = service().await;
        let pair = sessions
            .open_session(&SessionPrincipal::merchant("m"))
            .await
            .unwrap();

        let rotated = sessions.refresh(&pair.refresh_token).await.unwrap();
        assert_ne!(rotated.refresh_token, pair.refresh_token);
        assert_eq!(sessions.validate_access(&rotated.access_token).unwrap().sub, "m");

        assert!(matches!(
            sessions.refresh(&pair.refresh_token).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(sessions.refresh(&rotated.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_keeps_the_staff_identity() {
        let sessions = service().await;
        let pair = sessions
            .open_session(&SessionPrincipal::user("u-1", "m-1"))
            .await
            .unwrap();

        let rotated = sessions.refresh(&pair.refresh_token).await.unwrap();
        let claims = sessions.validate_access(&rotated.access_token).unwrap();

        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.mid, "m-1");
        assert_eq!(claims.kind, PrincipalKind::User);
    }

    #[tokio::test]
    async fn test_concurrent_refresh_has_exactly_one_winner() {
        let sessions = service().await;
        let pair = sessions
            .open_session(&SessionPrincipal::merchant("m"))
            .await
            .unwrap();

        let first = tokio::spawn({
            let sessions = sessions.clone();
            let token = pair.refresh_token.clone();
            async move { sessions.refresh(&token).await }
        });
        let second = tokio::spawn({
            let sessions = sessions.clone();
            let token = pair.refresh_token.clone();
            async move { sessions.refresh(&token).await }
        });

        let outcomes = [first.await.unwrap(), second.await.unwrap()];
        let winners = outcomes.iter().filter(|r| r.is_ok()).count();
        let losers = outcomes
            .iter()
            .filter(|r| matches!(r, Err(AuthError::InvalidCredentials)))
            .count();

        assert_eq!(winners, 1);
        assert_eq!(losers, 1);
    }

    #[tokio::test]
    async fn test_replay_burst_yields_a_single_session() {
        let sessions = service().await;
        let pair = sessions
            .open_session(&SessionPrincipal::merchant("m"))
            .await
            .unwrap();

        let attempts = (0..8).map(|_| sessions.refresh(&pair.refresh_token));
        let outcomes = futures::future::join_all(attempts).await;

        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    }

    #[tokio::test]
    async fn test_logout_all_invalidates_every_earlier_token() {
        let sessions = service().await;
        let principal = SessionPrincipal::merchant("m");
        let phone = sessions.open_session(&principal).await.unwrap();
        let tablet = sessions.open_session(&principal).await.unwrap();
        let other = sessions
            .open_session(&SessionPrincipal::merchant("other"))
            .await
            .unwrap();

        assert_eq!(sessions.logout_all("m").await.unwrap(), 2);

        for token in [&phone.refresh_token, &tablet.refresh_token] {
            assert!(matches!(
                sessions.refresh(token).await,
                Err(AuthError::InvalidCredentials)
            ));
        }
        assert!(sessions.refresh(&other.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_logout_twice_never_errors() {
        let sessions = service().await;
        let pair = sessions
            .open_session(&SessionPrincipal::merchant("m"))
            .await
            .unwrap();

        sessions.logout(&pair.refresh_token).await.unwrap();
        sessions.logout(&pair.refresh_token).await.unwrap();

        assert!(matches!(
            sessions.refresh(&pair.refresh_token).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_refresh_with_unknown_token_is_rejected() {
        let sessions = service().await;
        assert!(matches!(
            sessions.refresh("never-issued").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_purge_removes_only_expired_records() {
        let pool = test_pool().await;
        let store = Arc::new(RefreshTokenRepository::new(pool));
        let sessions = SessionService::new(issuer(), store.clone());

        let live = sessions
            .open_session(&SessionPrincipal::merchant("m"))
            .await
            .unwrap();
        let expired_at = Utc::now() - Duration::hours(2);
        store
            .create(&RefreshTokenRecord {
                id: "stale".into(),
                principal_id: "m".into(),
                principal_kind: PrincipalKind::Merchant,
                merchant_id: "m".into(),
                token: "stale-token".into(),
                issued_at: expired_at - Duration::days(7),
                expires_at: expired_at,
                is_revoked: false,
            })
            .await
            .unwrap();

        assert_eq!(sessions.purge_expired(Utc::now()).await.unwrap(), 1);
        assert!(sessions.refresh(&live.refresh_token).await.is_ok());
    }

    /// Store whose inserts fail after the first one, used to break rotation
    /// between revocation and re-issuance.
    struct FailingCreateStore {
        inner: RefreshTokenRepository,
        allowed_creates: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl RefreshTokenStore for FailingCreateStore {
        async fn create(&self, record: &RefreshTokenRecord) -> AuthResult<()> {
            use std::sync::atomic::Ordering;
            if self.allowed_creates.load(Ordering::SeqCst) == 0 {
                return Err(AuthError::Storage {
                    source: anyhow::anyhow!("disk full"),
                });
            }
            self.allowed_creates.fetch_sub(1, Ordering::SeqCst);
            self.inner.create(record).await
        }

        async fn find_active(
            &self,
            token: &str,
            now: DateTime<Utc>,
        ) -> AuthResult<Option<RefreshTokenRecord>> {
            self.inner.find_active(token, now).await
        }

        async fn revoke(&self, token: &str) -> AuthResult<()> {
            self.inner.revoke(token).await
        }

        async fn revoke_if_active(&self, token: &str, now: DateTime<Utc>) -> AuthResult<bool> {
            self.inner.revoke_if_active(token, now).await
        }

        async fn revoke_all(&self, principal_id: &str) -> AuthResult<u64> {
            self.inner.revoke_all(principal_id).await
        }

        async fn purge_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
            self.inner.purge_expired(now).await
        }
    }

    #[tokio::test]
    async fn test_failed_reissue_leaves_old_token_revoked() {
        let store = Arc::new(FailingCreateStore {
            inner: RefreshTokenRepository::new(test_pool().await),
            allowed_creates: std::sync::atomic::AtomicUsize::new(1),
        });
        let sessions = SessionService::new(issuer(), store.clone());

        let pair = sessions
            .open_session(&SessionPrincipal::merchant("m"))
            .await
            .unwrap();

        assert!(matches!(
            sessions.refresh(&pair.refresh_token).await,
            Err(AuthError::Storage { .. })
        ));
        assert!(
            store
                .find_active(&pair.refresh_token, Utc::now())
                .await
                .unwrap()
                .is_none()
        );
    }
}
