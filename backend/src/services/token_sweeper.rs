//! Background task that deletes expired refresh-token records.

use crate::auth::service::SessionService;
use chrono::Utc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Runs one sweep, logging instead of failing.
pub async fn sweep_once(sessions: &SessionService) -> u64 {
    match sessions.purge_expired(Utc::now()).await {
        Ok(0) => {
            tracing::debug!("No expired refresh tokens to purge");
            0
        }
        Ok(purged) => {
            tracing::info!(purged, "Purged expired refresh tokens");
            purged
        }
        Err(e) => {
            tracing::error!("Failed to purge expired refresh tokens: {}", e);
            0
        }
    }
}

/// Spawns the sweep loop. The first sweep runs immediately.
pub fn spawn_token_sweeper(sessions: SessionService, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            sweep_once(&sessions).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::{PrincipalKind, SessionPrincipal};
    use crate::database::models::RefreshTokenRecord;
    use crate::database::test_pool;
    use crate::repositories::refresh_token_repository::{
        RefreshTokenRepository, RefreshTokenStore,
    };
    use crate::utils::jwt::TokenIssuer;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_sweeper_purges_on_first_tick() {
        let store = Arc::new(RefreshTokenRepository::new(test_pool().await));
        let issuer = Arc::new(
            TokenIssuer::new(
                "sweeper-secret",
                chrono::Duration::minutes(15),
                chrono::Duration::days(7),
            )
            .unwrap(),
        );
        let sessions = SessionService::new(issuer, store.clone());

        let live = sessions
            .open_session(&SessionPrincipal::merchant("m"))
            .await
            .unwrap();
        let past = Utc::now() - chrono::Duration::days(1);
        store
            .create(&RefreshTokenRecord {
                id: "expired".into(),
                principal_id: "m".into(),
                principal_kind: PrincipalKind::Merchant,
                merchant_id: "m".into(),
                token: "expired-token".into(),
                issued_at: past - chrono::Duration::days(7),
                expires_at: past,
                is_revoked: false,
            })
            .await
            .unwrap();

        let handle = spawn_token_sweeper(sessions.clone(), Duration::from_secs(3600));
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        assert_eq!(sweep_once(&sessions).await, 0);
        assert!(
            store
                .find_active(&live.refresh_token, Utc::now())
                .await
                .unwrap()
                .is_some()
        );
    }
}
