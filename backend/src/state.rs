//! Process-wide state handed to every handler through `Extension`.

use crate::auth::service::SessionService;
use crate::config::Config;
use crate::repositories::refresh_token_repository::RefreshTokenRepository;
use crate::services::audit::AuditSink;
use crate::utils::crypto::CredentialVerifier;
use crate::utils::jwt::TokenIssuer;
use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub sessions: SessionService,
    pub verifier: CredentialVerifier,
    pub audit: Arc<dyn AuditSink>,
    pub request_timeout: Duration,
}

impl AppState {
    /// Wires the session engine from validated configuration.
    pub fn new(pool: SqlitePool, config: &Config, audit: Arc<dyn AuditSink>) -> Result<Self> {
        let issuer = TokenIssuer::from_config(config).context("failed to build token issuer")?;
        let verifier =
            CredentialVerifier::new(config.bcrypt_cost).context("invalid bcrypt cost")?;
        let store = RefreshTokenRepository::new(pool.clone());

        Ok(Self {
            sessions: SessionService::new(Arc::new(issuer), Arc::new(store)),
            pool,
            verifier,
            audit,
            request_timeout: Duration::from_secs(config.request_timeout_seconds),
        })
    }
}

#[cfg(test)]
impl AppState {
    /// State over a fresh in-memory database, recording audit events.
    pub async fn for_tests() -> (Self, Arc<crate::services::audit::RecordingAuditSink>) {
        let audit = Arc::new(crate::services::audit::RecordingAuditSink::default());
        let pool = crate::database::test_pool().await;
        let state = Self::new(pool, &Config::for_tests(), audit.clone())
            .expect("test configuration is valid");
        (state, audit)
    }
}
