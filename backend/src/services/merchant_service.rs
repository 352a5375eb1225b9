//! Merchant business logic: registration, PIN login and feature flags.

use crate::auth::errors::{AuthError, AuthResult};
use crate::auth::models::{LoginMerchantRequest, MerchantLogin, SessionPrincipal};
use crate::auth::service::SessionService;
use crate::database::models::{CreateMerchant, MerchantProfile, NewMerchant};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::merchant_repository::MerchantRepository;
use crate::repositories::user_repository::UserRepository;
use crate::utils::crypto::CredentialVerifier;
use sqlx::SqlitePool;
use validator::Validate;

pub struct MerchantService<'a> {
    /// Shared database connection pool
    pool: &'a SqlitePool,
    verifier: CredentialVerifier,
}

impl<'a> MerchantService<'a> {
    /// Creates a new MerchantService instance.
    ///
    /// # Arguments
    /// * `pool` - Reference to SQLite connection pool
    /// * `verifier` - Hashing primitive for merchant PINs
    pub fn new(pool: &'a SqlitePool, verifier: CredentialVerifier) -> Self {
        Self { pool, verifier }
    }

    /// Registers a merchant with user management disabled.
    ///
    /// # Errors
    /// Returns `ServiceError` for:
    /// - Validation failures
    /// - A phone number that is already registered
    pub async fn register(&self, request: CreateMerchant) -> ServiceResult<MerchantProfile> {
        request
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        let repo = MerchantRepository::new(self.pool);
        if repo.phone_exists(&request.phone).await? {
            return Err(ServiceError::already_exists("Merchant", &request.phone));
        }

        let pin_hash = self.verifier.hash_blocking(request.pin).await?;

        let merchant = repo
            .create_merchant(NewMerchant {
                name: request.name,
                phone: request.phone,
                timezone: request.timezone,
                pin_hash,
            })
            .await?;

        tracing::info!(merchant_id = %merchant.id, "Merchant registered");
        Ok(merchant.into())
    }

    /// Verifies a merchant's phone and PIN and opens a session.
    ///
    /// When user management is enabled the active staff are returned so the
    /// device can offer a staff sign-in next.
    pub async fn login(
        &self,
        sessions: &SessionService,
        request: LoginMerchantRequest,
    ) -> AuthResult<MerchantLogin> {
        let merchant = MerchantRepository::new(self.pool)
            .get_merchant_by_phone(&request.phone)
            .await?
            .ok_or(AuthError::PrincipalNotFound)?;

        if !self
            .verifier
            .verify_blocking(merchant.pin_hash.clone(), request.pin)
            .await
        {
            return Err(AuthError::InvalidCredentials);
        }

        let available_staff = if merchant.user_management_enabled {
            UserRepository::new(self.pool)
                .list_active_staff(&merchant.id)
                .await?
        } else {
            Vec::new()
        };

        let tokens = sessions
            .open_session(&SessionPrincipal::merchant(&merchant.id))
            .await?;

        tracing::info!(merchant_id = %merchant.id, "Merchant logged in");
        Ok(MerchantLogin {
            tokens,
            merchant: merchant.into(),
            available_staff,
        })
    }

    pub async fn get_current(&self, merchant_id: &str) -> ServiceResult<MerchantProfile> {
        MerchantRepository::new(self.pool)
            .get_merchant_by_id(merchant_id)
            .await?
            .map(MerchantProfile::from)
            .ok_or_else(|| ServiceError::not_found("Merchant", merchant_id))
    }

    pub async fn update_feature_flags(
        &self,
        merchant_id: &str,
        user_management: bool,
    ) -> ServiceResult<MerchantProfile> {
        let merchant = MerchantRepository::new(self.pool)
            .set_user_management_enabled(merchant_id, user_management)
            .await?
            .ok_or_else(|| ServiceError::not_found("Merchant", merchant_id))?;

        tracing::info!(
            merchant_id = %merchant_id,
            user_management,
            "Merchant feature flags updated"
        );
        Ok(merchant.into())
    }
}
