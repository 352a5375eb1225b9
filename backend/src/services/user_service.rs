//! Staff user business logic service.
//!
//! Handles staff sign-in within a merchant and the staff management
//! operations exposed to merchant owners and managers.

use crate::api::common::PaginationFilter;
use crate::auth::errors::{AuthError, AuthResult};
use crate::auth::models::{LoginUserRequest, SessionPrincipal, UserInfo, UserLogin};
use crate::auth::service::SessionService;
use crate::database::models::{
    CreateNewUser, CreateUser, USER_STATUS_ACTIVE, UpdateUserRequest, User, UserChanges,
};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::merchant_repository::MerchantRepository;
use crate::repositories::role_repository::RoleRepository;
use crate::repositories::user_repository::UserRepository;
use crate::utils::crypto::CredentialVerifier;
use sqlx::SqlitePool;
use validator::Validate;

pub struct UserService<'a> {
    /// Shared database connection pool
    pool: &'a SqlitePool,
    verifier: CredentialVerifier,
}

impl<'a> UserService<'a> {
    /// Creates a new UserService instance.
    ///
    /// # Arguments
    /// * `pool` - Reference to SQLite connection pool
    /// * `verifier` - Hashing primitive for staff passwords
    pub fn new(pool: &'a SqlitePool, verifier: CredentialVerifier) -> Self {
        Self { pool, verifier }
    }

    /// Signs a staff user in to their merchant.
    ///
    /// Checks run in a fixed order: merchant, user-management flag, user,
    /// status, password. A disabled flag is reported before any credential
    /// is looked at.
    pub async fn login(
        &self,
        sessions: &SessionService,
        request: LoginUserRequest,
    ) -> AuthResult<UserLogin> {
        let merchant = MerchantRepository::new(self.pool)
            .get_merchant_by_id(&request.merchant_id)
            .await?
            .ok_or(AuthError::PrincipalNotFound)?;

        if !merchant.user_management_enabled {
            return Err(AuthError::FeatureDisabled);
        }

        let user_repo = UserRepository::new(self.pool);
        let user = user_repo
            .get_user_by_login(&merchant.id, &request.username)
            .await?
            .ok_or(AuthError::PrincipalNotFound)?;

        if !user.is_active() {
            tracing::debug!(user_id = %user.id, status = %user.status, "Inactive user tried to log in");
            return Err(AuthError::InactivePrincipal);
        }

        if !self
            .verifier
            .verify_blocking(user.password_hash.clone(), request.password)
            .await
        {
            return Err(AuthError::InvalidCredentials);
        }

        // Everything the response needs is loaded before a refresh record exists.
        let role_name = match &user.role_id {
            Some(role_id) => RoleRepository::new(self.pool).get_role_name(role_id).await?,
            None => None,
        };

        let tokens = sessions
            .open_session(&SessionPrincipal::user(&user.id, &merchant.id))
            .await?;

        if let Err(e) = user_repo.touch_last_login(&user.id).await {
            tracing::warn!(user_id = %user.id, "Failed to record last login: {}", e);
        }

        tracing::info!(merchant_id = %merchant.id, user_id = %user.id, "User logged in");
        Ok(UserLogin {
            tokens,
            user: UserInfo::from_user(user, role_name),
        })
    }

    /// Creates a new staff user with full validation.
    ///
    /// # Arguments
    /// * `merchant_id` - Merchant the user will belong to
    /// * `create_user` - User creation data transfer object
    ///
    /// # Errors
    /// Returns `ServiceError` for:
    /// - Validation failures
    /// - Non-existent merchant or a role the merchant cannot see
    /// - A username already taken within the merchant
    pub async fn create_user(
        &self,
        merchant_id: &str,
        create_user: CreateNewUser,
    ) -> ServiceResult<User> {
        create_user
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        if MerchantRepository::new(self.pool)
            .get_merchant_by_id(merchant_id)
            .await?
            .is_none()
        {
            return Err(ServiceError::not_found("Merchant", merchant_id));
        }

        let repo = UserRepository::new(self.pool);
        if repo.username_exists(merchant_id, &create_user.username).await? {
            return Err(ServiceError::already_exists("User", &create_user.username));
        }

        if let Some(role_id) = &create_user.role_id {
            let role = RoleRepository::new(self.pool)
                .get_role_for_merchant(role_id, merchant_id)
                .await?;
            if role.is_none() {
                return Err(ServiceError::not_found("Role", role_id));
            }
        }

        let password_hash = self.verifier.hash_blocking(create_user.password).await?;

        let user = repo
            .create_user(CreateUser {
                merchant_id: merchant_id.to_string(),
                username: create_user.username,
                email: create_user.email,
                full_name: create_user.full_name,
                password_hash,
                role_id: create_user.role_id,
            })
            .await?;

        tracing::info!(merchant_id = %merchant_id, user_id = %user.id, "User created");
        Ok(user)
    }

    /// Retrieves a user of the merchant.
    pub async fn get_user(&self, merchant_id: &str, user_id: &str) -> ServiceResult<User> {
        UserRepository::new(self.pool)
            .get_user_for_merchant(user_id, merchant_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))
    }

    /// Updates a user of the merchant.
    ///
    /// A new password is hashed before it is stored. Changing the password or
    /// moving the user out of `active` revokes every session the user holds.
    pub async fn update_user(
        &self,
        sessions: &SessionService,
        merchant_id: &str,
        user_id: &str,
        request: UpdateUserRequest,
    ) -> ServiceResult<User> {
        request
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        if let Some(role_id) = &request.role_id {
            let role = RoleRepository::new(self.pool)
                .get_role_for_merchant(role_id, merchant_id)
                .await?;
            if role.is_none() {
                return Err(ServiceError::not_found("Role", role_id));
            }
        }

        let password_hash = match request.password {
            Some(password) => Some(self.verifier.hash_blocking(password).await?),
            None => None,
        };
        let password_changed = password_hash.is_some();

        let user = UserRepository::new(self.pool)
            .update_user(
                user_id,
                merchant_id,
                UserChanges {
                    email: request.email,
                    full_name: request.full_name,
                    password_hash,
                    role_id: request.role_id,
                    status: request.status,
                },
            )
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))?;

        if password_changed || user.status != USER_STATUS_ACTIVE {
            let revoked = sessions.logout_all(&user.id).await?;
            tracing::info!(user_id = %user.id, revoked, "Revoked sessions after user update");
        }

        tracing::info!(merchant_id = %merchant_id, user_id = %user.id, "User updated");
        Ok(user)
    }

    /// Deletes a user of the merchant after revoking its sessions.
    pub async fn delete_user(
        &self,
        sessions: &SessionService,
        merchant_id: &str,
        user_id: &str,
    ) -> ServiceResult<()> {
        let repo = UserRepository::new(self.pool);
        if repo.get_user_for_merchant(user_id, merchant_id).await?.is_none() {
            return Err(ServiceError::not_found("User", user_id));
        }

        sessions.logout_all(user_id).await?;
        if !repo.delete_user(user_id, merchant_id).await? {
            return Err(ServiceError::not_found("User", user_id));
        }

        tracing::info!(merchant_id = %merchant_id, user_id = %user_id, "User deleted");
        Ok(())
    }

    /// Retrieves one page of a merchant's users and the total count.
    pub async fn list_users(
        &self,
        merchant_id: &str,
        pagination: &PaginationFilter,
    ) -> ServiceResult<(Vec<User>, u64)> {
        pagination
            .validate()
            .map_err(ServiceError::from_validation_errors)?;

        let repo = UserRepository::new(self.pool);
        let users = repo.list_users_by_merchant(merchant_id, pagination).await?;
        let total = repo.count_users_by_merchant(merchant_id).await?;

        Ok((users, total))
    }
}
