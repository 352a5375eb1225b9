//! Rust structs that represent database table mappings.
//!
//! These models define the structure of data as it is stored in and retrieved
//! from the database. Note that these may differ from API-specific models:
//! credential hashes never leave this layer in a serialized response.

use crate::auth::models::{PrincipalKind, SessionPrincipal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Status value of a staff user allowed to sign in.
pub const USER_STATUS_ACTIVE: &str = "active";

/// Every status a staff user can be put in.
pub const USER_STATUSES: [&str; 3] = [USER_STATUS_ACTIVE, "inactive", "suspended"];

#[derive(Debug, Clone, FromRow)]
pub struct Merchant {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub timezone: String,
    pub pin_hash: String,
    pub user_management_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Merchant data safe to hand to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MerchantProfile {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub timezone: String,
    pub feature_flags: FeatureFlags,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    pub user_management: bool,
}

impl From<Merchant> for MerchantProfile {
    fn from(merchant: Merchant) -> Self {
        Self {
            id: merchant.id,
            name: merchant.name,
            phone: merchant.phone,
            timezone: merchant.timezone,
            feature_flags: FeatureFlags {
                user_management: merchant.user_management_enabled,
            },
            created_at: merchant.created_at,
            updated_at: merchant.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateMerchant {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Merchant name must be between 1-255 characters"
    ))]
    pub name: String,

    #[validate(length(min = 3, max = 32, message = "Phone must be between 3-32 characters"))]
    pub phone: String,

    #[validate(length(min = 1, max = 64, message = "Timezone must be between 1-64 characters"))]
    pub timezone: String,

    #[validate(length(min = 4, max = 12, message = "PIN must be between 4-12 characters"))]
    pub pin: String,
}

/// Row inserted by the merchant repository once the PIN has been hashed.
#[derive(Debug, Clone)]
pub struct NewMerchant {
    pub name: String,
    pub phone: String,
    pub timezone: String,
    pub pin_hash: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: String,
    pub merchant_id: String,
    pub username: String,
    pub email: Option<String>,
    pub full_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role_id: Option<String>,
    pub status: String,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == USER_STATUS_ACTIVE
    }
}

/// Staff user joined with the name of its role.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct StaffSummary {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub role_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateNewUser {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Username must be between 1-255 characters"
    ))]
    pub username: String,

    #[validate(
        email(message = "Must be a valid email"),
        length(max = 255, message = "Email too long")
    )]
    pub email: Option<String>,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Full name must be between 1-255 characters"
    ))]
    pub full_name: String,

    #[validate(length(min = 8, max = 72, message = "Password must be between 8-72 characters"))]
    pub password: String,

    pub role_id: Option<String>,
}

/// Row inserted by the user repository once the password has been hashed.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub merchant_id: String,
    pub username: String,
    pub email: Option<String>,
    pub full_name: String,
    pub password_hash: String,
    pub role_id: Option<String>,
}

/// Partial update of a staff user. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(
        email(message = "Must be a valid email"),
        length(max = 255, message = "Email too long")
    )]
    pub email: Option<String>,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Full name must be between 1-255 characters"
    ))]
    pub full_name: Option<String>,

    #[validate(length(min = 8, max = 72, message = "Password must be between 8-72 characters"))]
    pub password: Option<String>,

    pub role_id: Option<String>,

    #[validate(custom(function = "validate_user_status"))]
    pub status: Option<String>,
}

fn validate_user_status(status: &str) -> Result<(), validator::ValidationError> {
    if USER_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("status")
            .with_message("Status must be one of active, inactive, suspended".into()))
    }
}

/// Column changes applied by the user repository, password already hashed.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password_hash: Option<String>,
    pub role_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Role {
    pub id: String,
    pub merchant_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub is_system: bool,
}

/// A role together with the permissions it grants.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleDetail {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 100, message = "Role name must be between 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 255, message = "Description too long"))]
    pub description: Option<String>,

    /// Permission IDs from the catalog
    #[serde(default)]
    pub permission_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Permission {
    pub id: String,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub module: String,
}

/// Durable record of one issued refresh token.
///
/// A record is active while it is neither revoked nor past `expires_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshTokenRecord {
    pub id: String,
    pub principal_id: String,
    pub principal_kind: PrincipalKind,
    pub merchant_id: String,
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_revoked: bool,
}

impl RefreshTokenRecord {
    /// The identity the token was issued to.
    pub fn principal(&self) -> SessionPrincipal {
        SessionPrincipal {
            id: self.principal_id.clone(),
            kind: self.principal_kind,
            merchant_id: self.merchant_id.clone(),
        }
    }
}
