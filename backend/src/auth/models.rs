//! Data structures for authentication-related entities.
//!
//! Principals, token pairs and the typed request/response contracts of the
//! session endpoints.

use crate::database::models::{MerchantProfile, StaffSummary, User};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// The two kinds of principal that can hold a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    Merchant,
    User,
}

impl PrincipalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::Merchant => "merchant",
            PrincipalKind::User => "user",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrincipalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merchant" => Ok(PrincipalKind::Merchant),
            "user" => Ok(PrincipalKind::User),
            other => Err(format!("unknown principal kind '{}'", other)),
        }
    }
}

/// Subject bound into issued tokens.
///
/// For a merchant `id == merchant_id`; a staff user carries its own id and
/// the merchant it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPrincipal {
    pub id: String,
    pub kind: PrincipalKind,
    pub merchant_id: String,
}

impl SessionPrincipal {
    pub fn merchant(merchant_id: impl Into<String>) -> Self {
        let merchant_id = merchant_id.into();
        Self {
            id: merchant_id.clone(),
            kind: PrincipalKind::Merchant,
            merchant_id,
        }
    }

    pub fn user(user_id: impl Into<String>, merchant_id: impl Into<String>) -> Self {
        Self {
            id: user_id.into(),
            kind: PrincipalKind::User,
            merchant_id: merchant_id.into(),
        }
    }
}

/// Access and refresh token issued together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginMerchantRequest {
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,

    #[validate(length(min = 1, message = "PIN is required"))]
    pub pin: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginMerchantResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub user_management_enabled: bool,
    pub available_staff: Vec<StaffSummary>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginUserRequest {
    #[validate(length(min = 1, message = "Merchant ID is required"))]
    pub merchant_id: String,

    /// Username or email
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginUserResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub user: UserInfo,
}

/// Staff user information returned in login responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub id: String,
    pub merchant_id: String,
    pub username: String,
    pub email: Option<String>,
    pub full_name: String,
    pub role_id: Option<String>,
    pub role_name: Option<String>,
    pub status: String,
}

impl UserInfo {
    pub fn from_user(user: User, role_name: Option<String>) -> Self {
        Self {
            id: user.id,
            merchant_id: user.merchant_id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            role_id: user.role_id,
            role_name,
            status: user.status,
        }
    }
}

/// Token refresh and logout request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct IntrospectTokenRequest {
    #[validate(length(min = 1, message = "Access token is required"))]
    pub access_token: String,
}

/// Identity carried by a valid access token. Edge services use this to fill
/// the identity headers of downstream calls.
#[derive(Debug, Serialize, Deserialize)]
pub struct IntrospectTokenResponse {
    pub principal_id: String,
    pub kind: PrincipalKind,
    pub merchant_id: String,
    /// Unix seconds
    pub expires_at: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LogoutAllDevicesRequest {
    #[validate(length(min = 1, message = "Merchant ID is required"))]
    pub merchant_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFeatureFlagsRequest {
    pub user_management: bool,
}

/// Acknowledgement returned by logout endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Outcome of a merchant login, before it is shaped into a response.
#[derive(Debug)]
pub struct MerchantLogin {
    pub tokens: TokenPair,
    pub merchant: MerchantProfile,
    pub available_staff: Vec<StaffSummary>,
}

/// Outcome of a staff login.
#[derive(Debug)]
pub struct UserLogin {
    pub tokens: TokenPair,
    pub user: UserInfo,
}
