//! Error taxonomy of the session lifecycle engine.
//!
//! The variants stay distinct internally so logs can tell a missing principal
//! from a wrong secret. The HTTP boundary (`api::common::auth_error_to_http`)
//! collapses the login failures into one generic outcome.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("principal not found")]
    PrincipalNotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("principal is inactive")]
    InactivePrincipal,

    #[error("user management is disabled for this merchant")]
    FeatureDisabled,

    #[error("invalid token")]
    InvalidToken,

    #[error("token has expired")]
    ExpiredToken,

    #[error("storage error: {source}")]
    Storage {
        #[from]
        source: anyhow::Error,
    },

    #[error("secret rejected: {message}")]
    Hashing { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

pub type AuthResult<T> = Result<T, AuthError>;

impl From<sqlx::Error> for AuthError {
    fn from(error: sqlx::Error) -> Self {
        Self::Storage {
            source: error.into(),
        }
    }
}

impl AuthError {
    pub fn hashing(message: impl Into<String>) -> Self {
        Self::Hashing {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Variant name recorded by the audit trail. Never sent to clients.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::PrincipalNotFound => "principal_not_found",
            Self::InvalidCredentials => "invalid_credentials",
            Self::InactivePrincipal => "inactive_principal",
            Self::FeatureDisabled => "feature_disabled",
            Self::InvalidToken => "invalid_token",
            Self::ExpiredToken => "expired_token",
            Self::Storage { .. } => "storage",
            Self::Hashing { .. } => "hashing",
            Self::Internal { .. } => "internal",
        }
    }
}
