//! Call-scoped identity extracted from request metadata.
//!
//! # Trust boundary
//! The headers read here are injected by the upstream gateway after it has
//! validated the caller's access token. This module performs no signature
//! checks, so the service must never be reachable without that gateway in
//! front of it.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, request::Parts},
};

use crate::api::common::error_response;

pub const MERCHANT_ID_HEADER: &str = "x-merchant-id";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Identity of the caller. Immutable once attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    merchant_id: String,
    user_id: Option<String>,
    user_email: Option<String>,
    user_role: Option<String>,
}

impl RequestIdentity {
    pub fn new(merchant_id: impl Into<String>) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            user_id: None,
            user_email: None,
            user_role: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Builds the identity from gateway headers.
    ///
    /// # Returns
    /// `None` if the merchant header is missing, empty or not valid UTF-8
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let merchant_id = header_value(headers, MERCHANT_ID_HEADER)?;

        Some(Self {
            merchant_id,
            user_id: header_value(headers, USER_ID_HEADER),
            user_email: header_value(headers, USER_EMAIL_HEADER),
            user_role: header_value(headers, USER_ROLE_HEADER),
        })
    }

    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn user_email(&self) -> Option<&str> {
        self.user_email.as_deref()
    }

    pub fn user_role(&self) -> Option<&str> {
        self.user_role.as_deref()
    }

    /// True when the caller is the merchant itself rather than a staff user.
    pub fn is_merchant_owner(&self) -> bool {
        self.user_id.is_none()
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Extractor for the identity attached by `require_identity`.
///
/// Only valid on routes behind the gate. A missing identity there is a
/// routing bug, reported as an internal error.
#[derive(Debug, Clone)]
pub struct Identity(pub RequestIdentity);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<RequestIdentity>() {
            Some(identity) => Ok(Identity(identity.clone())),
            None => {
                tracing::error!(path = %parts.uri.path(), "Request identity missing behind the gate");
                Err(error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                ))
            }
        }
    }
}
