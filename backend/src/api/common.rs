//! Error handling utilities for API responses.
//!
//! Provides structured error responses and conversion between service-layer errors
//! and HTTP responses. Includes:
//! - Standard response envelope
//! - ServiceError and AuthError to HTTP status code mapping
//! - Validation error formatting helpers
//! - Pagination support for list endpoints
//!
//! # Response Format
//! All errors return consistent JSON responses containing:
//! - `error`: Human-readable message
//! - `error_type`: Machine-readable error category
//! - `details`: Optional field-specific validation errors
//!
//! # Login failures
//! Unknown principal, wrong secret and inactive account all surface as the
//! same `invalid_credentials` response. Only the log line tells them apart.

use crate::auth::errors::AuthError;
use crate::errors::ServiceError;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Standard API response wrapper for all endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Indicates if the request was successful
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable message
    pub message: String,
    /// Error details (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
    /// Pagination metadata (present for paginated responses)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
    /// Request timestamp
    pub timestamp: String,
}

/// Pagination metadata for list responses
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginationMeta {
    /// Current page number (1-indexed)
    pub current_page: u32,
    /// Number of items per page
    pub per_page: u32,
    /// Total number of items across all pages
    pub total_items: u64,
    /// Total number of pages
    pub total_pages: u32,
    /// Whether there is a next page
    pub has_next: bool,
    /// Whether there is a previous page
    pub has_prev: bool,
    /// Next page number (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page: Option<u32>,
    /// Previous page number (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_page: Option<u32>,
}

/// Paginated response wrapper containing items and pagination metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedData<T> {
    /// List of items for current page
    pub items: Vec<T>,
    /// Total count of items
    pub total: u64,
}

/// Error details for failed requests
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error type identifier
    pub error_type: String,
    /// Field-specific validation errors when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

/// Field-specific validation error details
#[derive(Debug, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the field with validation error
    pub field: String,
    /// Description of the validation failure
    pub message: String,
}

/// Pagination parameters for requests
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PaginationFilter {
    /// Page number (1-indexed)
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    /// Number of items per page
    #[validate(range(min = 1, max = 100))]
    pub per_page: Option<u32>,
}

impl PaginationMeta {
    /// Create pagination metadata from page parameters and total count
    pub fn new(current_page: u32, per_page: u32, total_items: u64) -> Self {
        let total_pages = if total_items == 0 {
            1
        } else {
            ((total_items - 1) / per_page as u64 + 1) as u32
        };

        let has_next = current_page < total_pages;
        let has_prev = current_page > 1;

        Self {
            current_page,
            per_page,
            total_items,
            total_pages,
            has_next,
            has_prev,
            next_page: has_next.then(|| current_page + 1),
            prev_page: has_prev.then(|| current_page - 1),
        }
    }

    pub fn from_filter(filter: &PaginationFilter, total_items: u64) -> Self {
        Self::new(filter.page(), filter.per_page(), total_items)
    }
}

impl<T> PaginatedData<T> {
    pub fn new(items: Vec<T>, total: u64) -> Self {
        Self { items, total }
    }
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            error: None,
            pagination: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create a successful response with default message
    pub fn ok(data: T) -> Self {
        Self::success(data, "Request successful")
    }

    /// Create a successful paginated response
    pub fn paginated(data: T, pagination: PaginationMeta, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            error: None,
            pagination: Some(pagination),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create an error response
    pub fn error(
        message: impl Into<String>,
        error_type: impl Into<String>,
        details: Option<Vec<FieldError>>,
    ) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message: message.into(),
            error: Some(ErrorDetails {
                error_type: error_type.into(),
                details,
            }),
            pagination: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl PaginationFilter {
    /// Get page number with default
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1)
    }

    /// Get per_page with default
    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(20)
    }

    /// Calculate offset for database queries
    pub fn offset(&self) -> u64 {
        (self.page().saturating_sub(1) as u64) * self.per_page() as u64
    }

    /// Get limit for database queries
    pub fn limit(&self) -> u64 {
        self.per_page() as u64
    }
}

impl Default for PaginationFilter {
    fn default() -> Self {
        Self {
            page: Some(1),
            per_page: Some(20),
        }
    }
}

fn envelope_body(response: &ApiResponse<()>) -> String {
    serde_json::to_string(response).unwrap_or_else(|_| response.message.clone())
}

/// Builds an error body in the standard envelope.
pub fn error_response(
    status: StatusCode,
    error_type: &str,
    message: impl Into<String>,
) -> (StatusCode, String) {
    let error_response = ApiResponse::<()>::error(message, error_type, None);
    (status, envelope_body(&error_response))
}

/// Machine-readable category of an auth failure as clients see it.
///
/// The login rejections share one category. The audit trail records
/// `AuthError::reason` instead.
pub fn auth_error_kind(error: &AuthError) -> &'static str {
    match error {
        AuthError::PrincipalNotFound
        | AuthError::InvalidCredentials
        | AuthError::InactivePrincipal => "invalid_credentials",
        AuthError::FeatureDisabled => "feature_disabled",
        AuthError::InvalidToken | AuthError::ExpiredToken => "unauthenticated",
        AuthError::Hashing { .. } => "invalid_argument",
        AuthError::Storage { .. } | AuthError::Internal { .. } => "internal_error",
    }
}

/// Converts AuthError to an HTTP response.
pub fn auth_error_to_http(error: AuthError) -> (StatusCode, String) {
    let kind = auth_error_kind(&error);
    match error {
        AuthError::PrincipalNotFound
        | AuthError::InvalidCredentials
        | AuthError::InactivePrincipal => {
            tracing::debug!("Login rejected: {}", error);
            error_response(StatusCode::UNAUTHORIZED, kind, "invalid credentials")
        }
        AuthError::FeatureDisabled => error_response(
            StatusCode::FORBIDDEN,
            kind,
            "user management is disabled for this merchant",
        ),
        AuthError::InvalidToken | AuthError::ExpiredToken => {
            error_response(StatusCode::UNAUTHORIZED, kind, error.to_string())
        }
        AuthError::Hashing { message } => error_response(StatusCode::BAD_REQUEST, kind, message),
        AuthError::Storage { source } => {
            tracing::error!("Storage error: {:#}", source);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, kind, "Internal server error")
        }
        AuthError::Internal { message } => {
            tracing::error!("Internal error: {}", message);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, kind, "Internal server error")
        }
    }
}

/// Converts ServiceError to appropriate HTTP response with standard format
pub fn service_error_to_http(error: ServiceError) -> (StatusCode, String) {
    let (status, error_type, message) = match error {
        ServiceError::Auth(error) => return auth_error_to_http(error),
        ServiceError::Validation { message } => {
            (StatusCode::BAD_REQUEST, "validation_error", message)
        }
        ServiceError::NotFound { entity, identifier } => (
            StatusCode::NOT_FOUND,
            "not_found",
            format!("{} '{}' not found", entity, identifier),
        ),
        ServiceError::AlreadyExists { entity, identifier } => (
            StatusCode::CONFLICT,
            "already_exists",
            format!("{} '{}' already exists", entity, identifier),
        ),
        ServiceError::PermissionDenied { message } => {
            (StatusCode::FORBIDDEN, "permission_denied", message)
        }
        ServiceError::Database { source } => {
            tracing::error!("Database error: {:#}", source);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                "Internal server error".to_string(),
            )
        }
    };

    error_response(status, error_type, message)
}

/// Formats validator::ValidationErrors into field-specific error details
pub fn validation_errors_to_field_errors(errors: validator::ValidationErrors) -> Vec<FieldError> {
    errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| FieldError {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .unwrap_or(&"Invalid value".into())
                    .to_string(),
            })
        })
        .collect()
}

/// Helper to create validation error response
pub fn validation_error_response(errors: validator::ValidationErrors) -> (StatusCode, String) {
    let field_errors = validation_errors_to_field_errors(errors);
    let error_response =
        ApiResponse::<()>::error("Validation failed", "validation_error", Some(field_errors));
    (StatusCode::BAD_REQUEST, envelope_body(&error_response))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_type(body: &str) -> String {
        let value: serde_json::Value = serde_json::from_str(body).unwrap();
        value["error"]["error_type"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_pagination_meta_calculation() {
        let meta = PaginationMeta::new(2, 10, 25);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next);
        assert!(meta.has_prev);
        assert_eq!(meta.next_page, Some(3));
        assert_eq!(meta.prev_page, Some(1));

        let meta = PaginationMeta::new(3, 10, 25);
        assert!(!meta.has_next);
        assert_eq!(meta.next_page, None);

        let meta = PaginationMeta::new(1, 10, 0);
        assert_eq!(meta.total_pages, 1);
        assert!(!meta.has_next);
        assert!(!meta.has_prev);
    }

    #[test]
    fn test_pagination_filter() {
        let filter = PaginationFilter {
            page: Some(2),
            per_page: Some(50),
        };
        assert_eq!(filter.offset(), 50);
        assert_eq!(filter.limit(), 50);

        let zero_page = PaginationFilter {
            page: Some(0),
            per_page: None,
        };
        assert_eq!(zero_page.offset(), 0);
        assert!(zero_page.validate().is_err());
    }

    #[test]
    fn test_login_rejections_are_indistinguishable() {
        let bodies: Vec<_> = [
            AuthError::PrincipalNotFound,
            AuthError::InvalidCredentials,
            AuthError::InactivePrincipal,
        ]
        .into_iter()
        .map(auth_error_to_http)
        .collect();

        for (status, body) in &bodies {
            assert_eq!(*status, StatusCode::UNAUTHORIZED);
            assert_eq!(error_type(body), "invalid_credentials");
            let value: serde_json::Value = serde_json::from_str(body).unwrap();
            assert_eq!(value["message"], "invalid credentials");
        }
    }

    #[test]
    fn test_auth_error_statuses() {
        let cases = [
            (AuthError::FeatureDisabled, StatusCode::FORBIDDEN, "feature_disabled"),
            (AuthError::InvalidToken, StatusCode::UNAUTHORIZED, "unauthenticated"),
            (AuthError::ExpiredToken, StatusCode::UNAUTHORIZED, "unauthenticated"),
            (AuthError::hashing("too long"), StatusCode::BAD_REQUEST, "invalid_argument"),
            (
                AuthError::internal("boom"),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
            ),
        ];

        for (error, expected_status, expected_type) in cases {
            let (status, body) = auth_error_to_http(error);
            assert_eq!(status, expected_status);
            assert_eq!(error_type(&body), expected_type);
        }
    }

    #[test]
    fn test_storage_details_are_not_leaked() {
        let (status, body) = service_error_to_http(ServiceError::Auth(AuthError::Storage {
            source: anyhow::anyhow!("no such table: refresh_tokens"),
        }));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("refresh_tokens"));
    }

    #[test]
    fn test_service_error_statuses() {
        assert_eq!(
            service_error_to_http(ServiceError::already_exists("Merchant", "+1")).0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            service_error_to_http(ServiceError::permission_denied("no")).0,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            service_error_to_http(ServiceError::not_found("Role", "r")).0,
            StatusCode::NOT_FOUND
        );

        let (status, body) =
            service_error_to_http(ServiceError::from(anyhow::anyhow!("database is locked")));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("database_error"));
        assert!(!body.contains("locked"));
    }
}
