//! Handler functions for merchant and staff session endpoints.
//!
//! These functions parse request data, validate input, call the session
//! services and report each outcome to the audit sink.

use crate::api::common::{
    auth_error_to_http, service_error_to_http, validation_error_response,
};
use crate::auth::authorization::{AuthorizationGate, permissions};
use crate::auth::context::Identity;
use crate::auth::models::*;
use crate::database::models::{CreateMerchant, MerchantProfile};
use crate::services::audit::{AuditAction, AuditEvent};
use crate::services::merchant_service::MerchantService;
use crate::services::user_service::UserService;
use crate::state::AppState;
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::Json as ResponseJson,
};
use validator::Validate;

type HandlerResult<T> = Result<ResponseJson<T>, (StatusCode, String)>;

/// Handle merchant registration request
#[axum::debug_handler]
pub async fn register_merchant(
    Extension(state): Extension<AppState>,
    Json(payload): Json<CreateMerchant>,
) -> Result<(StatusCode, ResponseJson<MerchantProfile>), (StatusCode, String)> {
    let profile = MerchantService::new(&state.pool, state.verifier)
        .register(payload)
        .await
        .map_err(service_error_to_http)?;

    state.audit.record(
        AuditEvent::success(AuditAction::MerchantRegistered)
            .merchant(&profile.id)
            .principal(&profile.id),
    );
    Ok((StatusCode::CREATED, ResponseJson(profile)))
}

/// Handle merchant login request
#[axum::debug_handler]
pub async fn login_merchant(
    Extension(state): Extension<AppState>,
    Json(payload): Json<LoginMerchantRequest>,
) -> HandlerResult<LoginMerchantResponse> {
    payload.validate().map_err(validation_error_response)?;

    let service = MerchantService::new(&state.pool, state.verifier);
    match service.login(&state.sessions, payload).await {
        Ok(login) => {
            state.audit.record(
                AuditEvent::success(AuditAction::MerchantLogin)
                    .merchant(&login.merchant.id)
                    .principal(&login.merchant.id),
            );
            Ok(ResponseJson(LoginMerchantResponse {
                access_token: login.tokens.access_token,
                refresh_token: login.tokens.refresh_token,
                expires_in: login.tokens.expires_in,
                user_management_enabled: login.merchant.feature_flags.user_management,
                available_staff: login.available_staff,
            }))
        }
        Err(error) => {
            state.audit.record(AuditEvent::failure(
                AuditAction::MerchantLogin,
                error.reason(),
            ));
            Err(auth_error_to_http(error))
        }
    }
}

/// Handle staff user login request
#[axum::debug_handler]
pub async fn login_user(
    Extension(state): Extension<AppState>,
    Json(payload): Json<LoginUserRequest>,
) -> HandlerResult<LoginUserResponse> {
    payload.validate().map_err(validation_error_response)?;
    let merchant_id = payload.merchant_id.clone();

    let service = UserService::new(&state.pool, state.verifier);
    match service.login(&state.sessions, payload).await {
        Ok(login) => {
            state.audit.record(
                AuditEvent::success(AuditAction::UserLogin)
                    .merchant(&merchant_id)
                    .principal(&login.user.id),
            );
            Ok(ResponseJson(LoginUserResponse {
                access_token: login.tokens.access_token,
                refresh_token: login.tokens.refresh_token,
                expires_in: login.tokens.expires_in,
                user: login.user,
            }))
        }
        Err(error) => {
            state.audit.record(
                AuditEvent::failure(AuditAction::UserLogin, error.reason())
                    .merchant(&merchant_id),
            );
            Err(auth_error_to_http(error))
        }
    }
}

/// Handle token refresh request
///
/// Serves both merchant and staff refresh tokens; the stored record decides
/// which identity the new pair is issued to.
#[axum::debug_handler]
pub async fn refresh_token(
    Extension(state): Extension<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> HandlerResult<TokenPair> {
    payload.validate().map_err(validation_error_response)?;

    match state.sessions.refresh(&payload.refresh_token).await {
        Ok(pair) => {
            state.audit.record(AuditEvent::success(AuditAction::TokenRefresh));
            Ok(ResponseJson(pair))
        }
        Err(error) => {
            state.audit.record(AuditEvent::failure(
                AuditAction::TokenRefresh,
                error.reason(),
            ));
            Err(auth_error_to_http(error))
        }
    }
}

/// Resolve the identity behind an access token
#[axum::debug_handler]
pub async fn introspect_token(
    Extension(state): Extension<AppState>,
    Json(payload): Json<IntrospectTokenRequest>,
) -> HandlerResult<IntrospectTokenResponse> {
    payload.validate().map_err(validation_error_response)?;

    let claims = state
        .sessions
        .validate_access(&payload.access_token)
        .map_err(|error| {
            tracing::debug!(reason = error.reason(), "Access token rejected");
            auth_error_to_http(error)
        })?;

    let principal = claims.principal();
    Ok(ResponseJson(IntrospectTokenResponse {
        principal_id: principal.id,
        kind: principal.kind,
        merchant_id: principal.merchant_id,
        expires_at: claims.exp,
    }))
}

/// Handle logout request for one device
#[axum::debug_handler]
pub async fn logout_merchant(
    Extension(state): Extension<AppState>,
    Identity(identity): Identity,
    Json(payload): Json<RefreshTokenRequest>,
) -> HandlerResult<Ack> {
    payload.validate().map_err(validation_error_response)?;

    state
        .sessions
        .logout(&payload.refresh_token)
        .await
        .map_err(auth_error_to_http)?;

    state.audit.record(
        AuditEvent::success(AuditAction::Logout)
            .merchant(identity.merchant_id())
            .principal(identity.user_id().unwrap_or(identity.merchant_id())),
    );
    Ok(ResponseJson(Ack::new("Logged out successfully")))
}

/// Handle merchant logout from every device
#[axum::debug_handler]
pub async fn logout_all_devices(
    Extension(state): Extension<AppState>,
    Identity(identity): Identity,
    Json(payload): Json<LogoutAllDevicesRequest>,
) -> HandlerResult<Ack> {
    payload.validate().map_err(validation_error_response)?;

    if payload.merchant_id != identity.merchant_id() {
        tracing::warn!(
            merchant_id = %identity.merchant_id(),
            "Attempt to revoke sessions of another merchant"
        );
        return Err(service_error_to_http(
            crate::errors::ServiceError::permission_denied(
                "cannot revoke sessions of another merchant",
            ),
        ));
    }

    AuthorizationGate::new(&state.pool)
        .require(&identity, permissions::SESSION_REVOKE_ALL)
        .await
        .map_err(service_error_to_http)?;

    state
        .sessions
        .logout_all(identity.merchant_id())
        .await
        .map_err(auth_error_to_http)?;

    state.audit.record(
        AuditEvent::success(AuditAction::LogoutAllDevices)
            .merchant(identity.merchant_id())
            .principal(identity.merchant_id()),
    );
    Ok(ResponseJson(Ack::new("Logged out from all devices")))
}

/// Handle staff logout from every device
#[axum::debug_handler]
pub async fn logout_user_all_devices(
    Extension(state): Extension<AppState>,
    Identity(identity): Identity,
) -> HandlerResult<Ack> {
    let Some(user_id) = identity.user_id() else {
        return Err(service_error_to_http(
            crate::errors::ServiceError::validation("caller is not a staff user"),
        ));
    };

    state
        .sessions
        .logout_all(user_id)
        .await
        .map_err(auth_error_to_http)?;

    state.audit.record(
        AuditEvent::success(AuditAction::LogoutAllDevices)
            .merchant(identity.merchant_id())
            .principal(user_id),
    );
    Ok(ResponseJson(Ack::new("Logged out from all devices")))
}

/// Get the merchant of the current caller
#[axum::debug_handler]
pub async fn get_current_merchant(
    Extension(state): Extension<AppState>,
    Identity(identity): Identity,
) -> HandlerResult<MerchantProfile> {
    MerchantService::new(&state.pool, state.verifier)
        .get_current(identity.merchant_id())
        .await
        .map(ResponseJson)
        .map_err(service_error_to_http)
}

/// Turn merchant features on or off
#[axum::debug_handler]
pub async fn update_merchant_features(
    Extension(state): Extension<AppState>,
    Identity(identity): Identity,
    Json(payload): Json<UpdateFeatureFlagsRequest>,
) -> HandlerResult<MerchantProfile> {
    AuthorizationGate::new(&state.pool)
        .require(&identity, permissions::MERCHANT_UPDATE)
        .await
        .map_err(service_error_to_http)?;

    MerchantService::new(&state.pool, state.verifier)
        .update_feature_flags(identity.merchant_id(), payload.user_management)
        .await
        .map(ResponseJson)
        .map_err(service_error_to_http)
}
