//! Handler functions for staff user management.
//!
//! Every endpoint acts on the caller's own merchant only. A user of another
//! merchant is reported as not found.

use crate::api::common::{
    ApiResponse, PaginatedData, PaginationFilter, PaginationMeta, service_error_to_http,
    validation_error_response,
};
use crate::auth::authorization::{AuthorizationGate, permissions};
use crate::auth::context::Identity;
use crate::database::models::{CreateNewUser, UpdateUserRequest, User};
use crate::services::user_service::UserService;
use crate::state::AppState;
use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
};
use validator::Validate;

/// Creates a staff user in the caller's merchant.
#[axum::debug_handler]
pub async fn create_user(
    Extension(state): Extension<AppState>,
    Identity(identity): Identity,
    Json(payload): Json<CreateNewUser>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), (StatusCode, String)> {
    AuthorizationGate::new(&state.pool)
        .require(&identity, permissions::USER_CREATE)
        .await
        .map_err(service_error_to_http)?;

    payload.validate().map_err(validation_error_response)?;

    if let Some(role_id) = &payload.role_id {
        AuthorizationGate::new(&state.pool)
            .require_assignable_role(&identity, role_id)
            .await
            .map_err(service_error_to_http)?;
    }

    let user = UserService::new(&state.pool, state.verifier)
        .create_user(identity.merchant_id(), payload)
        .await
        .map_err(service_error_to_http)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(user, "User created successfully")),
    ))
}

/// Lists the caller's merchant staff, newest first.
#[axum::debug_handler]
pub async fn list_users(
    Extension(state): Extension<AppState>,
    Identity(identity): Identity,
    Query(pagination): Query<PaginationFilter>,
) -> Result<Json<ApiResponse<PaginatedData<User>>>, (StatusCode, String)> {
    AuthorizationGate::new(&state.pool)
        .require(&identity, permissions::USER_READ)
        .await
        .map_err(service_error_to_http)?;

    let (users, total) = UserService::new(&state.pool, state.verifier)
        .list_users(identity.merchant_id(), &pagination)
        .await
        .map_err(service_error_to_http)?;

    tracing::debug!(merchant_id = %identity.merchant_id(), total, "Listed users");
    Ok(Json(ApiResponse::paginated(
        PaginatedData::new(users, total),
        PaginationMeta::from_filter(&pagination, total),
        "Users retrieved successfully",
    )))
}

/// Retrieves one staff user.
#[axum::debug_handler]
pub async fn get_user(
    Extension(state): Extension<AppState>,
    Identity(identity): Identity,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<User>>, (StatusCode, String)> {
    AuthorizationGate::new(&state.pool)
        .require(&identity, permissions::USER_READ)
        .await
        .map_err(service_error_to_http)?;

    let user = UserService::new(&state.pool, state.verifier)
        .get_user(identity.merchant_id(), &user_id)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::ok(user)))
}

/// Updates a staff user. Password and deactivation changes end the user's sessions.
#[axum::debug_handler]
pub async fn update_user(
    Extension(state): Extension<AppState>,
    Identity(identity): Identity,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<User>>, (StatusCode, String)> {
    AuthorizationGate::new(&state.pool)
        .require(&identity, permissions::USER_UPDATE)
        .await
        .map_err(service_error_to_http)?;

    payload.validate().map_err(validation_error_response)?;

    if let Some(role_id) = &payload.role_id {
        AuthorizationGate::new(&state.pool)
            .require_assignable_role(&identity, role_id)
            .await
            .map_err(service_error_to_http)?;
    }

    let user = UserService::new(&state.pool, state.verifier)
        .update_user(&state.sessions, identity.merchant_id(), &user_id, payload)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success(user, "User updated successfully")))
}

#[axum::debug_handler]
pub async fn delete_user(
    Extension(state): Extension<AppState>,
    Identity(identity): Identity,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, String)> {
    AuthorizationGate::new(&state.pool)
        .require(&identity, permissions::USER_DELETE)
        .await
        .map_err(service_error_to_http)?;

    UserService::new(&state.pool, state.verifier)
        .delete_user(&state.sessions, identity.merchant_id(), &user_id)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::success((), "User deleted successfully")))
}
