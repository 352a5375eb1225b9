//! Handler functions for roles and permissions.

use crate::api::common::{
    ApiResponse, PaginatedData, PaginationFilter, PaginationMeta, service_error_to_http,
    validation_error_response,
};
use crate::auth::authorization::{AuthorizationGate, permissions};
use crate::auth::context::Identity;
use crate::database::models::{CreateRoleRequest, Permission, Role, RoleDetail};
use crate::services::role_service::RoleService;
use crate::state::AppState;
use axum::{
    extract::{Extension, Json, Path, Query},
    http::StatusCode,
};
use validator::Validate;

/// Lists the roles the caller's merchant can assign.
#[axum::debug_handler]
pub async fn list_roles(
    Extension(state): Extension<AppState>,
    Identity(identity): Identity,
    Query(pagination): Query<PaginationFilter>,
) -> Result<Json<ApiResponse<PaginatedData<Role>>>, (StatusCode, String)> {
    AuthorizationGate::new(&state.pool)
        .require(&identity, permissions::ROLE_READ)
        .await
        .map_err(service_error_to_http)?;

    let (roles, total) = RoleService::new(&state.pool)
        .list_roles(identity.merchant_id(), &pagination)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::paginated(
        PaginatedData::new(roles, total),
        PaginationMeta::from_filter(&pagination, total),
        "Roles retrieved successfully",
    )))
}

/// Lists the permission catalog. Any authenticated caller may read it.
#[axum::debug_handler]
pub async fn list_permissions(
    Extension(state): Extension<AppState>,
    Identity(_identity): Identity,
) -> Result<Json<ApiResponse<Vec<Permission>>>, (StatusCode, String)> {
    let permissions = RoleService::new(&state.pool)
        .list_permissions()
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::ok(permissions)))
}

/// Creates a role in the caller's merchant.
///
/// The caller must itself hold every permission the new role grants.
#[axum::debug_handler]
pub async fn create_role(
    Extension(state): Extension<AppState>,
    Identity(identity): Identity,
    Json(payload): Json<CreateRoleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RoleDetail>>), (StatusCode, String)> {
    let gate = AuthorizationGate::new(&state.pool);
    gate.require(&identity, permissions::ROLE_CREATE)
        .await
        .map_err(service_error_to_http)?;

    payload.validate().map_err(validation_error_response)?;

    let service = RoleService::new(&state.pool);
    let grants = service
        .resolve_permissions(&payload.permission_ids)
        .await
        .map_err(service_error_to_http)?;
    let codes: Vec<&str> = grants.iter().map(|p| p.code.as_str()).collect();
    gate.require_all(&identity, &codes)
        .await
        .map_err(service_error_to_http)?;

    let role = service
        .create_role(identity.merchant_id(), payload)
        .await
        .map_err(service_error_to_http)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(role, "Role created successfully")),
    ))
}

/// Retrieves a role the caller's merchant can assign, with its permissions.
#[axum::debug_handler]
pub async fn get_role(
    Extension(state): Extension<AppState>,
    Identity(identity): Identity,
    Path(role_id): Path<String>,
) -> Result<Json<ApiResponse<RoleDetail>>, (StatusCode, String)> {
    AuthorizationGate::new(&state.pool)
        .require(&identity, permissions::ROLE_READ)
        .await
        .map_err(service_error_to_http)?;

    let role = RoleService::new(&state.pool)
        .get_role(identity.merchant_id(), &role_id)
        .await
        .map_err(service_error_to_http)?;

    Ok(Json(ApiResponse::ok(role)))
}
