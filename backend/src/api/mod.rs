//! Central module for organizing the application's API endpoints.
//!
//! Session endpoints come from `auth::routes`; staff and role management
//! live in the submodules here. `router` assembles all of them behind the
//! per-call deadline.

pub mod common;
pub mod role;
pub mod user;

use crate::api::common::ApiResponse;
use crate::auth::middleware::enforce_deadline;
use crate::auth::routes::auth_router;
use crate::state::AppState;
use axum::{Extension, Router, middleware, response::Json, routing::get};

/// Builds the application router with every registered endpoint.
pub fn router(state: AppState) -> Router {
    let endpoints = auth_router()
        .merge(user::routes::user_router())
        .merge(role::routes::role_router());

    tracing::info!(endpoints = endpoints.registered().len(), "Routes registered");

    Router::new()
        .route("/", get(root_handler))
        .merge(endpoints.into_router())
        .layer(middleware::from_fn_with_state(
            state.request_timeout,
            enforce_deadline,
        ))
        .layer(Extension(state))
}

async fn root_handler() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(
        serde_json::json!({
            "service": "Merchant Auth",
            "version": env!("CARGO_PKG_VERSION")
        }),
        "Welcome to the Merchant Auth API",
    ))
}
