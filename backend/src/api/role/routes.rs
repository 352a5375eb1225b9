//! Defines the HTTP routes for the role and permission catalog.

use super::handlers::{create_role, get_role, list_permissions, list_roles};
use crate::auth::routes::{Endpoint, EndpointRouter};
use axum::routing::{get, post};

pub fn role_router() -> EndpointRouter {
    EndpointRouter::new()
        .register(Endpoint::ListRoles, get(list_roles))
        .register(Endpoint::ListPermissions, get(list_permissions))
        .register(Endpoint::CreateRole, post(create_role))
        .register(Endpoint::GetRole, get(get_role))
}
