//! Defines the HTTP routes for staff user management.

use super::handlers::{create_user, delete_user, get_user, list_users, update_user};
use crate::auth::routes::{Endpoint, EndpointRouter};
use axum::routing::{delete, get, patch, post};

pub fn user_router() -> EndpointRouter {
    EndpointRouter::new()
        .register(Endpoint::CreateUser, post(create_user))
        .register(Endpoint::ListUsers, get(list_users))
        .register(Endpoint::GetUser, get(get_user))
        .register(Endpoint::UpdateUser, patch(update_user))
        .register(Endpoint::DeleteUser, delete(delete_user))
}
