//! Endpoint catalog and registration.
//!
//! Every route is declared as an `Endpoint` carrying its access policy.
//! `EndpointRouter::register` layers the identity gate onto authenticated
//! endpoints, so a handler cannot be mounted without the policy its
//! endpoint declares.

use crate::auth::handlers::*;
use crate::auth::middleware::require_identity;
use axum::{
    Router, middleware,
    routing::{MethodRouter, get, patch, post},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Reachable without caller identity
    Public,
    /// Requires the merchant identity header
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    RegisterMerchant,
    LoginMerchant,
    LoginUser,
    RefreshToken,
    IntrospectToken,
    LogoutMerchant,
    LogoutAllDevices,
    LogoutUserAllDevices,
    GetCurrentMerchant,
    UpdateMerchantFeatures,
    CreateUser,
    ListUsers,
    GetUser,
    UpdateUser,
    DeleteUser,
    ListRoles,
    ListPermissions,
    CreateRole,
    GetRole,
}

impl Endpoint {
    pub const ALL: [Endpoint; 19] = [
        Endpoint::RegisterMerchant,
        Endpoint::LoginMerchant,
        Endpoint::LoginUser,
        Endpoint::RefreshToken,
        Endpoint::IntrospectToken,
        Endpoint::LogoutMerchant,
        Endpoint::LogoutAllDevices,
        Endpoint::LogoutUserAllDevices,
        Endpoint::GetCurrentMerchant,
        Endpoint::UpdateMerchantFeatures,
        Endpoint::CreateUser,
        Endpoint::ListUsers,
        Endpoint::GetUser,
        Endpoint::UpdateUser,
        Endpoint::DeleteUser,
        Endpoint::ListRoles,
        Endpoint::ListPermissions,
        Endpoint::CreateRole,
        Endpoint::GetRole,
    ];

    /// RPC method name, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::RegisterMerchant => "RegisterMerchant",
            Endpoint::LoginMerchant => "LoginMerchant",
            Endpoint::LoginUser => "LoginUser",
            Endpoint::RefreshToken => "RefreshToken",
            Endpoint::IntrospectToken => "IntrospectToken",
            Endpoint::LogoutMerchant => "LogoutMerchant",
            Endpoint::LogoutAllDevices => "LogoutAllDevices",
            Endpoint::LogoutUserAllDevices => "LogoutUserAllDevices",
            Endpoint::GetCurrentMerchant => "GetCurrentMerchant",
            Endpoint::UpdateMerchantFeatures => "UpdateMerchantFeatures",
            Endpoint::CreateUser => "CreateUser",
            Endpoint::ListUsers => "ListUsers",
            Endpoint::GetUser => "GetUser",
            Endpoint::UpdateUser => "UpdateUser",
            Endpoint::DeleteUser => "DeleteUser",
            Endpoint::ListRoles => "ListRoles",
            Endpoint::ListPermissions => "ListPermissions",
            Endpoint::CreateRole => "CreateRole",
            Endpoint::GetRole => "GetRole",
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::RegisterMerchant => "/v1/merchants/register",
            Endpoint::LoginMerchant => "/v1/merchants/login",
            Endpoint::LoginUser => "/v1/users/login",
            Endpoint::RefreshToken => "/v1/auth/refresh",
            Endpoint::IntrospectToken => "/v1/auth/introspect",
            Endpoint::LogoutMerchant => "/v1/merchants/logout",
            Endpoint::LogoutAllDevices => "/v1/merchants/logout-all",
            Endpoint::LogoutUserAllDevices => "/v1/users/logout-all",
            Endpoint::GetCurrentMerchant => "/v1/merchants/me",
            Endpoint::UpdateMerchantFeatures => "/v1/merchants/me/features",
            Endpoint::CreateUser => "/v1/users/create",
            Endpoint::ListUsers => "/v1/users",
            Endpoint::GetUser => "/v1/users/{id}",
            Endpoint::UpdateUser => "/v1/users/{id}/update",
            Endpoint::DeleteUser => "/v1/users/{id}/delete",
            Endpoint::ListRoles => "/v1/roles",
            Endpoint::ListPermissions => "/v1/permissions",
            Endpoint::CreateRole => "/v1/roles/create",
            Endpoint::GetRole => "/v1/roles/{id}",
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Endpoint::RegisterMerchant
            | Endpoint::LoginMerchant
            | Endpoint::LoginUser
            | Endpoint::RefreshToken
            | Endpoint::IntrospectToken => Access::Public,
            _ => Access::Authenticated,
        }
    }
}

/// Router that only accepts routes through the endpoint catalog.
#[derive(Default)]
pub struct EndpointRouter {
    router: Router,
    registered: Vec<Endpoint>,
}

impl EndpointRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, endpoint: Endpoint, handler: MethodRouter) -> Self {
        let handler = match endpoint.access() {
            Access::Public => handler,
            Access::Authenticated => handler.layer(middleware::from_fn(require_identity)),
        };

        tracing::debug!(endpoint = endpoint.name(), path = endpoint.path(), access = ?endpoint.access(), "Registering endpoint");
        self.router = self.router.route(endpoint.path(), handler);
        self.registered.push(endpoint);
        self
    }

    pub fn merge(mut self, other: EndpointRouter) -> Self {
        self.router = self.router.merge(other.router);
        self.registered.extend(other.registered);
        self
    }

    pub fn registered(&self) -> &[Endpoint] {
        &self.registered
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Creates the router for merchant and session endpoints
pub fn auth_router() -> EndpointRouter {
    EndpointRouter::new()
        .register(Endpoint::RegisterMerchant, post(register_merchant))
        .register(Endpoint::LoginMerchant, post(login_merchant))
        .register(Endpoint::LoginUser, post(login_user))
        .register(Endpoint::RefreshToken, post(refresh_token))
        .register(Endpoint::IntrospectToken, post(introspect_token))
        .register(Endpoint::LogoutMerchant, post(logout_merchant))
        .register(Endpoint::LogoutAllDevices, post(logout_all_devices))
        .register(Endpoint::LogoutUserAllDevices, post(logout_user_all_devices))
        .register(Endpoint::GetCurrentMerchant, get(get_current_merchant))
        .register(Endpoint::UpdateMerchantFeatures, patch(update_merchant_features))
}
