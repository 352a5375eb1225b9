//! Authentication module for merchant and staff sessions.
//!
//! This module provides the session lifecycle engine (login, rotation,
//! revocation), the request identity gate and the permission checks that
//! downstream handlers rely on.

pub mod authorization;
pub mod context;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod service;
