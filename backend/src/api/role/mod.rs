//! Module for role and permission catalog API endpoints.

pub mod handlers;
pub mod routes;
