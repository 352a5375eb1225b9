//! Module for staff user management API endpoints.
//!
//! Creating and listing the staff of the caller's merchant.

pub mod handlers;
pub mod routes;
