//! Data access layer.
//!
//! Each repository owns the SQL for one table group. Queries are bound at
//! runtime against the shared SQLite pool.

pub mod merchant_repository;
pub mod refresh_token_repository;
pub mod role_repository;
pub mod user_repository;
