//! Module for core business logic services.
//!
//! Services orchestrate repositories and the session engine. Most are built
//! per request around a borrowed pool; the audit sink and the purge task
//! live for the whole process.

pub mod audit;
pub mod merchant_service;
pub mod role_service;
pub mod token_sweeper;
pub mod user_service;
