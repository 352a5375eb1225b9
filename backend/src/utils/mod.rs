//! Collection of general utility functions and common traits.
//!
//! Token signing and credential hashing live here so the session engine and
//! the data services can share one implementation of each.

pub mod crypto;
pub mod jwt;
