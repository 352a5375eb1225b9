//! Central module for application-wide configuration settings.
//!
//! Everything here is read once at startup and handed to constructors
//! (token issuer, credential verifier, database pool). Nothing in the request
//! path reads the environment.

use anyhow::{Context, Result, bail};
use std::env;

/// Lowest and highest bcrypt cost factors accepted by the hashing primitive.
pub const MIN_BCRYPT_COST: u32 = 4;
pub const MAX_BCRYPT_COST: u32 = 31;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub jwt_secret: String,
    pub access_token_expires_in_seconds: u64,
    pub refresh_token_expires_in_seconds: u64,
    pub bcrypt_cost: u32,
    pub token_purge_interval_seconds: u64,
    pub request_timeout_seconds: u64,
    pub server_port: u16,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL not set")?;

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("DB_MAX_CONNECTIONS must be a valid number")?;

        let acquire_timeout_seconds = env::var("DB_ACQUIRE_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u64>()
            .context("DB_ACQUIRE_TIMEOUT_SECONDS must be a valid number")?;

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET not set")?;

        let access_token_expires_in_seconds = env::var("JWT_ACCESS_TOKEN_EXPIRES_IN_SECONDS")
            .unwrap_or_else(|_| "900".to_string())
            .parse::<u64>()
            .context("JWT_ACCESS_TOKEN_EXPIRES_IN_SECONDS must be a valid number")?;

        let refresh_token_expires_in_seconds = env::var("JWT_REFRESH_TOKEN_EXPIRES_IN_SECONDS")
            .unwrap_or_else(|_| "604800".to_string())
            .parse::<u64>()
            .context("JWT_REFRESH_TOKEN_EXPIRES_IN_SECONDS must be a valid number")?;

        let bcrypt_cost = env::var("BCRYPT_COST")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()
            .context("BCRYPT_COST must be a valid number")?;

        let token_purge_interval_seconds = env::var("TOKEN_PURGE_INTERVAL_SECONDS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse::<u64>()
            .context("TOKEN_PURGE_INTERVAL_SECONDS must be a valid number")?;

        let request_timeout_seconds = env::var("REQUEST_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .context("REQUEST_TIMEOUT_SECONDS must be a valid number")?;

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("SERVER_PORT must be a valid number")?;

        let config = Config {
            database_url,
            max_connections,
            acquire_timeout_seconds,
            jwt_secret,
            access_token_expires_in_seconds,
            refresh_token_expires_in_seconds,
            bcrypt_cost,
            token_purge_interval_seconds,
            request_timeout_seconds,
            server_port,
        };
        config.validate()?;

        Ok(config)
    }

    /// Rejects values that would make the service insecure or unusable.
    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }
        if self.access_token_expires_in_seconds == 0 {
            bail!("JWT_ACCESS_TOKEN_EXPIRES_IN_SECONDS must be greater than zero");
        }
        if self.refresh_token_expires_in_seconds <= self.access_token_expires_in_seconds {
            bail!("refresh tokens must outlive access tokens");
        }
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&self.bcrypt_cost) {
            bail!(
                "BCRYPT_COST must be between {} and {}",
                MIN_BCRYPT_COST,
                MAX_BCRYPT_COST
            );
        }
        if self.token_purge_interval_seconds == 0 || self.request_timeout_seconds == 0 {
            bail!("intervals and timeouts must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
impl Config {
    /// Configuration used by unit tests: in-memory database, cheapest hash cost.
    pub fn for_tests() -> Self {
        Config {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout_seconds: 3,
            jwt_secret: "test-signing-secret".to_string(),
            access_token_expires_in_seconds: 900,
            refresh_token_expires_in_seconds: 604_800,
            bcrypt_cost: MIN_BCRYPT_COST,
            token_purge_interval_seconds: 3600,
            request_timeout_seconds: 30,
            server_port: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_test_config_is_valid() {
        assert!(Config::for_tests().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_secret() {
        let config = Config {
            jwt_secret: "  ".to_string(),
            ..Config::for_tests()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_cost() {
        let config = Config {
            bcrypt_cost: 3,
            ..Config::for_tests()
        };
        assert!(config.validate().is_err());

        let config = Config {
            bcrypt_cost: 32,
            ..Config::for_tests()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_refresh_ttl_shorter_than_access_ttl() {
        let config = Config {
            access_token_expires_in_seconds: 600,
            refresh_token_expires_in_seconds: 600,
            ..Config::for_tests()
        };
        assert!(config.validate().is_err());
    }
}
