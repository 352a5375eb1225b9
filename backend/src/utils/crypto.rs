//! One-way hashing of PINs and passwords with bcrypt.
//!
//! ## Usage
//!
//! ```rust
//! let verifier = CredentialVerifier::new(10)?;
//! let digest = verifier.hash_blocking("1234".into()).await?;
//! assert!(verifier.verify_blocking(digest, "1234".into()).await);
//! ```
//!
//! bcrypt is CPU bound, so the async wrappers move the work onto tokio's
//! blocking pool instead of stalling a runtime worker.

use crate::auth::errors::{AuthError, AuthResult};
use crate::config::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};

/// bcrypt only reads the first 72 bytes of its input; longer secrets are
/// rejected instead of silently truncated.
pub const MAX_SECRET_BYTES: usize = 72;

#[derive(Debug, Clone, Copy)]
pub struct CredentialVerifier {
    cost: u32,
}

impl CredentialVerifier {
    pub fn new(cost: u32) -> AuthResult<Self> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
            return Err(AuthError::internal(format!(
                "bcrypt cost {} outside {}..={}",
                cost, MIN_BCRYPT_COST, MAX_BCRYPT_COST
            )));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Produces a salted digest of `secret`.
    pub fn hash(&self, secret: &str) -> AuthResult<String> {
        if secret.len() > MAX_SECRET_BYTES {
            return Err(AuthError::hashing(format!(
                "secret exceeds {} bytes",
                MAX_SECRET_BYTES
            )));
        }
        bcrypt::hash(secret, self.cost).map_err(|e| AuthError::hashing(e.to_string()))
    }

    /// Checks `secret` against a stored digest.
    ///
    /// A malformed digest or an over-long secret never matches.
    pub fn verify(&self, digest: &str, secret: &str) -> bool {
        if secret.len() > MAX_SECRET_BYTES {
            return false;
        }
        bcrypt::verify(secret, digest).unwrap_or(false)
    }

    pub async fn hash_blocking(&self, secret: String) -> AuthResult<String> {
        let verifier = *self;
        tokio::task::spawn_blocking(move || verifier.hash(&secret))
            .await
            .map_err(|e| AuthError::internal(format!("hashing task failed: {}", e)))?
    }

    pub async fn verify_blocking(&self, digest: String, secret: String) -> bool {
        let verifier = *self;
        match tokio::task::spawn_blocking(move || verifier.verify(&digest, &secret)).await {
            Ok(matched) => matched,
            Err(e) => {
                tracing::error!("Credential verification task failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> CredentialVerifier {
        CredentialVerifier::new(MIN_BCRYPT_COST).unwrap()
    }

    #[test]
    fn test_hash_then_verify() {
        let verifier = verifier();
        let digest = verifier.hash("4821").unwrap();

        assert_ne!(digest, "4821");
        assert!(verifier.verify(&digest, "4821"));
        assert!(!verifier.verify(&digest, "4822"));
    }

    #[test]
    fn test_same_secret_hashes_differently() {
        let verifier = verifier();
        let first = verifier.hash("s3cret-pass").unwrap();
        let second = verifier.hash("s3cret-pass").unwrap();

        assert_ne!(first, second);
        assert!(verifier.verify(&first, "s3cret-pass"));
        assert!(verifier.verify(&second, "s3cret-pass"));
    }

    #[test]
    fn test_empty_secret_is_hashable() {
        let verifier = verifier();
        let digest = verifier.hash("").unwrap();
        assert!(verifier.verify(&digest, ""));
        assert!(!verifier.verify(&digest, "x"));
    }

    #[test]
    fn test_secret_over_limit_is_rejected() {
        let verifier = verifier();
        let long = "a".repeat(MAX_SECRET_BYTES + 1);

        assert!(matches!(verifier.hash(&long), Err(AuthError::Hashing { .. })));

        let at_limit = "a".repeat(MAX_SECRET_BYTES);
        let digest = verifier.hash(&at_limit).unwrap();
        assert!(verifier.verify(&digest, &at_limit));
        assert!(!verifier.verify(&digest, &long));
    }

    #[test]
    fn test_malformed_digest_never_matches() {
        assert!(!verifier().verify("not-a-bcrypt-digest", "1234"));
        assert!(!verifier().verify("", ""));
    }

    #[test]
    fn test_cost_bounds() {
        assert!(CredentialVerifier::new(MIN_BCRYPT_COST - 1).is_err());
        assert!(CredentialVerifier::new(MAX_BCRYPT_COST + 1).is_err());
        assert_eq!(CredentialVerifier::new(12).unwrap().cost(), 12);
    }

    #[tokio::test]
    async fn test_blocking_wrappers() {
        let verifier = verifier();
        let digest = verifier.hash_blocking("9999".into()).await.unwrap();

        assert!(verifier.verify_blocking(digest.clone(), "9999".into()).await);
        assert!(!verifier.verify_blocking(digest, "0000".into()).await);
    }
}
