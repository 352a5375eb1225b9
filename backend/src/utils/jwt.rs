//! JWT token utilities for session issuance and validation.
//!
//! Tokens are HS256-signed with a key injected at construction. Validation
//! pins the algorithm, so `none` or any other algorithm in the header is
//! rejected before the claims are looked at.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::errors::{AuthError, AuthResult};
use crate::auth::models::{PrincipalKind, SessionPrincipal};
use crate::config::Config;

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject: merchant ID or staff user ID
    pub sub: String,
    /// Merchant the subject belongs to
    pub mid: String,
    pub kind: PrincipalKind,
    pub typ: TokenType,
    /// Unique token ID
    pub jti: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl Claims {
    pub fn principal(&self) -> SessionPrincipal {
        SessionPrincipal {
            id: self.sub.clone(),
            kind: self.kind,
            merchant_id: self.mid.clone(),
        }
    }
}

/// A signed token together with the instants baked into it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Creates and validates signed session tokens.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> AuthResult<Self> {
        if secret.is_empty() {
            return Err(AuthError::internal("signing secret must not be empty"));
        }
        if access_ttl <= Duration::zero() || refresh_ttl <= Duration::zero() {
            return Err(AuthError::internal("token lifetimes must be positive"));
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf", "sub"]);

        Ok(TokenIssuer {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        })
    }

    pub fn from_config(config: &Config) -> AuthResult<Self> {
        Self::new(
            &config.jwt_secret,
            Duration::seconds(config.access_token_expires_in_seconds as i64),
            Duration::seconds(config.refresh_token_expires_in_seconds as i64),
        )
    }

    /// Access token lifetime in seconds.
    pub fn access_ttl_seconds(&self) -> u64 {
        self.access_ttl.num_seconds() as u64
    }

    pub fn issue_access(&self, subject: &SessionPrincipal) -> AuthResult<IssuedToken> {
        self.issue_at(subject, TokenType::Access, Utc::now())
    }

    pub fn issue_refresh(&self, subject: &SessionPrincipal) -> AuthResult<IssuedToken> {
        self.issue_at(subject, TokenType::Refresh, Utc::now())
    }

    pub(crate) fn issue_at(
        &self,
        subject: &SessionPrincipal,
        typ: TokenType,
        now: DateTime<Utc>,
    ) -> AuthResult<IssuedToken> {
        let ttl = match typ {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let expires_at = now + ttl;

        let claims = Claims {
            sub: subject.id.clone(),
            mid: subject.merchant_id.clone(),
            kind: subject.kind,
            typ,
            jti: Uuid::now_v7().to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AuthError::internal(format!("token signing failed: {}", e)))?;

        Ok(IssuedToken {
            token,
            issued_at: now,
            expires_at,
        })
    }

    /// Verifies signature, algorithm and time window, returning the claims.
    pub fn validate(&self, token: &str) -> AuthResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|token_data| token_data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            })
    }

    /// Like `validate`, but refresh tokens are not accepted.
    pub fn validate_access(&self, token: &str) -> AuthResult<Claims> {
        let claims = self.validate(token)?;
        if claims.typ != TokenType::Access {
            return Err(AuthError::InvalidToken);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("unit-test-secret", Duration::minutes(15), Duration::days(7)).unwrap()
    }

    #[test]
    fn test_access_token_round_trip() {
        let issuer = issuer();
        let principal = SessionPrincipal::merchant("merchant-42");

        let issued = issuer.issue_access(&principal).unwrap();
        let claims = issuer.validate(&issued.token).unwrap();

        assert_eq!(claims.sub, "merchant-42");
        assert_eq!(claims.typ, TokenType::Access);
        assert_eq!(claims.nbf, claims.iat);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
        assert_eq!(claims.principal(), principal);
    }

    #[test]
    fn test_refresh_token_uses_refresh_ttl() {
        let issuer = issuer();
        let issued = issuer
            .issue_refresh(&SessionPrincipal::user("user-1", "merchant-1"))
            .unwrap();
        let claims = issuer.validate(&issued.token).unwrap();

        assert_eq!(claims.typ, TokenType::Refresh);
        assert_eq!(claims.kind, PrincipalKind::User);
        assert_eq!(claims.mid, "merchant-1");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
        assert_eq!(issued.expires_at - issued.issued_at, Duration::days(7));
    }

    #[test]
    fn test_tokens_issued_in_the_same_second_differ() {
        let issuer = issuer();
        let principal = SessionPrincipal::merchant("m");
        let now = Utc::now();

        let first = issuer.issue_at(&principal, TokenType::Refresh, now).unwrap();
        let second = issuer.issue_at(&principal, TokenType::Refresh, now).unwrap();

        assert_ne!(first.token, second.token);
    }

    #[test]
    fn test_expired_token_reports_expired_not_invalid() {
        let issuer = issuer();
        let issued = issuer
            .issue_at(
                &SessionPrincipal::merchant("m"),
                TokenType::Access,
                Utc::now() - Duration::hours(1),
            )
            .unwrap();

        assert!(matches!(
            issuer.validate(&issued.token),
            Err(AuthError::ExpiredToken)
        ));
    }

    #[test]
    fn test_token_not_yet_valid_is_rejected() {
        let issuer = issuer();
        let issued = issuer
            .issue_at(
                &SessionPrincipal::merchant("m"),
                TokenType::Access,
                Utc::now() + Duration::minutes(5),
            )
            .unwrap();

        assert!(matches!(
            issuer.validate(&issued.token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let other = TokenIssuer::new("another-secret", Duration::minutes(15), Duration::days(7))
            .unwrap();
        let issued = other.issue_access(&SessionPrincipal::merchant("m")).unwrap();

        assert!(matches!(
            issuer().validate(&issued.token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_tampered_payload_is_invalid() {
        let issuer = issuer();
        let issued = issuer.issue_access(&SessionPrincipal::merchant("m")).unwrap();
        let mut parts: Vec<String> = issued.token.split('.').map(str::to_string).collect();

        let forged = serde_json::json!({
            "sub": "someone-else", "mid": "someone-else", "kind": "merchant", "typ": "access",
            "jti": "x", "iat": 0, "nbf": 0, "exp": 4_000_000_000i64
        });
        parts[1] = URL_SAFE_NO_PAD.encode(forged.to_string());

        assert!(matches!(
            issuer.validate(&parts.join(".")),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_none_algorithm_is_rejected() {
        let now = Utc::now().timestamp();
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::json!({
                "sub": "m", "mid": "m", "kind": "merchant", "typ": "access",
                "jti": "x", "iat": now, "nbf": now, "exp": now + 600
            })
            .to_string(),
        );

        let unsigned = format!("{}.{}.", header, payload);
        assert!(matches!(
            issuer().validate(&unsigned),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_mismatched_hmac_algorithm_is_rejected() {
        let now = Utc::now();
        let claims = Claims {
            sub: "m".into(),
            mid: "m".into(),
            kind: PrincipalKind::Merchant,
            typ: TokenType::Access,
            jti: "x".into(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + Duration::minutes(5)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(b"unit-test-secret"),
        )
        .unwrap();

        assert!(matches!(
            issuer().validate(&token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_validate_access_rejects_refresh_tokens() {
        let issuer = issuer();
        let issued = issuer.issue_refresh(&SessionPrincipal::merchant("m")).unwrap();

        assert!(issuer.validate(&issued.token).is_ok());
        assert!(matches!(
            issuer.validate_access(&issued.token),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_garbage_is_invalid() {
        assert!(matches!(
            issuer().validate("not-a-token"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_rejects_empty_secret() {
        assert!(TokenIssuer::new("", Duration::minutes(1), Duration::days(1)).is_err());
    }
}
