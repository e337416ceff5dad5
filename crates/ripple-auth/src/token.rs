use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;
use uuid::Uuid;

use ripple_types::api::Claims;

#[derive(Debug, Error)]
pub enum TokenError {
    /// Signature mismatch, malformed token, or undecodable claims.
    #[error("invalid token")]
    Invalid,
    /// Well-formed and correctly signed, but past its expiry.
    #[error("token expired")]
    Expired,
    #[error("token signing failed")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Clock abstraction so token expiry is deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Issues and validates HS256 bearer tokens.
///
/// The signing secret is passed in at construction and never read from
/// ambient state. Tokens are stateless: there is no revocation, and
/// issuing a new token does not invalidate outstanding ones.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(secret: &str, lifetime: Duration) -> Self {
        Self::with_clock(secret, lifetime, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: &str, lifetime: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
            clock,
        }
    }

    /// Issue a signed token for the given identity, valid for the
    /// configured lifetime from now.
    pub fn issue(&self, user_id: Uuid, email: &str) -> Result<String, TokenError> {
        let now = self.clock.now();
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + self.lifetime).timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(TokenError::Signing)
    }

    /// Verify the signature, then the expiry, and return the claims.
    ///
    /// Expiry is checked against the injected clock rather than
    /// jsonwebtoken's wall clock. Never consults any store: a token
    /// stays valid until it expires regardless of identity state.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        let data =
            decode::<Claims>(token, &self.decoding, &validation).map_err(|_| TokenError::Invalid)?;

        if (data.claims.exp as i64) <= self.clock.now().timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn service(secret: &str) -> TokenService {
        TokenService::new(secret, Duration::hours(24))
    }

    #[test]
    fn issue_then_validate_roundtrip() {
        let svc = service("test-secret-key");
        let user_id = Uuid::new_v4();

        let token = svc.issue(user_id, "test@example.com").unwrap();
        assert_eq!(token.matches('.').count(), 2, "JWT has three segments");

        let claims = svc.validate(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "test@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let svc = service("secret-a");
        let other = service("secret-b");

        let token = svc.issue(Uuid::new_v4(), "a@x.com").unwrap();
        assert!(matches!(other.validate(&token), Err(TokenError::Invalid)));
    }

    #[test]
    fn garbage_tokens_are_rejected() {
        let svc = service("test-secret-key");
        for junk in ["", "randomstring", "not.a.valid.token", "a.b.c"] {
            assert!(matches!(svc.validate(junk), Err(TokenError::Invalid)));
        }
    }

    #[test]
    fn expired_token_is_rejected_with_correct_secret() {
        let issued_at = Utc::now();
        let issuer = TokenService::with_clock(
            "test-secret-key",
            Duration::hours(24),
            Arc::new(FixedClock(issued_at)),
        );
        let token = issuer.issue(Uuid::new_v4(), "a@x.com").unwrap();

        // Same secret, clock advanced past expiry.
        let later = TokenService::with_clock(
            "test-secret-key",
            Duration::hours(24),
            Arc::new(FixedClock(issued_at + Duration::hours(25))),
        );
        assert!(matches!(later.validate(&token), Err(TokenError::Expired)));

        // Just before expiry it still validates.
        let earlier = TokenService::with_clock(
            "test-secret-key",
            Duration::hours(24),
            Arc::new(FixedClock(issued_at + Duration::hours(23))),
        );
        assert!(earlier.validate(&token).is_ok());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let svc = service("test-secret-key");
        let token = svc.issue(Uuid::new_v4(), "a@x.com").unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let swapped = svc.issue(Uuid::new_v4(), "b@x.com").unwrap();
        let other_parts: Vec<&str> = swapped.split('.').collect();
        parts[1] = other_parts[1];
        let forged = parts.join(".");

        assert!(matches!(svc.validate(&forged), Err(TokenError::Invalid)));
    }
}
