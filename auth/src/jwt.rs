//! HS256 JSON Web Token verification.
//!
//! Subscribers present a token minted by the sign-in flow. The token carries
//! the user id in `sub` and an `exp` expiry; an `iss` claim is checked only
//! when an issuer is configured.

use crate::error::{Error, ErrorKind};
use crate::{Identity, TokenVerifier};
use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Claims carried by a subscriber token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriberClaims {
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

pub struct JwtVerifier {
    secret: SecretString,
    issuer: Option<String>,
}

impl JwtVerifier {
    pub fn new(secret: SecretString, issuer: Option<String>) -> Self {
        Self { secret, issuer }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, Error> {
        if token.trim().is_empty() {
            return Err(Error::new(ErrorKind::Missing, "empty token"));
        }

        let key = DecodingKey::from_secret(self.secret.expose_secret().as_bytes());
        let token_data = decode::<SubscriberClaims>(token, &key, &self.validation())
            .map_err(|e| {
                debug!("Rejected subscriber token: {e}");
                Error::from(e)
            })?;

        if token_data.claims.sub.is_empty() {
            return Err(Error::new(ErrorKind::Invalid, "token has an empty subject"));
        }

        trace!("Verified subscriber token for {}", token_data.claims.sub);
        Ok(Identity::new(token_data.claims.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    const SECRET: &str = "test-signing-secret";

    fn now() -> usize {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as usize
    }

    fn mint(claims: &SubscriberClaims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn verifier(issuer: Option<&str>) -> JwtVerifier {
        JwtVerifier::new(
            SecretString::new(SECRET.to_string()),
            issuer.map(str::to_string),
        )
    }

    #[tokio::test]
    async fn test_verify_valid_token_returns_subject() {
        let token = mint(
            &SubscriberClaims {
                sub: "user-7".to_string(),
                exp: now() + 3600,
                iss: None,
            },
            SECRET,
        );

        let identity = verifier(None).verify(&token).await.unwrap();
        assert_eq!(identity, Identity::new("user-7"));
    }

    #[tokio::test]
    async fn test_verify_empty_token_is_missing() {
        let err = verifier(None).verify("  ").await.unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::Missing);
    }

    #[tokio::test]
    async fn test_verify_garbage_token_is_malformed() {
        let err = verifier(None).verify("not-a-jwt").await.unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::Malformed);
    }

    #[tokio::test]
    async fn test_verify_expired_token_is_expired() {
        let token = mint(
            &SubscriberClaims {
                sub: "user-7".to_string(),
                exp: now() - 3600,
                iss: None,
            },
            SECRET,
        );

        let err = verifier(None).verify(&token).await.unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::Expired);
    }

    #[tokio::test]
    async fn test_verify_wrong_secret_is_invalid() {
        let token = mint(
            &SubscriberClaims {
                sub: "user-7".to_string(),
                exp: now() + 3600,
                iss: None,
            },
            "some-other-secret",
        );

        let err = verifier(None).verify(&token).await.unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::Invalid);
    }

    #[tokio::test]
    async fn test_verify_checks_issuer_when_configured() {
        let token = mint(
            &SubscriberClaims {
                sub: "user-7".to_string(),
                exp: now() + 3600,
                iss: Some("someone-else".to_string()),
            },
            SECRET,
        );

        let err = verifier(Some("chat")).verify(&token).await.unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::Invalid);

        let token = mint(
            &SubscriberClaims {
                sub: "user-7".to_string(),
                exp: now() + 3600,
                iss: Some("chat".to_string()),
            },
            SECRET,
        );
        assert!(verifier(Some("chat")).verify(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_empty_subject_is_invalid() {
        let token = mint(
            &SubscriberClaims {
                sub: String::new(),
                exp: now() + 3600,
                iss: None,
            },
            SECRET,
        );

        let err = verifier(None).verify(&token).await.unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::Invalid);
    }
}
