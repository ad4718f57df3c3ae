//! Bearer token verification
//!
//! Tokens are issued by the Keycloak realm; this module only verifies them
//! (signature, issuer, expiry) and exposes the claims the bridge consumes.
//! Role derivation from `resource_access` lives in `security::authority`.

use crate::config::JwtConfig;
use crate::error::Result;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims of a verified access token.
///
/// `resource_access` is kept as loose JSON on purpose: its shape is owned by
/// the realm's client configuration and is inspected with tolerant accessors
/// rather than a rigid schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (Keycloak account id)
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Per-client role assignments as issued by the realm
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_access: Option<serde_json::Value>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Verifies bearer tokens against the realm's signing key
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    issuer: Option<String>,
}

impl TokenVerifier {
    pub fn new(config: &JwtConfig) -> Self {
        let (decoding_key, algorithm) = match config.public_key_pem.as_ref() {
            Some(public_key) => (
                DecodingKey::from_rsa_pem(public_key.as_bytes())
                    .expect("Failed to load JWT public key"),
                Algorithm::RS256,
            ),
            None => (
                DecodingKey::from_secret(config.secret.as_bytes()),
                Algorithm::HS256,
            ),
        };
        Self {
            decoding_key,
            algorithm,
            issuer: config.issuer.clone(),
        }
    }

    /// Create a Validation with a strict leeway (5 seconds) instead of the
    /// default 60 seconds, so tokens expire promptly while still tolerating
    /// minor clock skew.
    fn strict_validation(&self) -> Validation {
        let mut v = Validation::new(self.algorithm);
        v.leeway = 5;
        // Audience varies per realm client; authorization is derived from
        // resource_access, not aud.
        v.validate_aud = false;
        if let Some(ref issuer) = self.issuer {
            v.set_issuer(&[issuer]);
        }
        v
    }

    /// Verify a bearer token and return its claims
    pub fn verify(&self, token: &str) -> Result<AccessClaims> {
        let data = decode::<AccessClaims>(token, &self.decoding_key, &self.strict_validation())?;
        Ok(data.claims)
    }
}
