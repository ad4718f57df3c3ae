//! The authenticated request principal
//!
//! A `Principal` lives exactly as long as its request: the access policy
//! filter builds it from the verified token and stores it in the request's
//! extensions, and handlers receive it as an explicit extractor argument.
//! Nothing is kept across requests and no session is consulted.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use std::collections::BTreeSet;

/// Verified caller identity attached to a single request
#[derive(Debug, Clone)]
pub struct Principal {
    /// The token's `sub` claim: the caller's Keycloak account id
    pub subject: String,
    /// Normalized authorities derived from the token's role assignments
    pub authorities: BTreeSet<String>,
}

impl Principal {
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }
}

/// Authentication errors surfaced by the access policy filter
#[derive(Debug, Clone)]
pub enum AuthError {
    /// No Authorization header present
    MissingToken,
    /// Invalid Authorization header format
    InvalidHeader,
    /// Token verification failed
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingToken => "Missing authorization token",
            AuthError::InvalidHeader => "Authorization header must use Bearer scheme",
            AuthError::InvalidToken => "Invalid or expired token",
        };

        // Same body shape as AppError responses
        let body = serde_json::json!({
            "error": "unauthorized",
            "message": message,
        });

        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

/// Optional principal extractor
///
/// Returns `Some(Principal)` when the filter authenticated the request,
/// `None` on public allow-list routes. Never rejects.
#[derive(Debug, Clone)]
pub struct OptionalPrincipal(pub Option<Principal>);

impl<S> FromRequestParts<S> for OptionalPrincipal
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalPrincipal(parts.extensions.get::<Principal>().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(authorities: &[&str]) -> Principal {
        Principal {
            subject: "kc-sub-1".to_string(),
            authorities: authorities.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn test_has_authority() {
        let p = principal(&["ROLE_gov", "ROLE_admin"]);
        assert!(p.has_authority("ROLE_gov"));
        assert!(!p.has_authority("ROLE_superadmin"));
    }

    #[test]
    fn test_auth_error_into_response() {
        for error in [
            AuthError::MissingToken,
            AuthError::InvalidHeader,
            AuthError::InvalidToken,
        ] {
            let response = error.into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn test_auth_error_body_matches_app_error_shape() {
        let response = AuthError::InvalidToken.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(body["error"], "unauthorized");
        assert_eq!(body["message"], "Invalid or expired token");
    }
}
