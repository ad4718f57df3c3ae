//! Access policy filter
//!
//! Every inbound request passes through [`access_policy`] before any handler
//! runs. A fixed allow-list of public paths bypasses authentication entirely;
//! everything else needs a verifiable bearer token, whose claims become the
//! request's [`Principal`]. The policy is strictly stateless: each request
//! re-derives authorization from its own token.

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderMap, HeaderName, HeaderValue, Method, Request,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::CorsConfig;
use crate::jwt::TokenVerifier;
use crate::security::authority::extract_authorities;
use crate::security::principal::{AuthError, Principal};

/// Paths reachable without a token. Entries match exactly or as a path
/// prefix (`/webhook` also covers `/webhook/stripe`).
pub const PUBLIC_PATHS: [&str; 7] = [
    "/auth/login",
    "/swagger-ui",
    "/v3/api-docs",
    "/swagger-resources",
    "/webjars",
    "/webhook",
    "/api-docs",
];

pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS
        .iter()
        .any(|public| path == *public || path.starts_with(&format!("{public}/")))
}

/// Shared state for the access policy middleware
#[derive(Clone)]
pub struct PolicyState {
    verifier: TokenVerifier,
}

impl PolicyState {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }
}

/// Extract the Bearer token from the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidHeader)?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidHeader)
}

/// Per-request gate: public allow-list pass-through, bearer verification for
/// everything else, principal publication into request extensions.
pub async fn access_policy(
    State(policy): State<PolicyState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if is_public_path(request.uri().path()) {
        return next.run(request).await;
    }

    let token = match extract_bearer_token(request.headers()) {
        Ok(token) => token.to_owned(),
        Err(e) => return e.into_response(),
    };

    let claims = match policy.verifier.verify(&token) {
        Ok(claims) => claims,
        Err(_) => return AuthError::InvalidToken.into_response(),
    };

    let authorities = extract_authorities(claims.resource_access.as_ref());
    request.extensions_mut().insert(Principal {
        subject: claims.sub,
        authorities,
    });

    next.run(request).await
}

/// Cross-origin policy: a fixed origin allow-list with credentials permitted.
/// Origins that fail to parse are skipped with a warning rather than taking
/// the server down.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring unparsable CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-user-id"),
        ])
        .allow_credentials(true)
}
