//! Server initialization and routing

use crate::api;
use crate::config::Config;
use crate::jwt::TokenVerifier;
use crate::keycloak::KeycloakClient;
use crate::repository::{AddressRepositoryImpl, GovRepositoryImpl, UserRepositoryImpl};
use crate::security::{access_policy, cors_layer, PolicyState};
use crate::service::UserService;
use crate::storage::S3ObjectStore;
use anyhow::Result;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: MySqlPool,
    pub user_service:
        Arc<UserService<UserRepositoryImpl, AddressRepositoryImpl, GovRepositoryImpl>>,
    pub keycloak_client: KeycloakClient,
}

/// Build the HTTP router.
///
/// Every route except the health probes sits behind the access policy
/// filter; the public allow-list inside the filter handles unauthenticated
/// paths, so the probes are the only routes mounted outside it.
pub fn build_router(state: AppState, verifier: TokenVerifier) -> Router {
    let cors = cors_layer(&state.config.cors);
    let policy = PolicyState::new(verifier);

    let protected = Router::new()
        .route("/api/v1/users", post(api::user::create))
        .route("/api/v1/users/me", get(api::user::me))
        .route(
            "/api/v1/users/{id}",
            get(api::user::get)
                .put(api::user::update)
                .delete(api::user::delete),
        )
        .route("/api/v1/users/{id}/roles", post(api::user::grant_role))
        .route(
            "/api/v1/govs/{gov_id}/users/{user_id}",
            post(api::user::associate_gov),
        )
        .layer(middleware::from_fn_with_state(policy, access_policy));

    Router::new()
        .merge(protected)
        .route("/health", get(api::health::health))
        .route("/ready", get(api::health::ready))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors)
}

/// Run the server
pub async fn run(config: Config) -> Result<()> {
    // Create database connection pool
    let db_pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    info!("Connected to database");

    // Create repositories
    let user_repo = Arc::new(UserRepositoryImpl::new(db_pool.clone()));
    let address_repo = Arc::new(AddressRepositoryImpl::new(db_pool.clone()));
    let gov_repo = Arc::new(GovRepositoryImpl::new(db_pool.clone()));

    // Create token verifier and Keycloak client
    let verifier = TokenVerifier::new(&config.jwt);
    let keycloak_client = KeycloakClient::new(config.keycloak.clone());

    // Create object store for presigned profile URLs
    let object_store = Arc::new(S3ObjectStore::from_env(&config.storage).await);

    let user_service = Arc::new(UserService::new(
        user_repo,
        address_repo,
        gov_repo,
        Arc::new(keycloak_client.clone()),
        object_store,
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        db_pool,
        user_service,
        keycloak_client,
    };

    let app = build_router(state, verifier);

    let http_addr = config.http_addr();
    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server started on {}", http_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
