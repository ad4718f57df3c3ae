//! Configuration management for the Kafu identity bridge

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server host
    pub http_host: String,
    /// HTTP server port
    pub http_port: u16,
    /// Database configuration
    pub database: DatabaseConfig,
    /// JWT verification configuration
    pub jwt: JwtConfig,
    /// Keycloak configuration
    pub keycloak: KeycloakConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Object storage configuration
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Verification parameters for bearer tokens issued by the realm.
///
/// Tokens are verified with the realm's RS256 public key when
/// `public_key_pem` is set; the shared secret is the HS256 fallback used in
/// local development and tests.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: Option<String>,
    pub public_key_pem: Option<String>,
}

#[derive(Debug, Clone)]
pub struct KeycloakConfig {
    /// Base URL for server-to-server communication (e.g., http://keycloak:8080)
    pub url: String,
    /// Realm the bridge operates in
    pub realm: String,
    pub admin_client_id: String,
    pub admin_client_secret: String,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Origins allowed to call the API with credentials
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    /// Lifetime of presigned GET URLs in seconds
    pub presign_ttl_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL is required")?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .unwrap_or(2),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").context("JWT_SECRET is required")?,
                issuer: env::var("JWT_ISSUER").ok(),
                public_key_pem: env::var("JWT_PUBLIC_KEY")
                    .ok()
                    .map(|value| value.replace("\\n", "\n")),
            },
            keycloak: KeycloakConfig {
                url: env::var("KEYCLOAK_URL")
                    .unwrap_or_else(|_| "http://localhost:8081".to_string()),
                realm: env::var("KEYCLOAK_REALM").unwrap_or_else(|_| "kafu".to_string()),
                admin_client_id: env::var("KEYCLOAK_ADMIN_CLIENT_ID")
                    .unwrap_or_else(|_| "admin-cli".to_string()),
                admin_client_secret: env::var("KEYCLOAK_ADMIN_CLIENT_SECRET")
                    .unwrap_or_default(),
            },
            cors: CorsConfig {
                allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:5173".to_string())
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect(),
            },
            storage: StorageConfig {
                bucket: env::var("S3_BUCKET").unwrap_or_else(|_| "kafu-uploads".to_string()),
                presign_ttl_secs: env::var("S3_PRESIGN_TTL_SECS")
                    .unwrap_or_else(|_| "900".to_string())
                    .parse()
                    .unwrap_or(900),
            },
        })
    }

    /// Get the HTTP server address
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_addr() {
        let config = Config {
            http_host: "127.0.0.1".to_string(),
            http_port: 9000,
            database: DatabaseConfig {
                url: "mysql://localhost/kafu".to_string(),
                max_connections: 10,
                min_connections: 2,
            },
            jwt: JwtConfig {
                secret: "secret".to_string(),
                issuer: None,
                public_key_pem: None,
            },
            keycloak: KeycloakConfig {
                url: "http://localhost:8081".to_string(),
                realm: "kafu".to_string(),
                admin_client_id: "admin-cli".to_string(),
                admin_client_secret: String::new(),
            },
            cors: CorsConfig {
                allowed_origins: vec!["http://localhost:5173".to_string()],
            },
            storage: StorageConfig {
                bucket: "kafu-uploads".to_string(),
                presign_ttl_secs: 900,
            },
        };
        assert_eq!(config.http_addr(), "127.0.0.1:9000");
    }
}
