//! Keycloak Admin API integration

mod client;
mod types;

pub use client::KeycloakClient;
pub use types::{KeycloakRole, KeycloakUser};
