//! Kafu Identity Bridge
//!
//! This crate keeps the Kafu platform's local user store consistent with its
//! external Keycloak realm and derives per-request authorization from verified
//! bearer tokens.

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod jwt;
pub mod keycloak;
pub mod migration;
pub mod repository;
pub mod security;
pub mod server;
pub mod service;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
