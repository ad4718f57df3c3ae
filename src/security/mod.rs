//! Request-time security: authority extraction, the request principal, and
//! the access policy filter.

pub mod authority;
pub mod policy;
pub mod principal;

pub use authority::{extract_authorities, ADMIN_AUTHORITY, RECOGNIZED_CLIENTS, ROLE_PREFIX};
pub use policy::{access_policy, cors_layer, is_public_path, PolicyState};
pub use principal::{AuthError, OptionalPrincipal, Principal};
