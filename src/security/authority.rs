//! Authority derivation from verified token claims
//!
//! Keycloak issues per-client role assignments under the `resource_access`
//! claim. Only the realm's two application clients are consulted; roles from
//! any other client are ignored. Absence or a wrong shape anywhere in the
//! claim contributes zero roles rather than an error, so a token without
//! assignments is authenticated but holds no authorities.

use serde_json::Value;
use std::collections::BTreeSet;

/// Canonical prefix carried by every normalized authority
pub const ROLE_PREFIX: &str = "ROLE_";

/// The realm clients whose role assignments are honored
pub const RECOGNIZED_CLIENTS: [&str; 2] = ["kafu-api", "kafu-web"];

/// Authority required for the privileged grant and association paths
pub const ADMIN_AUTHORITY: &str = "ROLE_admin";

/// Derive the deduplicated authority set from a token's `resource_access`
/// claim. Pure and deterministic; never fails.
pub fn extract_authorities(resource_access: Option<&Value>) -> BTreeSet<String> {
    let mut authorities = BTreeSet::new();
    let Some(by_client) = resource_access.and_then(Value::as_object) else {
        return authorities;
    };
    for client in RECOGNIZED_CLIENTS {
        for role in client_roles(by_client.get(client)) {
            authorities.insert(normalize_role(role));
        }
    }
    authorities
}

/// Roles listed under one client entry; tolerates a missing entry, a
/// non-object entry, a missing or non-array `roles`, and non-string items.
fn client_roles(entry: Option<&Value>) -> impl Iterator<Item = &str> {
    entry
        .and_then(Value::as_object)
        .and_then(|client| client.get("roles"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

/// Prefix a raw role name unless it already carries the canonical prefix
fn normalize_role(raw: &str) -> String {
    if raw.starts_with(ROLE_PREFIX) {
        raw.to_string()
    } else {
        format!("{ROLE_PREFIX}{raw}")
    }
}
