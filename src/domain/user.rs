//! User domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Local identity record, keyed by the Keycloak account that owns it.
///
/// `keycloak_id` is immutable after creation. Soft delete tombstones both
/// `email` and `keycloak_id` (prefix `deleted_`) so the originals become
/// reusable by new registrations while the row survives for references.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub keycloak_id: String,
    pub email: String,
    pub name: Option<String>,
    pub address_id: Option<i64>,
    pub gov_id: Option<i64>,
    pub cv_url: Option<String>,
    pub photo_url: Option<String>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserInput {
    /// Must be absent; local ids are assigned by the store
    pub id: Option<i64>,
    pub keycloak_id: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 255))]
    pub name: Option<String>,
    pub address_id: Option<i64>,
    pub gov_id: Option<i64>,
    pub cv_url: Option<String>,
    pub photo_url: Option<String>,
}

/// Input for updating a user. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUserInput {
    #[validate(email)]
    pub email: Option<String>,
    /// Accepted only when it matches the stored value; the binding to the
    /// external account never changes
    pub keycloak_id: Option<String>,
    #[validate(length(max = 255))]
    pub name: Option<String>,
    pub address_id: Option<i64>,
    pub gov_id: Option<i64>,
    pub cv_url: Option<String>,
    pub photo_url: Option<String>,
}
