//! Address domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Postal address referenced by user profiles
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Address {
    pub id: i64,
    pub country: String,
    pub city: String,
    pub street: Option<String>,
    pub created_at: DateTime<Utc>,
}
