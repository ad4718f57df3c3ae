//! Government entity domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Government entity a user can be associated with
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Gov {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}
