//! Government entity lookup, consumed at the collaborator boundary only

use crate::domain::Gov;
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GovRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Gov>>;
}

pub struct GovRepositoryImpl {
    pool: MySqlPool,
}

impl GovRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GovRepository for GovRepositoryImpl {
    async fn find_by_id(&self, id: i64) -> Result<Option<Gov>> {
        let gov = sqlx::query_as::<_, Gov>(
            "SELECT id, name, email, created_at FROM govs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(gov)
    }
}
