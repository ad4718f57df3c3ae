//! Address lookup, consumed at the collaborator boundary only

use crate::domain::Address;
use crate::error::Result;
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AddressRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Address>>;
}

pub struct AddressRepositoryImpl {
    pool: MySqlPool,
}

impl AddressRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AddressRepository for AddressRepositoryImpl {
    async fn find_by_id(&self, id: i64) -> Result<Option<Address>> {
        let address = sqlx::query_as::<_, Address>(
            "SELECT id, country, city, street, created_at FROM addresses WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(address)
    }
}
