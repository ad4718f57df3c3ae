//! User repository
//!
//! Owns the `users` table. Uniqueness of `email` and `keycloak_id` is
//! enforced by database constraints; soft delete rewrites both to their
//! tombstoned form in the same atomic UPDATE so the originals become
//! reusable.

use crate::domain::{CreateUserInput, UpdateUserInput, User};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::MySqlPool;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, input: &CreateUserInput) -> Result<User>;
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;
    async fn find_by_keycloak_id(&self, keycloak_id: &str) -> Result<Option<User>>;
    async fn exists_by_email(&self, email: &str) -> Result<bool>;
    async fn exists_by_keycloak_id(&self, keycloak_id: &str) -> Result<bool>;
    async fn update(&self, id: i64, input: &UpdateUserInput) -> Result<User>;
    async fn set_gov(&self, id: i64, gov_id: i64) -> Result<User>;
    async fn soft_delete(&self, id: i64) -> Result<()>;
}

pub struct UserRepositoryImpl {
    pool: MySqlPool,
}

impl UserRepositoryImpl {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, keycloak_id, email, name, address_id, gov_id, cv_url, photo_url, deleted, created_at, updated_at";

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn insert(&self, input: &CreateUserInput) -> Result<User> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (keycloak_id, email, name, address_id, gov_id, cv_url, photo_url, deleted, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, false, NOW(), NOW())
            "#,
        )
        .bind(&input.keycloak_id)
        .bind(&input.email)
        .bind(&input.name)
        .bind(input.address_id)
        .bind(input.gov_id)
        .bind(&input.cv_url)
        .bind(&input.photo_url)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_id() as i64;
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to create user")))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_by_keycloak_id(&self, keycloak_id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE keycloak_id = ?"
        ))
        .bind(keycloak_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 > 0)
    }

    async fn exists_by_keycloak_id(&self, keycloak_id: &str) -> Result<bool> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE keycloak_id = ?")
            .bind(keycloak_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 > 0)
    }

    async fn update(&self, id: i64, input: &UpdateUserInput) -> Result<User> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        let email = input.email.as_ref().unwrap_or(&existing.email);
        let name = input.name.as_ref().or(existing.name.as_ref());
        let address_id = input.address_id.or(existing.address_id);
        let gov_id = input.gov_id.or(existing.gov_id);
        let cv_url = input.cv_url.as_ref().or(existing.cv_url.as_ref());
        let photo_url = input.photo_url.as_ref().or(existing.photo_url.as_ref());

        sqlx::query(
            r#"
            UPDATE users
            SET email = ?, name = ?, address_id = ?, gov_id = ?, cv_url = ?, photo_url = ?, updated_at = NOW()
            WHERE id = ?
            "#,
        )
        .bind(email)
        .bind(name)
        .bind(address_id)
        .bind(gov_id)
        .bind(cv_url)
        .bind(photo_url)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to update user")))
    }

    async fn set_gov(&self, id: i64, gov_id: i64) -> Result<User> {
        let result = sqlx::query("UPDATE users SET gov_id = ?, updated_at = NOW() WHERE id = ?")
            .bind(gov_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to update user")))
    }

    async fn soft_delete(&self, id: i64) -> Result<()> {
        // One statement so the flag and both tombstones commit together.
        // Deleting a second generation of a reused identifier collides with
        // the first generation's tombstone on the unique constraints and
        // surfaces as a database error.
        let result = sqlx::query(
            r#"
            UPDATE users
            SET deleted = true,
                email = CONCAT('deleted_', email),
                keycloak_id = CONCAT('deleted_', keycloak_id),
                updated_at = NOW()
            WHERE id = ? AND deleted = false
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        Ok(())
    }
}
