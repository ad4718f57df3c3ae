//! Common test utilities

use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;

/// Connect to the database named by TEST_DATABASE_URL. Tests that need a
/// real database skip themselves when this fails.
pub async fn get_test_pool() -> Result<MySqlPool, String> {
    let _ = dotenvy::dotenv();
    let url = std::env::var("TEST_DATABASE_URL")
        .map_err(|_| "TEST_DATABASE_URL not set".to_string())?;
    MySqlPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .map_err(|e| e.to_string())
}

/// Apply the embedded migrations
pub async fn setup_database(pool: &MySqlPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Remove all rows between tests
pub async fn cleanup_database(pool: &MySqlPool) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM users").execute(pool).await?;
    sqlx::query("DELETE FROM addresses").execute(pool).await?;
    sqlx::query("DELETE FROM govs").execute(pool).await?;
    Ok(())
}
