pub mod memory;
pub mod migrations;
pub mod postgres;
pub mod repositories;
pub mod store;

pub use memory::InMemoryStore;
pub use postgres::{create_postgres_pool, health_check as postgres_health_check, PostgresPool};
pub use repositories::*;
pub use store::{AlertStore, AlertVersion, CreateOutcome, DocumentStore, ProductStore};

use anyhow::Result;
use prodtrack_utils::DatabaseConfig;
use std::time::Duration;

/// Connects to Postgres and brings the schema up to date.
pub async fn initialize_database(config: &DatabaseConfig) -> Result<PostgresPool> {
    let pool = create_postgres_pool(
        &config.postgres_url,
        config.max_connections,
        Duration::from_secs(config.connection_timeout_seconds),
    )
    .await?;

    migrations::run_postgres_migrations(&pool).await?;
    postgres_health_check(&pool).await?;

    Ok(pool)
}
