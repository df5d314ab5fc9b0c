use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::{config::AppConfig, migrator::Migrator};

pub type DbPool = DatabaseConnection;

/// Establishes a database connection pool.
pub async fn establish_connection(database_url: &str) -> anyhow::Result<DbPool> {
    let mut opt = ConnectOptions::new(database_url.to_string());
    opt.max_connections(20)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(false);

    let pool = Database::connect(opt).await?;
    info!("database connection established");
    Ok(pool)
}

pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> anyhow::Result<DbPool> {
    establish_connection(&cfg.database_url).await
}

/// Applies all pending migrations.
pub async fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    Migrator::up(pool, None).await?;
    info!("database migrations applied");
    Ok(())
}
