use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tracing::info;

use crate::config::AppConfig;

/// Connection pool defaults tuned for a small request-driven service.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

pub async fn establish_connection(config: &DbConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    let connection = Database::connect(options).await?;
    info!("database connection established");
    Ok(connection)
}

pub async fn establish_connection_from_app_config(
    config: &AppConfig,
) -> Result<DatabaseConnection, DbErr> {
    establish_connection(&DbConfig {
        url: config.database_url.clone(),
        ..DbConfig::default()
    })
    .await
}
