use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Database as DatabaseConfig;
use crate::migration::{Migrator, MigratorTrait};

#[derive(Clone)]
pub struct DatabaseService {
    pub connection: DatabaseConnection,
}

impl DatabaseService {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let mut max_connections = config.max_connections;
        // every pooled connection would open its own empty in-memory database
        if config.url.contains(":memory:") && max_connections != 1 {
            warn!("In-memory database, limiting pool to a single connection");
            max_connections = 1;
        }

        let mut opt = ConnectOptions::new(&config.url);
        opt.max_connections(max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .idle_timeout(Duration::from_secs(600))
            .sqlx_logging(true);

        info!("Connecting to database: {}", config.url);
        let connection = Database::connect(opt).await?;

        info!("Running database migrations...");
        Migrator::up(&connection, None).await?;

        info!("Database connection established and migrations completed");

        Ok(Self { connection })
    }
}
