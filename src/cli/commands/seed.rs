use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use tracing::{debug, error, info, trace};

use crate::handlers::reset::seed_database;

/// Drop, recreate, and seed the database without going through the HTTP
/// reset route.
pub async fn seed(database_url: &str) -> Result<()> {
    trace!("Entering seed function");
    info!("Seeding database");
    debug!("Database URL: {}", database_url);

    let db = match Database::connect(database_url).await {
        Ok(connection) => {
            info!("Successfully connected to database");
            connection
        }
        Err(e) => {
            error!("Failed to connect to database '{}': {}", database_url, e);
            return Err(e.into());
        }
    };

    info!("Recreating schema");
    if let Err(e) = Migrator::fresh(&db).await {
        error!("Failed to recreate schema: {}", e);
        return Err(e.into());
    }

    if let Err(e) = seed_database(&db).await {
        error!("Failed to load seed data: {}", e);
        return Err(e.into());
    }

    info!("Database seeded successfully!");
    Ok(())
}
