use axum::extract::State;
use axum::response::Redirect;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, Set};
use tracing::{debug, info, instrument, trace};

use crate::errors::AppError;
use crate::schemas::AppState;
use model::entities::{role, user};

/// Drop and recreate all tables, then load the seed dataset.
///
/// Unauthenticated and destructive; a development convenience, not a
/// production surface.
#[instrument]
pub async fn reset_db(State(state): State<AppState>) -> Result<Redirect, AppError> {
    trace!("Entering reset_db");
    info!("Resetting database");

    Migrator::fresh(&state.db).await?;
    debug!("Schema recreated, loading seed data");
    seed_database(&state.db).await?;

    info!("Database reset and seeded");
    Ok(Redirect::to("/"))
}

/// Seed the fixed development dataset: three roles and one user per role.
/// Also used by the `seed` CLI subcommand.
pub async fn seed_database(db: &DatabaseConnection) -> Result<(), DbErr> {
    trace!("Entering seed_database");

    let mut role_ids = Vec::new();
    for role_name in ["Administrator", "User", "Guest"] {
        let inserted = role::ActiveModel {
            name: Set(role_name.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        debug!("Seeded role '{}' with ID {}", role_name, inserted.id);
        role_ids.push(inserted.id);
    }

    for (username, role_id) in ["Admin", "User", "Guest"].iter().zip(&role_ids) {
        let inserted = user::ActiveModel {
            username: Set(username.to_string()),
            prontuario: Set(None),
            role_id: Set(Some(*role_id)),
            ..Default::default()
        }
        .insert(db)
        .await?;
        debug!("Seeded user '{}' with ID {}", username, inserted.id);
    }

    info!("Seed data loaded: 3 roles, 3 users");
    Ok(())
}
