use axum::{extract::State, http::StatusCode, response::Json};
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, trace};
use utoipa::ToSchema;

use crate::schemas::{ApiResponse, AppState};
use model::entities::{role, user};

/// User response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    /// Registration identifier, if the user registered with one
    pub prontuario: Option<String>,
    /// Resolved role name, if the user has a role
    pub role: Option<String>,
}

impl From<(user::Model, Option<role::Model>)> for UserResponse {
    fn from((user_model, role_model): (user::Model, Option<role::Model>)) -> Self {
        Self {
            id: user_model.id,
            username: user_model.username,
            prontuario: user_model.prontuario,
            role: role_model.map(|r| r.name),
        }
    }
}

/// Get all registered users
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    responses(
        (status = 200, description = "Users retrieved successfully", body = ApiResponse<Vec<UserResponse>>),
        (status = 500, description = "Internal server error", body = crate::schemas::ErrorResponse)
    )
)]
#[instrument]
pub async fn get_users(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, StatusCode> {
    trace!("Entering get_users function");
    debug!("Fetching all users with their roles from database");

    match user::Entity::find()
        .find_also_related(role::Entity)
        .all(&state.db)
        .await
    {
        Ok(users) => {
            let user_count = users.len();
            let user_responses: Vec<UserResponse> =
                users.into_iter().map(UserResponse::from).collect();

            info!("Successfully retrieved {} users", user_count);
            let response = ApiResponse {
                data: user_responses,
                message: "Users retrieved successfully".to_string(),
                success: true,
            };
            Ok(Json(response))
        }
        Err(db_error) => {
            error!("Failed to retrieve users from database: {}", db_error);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
