use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::config::AppConfig;
use crate::handlers::users::UserResponse;
use crate::notify::Mailer;
use crate::session::SessionData;

/// Application state shared across handlers
#[derive(Clone, Debug)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Short-lived per-visitor session state, keyed by session id
    pub sessions: Cache<String, SessionData>,
    /// Outbound notification dispatcher
    pub mailer: Mailer,
    /// Environment-sourced configuration
    pub config: AppConfig,
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::users::get_users,
    ),
    components(
        schemas(
            ApiResponse<Vec<UserResponse>>,
            ErrorResponse,
            HealthResponse,
            UserResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "users", description = "Registered user endpoints"),
    ),
    info(
        title = "Cadastro API",
        description = "Visitor registration service - read-only API over the registered user list",
        version = "0.1.0",
    )
)]
pub struct ApiDoc;
