use crate::handlers::{
    health::health_check,
    register::{index_page, register_submit},
    reset::reset_db,
    users::get_users,
};
use crate::schemas::{ApiDoc, AppState};
use crate::views;
use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Registration form (display + process)
        .route("/", get(index_page).post(register_submit))
        // Development convenience: drop, recreate, and seed the database
        .route("/reset-db", get(reset_db))
        // Health check
        .route("/health", get(health_check))
        // Read-only JSON surface
        .route("/api/v1/users", get(get_users))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Unmatched routes get the fixed not-found page
        .fallback(not_found)
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, views::not_found_page())
}
