use axum::{
    routing::{get, patch},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use super::handlers::{self, AppState};
use super::static_files::serve_static;

/// Create the main router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Usage routes
        .route("/usage", get(handlers::get_usage))
        .route("/overview", get(handlers::get_overview))
        // Config routes
        .route("/config", get(handlers::get_config))
        .route("/config", patch(handlers::update_config))
        // Health check
        .route("/health", get(handlers::health_check));

    // CORS layer for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Combine routes
    Router::new()
        .nest("/api", api_routes)
        .fallback_service(serve_static())
        .layer(cors)
        .with_state(state)
}
