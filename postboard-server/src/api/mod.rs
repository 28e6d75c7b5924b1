pub mod authors;
pub mod error;
pub mod posts;
pub mod stats;

pub use error::{ApiError, ApiResult};

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Build the application router with all API routes
pub fn build_router(state: AppState) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Dashboard routes
        .route("/api/stats", get(stats::get_stats))
        .route("/api/categories", get(stats::get_categories))
        // Post routes
        .route("/api/posts", get(posts::get_posts).post(posts::create_post))
        .route(
            "/api/posts/:id",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        // Author routes
        .route("/api/authors", get(authors::get_authors))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn health_check() -> &'static str {
    "OK"
}
