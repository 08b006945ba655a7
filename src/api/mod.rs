mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Database;

pub fn create_router(db: Database) -> Router {
    let api = Router::new()
        // Models
        .route("/models", post(handlers::create_model))
        .route("/models/{id}", get(handlers::get_model))
        .route("/models/{id}/derivations", get(handlers::list_derivations))
        .route("/models/{id}/lineage", get(handlers::get_lineage))
        // Sharing
        .route("/share", post(handlers::share_model))
        .route("/links/{id}", get(handlers::resolve_link))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(db)
}
