use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::db::Cache;
use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};
use crate::services::ScorerService;

pub mod insights;
pub mod metrics;
pub mod recommendations;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub cache: Cache,
    pub scorer: Arc<ScorerService>,
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/users/:user_id/metrics", put(metrics::upsert))
        .route("/users/:user_id/metrics", get(metrics::list))
        .route(
            "/users/:user_id/recommendations/generate",
            post(recommendations::generate),
        )
        .route("/users/:user_id/recommendations", get(recommendations::list))
        .route(
            "/users/:user_id/recommendations/:recommendation_id/viewed",
            post(recommendations::mark_viewed),
        )
        .route(
            "/users/:user_id/recommendations/:recommendation_id/feedback",
            post(recommendations::feedback),
        )
        .route("/users/:user_id/insights", get(insights::feedback_insights))
        .route("/users/:user_id/data-quality", get(insights::data_quality))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
