use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::request_id::{propagate_request_id, span_for_request};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/recommend", post(handlers::recommend))
        .route("/options", get(handlers::get_options))
        .route("/places/search", post(handlers::search_places))
        .route("/weather", get(handlers::get_weather))
        .route("/suggest", post(handlers::suggest))
        .route("/preferences/:user_id", get(handlers::get_preferences))
        .route("/preferences/:user_id", put(handlers::put_preferences))
        .route("/feedback", post(handlers::post_feedback))
        .route("/rotation/start", post(handlers::start_rotation))
        .route("/rotation/:session_id/reroll", post(handlers::reroll_rotation));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http().make_span_with(span_for_request))
        // Outermost of the two, so the id is set before the span is made
        .layer(middleware::from_fn(propagate_request_id))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
