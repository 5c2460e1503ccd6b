use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::handler;
use crate::referrers;
use crate::state::AppState;

/// Build the axum router with all registry endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handler::health_handler))
        .route("/v2/", get(handler::base_handler))
        .route("/v2/*path", get(referrers::get_referrers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
