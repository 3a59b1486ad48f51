pub mod objects;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::any;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Routes accept any method.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/upload", any(objects::upload))
        .route("/download", any(objects::download))
        .route("/list", any(objects::list))
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
