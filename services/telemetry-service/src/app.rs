use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{data_upload, demo_simulate, healthz, readyz};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/api/data-upload", post(data_upload))
        .route("/api/demo-simulate", post(demo_simulate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
