pub mod events;
pub mod health;
pub mod positions;

use crate::ingestion::SessionHandle;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
    pub chain_id: u64,
}

impl AppState {
    pub fn new(session: SessionHandle, chain_id: u64) -> Self {
        Self { session, chain_id }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/positions", get(positions::get_positions))
        .route("/v1/positions/:key", get(positions::get_position))
        .route("/v1/events", post(events::post_event))
        .route("/v1/pending", post(events::post_pending))
        .route("/v1/session/reset", post(events::post_reset))
        .route("/v1/notifications", get(events::get_notifications))
        .layer(cors)
        .with_state(state)
}
