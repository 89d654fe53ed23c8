//! Inbound gossip listener.
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing, Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use super::engine::GossipEngine;
use super::state::GossipState;
use crate::api::paths;
use crate::error::{EchoError, GossipError, Result};

pub fn router(engine: GossipEngine) -> Router {
    Router::new()
        .route(
            paths::gossip::GOSSIP,
            routing::post(receive_gossip).get(current_state),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

/// The body is taken as raw bytes so a payload that does not parse gets our
/// own 400 response rather than the extractor's rejection.
#[instrument(skip(engine, body), level = "debug")]
pub async fn receive_gossip(State(engine): State<GossipEngine>, body: Bytes) -> Response {
    match engine.receive(&body) {
        Ok(state) => {
            info!(from = %state.node_id, state = %state.state, "received gossip");
            (
                StatusCode::OK,
                Json(json!({"message": "Gossip received successfully"})),
            )
                .into_response()
        }
        Err(EchoError::Gossip(GossipError::Message(reason))) => {
            warn!(reason = %reason, "rejected gossip payload");
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "Invalid gossip data"})),
            )
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}

#[instrument(skip(engine), level = "debug")]
pub async fn current_state(State(engine): State<GossipEngine>) -> Result<Json<GossipState>> {
    engine.state().map(Json)
}
