use super::BridgeAppState;
use crate::credentials::UserInfo;
use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use std::sync::Arc;

const SERVICE_NAME: &str = "meshy-roblox-bridge";

#[derive(Serialize)]
pub struct StatusResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    connected: bool,
    user_info: Option<UserInfo>,
}

pub fn create_status_router(state: Arc<BridgeAppState>) -> Router {
    Router::new()
        .route("/status", get(status))
        .with_state(state)
}

/// GET /status
///
/// Liveness check for the frontend; also reports the connected account.
async fn status(State(state): State<Arc<BridgeAppState>>) -> Json<StatusResponse> {
    let user_info = state.tokens.current_user_info();

    Json(StatusResponse {
        status: "ok",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        connected: user_info.is_some(),
        user_info,
    })
}
