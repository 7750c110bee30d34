//! Roblox account connection: authorization URL, browser launch, OAuth
//! callback and disconnect.

use super::{pages, BridgeAppState};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Serialize)]
pub struct AuthorizeResponse {
    auth_url: String,
}

#[derive(Serialize)]
pub struct ConnectResponse {
    success: bool,
    message: String,
}

#[derive(Serialize)]
pub struct DisconnectResponse {
    success: bool,
}

/// OAuth callback query parameters
#[derive(Deserialize)]
pub struct OAuthCallback {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

pub fn create_connection_router(state: Arc<BridgeAppState>) -> Router {
    Router::new()
        .route("/roblox/authorize", get(authorize))
        .route("/connect", post(connect))
        .route("/roblox/callback", get(oauth_callback))
        .route("/disconnect", post(disconnect))
        .with_state(state)
}

/// GET /roblox/authorize
///
/// Issues an authorization URL for the frontend to open in a popup.
async fn authorize(State(state): State<Arc<BridgeAppState>>) -> Json<AuthorizeResponse> {
    Json(AuthorizeResponse {
        auth_url: state.auth.begin_authorization(),
    })
}

/// POST /connect
///
/// Same as `/roblox/authorize`, but the bridge opens the URL itself.
async fn connect(State(state): State<Arc<BridgeAppState>>) -> Json<ConnectResponse> {
    let auth_url = state.auth.begin_authorization();

    info!("Opening browser for authorization");
    // Launchers may wait on a child process
    let open_browser = state.open_browser;
    let launched = tokio::task::spawn_blocking(move || open_browser(&auth_url))
        .await
        .map_err(|e| e.to_string())
        .and_then(|result| result.map_err(|e| e.to_string()));

    match launched {
        Ok(()) => Json(ConnectResponse {
            success: true,
            message: "Authorization page opened in browser".to_string(),
        }),
        Err(e) => {
            warn!(error = %e, "Failed to open browser");
            Json(ConnectResponse {
                success: false,
                message: format!("Failed to open browser: {}", e),
            })
        }
    }
}

/// GET /roblox/callback
///
/// Provider redirect target. Always answers with an HTML page for the popup.
async fn oauth_callback(
    State(state): State<Arc<BridgeAppState>>,
    Query(callback): Query<OAuthCallback>,
) -> Response {
    if let Some(error) = callback.error {
        let description = callback
            .error_description
            .unwrap_or_else(|| "Unknown error".to_string());
        warn!(error = %error, description = %description, "OAuth authorization denied");
        return error_response(
            &state,
            &format!("Authorization failed: {} - {}", error, description),
        );
    }

    let (Some(code), Some(csrf_state)) = (callback.code, callback.state) else {
        warn!("OAuth callback missing code or state");
        return error_response(&state, "Missing code or state parameter");
    };

    match state.auth.handle_callback(&code, &csrf_state).await {
        Ok(display_name) => Html(pages::success_page(&display_name, &state.frontend_url))
            .into_response(),
        Err(e) => error_response(&state, &e.to_string()),
    }
}

fn error_response(state: &BridgeAppState, message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Html(pages::error_page(message, &state.frontend_url)),
    )
        .into_response()
}

/// POST /disconnect
///
/// Best-effort revoke, then forget the credential. Always succeeds.
async fn disconnect(State(state): State<Arc<BridgeAppState>>) -> Json<DisconnectResponse> {
    state.tokens.clear().await;
    Json(DisconnectResponse { success: true })
}
