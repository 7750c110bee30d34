//! HTTP surface consumed by the web frontend.

mod connection;
mod error;
mod pages;
mod status;
mod upload;

pub use error::AppError;

use crate::credentials::TokenManager;
use crate::oauth::AuthFlow;
use crate::upload::Uploader;
use axum::{http::HeaderValue, Router};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::warn;

/// Opens a URL outside the process (the user's default browser in production)
pub type BrowserLauncher = fn(&str) -> std::io::Result<()>;

/// Launch `url` with the platform's default handler
pub fn system_browser(url: &str) -> std::io::Result<()> {
    open::that(url)
}

/// Shared application state for all bridge endpoints
#[derive(Clone)]
pub struct BridgeAppState {
    pub auth: Arc<AuthFlow>,
    pub tokens: Arc<TokenManager>,
    pub uploader: Arc<Uploader>,
    /// CORS origin and postMessage target
    pub frontend_url: String,
    pub open_browser: BrowserLauncher,
}

/// Create the bridge router with CORS for the frontend origin
pub fn create_router(state: BridgeAppState) -> Router {
    let cors = cors_layer(&state.frontend_url);
    let state = Arc::new(state);

    Router::new()
        .merge(status::create_status_router(state.clone()))
        .merge(connection::create_connection_router(state.clone()))
        .merge(upload::create_upload_router(state))
        .layer(cors)
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let origin = match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(e) => {
            warn!(frontend_url = %frontend_url, error = %e, "Invalid frontend origin, CORS disabled");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}
