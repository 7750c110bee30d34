use super::{AppError, BridgeAppState};
use crate::upload::{ImportRequest, OperationStatus, UploadOperation};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

#[derive(Serialize)]
pub struct UploadResponse {
    success: bool,
    result: UploadOperation,
}

pub fn create_upload_router(state: Arc<BridgeAppState>) -> Router {
    Router::new()
        .route("/import", post(import))
        .route("/upload-status/:operation_id", get(upload_status))
        .with_state(state)
}

/// POST /import
///
/// Downloads the model and starts a Roblox asset-creation operation.
/// Malformed bodies are answered with 400 `{detail}` like every other error.
async fn import(
    State(state): State<Arc<BridgeAppState>>,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!(error = %rejection, "Rejected import body");
        AppError::BadRequest(rejection.body_text())
    })?;
    let result = state.uploader.import(&request).await?;
    Ok(Json(UploadResponse {
        success: true,
        result,
    }))
}

/// GET /upload-status/:operation_id
async fn upload_status(
    State(state): State<Arc<BridgeAppState>>,
    Path(operation_id): Path<String>,
) -> Result<Json<UploadResponse>, AppError> {
    let result = state.uploader.poll(&operation_id).await?;
    Ok(Json(UploadResponse {
        success: result.status != OperationStatus::Failed,
        result,
    }))
}
