use crate::upload::UploadError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

/// Application error types for bridge endpoints
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    RequestTimeout(String),
    BadGateway(String),
    /// Relayed from Roblox with the status it answered with
    Upstream(StatusCode, String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::RequestTimeout(msg) => (StatusCode::REQUEST_TIMEOUT, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Upstream(status, msg) => (status, msg),
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        let detail = err.to_string();
        match err {
            UploadError::NotConnected => AppError::Unauthorized(detail),
            UploadError::MissingUserId
            | UploadError::DownloadRejected(_)
            | UploadError::DownloadFailed(_)
            | UploadError::Archive(_)
            | UploadError::OperationFailed(_) => AppError::BadRequest(detail),
            UploadError::DownloadTimedOut | UploadError::UploadTimedOut => {
                AppError::RequestTimeout(detail)
            }
            UploadError::UploadRejected { status, .. } => match StatusCode::from_u16(status) {
                Ok(code) if code.is_client_error() || code.is_server_error() => {
                    AppError::Upstream(code, detail)
                }
                _ => AppError::BadGateway(detail),
            },
            UploadError::ProtocolViolation(_) | UploadError::Upstream(_) => {
                AppError::BadGateway(detail)
            }
        }
    }
}
