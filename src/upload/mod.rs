//! Model upload to Roblox and polling of the resulting asset operation.
//!
//! ```text
//! modelUrl ─download─▶ bytes ─unwrap ZIP─▶ model ─multipart POST─▶ operation
//!                                                                     │
//!            /upload-status ◀── OperationStore ◀── poll (GET operation)┘
//! ```

pub mod archive;
pub mod client;
pub mod format;
pub mod operation;

pub use archive::{resolve_model, ArchiveError, ResolvedModel};
pub use client::{AssetDescriptor, AssetsClient};
pub use format::ModelFormat;
pub use operation::{
    run_operation_cleanup, OperationEnvelope, OperationOutcome, OperationStatus, OperationStore,
    UploadOperation, MISSING_ASSET_ID,
};

use crate::config::TimeoutConfig;
use crate::credentials::TokenManager;
use crate::events::EventBus;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Body of POST /import
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub model_url: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_display_name")]
    pub display_name: String,
    #[serde(default = "default_description")]
    pub description: String,
}

fn default_format() -> String {
    "glb".to_string()
}

fn default_display_name() -> String {
    "Meshy Model".to_string()
}

fn default_description() -> String {
    "Created with Meshy AI".to_string()
}

impl ImportRequest {
    pub fn new(model_url: &str) -> Self {
        Self {
            model_url: model_url.to_string(),
            format: default_format(),
            display_name: default_display_name(),
            description: default_description(),
        }
    }
}

/// Upload failures, one variant per distinguishable cause
#[derive(Debug, Clone, PartialEq)]
pub enum UploadError {
    /// No valid access token could be obtained
    NotConnected,
    /// Credential carries no Roblox user id
    MissingUserId,
    /// Model URL answered with a non-200 status
    DownloadRejected(u16),
    /// Model URL unreachable
    DownloadFailed(String),
    DownloadTimedOut,
    /// Payload is a ZIP without a usable model
    Archive(ArchiveError),
    UploadTimedOut,
    /// Asset endpoint answered with a non-2xx status
    UploadRejected { status: u16, body: String },
    /// A success response was missing required data
    ProtocolViolation(String),
    /// Roblox unreachable
    Upstream(String),
    /// The operation finished with an error
    OperationFailed(String),
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadError::NotConnected => {
                write!(f, "Not connected to Roblox. Please run /connect first.")
            }
            UploadError::MissingUserId => write!(f, "User ID not found"),
            UploadError::DownloadRejected(status) => {
                write!(f, "Failed to download model: {}", status)
            }
            UploadError::DownloadFailed(msg) => write!(f, "Failed to download model: {}", msg),
            UploadError::DownloadTimedOut => write!(f, "Model download timed out"),
            UploadError::Archive(e) => write!(f, "{}", e),
            UploadError::UploadTimedOut => write!(f, "Upload to Roblox timed out"),
            UploadError::UploadRejected { body, .. } => {
                write!(f, "Roblox upload failed: {}", body)
            }
            UploadError::ProtocolViolation(msg) => write!(f, "{}", msg),
            UploadError::Upstream(msg) => write!(f, "Roblox request failed: {}", msg),
            UploadError::OperationFailed(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for UploadError {}

impl From<ArchiveError> for UploadError {
    fn from(e: ArchiveError) -> Self {
        UploadError::Archive(e)
    }
}

/// Upload orchestrator and operation poller
pub struct Uploader {
    client: AssetsClient,
    tokens: Arc<TokenManager>,
    operations: OperationStore,
    timeouts: TimeoutConfig,
    events: EventBus,
}

impl Uploader {
    pub fn new(
        client: AssetsClient,
        tokens: Arc<TokenManager>,
        operations: OperationStore,
        timeouts: TimeoutConfig,
        events: EventBus,
    ) -> Self {
        Self {
            client,
            tokens,
            operations,
            timeouts,
            events,
        }
    }

    pub fn operations(&self) -> &OperationStore {
        &self.operations
    }

    fn asset_url(&self, asset_id: &str) -> String {
        self.client.config().asset_dashboard_url(asset_id)
    }

    /// Download `request.model_url`, upload it as a Model asset, and record
    /// the resulting operation.
    ///
    /// Returns the completed operation if Roblox finished synchronously,
    /// otherwise a `processing` record the caller must poll.
    pub async fn import(&self, request: &ImportRequest) -> Result<UploadOperation, UploadError> {
        let access_token = self
            .tokens
            .get_valid_access_token()
            .await
            .ok_or(UploadError::NotConnected)?;

        let user_id = self
            .tokens
            .current_user_info()
            .map(|u| u.user_id)
            .filter(|id| !id.is_empty())
            .ok_or(UploadError::MissingUserId)?;

        info!(display_name = %request.display_name, "Upload starting");
        self.events
            .activity(format!("[Upload] Starting: {}", request.display_name));

        let raw = self.download(&request.model_url).await?;

        let model = resolve_model(raw, &request.format).await.map_err(|e| {
            warn!(error = %e, "Model extraction failed");
            self.events.activity(format!("[Upload] {}", e));
            UploadError::from(e)
        })?;
        match &model.archive_entry {
            Some(entry) => self.events.activity(format!(
                "[Upload] Extracted {} from ZIP: {} ({} KB)",
                model.format.as_str().to_uppercase(),
                entry,
                model.data.len() / 1024
            )),
            None => self.events.activity(format!(
                "[Upload] {} file ({} KB)",
                model.format.as_str().to_uppercase(),
                model.data.len() / 1024
            )),
        }

        let descriptor =
            AssetDescriptor::model(&request.display_name, &request.description, &user_id);

        self.events.activity("[Upload] Uploading to Roblox...");
        let response = self
            .client
            .create_asset(
                &access_token,
                &descriptor,
                model.data,
                model.format,
                self.timeouts.upload(),
            )
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UploadError::UploadTimedOut
                } else {
                    UploadError::Upstream(e.to_string())
                }
            })?;

        if response.status != 200 && response.status != 201 {
            warn!(status = response.status, body = %response.body, "Roblox rejected upload");
            return Err(UploadError::UploadRejected {
                status: response.status,
                body: response.body,
            });
        }

        let envelope: OperationEnvelope = serde_json::from_str(&response.body).map_err(|e| {
            warn!(error = %e, body = %response.body, "Unparseable asset-creation response");
            UploadError::ProtocolViolation(format!("Invalid response from Roblox: {}", e))
        })?;

        let Some(operation_id) = envelope.operation_id() else {
            warn!(body = %response.body, "Asset-creation response has no operation path");
            return Err(UploadError::ProtocolViolation(
                "Roblox did not return an operation path".to_string(),
            ));
        };

        let operation = self.operations.insert_processing(&operation_id);
        info!(operation_id = %operation_id, done = envelope.done, "Upload submitted");

        // An error on an unfinished operation is left for the poller to report
        if !envelope.done {
            return Ok(operation);
        }

        let outcome = envelope.classify(|id| self.asset_url(id));
        let operation = self.operations.apply(&operation_id, &outcome);
        match outcome {
            OperationOutcome::Completed { asset_id, .. } => {
                self.events.activity(format!(
                    "[Upload] Immediately completed: assetId={}",
                    asset_id
                ));
                Ok(operation)
            }
            OperationOutcome::Failed { message } => {
                warn!(operation_id = %operation_id, error = %message, body = %response.body, "Upload failed immediately");
                self.events
                    .activity(format!("[Upload] Immediately failed: {}", message));
                Err(UploadError::OperationFailed(message))
            }
            OperationOutcome::Processing => Ok(operation),
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, UploadError> {
        let (status, body) = self
            .client
            .download(url, self.timeouts.download())
            .await
            .map_err(|e| {
                warn!(error = %e, "Model download failed");
                if e.is_timeout() {
                    UploadError::DownloadTimedOut
                } else {
                    UploadError::DownloadFailed(e.to_string())
                }
            })?;

        if status != 200 {
            warn!(status, "Model download rejected");
            return Err(UploadError::DownloadRejected(status));
        }

        self.events
            .activity(format!("[Upload] Model downloaded ({} KB)", body.len() / 1024));
        Ok(body)
    }

    /// Current state of `operation_id`.
    ///
    /// Terminal shadows are served from cache. Remote failures and
    /// timeouts degrade to `processing` so the frontend keeps polling.
    pub async fn poll(&self, operation_id: &str) -> Result<UploadOperation, UploadError> {
        let access_token = self
            .tokens
            .get_valid_access_token()
            .await
            .ok_or(UploadError::NotConnected)?;

        self.operations.cleanup_expired();

        let shadow = self.operations.get(operation_id);
        if let Some(op) = &shadow {
            if op.status.is_terminal() {
                debug!(operation_id = %operation_id, status = ?op.status, "Serving cached operation state");
                return Ok(op.clone());
            }
        }

        let envelope = match self
            .client
            .get_operation(&access_token, operation_id, self.timeouts.poll())
            .await
        {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(operation_id = %operation_id, error = %e, "Operation poll failed, reporting processing");
                self.events.activity("[Poll] No answer yet, retrying...");
                return Ok(shadow.unwrap_or_else(|| UploadOperation::processing(operation_id)));
            }
        };

        let outcome = envelope.classify(|id| self.asset_url(id));
        match &outcome {
            OperationOutcome::Processing => {
                Ok(shadow.unwrap_or_else(|| UploadOperation::processing(operation_id)))
            }
            OperationOutcome::Completed { asset_id, .. } => {
                info!(operation_id = %operation_id, asset_id = %asset_id, "Upload completed");
                self.events.activity("[Poll] Upload completed!");
                Ok(self.operations.apply(operation_id, &outcome))
            }
            OperationOutcome::Failed { message } => {
                warn!(operation_id = %operation_id, error = %message, "Upload failed");
                self.events
                    .activity(format!("[Poll] Upload failed: {}", message));
                Ok(self.operations.apply(operation_id, &outcome))
            }
        }
    }
}
