//! Local shadows of Roblox asset-creation operations.
//!
//! The remote operation resource is decoded into a tagged
//! [`OperationOutcome`]; the [`OperationStore`] keeps the last known state
//! per operation id and never overwrites a terminal one.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Error message for a finished operation that never reported an asset id
pub const MISSING_ASSET_ID: &str = "Upload completed but no Asset ID returned";

/// Lifecycle of an upload operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Processing,
    Completed,
    Failed,
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Completed | OperationStatus::Failed)
    }
}

/// Local shadow of one remote operation (also the wire shape of a poll result)
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOperation {
    pub operation_id: String,
    pub status: OperationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

impl UploadOperation {
    pub fn processing(operation_id: &str) -> Self {
        Self {
            operation_id: operation_id.to_string(),
            status: OperationStatus::Processing,
            asset_id: None,
            asset_url: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    fn apply(&mut self, outcome: &OperationOutcome) {
        match outcome {
            OperationOutcome::Processing => {}
            OperationOutcome::Completed {
                asset_id,
                asset_url,
            } => {
                self.status = OperationStatus::Completed;
                self.asset_id = Some(asset_id.clone());
                self.asset_url = Some(asset_url.clone());
            }
            OperationOutcome::Failed { message } => {
                self.status = OperationStatus::Failed;
                self.error = Some(message.clone());
            }
        }
    }
}

/// Classified state of a remote operation
#[derive(Clone, Debug, PartialEq)]
pub enum OperationOutcome {
    Processing,
    Completed { asset_id: String, asset_url: String },
    Failed { message: String },
}

/// `error` member of an operation resource
#[derive(Deserialize, Debug, Clone, Default)]
pub struct OperationError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(flatten)]
    pub details: serde_json::Map<String, Value>,
}

impl OperationError {
    /// `"error": {}` carries nothing and does not fail the operation
    pub fn is_empty(&self) -> bool {
        self.message.is_none() && self.code.is_none() && self.details.is_empty()
    }
}

/// `response` member of a finished operation
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AssetResponse {
    /// Roblox sends this as a number or a string depending on the endpoint
    #[serde(default)]
    pub asset_id: Option<Value>,
}

/// Operation resource returned by the assets API
#[derive(Deserialize, Debug, Clone, Default)]
pub struct OperationEnvelope {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<OperationError>,
    #[serde(default)]
    pub response: Option<AssetResponse>,
}

impl OperationEnvelope {
    /// Operation id: the last segment of `path` (None if `path` is missing or empty)
    pub fn operation_id(&self) -> Option<String> {
        let path = self.path.as_deref()?.trim_end_matches('/');
        path.rsplit('/')
            .next()
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }

    /// Asset id as a non-empty string
    pub fn asset_id(&self) -> Option<String> {
        let value = self.response.as_ref()?.asset_id.as_ref()?;
        let id = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!id.is_empty()).then_some(id)
    }

    /// Classify the resource.
    ///
    /// An `error` fails the operation even before `done` is set. `done`
    /// without an asset id is a failure too.
    pub fn classify<F>(&self, asset_url: F) -> OperationOutcome
    where
        F: Fn(&str) -> String,
    {
        if let Some(error) = self.error.as_ref().filter(|e| !e.is_empty()) {
            return OperationOutcome::Failed {
                message: error
                    .message
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            };
        }

        if !self.done {
            return OperationOutcome::Processing;
        }

        match self.asset_id() {
            Some(asset_id) => OperationOutcome::Completed {
                asset_url: asset_url(&asset_id),
                asset_id,
            },
            None => OperationOutcome::Failed {
                message: MISSING_ASSET_ID.to_string(),
            },
        }
    }
}

/// Operation shadow store with expiration
#[derive(Clone)]
pub struct OperationStore {
    operations: Arc<DashMap<String, UploadOperation>>,
    expiry_duration: Duration,
}

impl OperationStore {
    pub fn new(expiry_seconds: i64) -> Self {
        Self {
            operations: Arc::new(DashMap::new()),
            expiry_duration: Duration::seconds(expiry_seconds),
        }
    }

    /// Record a freshly submitted operation
    pub fn insert_processing(&self, operation_id: &str) -> UploadOperation {
        let operation = UploadOperation::processing(operation_id);
        self.operations
            .insert(operation_id.to_string(), operation.clone());
        operation
    }

    pub fn get(&self, operation_id: &str) -> Option<UploadOperation> {
        self.operations.get(operation_id).map(|op| op.clone())
    }

    /// Fold `outcome` into the shadow and return the resulting record.
    ///
    /// Terminal records are returned untouched. Unknown ids get a record.
    pub fn apply(&self, operation_id: &str, outcome: &OperationOutcome) -> UploadOperation {
        let mut entry = self
            .operations
            .entry(operation_id.to_string())
            .or_insert_with(|| UploadOperation::processing(operation_id));

        if !entry.status.is_terminal() {
            entry.apply(outcome);
        }

        entry.clone()
    }

    /// Drop records older than the TTL
    pub fn cleanup_expired(&self) {
        let cutoff = Utc::now() - self.expiry_duration;
        self.operations.retain(|_, op| op.created_at >= cutoff);
    }

    pub fn count(&self) -> usize {
        self.operations.len()
    }

    #[cfg(test)]
    pub(crate) fn backdate(&self, operation_id: &str, age: Duration) {
        if let Some(mut op) = self.operations.get_mut(operation_id) {
            op.created_at = op.created_at - age;
        }
    }
}

/// Background task to periodically drop expired operation shadows
pub async fn run_operation_cleanup(store: OperationStore, interval_seconds: u64) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_seconds));

    loop {
        interval.tick().await;
        store.cleanup_expired();
        tracing::debug!(
            "Upload operation cleanup complete, {} operations tracked",
            store.count()
        );
    }
}
