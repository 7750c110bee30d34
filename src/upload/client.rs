use super::format::ModelFormat;
use super::operation::OperationEnvelope;
use crate::config::RobloxConfig;
use anyhow::{anyhow, Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// `request` part of the asset-creation call
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescriptor {
    pub asset_type: String,
    pub display_name: String,
    pub description: String,
    pub creation_context: CreationContext,
}

#[derive(Serialize, Debug, Clone)]
pub struct CreationContext {
    pub creator: Creator,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Creator {
    pub user_id: String,
}

impl AssetDescriptor {
    pub fn model(display_name: &str, description: &str, user_id: &str) -> Self {
        Self {
            asset_type: "Model".to_string(),
            display_name: display_name.to_string(),
            description: description.to_string(),
            creation_context: CreationContext {
                creator: Creator {
                    user_id: user_id.to_string(),
                },
            },
        }
    }
}

/// Raw answer of the asset-creation endpoint
#[derive(Debug)]
pub struct SubmitResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP client for the Roblox Open Cloud assets API and model downloads
#[derive(Clone)]
pub struct AssetsClient {
    http_client: Client,
    config: RobloxConfig,
}

impl AssetsClient {
    pub fn new(config: RobloxConfig) -> Self {
        Self {
            http_client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &RobloxConfig {
        &self.config
    }

    /// GET an arbitrary URL (redirects followed) and return status + body
    pub async fn download(&self, url: &str, timeout: Duration) -> reqwest::Result<(u16, Vec<u8>)> {
        let response = self.http_client.get(url).timeout(timeout).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok((status, body.to_vec()))
    }

    /// POST the multipart asset-creation request.
    ///
    /// Any HTTP answer is returned as-is; only transport failures are errors.
    pub async fn create_asset(
        &self,
        access_token: &str,
        descriptor: &AssetDescriptor,
        data: Vec<u8>,
        format: ModelFormat,
        timeout: Duration,
    ) -> reqwest::Result<SubmitResponse> {
        // Serializing a plain struct of strings cannot fail
        let request_json = serde_json::to_string(descriptor).unwrap_or_default();

        let form = Form::new()
            .part(
                "request",
                Part::text(request_json).mime_str("application/json")?,
            )
            .part(
                "fileContent",
                Part::bytes(data)
                    .file_name(format.file_name())
                    .mime_str(format.content_type())?,
            );

        let response = self
            .http_client
            .post(self.config.assets_url())
            .bearer_auth(access_token)
            .multipart(form)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(SubmitResponse { status, body })
    }

    /// Fetch the current state of an asset operation
    pub async fn get_operation(
        &self,
        access_token: &str,
        operation_id: &str,
        timeout: Duration,
    ) -> Result<OperationEnvelope> {
        let response = self
            .http_client
            .get(self.config.operation_url(operation_id))
            .bearer_auth(access_token)
            .timeout(timeout)
            .send()
            .await
            .context("Failed to send operation status request")?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(anyhow!("Operation status request failed: {}", response.status()));
        }

        response
            .json::<OperationEnvelope>()
            .await
            .context("Failed to parse operation status response")
    }
}
