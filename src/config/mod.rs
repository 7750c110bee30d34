pub mod roblox;
pub use roblox::RobloxConfig;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Complete bridge configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Origin of the web frontend (CORS + postMessage target)
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    #[serde(default)]
    pub roblox: RobloxConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

fn default_port() -> u16 {
    5330
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_frontend_url() -> String {
    "http://localhost:3700".to_string()
}

/// Bounds for outbound calls made on behalf of a request
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_download_seconds")]
    pub download_seconds: u64,
    #[serde(default = "default_upload_seconds")]
    pub upload_seconds: u64,
    #[serde(default = "default_poll_seconds")]
    pub poll_seconds: u64,
    /// Token exchange, refresh, userinfo and revoke calls
    #[serde(default = "default_oauth_seconds")]
    pub oauth_seconds: u64,
}

fn default_download_seconds() -> u64 {
    60
}

fn default_upload_seconds() -> u64 {
    120
}

fn default_poll_seconds() -> u64 {
    30
}

fn default_oauth_seconds() -> u64 {
    10
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            download_seconds: default_download_seconds(),
            upload_seconds: default_upload_seconds(),
            poll_seconds: default_poll_seconds(),
            oauth_seconds: default_oauth_seconds(),
        }
    }
}

impl TimeoutConfig {
    pub fn download(&self) -> Duration {
        Duration::from_secs(self.download_seconds)
    }

    pub fn upload(&self) -> Duration {
        Duration::from_secs(self.upload_seconds)
    }

    pub fn poll(&self) -> Duration {
        Duration::from_secs(self.poll_seconds)
    }

    pub fn oauth(&self) -> Duration {
        Duration::from_secs(self.oauth_seconds)
    }
}

/// Expiry of in-memory records
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    /// Lifetime of a pending authorization attempt
    #[serde(default = "default_state_ttl")]
    pub state_ttl_seconds: i64,
    /// Lifetime of an upload operation shadow
    #[serde(default = "default_operation_ttl")]
    pub operation_ttl_seconds: i64,
    /// How often the background sweeps run
    #[serde(default = "default_cleanup_interval")]
    pub interval_seconds: u64,
}

fn default_state_ttl() -> i64 {
    600
}

fn default_operation_ttl() -> i64 {
    3600
}

fn default_cleanup_interval() -> u64 {
    60
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            state_ttl_seconds: default_state_ttl(),
            operation_ttl_seconds: default_operation_ttl(),
            interval_seconds: default_cleanup_interval(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            frontend_url: default_frontend_url(),
            roblox: RobloxConfig::default(),
            timeouts: TimeoutConfig::default(),
            cleanup: CleanupConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Overlay `BRIDGE_*` environment variables on top of this config.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary lookup (env in production, a map in tests).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("BRIDGE_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                self.port = port;
            }
        }
        if let Some(v) = lookup("BRIDGE_FRONTEND_URL") {
            self.frontend_url = v;
        }
        if let Some(v) = lookup("BRIDGE_ROBLOX_CLIENT_ID") {
            self.roblox.client_id = v;
        }
        if let Some(v) = lookup("BRIDGE_ROBLOX_CLIENT_SECRET") {
            self.roblox.client_secret = v;
        }
        if let Some(v) = lookup("BRIDGE_REDIRECT_URI") {
            self.roblox.redirect_uri = v;
        }
        if let Some(v) = lookup("BRIDGE_API_BASE_URL") {
            self.roblox.api_base_url = v;
        }
        if let Some(v) = lookup("BRIDGE_DASHBOARD_BASE_URL") {
            self.roblox.dashboard_base_url = v;
        }
    }

    /// Reject configurations the OAuth flow cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.roblox.client_id.is_empty() {
            bail!("roblox.client_id is required (or set BRIDGE_ROBLOX_CLIENT_ID)");
        }
        if self.roblox.client_secret.is_empty() {
            bail!("roblox.client_secret is required (or set BRIDGE_ROBLOX_CLIENT_SECRET)");
        }
        Ok(())
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<BridgeConfig> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config file {}", path))?;
    let config: BridgeConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file {}", path))?;
    Ok(config)
}
