//! Roblox Open Cloud application settings and endpoint layout.

use serde::Deserialize;

/// Roblox OAuth application + API location
#[derive(Debug, Clone, Deserialize)]
pub struct RobloxConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    /// Space-separated OAuth scopes
    #[serde(default = "default_scopes")]
    pub scopes: String,
    /// Base of the OAuth and assets APIs
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Base of the Creator Dashboard (for asset links)
    #[serde(default = "default_dashboard_base_url")]
    pub dashboard_base_url: String,
}

fn default_redirect_uri() -> String {
    "http://localhost:5330/roblox/callback".to_string()
}

fn default_scopes() -> String {
    "openid profile asset:read asset:write".to_string()
}

fn default_api_base_url() -> String {
    "https://apis.roblox.com".to_string()
}

fn default_dashboard_base_url() -> String {
    "https://create.roblox.com".to_string()
}

impl Default for RobloxConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
            scopes: default_scopes(),
            api_base_url: default_api_base_url(),
            dashboard_base_url: default_dashboard_base_url(),
        }
    }
}

impl RobloxConfig {
    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }

    pub fn authorize_url(&self) -> String {
        self.api_url("/oauth/v1/authorize")
    }

    pub fn token_url(&self) -> String {
        self.api_url("/oauth/v1/token")
    }

    pub fn userinfo_url(&self) -> String {
        self.api_url("/oauth/v1/userinfo")
    }

    pub fn revoke_url(&self) -> String {
        self.api_url("/oauth/v1/token/revoke")
    }

    pub fn assets_url(&self) -> String {
        self.api_url("/assets/v1/assets")
    }

    pub fn operation_url(&self, operation_id: &str) -> String {
        self.api_url(&format!(
            "/assets/v1/operations/{}",
            urlencoding::encode(operation_id)
        ))
    }

    /// Creator Dashboard page for a finished asset
    pub fn asset_dashboard_url(&self, asset_id: &str) -> String {
        format!(
            "{}/dashboard/creations/store/{}/configure",
            self.dashboard_base_url.trim_end_matches('/'),
            asset_id
        )
    }
}
