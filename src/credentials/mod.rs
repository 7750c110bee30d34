//! The single active Roblox credential and its lifecycle.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       TokenManager                       │
//! │  - store / clear (connect, disconnect)   │
//! │  - valid-token lookup with refresh       │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//!   (refresh, revoke)     (new tokens)
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       OAuthClient (token endpoint)       │
//! └─────────────────────────────────────────┘
//! ```
//!
//! State is in memory only; a restart forces re-authorization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod manager;

pub use manager::TokenManager;

/// Identity of the connected Roblox user
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: String,
    pub username: String,
    pub display_name: String,
}

/// Token set for the one logged-in user
#[derive(Clone, Debug)]
pub struct Credential {
    /// OAuth access token (used for API requests)
    pub access_token: String,

    /// OAuth refresh token, absent if the provider did not issue one
    pub refresh_token: Option<String>,

    /// When the access token expires (UTC)
    pub expires_at: DateTime<Utc>,

    pub user_info: UserInfo,

    pub connected_at: DateTime<Utc>,
}
