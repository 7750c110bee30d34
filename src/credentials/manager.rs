use super::{Credential, UserInfo};
use crate::events::EventBus;
use crate::oauth::OAuthClient;
use chrono::{Duration, Utc};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

/// Tokens closer than this to expiry are refreshed before use
const REFRESH_LOOKAHEAD_SECONDS: i64 = 60;

enum TokenState {
    Missing,
    Fresh(String),
    Stale,
}

/// Holds the single credential and keeps it fresh.
///
/// The credential lock is never held across network I/O. Refreshes are
/// serialized through `refresh_gate` so concurrent callers trigger at most
/// one token-endpoint round trip.
pub struct TokenManager {
    client: OAuthClient,
    credential: RwLock<Option<Credential>>,
    refresh_gate: tokio::sync::Mutex<()>,
    events: EventBus,
}

impl TokenManager {
    pub fn new(client: OAuthClient, events: EventBus) -> Self {
        Self {
            client,
            credential: RwLock::new(None),
            refresh_gate: tokio::sync::Mutex::new(()),
            events,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Credential>> {
        self.credential.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Credential>> {
        self.credential.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the credential with a freshly issued token set
    pub fn store(
        &self,
        access_token: String,
        refresh_token: Option<String>,
        expires_in_seconds: i64,
        user_info: UserInfo,
    ) {
        let now = Utc::now();
        let username = user_info.username.clone();

        *self.write() = Some(Credential {
            access_token,
            refresh_token,
            expires_at: now + Duration::seconds(expires_in_seconds),
            user_info,
            connected_at: now,
        });

        info!(username = %username, expires_in = expires_in_seconds, "Credential stored");
        self.events
            .connection_changed(true, (!username.is_empty()).then_some(username));
    }

    pub fn current_user_info(&self) -> Option<UserInfo> {
        self.read().as_ref().map(|c| c.user_info.clone())
    }

    /// True while a credential is held, whether or not it is still fresh
    pub fn is_connected(&self) -> bool {
        self.read().is_some()
    }

    /// Snapshot of the credential (for status reporting and tests)
    pub fn credential(&self) -> Option<Credential> {
        self.read().clone()
    }

    fn token_state(&self) -> TokenState {
        let guard = self.read();
        let Some(credential) = guard.as_ref() else {
            return TokenState::Missing;
        };
        let deadline = Utc::now() + Duration::seconds(REFRESH_LOOKAHEAD_SECONDS);
        if credential.expires_at > deadline {
            TokenState::Fresh(credential.access_token.clone())
        } else {
            TokenState::Stale
        }
    }

    /// Return an access token valid for at least the next minute.
    ///
    /// Refreshes first when the current one is about to expire. None means
    /// "not connected": no credential, or the refresh failed.
    pub async fn get_valid_access_token(&self) -> Option<String> {
        match self.token_state() {
            TokenState::Missing => return None,
            TokenState::Fresh(token) => return Some(token),
            TokenState::Stale => {}
        }

        let _gate = self.refresh_gate.lock().await;

        // Another caller may have refreshed while we waited
        match self.token_state() {
            TokenState::Missing => return None,
            TokenState::Fresh(token) => return Some(token),
            TokenState::Stale => {}
        }

        if self.refresh_locked().await {
            return self.read().as_ref().map(|c| c.access_token.clone());
        }

        // A reconnect during the refresh may have left a fresh credential
        match self.token_state() {
            TokenState::Fresh(token) => Some(token),
            TokenState::Missing | TokenState::Stale => None,
        }
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// On failure the stale credential is left in place. Never retried.
    pub async fn refresh(&self) -> bool {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> bool {
        let snapshot = self
            .read()
            .as_ref()
            .map(|c| (c.connected_at, c.refresh_token.clone()));

        let Some((connected_at, Some(refresh_token))) = snapshot else {
            warn!("Token expired and no refresh token available");
            return false;
        };

        let tokens = match self.client.refresh(&refresh_token).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                self.events.activity(format!("[Token] Refresh failed: {}", e));
                return false;
            }
        };

        let mut guard = self.write();
        let Some(credential) = guard.as_mut().filter(|c| {
            c.connected_at == connected_at
                && c.refresh_token.as_deref() == Some(refresh_token.as_str())
        }) else {
            // Disconnected or reconnected while the refresh was in flight
            info!("Credential changed during refresh, discarding result");
            return false;
        };

        credential.access_token = tokens.access_token;
        if let Some(rotated) = tokens.refresh_token {
            credential.refresh_token = Some(rotated);
        }
        credential.expires_at = Utc::now() + Duration::seconds(tokens.expires_in);
        drop(guard);

        info!(expires_in = tokens.expires_in, "Access token refreshed");
        self.events
            .activity(format!("[Token] Refreshed. Expires in {}s", tokens.expires_in));
        true
    }

    /// Disconnect: best-effort server-side revoke, then drop the credential.
    pub async fn clear(&self) {
        let access_token = self.read().as_ref().map(|c| c.access_token.clone());

        if let Some(token) = access_token {
            if let Err(e) = self.client.revoke(&token).await {
                warn!(error = %e, "Token revocation failed");
                self.events
                    .activity(format!("[OAuth] Token revocation failed: {}", e));
            }
        }

        *self.write() = None;

        info!("Disconnected");
        self.events.connection_changed(false, None);
        self.events.activity("[OAuth] Disconnected");
    }
}
