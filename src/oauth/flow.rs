//! Authorization-code + PKCE flow against Roblox.
//!
//! ```text
//! START → PENDING (auth URL issued)
//!       → callback → EXCHANGED → PROFILE_FETCHED → COMMITTED
//!                  ↘ REJECTED (bad state / exchange failure)
//! ```

use super::exchange::{OAuthClient, TokenEndpointError, UserProfile};
use super::pkce::Pkce;
use super::provider::build_auth_url;
use super::state_manager::StateManager;
use crate::credentials::{TokenManager, UserInfo};
use crate::events::EventBus;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Display name used when the profile carries neither name nor username
const FALLBACK_DISPLAY_NAME: &str = "User";

/// Why a callback was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackError {
    /// Unknown, replayed, or expired `state`
    InvalidState,
    /// Token endpoint answered with a non-200 status
    ExchangeRejected { status: u16, body: String },
    /// Token endpoint unreachable or returned garbage
    ExchangeFailed(String),
}

impl std::fmt::Display for CallbackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallbackError::InvalidState => {
                write!(f, "Invalid state parameter. Please try again.")
            }
            CallbackError::ExchangeRejected { status, body } => {
                write!(f, "Token exchange failed: {} {}", status, body)
            }
            CallbackError::ExchangeFailed(msg) => write!(f, "Token exchange failed: {}", msg),
        }
    }
}

impl std::error::Error for CallbackError {}

/// Drives one authorization attempt from URL issue to committed credential
pub struct AuthFlow {
    client: OAuthClient,
    states: StateManager,
    tokens: Arc<TokenManager>,
    events: EventBus,
}

impl AuthFlow {
    pub fn new(
        client: OAuthClient,
        states: StateManager,
        tokens: Arc<TokenManager>,
        events: EventBus,
    ) -> Self {
        Self {
            client,
            states,
            tokens,
            events,
        }
    }

    pub fn states(&self) -> &StateManager {
        &self.states
    }

    /// Register a new attempt and return the provider's authorization URL.
    pub fn begin_authorization(&self) -> String {
        let pkce = Pkce::generate();
        let state = self.states.create_state(&pkce.verifier);
        let url = build_auth_url(self.client.config(), &state, &pkce.challenge);

        info!(pending = self.states.count(), "Authorization URL issued");
        self.events.activity("[OAuth] Generated auth URL");
        url
    }

    /// Consume the attempt for `state`, exchange `code`, and commit the credential.
    ///
    /// Returns the display name to greet the user with.
    pub async fn handle_callback(&self, code: &str, state: &str) -> Result<String, CallbackError> {
        debug!(state = %prefix(state), code = %prefix(code), "OAuth callback received");
        self.events.activity(format!(
            "[OAuth] Callback received. State: {}..., Code: {}...",
            prefix(state),
            prefix(code)
        ));

        let Some(code_verifier) = self.states.consume(state) else {
            warn!(state = %prefix(state), "Invalid or expired OAuth state");
            self.events.activity("[OAuth] Invalid state parameter");
            return Err(CallbackError::InvalidState);
        };

        let tokens = self
            .client
            .exchange_code(code, &code_verifier)
            .await
            .map_err(|e| {
                let err = match e.downcast_ref::<TokenEndpointError>() {
                    Some(rejected) => CallbackError::ExchangeRejected {
                        status: rejected.status,
                        body: rejected.body.clone(),
                    },
                    None => CallbackError::ExchangeFailed(format!("{:#}", e)),
                };
                warn!(error = %err, "Token exchange failed");
                self.events.activity(format!("[OAuth] {}", err));
                err
            })?;

        info!("Token received");
        self.events.activity("[OAuth] Token received successfully!");

        // Identity is best-effort: the tokens are still worth keeping
        let profile = match self.client.fetch_user_profile(&tokens.access_token).await {
            Ok(profile) => {
                self.events.activity(format!(
                    "[OAuth] User: {}",
                    profile.preferred_username.as_deref().unwrap_or("unknown")
                ));
                profile
            }
            Err(e) => {
                warn!(error = %e, "Userinfo fetch failed, continuing without identity");
                UserProfile::default()
            }
        };

        let display_name = display_name_for(&profile);
        let user_info = UserInfo {
            user_id: profile.sub.unwrap_or_default(),
            username: profile.preferred_username.unwrap_or_default(),
            display_name: profile.name.unwrap_or_default(),
        };

        self.tokens.store(
            tokens.access_token,
            tokens.refresh_token,
            tokens.expires_in,
            user_info,
        );

        info!(display_name = %display_name, "OAuth flow completed successfully");
        Ok(display_name)
    }
}

/// `name`, else `preferred_username`, else a generic placeholder
fn display_name_for(profile: &UserProfile) -> String {
    [profile.name.as_deref(), profile.preferred_username.as_deref()]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .unwrap_or(FALLBACK_DISPLAY_NAME)
        .to_string()
}

fn prefix(value: &str) -> &str {
    match value.char_indices().nth(8) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RobloxConfig;
    use mockito::{Matcher, Server};

    fn flow_for(server: &Server) -> (AuthFlow, Arc<TokenManager>) {
        let client = OAuthClient::new(RobloxConfig {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            api_base_url: server.url(),
            ..RobloxConfig::default()
        });
        let events = EventBus::default();
        let tokens = Arc::new(TokenManager::new(client.clone(), events.clone()));
        let flow = AuthFlow::new(client, StateManager::new(600), tokens.clone(), events);
        (flow, tokens)
    }

    fn query_param(url: &str, key: &str) -> String {
        let query = url.split_once('?').unwrap().1;
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap();
        pairs.into_iter().find(|(k, _)| k == key).unwrap().1
    }

    #[test]
    fn test_display_name_preference() {
        let full = UserProfile {
            sub: Some("1".to_string()),
            preferred_username: Some("builderman".to_string()),
            name: Some("Builder Man".to_string()),
        };
        assert_eq!(display_name_for(&full), "Builder Man");

        let username_only = UserProfile {
            preferred_username: Some("builderman".to_string()),
            ..UserProfile::default()
        };
        assert_eq!(display_name_for(&username_only), "builderman");

        assert_eq!(display_name_for(&UserProfile::default()), "User");
    }

    #[test]
    fn test_prefix_truncates() {
        assert_eq!(prefix("abcdefghijkl"), "abcdefgh");
        assert_eq!(prefix("abc"), "abc");
    }

    #[tokio::test]
    async fn test_begin_authorization_registers_attempt() {
        let server = Server::new_async().await;
        let (flow, _) = flow_for(&server);

        let url = flow.begin_authorization();

        assert!(url.starts_with(&format!("{}/oauth/v1/authorize?", server.url())));
        assert_eq!(query_param(&url, "response_type"), "code");
        assert_eq!(query_param(&url, "code_challenge_method"), "S256");
        assert_eq!(flow.states().count(), 1);

        // The state in the URL maps to a verifier whose challenge is in the URL
        let state = query_param(&url, "state");
        let verifier = flow.states().consume(&state).unwrap();
        assert_eq!(
            crate::oauth::pkce::challenge_for(&verifier),
            query_param(&url, "code_challenge")
        );
    }

    #[tokio::test]
    async fn test_callback_with_unknown_state() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/v1/token")
            .expect(0)
            .create_async()
            .await;
        let (flow, tokens) = flow_for(&server);

        let err = flow.handle_callback("code", "forged").await.unwrap_err();

        assert_eq!(err, CallbackError::InvalidState);
        assert!(!tokens.is_connected());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_full_callback_commits_credential() {
        let mut server = Server::new_async().await;
        let (flow, tokens) = flow_for(&server);
        let url = flow.begin_authorization();
        let state = query_param(&url, "state");

        let _token = server
            .mock("POST", "/oauth/v1/token")
            .match_body(Matcher::UrlEncoded("code".into(), "auth-code".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"at","refresh_token":"rt","expires_in":900}"#)
            .create_async()
            .await;
        let _userinfo = server
            .mock("GET", "/oauth/v1/userinfo")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"sub":"42","preferred_username":"builderman","name":"Builder Man"}"#)
            .create_async()
            .await;

        let display_name = flow.handle_callback("auth-code", &state).await.unwrap();

        assert_eq!(display_name, "Builder Man");
        assert_eq!(
            tokens.current_user_info(),
            Some(UserInfo {
                user_id: "42".to_string(),
                username: "builderman".to_string(),
                display_name: "Builder Man".to_string(),
            })
        );
        assert_eq!(tokens.get_valid_access_token().await.as_deref(), Some("at"));

        // Replay of the same state is rejected
        let err = flow.handle_callback("auth-code", &state).await.unwrap_err();
        assert_eq!(err, CallbackError::InvalidState);
    }

    #[tokio::test]
    async fn test_userinfo_failure_is_tolerated() {
        let mut server = Server::new_async().await;
        let (flow, tokens) = flow_for(&server);
        let state = query_param(&flow.begin_authorization(), "state");

        let _token = server
            .mock("POST", "/oauth/v1/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"at","expires_in":900}"#)
            .create_async()
            .await;
        let _userinfo = server
            .mock("GET", "/oauth/v1/userinfo")
            .with_status(500)
            .create_async()
            .await;

        let display_name = flow.handle_callback("code", &state).await.unwrap();

        assert_eq!(display_name, "User");
        assert!(tokens.is_connected());
        assert_eq!(tokens.current_user_info(), Some(UserInfo::default()));
    }

    #[tokio::test]
    async fn test_exchange_rejection() {
        let mut server = Server::new_async().await;
        let (flow, tokens) = flow_for(&server);
        let state = query_param(&flow.begin_authorization(), "state");

        let _token = server
            .mock("POST", "/oauth/v1/token")
            .with_status(400)
            .with_body("invalid_grant")
            .create_async()
            .await;

        let err = flow.handle_callback("code", &state).await.unwrap_err();

        assert_eq!(
            err,
            CallbackError::ExchangeRejected {
                status: 400,
                body: "invalid_grant".to_string()
            }
        );
        assert_eq!(err.to_string(), "Token exchange failed: 400 invalid_grant");
        assert!(!tokens.is_connected());
        // The attempt was consumed even though the exchange failed
        assert_eq!(flow.states().count(), 0);
    }
}
