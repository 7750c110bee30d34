//! OAuth 2.0 authorization-code flow with PKCE for the Roblox account link.
//!
//! 1. Frontend calls GET /roblox/authorize (or POST /connect)
//! 2. User authorizes on roblox.com
//! 3. Roblox redirects to /roblox/callback?code&state
//! 4. Code + PKCE verifier exchanged for tokens, identity fetched
//! 5. Credential committed into the [`TokenManager`](crate::credentials::TokenManager)

mod exchange;
mod flow;
pub mod pkce;
mod provider;
mod state_manager;

pub use exchange::{OAuthClient, TokenEndpointError, TokenResponse, UserProfile};
pub use flow::{AuthFlow, CallbackError};
pub use pkce::Pkce;
pub use provider::build_auth_url;
pub use state_manager::{run_state_cleanup, AuthorizationAttempt, StateManager};
