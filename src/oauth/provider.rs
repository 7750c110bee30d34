//! Authorization URL construction.

use crate::config::RobloxConfig;

/// Build the provider's authorization URL for one attempt
pub fn build_auth_url(config: &RobloxConfig, state: &str, code_challenge: &str) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&scope={}&response_type=code&state={}&code_challenge={}&code_challenge_method=S256",
        config.authorize_url(),
        urlencoding::encode(&config.client_id),
        urlencoding::encode(&config.redirect_uri),
        urlencoding::encode(&config.scopes),
        urlencoding::encode(state),
        urlencoding::encode(code_challenge)
    )
}
