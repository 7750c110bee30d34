// Configuration (TOML file + environment overrides)
pub mod config;

// Connection and activity events for external observers
pub mod events;

// Roblox OAuth 2.0 authorization-code flow with PKCE
pub mod oauth;

// Roblox credential and token lifecycle
pub mod credentials;

// Model upload and operation polling
pub mod upload;

// HTTP API for the frontend
pub mod api;

#[cfg(test)]
mod test_support;
