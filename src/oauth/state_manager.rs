//! Pending authorization attempts, keyed by the OAuth `state` parameter.
//!
//! Each attempt carries the PKCE verifier that the callback needs for the
//! token exchange. Attempts are single-use and expire after a fixed TTL.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Random bytes behind each state token
const STATE_BYTES: usize = 32;

/// One in-flight authorization attempt
#[derive(Clone, Debug)]
pub struct AuthorizationAttempt {
    pub code_verifier: String,
    pub created_at: DateTime<Utc>,
}

/// Authorization state store with automatic expiration
#[derive(Clone)]
pub struct StateManager {
    states: Arc<Mutex<HashMap<String, AuthorizationAttempt>>>,
    expiry_duration: Duration,
}

impl StateManager {
    /// Create a new state manager
    ///
    /// # Arguments
    /// * `expiry_seconds` - How long attempts remain valid (default: 600 = 10 minutes)
    pub fn new(expiry_seconds: i64) -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
            expiry_duration: Duration::seconds(expiry_seconds),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, AuthorizationAttempt>> {
        // The map holds no invariants a panicking holder could break
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new attempt for `code_verifier` and return its state token.
    ///
    /// Expired attempts are swept before the insert.
    pub fn create_state(&self, code_verifier: &str) -> String {
        let mut bytes = [0u8; STATE_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let state = URL_SAFE_NO_PAD.encode(bytes);

        let attempt = AuthorizationAttempt {
            code_verifier: code_verifier.to_string(),
            created_at: Utc::now(),
        };

        let mut states = self.lock();
        Self::retain_fresh(&mut states, self.expiry_duration);
        states.insert(state.clone(), attempt);

        state
    }

    /// Remove and return the verifier for `state`.
    ///
    /// Returns None for unknown, already consumed, or expired states.
    pub fn consume(&self, state: &str) -> Option<String> {
        let entry = self.lock().remove(state)?;

        if Utc::now() - entry.created_at > self.expiry_duration {
            return None;
        }

        Some(entry.code_verifier)
    }

    /// Clean up expired attempts (should be called periodically)
    pub fn cleanup_expired(&self) {
        Self::retain_fresh(&mut self.lock(), self.expiry_duration);
    }

    fn retain_fresh(states: &mut HashMap<String, AuthorizationAttempt>, ttl: Duration) {
        let now = Utc::now();
        states.retain(|_, entry| now - entry.created_at <= ttl);
    }

    /// Get count of pending attempts (for debugging/monitoring)
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    #[cfg(test)]
    fn backdate(&self, state: &str, age: Duration) {
        if let Some(entry) = self.lock().get_mut(state) {
            entry.created_at = entry.created_at - age;
        }
    }
}

/// Background task to periodically clean up expired attempts
pub async fn run_state_cleanup(manager: StateManager, interval_seconds: u64) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_seconds));

    loop {
        interval.tick().await;
        manager.cleanup_expired();
        tracing::debug!(
            "OAuth state cleanup complete, {} attempts pending",
            manager.count()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_consume_state() {
        let manager = StateManager::new(600);

        let state = manager.create_state("verifier-1");
        assert!(state.len() >= 43); // 32 bytes base64url

        assert_eq!(manager.consume(&state), Some("verifier-1".to_string()));
    }

    #[test]
    fn test_state_is_single_use() {
        let manager = StateManager::new(600);

        let state = manager.create_state("verifier-2");

        assert!(manager.consume(&state).is_some());
        assert!(manager.consume(&state).is_none());
    }

    #[test]
    fn test_unknown_state_rejected() {
        let manager = StateManager::new(600);
        assert!(manager.consume("forged_state").is_none());
    }

    #[test]
    fn test_states_are_unique() {
        let manager = StateManager::new(600);
        let a = manager.create_state("v");
        let b = manager.create_state("v");
        assert_ne!(a, b);
        assert_eq!(manager.count(), 2);
    }

    #[test]
    fn test_expired_state_rejected() {
        let manager = StateManager::new(600);

        let state = manager.create_state("verifier-3");
        manager.backdate(&state, Duration::minutes(11));

        assert!(manager.consume(&state).is_none());
        assert_eq!(manager.count(), 0);
    }

    #[test]
    fn test_cleanup_removes_expired() {
        let manager = StateManager::new(600);

        let old = manager.create_state("old");
        let fresh = manager.create_state("fresh");
        manager.backdate(&old, Duration::minutes(11));

        manager.cleanup_expired();

        assert_eq!(manager.count(), 1);
        assert!(manager.consume(&old).is_none());
        assert_eq!(manager.consume(&fresh), Some("fresh".to_string()));
    }

    #[test]
    fn test_create_sweeps_expired() {
        let manager = StateManager::new(600);

        let old = manager.create_state("old");
        manager.backdate(&old, Duration::minutes(10) + Duration::seconds(1));

        manager.create_state("new");
        assert_eq!(manager.count(), 1);
    }
}
