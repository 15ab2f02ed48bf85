use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// The unique id embedded in an issued session token (not the token itself).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Process-wide set of revoked session token ids.
///
/// Cloning shares the underlying set, so one registry is created at startup
/// and handed to whoever authenticates requests. Entries revoked with an
/// expiry can be pruned once that expiry has passed, since the token can no
/// longer be presented; entries revoked without one stay for the life of the
/// process.
#[derive(Debug, Default, Clone)]
pub struct TokenRevocationRegistry {
    revoked: Arc<RwLock<HashMap<TokenId, Option<DateTime<Utc>>>>>,
}

impl TokenRevocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent.
    pub async fn revoke(&self, token_id: TokenId) {
        let mut revoked = self.revoked.write().await;
        debug!(token = %token_id, "revoking session token");
        // A permanent revocation wins over an earlier one with an expiry.
        revoked.insert(token_id, None);
    }

    /// Revokes `token_id` until its own expiry.
    pub async fn revoke_until(&self, token_id: TokenId, expires_at: DateTime<Utc>) {
        let mut revoked = self.revoked.write().await;
        match revoked.get(&token_id) {
            Some(None) => {}
            Some(Some(existing)) if *existing >= expires_at => {}
            _ => {
                revoked.insert(token_id, Some(expires_at));
            }
        }
    }

    pub async fn is_revoked(&self, token_id: &TokenId) -> bool {
        self.revoked.read().await.contains_key(token_id)
    }

    /// Drops entries whose token expired before `now`. Returns how many went.
    pub async fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let mut revoked = self.revoked.write().await;
        let before = revoked.len();
        revoked.retain(|_, expires_at| expires_at.is_none_or(|at| at > now));
        let pruned = before - revoked.len();
        if pruned > 0 {
            info!(pruned, "pruned expired token revocations");
        }
        pruned
    }

    pub async fn len(&self) -> usize {
        self.revoked.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.revoked.read().await.is_empty()
    }
}
