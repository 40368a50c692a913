//! Live-status provider backed by the storage collaborator
//!
//! The live flag itself is maintained by webhook ingestion (see
//! [`crate::webhook`]); this provider only reads it back for condition
//! evaluation.

use async_trait::async_trait;
use ovtstore::{LiveStatus, Storage};
use std::sync::Arc;
use tracing::warn;

/// Reads the externally maintained "is live" fact for a linked account
pub struct TwitchLiveStatus {
    store: Arc<dyn Storage>,
}

impl TwitchLiveStatus {
    /// Create a provider reading through the given storage collaborator
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl LiveStatus for TwitchLiveStatus {
    async fn is_live(&self, login_id: i64, account_id: i64) -> bool {
        let accounts = match self.store.twitch_accounts_by_login(login_id).await {
            Ok(accounts) => accounts,
            Err(e) => {
                warn!("twitch account lookup failed for login {}: {}", login_id, e);
                return false;
            }
        };

        accounts
            .iter()
            .find(|account| account.id == account_id)
            .map(|account| account.is_live)
            .unwrap_or(false)
    }
}
