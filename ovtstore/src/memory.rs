//! In-memory storage stand-in
//!
//! Persistent CRUD is an external collaborator; this implementation exists so
//! tests and examples can drive the resolution core without a database. Write
//! helpers assign child indexes the same way the real storage does: starting
//! at 1, in submission order.

use crate::models::{
    Flow, FlowState, ResponseComponent, SpotifyAccount, TwitchAccount,
};
use crate::traits::Storage;
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    flows: HashMap<i64, Flow>,
    /// flow_id -> states in index order
    states: HashMap<i64, Vec<FlowState>>,
    /// response_id -> components in index order
    components: HashMap<i64, Vec<ResponseComponent>>,
    /// login_id -> linked Spotify accounts
    spotify: HashMap<i64, Vec<SpotifyAccount>>,
    /// login_id -> linked Twitch accounts
    twitch: HashMap<i64, Vec<TwitchAccount>>,
}

/// In-memory [`Storage`] implementation
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a flow
    pub async fn add_flow(&self, flow: Flow) {
        self.inner.write().await.flows.insert(flow.id, flow);
    }

    /// Replace the states of a flow, assigning indexes starting at 1
    pub async fn set_flow_states(&self, flow_id: i64, states: Vec<FlowState>) {
        let mut inner = self.inner.write().await;
        let indexed = states
            .into_iter()
            .enumerate()
            .map(|(i, mut state)| {
                state.index = i as u32 + 1;
                state
            })
            .collect();
        inner.states.insert(flow_id, indexed);
    }

    /// Replace the components of a response, assigning indexes starting at 1
    pub async fn set_response_components(
        &self,
        response_id: i64,
        components: Vec<ResponseComponent>,
    ) {
        let mut inner = self.inner.write().await;
        let indexed = components
            .into_iter()
            .enumerate()
            .map(|(i, mut component)| {
                component.index = i as u32 + 1;
                component
            })
            .collect();
        inner.components.insert(response_id, indexed);
    }

    /// Link a Spotify account to its login
    pub async fn add_spotify_account(&self, account: SpotifyAccount) {
        let mut inner = self.inner.write().await;
        inner
            .spotify
            .entry(account.login_id)
            .or_default()
            .push(account);
    }

    /// Link a Twitch account to its login
    pub async fn add_twitch_account(&self, account: TwitchAccount) {
        let mut inner = self.inner.write().await;
        inner
            .twitch
            .entry(account.login_id)
            .or_default()
            .push(account);
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn get_flow(&self, flow_id: i64) -> Result<Option<Flow>> {
        Ok(self.inner.read().await.flows.get(&flow_id).cloned())
    }

    async fn flow_states(&self, flow_id: i64) -> Result<Vec<FlowState>> {
        Ok(self
            .inner
            .read()
            .await
            .states
            .get(&flow_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn response_components(&self, response_id: i64) -> Result<Vec<ResponseComponent>> {
        Ok(self
            .inner
            .read()
            .await
            .components
            .get(&response_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn spotify_accounts_by_login(&self, login_id: i64) -> Result<Vec<SpotifyAccount>> {
        Ok(self
            .inner
            .read()
            .await
            .spotify
            .get(&login_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn twitch_accounts_by_login(&self, login_id: i64) -> Result<Vec<TwitchAccount>> {
        Ok(self
            .inner
            .read()
            .await
            .twitch
            .get(&login_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn twitch_accounts_by_user(&self, user_id: i64) -> Result<Vec<TwitchAccount>> {
        Ok(self
            .inner
            .read()
            .await
            .twitch
            .values()
            .flatten()
            .filter(|account| account.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_spotify_tokens(
        &self,
        account: &SpotifyAccount,
        access_token: &str,
        refresh_token: &str,
        scopes: &[String],
        validity: DateTime<Utc>,
    ) -> Result<SpotifyAccount> {
        let mut inner = self.inner.write().await;
        let accounts = match inner.spotify.get_mut(&account.login_id) {
            Some(accounts) => accounts,
            None => bail!("no spotify accounts for login {}", account.login_id),
        };
        match accounts.iter_mut().find(|a| a.id == account.id) {
            Some(stored) => {
                stored.access_token = access_token.to_string();
                stored.refresh_token = refresh_token.to_string();
                stored.scopes = scopes.to_vec();
                stored.validity = validity;
                Ok(stored.clone())
            }
            None => bail!("spotify account {} not found", account.id),
        }
    }

    async fn set_twitch_live_by_user(&self, user_id: i64, live: bool) -> Result<usize> {
        let mut inner = self.inner.write().await;
        let mut updated = 0;
        for accounts in inner.twitch.values_mut() {
            for account in accounts.iter_mut().filter(|a| a.user_id == user_id) {
                account.is_live = live;
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConditionKind;

    fn spotify_account(id: i64, login_id: i64) -> SpotifyAccount {
        SpotifyAccount {
            id,
            login_id,
            label: None,
            user_id: format!("user{id}"),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            scopes: vec!["user-read-currently-playing".to_string()],
            validity: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_flow_states_are_indexed_from_one() {
        let store = MemoryStore::new();
        store.add_flow(Flow::new(1, 10, "main")).await;
        store
            .set_flow_states(
                1,
                vec![
                    FlowState::new(1, 1, 10, ConditionKind::Never),
                    FlowState::new(2, 1, 10, ConditionKind::Always),
                ],
            )
            .await;

        let states = store.flow_states(1).await.unwrap();
        assert_eq!(states.len(), 2);
        assert_eq!(states[0].index, 1);
        assert_eq!(states[1].index, 2);
    }

    #[tokio::test]
    async fn test_update_spotify_tokens_replaces_credential_pair() {
        let store = MemoryStore::new();
        let account = spotify_account(5, 10);
        store.add_spotify_account(account.clone()).await;

        let validity = Utc::now();
        let scopes = vec!["user-read-playback-state".to_string()];
        let updated = store
            .update_spotify_tokens(&account, "new-access", "new-refresh", &scopes, validity)
            .await
            .unwrap();

        assert_eq!(updated.access_token, "new-access");
        assert_eq!(updated.refresh_token, "new-refresh");

        let stored = store.spotify_accounts_by_login(10).await.unwrap();
        assert_eq!(stored[0].access_token, "new-access");
        assert_eq!(stored[0].scopes, scopes);
    }

    #[tokio::test]
    async fn test_update_spotify_tokens_unknown_account_fails() {
        let store = MemoryStore::new();
        let account = spotify_account(5, 10);
        let result = store
            .update_spotify_tokens(&account, "a", "r", &[], Utc::now())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_set_twitch_live_by_user() {
        let store = MemoryStore::new();
        store
            .add_twitch_account(TwitchAccount {
                id: 1,
                login_id: 10,
                label: None,
                user_id: 777,
                username: "streamer".to_string(),
                display_name: "Streamer".to_string(),
                is_live: false,
            })
            .await;

        assert_eq!(store.set_twitch_live_by_user(777, true).await.unwrap(), 1);
        let accounts = store.twitch_accounts_by_login(10).await.unwrap();
        assert!(accounts[0].is_live);

        // Untracked broadcaster: nothing to update
        assert_eq!(store.set_twitch_live_by_user(999, true).await.unwrap(), 0);
    }
}
