//! Collaborator traits consumed by the resolution core
//!
//! The core talks to its externals exclusively through these seams, which
//! keeps every provider mockable in tests (counting probes, scripted fakes).

use crate::models::{
    Flow, FlowState, NowPlaying, ResponseComponent, SpotifyAccount, TwitchAccount,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Persistent CRUD collaborator
///
/// Implementations live outside the resolution core; [`crate::MemoryStore`]
/// is the in-memory stand-in used by tests and examples. Child lists are
/// always returned in assigned index order.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch a flow by id
    async fn get_flow(&self, flow_id: i64) -> Result<Option<Flow>>;

    /// Fetch the states of a flow, in index order
    async fn flow_states(&self, flow_id: i64) -> Result<Vec<FlowState>>;

    /// Fetch the components of a response, in index order
    async fn response_components(&self, response_id: i64) -> Result<Vec<ResponseComponent>>;

    /// Fetch the Spotify accounts linked to a login
    async fn spotify_accounts_by_login(&self, login_id: i64) -> Result<Vec<SpotifyAccount>>;

    /// Fetch the Twitch accounts linked to a login
    async fn twitch_accounts_by_login(&self, login_id: i64) -> Result<Vec<TwitchAccount>>;

    /// Fetch the Twitch accounts tracking a broadcaster user id
    async fn twitch_accounts_by_user(&self, user_id: i64) -> Result<Vec<TwitchAccount>>;

    /// Persist a refreshed Spotify credential pair and return the updated
    /// account
    async fn update_spotify_tokens(
        &self,
        account: &SpotifyAccount,
        access_token: &str,
        refresh_token: &str,
        scopes: &[String],
        validity: DateTime<Utc>,
    ) -> Result<SpotifyAccount>;

    /// Set the live flag for every account tracking a broadcaster user id,
    /// returning how many accounts were updated
    async fn set_twitch_live_by_user(&self, user_id: i64, live: bool) -> Result<usize>;
}

/// The externally maintained "is live" fact
///
/// Backing an unauthenticated public endpoint, implementations never raise:
/// any failure reads as "not live".
#[async_trait]
pub trait LiveStatus: Send + Sync {
    /// Whether the given linked account is currently live
    async fn is_live(&self, login_id: i64, account_id: i64) -> bool;
}

/// The currently-playing track resolver
#[async_trait]
pub trait NowPlayingSource: Send + Sync {
    /// Resolve the currently playing track for a linked account
    ///
    /// Never raises: every internal failure yields absence.
    async fn now_playing(&self, login_id: i64, account_id: i64) -> Option<NowPlaying>;

    /// Bound the remaining cache life of an account's now-playing value
    ///
    /// Called once per touched account after a render, so that a second
    /// render moments later reuses the already-fetched value before it
    /// naturally expires.
    async fn release(&self, account_id: i64, grace: Duration);
}
