//! Public resolution service
//!
//! [`Resolver`] is the single entry point of the core:
//! `resolve(flow_id)` always returns text (possibly empty) and never raises.
//! It owns the cache instances, hands them to the now-playing provider at
//! construction, and wires the evaluator and compositor together.

use crate::compose::{ResponseCompositor, DEFAULT_RELEASE_GRACE};
use crate::evaluator::FlowEvaluator;
use ovtcache::TtlCache;
use ovtspotify::{NowPlayingProvider, SpotifyApi, DEFAULT_ACCOUNTS_TTL, DEFAULT_NOW_PLAYING_TTL};
use ovtstore::{LiveStatus, NowPlayingSource, Storage};
use ovttwitch::TwitchLiveStatus;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Resolves a flow into its display text
pub struct Resolver {
    store: Arc<dyn Storage>,
    evaluator: FlowEvaluator,
    compositor: ResponseCompositor,
}

impl Resolver {
    /// Create a resolver over the production providers
    ///
    /// Builds the TTL caches, the now-playing provider and the Twitch
    /// live-status provider with default settings. Use [`Resolver::builder`]
    /// to override the tuned TTL constants.
    pub fn new(store: Arc<dyn Storage>, api: Arc<dyn SpotifyApi>) -> Self {
        Self::builder(store, api).build()
    }

    /// Create a builder for configuring the resolver
    pub fn builder(store: Arc<dyn Storage>, api: Arc<dyn SpotifyApi>) -> ResolverBuilder {
        ResolverBuilder::new(store, api)
    }

    /// Create a resolver over explicit provider instances
    ///
    /// This is the seam tests use to substitute counting probes and scripted
    /// fakes for the live-status and now-playing providers.
    pub fn with_providers(
        store: Arc<dyn Storage>,
        live: Arc<dyn LiveStatus>,
        now_playing: Arc<dyn NowPlayingSource>,
    ) -> Self {
        Self {
            store: store.clone(),
            evaluator: FlowEvaluator::new(live),
            compositor: ResponseCompositor::new(store, now_playing),
        }
    }

    /// Override the post-render release grace
    pub fn with_release_grace(mut self, grace: Duration) -> Self {
        self.compositor = self.compositor.with_release_grace(grace);
        self
    }

    /// Resolve a flow into display text
    ///
    /// Always returns (possibly empty) text: a missing or disabled flow, an
    /// unmatched state list, a storage failure or any provider failure all
    /// degrade to a shorter or empty string.
    pub async fn resolve(&self, flow_id: i64) -> String {
        let flow = match self.store.get_flow(flow_id).await {
            Ok(Some(flow)) => flow,
            Ok(None) => {
                debug!("flow {} not found", flow_id);
                return String::new();
            }
            Err(e) => {
                warn!("flow lookup failed for {}: {}", flow_id, e);
                return String::new();
            }
        };
        if !flow.enabled {
            debug!("flow {} is disabled", flow_id);
            return String::new();
        }

        let mut states = match self.store.flow_states(flow.id).await {
            Ok(states) => states,
            Err(e) => {
                warn!("state lookup failed for flow {}: {}", flow_id, e);
                return String::new();
            }
        };
        states.sort_by_key(|state| state.index);

        let active = match self.evaluator.first_active_state(&states).await {
            Some(active) => active,
            None => {
                debug!("flow {} has no active state", flow_id);
                return String::new();
            }
        };

        self.compositor.compose(active.login_id, active.response_id).await
    }
}

/// Builder wiring the production provider stack
///
/// The cache instances are created here and passed into the provider
/// explicitly; nothing in the stack owns ambient global state.
pub struct ResolverBuilder {
    store: Arc<dyn Storage>,
    api: Arc<dyn SpotifyApi>,
    now_playing_ttl: Duration,
    accounts_ttl: Duration,
    release_grace: Duration,
}

impl ResolverBuilder {
    /// Create a builder with the default tuned TTL constants
    pub fn new(store: Arc<dyn Storage>, api: Arc<dyn SpotifyApi>) -> Self {
        Self {
            store,
            api,
            now_playing_ttl: DEFAULT_NOW_PLAYING_TTL,
            accounts_ttl: DEFAULT_ACCOUNTS_TTL,
            release_grace: DEFAULT_RELEASE_GRACE,
        }
    }

    /// Override the now-playing value TTL
    pub fn now_playing_ttl(mut self, ttl: Duration) -> Self {
        self.now_playing_ttl = ttl;
        self
    }

    /// Override the account-list TTL
    pub fn accounts_ttl(mut self, ttl: Duration) -> Self {
        self.accounts_ttl = ttl;
        self
    }

    /// Override the post-render release grace
    pub fn release_grace(mut self, grace: Duration) -> Self {
        self.release_grace = grace;
        self
    }

    /// Build the resolver and its provider stack
    pub fn build(self) -> Resolver {
        let now_playing_cache = Arc::new(TtlCache::new());
        let accounts_cache = Arc::new(TtlCache::new());

        let now_playing = Arc::new(
            NowPlayingProvider::new(
                self.api,
                self.store.clone(),
                now_playing_cache,
                accounts_cache,
            )
            .with_ttls(self.now_playing_ttl, self.accounts_ttl),
        );
        let live = Arc::new(TwitchLiveStatus::new(self.store.clone()));

        Resolver::with_providers(self.store, live, now_playing)
            .with_release_grace(self.release_grace)
    }
}
