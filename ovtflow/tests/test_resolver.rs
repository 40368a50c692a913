use async_trait::async_trait;
use ovtflow::Resolver;
use ovtspotify::{PlayingStatus, RefreshedTokens, SpotifyApi};
use ovtstore::{
    ConditionKind, Flow, FlowState, LiveStatus, MemoryStore, NowPlaying, NowPlayingSource,
    ResponseComponent,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const FLOW_ID: i64 = 1;
const LOGIN_ID: i64 = 10;

/// Live-status probe counting every evaluation
#[derive(Default)]
struct CountingLive {
    live: HashMap<(i64, i64), bool>,
    calls: AtomicUsize,
}

impl CountingLive {
    fn with_live(mut self, login_id: i64, account_id: i64) -> Self {
        self.live.insert((login_id, account_id), true);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LiveStatus for CountingLive {
    async fn is_live(&self, login_id: i64, account_id: i64) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.live.get(&(login_id, account_id)).unwrap_or(&false)
    }
}

/// Now-playing fake answering from a fixed table and recording releases
#[derive(Default)]
struct FakeNowPlaying {
    playing: HashMap<i64, NowPlaying>,
    releases: Mutex<Vec<(i64, Duration)>>,
}

impl FakeNowPlaying {
    fn with_track(mut self, account_id: i64, title: &str, artists: &[&str]) -> Self {
        self.playing.insert(
            account_id,
            NowPlaying::new(title, artists.iter().map(|a| a.to_string()).collect()),
        );
        self
    }

    fn releases(&self) -> Vec<(i64, Duration)> {
        self.releases.lock().unwrap().clone()
    }
}

#[async_trait]
impl NowPlayingSource for FakeNowPlaying {
    async fn now_playing(&self, _login_id: i64, account_id: i64) -> Option<NowPlaying> {
        self.playing.get(&account_id).cloned()
    }

    async fn release(&self, account_id: i64, grace: Duration) {
        self.releases.lock().unwrap().push((account_id, grace));
    }
}

struct Fixture {
    store: Arc<MemoryStore>,
    live: Arc<CountingLive>,
    now_playing: Arc<FakeNowPlaying>,
    resolver: Resolver,
}

async fn fixture(live: CountingLive, now_playing: FakeNowPlaying) -> Fixture {
    let store = Arc::new(MemoryStore::new());
    store.add_flow(Flow::new(FLOW_ID, LOGIN_ID, "overlay")).await;

    let live = Arc::new(live);
    let now_playing = Arc::new(now_playing);
    let resolver = Resolver::with_providers(store.clone(), live.clone(), now_playing.clone());

    Fixture {
        store,
        live,
        now_playing,
        resolver,
    }
}

fn always(id: i64) -> FlowState {
    FlowState::new(id, FLOW_ID, LOGIN_ID, ConditionKind::Always)
}

fn twitch_live(id: i64, twitch_id: i64) -> FlowState {
    FlowState::new(id, FLOW_ID, LOGIN_ID, ConditionKind::TwitchLive)
        .with_variable("twitch_id", twitch_id)
}

fn never(id: i64) -> FlowState {
    FlowState::new(id, FLOW_ID, LOGIN_ID, ConditionKind::Never)
}

#[tokio::test]
async fn test_flow_with_no_satisfied_state_resolves_empty() {
    let f = fixture(CountingLive::default(), FakeNowPlaying::default()).await;
    f.store
        .set_flow_states(FLOW_ID, vec![never(1), twitch_live(2, 1)])
        .await;

    assert_eq!(f.resolver.resolve(FLOW_ID).await, "");
}

#[tokio::test]
async fn test_first_matching_state_wins_and_later_states_are_not_evaluated() {
    let live = CountingLive::default()
        .with_live(LOGIN_ID, 1)
        .with_live(LOGIN_ID, 2);
    let f = fixture(live, FakeNowPlaying::default()).await;

    f.store
        .set_response_components(
            100,
            vec![ResponseComponent::text(1, 100, LOGIN_ID, "first")],
        )
        .await;
    f.store
        .set_response_components(
            200,
            vec![ResponseComponent::text(2, 200, LOGIN_ID, "second")],
        )
        .await;
    f.store
        .set_flow_states(
            FLOW_ID,
            vec![
                twitch_live(1, 1).with_response(100),
                twitch_live(2, 2).with_response(200),
            ],
        )
        .await;

    assert_eq!(f.resolver.resolve(FLOW_ID).await, "first");
    // The second state was never evaluated
    assert_eq!(f.live.calls(), 1);
}

#[tokio::test]
async fn test_always_selects_without_probing_live_status() {
    let f = fixture(CountingLive::default(), FakeNowPlaying::default()).await;
    f.store
        .set_response_components(100, vec![ResponseComponent::text(1, 100, LOGIN_ID, "on")])
        .await;
    f.store
        .set_flow_states(
            FLOW_ID,
            vec![always(1).with_response(100), twitch_live(2, 1).with_response(100)],
        )
        .await;

    assert_eq!(f.resolver.resolve(FLOW_ID).await, "on");
    assert_eq!(f.live.calls(), 0);
}

#[tokio::test]
async fn test_never_is_skipped_regardless_of_parameters() {
    let live = CountingLive::default().with_live(LOGIN_ID, 1);
    let f = fixture(live, FakeNowPlaying::default()).await;

    f.store
        .set_response_components(100, vec![ResponseComponent::text(1, 100, LOGIN_ID, "skip")])
        .await;
    f.store
        .set_response_components(200, vec![ResponseComponent::text(2, 200, LOGIN_ID, "taken")])
        .await;
    // The Never state carries parameters that would satisfy TwitchLive
    f.store
        .set_flow_states(
            FLOW_ID,
            vec![
                never(1).with_variable("twitch_id", 1).with_response(100),
                always(2).with_response(200),
            ],
        )
        .await;

    assert_eq!(f.resolver.resolve(FLOW_ID).await, "taken");
    assert_eq!(f.live.calls(), 0);
}

#[tokio::test]
async fn test_malformed_live_condition_fails_open() {
    let f = fixture(CountingLive::default(), FakeNowPlaying::default()).await;

    f.store
        .set_response_components(100, vec![ResponseComponent::text(1, 100, LOGIN_ID, "ok")])
        .await;
    // Missing twitch_id, then a non-integer one: both read as false without
    // ever reaching the provider
    let missing = FlowState::new(1, FLOW_ID, LOGIN_ID, ConditionKind::TwitchLive);
    let non_integer = FlowState::new(2, FLOW_ID, LOGIN_ID, ConditionKind::TwitchLive)
        .with_variable("twitch_id", "42");
    f.store
        .set_flow_states(
            FLOW_ID,
            vec![missing, non_integer, always(3).with_response(100)],
        )
        .await;

    assert_eq!(f.resolver.resolve(FLOW_ID).await, "ok");
    assert_eq!(f.live.calls(), 0);
}

#[tokio::test]
async fn test_active_state_without_response_composes_empty() {
    let f = fixture(CountingLive::default(), FakeNowPlaying::default()).await;
    f.store.set_flow_states(FLOW_ID, vec![always(1)]).await;

    assert_eq!(f.resolver.resolve(FLOW_ID).await, "");
}

#[tokio::test]
async fn test_disabled_flow_resolves_empty() {
    let f = fixture(CountingLive::default(), FakeNowPlaying::default()).await;
    let mut flow = Flow::new(FLOW_ID, LOGIN_ID, "overlay");
    flow.enabled = false;
    f.store.add_flow(flow).await;
    f.store
        .set_response_components(100, vec![ResponseComponent::text(1, 100, LOGIN_ID, "on")])
        .await;
    f.store
        .set_flow_states(FLOW_ID, vec![always(1).with_response(100)])
        .await;

    assert_eq!(f.resolver.resolve(FLOW_ID).await, "");
}

#[tokio::test]
async fn test_missing_flow_resolves_empty() {
    let f = fixture(CountingLive::default(), FakeNowPlaying::default()).await;
    assert_eq!(f.resolver.resolve(999).await, "");
}

#[tokio::test]
async fn test_provider_miss_contributes_empty_not_an_error() {
    let f = fixture(CountingLive::default(), FakeNowPlaying::default()).await;

    f.store
        .set_response_components(
            100,
            vec![
                ResponseComponent::text(1, 100, LOGIN_ID, "hello "),
                ResponseComponent::current_song(2, 100, LOGIN_ID, 5),
            ],
        )
        .await;
    f.store
        .set_flow_states(FLOW_ID, vec![always(1).with_response(100)])
        .await;

    assert_eq!(f.resolver.resolve(FLOW_ID).await, "hello ");
    // The missed account was still touched, so it still gets its release
    assert_eq!(f.now_playing.releases().len(), 1);
}

#[tokio::test]
async fn test_bad_account_parameter_only_silences_that_fragment() {
    let now_playing = FakeNowPlaying::default().with_track(5, "Witchcraft", &["Pendulum"]);
    let f = fixture(CountingLive::default(), now_playing).await;

    f.store
        .set_response_components(
            100,
            vec![
                ResponseComponent::new(1, 100, LOGIN_ID, ovtstore::ComponentKind::CurrentSong)
                    .with_variable("spotify_id", "not-a-number"),
                ResponseComponent::text(2, 100, LOGIN_ID, "♪ "),
                ResponseComponent::current_song(3, 100, LOGIN_ID, 5),
            ],
        )
        .await;
    f.store
        .set_flow_states(FLOW_ID, vec![always(1).with_response(100)])
        .await;

    assert_eq!(f.resolver.resolve(FLOW_ID).await, "♪ Witchcraft");
    // Only the well-formed fragment touched an account
    assert_eq!(f.now_playing.releases().len(), 1);
}

#[tokio::test]
async fn test_artist_joining_rules() {
    let now_playing = FakeNowPlaying::default()
        .with_track(1, "T1", &["A"])
        .with_track(2, "T2", &["A", "B"])
        .with_track(3, "T3", &["A", "B", "C"]);
    let f = fixture(CountingLive::default(), now_playing).await;

    f.store
        .set_response_components(
            100,
            vec![
                ResponseComponent::current_artist(1, 100, LOGIN_ID, 1),
                ResponseComponent::text(2, 100, LOGIN_ID, " / "),
                ResponseComponent::current_artist(3, 100, LOGIN_ID, 2),
                ResponseComponent::text(4, 100, LOGIN_ID, " / "),
                ResponseComponent::current_artist(5, 100, LOGIN_ID, 3),
            ],
        )
        .await;
    f.store
        .set_flow_states(FLOW_ID, vec![always(1).with_response(100)])
        .await;

    assert_eq!(f.resolver.resolve(FLOW_ID).await, "A / A & B / A, B & C");
}

#[tokio::test]
async fn test_fragments_append_in_assigned_order() {
    let now_playing = FakeNowPlaying::default().with_track(5, "Track", &["Artist"]);
    let f = fixture(CountingLive::default(), now_playing).await;

    f.store
        .set_response_components(
            100,
            vec![
                ResponseComponent::text(1, 100, LOGIN_ID, "now: "),
                ResponseComponent::current_song(2, 100, LOGIN_ID, 5),
                ResponseComponent::text(3, 100, LOGIN_ID, " by "),
                ResponseComponent::current_artist(4, 100, LOGIN_ID, 5),
            ],
        )
        .await;
    f.store
        .set_flow_states(FLOW_ID, vec![always(1).with_response(100)])
        .await;

    assert_eq!(f.resolver.resolve(FLOW_ID).await, "now: Track by Artist");
}

#[tokio::test]
async fn test_one_release_per_distinct_touched_account() {
    let now_playing = FakeNowPlaying::default()
        .with_track(5, "T5", &["A"])
        .with_track(6, "T6", &["B"]);
    let grace = Duration::from_millis(250);
    let f = fixture(CountingLive::default(), now_playing).await;
    let resolver = Resolver::with_providers(
        f.store.clone(),
        f.live.clone(),
        f.now_playing.clone(),
    )
    .with_release_grace(grace);

    f.store
        .set_response_components(
            100,
            vec![
                ResponseComponent::current_song(1, 100, LOGIN_ID, 5),
                ResponseComponent::current_artist(2, 100, LOGIN_ID, 5),
                ResponseComponent::current_song(3, 100, LOGIN_ID, 6),
            ],
        )
        .await;
    f.store
        .set_flow_states(FLOW_ID, vec![always(1).with_response(100)])
        .await;

    resolver.resolve(FLOW_ID).await;
    assert_eq!(f.now_playing.releases(), vec![(5, grace), (6, grace)]);
}

/// End-to-end wiring through the production builder, with a scripted upstream
mod builder_wiring {
    use super::*;
    use chrono::Utc;
    use ovtstore::SpotifyAccount;

    struct StaticApi;

    #[async_trait]
    impl SpotifyApi for StaticApi {
        async fn currently_playing(
            &self,
            _access_token: &str,
        ) -> ovtspotify::Result<PlayingStatus> {
            Ok(PlayingStatus::Playing(NowPlaying::new(
                "Witchcraft",
                vec!["Pendulum".to_string()],
            )))
        }

        async fn refresh_tokens(
            &self,
            _refresh_token: &str,
        ) -> ovtspotify::Result<RefreshedTokens> {
            Err(ovtspotify::Error::malformed_token("not scripted"))
        }
    }

    #[tokio::test]
    async fn test_builder_stack_resolves_through_provider() {
        let store = Arc::new(MemoryStore::new());
        store.add_flow(Flow::new(FLOW_ID, LOGIN_ID, "overlay")).await;
        store
            .add_spotify_account(SpotifyAccount {
                id: 5,
                login_id: LOGIN_ID,
                label: None,
                user_id: "spotify-user".to_string(),
                access_token: "access".to_string(),
                refresh_token: "refresh".to_string(),
                scopes: vec![],
                validity: Utc::now(),
            })
            .await;
        store
            .set_response_components(
                100,
                vec![
                    ResponseComponent::text(1, 100, LOGIN_ID, "now: "),
                    ResponseComponent::current_song(2, 100, LOGIN_ID, 5),
                ],
            )
            .await;
        store
            .set_flow_states(
                FLOW_ID,
                vec![FlowState::new(1, FLOW_ID, LOGIN_ID, ConditionKind::Always)
                    .with_response(100)],
            )
            .await;

        let resolver = Resolver::builder(store, Arc::new(StaticApi))
            .release_grace(Duration::from_millis(50))
            .build();

        assert_eq!(resolver.resolve(FLOW_ID).await, "now: Witchcraft");
    }
}
