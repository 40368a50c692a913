//! Spotify client and now-playing provider for OVTForm
//!
//! This crate provides everything the resolution core needs from the music
//! service side:
//!
//! - **Client**: the currently-playing fetch (bearer authorization) and the
//!   refresh-token exchange (basic-authenticated client credentials)
//! - **Boundary validation**: upstream payloads converted into explicit
//!   tagged results before any field is trusted
//! - **Provider**: the cache-backed resolution sequence with its bounded
//!   one-shot refresh retry
//!
//! # Example
//!
//! ```no_run
//! use ovtcache::TtlCache;
//! use ovtspotify::{NowPlayingProvider, SpotifyClient};
//! use ovtstore::{MemoryStore, NowPlayingSource};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Arc::new(SpotifyClient::new("client-id", "client-secret")?);
//!     let store = Arc::new(MemoryStore::new());
//!
//!     let provider = NowPlayingProvider::new(
//!         client,
//!         store,
//!         Arc::new(TtlCache::new()),
//!         Arc::new(TtlCache::new()),
//!     );
//!
//!     if let Some(playing) = provider.now_playing(1, 1).await {
//!         println!("{} - {}", playing.title, playing.artists.join(", "));
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod models;
pub mod provider;

// Re-exports
pub use client::{ClientBuilder, SpotifyApi, SpotifyClient};
pub use error::{Error, Result};
pub use models::{PlayingStatus, RefreshedTokens};
pub use provider::{NowPlayingProvider, DEFAULT_ACCOUNTS_TTL, DEFAULT_NOW_PLAYING_TTL};
