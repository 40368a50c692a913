//! HTTP client for the Spotify Web API
//!
//! This module provides the two upstream calls the resolution core needs:
//! the currently-playing fetch (bearer authorization) and the refresh-token
//! exchange (basic-authenticated client credentials, form body).
//!
//! # Example
//!
//! ```no_run
//! use ovtspotify::{SpotifyApi, SpotifyClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SpotifyClient::new("client-id", "client-secret")?;
//!
//!     let status = client.currently_playing("access-token").await?;
//!     println!("{:?}", status);
//!
//!     Ok(())
//! }
//! ```

use crate::error::Result;
use crate::models::{self, PlayingStatus, RefreshedTokens};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

/// Default Web API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com";

/// Default accounts-service base URL (token endpoint)
pub const DEFAULT_ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";

/// Default timeout for HTTP requests (30 seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = "OVTForm/0.1.0 (ovtspotify)";

/// Currently-playing endpoint path
const CURRENTLY_PLAYING_PATH: &str = "/v1/me/player/currently-playing";

/// Token endpoint path
const TOKEN_PATH: &str = "/api/token";

/// The upstream seam the now-playing provider talks through
///
/// [`SpotifyClient`] is the production implementation; tests substitute
/// scripted fakes to drive the refresh protocol without a network.
#[async_trait]
pub trait SpotifyApi: Send + Sync {
    /// Fetch the currently playing track under the given access token
    async fn currently_playing(&self, access_token: &str) -> Result<PlayingStatus>;

    /// Exchange a refresh token for a new credential pair
    async fn refresh_tokens(&self, refresh_token: &str) -> Result<RefreshedTokens>;
}

/// Spotify HTTP client
///
/// The client is stateless and does not cache responses internally; caching
/// is handled by the now-playing provider on top of it.
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    client: Client,
    api_base_url: String,
    accounts_base_url: String,
    /// Base64-encoded `client_id:client_secret` for the token endpoint
    client_basic: String,
    timeout: Duration,
}

impl SpotifyClient {
    /// Create a client with default settings for the given application
    /// credentials
    pub fn new(client_id: &str, client_secret: &str) -> Result<Self> {
        Self::builder(client_id, client_secret).build()
    }

    /// Create a builder for configuring the client
    pub fn builder(client_id: &str, client_secret: &str) -> ClientBuilder {
        ClientBuilder::new(client_id, client_secret)
    }

    /// Get the Web API base URL
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// Get the accounts-service base URL
    pub fn accounts_base_url(&self) -> &str {
        &self.accounts_base_url
    }
}

#[async_trait]
impl SpotifyApi for SpotifyClient {
    async fn currently_playing(&self, access_token: &str) -> Result<PlayingStatus> {
        let url = format!("{}{}", self.api_base_url, CURRENTLY_PLAYING_PATH);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!("currently-playing answered {}", status);

        Ok(models::parse_currently_playing(status, &body))
    }

    async fn refresh_tokens(&self, refresh_token: &str) -> Result<RefreshedTokens> {
        let url = format!("{}{}", self.accounts_base_url, TOKEN_PATH);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Basic {}", self.client_basic))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("token endpoint answered {}: {}", status, body);
            return Err(crate::error::Error::TokenEndpoint(status.as_u16()));
        }

        models::parse_refreshed_tokens(&body, Utc::now())
    }
}

/// Builder for [`SpotifyClient`]
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    api_base_url: String,
    accounts_base_url: String,
    client_basic: String,
    timeout: Duration,
}

impl ClientBuilder {
    /// Create a builder with default endpoints
    pub fn new(client_id: &str, client_secret: &str) -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            accounts_base_url: DEFAULT_ACCOUNTS_BASE_URL.to_string(),
            client_basic: BASE64.encode(format!("{client_id}:{client_secret}")),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Override the Web API base URL
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Override the accounts-service base URL
    pub fn accounts_base_url(mut self, url: impl Into<String>) -> Self {
        self.accounts_base_url = url.into();
        self
    }

    /// Override the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<SpotifyClient> {
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;

        Ok(SpotifyClient {
            client,
            api_base_url: self.api_base_url,
            accounts_base_url: self.accounts_base_url,
            client_basic: self.client_basic,
            timeout: self.timeout,
        })
    }
}
