//! Wire models for Spotify Web API responses
//!
//! Upstream payloads are loosely typed; this module validates them
//! exhaustively at the boundary and converts them into explicit tagged
//! results before any field is trusted. The currently-playing endpoint
//! answers either `{ "item": { "name": ..., "artists": [...] } }` or
//! `{ "error": { "status": ... } }`; the token endpoint answers
//! `{ "access_token": ..., "refresh_token"?: ..., "scope": ..., "expires_in": ... }`.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use ovtstore::NowPlaying;
use serde_json::Value;

/// Outcome of one currently-playing fetch, fully validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayingStatus {
    /// A playing track with a string title and a non-empty artist list
    Playing(NowPlaying),
    /// The access token was rejected; a refresh may make it usable again
    Unauthorized,
    /// Upstream reported an error status other than unauthorized
    UpstreamError(u16),
    /// Anything else: unparseable body, missing track, empty or malformed
    /// artist list. Indistinguishable from an outage on purpose; both
    /// degrade to absence
    MalformedPayload,
}

/// A validated token-endpoint response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedTokens {
    /// New access token
    pub access_token: String,
    /// New refresh token; the upstream may omit it, in which case the stored
    /// one stays in use
    pub refresh_token: Option<String>,
    /// Granted scopes, space-split from the `scope` field
    pub scopes: Vec<String>,
    /// Validity horizon computed from `expires_in`
    pub validity: DateTime<Utc>,
}

/// Classify a currently-playing response
///
/// `status` is the HTTP status code, `body` the raw response text. Every
/// shape that is not a fully well-formed playing payload collapses into one
/// of the non-playing variants; this function never fails.
pub fn parse_currently_playing(status: u16, body: &str) -> PlayingStatus {
    if status == 401 {
        return PlayingStatus::Unauthorized;
    }

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => return PlayingStatus::MalformedPayload,
    };

    if let Some(error) = value.get("error") {
        return match error.get("status").and_then(Value::as_u64) {
            Some(401) => PlayingStatus::Unauthorized,
            Some(code) => PlayingStatus::UpstreamError(code as u16),
            None => PlayingStatus::MalformedPayload,
        };
    }

    match validate_item(&value) {
        Some(now_playing) => PlayingStatus::Playing(now_playing),
        None => PlayingStatus::MalformedPayload,
    }
}

/// Validate the track object of a success payload
///
/// Accepts only a string title and a non-empty list of artist objects each
/// carrying a string name.
fn validate_item(value: &Value) -> Option<NowPlaying> {
    let item = value.get("item")?;
    let title = item.get("name")?.as_str()?;
    let artists = item.get("artists")?.as_array()?;
    if artists.is_empty() {
        return None;
    }

    let mut names = Vec::with_capacity(artists.len());
    for artist in artists {
        names.push(artist.get("name")?.as_str()?.to_string());
    }

    Some(NowPlaying::new(title, names))
}

/// Validate a token-endpoint response
///
/// `now` is the instant the exchange completed; validity is `now +
/// expires_in`. A missing `refresh_token` is tolerated (the caller keeps the
/// stored one); any other missing or mistyped field fails the refresh.
pub fn parse_refreshed_tokens(body: &str, now: DateTime<Utc>) -> Result<RefreshedTokens> {
    let value: Value = serde_json::from_str(body)?;

    let access_token = value
        .get("access_token")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::malformed_token("missing access_token"))?
        .to_string();

    let refresh_token = value
        .get("refresh_token")
        .and_then(Value::as_str)
        .map(str::to_string);

    let scope = value
        .get("scope")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::malformed_token("missing scope"))?;
    let scopes = scope.split(' ').map(str::to_string).collect();

    let expires_in = value
        .get("expires_in")
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::malformed_token("missing expires_in"))?;
    let validity = now + Duration::seconds(expires_in);

    Ok(RefreshedTokens {
        access_token,
        refresh_token,
        scopes,
        validity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_playing_payload() {
        let body = r#"{
            "item": {
                "name": "Witchcraft",
                "artists": [{"name": "Pendulum"}, {"name": "Rob Swire"}]
            }
        }"#;

        let status = parse_currently_playing(200, body);
        assert_eq!(
            status,
            PlayingStatus::Playing(NowPlaying::new(
                "Witchcraft",
                vec!["Pendulum".to_string(), "Rob Swire".to_string()]
            ))
        );
    }

    #[test]
    fn test_parse_unauthorized_from_body_and_status() {
        let body = r#"{"error": {"status": 401, "message": "The access token expired"}}"#;
        assert_eq!(parse_currently_playing(200, body), PlayingStatus::Unauthorized);
        assert_eq!(parse_currently_playing(401, ""), PlayingStatus::Unauthorized);
    }

    #[test]
    fn test_parse_upstream_error() {
        let body = r#"{"error": {"status": 503}}"#;
        assert_eq!(
            parse_currently_playing(200, body),
            PlayingStatus::UpstreamError(503)
        );
    }

    #[test]
    fn test_malformed_payloads_collapse() {
        // Unparseable body (also what an empty 204 answer produces)
        assert_eq!(parse_currently_playing(200, ""), PlayingStatus::MalformedPayload);
        // No track
        assert_eq!(
            parse_currently_playing(200, r#"{"progress_ms": 1000}"#),
            PlayingStatus::MalformedPayload
        );
        // Title is not a string
        assert_eq!(
            parse_currently_playing(200, r#"{"item": {"name": 3, "artists": [{"name": "A"}]}}"#),
            PlayingStatus::MalformedPayload
        );
        // Empty artist list
        assert_eq!(
            parse_currently_playing(200, r#"{"item": {"name": "T", "artists": []}}"#),
            PlayingStatus::MalformedPayload
        );
        // Artist without a string name
        assert_eq!(
            parse_currently_playing(200, r#"{"item": {"name": "T", "artists": [{"id": 1}]}}"#),
            PlayingStatus::MalformedPayload
        );
        // Error object without a status
        assert_eq!(
            parse_currently_playing(200, r#"{"error": {"message": "?"}}"#),
            PlayingStatus::MalformedPayload
        );
    }

    #[test]
    fn test_parse_refreshed_tokens() {
        let now = Utc::now();
        let body = r#"{
            "access_token": "new-access",
            "refresh_token": "new-refresh",
            "scope": "user-read-currently-playing user-read-playback-state",
            "expires_in": 3600
        }"#;

        let tokens = parse_refreshed_tokens(body, now).unwrap();
        assert_eq!(tokens.access_token, "new-access");
        assert_eq!(tokens.refresh_token, Some("new-refresh".to_string()));
        assert_eq!(
            tokens.scopes,
            vec![
                "user-read-currently-playing".to_string(),
                "user-read-playback-state".to_string()
            ]
        );
        assert_eq!(tokens.validity, now + Duration::seconds(3600));
    }

    #[test]
    fn test_parse_refreshed_tokens_without_rotation() {
        let body = r#"{"access_token": "a", "scope": "s", "expires_in": 60}"#;
        let tokens = parse_refreshed_tokens(body, Utc::now()).unwrap();
        assert_eq!(tokens.refresh_token, None);
    }

    #[test]
    fn test_parse_refreshed_tokens_rejects_incomplete_payloads() {
        let now = Utc::now();
        assert!(parse_refreshed_tokens(r#"{"scope": "s", "expires_in": 60}"#, now).is_err());
        assert!(parse_refreshed_tokens(r#"{"access_token": "a", "expires_in": 60}"#, now).is_err());
        assert!(parse_refreshed_tokens(r#"{"access_token": "a", "scope": "s"}"#, now).is_err());
        assert!(parse_refreshed_tokens(
            r#"{"access_token": "a", "scope": "s", "expires_in": "60"}"#,
            now
        )
        .is_err());
        assert!(parse_refreshed_tokens("not json", now).is_err());
    }
}
