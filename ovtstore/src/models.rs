//! Entity models shared across the OVTForm workspace
//!
//! These structures mirror what the storage collaborator persists. They are
//! deliberately loose where user-editable configuration is involved: condition
//! and component parameters stay opaque key/value maps, and every consumer is
//! expected to fail open on a malformed or missing parameter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Opaque parameter map attached to states and components
pub type Variables = HashMap<String, Value>;

// ============================================================================
// Accounts
// ============================================================================

/// A linked Spotify account with its credential pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SpotifyAccount {
    /// Unique account id
    pub id: i64,
    /// Owning login id
    pub login_id: i64,
    /// Optional user-facing label
    pub label: Option<String>,
    /// Spotify user id
    pub user_id: String,
    /// Current access token
    pub access_token: String,
    /// Current refresh token
    pub refresh_token: String,
    /// Granted scopes
    pub scopes: Vec<String>,
    /// Access token validity horizon
    pub validity: DateTime<Utc>,
}

/// A linked Twitch account carrying the externally maintained live flag
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TwitchAccount {
    /// Unique account id
    pub id: i64,
    /// Owning login id
    pub login_id: i64,
    /// Optional user-facing label
    pub label: Option<String>,
    /// Twitch broadcaster user id
    pub user_id: i64,
    /// Twitch username
    pub username: String,
    /// Twitch display name
    pub display_name: String,
    /// Live flag, mutated only by webhook ingestion
    pub is_live: bool,
}

// ============================================================================
// Flows and states
// ============================================================================

/// Condition kind of a flow state
///
/// A fixed enumerated set; there is no general condition expression language.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConditionKind {
    /// Selects immediately
    #[serde(rename = "always")]
    Always,
    /// Selects when the referenced Twitch account is live
    #[serde(rename = "twitchLive")]
    TwitchLive,
    /// Never selects: an inert marker for a disabled rule, distinct from
    /// deleting the rule
    #[serde(rename = "never")]
    Never,
}

/// A named ordered rule list mapping conditions to responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    /// Unique flow id
    pub id: i64,
    /// Owning login id
    pub login_id: i64,
    /// Display label
    pub label: String,
    /// Disabled flows resolve to empty text
    pub enabled: bool,
}

impl Flow {
    /// Create an enabled flow
    pub fn new(id: i64, login_id: i64, label: impl Into<String>) -> Self {
        Self {
            id,
            login_id,
            label: label.into(),
            enabled: true,
        }
    }
}

/// One rule within a flow: a condition, its parameters and an optional target
/// response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlowState {
    /// Unique state id
    pub id: i64,
    /// Owning flow id
    pub flow_id: i64,
    /// Owning login id
    pub login_id: i64,
    /// Total order within the flow, assigned at write time starting at 1
    pub index: u32,
    /// Condition kind
    pub condition: ConditionKind,
    /// Opaque condition parameters
    #[serde(default)]
    pub variables: Variables,
    /// Target response; `None` composes to empty text, never an error
    pub response_id: Option<i64>,
}

impl FlowState {
    /// Create a state with no parameters and no target response
    ///
    /// The write-time index is assigned by the storage collaborator.
    pub fn new(id: i64, flow_id: i64, login_id: i64, condition: ConditionKind) -> Self {
        Self {
            id,
            flow_id,
            login_id,
            index: 0,
            condition,
            variables: Variables::new(),
            response_id: None,
        }
    }

    /// Set the target response
    pub fn with_response(mut self, response_id: i64) -> Self {
        self.response_id = Some(response_id);
        self
    }

    /// Attach a parameter
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Read a parameter expected to be an integer
    ///
    /// Returns `None` for a missing parameter as well as for any non-integer
    /// JSON value (booleans and floats included).
    pub fn integer_variable(&self, key: &str) -> Option<i64> {
        self.variables.get(key).and_then(Value::as_i64)
    }
}

// ============================================================================
// Responses and components
// ============================================================================

/// Fragment kind of a response component
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ComponentKind {
    /// A literal text fragment
    #[serde(rename = "text")]
    Text,
    /// The currently playing track title
    #[serde(rename = "currentSong")]
    CurrentSong,
    /// The currently playing artist list, joined
    #[serde(rename = "currentArtist")]
    CurrentArtist,
}

/// A named ordered list of components producing one text output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Unique response id
    pub id: i64,
    /// Owning login id
    pub login_id: i64,
    /// Display label
    pub label: String,
}

/// One fragment-producing unit within a response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseComponent {
    /// Unique component id
    pub id: i64,
    /// Owning response id
    pub response_id: i64,
    /// Owning login id
    pub login_id: i64,
    /// Order assigned at write time starting at 1, preserved verbatim on read
    pub index: u32,
    /// Fragment kind
    pub kind: ComponentKind,
    /// Opaque component parameters
    #[serde(default)]
    pub variables: Variables,
}

impl ResponseComponent {
    /// Create a component with no parameters
    ///
    /// The write-time index is assigned by the storage collaborator.
    pub fn new(id: i64, response_id: i64, login_id: i64, kind: ComponentKind) -> Self {
        Self {
            id,
            response_id,
            login_id,
            index: 0,
            kind,
            variables: Variables::new(),
        }
    }

    /// Create a literal text component
    pub fn text(id: i64, response_id: i64, login_id: i64, text: impl Into<String>) -> Self {
        Self::new(id, response_id, login_id, ComponentKind::Text)
            .with_variable("text", text.into())
    }

    /// Create a current-song component bound to a Spotify account
    pub fn current_song(id: i64, response_id: i64, login_id: i64, spotify_id: i64) -> Self {
        Self::new(id, response_id, login_id, ComponentKind::CurrentSong)
            .with_variable("spotify_id", spotify_id)
    }

    /// Create a current-artist component bound to a Spotify account
    pub fn current_artist(id: i64, response_id: i64, login_id: i64, spotify_id: i64) -> Self {
        Self::new(id, response_id, login_id, ComponentKind::CurrentArtist)
            .with_variable("spotify_id", spotify_id)
    }

    /// Attach a parameter
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }

    /// Read a parameter expected to be an integer
    pub fn integer_variable(&self, key: &str) -> Option<i64> {
        self.variables.get(key).and_then(Value::as_i64)
    }

    /// Read a parameter expected to be a string
    pub fn text_variable(&self, key: &str) -> Option<&str> {
        self.variables.get(key).and_then(Value::as_str)
    }
}

// ============================================================================
// Now playing
// ============================================================================

/// The validated currently-playing payload
///
/// By construction `artists` is non-empty: the upstream boundary rejects a
/// payload with an empty artist list as malformed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NowPlaying {
    /// Track title
    pub title: String,
    /// Artist names, in upstream order
    pub artists: Vec<String>,
}

impl NowPlaying {
    /// Create a now-playing value
    pub fn new(title: impl Into<String>, artists: Vec<String>) -> Self {
        Self {
            title: title.into(),
            artists,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_variable_rejects_non_integers() {
        let state = FlowState::new(1, 1, 1, ConditionKind::TwitchLive)
            .with_variable("twitch_id", 42)
            .with_variable("bool", true)
            .with_variable("float", 1.5)
            .with_variable("text", "42");

        assert_eq!(state.integer_variable("twitch_id"), Some(42));
        assert_eq!(state.integer_variable("bool"), None);
        assert_eq!(state.integer_variable("float"), None);
        assert_eq!(state.integer_variable("text"), None);
        assert_eq!(state.integer_variable("missing"), None);
    }

    #[test]
    fn test_condition_kind_serde_names() {
        let json = serde_json::to_string(&ConditionKind::TwitchLive).unwrap();
        assert_eq!(json, "\"twitchLive\"");

        let kind: ConditionKind = serde_json::from_str("\"never\"").unwrap();
        assert_eq!(kind, ConditionKind::Never);
    }

    #[test]
    fn test_component_constructors() {
        let text = ResponseComponent::text(1, 2, 3, "hello ");
        assert_eq!(text.kind, ComponentKind::Text);
        assert_eq!(text.text_variable("text"), Some("hello "));

        let song = ResponseComponent::current_song(2, 2, 3, 9);
        assert_eq!(song.kind, ComponentKind::CurrentSong);
        assert_eq!(song.integer_variable("spotify_id"), Some(9));
    }
}
