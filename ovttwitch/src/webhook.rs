//! EventSub webhook authentication and live-status ingestion
//!
//! Twitch signs each delivery with an HMAC-SHA256 over the concatenation of
//! the message id, the timestamp and the raw body, transported as
//! `sha256=<hex>` next to the three source headers. Authentication is the
//! one failure class allowed to short-circuit the pipeline: a forged live
//! fact would corrupt every later condition evaluation, so nothing is
//! mutated before the signature checks out.

use hmac::{Hmac, Mac};
use ovtstore::Storage;
use serde_json::Value;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// Signature transport prefix
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// EventSub message-type value for notifications
pub const MESSAGE_TYPE_NOTIFICATION: &str = "notification";

/// EventSub message-type value for the subscription handshake
pub const MESSAGE_TYPE_VERIFICATION: &str = "webhook_callback_verification";

/// EventSub message-type value for revocations
pub const MESSAGE_TYPE_REVOCATION: &str = "revocation";

/// Compute the expected signature for a delivery, `sha256=<hex>`
pub fn compute_signature(secret: &[u8], message_id: &str, timestamp: &str, body: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(message_id.as_bytes());
    mac.update(timestamp.as_bytes());
    mac.update(body.as_bytes());
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes()))
}

/// Verify a delivery signature in constant time
///
/// Accepts only `sha256=<hex>`; a missing prefix, undecodable hex or digest
/// mismatch all read as invalid.
pub fn verify_signature(
    secret: &[u8],
    message_id: &str,
    timestamp: &str,
    body: &str,
    signature: &str,
) -> bool {
    let provided = match signature.strip_prefix(SIGNATURE_PREFIX) {
        Some(hex_digest) => hex_digest,
        None => return false,
    };
    let provided = match hex::decode(provided) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(message_id.as_bytes());
    mac.update(timestamp.as_bytes());
    mac.update(body.as_bytes());
    // verify_slice compares in constant time
    mac.verify_slice(&provided).is_ok()
}

/// Why a delivery was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Signature mismatch; nothing was read from the body
    InvalidSignature,
    /// Body unparseable or missing required fields
    MalformedBody,
    /// Message or subscription type this ingestion does not handle
    UnsupportedType,
    /// The broadcaster is not tracked by any account
    UntrackedBroadcaster,
    /// The storage collaborator failed
    StorageUnavailable,
}

/// Outcome of one webhook delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Live flag applied to every tracking account
    Applied {
        /// Broadcaster user id
        user_id: i64,
        /// New live flag
        live: bool,
        /// How many accounts were updated
        updated: usize,
    },
    /// Subscription handshake; the caller must echo the challenge back
    Challenge(String),
    /// Subscription revoked; acknowledged without mutation
    Revoked,
    /// Delivery rejected before any mutation
    Rejected(RejectReason),
}

/// Authenticated EventSub ingestion into the live-status fact store
pub struct WebhookIngest {
    secret: Vec<u8>,
    store: Arc<dyn Storage>,
}

impl WebhookIngest {
    /// Create an ingestion pipeline with the shared webhook secret
    pub fn new(secret: impl Into<Vec<u8>>, store: Arc<dyn Storage>) -> Self {
        Self {
            secret: secret.into(),
            store,
        }
    }

    /// Authenticate and apply one delivery
    ///
    /// `message_id`, `timestamp`, `message_type` and `signature` come from
    /// the EventSub transport headers; `body` is the raw request body. The
    /// signature is checked first and a mismatch rejects the delivery before
    /// any state is touched.
    pub async fn ingest(
        &self,
        message_id: &str,
        timestamp: &str,
        message_type: &str,
        signature: &str,
        body: &str,
    ) -> IngestOutcome {
        if !verify_signature(&self.secret, message_id, timestamp, body, signature) {
            warn!("rejected webhook delivery {}: invalid signature", message_id);
            return IngestOutcome::Rejected(RejectReason::InvalidSignature);
        }

        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(_) => return IngestOutcome::Rejected(RejectReason::MalformedBody),
        };

        match message_type {
            MESSAGE_TYPE_NOTIFICATION => self.handle_notification(&value).await,
            MESSAGE_TYPE_VERIFICATION => match value.get("challenge").and_then(Value::as_str) {
                Some(challenge) => IngestOutcome::Challenge(challenge.to_string()),
                None => IngestOutcome::Rejected(RejectReason::MalformedBody),
            },
            MESSAGE_TYPE_REVOCATION => IngestOutcome::Revoked,
            _ => IngestOutcome::Rejected(RejectReason::UnsupportedType),
        }
    }

    /// Apply a `stream.online` / `stream.offline` notification
    async fn handle_notification(&self, body: &Value) -> IngestOutcome {
        let live = match body.get("type").and_then(Value::as_str) {
            Some("stream.online") => true,
            Some("stream.offline") => false,
            Some(_) => return IngestOutcome::Rejected(RejectReason::UnsupportedType),
            None => return IngestOutcome::Rejected(RejectReason::MalformedBody),
        };

        // EventSub transports the broadcaster id as a decimal string
        let user_id = match body
            .get("condition")
            .and_then(|condition| condition.get("broadcaster_user_id"))
            .and_then(|id| match id {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            }) {
            Some(user_id) => user_id,
            None => return IngestOutcome::Rejected(RejectReason::MalformedBody),
        };

        let tracked = match self.store.twitch_accounts_by_user(user_id).await {
            Ok(tracked) => tracked,
            Err(e) => {
                warn!("twitch account lookup failed for user {}: {}", user_id, e);
                return IngestOutcome::Rejected(RejectReason::StorageUnavailable);
            }
        };
        if tracked.is_empty() {
            return IngestOutcome::Rejected(RejectReason::UntrackedBroadcaster);
        }

        match self.store.set_twitch_live_by_user(user_id, live).await {
            Ok(updated) => {
                debug!("broadcaster {} live={} ({} accounts)", user_id, live, updated);
                IngestOutcome::Applied {
                    user_id,
                    live,
                    updated,
                }
            }
            Err(e) => {
                warn!("failed to apply live status for user {}: {}", user_id, e);
                IngestOutcome::Rejected(RejectReason::StorageUnavailable)
            }
        }
    }
}
