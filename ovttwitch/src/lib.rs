//! Twitch live-status provider and EventSub webhook authentication for OVTForm
//!
//! This crate covers the Twitch side of the resolution core:
//!
//! - **Live status**: reads the boolean "is live" fact that webhook ingestion
//!   maintains in storage. Failures read as "not live"; the fact backs an
//!   unauthenticated public endpoint.
//! - **Webhook authentication**: the EventSub notification contract. Each
//!   inbound delivery is authenticated with an HMAC-SHA256 over
//!   `message id ‖ timestamp ‖ raw body` compared in constant time; a
//!   mismatch rejects the delivery before any live-status mutation.
//!
//! The HTTP plumbing that feeds deliveries into [`WebhookIngest`] is an
//! external collaborator; this crate only implements the contract.

pub mod live;
pub mod webhook;

// Re-exports
pub use live::TwitchLiveStatus;
pub use webhook::{
    compute_signature, verify_signature, IngestOutcome, RejectReason, WebhookIngest,
};
