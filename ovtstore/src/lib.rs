//! # OVTStore
//!
//! Common entities and collaborator traits for OVTForm.
//!
//! This crate provides the foundational types shared by the resolution core:
//! the configuration entities (flows, states, responses, components), the
//! linked third-party accounts, and the trait seams through which the core
//! talks to its external collaborators.
//!
//! ## Traits
//!
//! - [`Storage`]: the persistent CRUD collaborator. Its implementation is out
//!   of scope for the core; [`MemoryStore`] is an in-memory stand-in used by
//!   tests and examples.
//! - [`LiveStatus`]: the "is this channel live" fact, maintained externally
//!   by webhook ingestion.
//! - [`NowPlayingSource`]: the currently-playing track resolver.
//!
//! The resolution core never unwraps a collaborator failure into a panic or
//! an error response: every failure path degrades to absence and ultimately
//! to shorter or empty output text.

pub mod memory;
pub mod models;
pub mod traits;

// Re-exports
pub use memory::MemoryStore;
pub use models::{
    ComponentKind, ConditionKind, Flow, FlowState, NowPlaying, Response,
    ResponseComponent, SpotifyAccount, TwitchAccount, Variables,
};
pub use traits::{LiveStatus, NowPlayingSource, Storage};
