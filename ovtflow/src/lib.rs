//! # OVTFlow
//!
//! Dynamic resolution core of OVTForm: turns a declarative rule set into one
//! plain-text output for a stream overlay.
//!
//! A caller supplies a flow id; the evaluator selects the first state whose
//! condition currently holds, the compositor assembles the target response
//! from its ordered fragments (literal text, currently playing track title,
//! joined artist list), and the resulting string comes back. Live
//! third-party state is read through provider seams backed by short-lived
//! TTL caches.
//!
//! The public operation never raises: every failure (transient upstream
//! outage, malformed payload, malformed stored configuration) degrades to a
//! shorter or empty string, because the output is displayed directly without
//! an error channel.
//!
//! # Example
//!
//! ```no_run
//! use ovtflow::Resolver;
//! use ovtspotify::SpotifyClient;
//! use ovtstore::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let client = Arc::new(SpotifyClient::new("client-id", "client-secret")?);
//!
//!     let resolver = Resolver::new(store, client);
//!     let text = resolver.resolve(1).await;
//!     println!("{}", text);
//!
//!     Ok(())
//! }
//! ```

pub mod compose;
pub mod evaluator;
pub mod resolver;

// Re-exports
pub use compose::{linked_string, ResponseCompositor, DEFAULT_RELEASE_GRACE};
pub use evaluator::FlowEvaluator;
pub use resolver::{Resolver, ResolverBuilder};
