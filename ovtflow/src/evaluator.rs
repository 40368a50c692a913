//! Flow state evaluation
//!
//! Walks an ordered state list and returns the first state whose condition
//! currently holds. The evaluator backs an unauthenticated public endpoint:
//! a malformed or missing condition parameter is never an error, it reads as
//! "condition false" and evaluation moves on.

use ovtstore::{ConditionKind, FlowState, LiveStatus};
use std::sync::Arc;
use tracing::debug;

/// Condition evaluator over an ordered state list
pub struct FlowEvaluator {
    live: Arc<dyn LiveStatus>,
}

impl FlowEvaluator {
    /// Create an evaluator resolving live conditions through the given
    /// provider
    pub fn new(live: Arc<dyn LiveStatus>) -> Self {
        Self { live }
    }

    /// Return the first state (in the given order) whose condition holds
    ///
    /// Later states are not evaluated once a condition holds. `None` is the
    /// distinguished "no active state" result: not an error, and distinct
    /// from an active state with an empty response.
    pub async fn first_active_state<'a>(&self, states: &'a [FlowState]) -> Option<&'a FlowState> {
        for state in states {
            if self.condition_holds(state).await {
                return Some(state);
            }
        }
        None
    }

    /// Whether a single state's condition currently holds
    async fn condition_holds(&self, state: &FlowState) -> bool {
        match state.condition {
            ConditionKind::Always => true,
            ConditionKind::TwitchLive => match state.integer_variable("twitch_id") {
                Some(twitch_id) => self.live.is_live(state.login_id, twitch_id).await,
                None => {
                    debug!("state {} has no usable twitch_id, reading as false", state.id);
                    false
                }
            },
            ConditionKind::Never => false,
        }
    }
}
