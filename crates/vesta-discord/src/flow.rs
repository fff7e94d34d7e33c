//! Cancellation flow — the select → confirm → remove interaction as an
//! explicit state machine, independent of any Discord UI types.
//!
//! The component handler owns one flow per listing message and feeds it
//! interaction events; the flow decides which transitions are legal.

use std::time::{Duration, Instant};

use thiserror::Error;

/// Discord component interaction tokens expire after 15 minutes; a flow
/// older than that can never receive another interaction.
pub const FLOW_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    /// The select menu is shown, nothing picked yet.
    Listing,
    /// A job was picked; Remove/Cancel buttons are shown.
    ConfirmingRemoval { job_id: String },
    /// The user backed out. The select menu is shown again, so another
    /// selection is allowed.
    Cancelled,
    /// The job was removed. Terminal.
    Removed { job_id: String },
    /// Cancelled into an empty listing — nothing left to select. Terminal.
    Closed,
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FlowState::Listing => "listing",
            FlowState::ConfirmingRemoval { .. } => "confirming-removal",
            FlowState::Cancelled => "cancelled",
            FlowState::Removed { .. } => "removed",
            FlowState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: String,
    },
}

#[derive(Debug)]
pub struct RemovalFlow {
    state: FlowState,
    started: Instant,
}

impl Default for RemovalFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl RemovalFlow {
    pub fn new() -> Self {
        Self {
            state: FlowState::Listing,
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    /// True once the flow is older than `ttl` and can be pruned.
    pub fn is_stale(&self, ttl: Duration) -> bool {
        self.started.elapsed() >= ttl
    }

    /// A job was picked from the menu. Legal while listing or after a
    /// cancelled confirmation.
    pub fn select(&mut self, job_id: &str) -> Result<(), FlowError> {
        match self.state {
            FlowState::Listing | FlowState::Cancelled => {
                self.state = FlowState::ConfirmingRemoval {
                    job_id: job_id.to_string(),
                };
                Ok(())
            }
            ref state => Err(FlowError::InvalidTransition {
                action: "select",
                state: state.to_string(),
            }),
        }
    }

    /// The removal was confirmed. Returns the job to unregister.
    pub fn confirm(&mut self) -> Result<String, FlowError> {
        if let FlowState::ConfirmingRemoval { job_id } = &self.state {
            let job_id = job_id.clone();
            self.state = FlowState::Removed {
                job_id: job_id.clone(),
            };
            Ok(job_id)
        } else {
            Err(FlowError::InvalidTransition {
                action: "confirm",
                state: self.state.to_string(),
            })
        }
    }

    /// The confirmation was dismissed; back to the menu.
    pub fn cancel(&mut self) -> Result<(), FlowError> {
        match self.state {
            FlowState::ConfirmingRemoval { .. } => {
                self.state = FlowState::Cancelled;
                Ok(())
            }
            ref state => Err(FlowError::InvalidTransition {
                action: "cancel",
                state: state.to_string(),
            }),
        }
    }

    /// The cancelled listing turned out to be empty; there is nothing left
    /// to interact with.
    pub fn close(&mut self) -> Result<(), FlowError> {
        match self.state {
            FlowState::Cancelled => {
                self.state = FlowState::Closed;
                Ok(())
            }
            ref state => Err(FlowError::InvalidTransition {
                action: "close",
                state: state.to_string(),
            }),
        }
    }

    /// True once no further transitions are possible.
    pub fn is_settled(&self) -> bool {
        matches!(self.state, FlowState::Removed { .. } | FlowState::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_select_confirm() {
        let mut flow = RemovalFlow::new();
        flow.select("g_u_1").unwrap();
        assert_eq!(
            *flow.state(),
            FlowState::ConfirmingRemoval {
                job_id: "g_u_1".to_string()
            }
        );
        assert_eq!(flow.confirm().unwrap(), "g_u_1");
        assert!(flow.is_settled());
    }

    #[test]
    fn cancel_allows_another_selection() {
        let mut flow = RemovalFlow::new();
        flow.select("g_u_1").unwrap();
        flow.cancel().unwrap();
        assert_eq!(*flow.state(), FlowState::Cancelled);
        flow.select("g_u_2").unwrap();
        assert_eq!(flow.confirm().unwrap(), "g_u_2");
    }

    #[test]
    fn confirm_without_selection_is_rejected() {
        let mut flow = RemovalFlow::new();
        assert!(flow.confirm().is_err());
        assert_eq!(*flow.state(), FlowState::Listing);
    }

    #[test]
    fn cancel_without_selection_is_rejected() {
        let mut flow = RemovalFlow::new();
        assert!(flow.cancel().is_err());
    }

    #[test]
    fn removed_is_terminal() {
        let mut flow = RemovalFlow::new();
        flow.select("g_u_1").unwrap();
        flow.confirm().unwrap();
        assert!(flow.select("g_u_2").is_err());
        assert!(flow.confirm().is_err());
        assert!(flow.cancel().is_err());
    }

    #[test]
    fn cancel_into_empty_listing_settles() {
        let mut flow = RemovalFlow::new();
        flow.select("g_u_1").unwrap();
        flow.cancel().unwrap();
        flow.close().unwrap();
        assert!(flow.is_settled());
        assert!(flow.select("g_u_2").is_err());
    }

    #[test]
    fn close_requires_a_cancelled_flow() {
        let mut flow = RemovalFlow::new();
        assert!(flow.close().is_err());
        flow.select("g_u_1").unwrap();
        assert!(flow.close().is_err());
    }

    #[test]
    fn staleness_follows_the_ttl() {
        let flow = RemovalFlow::new();
        assert!(flow.is_stale(Duration::ZERO));
        assert!(!flow.is_stale(FLOW_TTL));
    }
}
