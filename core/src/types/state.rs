//! Service state of the host and the rules for comparing wanted vs achieved.
//!
//! The three states form a total order: a stronger achieved state always
//! satisfies a weaker wanted state, never the other way around. `Resumed`
//! means fully in service; `PartiallySuspended` means local agents are frozen
//! but the orchestrator has not confirmed anything; `FullySuspended` means
//! the orchestrator has confirmed suspension of the host and all its active
//! workloads, and their services have been stopped.

use serde::{Deserialize, Serialize};

/// Host service state, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// Host fully in service, agents unfrozen, orchestrator informed.
    Resumed,
    /// Agents frozen; the orchestrator has not confirmed suspension.
    PartiallySuspended,
    /// Agents frozen, suspension confirmed, workload services stopped.
    FullySuspended,
}

impl ServiceState {
    /// Whether this achieved state satisfies the given wanted state.
    ///
    /// A stronger achieved state satisfies any weaker request; achieving a
    /// weaker state never implies the stronger one.
    pub fn satisfies(self, wanted: ServiceState) -> bool {
        self >= wanted
    }
}

/// The mutable convergence record owned by the `StateTracker`.
///
/// `achieved` starts as `None`: at process start nothing is known about the
/// agents, so the first iteration always has work to do regardless of the
/// wanted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvergenceState {
    pub wanted: ServiceState,
    pub achieved: Option<ServiceState>,
    /// When a freeze was first requested for the current suspension attempt
    /// (epoch milliseconds). Cleared on unfreeze.
    pub freeze_first_requested_ms: Option<u64>,
}

impl Default for ConvergenceState {
    fn default() -> Self {
        ConvergenceState {
            wanted: ServiceState::Resumed,
            achieved: None,
            freeze_first_requested_ms: None,
        }
    }
}

/// Serializable snapshot of the convergence record for debug endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugSnapshot {
    pub wanted: ServiceState,
    pub achieved: Option<ServiceState>,
    pub freeze_first_requested_ms: Option<u64>,
}

impl From<&ConvergenceState> for DebugSnapshot {
    fn from(state: &ConvergenceState) -> Self {
        DebugSnapshot {
            wanted: state.wanted,
            achieved: state.achieved,
            freeze_first_requested_ms: state.freeze_first_requested_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_are_totally_ordered() {
        assert!(ServiceState::Resumed < ServiceState::PartiallySuspended);
        assert!(ServiceState::PartiallySuspended < ServiceState::FullySuspended);
    }

    #[test]
    fn stronger_achieved_satisfies_weaker_wanted() {
        use ServiceState::*;
        let all = [Resumed, PartiallySuspended, FullySuspended];
        for achieved in all {
            for wanted in all {
                assert_eq!(
                    achieved.satisfies(wanted),
                    achieved >= wanted,
                    "achieved={:?} wanted={:?}",
                    achieved,
                    wanted
                );
            }
        }
        // Spot-check both directions of the invariant.
        assert!(FullySuspended.satisfies(PartiallySuspended));
        assert!(!PartiallySuspended.satisfies(FullySuspended));
    }

    #[test]
    fn default_state_forces_initial_convergence() {
        let state = ConvergenceState::default();
        assert_eq!(state.wanted, ServiceState::Resumed);
        assert_eq!(state.achieved, None);
        assert_eq!(state.freeze_first_requested_ms, None);
    }

    #[test]
    fn service_state_serde_snake_case() {
        let json = serde_json::to_string(&ServiceState::PartiallySuspended).unwrap();
        assert_eq!(json, "\"partially_suspended\"");
        let back: ServiceState = serde_json::from_str("\"fully_suspended\"").unwrap();
        assert_eq!(back, ServiceState::FullySuspended);
    }

    #[test]
    fn snapshot_round_trip() {
        let snapshot = DebugSnapshot {
            wanted: ServiceState::FullySuspended,
            achieved: Some(ServiceState::PartiallySuspended),
            freeze_first_requested_ms: Some(1_234_567),
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: DebugSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
