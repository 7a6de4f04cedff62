//! node-steward core — keeps a host and its node agents consistent with an
//! operator-declared service state.
//!
//! A single background worker drives the host toward the wanted state one
//! corrective step at a time: freezing or unfreezing the local agents,
//! asking the cluster orchestrator for permission before any suspension, and
//! stopping workload services once suspension is confirmed. Denials and
//! failures are retried forever; the only way the loop ends is an explicit
//! `Steward::stop`.

pub mod agent;
pub mod convergence;
pub mod infrastructure;
pub mod types;

pub use agent::{AgentRegistry, NodeAgentHandle};
pub use convergence::worker::Steward;
pub use infrastructure::{AgentSupervisor, Orchestrator, WorkloadInventory};
pub use types::config::ConvergenceConfig;
pub use types::state::{DebugSnapshot, ServiceState};
pub use types::workload::{WorkloadLifecycle, WorkloadRecord};
