//! Collaborator contracts consumed by the convergence core.
//!
//! Three narrow traits, each independently fakeable: the cluster
//! `Orchestrator` that approves or denies taking the host out of service,
//! the `AgentSupervisor` that freezes/unfreezes the local node agents, and
//! the `WorkloadInventory` that reports which workloads should run here.
//! Implementations may block for network or internal-timeout duration; they
//! are only ever called from the convergence worker, never from callers of
//! the public API.

pub mod mock;

use std::time::Duration;

use thiserror::Error;

use crate::types::workload::WorkloadRecord;

/// Orchestrator call failures. Denial and transport trouble are reported as
/// distinct variants but the loop treats them identically: retry next tick,
/// assume no partial effects.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("orchestrator denied {operation} of {hostname}: {reason}")]
    Denied {
        operation: &'static str,
        hostname: String,
        reason: String,
    },
    #[error("orchestrator unreachable: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to stop services on {hostname}: {reason}")]
    StopServices { hostname: String, reason: String },
    #[error("no agent registered for '{0}'")]
    UnknownAgent(String),
    #[error("agent '{0}' already registered")]
    AlreadyRegistered(String),
}

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("workload inventory unavailable: {0}")]
    Unavailable(String),
}

/// Cluster-wide authority over service status. Serializes suspension
/// decisions across hosts; no local locking is needed on top of it.
pub trait Orchestrator: Send + Sync {
    /// Tell the orchestrator the host is back in service.
    fn resume(&self, hostname: &str) -> Result<(), OrchestratorError>;

    /// Ask permission to take the host out of service.
    fn suspend(&self, hostname: &str) -> Result<(), OrchestratorError>;

    /// Ask permission to suspend the host together with the given workload
    /// hostnames.
    fn suspend_all(
        &self,
        parent_hostname: &str,
        hostnames: &[String],
    ) -> Result<(), OrchestratorError>;
}

/// Freeze coordinator for the local node agents.
pub trait AgentSupervisor: Send + Sync {
    /// Request that every agent converge to the given frozen state. Returns
    /// whether the entire set has reached it, not whether the request was
    /// accepted.
    fn set_frozen(&self, frozen: bool) -> bool;

    /// How long the current freeze window has been open. The clock starts
    /// when a freeze is first requested and resets only on an unfreeze
    /// request, not when the agents converge. Zero while no freeze is in
    /// effect.
    fn freeze_duration(&self) -> Duration;

    /// Stop the services of the given workload hostnames.
    fn stop_services(&self, hostnames: &[String]) -> Result<(), SupervisorError>;
}

/// Read-only view of the workloads assigned to a host.
pub trait WorkloadInventory: Send + Sync {
    fn list_workloads(&self, hostname: &str) -> Result<Vec<WorkloadRecord>, InventoryError>;
}
