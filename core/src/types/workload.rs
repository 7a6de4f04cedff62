//! Workload records as reported by the inventory service.
//!
//! The core only cares about which workloads are `Active`: those must be
//! confirmed suspended by the orchestrator and have their services stopped
//! before the host counts as fully suspended. All other lifecycle states are
//! irrelevant to convergence.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a workload in the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadLifecycle {
    Provisioned,
    Ready,
    Active,
    Inactive,
    Dirty,
    Failed,
    Parked,
}

/// A workload assigned to this host, read-only to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadRecord {
    pub hostname: String,
    pub lifecycle: WorkloadLifecycle,
}

impl WorkloadRecord {
    pub fn new(hostname: impl Into<String>, lifecycle: WorkloadLifecycle) -> Self {
        WorkloadRecord {
            hostname: hostname.into(),
            lifecycle,
        }
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle == WorkloadLifecycle::Active
    }
}

/// Hostnames of the active workloads, in inventory order.
pub fn active_hostnames(workloads: &[WorkloadRecord]) -> Vec<String> {
    workloads
        .iter()
        .filter(|w| w.is_active())
        .map(|w| w.hostname.clone())
        .collect()
}
