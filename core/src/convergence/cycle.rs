//! One convergence iteration.
//!
//! `ConvergeCycle::run_cycle` performs at most one corrective step toward the
//! wanted state and returns; full convergence may take many iterations, and
//! the conditions are re-evaluated fresh each time. Collaborator failures are
//! caught here, logged, and counted as "not converged this iteration" — they
//! can never terminate the worker.
//!
//! # Step logic
//!
//! Wanted `Resumed`: request unfreeze; once the whole agent set has
//! converged, tell the orchestrator the host resumed and record `Resumed`.
//! An orchestrator failure leaves the achieved state unchanged and does not
//! re-freeze the agents.
//!
//! Wanted `PartiallySuspended`/`FullySuspended`: request freeze (noting when
//! it was first requested) and wait for it to converge before talking to the
//! orchestrator at all. A partial suspension is done at that point. A full
//! suspension additionally asks the orchestrator to suspend the host and the
//! host plus its active workloads, then stops those workloads' services.
//! While suspension keeps being denied, agents stay frozen until the freeze
//! convergence timeout, after which the freeze is rolled back so local
//! workloads can make progress again.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, warn};

use crate::convergence::tracker::StateTracker;
use crate::infrastructure::{
    AgentSupervisor, InventoryError, Orchestrator, OrchestratorError, SupervisorError,
    WorkloadInventory,
};
use crate::types::state::ServiceState;
use crate::types::workload::active_hostnames;

/// Why an iteration did not reach the wanted state. None of these are fatal;
/// every one of them is retried on a later tick.
#[derive(Debug, Error)]
pub enum ConvergeError {
    /// Not an error, simply "not yet": the agent set is still moving toward
    /// the requested frozen state.
    #[error("agents have not yet converged to frozen={target}")]
    FreezeNotConverged { target: bool },
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

/// Performs single convergence iterations against the collaborators.
pub struct ConvergeCycle {
    hostname: String,
    freeze_timeout: Duration,
    tracker: Arc<StateTracker>,
    orchestrator: Arc<dyn Orchestrator>,
    supervisor: Arc<dyn AgentSupervisor>,
    inventory: Arc<dyn WorkloadInventory>,
}

impl ConvergeCycle {
    pub fn new(
        hostname: impl Into<String>,
        freeze_timeout: Duration,
        tracker: Arc<StateTracker>,
        orchestrator: Arc<dyn Orchestrator>,
        supervisor: Arc<dyn AgentSupervisor>,
        inventory: Arc<dyn WorkloadInventory>,
    ) -> Self {
        ConvergeCycle {
            hostname: hostname.into(),
            freeze_timeout,
            tracker,
            orchestrator,
            supervisor,
            inventory,
        }
    }

    /// Run one iteration. Settles (no collaborator calls) once the achieved
    /// state equals the wanted one. Equality, not the ordering rule, decides
    /// here: a suspended host whose operator wants it resumed still has work
    /// to do even though suspension satisfies weaker queries.
    pub fn run_cycle(&self) {
        let wanted = self.tracker.wanted();
        if self.tracker.achieved() == Some(wanted) {
            return;
        }
        match self.converge(wanted) {
            Ok(()) => {}
            Err(ConvergeError::FreezeNotConverged { target }) => {
                debug!(target_frozen = target, "agents still converging, will retry");
            }
            Err(error) => {
                warn!(?wanted, %error, "convergence step failed, will retry");
            }
        }
    }

    fn converge(&self, wanted: ServiceState) -> Result<(), ConvergeError> {
        match wanted {
            ServiceState::Resumed => self.converge_resumed(),
            other => self.converge_suspended(other),
        }
    }

    fn converge_resumed(&self) -> Result<(), ConvergeError> {
        if !self.supervisor.set_frozen(false) {
            return Err(ConvergeError::FreezeNotConverged { target: false });
        }
        self.tracker.clear_freeze_requested();
        // Unfreeze is not rolled back if the orchestrator refuses the resume;
        // the achieved state just stays where it was until a later tick.
        self.orchestrator.resume(&self.hostname)?;
        self.tracker.record_achieved(ServiceState::Resumed);
        Ok(())
    }

    fn converge_suspended(&self, wanted: ServiceState) -> Result<(), ConvergeError> {
        self.tracker.note_freeze_requested(now_ms());
        if !self.supervisor.set_frozen(true) {
            return Err(ConvergeError::FreezeNotConverged { target: true });
        }

        if wanted == ServiceState::PartiallySuspended {
            // No orchestrator interaction required for a partial suspension.
            self.tracker.record_achieved(ServiceState::PartiallySuspended);
            return Ok(());
        }

        let workloads = self.inventory.list_workloads(&self.hostname)?;
        let active = active_hostnames(&workloads);
        let mut suspend_set = active.clone();
        suspend_set.push(self.hostname.clone());

        let permission = self
            .orchestrator
            .suspend(&self.hostname)
            .and_then(|()| self.orchestrator.suspend_all(&self.hostname, &suspend_set));
        if let Err(error) = permission {
            // Suspension denied. Agents stay frozen while the denial is
            // fresh, but a host frozen forever while never suspended is a
            // deadlock: past the freeze convergence timeout, roll back.
            if self.supervisor.freeze_duration() >= self.freeze_timeout {
                warn!(
                    hostname = %self.hostname,
                    "freeze exceeded convergence timeout while suspension is denied, unfreezing"
                );
                self.supervisor.set_frozen(false);
                self.tracker.clear_freeze_requested();
            }
            return Err(error.into());
        }

        // Service stop is retried on later ticks; it never rolls the freeze
        // back on its own.
        self.supervisor.stop_services(&active)?;
        self.tracker.record_achieved(ServiceState::FullySuspended);
        Ok(())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
