//! Recording fakes for the collaborator contracts.
//!
//! Each mock records every call in order and serves scripted responses,
//! making convergence tests deterministic. The mocks use interior mutability
//! so they can be shared as `Arc<dyn Trait>` with the worker thread.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::types::workload::WorkloadRecord;

use super::{
    AgentSupervisor, InventoryError, Orchestrator, OrchestratorError, SupervisorError,
    WorkloadInventory,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// MockOrchestrator
// ---------------------------------------------------------------------------

/// One recorded orchestrator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorCall {
    Resume { hostname: String },
    Suspend { hostname: String },
    SuspendAll { parent_hostname: String, hostnames: Vec<String> },
}

#[derive(Default)]
struct OrchestratorState {
    calls: Vec<OrchestratorCall>,
    resume_failures: VecDeque<OrchestratorError>,
    suspend_failures: VecDeque<OrchestratorError>,
}

/// Test-double orchestrator: succeeds unless a failure has been scripted.
#[derive(Default)]
pub struct MockOrchestrator {
    state: Mutex<OrchestratorState>,
}

impl MockOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next `resume` call to fail.
    pub fn fail_next_resume(&self, error: OrchestratorError) {
        lock(&self.state).resume_failures.push_back(error);
    }

    /// Script the next `suspend` call to fail.
    pub fn fail_next_suspend(&self, error: OrchestratorError) {
        lock(&self.state).suspend_failures.push_back(error);
    }

    /// All calls executed against this mock, in order.
    pub fn calls(&self) -> Vec<OrchestratorCall> {
        lock(&self.state).calls.clone()
    }

    pub fn resume_count(&self) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|c| matches!(c, OrchestratorCall::Resume { .. }))
            .count()
    }

    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }
}

impl Orchestrator for MockOrchestrator {
    fn resume(&self, hostname: &str) -> Result<(), OrchestratorError> {
        let mut state = lock(&self.state);
        state.calls.push(OrchestratorCall::Resume {
            hostname: hostname.to_string(),
        });
        match state.resume_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn suspend(&self, hostname: &str) -> Result<(), OrchestratorError> {
        let mut state = lock(&self.state);
        state.calls.push(OrchestratorCall::Suspend {
            hostname: hostname.to_string(),
        });
        match state.suspend_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn suspend_all(
        &self,
        parent_hostname: &str,
        hostnames: &[String],
    ) -> Result<(), OrchestratorError> {
        let mut state = lock(&self.state);
        state.calls.push(OrchestratorCall::SuspendAll {
            parent_hostname: parent_hostname.to_string(),
            hostnames: hostnames.to_vec(),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockSupervisor
// ---------------------------------------------------------------------------

/// One recorded supervisor call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorCall {
    SetFrozen(bool),
    StopServices(Vec<String>),
}

struct SupervisorState {
    calls: Vec<SupervisorCall>,
    /// Scripted per-call `set_frozen` results; once drained the default
    /// result applies.
    set_frozen_results: VecDeque<bool>,
    set_frozen_default: bool,
    freeze_duration: Duration,
    stop_failures: VecDeque<SupervisorError>,
}

impl Default for SupervisorState {
    fn default() -> Self {
        SupervisorState {
            calls: Vec::new(),
            set_frozen_results: VecDeque::new(),
            set_frozen_default: true,
            freeze_duration: Duration::ZERO,
            stop_failures: VecDeque::new(),
        }
    }
}

/// Test-double freeze coordinator: converges immediately unless scripted
/// otherwise.
#[derive(Default)]
pub struct MockSupervisor {
    state: Mutex<SupervisorState>,
}

impl MockSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue results for the next `set_frozen` calls, in order.
    pub fn script_set_frozen(&self, results: &[bool]) {
        lock(&self.state).set_frozen_results.extend(results.iter().copied());
    }

    /// Result returned once the scripted queue is drained (default `true`).
    pub fn set_frozen_default(&self, converged: bool) {
        lock(&self.state).set_frozen_default = converged;
    }

    pub fn set_freeze_duration(&self, duration: Duration) {
        lock(&self.state).freeze_duration = duration;
    }

    /// Script the next `stop_services` call to fail.
    pub fn fail_next_stop(&self, error: SupervisorError) {
        lock(&self.state).stop_failures.push_back(error);
    }

    pub fn calls(&self) -> Vec<SupervisorCall> {
        lock(&self.state).calls.clone()
    }

    pub fn unfreeze_count(&self) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|c| matches!(c, SupervisorCall::SetFrozen(false)))
            .count()
    }

    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }
}

impl AgentSupervisor for MockSupervisor {
    fn set_frozen(&self, frozen: bool) -> bool {
        let mut state = lock(&self.state);
        state.calls.push(SupervisorCall::SetFrozen(frozen));
        state
            .set_frozen_results
            .pop_front()
            .unwrap_or(state.set_frozen_default)
    }

    fn freeze_duration(&self) -> Duration {
        lock(&self.state).freeze_duration
    }

    fn stop_services(&self, hostnames: &[String]) -> Result<(), SupervisorError> {
        let mut state = lock(&self.state);
        state.calls.push(SupervisorCall::StopServices(hostnames.to_vec()));
        match state.stop_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// MockInventory
// ---------------------------------------------------------------------------

#[derive(Default)]
struct InventoryState {
    workloads: HashMap<String, Vec<WorkloadRecord>>,
    failures: VecDeque<InventoryError>,
    list_count: usize,
}

/// Test-double inventory: serves pre-loaded workload lists per hostname.
/// Unknown hostnames get an empty list.
#[derive(Default)]
pub struct MockInventory {
    state: Mutex<InventoryState>,
}

impl MockInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_workloads(&self, hostname: &str, workloads: Vec<WorkloadRecord>) {
        lock(&self.state).workloads.insert(hostname.to_string(), workloads);
    }

    /// Script the next `list_workloads` call to fail.
    pub fn fail_next_list(&self, error: InventoryError) {
        lock(&self.state).failures.push_back(error);
    }

    pub fn list_count(&self) -> usize {
        lock(&self.state).list_count
    }
}

impl WorkloadInventory for MockInventory {
    fn list_workloads(&self, hostname: &str) -> Result<Vec<WorkloadRecord>, InventoryError> {
        let mut state = lock(&self.state);
        state.list_count += 1;
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }
        Ok(state.workloads.get(hostname).cloned().unwrap_or_default())
    }
}
