//! Serialized owner of the convergence record.
//!
//! Callers on arbitrary threads write only the wanted state; the convergence
//! worker writes only the achieved state and the freeze timestamp. All access
//! goes through this tracker, and none of it ever blocks on collaborator I/O.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;

use crate::convergence::signal::WorkSignal;
use crate::types::state::{ConvergenceState, DebugSnapshot, ServiceState};

pub struct StateTracker {
    state: Mutex<ConvergenceState>,
    signal: Arc<WorkSignal>,
}

impl StateTracker {
    pub fn new(signal: Arc<WorkSignal>) -> Self {
        StateTracker {
            state: Mutex::new(ConvergenceState::default()),
            signal,
        }
    }

    fn locked(&self) -> MutexGuard<'_, ConvergenceState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a new wanted state and report whether the achieved state
    /// already satisfies it.
    ///
    /// The worker is woken only when the wanted state actually changes, so
    /// repeated calls with the same still-unconverged target wake it at most
    /// once until the next real change.
    pub fn set_wanted(&self, wanted: ServiceState) -> bool {
        let mut state = self.locked();
        let converged = state.achieved.is_some_and(|a| a.satisfies(wanted));
        if state.wanted != wanted {
            info!(from = ?state.wanted, to = ?wanted, "wanted state changed");
            state.wanted = wanted;
            drop(state);
            self.signal.notify();
        }
        converged
    }

    /// Whether the achieved state satisfies `wanted`. Pure read.
    pub fn is_converged(&self, wanted: ServiceState) -> bool {
        self.locked().achieved.is_some_and(|a| a.satisfies(wanted))
    }

    pub fn wanted(&self) -> ServiceState {
        self.locked().wanted
    }

    pub fn achieved(&self) -> Option<ServiceState> {
        self.locked().achieved
    }

    /// Record the state the worker has confirmed. Worker-only.
    pub fn record_achieved(&self, achieved: ServiceState) {
        let mut state = self.locked();
        if state.achieved != Some(achieved) {
            info!(?achieved, "host converged");
        }
        state.achieved = Some(achieved);
    }

    /// Note when a freeze was first requested for the current suspension
    /// attempt; later calls keep the original timestamp. Worker-only.
    pub fn note_freeze_requested(&self, now_ms: u64) {
        let mut state = self.locked();
        state.freeze_first_requested_ms.get_or_insert(now_ms);
    }

    pub fn clear_freeze_requested(&self) {
        self.locked().freeze_first_requested_ms = None;
    }

    pub fn snapshot(&self) -> DebugSnapshot {
        DebugSnapshot::from(&*self.locked())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> (StateTracker, Arc<WorkSignal>) {
        let signal = Arc::new(WorkSignal::new());
        (StateTracker::new(Arc::clone(&signal)), signal)
    }

    #[test]
    fn starts_wanting_resumed_with_nothing_achieved() {
        let (tracker, _signal) = tracker();
        assert_eq!(tracker.wanted(), ServiceState::Resumed);
        assert!(!tracker.is_converged(ServiceState::Resumed));
    }

    #[test]
    fn set_wanted_wakes_only_on_change() {
        let (tracker, signal) = tracker();

        assert!(!tracker.set_wanted(ServiceState::FullySuspended));
        assert!(signal.take(), "a real change must wake the worker");

        // Same still-unconverged target again: no further wake.
        assert!(!tracker.set_wanted(ServiceState::FullySuspended));
        assert!(!signal.take());

        // A different target wakes again.
        assert!(!tracker.set_wanted(ServiceState::Resumed));
        assert!(signal.take());
    }

    #[test]
    fn set_wanted_reports_satisfaction_under_ordering() {
        let (tracker, _signal) = tracker();
        tracker.record_achieved(ServiceState::FullySuspended);

        // A stronger achieved state satisfies weaker requests immediately.
        assert!(tracker.set_wanted(ServiceState::PartiallySuspended));
        assert!(tracker.set_wanted(ServiceState::FullySuspended));
        assert!(tracker.is_converged(ServiceState::PartiallySuspended));

        // The converse never holds.
        tracker.record_achieved(ServiceState::PartiallySuspended);
        assert!(!tracker.is_converged(ServiceState::FullySuspended));
    }

    #[test]
    fn is_converged_false_until_first_achievement() {
        let (tracker, _signal) = tracker();
        assert!(!tracker.is_converged(ServiceState::Resumed));
        tracker.record_achieved(ServiceState::Resumed);
        assert!(tracker.is_converged(ServiceState::Resumed));
    }

    #[test]
    fn freeze_timestamp_keeps_first_request() {
        let (tracker, _signal) = tracker();
        tracker.note_freeze_requested(1_000);
        tracker.note_freeze_requested(9_000);
        assert_eq!(tracker.snapshot().freeze_first_requested_ms, Some(1_000));

        tracker.clear_freeze_requested();
        assert_eq!(tracker.snapshot().freeze_first_requested_ms, None);
    }

    #[test]
    fn snapshot_reflects_record() {
        let (tracker, _signal) = tracker();
        tracker.set_wanted(ServiceState::PartiallySuspended);
        tracker.record_achieved(ServiceState::PartiallySuspended);
        tracker.note_freeze_requested(42);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.wanted, ServiceState::PartiallySuspended);
        assert_eq!(snapshot.achieved, Some(ServiceState::PartiallySuspended));
        assert_eq!(snapshot.freeze_first_requested_ms, Some(42));
    }
}
