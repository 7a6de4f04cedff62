//! The convergence worker thread and the `Steward` handle around it.
//!
//! Exactly one dedicated thread runs the convergence cycle; iterations never
//! overlap. Between iterations the worker sleeps for the converge interval
//! unless the wake signal fires first (wanted-state change or shutdown).
//! Callers of the `Steward` API only ever touch the state tracker — they are
//! never blocked by orchestrator or freeze I/O happening inside an iteration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info};

use crate::convergence::cycle::ConvergeCycle;
use crate::convergence::signal::WorkSignal;
use crate::convergence::tracker::StateTracker;
use crate::infrastructure::{AgentSupervisor, Orchestrator, WorkloadInventory};
use crate::types::config::ConvergenceConfig;
use crate::types::state::{DebugSnapshot, ServiceState};

/// Owns the convergence worker for one host. Dropping (or calling `stop`)
/// shuts the worker down and joins it; after that no further collaborator
/// calls occur.
pub struct Steward {
    tracker: Arc<StateTracker>,
    signal: Arc<WorkSignal>,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Steward {
    /// Spawn the worker. The first iteration runs immediately: the achieved
    /// state starts out unknown, so the host converges once at startup even
    /// if nobody asks for anything.
    pub fn start(
        hostname: impl Into<String>,
        config: &ConvergenceConfig,
        orchestrator: Arc<dyn Orchestrator>,
        supervisor: Arc<dyn AgentSupervisor>,
        inventory: Arc<dyn WorkloadInventory>,
    ) -> Steward {
        let hostname = hostname.into();
        let signal = Arc::new(WorkSignal::new());
        let tracker = Arc::new(StateTracker::new(Arc::clone(&signal)));
        let shutdown = Arc::new(AtomicBool::new(false));

        let cycle = ConvergeCycle::new(
            hostname.clone(),
            config.freeze_timeout(),
            Arc::clone(&tracker),
            orchestrator,
            supervisor,
            inventory,
        );
        let interval = config.converge_interval();
        let worker = {
            let signal = Arc::clone(&signal);
            let shutdown = Arc::clone(&shutdown);
            std::thread::spawn(move || run_worker(cycle, signal, shutdown, interval))
        };

        info!(%hostname, "convergence worker started");
        Steward {
            tracker,
            signal,
            shutdown,
            worker: Some(worker),
        }
    }

    /// Record a new wanted state; returns whether the achieved state already
    /// satisfies it. A change wakes the worker for an immediate iteration.
    pub fn set_wanted(&self, wanted: ServiceState) -> bool {
        self.tracker.set_wanted(wanted)
    }

    /// Whether the achieved state satisfies `wanted`. Pure read, safe to
    /// poll from any thread.
    pub fn is_converged(&self, wanted: ServiceState) -> bool {
        self.tracker.is_converged(wanted)
    }

    pub fn debug_snapshot(&self) -> DebugSnapshot {
        self.tracker.snapshot()
    }

    /// Graceful shutdown: cancel the current sleep, let any in-flight
    /// iteration finish, and join the worker.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.signal.notify();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
            info!("convergence worker stopped");
        }
    }
}

impl Drop for Steward {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

fn run_worker(
    cycle: ConvergeCycle,
    signal: Arc<WorkSignal>,
    shutdown: Arc<AtomicBool>,
    interval: Duration,
) {
    while !shutdown.load(Ordering::SeqCst) {
        cycle.run_cycle();
        if signal.wait_timeout(interval) {
            debug!("woken early for another convergence pass");
        }
    }
}
