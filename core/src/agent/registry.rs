//! Fleet-level freeze coordination over per-agent handles.
//!
//! Each node agent manages one workload over its lifecycle and converges
//! toward a frozen/unfrozen target asynchronously. The registry fans a
//! freeze request out to every agent and reports convergence of the whole
//! set; `freeze_duration` reports how long the current freeze window has
//! been open, which is what the convergence loop compares against the
//! freeze convergence timeout.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::infrastructure::{AgentSupervisor, SupervisorError};

/// One node agent, responsible for a single workload.
pub trait NodeAgentHandle: Send + Sync {
    fn hostname(&self) -> &str;

    /// Ask the agent to converge to the given frozen state. Returns whether
    /// it has reached it, not whether the request was accepted.
    fn set_frozen(&self, frozen: bool) -> bool;

    /// Stop the services of this agent's workload.
    fn stop_services(&self) -> Result<(), SupervisorError>;
}

/// `AgentSupervisor` over the set of registered node agents.
#[derive(Default)]
pub struct AgentRegistry {
    agents: Mutex<HashMap<String, Arc<dyn NodeAgentHandle>>>,
    /// When the current freeze window opened. Set on the first freeze
    /// request, cleared only by an unfreeze request — the clock keeps
    /// running after the agents converge, so a frozen host that the
    /// orchestrator refuses to suspend still times out eventually.
    freeze_started: Mutex<Option<Instant>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn NodeAgentHandle>>> {
        self.agents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn freeze_started(&self) -> MutexGuard<'_, Option<Instant>> {
        self.freeze_started
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register an agent for its workload hostname.
    pub fn register(&self, handle: Arc<dyn NodeAgentHandle>) -> Result<(), SupervisorError> {
        let hostname = handle.hostname().to_string();
        let mut agents = self.locked();
        if agents.contains_key(&hostname) {
            return Err(SupervisorError::AlreadyRegistered(hostname));
        }
        debug!(%hostname, "node agent registered");
        agents.insert(hostname, handle);
        Ok(())
    }

    /// Remove the agent for a workload that left the host.
    pub fn remove(&self, hostname: &str) -> Result<(), SupervisorError> {
        if self.locked().remove(hostname).is_none() {
            return Err(SupervisorError::UnknownAgent(hostname.to_string()));
        }
        debug!(%hostname, "node agent removed");
        Ok(())
    }

    pub fn hostnames(&self) -> Vec<String> {
        self.locked().keys().cloned().collect()
    }
}

impl AgentSupervisor for AgentRegistry {
    fn set_frozen(&self, frozen: bool) -> bool {
        {
            let mut started = self.freeze_started();
            if frozen {
                started.get_or_insert_with(Instant::now);
            } else {
                *started = None;
            }
        }
        let mut all_converged = true;
        for handle in self.locked().values() {
            all_converged &= handle.set_frozen(frozen);
        }
        all_converged
    }

    fn freeze_duration(&self) -> Duration {
        match *self.freeze_started() {
            Some(started) => started.elapsed(),
            None => Duration::ZERO,
        }
    }

    fn stop_services(&self, hostnames: &[String]) -> Result<(), SupervisorError> {
        let agents = self.locked();
        for hostname in hostnames {
            let handle = agents
                .get(hostname)
                .ok_or_else(|| SupervisorError::UnknownAgent(hostname.clone()))?;
            handle.stop_services()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Scriptable agent: converges iff `willing` is set; records calls.
    struct FakeAgent {
        hostname: String,
        willing: AtomicBool,
        freeze_calls: AtomicUsize,
        stop_calls: AtomicUsize,
        fail_stop: AtomicBool,
    }

    impl FakeAgent {
        fn new(hostname: &str) -> Arc<FakeAgent> {
            Arc::new(FakeAgent {
                hostname: hostname.to_string(),
                willing: AtomicBool::new(true),
                freeze_calls: AtomicUsize::new(0),
                stop_calls: AtomicUsize::new(0),
                fail_stop: AtomicBool::new(false),
            })
        }
    }

    impl NodeAgentHandle for FakeAgent {
        fn hostname(&self) -> &str {
            &self.hostname
        }

        fn set_frozen(&self, _frozen: bool) -> bool {
            self.freeze_calls.fetch_add(1, Ordering::SeqCst);
            self.willing.load(Ordering::SeqCst)
        }

        fn stop_services(&self) -> Result<(), SupervisorError> {
            self.stop_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_stop.load(Ordering::SeqCst) {
                return Err(SupervisorError::StopServices {
                    hostname: self.hostname.clone(),
                    reason: "unit busy".into(),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn registration_is_unique_per_hostname() {
        let registry = AgentRegistry::new();
        registry.register(FakeAgent::new("w1")).unwrap();
        let err = registry.register(FakeAgent::new("w1")).unwrap_err();
        assert!(matches!(err, SupervisorError::AlreadyRegistered(_)));

        registry.remove("w1").unwrap();
        assert!(matches!(
            registry.remove("w1").unwrap_err(),
            SupervisorError::UnknownAgent(_)
        ));
    }

    #[test]
    fn freeze_converges_only_when_every_agent_does() {
        let registry = AgentRegistry::new();
        let fast = FakeAgent::new("w1");
        let slow = FakeAgent::new("w2");
        slow.willing.store(false, Ordering::SeqCst);
        registry.register(Arc::clone(&fast) as Arc<dyn NodeAgentHandle>).unwrap();
        registry.register(Arc::clone(&slow) as Arc<dyn NodeAgentHandle>).unwrap();

        assert!(!registry.set_frozen(true));
        assert_eq!(fast.freeze_calls.load(Ordering::SeqCst), 1);
        assert_eq!(slow.freeze_calls.load(Ordering::SeqCst), 1);

        slow.willing.store(true, Ordering::SeqCst);
        assert!(registry.set_frozen(true));
    }

    #[test]
    fn empty_registry_is_trivially_converged() {
        let registry = AgentRegistry::new();
        assert!(registry.set_frozen(true));
        assert!(registry.set_frozen(false));
        assert_eq!(registry.freeze_duration(), Duration::ZERO);
    }

    #[test]
    fn freeze_duration_keeps_growing_after_agents_converge() {
        let registry = AgentRegistry::new();
        let agent = FakeAgent::new("w1");
        registry.register(Arc::clone(&agent) as Arc<dyn NodeAgentHandle>).unwrap();

        assert_eq!(registry.freeze_duration(), Duration::ZERO);

        // Converges on the very first request, but the window stays open.
        assert!(registry.set_frozen(true));
        std::thread::sleep(Duration::from_millis(10));
        assert!(registry.freeze_duration() >= Duration::from_millis(10));

        assert!(registry.set_frozen(true));
        assert!(registry.freeze_duration() >= Duration::from_millis(10));
    }

    #[test]
    fn repeated_freeze_requests_keep_the_first_clock() {
        let registry = AgentRegistry::new();
        let stuck = FakeAgent::new("w1");
        stuck.willing.store(false, Ordering::SeqCst);
        registry.register(Arc::clone(&stuck) as Arc<dyn NodeAgentHandle>).unwrap();

        registry.set_frozen(true);
        std::thread::sleep(Duration::from_millis(10));
        registry.set_frozen(true);
        assert!(registry.freeze_duration() >= Duration::from_millis(10));
    }

    #[test]
    fn unfreeze_resets_the_freeze_clock() {
        let registry = AgentRegistry::new();
        let agent = FakeAgent::new("w1");
        registry.register(Arc::clone(&agent) as Arc<dyn NodeAgentHandle>).unwrap();

        registry.set_frozen(true);
        std::thread::sleep(Duration::from_millis(10));
        assert!(registry.freeze_duration() >= Duration::from_millis(10));

        registry.set_frozen(false);
        assert_eq!(registry.freeze_duration(), Duration::ZERO);
    }

    #[test]
    fn stop_services_touches_only_named_agents() {
        let registry = AgentRegistry::new();
        let named = FakeAgent::new("w1");
        let other = FakeAgent::new("w2");
        registry.register(Arc::clone(&named) as Arc<dyn NodeAgentHandle>).unwrap();
        registry.register(Arc::clone(&other) as Arc<dyn NodeAgentHandle>).unwrap();

        registry.stop_services(&["w1".to_string()]).unwrap();
        assert_eq!(named.stop_calls.load(Ordering::SeqCst), 1);
        assert_eq!(other.stop_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stop_services_unknown_hostname_is_an_error() {
        let registry = AgentRegistry::new();
        let err = registry.stop_services(&["ghost".to_string()]).unwrap_err();
        assert!(matches!(err, SupervisorError::UnknownAgent(_)));
    }

    #[test]
    fn stop_services_propagates_agent_failure() {
        let registry = AgentRegistry::new();
        let flaky = FakeAgent::new("w1");
        flaky.fail_stop.store(true, Ordering::SeqCst);
        registry.register(Arc::clone(&flaky) as Arc<dyn NodeAgentHandle>).unwrap();

        assert!(registry.stop_services(&["w1".to_string()]).is_err());

        flaky.fail_stop.store(false, Ordering::SeqCst);
        assert!(registry.stop_services(&["w1".to_string()]).is_ok());
    }

    #[test]
    fn hostnames_lists_registered_agents() {
        let registry = AgentRegistry::new();
        registry.register(FakeAgent::new("w1")).unwrap();
        registry.register(FakeAgent::new("w2")).unwrap();
        let mut names = registry.hostnames();
        names.sort();
        assert_eq!(names, vec!["w1", "w2"]);
    }
}
