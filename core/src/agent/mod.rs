//! Per-node agents and the registry that coordinates their freeze state.
//!
//! The convergence core only consumes the `AgentSupervisor` contract; this
//! module provides the in-process implementation of it over a fleet of
//! per-agent handles, one per workload on the host.

pub mod registry;

pub use registry::{AgentRegistry, NodeAgentHandle};
