//! The convergence engine — tracks wanted vs achieved host state and drives
//! the host toward the wanted state one corrective step per iteration.
//!
//! `tracker` owns the state record behind serialized accessors; `signal`
//! provides the edge-triggered wake used when the wanted state changes;
//! `cycle` performs a single convergence iteration; `worker` runs the cycle
//! on a dedicated thread with timer/wake/shutdown plumbing.

pub mod cycle;
pub mod signal;
pub mod tracker;
pub mod worker;
