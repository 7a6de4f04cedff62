//! Edge-triggered wake-up for the convergence worker.
//!
//! A single-slot notification: however many times `notify` is called before
//! the worker wakes, the worker sees exactly one pending wake. This is what
//! keeps repeated `set_wanted` calls from queueing up redundant iterations.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Single-slot, coalescing wake signal.
pub struct WorkSignal {
    pending: Mutex<bool>,
    condvar: Condvar,
}

impl WorkSignal {
    pub fn new() -> Self {
        WorkSignal {
            pending: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Signal that there is work to be done. Coalesces with any signal not
    /// yet consumed.
    pub fn notify(&self) {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *pending = true;
        self.condvar.notify_one();
    }

    /// Sleep until notified or until `timeout` elapses, whichever comes
    /// first, consuming the pending slot. Returns whether a notification was
    /// consumed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        while !*pending {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let (guard, _timed_out) = self
                .condvar
                .wait_timeout(pending, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            pending = guard;
        }
        let was_pending = *pending;
        *pending = false;
        was_pending
    }

    /// Consume the pending slot without waiting.
    pub fn take(&self) -> bool {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *pending, false)
    }
}

impl Default for WorkSignal {
    fn default() -> Self {
        Self::new()
    }
}
