//! Round-robin host selection

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::Balancer;
use crate::host::Host;

/// Cyclic rotation over the configured hosts, in configuration order.
///
/// The cursor starts one before the list and is advanced, modulo the current
/// list length, before indexing, so the first call returns the host at index
/// 0. The advance is a single atomic update, which keeps the rotation strict
/// when one client is shared across tasks. No jitter, no weighting, no
/// health awareness.
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self {
            // Wraps to 0 on the first advance
            cursor: AtomicUsize::new(usize::MAX),
        }
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        Self::new()
    }
}

impl Balancer for RoundRobin {
    fn host<'a>(&self, hosts: &'a [Arc<Host>]) -> &'a Arc<Host> {
        debug_assert!(!hosts.is_empty());
        let len = hosts.len();
        // fetch_update returns the previous value; the closure never yields
        // None, so both arms carry it.
        let prev = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                Some(c.wrapping_add(1) % len)
            })
            .unwrap_or_else(|c| c);
        &hosts[prev.wrapping_add(1) % len]
    }
}
