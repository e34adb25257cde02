// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Agent instrumentation counters, exposed read-only through EDDs.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counter block. All counters are monotonic within one process
/// lifetime; none persist across restarts.
#[derive(Debug, Default)]
pub struct Instr {
    pub num_execset_recv: AtomicU64,
    pub num_execset_recv_failure: AtomicU64,
    pub num_ctrls_run: AtomicU64,
    pub num_ctrls_succeeded: AtomicU64,
    pub num_ctrls_failed: AtomicU64,
    pub num_tbrs: AtomicU64,
    pub num_sbrs: AtomicU64,
    pub num_tbrs_trig: AtomicU64,
    pub num_sbrs_trig: AtomicU64,
    pub num_rptset_sent: AtomicU64,
}

impl Instr {
    pub fn new() -> Self {
        Instr::default()
    }
}

/// Relaxed increment; counters are advisory.
pub fn count(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Relaxed decrement, saturating at zero is not required (paired with
/// `count` on the same counter).
pub fn uncount(counter: &AtomicU64) {
    counter.fetch_sub(1, Ordering::Relaxed);
}

/// Relaxed read.
pub fn read(counter: &AtomicU64) -> u64 {
    counter.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero_and_count() {
        let instr = Instr::new();
        assert_eq!(read(&instr.num_ctrls_run), 0);
        count(&instr.num_ctrls_run);
        count(&instr.num_ctrls_run);
        assert_eq!(read(&instr.num_ctrls_run), 2);
        count(&instr.num_tbrs);
        uncount(&instr.num_tbrs);
        assert_eq!(read(&instr.num_tbrs), 0);
    }
}
