// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution bookkeeping: sequences of items, item stages, and the
//! externally observable sequence status.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::amm::Lookup;
use crate::ari::Ari;
use crate::runctx::RunCtx;

/// Stage of one execution item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExecStage {
    Pending = 0,
    Waiting = 1,
    Running = 2,
    Complete = 3,
}

impl ExecStage {
    fn from_u8(v: u8) -> ExecStage {
        match v {
            0 => ExecStage::Pending,
            1 => ExecStage::Waiting,
            2 => ExecStage::Running,
            _ => ExecStage::Complete,
        }
    }
}

/// One CTRL invocation in flight. Shared between its sequence and any
/// timeline resume event.
pub struct ExecItem {
    /// The original reference ARI, reported as the source of ctrl-reports.
    pub ref_ari: Ari,
    /// The resolved dereference record with bound actual parameters.
    pub deref: Lookup,
    stage: AtomicU8,
    result: Mutex<Ari>,
}

impl ExecItem {
    pub fn new(ref_ari: Ari, deref: Lookup) -> Arc<ExecItem> {
        Arc::new(ExecItem {
            ref_ari,
            deref,
            stage: AtomicU8::new(ExecStage::Pending as u8),
            result: Mutex::new(Ari::undefined()),
        })
    }

    pub fn stage(&self) -> ExecStage {
        ExecStage::from_u8(self.stage.load(Ordering::Acquire))
    }

    pub fn set_stage(&self, stage: ExecStage) {
        self.stage.store(stage as u8, Ordering::Release);
    }

    pub fn set_result(&self, value: Ari) {
        *self.result.lock() = value;
    }

    /// Move the result out, leaving undefined behind.
    pub fn take_result(&self) -> Ari {
        std::mem::replace(&mut *self.result.lock(), Ari::undefined())
    }
}

/// Externally observable sequence completion: a failed flag plus a
/// wait-able finished notification.
#[derive(Default)]
pub struct ExecStatus {
    failed: AtomicBool,
    finished: Mutex<bool>,
    cv: Condvar,
}

impl ExecStatus {
    pub fn new() -> Arc<ExecStatus> {
        Arc::new(ExecStatus::default())
    }

    pub fn set_failed(&self) {
        self.failed.store(true, Ordering::Release);
    }

    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    pub fn notify_finished(&self) {
        let mut done = self.finished.lock();
        *done = true;
        self.cv.notify_all();
    }

    /// Block until the sequence finishes or the timeout elapses. Returns
    /// whether it finished.
    pub fn wait_finished(&self, timeout: Duration) -> bool {
        let mut done = self.finished.lock();
        if *done {
            return true;
        }
        self.cv.wait_for(&mut done, timeout);
        *done
    }
}

/// A sequence: a monotonic pid, its run context, an optional status, and
/// the ordered items. Owned by the execution worker.
pub struct ExecSeq {
    pub pid: u64,
    pub runctx: Arc<RunCtx>,
    pub status: Option<Arc<ExecStatus>>,
    pub items: VecDeque<Arc<ExecItem>>,
}

impl ExecSeq {
    pub fn new(pid: u64, runctx: Arc<RunCtx>, status: Option<Arc<ExecStatus>>) -> Self {
        ExecSeq {
            pid,
            runctx,
            status,
            items: VecDeque::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wait_after_notify() {
        let status = ExecStatus::new();
        status.notify_finished();
        assert!(status.wait_finished(Duration::from_millis(1)));
        assert!(!status.is_failed());
        status.set_failed();
        assert!(status.is_failed());
    }

    #[test]
    fn test_status_wait_times_out() {
        let status = ExecStatus::new();
        assert!(!status.wait_finished(Duration::from_millis(10)));
    }
}
