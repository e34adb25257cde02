// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CTRL execution context: the interface a CTRL callback (or a timeline
//! resume callback) has to its item, its sequence, and the scheduler.

use std::sync::Arc;

use super::proc;
use super::seq::{ExecItem, ExecSeq, ExecStage};
use crate::amm::CtrlExecutor;
use crate::ari::{Ari, TimePoint};
use crate::runctx::RunCtx;
use crate::timeline::TimelineEvent;

/// Context for one CTRL callback invocation.
///
/// The callback may set a result (sequence continues), request waiting via a
/// timeline event (sequence pauses, resumed later), or splice further
/// targets just past itself with [`CtrlExecCtx::exec_next`] for branching.
/// Leaving the result unset is treated as failure.
pub struct CtrlExecCtx<'a> {
    pub runctx: Arc<RunCtx>,
    pub item: Arc<ExecItem>,
    pub(crate) seq: &'a mut ExecSeq,
    /// Events requested during the callback; the worker drains them into
    /// the timeline after the callback returns.
    pub(crate) sched: &'a mut Vec<TimelineEvent>,
}

impl<'a> CtrlExecCtx<'a> {
    pub(crate) fn new(
        seq: &'a mut ExecSeq,
        item: Arc<ExecItem>,
        sched: &'a mut Vec<TimelineEvent>,
    ) -> Self {
        let runctx = seq.runctx.clone();
        CtrlExecCtx {
            runctx,
            item,
            seq,
            sched,
        }
    }

    pub fn aparam_index(&self, i: usize) -> Option<&Ari> {
        self.item.deref.aparams.index(i)
    }

    pub fn aparam_name(&self, name: &str) -> Option<&Ari> {
        self.item.deref.aparams.name(name)
    }

    pub fn has_aparam_undefined(&self) -> bool {
        self.item.deref.aparams.any_undefined
    }

    /// Set the CTRL result value and mark the item complete. When called
    /// from a timeline resume this clears the waiting stage.
    pub fn set_result(&mut self, value: Ari) {
        self.item.set_result(value);
        self.item.set_stage(ExecStage::Complete);
    }

    /// Successful completion without a value.
    pub fn set_result_null(&mut self) {
        self.set_result(Ari::null());
    }

    /// Park this item and request a resume callback at `ts`. The worker
    /// pushes the event onto the timeline once the callback returns.
    pub fn set_waiting(&mut self, ts: TimePoint, resume: CtrlExecutor) {
        self.item.set_stage(ExecStage::Waiting);
        self.sched.push(TimelineEvent::exec(
            ts,
            self.seq.pid,
            self.item.clone(),
            resume,
        ));
    }

    /// Request an arbitrary timeline event (used by rule-control CTRLs).
    pub fn schedule(&mut self, event: TimelineEvent) {
        self.sched.push(event);
    }

    /// Splice a further target immediately after the currently executing
    /// front item. This insertion point is what lets `if-then-else` and
    /// `catch` branch from within a still-executing item.
    pub fn exec_next(&mut self, target: &Ari) -> Result<(), super::ExecError> {
        let runctx = self.runctx.clone();
        let mut index = 1usize.min(self.seq.items.len());
        let mut invalid = Vec::new();
        proc::expand(&runctx, self.seq, &mut index, target, &mut invalid)
    }
}
