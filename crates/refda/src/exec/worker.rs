// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The execution worker: single consumer of the execs queue and sole
//! mutator of the timeline and sequence list.
//!
//! Each cycle: (i) fire all due timeline events, (ii) process at most one
//! queue input, (iii) run any sequence whose front item is no longer
//! waiting. The worker blocks on the queue, bounded by the earliest
//! timeline deadline.

use std::sync::Arc;

use crossbeam::channel::{Receiver, RecvTimeoutError};

use super::ctx::CtrlExecCtx;
use super::rules;
use super::seq::{ExecSeq, ExecStage, ExecStatus};
use super::{proc, ExecInput};
use crate::agent::{AgentCore, MsgData};
use crate::ari::{Ari, ObjType, TimePoint};
use crate::instr;
use crate::reporting;
use crate::runctx::RunCtx;
use crate::timeline::{EventKind, Timeline, TimelineEvent};

/// Worker-owned execution state.
pub(crate) struct WorkerState {
    pub seqs: Vec<ExecSeq>,
    pub timeline: Timeline,
    /// Events requested by callbacks during this cycle, drained into the
    /// timeline between callback invocations.
    pub sched: Vec<TimelineEvent>,
    pub exec_end: bool,
    pub next_pid: u64,
}

impl WorkerState {
    fn new() -> Self {
        WorkerState {
            seqs: Vec::new(),
            timeline: Timeline::new(),
            sched: Vec::new(),
            exec_end: false,
            next_pid: 0,
        }
    }
}

/// Worker entry point.
pub(crate) fn exec_worker(core: Arc<AgentCore>, rx: Receiver<ExecInput>) {
    log::info!("worker started");
    let mut state = WorkerState::new();
    schedule_startup_rules(&core, &mut state);
    while worker_iteration(&core, &rx, &mut state) {}
    log::info!("worker stopped");
}

/// Schedule every rule registered with its initial enabled flag set.
fn schedule_startup_rules(core: &Arc<AgentCore>, state: &mut WorkerState) {
    let mut tbrs = Vec::new();
    let mut sbrs = Vec::new();
    {
        let store = core.store.read();
        for ns in store.namespaces() {
            for desc in ns.objects(ObjType::Tbr) {
                if desc.as_tbr().is_some_and(|t| t.init_enabled) {
                    tbrs.push(rule_path(ns, ObjType::Tbr, desc));
                }
            }
            for desc in ns.objects(ObjType::Sbr) {
                if desc.as_sbr().is_some_and(|s| s.init_enabled) {
                    sbrs.push(rule_path(ns, ObjType::Sbr, desc));
                }
            }
        }
    }
    for rule in tbrs {
        match rules::tbr_enable(core, &rule) {
            Ok(event) => state.timeline.push(event),
            Err(err) => log::error!("cannot enable TBR {}: {}", rule, err),
        }
    }
    for rule in sbrs {
        match rules::sbr_enable(core, &rule) {
            Ok(event) => state.timeline.push(event),
            Err(err) => log::error!("cannot enable SBR {}: {}", rule, err),
        }
    }
}

fn rule_path(ns: &crate::amm::Namespace, obj_type: ObjType, desc: &crate::amm::ObjDesc) -> Ari {
    use crate::ari::{ObjRef, RefSeg};
    let seg = |id: &crate::amm::IdSeg| match id.intenum {
        Some(e) => RefSeg::Int(e),
        None => RefSeg::name(id.name.clone()),
    };
    Ari::objref(ObjRef::new(
        seg(&ns.org_id),
        seg(&ns.model_id),
        obj_type,
        seg(&desc.id),
    ))
}

/// One worker cycle. Returns false when the worker should exit.
pub(crate) fn worker_iteration(
    core: &Arc<AgentCore>,
    rx: &Receiver<ExecInput>,
    state: &mut WorkerState,
) -> bool {
    let input = match state.timeline.next_ts() {
        Some(next_ts) => {
            let now = TimePoint::now();
            let timeout = next_ts.saturating_since(&now).to_std_clamped();
            log::debug!("waiting for exec input or {:?}", timeout);
            match rx.recv_timeout(timeout) {
                Ok(input) => Some(input),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
        None => {
            log::debug!("waiting for exec input");
            match rx.recv() {
                Ok(input) => Some(input),
                Err(_) => return false,
            }
        }
    };

    // execute due callbacks, up to and including now
    let now = TimePoint::now();
    while let Some(event) = state.timeline.pop_due(now) {
        fire_event(core, state, event);
        drain_sched(state);
    }

    if let Some(input) = input {
        match input {
            ExecInput::Msg(msg) if msg.value.is_undefined() => {
                // sentinel for end-of-input: keep draining non-rule events
                log::info!("got undefined exec, stopping after empty timeline");
                state.exec_end = true;
                state.timeline.retain_exec_only();
            }
            ExecInput::Msg(msg) => add_execset(core, state, &msg),
            ExecInput::Target {
                runctx,
                target,
                status,
            } => add_target(state, runctx, &target, status),
        }
    }

    // execute any sequences that are no longer waiting
    run_ready(state);

    if state.exec_end && state.timeline.is_empty() {
        log::info!("stopping with empty timeline");
        core.push_rpt_sentinel();
        return false;
    }
    true
}

fn drain_sched(state: &mut WorkerState) {
    let WorkerState {
        timeline,
        sched,
        exec_end,
        ..
    } = state;
    for event in sched.drain(..) {
        if *exec_end {
            // the timeline must drain to empty for shutdown; events
            // requested after the end sentinel are discarded
            log::debug!("discarding event scheduled after end-of-stream");
            continue;
        }
        timeline.push(event);
    }
}

/// Fire one due timeline event.
fn fire_event(core: &Arc<AgentCore>, state: &mut WorkerState, event: TimelineEvent) {
    match event.kind {
        EventKind::Exec {
            seq_pid,
            item,
            callback,
        } => {
            let WorkerState { seqs, sched, .. } = state;
            let Some(seq) = seqs.iter_mut().find(|s| s.pid == seq_pid) else {
                log::debug!("resume event for vanished sequence PID {}", seq_pid);
                return;
            };
            instr::count(&core.instr.num_ctrls_run);
            {
                let mut ctx = CtrlExecCtx::new(seq, item.clone(), sched);
                (callback.0)(&mut ctx);
            }
            if item.stage() != ExecStage::Waiting {
                proc::finish_item(seq, &item);
            }
        }
        EventKind::Tbr { rule } => rules::run_tbr(core, state, &rule),
        EventKind::Sbr { rule } => rules::run_sbr(core, state, &rule),
    }
}

/// Expand one incoming EXECSET. Errors in one target do not inhibit the
/// other targets.
fn add_execset(core: &Arc<AgentCore>, state: &mut WorkerState, msg: &MsgData) {
    let Some(execset) = msg.value.as_execset() else {
        log::error!("exec input is not an EXECSET");
        return;
    };
    let targets = execset.targets.clone();
    for target in &targets {
        let runctx = RunCtx::from_msg(core.clone(), msg);
        add_target(state, runctx, target, None);
    }
}

/// Create a sequence for one target and expand it. The sequence is dropped
/// whole if expansion fails; invalid items are reported when nonced.
fn add_target(
    state: &mut WorkerState,
    runctx: Arc<RunCtx>,
    target: &Ari,
    status: Option<Arc<ExecStatus>>,
) {
    let pid = state.next_pid;
    state.next_pid += 1;

    log::debug!(
        "expanding PID {} target {} from manager {}",
        pid,
        target,
        runctx.mgr_ident
    );

    let mut seq = ExecSeq::new(pid, runctx.clone(), status);
    let mut index = 0;
    let mut invalid = Vec::new();
    let res = proc::expand(&runctx, &mut seq, &mut index, target, &mut invalid);

    if !invalid.is_empty() {
        log::error!("expansion failed with {} invalid items", invalid.len());
        if !runctx.nonce.is_null() {
            // report on any failed expansions
            for item in &invalid {
                reporting::ctrl_report(&runctx, item, Ari::undefined());
            }
        }
    }

    match res {
        Ok(()) => {
            if seq.items.is_empty() {
                // nothing to run (e.g. an empty MAC)
                if let Some(s) = &seq.status {
                    s.notify_finished();
                }
            } else {
                state.seqs.push(seq);
            }
        }
        Err(err) => {
            log::error!("sequence PID {} failed to expand: {}", pid, err);
            if let Some(s) = &seq.status {
                s.set_failed();
                s.notify_finished();
            }
        }
    }
}

/// Run every sequence whose front item is not waiting, then drop completed
/// sequences.
fn run_ready(state: &mut WorkerState) {
    let WorkerState { seqs, sched, .. } = state;
    for seq in seqs.iter_mut() {
        let ready = seq
            .items
            .front()
            .is_some_and(|f| f.stage() != ExecStage::Waiting);
        if ready {
            proc::run_seq(seq, sched);
        }
    }
    drain_sched(state);
    state.seqs.retain(|s| !s.items.is_empty());
}
