// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Rule engine: TBR periodic execution and SBR condition polling.
//!
//! Rules are addressed by their object paths; the descriptor state lives in
//! the store and is mutated under the store lock. The next event is always
//! scheduled before the action expands, so the cadence is independent of
//! action complexity.

use std::sync::Arc;

use super::seq::ExecSeq;
use super::worker::WorkerState;
use super::{proc, ExecError};
use crate::agent::AgentCore;
use crate::amm::{ObjStore, SbrData, TbrData};
use crate::ari::{Ari, AriType, TimePoint};
use crate::eval;
use crate::instr;
use crate::runctx::RunCtx;
use crate::timeline::TimelineEvent;

fn with_tbr_mut<T>(
    store: &mut ObjStore,
    rule: &Ari,
    f: impl FnOnce(&mut TbrData) -> T,
) -> Result<T, ExecError> {
    let r = rule.as_ref_path().ok_or(ExecError::BadRule)?;
    let ns = store
        .find_namespace_mut(&r.org, &r.model)
        .ok_or(ExecError::BadRule)?;
    let desc = ns
        .find_object_mut(crate::ari::ObjType::Tbr, &r.obj)
        .ok_or(ExecError::BadRule)?;
    let tbr = desc.as_tbr_mut().ok_or(ExecError::BadRule)?;
    Ok(f(tbr))
}

fn with_sbr_mut<T>(
    store: &mut ObjStore,
    rule: &Ari,
    f: impl FnOnce(&mut SbrData) -> T,
) -> Result<T, ExecError> {
    let r = rule.as_ref_path().ok_or(ExecError::BadRule)?;
    let ns = store
        .find_namespace_mut(&r.org, &r.model)
        .ok_or(ExecError::BadRule)?;
    let desc = ns
        .find_object_mut(crate::ari::ObjType::Sbr, &r.obj)
        .ok_or(ExecError::BadRule)?;
    let sbr = desc.as_sbr_mut().ok_or(ExecError::BadRule)?;
    Ok(f(sbr))
}

/// The next scheduled time for a TBR. On the starting run: an absolute TP
/// start is used directly, a zero TD starts now, and any other TD offsets
/// the rule's absolute start reference. Afterwards: now plus the period.
fn tbr_next_scheduled_time(tbr: &TbrData, starting: bool) -> Result<TimePoint, ExecError> {
    if starting {
        if let Some(tp) = tbr.start_time.as_tp() {
            return Ok(tp);
        }
        if let Some(td) = tbr.start_time.as_td() {
            if td.is_zero() {
                // rule is always active, start it now
                return Ok(TimePoint::now());
            }
            return tbr
                .absolute_start
                .checked_add(&td)
                .ok_or(ExecError::BadRule);
        }
        log::error!("invalid start time for TBR");
        return Err(ExecError::BadRule);
    }
    TimePoint::now()
        .checked_add(&tbr.period)
        .ok_or(ExecError::BadRule)
}

/// Enable a TBR: reset its run count and compute the first event. Returns
/// the event for the caller to schedule (via the worker or a CTRL context).
pub fn tbr_enable(core: &Arc<AgentCore>, rule: &Ari) -> Result<TimelineEvent, ExecError> {
    let mut store = core.store.write();
    let ts = with_tbr_mut(&mut store, rule, |tbr| {
        if tbr.action.lit_type() != Some(AriType::Ac) {
            log::error!("invalid TBR action, unable to enable the rule");
            return Err(ExecError::BadRule);
        }
        tbr.enabled = true;
        tbr.exec_count = 0;
        tbr_next_scheduled_time(tbr, true)
    })??;
    instr::count(&core.instr.num_tbrs);
    Ok(TimelineEvent::tbr(ts, rule.clone()))
}

pub fn tbr_disable(core: &Arc<AgentCore>, rule: &Ari) -> Result<(), ExecError> {
    let mut store = core.store.write();
    with_tbr_mut(&mut store, rule, |tbr| {
        tbr.enabled = false;
    })?;
    instr::uncount(&core.instr.num_tbrs);
    Ok(())
}

/// Enable an SBR: validate its action and condition, reset the count, and
/// compute the first poll at now plus the minimum interval.
pub fn sbr_enable(core: &Arc<AgentCore>, rule: &Ari) -> Result<TimelineEvent, ExecError> {
    let mut store = core.store.write();
    let ts = with_sbr_mut(&mut store, rule, |sbr| {
        if sbr.action.lit_type() != Some(AriType::Ac) {
            log::error!("invalid SBR action, unable to enable the rule");
            return Err(ExecError::BadRule);
        }
        if sbr.condition.lit_type() != Some(AriType::Ac) {
            log::error!("invalid SBR condition, unable to enable the rule");
            return Err(ExecError::BadRule);
        }
        sbr.enabled = true;
        sbr.exec_count = 0;
        TimePoint::now()
            .checked_add(&sbr.min_interval)
            .ok_or(ExecError::BadRule)
    })??;
    instr::count(&core.instr.num_sbrs);
    Ok(TimelineEvent::sbr(ts, rule.clone()))
}

pub fn sbr_disable(core: &Arc<AgentCore>, rule: &Ari) -> Result<(), ExecError> {
    let mut store = core.store.write();
    with_sbr_mut(&mut store, rule, |sbr| {
        sbr.enabled = false;
    })?;
    instr::uncount(&core.instr.num_sbrs);
    Ok(())
}

/// Expand a rule's action as a new agent-directed sequence.
fn expand_rule_action(
    core: &Arc<AgentCore>,
    state: &mut WorkerState,
    action: &Ari,
) -> Result<(), ExecError> {
    let runctx = RunCtx::agent_own(core.clone());
    let pid = state.next_pid;
    state.next_pid += 1;
    let mut seq = ExecSeq::new(pid, runctx.clone(), None);
    let mut index = 0;
    let mut invalid = Vec::new();
    proc::expand(&runctx, &mut seq, &mut index, action, &mut invalid)?;
    if !seq.items.is_empty() {
        state.seqs.push(seq);
    }
    Ok(())
}

/// Outcome of the under-lock preparation step of a rule run.
enum Prepared<T> {
    /// The rule was not enabled; nothing to do.
    Disabled,
    /// The rule hit its execution threshold and was disabled here.
    MaxReached,
    Ready(T),
}

/// One firing of a time-based rule.
pub(crate) fn run_tbr(core: &Arc<AgentCore>, state: &mut WorkerState, rule: &Ari) {
    let prepared = {
        let mut store = core.store.write();
        with_tbr_mut(&mut store, rule, |tbr| {
            if !tbr.enabled {
                log::info!("TBR {} is not enabled", rule);
                return Prepared::Disabled;
            }
            if tbr.reached_max_exec_count() {
                log::info!("TBR {} reached maximum execution count", rule);
                tbr.enabled = false;
                return Prepared::MaxReached;
            }
            Prepared::Ready((tbr_next_scheduled_time(tbr, false), tbr.action.clone()))
        })
    };
    let (next, action) = match prepared {
        Ok(Prepared::Ready(pair)) => pair,
        Ok(Prepared::MaxReached) => {
            instr::uncount(&core.instr.num_tbrs);
            return;
        }
        Ok(Prepared::Disabled) | Err(_) => return,
    };

    // schedule the next run first, so the period is independent of the
    // action's expansion cost
    if !state.exec_end {
        match next {
            Ok(ts) => state.timeline.push(TimelineEvent::tbr(ts, rule.clone())),
            Err(err) => log::error!("cannot reschedule TBR {}: {}", rule, err),
        }
    }

    if expand_rule_action(core, state, &action).is_ok() {
        let mut store = core.store.write();
        let _ = with_tbr_mut(&mut store, rule, |tbr| tbr.exec_count += 1);
        instr::count(&core.instr.num_tbrs_trig);
    }
}

/// One poll of a state-based rule.
pub(crate) fn run_sbr(core: &Arc<AgentCore>, state: &mut WorkerState, rule: &Ari) {
    let prepared = {
        let mut store = core.store.write();
        with_sbr_mut(&mut store, rule, |sbr| {
            if !sbr.enabled {
                log::info!("SBR {} is not enabled", rule);
                return Prepared::Disabled;
            }
            if sbr.reached_max_exec_count() {
                log::info!("SBR {} reached maximum execution count", rule);
                sbr.enabled = false;
                return Prepared::MaxReached;
            }
            let next = TimePoint::now().checked_add(&sbr.min_interval);
            Prepared::Ready((next, sbr.condition.clone(), sbr.action.clone()))
        })
    };
    let (next, condition, action) = match prepared {
        Ok(Prepared::Ready(triple)) => triple,
        Ok(Prepared::MaxReached) => {
            instr::uncount(&core.instr.num_sbrs);
            return;
        }
        Ok(Prepared::Disabled) | Err(_) => return,
    };

    // reschedule before evaluating, so the poll interval is independent of
    // condition complexity
    if !state.exec_end {
        match next {
            Some(ts) => state.timeline.push(TimelineEvent::sbr(ts, rule.clone())),
            None => log::error!("cannot reschedule SBR {}", rule),
        }
    }

    // evaluate the condition over a fresh agent-own context
    let runctx = RunCtx::agent_own(core.clone());
    let truthy = match eval::eval_condition(&runctx, &condition) {
        Ok(value) => value.is_truthy(),
        Err(err) => {
            // the rule does not fire this tick
            log::warn!("SBR {} condition failed to evaluate: {}", rule, err);
            return;
        }
    };
    log::info!("SBR {} condition is {}", rule, truthy);

    if truthy && expand_rule_action(core, state, &action).is_ok() {
        let mut store = core.store.write();
        let _ = with_sbr_mut(&mut store, rule, |sbr| sbr.exec_count += 1);
        instr::count(&core.instr.num_sbrs_trig);
    }
}
