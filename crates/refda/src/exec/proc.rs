// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Expansion of execution targets into item sequences, and the run loop
//! over a single sequence.

use std::sync::Arc;

use super::ctx::CtrlExecCtx;
use super::seq::{ExecItem, ExecSeq, ExecStage};
use super::ExecError;
use crate::amm::{dereference, MatchRes, ObjData};
use crate::ari::Ari;
use crate::instr;
use crate::reporting;
use crate::runctx::RunCtx;
use crate::timeline::TimelineEvent;
use crate::valprod;

/// Expand any ARI target (reference or literal) into items inserted at
/// `index`, which advances past each inserted item.
///
/// CTRL references become items; CONST/VAR/EDD references are produced and
/// their values recursively expanded; a MAC-typed literal AC expands
/// member-wise. Anything else is recorded in `invalid` and fails the
/// expansion.
pub fn expand(
    runctx: &Arc<RunCtx>,
    seq: &mut ExecSeq,
    index: &mut usize,
    target: &Ari,
    invalid: &mut Vec<Ari>,
) -> Result<(), ExecError> {
    if target.is_ref() {
        expand_ref(runctx, seq, index, target, invalid)
    } else {
        let is_mac = {
            let store = runctx.core.store.read();
            runctx.core.mac_type().match_ari(&store, target) == MatchRes::Positive
        };
        if !is_mac {
            log::warn!("attempt to execute a non-MAC literal {}", target);
            invalid.push(target.clone());
            return Err(ExecError::BadType);
        }
        let items = target.as_ac().cloned().unwrap_or_default();
        for member in &items {
            expand(runctx, seq, index, member, invalid)?;
        }
        Ok(())
    }
}

fn expand_ref(
    runctx: &Arc<RunCtx>,
    seq: &mut ExecSeq,
    index: &mut usize,
    target: &Ari,
    invalid: &mut Vec<Ari>,
) -> Result<(), ExecError> {
    let lookup = {
        let store = runctx.core.store.read();
        dereference(&store, target)
    };
    let lookup = match lookup {
        Ok(lookup) => lookup,
        Err(err) => {
            log::debug!("expansion lookup failed: {}", err);
            invalid.push(target.clone());
            return Err(ExecError::DerefFailed);
        }
    };

    match &lookup.obj.data {
        ObjData::Ctrl(_) => {
            // expansion finished, execution comes later
            let item = ExecItem::new(target.clone(), lookup);
            let at = (*index).min(seq.items.len());
            seq.items.insert(at, item);
            *index = at + 1;
            Ok(())
        }
        ObjData::Const(_) | ObjData::Var(_) | ObjData::Edd(_) => {
            match valprod::produce(runctx, &lookup) {
                Ok(value) => expand(runctx, seq, index, &value, invalid),
                Err(err) => {
                    log::debug!("expansion production failed: {}", err);
                    invalid.push(target.clone());
                    Err(ExecError::ProdFailed)
                }
            }
        }
        _ => {
            invalid.push(target.clone());
            Err(ExecError::BadType)
        }
    }
}

/// Run the front of a sequence until it empties or its front item parks
/// itself waiting. Requested timeline events accumulate in `sched`.
pub(crate) fn run_seq(seq: &mut ExecSeq, sched: &mut Vec<TimelineEvent>) {
    loop {
        let Some(front) = seq.items.front().cloned() else {
            break;
        };
        if front.stage() == ExecStage::Waiting {
            // must be resumed later by the timeline
            return;
        }

        if front.stage() == ExecStage::Pending {
            start_ctrl(seq, &front, sched);
        }

        if front.stage() == ExecStage::Waiting {
            log::info!("control is still waiting to finish");
            return;
        }

        finish_item(seq, &front);
    }

    if seq.items.is_empty() {
        if let Some(status) = &seq.status {
            status.notify_finished();
        }
    }
}

/// Invoke the CTRL callback for the front item.
fn start_ctrl(seq: &mut ExecSeq, item: &Arc<ExecItem>, sched: &mut Vec<TimelineEvent>) {
    let ctrl = match item.deref.obj.as_ctrl() {
        Some(c) => c.clone(),
        None => {
            // dereference checked the kind; an item without a CTRL body
            // finishes as a failure
            item.set_result(Ari::undefined());
            item.set_stage(ExecStage::Complete);
            return;
        }
    };

    log::debug!("execution item {}", item.ref_ari);
    item.set_stage(ExecStage::Running);
    let core = seq.runctx.core.clone();
    instr::count(&core.instr.num_ctrls_run);
    {
        let mut ctx = CtrlExecCtx::new(seq, item.clone(), sched);
        (ctrl.execute.0)(&mut ctx);
    }
    log::debug!("execution callback returned");

    if item.stage() == ExecStage::Running {
        // implicit finish
        item.set_stage(ExecStage::Complete);
    }
}

/// Finish the front item: count, report when nonced, and either pop it or
/// halt the whole sequence on failure.
pub(crate) fn finish_item(seq: &mut ExecSeq, item: &Arc<ExecItem>) {
    let result = item.take_result();
    let is_failure = result.is_undefined();

    let runctx = seq.runctx.clone();
    let core = &runctx.core;
    if is_failure {
        instr::count(&core.instr.num_ctrls_failed);
    } else {
        instr::count(&core.instr.num_ctrls_succeeded);
    }

    if !runctx.nonce.is_null() {
        // generate a report regardless of success or failure
        log::debug!("pushing execution result");
        reporting::ctrl_report(&runctx, &item.ref_ari, result);
    }

    if is_failure {
        // done with this whole sequence
        log::warn!(
            "execution of sequence PID {} failed on {}, halting",
            seq.pid,
            item.ref_ari
        );
        if let Some(status) = &seq.status {
            status.set_failed();
        }
        seq.items.clear();
    } else {
        seq.items.pop_front();
    }

    if seq.items.is_empty() {
        if let Some(status) = &seq.status {
            status.notify_finished();
        }
    }
}
