// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Reporting: RPTT walking, item production/evaluation, and RPTSET
//! assembly onto the egress queue.

use std::fmt;

use crate::agent::{AgentCore, MsgData};
use crate::amm::{dereference, MatchRes, ObjData};
use crate::ari::{Ari, Report, TimeDuration, TimePoint};
use crate::eval;
use crate::instr;
use crate::runctx::RunCtx;
use crate::valprod;

/// Reporting failure.
#[derive(Debug, Clone)]
pub enum ReportingError {
    /// The target is neither an RPTT literal nor a reference producing one.
    BadType { what: String },
    /// The target reference did not dereference.
    DerefFailed { what: String },
    /// No destination to report to.
    NoDestination,
}

impl fmt::Display for ReportingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportingError::BadType { what } => write!(f, "cannot report on {}", what),
            ReportingError::DerefFailed { what } => {
                write!(f, "report target dereference failed for {}", what)
            }
            ReportingError::NoDestination => f.write_str("attempted to report to no destination"),
        }
    }
}

impl std::error::Error for ReportingError {}

/// Assemble a one-item report directly from a CTRL result, destined to the
/// manager that caused the execution. The caller checks the nonce; a
/// context without a manager identity reports nowhere.
pub fn ctrl_report(runctx: &RunCtx, target: &Ari, result: Ari) {
    if runctx.mgr_ident.is_undefined() {
        // nothing to do
        return;
    }

    let rptset = Ari::rptset(
        runctx.nonce.clone(),
        TimePoint::now(),
        vec![Report {
            reltime: TimeDuration::ZERO,
            source: target.clone(),
            items: vec![result],
        }],
    );
    log::debug!("generated an execution report");
    runctx.core.send_rpt(MsgData {
        ident: runctx.mgr_ident.clone(),
        value: rptset,
    });
    instr::count(&runctx.core.instr.num_rptset_sent);
}

/// Report on a target: resolve it to an RPTT, produce or evaluate each
/// template item, and enqueue a one-report RPTSET to `destination`.
pub fn report_target(runctx: &RunCtx, target: &Ari, destination: &Ari) -> Result<(), ReportingError> {
    if destination.is_undefined() {
        log::warn!("attempted to report to undefined manager");
        return Err(ReportingError::NoDestination);
    }
    log::debug!("reporting to {} for target {}", destination, target);

    let items = collect_items(runctx, target)?;
    report_gen(&runctx.core, destination, target, items);
    Ok(())
}

/// Resolve the target down to an RPTT literal and walk it.
fn collect_items(runctx: &RunCtx, target: &Ari) -> Result<Vec<Ari>, ReportingError> {
    if target.is_ref() {
        let lookup = {
            let store = runctx.core.store.read();
            dereference(&store, target).map_err(|_| ReportingError::DerefFailed {
                what: target.to_string(),
            })?
        };
        return match &lookup.obj.data {
            ObjData::Const(_) | ObjData::Var(_) | ObjData::Edd(_) => {
                let value =
                    valprod::produce(runctx, &lookup).map_err(|_| ReportingError::BadType {
                        what: target.to_string(),
                    })?;
                collect_items(runctx, &value)
            }
            _ => Err(ReportingError::BadType {
                what: target.to_string(),
            }),
        };
    }

    let is_rptt = {
        let store = runctx.core.store.read();
        runctx.core.rptt_type().match_ari(&store, target) == MatchRes::Positive
    };
    if !is_rptt {
        log::warn!("attempted reporting on a non-RPTT literal");
        return Err(ReportingError::BadType {
            what: target.to_string(),
        });
    }

    let template = target.as_ac().cloned().unwrap_or_default();
    let mut items = Vec::with_capacity(template.len());
    for rptt_item in &template {
        log::debug!("report template item {}", rptt_item);
        let item = if rptt_item.is_ref() {
            produce_item(runctx, rptt_item)
        } else {
            evaluate_item(runctx, rptt_item)
        };
        log::debug!("report item {}", item);
        items.push(item);
    }
    Ok(items)
}

/// A reference template item is a value-producing activity; the produced
/// value is the report item. Failures leave the slot undefined.
fn produce_item(runctx: &RunCtx, rptt_item: &Ari) -> Ari {
    let lookup = {
        let store = runctx.core.store.read();
        match dereference(&store, rptt_item) {
            Ok(lookup) => lookup,
            Err(err) => {
                log::debug!("reporting item reference lookup failed: {}", err);
                return Ari::undefined();
            }
        }
    };
    match &lookup.obj.data {
        ObjData::Const(_) | ObjData::Var(_) | ObjData::Edd(_) => {
            valprod::produce(runctx, &lookup).unwrap_or_else(|_| Ari::undefined())
        }
        _ => {
            log::debug!("reporting item reference to non-value-producing object");
            Ari::undefined()
        }
    }
}

/// A literal template item is an EXPR; the evaluated result is the report
/// item. Failures leave the slot undefined.
fn evaluate_item(runctx: &RunCtx, rptt_item: &Ari) -> Ari {
    match eval::eval_target(runctx, rptt_item) {
        Ok(value) => value,
        Err(err) => {
            log::warn!("reporting item failed to evaluate: {}", err);
            Ari::undefined()
        }
    }
}

/// Assemble and enqueue a one-report RPTSET with a null nonce.
pub fn report_gen(core: &AgentCore, destination: &Ari, source: &Ari, items: Vec<Ari>) {
    if destination.is_undefined() {
        log::warn!("attempted to report to undefined destination");
        return;
    }

    let count = items.len();
    let rptset = Ari::rptset(
        Ari::null(),
        TimePoint::now(),
        vec![Report {
            reltime: TimeDuration::ZERO,
            source: source.clone(),
            items,
        }],
    );
    log::info!(
        "generated a report destined to {} from source {} with {} items",
        destination,
        source,
        count
    );
    core.send_rpt(MsgData {
        ident: destination.clone(),
        value: rptset,
    });
    instr::count(&core.instr.num_rptset_sent);
}
