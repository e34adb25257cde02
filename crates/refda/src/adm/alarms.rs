// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The `ietf/alarms` ADM: alarm resource/category IDENTs, the alarm-list
//! EDD, and the alarm maintenance CTRLs.

use std::sync::Arc;

use super::{amm_base, IETF_ORG_ENUM, IETF_ORG_NAME};
use crate::agent::{AgentCore, AgentError};
use crate::alarms::AlarmEntry;
use crate::amm::{
    CtrlData, CtrlExecutor, EddData, EddProducer, FormalParam, IdSeg, IdentData, ObjData, ObjDesc,
    SemType,
};
use crate::ari::{Ari, AriType, ObjType, Table};
use crate::eval;
use crate::exec::CtrlExecCtx;
use crate::runctx::RunCtx;

pub const MODEL_NAME: &str = "alarms";
pub const MODEL_ENUM: i64 = 2;
pub const MODEL_REVISION: &str = "2025-07-03";

pub const IDENT_RESOURCE: i64 = 1;
pub const IDENT_CATEGORY: i64 = 2;
pub const EDD_ALARM_LIST: i64 = 3;
pub const CTRL_SET_ALARM: i64 = 4;
pub const CTRL_CLEAR_ALARM: i64 = 5;
pub const CTRL_ACK_ALARM: i64 = 6;
pub const CTRL_PURGE_ALARMS: i64 = 7;
pub const CTRL_COMPRESS_ALARMS: i64 = 8;

/// Evaluate a filter EXPR against one alarm entry. Items that are the
/// `severity` label are substituted with the entry's current severity.
fn filter_matches(runctx: &RunCtx, filter: &[Ari], entry: &AlarmEntry) -> bool {
    let substituted: Vec<Ari> = filter
        .iter()
        .map(|item| match item.as_label() {
            Some("severity") => Ari::uint(entry.severity),
            _ => item.clone(),
        })
        .collect();
    match eval::eval_target(runctx, &Ari::ac(substituted)) {
        Ok(value) => value.is_truthy(),
        Err(err) => {
            log::warn!("alarm filter failed to evaluate: {}", err);
            false
        }
    }
}

fn ctrl_set_alarm(ctx: &mut CtrlExecCtx<'_>) {
    let (Some(resource), Some(severity)) = (
        ctx.aparam_index(0).cloned(),
        ctx.aparam_index(2).and_then(|v| v.as_uint()),
    ) else {
        log::error!("set-alarm requires a resource and a severity");
        return;
    };
    let category = ctx.aparam_index(1).cloned().unwrap_or_else(Ari::null);
    ctx.runctx.core.alarms.set_refs(resource, category, severity);
    ctx.set_result_null();
}

fn ctrl_clear_alarm(ctx: &mut CtrlExecCtx<'_>) {
    let Some(resource) = ctx.aparam_index(0).cloned() else {
        return;
    };
    let category = ctx.aparam_index(1).cloned().unwrap_or_else(Ari::null);
    if ctx.runctx.core.alarms.remove(&resource, &category) {
        ctx.set_result_null();
    } else {
        log::warn!("clear-alarm found no entry for {}", resource);
    }
}

fn ctrl_ack_alarm(ctx: &mut CtrlExecCtx<'_>) {
    let Some(resource) = ctx.aparam_index(0).cloned() else {
        return;
    };
    let category = ctx.aparam_index(1).cloned().unwrap_or_else(Ari::null);
    let mgr = ctx.runctx.mgr_ident.clone();
    if ctx.runctx.core.alarms.ack(&resource, &category, mgr) {
        ctx.set_result_null();
    }
}

fn ctrl_purge_alarms(ctx: &mut CtrlExecCtx<'_>) {
    let Some(filter) = ctx.aparam_index(0).and_then(|v| v.as_ac()).cloned() else {
        return;
    };
    let runctx = ctx.runctx.clone();
    let removed = ctx
        .runctx
        .core
        .alarms
        .purge(|entry| filter_matches(&runctx, &filter, entry));
    ctx.set_result(Ari::uint(removed as u64));
}

fn ctrl_compress_alarms(ctx: &mut CtrlExecCtx<'_>) {
    let Some(filter) = ctx.aparam_index(0).and_then(|v| v.as_ac()).cloned() else {
        return;
    };
    let runctx = ctx.runctx.clone();
    let touched = ctx
        .runctx
        .core
        .alarms
        .compress(|entry| filter_matches(&runctx, &filter, entry));
    ctx.set_result(Ari::uint(touched as u64));
}

/// Register the module.
pub fn init(core: &Arc<AgentCore>) -> Result<(), AgentError> {
    let mut store = core.store.write();
    let ns = store.add_namespace(
        IdSeg::with_enum(IETF_ORG_NAME, IETF_ORG_ENUM),
        IdSeg::with_enum(MODEL_NAME, MODEL_ENUM),
        MODEL_REVISION,
    )?;

    ns.register(
        ObjType::Ident,
        ObjDesc::new(
            IdSeg::with_enum("resource", IDENT_RESOURCE),
            ObjData::Ident(IdentData::default()),
        ),
    )?;
    ns.register(
        ObjType::Ident,
        ObjDesc::new(
            IdSeg::with_enum("category", IDENT_CATEGORY),
            ObjData::Ident(IdentData::default()),
        ),
    )?;

    ns.register(
        ObjType::Edd,
        ObjDesc::new(
            IdSeg::with_enum("alarm-list", EDD_ALARM_LIST),
            ObjData::Edd(EddData {
                typ: SemType::Builtin(AriType::Tbl),
                produce: EddProducer::new(|ctx| {
                    let mut table = Table::new(3);
                    for entry in ctx.runctx.core.alarms.entries() {
                        table.push_row(vec![
                            entry.resource.clone(),
                            entry.category.clone(),
                            Ari::uint(entry.severity),
                        ]);
                    }
                    ctx.set_result(Ari::tbl(table));
                }),
            }),
        ),
    )?;

    let resource_param = || FormalParam::new("resource", SemType::Builtin(AriType::Ident));
    let category_param = || {
        FormalParam::with_default(
            "category",
            SemType::union(vec![
                SemType::Builtin(AriType::Ident),
                SemType::Builtin(AriType::Null),
            ]),
            Ari::null(),
        )
    };

    let mut register = |name: &str,
                        obj_enum: i64,
                        fparams: Vec<FormalParam>,
                        body: fn(&mut CtrlExecCtx<'_>)| {
        ns.register(
            ObjType::Ctrl,
            ObjDesc::new(
                IdSeg::with_enum(name, obj_enum),
                ObjData::Ctrl(CtrlData {
                    result_typ: None,
                    execute: CtrlExecutor::new(body),
                }),
            )
            .with_params(fparams),
        )
        .map(|_| ())
        .map_err(AgentError::from)
    };

    register(
        "set-alarm",
        CTRL_SET_ALARM,
        vec![
            resource_param(),
            category_param(),
            FormalParam::new("severity", amm_base::integer_type()),
        ],
        ctrl_set_alarm,
    )?;
    register(
        "clear-alarm",
        CTRL_CLEAR_ALARM,
        vec![resource_param(), category_param()],
        ctrl_clear_alarm,
    )?;
    register(
        "ack-alarm",
        CTRL_ACK_ALARM,
        vec![resource_param(), category_param()],
        ctrl_ack_alarm,
    )?;
    register(
        "purge-alarms",
        CTRL_PURGE_ALARMS,
        vec![FormalParam::new("filter", amm_base::expr_type())],
        ctrl_purge_alarms,
    )?;
    register(
        "compress-alarms",
        CTRL_COMPRESS_ALARMS,
        vec![FormalParam::new("filter", amm_base::expr_type())],
        ctrl_compress_alarms,
    )?;

    log::debug!("registered {}/{}", IETF_ORG_NAME, MODEL_NAME);
    Ok(())
}
