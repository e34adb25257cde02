// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The `ietf/dtnma-agent` ADM: agent introspection EDDs, the control-flow
//! and state-mutation CTRLs, and the builtin OPER set.

use std::sync::Arc;

use super::{amm_base, IETF_ORG_ENUM, IETF_ORG_NAME};
use crate::agent::{AgentCore, AgentError};
use crate::amm::{
    dereference, CtrlData, CtrlExecutor, EddData, EddProducer, FormalParam, IdSeg, NamedType,
    ObjData, ObjDesc, OperData, OperEvaluator, SemType, VarData,
};
use crate::ari::{Ari, AriType, LitValue, ObjRef, ObjType, Real, Table, TimeDuration, TimePoint};
use crate::config;
use crate::eval::{self, OperEvalCtx};
use crate::exec::rules;
use crate::exec::CtrlExecCtx;
use crate::instr;
use crate::reporting;
use crate::valprod;

pub const MODEL_NAME: &str = "dtnma-agent";
pub const MODEL_ENUM: i64 = 1;
pub const MODEL_REVISION: &str = "2025-07-03";

// Object enumerations for ./edd/*
pub const EDD_SW_VENDOR: i64 = 1;
pub const EDD_SW_VERSION: i64 = 2;
pub const EDD_CAPABILITY: i64 = 3;
pub const EDD_NUM_EXECSET_RECV: i64 = 4;
pub const EDD_NUM_CTRLS_RUN: i64 = 5;
pub const EDD_NUM_CTRLS_SUCCEEDED: i64 = 6;
pub const EDD_NUM_CTRLS_FAILED: i64 = 7;
pub const EDD_NUM_TBRS_TRIG: i64 = 8;
pub const EDD_NUM_SBRS_TRIG: i64 = 9;
pub const EDD_NAMESPACE_LIST: i64 = 10;

// Object enumerations for ./ctrl/*
pub const CTRL_IF_THEN_ELSE: i64 = 1;
pub const CTRL_CATCH: i64 = 2;
pub const CTRL_WAIT_FOR: i64 = 3;
pub const CTRL_WAIT_UNTIL: i64 = 4;
pub const CTRL_WAIT_COND: i64 = 5;
pub const CTRL_INSPECT: i64 = 6;
pub const CTRL_REPORT_ON: i64 = 7;
pub const CTRL_VAR_STORE: i64 = 8;
pub const CTRL_VAR_RESET: i64 = 9;
pub const CTRL_ENSURE_VAR: i64 = 10;
pub const CTRL_OBSOLETE_VAR: i64 = 11;
pub const CTRL_TBR_ENABLE: i64 = 12;
pub const CTRL_TBR_DISABLE: i64 = 13;
pub const CTRL_SBR_ENABLE: i64 = 14;
pub const CTRL_SBR_DISABLE: i64 = 15;

// Object enumerations for ./oper/*
pub const OPER_NEGATE: i64 = 1;
pub const OPER_ADD: i64 = 2;
pub const OPER_SUB: i64 = 3;
pub const OPER_MULTIPLY: i64 = 4;
pub const OPER_DIVIDE: i64 = 5;
pub const OPER_REMAINDER: i64 = 6;
pub const OPER_BIT_NOT: i64 = 7;
pub const OPER_BIT_AND: i64 = 8;
pub const OPER_BIT_OR: i64 = 9;
pub const OPER_BIT_XOR: i64 = 10;
pub const OPER_BOOL_NOT: i64 = 11;
pub const OPER_BOOL_AND: i64 = 12;
pub const OPER_BOOL_OR: i64 = 13;
pub const OPER_BOOL_XOR: i64 = 14;
pub const OPER_COMPARE_EQ: i64 = 15;
pub const OPER_COMPARE_NE: i64 = 16;
pub const OPER_COMPARE_GT: i64 = 17;
pub const OPER_COMPARE_GE: i64 = 18;
pub const OPER_COMPARE_LT: i64 = 19;
pub const OPER_COMPARE_LE: i64 = 20;
pub const OPER_TBL_FILTER: i64 = 21;
pub const OPER_LIST_GET: i64 = 22;
pub const OPER_MAP_GET: i64 = 23;

/// Reference to one of this module's objects.
pub fn obj_ref(obj_type: ObjType, obj_enum: i64) -> Ari {
    Ari::objref(ObjRef::with_enums(
        IETF_ORG_ENUM,
        MODEL_ENUM,
        obj_type,
        obj_enum,
    ))
}

// ---------------------------------------------------------------------------
// Numeric promotion helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Num {
    U(u64),
    I(i64),
    R(f64),
}

fn num_of(v: &Ari) -> Option<Num> {
    match v.as_lit().map(|l| &l.value) {
        Some(LitValue::Uint(u)) => Some(Num::U(*u)),
        Some(LitValue::Int(i)) => Some(Num::I(*i)),
        Some(LitValue::Real(Real(r))) => Some(Num::R(*r)),
        _ => None,
    }
}

fn as_f64(n: Num) -> f64 {
    match n {
        Num::U(u) => u as f64,
        Num::I(i) => i as f64,
        Num::R(r) => r,
    }
}

/// Promote a pair to the least compatible of {uint64, int64, real64}.
enum Promoted {
    U(u64, u64),
    I(i64, i64),
    R(f64, f64),
}

fn promote(a: Num, b: Num) -> Promoted {
    match (a, b) {
        (Num::U(x), Num::U(y)) => Promoted::U(x, y),
        (Num::R(_), _) | (_, Num::R(_)) => Promoted::R(as_f64(a), as_f64(b)),
        _ => {
            let xi = match a {
                Num::U(u) => i64::try_from(u),
                Num::I(i) => Ok(i),
                Num::R(_) => unreachable!(),
            };
            let yi = match b {
                Num::U(u) => i64::try_from(u),
                Num::I(i) => Ok(i),
                Num::R(_) => unreachable!(),
            };
            match (xi, yi) {
                (Ok(x), Ok(y)) => Promoted::I(x, y),
                // a uint too large for int64 falls back to real
                _ => Promoted::R(as_f64(a), as_f64(b)),
            }
        }
    }
}

fn numeric_binary(
    a: &Ari,
    b: &Ari,
    fu: impl Fn(u64, u64) -> Option<u64>,
    fi: impl Fn(i64, i64) -> Option<i64>,
    fr: impl Fn(f64, f64) -> Option<f64>,
) -> Option<Ari> {
    let (na, nb) = (num_of(a)?, num_of(b)?);
    match promote(na, nb) {
        Promoted::U(x, y) => fu(x, y).map(Ari::uint),
        Promoted::I(x, y) => fi(x, y).map(Ari::int),
        Promoted::R(x, y) => fr(x, y).map(Ari::real),
    }
}

fn integer_binary(
    a: &Ari,
    b: &Ari,
    fu: impl Fn(u64, u64) -> u64,
    fi: impl Fn(i64, i64) -> i64,
) -> Option<Ari> {
    let (na, nb) = (num_of(a)?, num_of(b)?);
    match promote(na, nb) {
        Promoted::U(x, y) => Some(Ari::uint(fu(x, y))),
        Promoted::I(x, y) => Some(Ari::int(fi(x, y))),
        Promoted::R(..) => None,
    }
}

/// TD and TP addition/subtraction matrix; `None` defers to numerics.
fn time_add(a: &Ari, b: &Ari) -> Option<Ari> {
    match (a.as_td(), a.as_tp(), b.as_td(), b.as_tp()) {
        (Some(x), _, Some(y), _) => x.checked_add(&y).map(Ari::td),
        (Some(x), _, _, Some(y)) => y.checked_add(&x).map(Ari::tp),
        (_, Some(x), Some(y), _) => x.checked_add(&y).map(Ari::tp),
        _ => None,
    }
}

fn time_sub(a: &Ari, b: &Ari) -> Option<Ari> {
    match (a.as_td(), a.as_tp(), b.as_td(), b.as_tp()) {
        (_, Some(x), _, Some(y)) => x.checked_sub(&y).map(Ari::td),
        (_, Some(x), Some(y), _) => x.checked_sub_td(&y).map(Ari::tp),
        (Some(x), _, Some(y), _) => x.checked_sub(&y).map(Ari::td),
        _ => None,
    }
}

/// TD scaled by a numeric; infinite, NaN, or (for division) zero scalars
/// yield no value.
fn time_scale(a: &Ari, b: &Ari, divide: bool) -> Option<Ari> {
    let (td, scalar) = match (a.as_td(), b.as_td()) {
        (Some(td), None) => (td, num_of(b)?),
        (None, Some(td)) if !divide => (td, num_of(a)?),
        _ => return None,
    };
    let s = as_f64(scalar);
    if divide {
        td.checked_div_f64(s).map(Ari::td)
    } else {
        td.checked_mul_f64(s).map(Ari::td)
    }
}

fn compare_ordered(a: &Ari, b: &Ari) -> Option<std::cmp::Ordering> {
    if let (Some(x), Some(y)) = (a.as_td(), b.as_td()) {
        return Some(x.cmp(&y));
    }
    if let (Some(x), Some(y)) = (a.as_tp(), b.as_tp()) {
        return Some(x.cmp(&y));
    }
    match promote(num_of(a)?, num_of(b)?) {
        Promoted::U(x, y) => Some(x.cmp(&y)),
        Promoted::I(x, y) => Some(x.cmp(&y)),
        Promoted::R(x, y) => x.partial_cmp(&y),
    }
}

// ---------------------------------------------------------------------------
// CTRL bodies
// ---------------------------------------------------------------------------

/// Resume callback for `wait-for` and `wait-until`.
fn ctrl_wait_finished(ctx: &mut CtrlExecCtx<'_>) {
    ctx.set_result_null();
}

fn ctrl_wait_for(ctx: &mut CtrlExecCtx<'_>) {
    let Some(duration) = ctx.aparam_index(0).and_then(|p| p.as_td()) else {
        log::error!("no time duration given");
        return;
    };
    let Some(ts) = TimePoint::now().checked_add(&duration) else {
        log::error!("wait-for duration out of range");
        return;
    };
    ctx.set_waiting(ts, CtrlExecutor::new(ctrl_wait_finished));
}

fn ctrl_wait_until(ctx: &mut CtrlExecCtx<'_>) {
    let Some(ts) = ctx.aparam_index(0).and_then(|p| p.as_tp()) else {
        log::error!("no time point given");
        return;
    };
    ctx.set_waiting(ts, CtrlExecutor::new(ctrl_wait_finished));
}

/// Initial call and timeline re-check for `wait-cond`.
fn ctrl_wait_cond_check(ctx: &mut CtrlExecCtx<'_>) {
    let Some(cond) = ctx.aparam_index(0).cloned() else {
        log::error!("no parameter");
        return;
    };

    let result = match eval::eval_target(&ctx.runctx, &cond) {
        Ok(value) => value,
        Err(err) => {
            log::error!("failed to evaluate condition: {}", err);
            Ari::bool(false)
        }
    };

    if result.is_truthy() {
        ctx.set_result(result);
    } else {
        // check again after the poll interval
        let Some(ts) =
            TimePoint::now().checked_add(&TimeDuration::from_millis(config::WAIT_COND_POLL_MS))
        else {
            return;
        };
        ctx.set_waiting(ts, CtrlExecutor::new(ctrl_wait_cond_check));
    }
}

fn ctrl_if_then_else(ctx: &mut CtrlExecCtx<'_>) {
    if ctx.has_aparam_undefined() {
        log::error!("invalid parameter, unable to continue");
        return;
    }
    let condition = ctx.aparam_index(0).cloned().unwrap_or_else(Ari::undefined);
    let on_truthy = ctx.aparam_index(1).cloned().unwrap_or_else(Ari::null);
    let on_falsy = ctx.aparam_index(2).cloned().unwrap_or_else(Ari::null);

    let branch = match eval::eval_condition(&ctx.runctx, &condition) {
        Ok(value) => value.is_truthy(),
        Err(err) => {
            log::error!("unable to evaluate if-then-else condition: {}", err);
            return;
        }
    };

    let taken = if branch { on_truthy } else { on_falsy };
    if !taken.is_null() {
        if let Err(err) = ctx.exec_next(&taken) {
            log::error!("if-then-else branch failed to expand: {}", err);
            return;
        }
    }
    ctx.set_result(Ari::bool(branch));
}

fn ctrl_catch(ctx: &mut CtrlExecCtx<'_>) {
    if ctx.has_aparam_undefined() {
        log::error!("invalid parameter, unable to continue");
        return;
    }
    let try_tgt = ctx.aparam_index(0).cloned().unwrap_or_else(Ari::undefined);
    let on_failure = ctx.aparam_index(1).cloned().unwrap_or_else(Ari::null);

    let mut try_success = true;
    if ctx.exec_next(&try_tgt).is_err() {
        try_success = false;
        if !on_failure.is_null() {
            if let Err(err) = ctx.exec_next(&on_failure) {
                log::error!("catch failure branch also failed to expand: {}", err);
            }
        }
    }
    ctx.set_result(Ari::bool(try_success));
}

fn ctrl_inspect(ctx: &mut CtrlExecCtx<'_>) {
    let Some(target) = ctx.aparam_index(0).cloned() else {
        return;
    };
    let lookup = {
        let store = ctx.runctx.core.store.read();
        dereference(&store, &target)
    };
    let lookup = match lookup {
        Ok(lookup) => lookup,
        Err(err) => {
            log::warn!("inspect lookup failed for {}: {}", target, err);
            return;
        }
    };
    match valprod::produce(&ctx.runctx, &lookup) {
        Ok(value) => ctx.set_result(value),
        Err(err) => {
            // not setting a result is treated as failure
            log::warn!("inspect production failed: {}", err);
        }
    }
}

fn ctrl_report_on(ctx: &mut CtrlExecCtx<'_>) {
    let Some(template) = ctx.aparam_index(0).cloned() else {
        return;
    };
    let dest_param = ctx.aparam_index(1).cloned().unwrap_or_else(Ari::null);
    let destination = if dest_param.is_null() {
        ctx.runctx.mgr_ident.clone()
    } else {
        dest_param
    };
    match reporting::report_target(&ctx.runctx, &template, &destination) {
        Ok(()) => ctx.set_result_null(),
        Err(err) => log::warn!("report-on failed: {}", err),
    }
}

fn ctrl_var_store(ctx: &mut CtrlExecCtx<'_>) {
    let (Some(target), Some(value)) = (
        ctx.aparam_index(0).cloned(),
        ctx.aparam_index(1).cloned(),
    ) else {
        return;
    };
    let Some(r) = target.as_ref_path().filter(|r| r.obj_type == ObjType::Var) else {
        log::error!("var-store target is not a VAR reference");
        return;
    };

    // the whole read-coerce-store cycle happens under one lock hold
    let mut store = ctx.runctx.core.store.write();
    let Some(typ) = store
        .find_namespace(&r.org, &r.model)
        .and_then(|ns| ns.find_object(ObjType::Var, &r.obj))
        .and_then(|desc| desc.as_var())
        .map(|var| var.typ.clone())
    else {
        log::error!("var-store target {} not found", target);
        return;
    };
    // coerce through the variable's declared type before storing
    let converted = match typ.convert(&store, &value) {
        Ok(v) if !v.is_undefined() => v,
        _ => {
            log::error!("var-store value does not fit the variable type");
            return;
        }
    };
    let updated = store
        .find_namespace_mut(&r.org, &r.model)
        .and_then(|ns| ns.find_object_mut(ObjType::Var, &r.obj))
        .and_then(|desc| desc.as_var_mut())
        .map(|var| var.value = converted);
    drop(store);
    if updated.is_some() {
        ctx.set_result_null();
    }
}

fn ctrl_var_reset(ctx: &mut CtrlExecCtx<'_>) {
    let Some(target) = ctx.aparam_index(0).cloned() else {
        return;
    };
    let Some(r) = target.as_ref_path().filter(|r| r.obj_type == ObjType::Var) else {
        return;
    };
    let mut store = ctx.runctx.core.store.write();
    let updated = store
        .find_namespace_mut(&r.org, &r.model)
        .and_then(|ns| ns.find_object_mut(ObjType::Var, &r.obj))
        .and_then(|desc| desc.as_var_mut())
        .map(|var| var.value = var.init.clone());
    if updated.is_some() {
        drop(store);
        ctx.set_result_null();
    }
}

/// Create a VAR in an ODM namespace (or refresh an existing one).
fn ctrl_ensure_var(ctx: &mut CtrlExecCtx<'_>) {
    let (Some(target), Some(init)) = (
        ctx.aparam_index(0).cloned(),
        ctx.aparam_index(1).cloned(),
    ) else {
        return;
    };
    let Some(r) = target.as_ref_path().filter(|r| r.obj_type == ObjType::Var) else {
        return;
    };

    // mutation and the follow-up binding pass share one lock hold
    let mut store = ctx.runctx.core.store.write();
    let Some(ns) = store.find_namespace_mut(&r.org, &r.model) else {
        log::error!("ensure-var namespace not found for {}", target);
        return;
    };
    if !ns.is_odm() {
        log::error!("ensure-var refused on immutable ADM namespace");
        return;
    }
    let created = if let Some(desc) = ns.find_object_mut(ObjType::Var, &r.obj) {
        if let Some(var) = desc.as_var_mut() {
            var.init = init.clone();
            var.value = init;
        }
        true
    } else {
        let id = match &r.obj {
            crate::ari::RefSeg::Int(e) => IdSeg::with_enum(format!("var-{}", e), *e),
            crate::ari::RefSeg::Name(n) => IdSeg::named(n.clone()),
        };
        ns.register(
            ObjType::Var,
            ObjDesc::new(id, ObjData::Var(VarData::new(amm_base::any_type(), init))),
        )
        .is_ok()
    };
    if !created {
        return;
    }

    // re-run the binding pass after the ODM mutation
    if let Err(err) = store.bind_refs() {
        log::error!("binding pass failed after ensure-var: {}", err);
        return;
    }
    drop(store);
    ctx.set_result_null();
}

/// Hide an ODM VAR from enumeration without deleting it.
fn ctrl_obsolete_var(ctx: &mut CtrlExecCtx<'_>) {
    let Some(target) = ctx.aparam_index(0).cloned() else {
        return;
    };
    let Some(r) = target.as_ref_path().filter(|r| r.obj_type == ObjType::Var) else {
        return;
    };
    let mut store = ctx.runctx.core.store.write();
    let Some(ns) = store.find_namespace_mut(&r.org, &r.model) else {
        return;
    };
    if !ns.is_odm() {
        log::error!("obsolete-var refused on immutable ADM namespace");
        return;
    }
    if let Some(desc) = ns.find_object_mut(ObjType::Var, &r.obj) {
        desc.obsolete = true;
        drop(store);
        ctx.set_result_null();
    }
}

fn ctrl_tbr_enable(ctx: &mut CtrlExecCtx<'_>) {
    let Some(target) = ctx.aparam_index(0).cloned() else {
        return;
    };
    let core = ctx.runctx.core.clone();
    match rules::tbr_enable(&core, &target) {
        Ok(event) => {
            ctx.schedule(event);
            ctx.set_result_null();
        }
        Err(err) => log::error!("tbr-enable failed for {}: {}", target, err),
    }
}

fn ctrl_tbr_disable(ctx: &mut CtrlExecCtx<'_>) {
    let Some(target) = ctx.aparam_index(0).cloned() else {
        return;
    };
    let core = ctx.runctx.core.clone();
    match rules::tbr_disable(&core, &target) {
        Ok(()) => ctx.set_result_null(),
        Err(err) => log::error!("tbr-disable failed for {}: {}", target, err),
    }
}

fn ctrl_sbr_enable(ctx: &mut CtrlExecCtx<'_>) {
    let Some(target) = ctx.aparam_index(0).cloned() else {
        return;
    };
    let core = ctx.runctx.core.clone();
    match rules::sbr_enable(&core, &target) {
        Ok(event) => {
            ctx.schedule(event);
            ctx.set_result_null();
        }
        Err(err) => log::error!("sbr-enable failed for {}: {}", target, err),
    }
}

fn ctrl_sbr_disable(ctx: &mut CtrlExecCtx<'_>) {
    let Some(target) = ctx.aparam_index(0).cloned() else {
        return;
    };
    let core = ctx.runctx.core.clone();
    match rules::sbr_disable(&core, &target) {
        Ok(()) => ctx.set_result_null(),
        Err(err) => log::error!("sbr-disable failed for {}: {}", target, err),
    }
}

// ---------------------------------------------------------------------------
// OPER bodies
// ---------------------------------------------------------------------------

fn oper_negate(ctx: &mut OperEvalCtx<'_>) {
    let Some(val) = ctx.operand_index(0) else {
        return;
    };
    let result = match num_of(val) {
        // unsigned stays unsigned, negating by wraparound
        Some(Num::U(u)) => Some(Ari::uint(u.wrapping_neg())),
        Some(Num::I(i)) => i.checked_neg().map(Ari::int),
        Some(Num::R(r)) => Some(Ari::real(-r)),
        None => val.as_td().and_then(|td| td.checked_neg()).map(Ari::td),
    };
    if let Some(result) = result {
        ctx.set_result(result);
    }
}

fn oper_add(ctx: &mut OperEvalCtx<'_>) {
    let (Some(a), Some(b)) = (ctx.operand_index(0), ctx.operand_index(1)) else {
        return;
    };
    let result = time_add(a, b).or_else(|| {
        numeric_binary(a, b, u64::checked_add, i64::checked_add, |x, y| Some(x + y))
    });
    if let Some(result) = result {
        ctx.set_result(result);
    }
}

fn oper_sub(ctx: &mut OperEvalCtx<'_>) {
    let (Some(a), Some(b)) = (ctx.operand_index(0), ctx.operand_index(1)) else {
        return;
    };
    let result = time_sub(a, b).or_else(|| {
        numeric_binary(a, b, u64::checked_sub, i64::checked_sub, |x, y| Some(x - y))
    });
    if let Some(result) = result {
        ctx.set_result(result);
    }
}

fn oper_multiply(ctx: &mut OperEvalCtx<'_>) {
    let (Some(a), Some(b)) = (ctx.operand_index(0), ctx.operand_index(1)) else {
        return;
    };
    let result = time_scale(a, b, false).or_else(|| {
        numeric_binary(a, b, u64::checked_mul, i64::checked_mul, |x, y| Some(x * y))
    });
    if let Some(result) = result {
        ctx.set_result(result);
    }
}

fn oper_divide(ctx: &mut OperEvalCtx<'_>) {
    let (Some(a), Some(b)) = (ctx.operand_index(0), ctx.operand_index(1)) else {
        return;
    };
    let result = time_scale(a, b, true).or_else(|| {
        numeric_binary(
            a,
            b,
            u64::checked_div,
            |x, y| x.checked_div(y),
            |x, y| if y == 0.0 { None } else { Some(x / y) },
        )
    });
    if let Some(result) = result {
        ctx.set_result(result);
    }
}

fn oper_remainder(ctx: &mut OperEvalCtx<'_>) {
    let (Some(a), Some(b)) = (ctx.operand_index(0), ctx.operand_index(1)) else {
        return;
    };
    let result = numeric_binary(
        a,
        b,
        u64::checked_rem,
        |x, y| x.checked_rem(y),
        |x, y| if y == 0.0 { None } else { Some(x % y) },
    );
    if let Some(result) = result {
        ctx.set_result(result);
    }
}

fn oper_bit_not(ctx: &mut OperEvalCtx<'_>) {
    let Some(val) = ctx.operand_index(0) else {
        return;
    };
    let result = match num_of(val) {
        Some(Num::U(u)) => Some(Ari::uint(!u)),
        Some(Num::I(i)) => Some(Ari::int(!i)),
        _ => None,
    };
    if let Some(result) = result {
        ctx.set_result(result);
    }
}

fn bitwise(ctx: &mut OperEvalCtx<'_>, fu: fn(u64, u64) -> u64, fi: fn(i64, i64) -> i64) {
    let (Some(a), Some(b)) = (ctx.operand_index(0), ctx.operand_index(1)) else {
        return;
    };
    if let Some(result) = integer_binary(a, b, fu, fi) {
        ctx.set_result(result);
    }
}

fn boolean(ctx: &mut OperEvalCtx<'_>, f: fn(bool, bool) -> bool) {
    let (Some(a), Some(b)) = (
        ctx.operand_index(0).and_then(|v| v.as_bool()),
        ctx.operand_index(1).and_then(|v| v.as_bool()),
    ) else {
        return;
    };
    ctx.set_result(Ari::bool(f(a, b)));
}

fn comparison(ctx: &mut OperEvalCtx<'_>, accept: fn(std::cmp::Ordering) -> bool) {
    let (Some(a), Some(b)) = (ctx.operand_index(0), ctx.operand_index(1)) else {
        return;
    };
    if let Some(ord) = compare_ordered(a, b) {
        ctx.set_result(Ari::bool(accept(ord)));
    }
}

/// Evaluate the row-match EXPR per row (labels substituted by column index)
/// and emit the selected columns for truthy rows.
fn oper_tbl_filter(ctx: &mut OperEvalCtx<'_>) {
    let Some(table) = ctx.operand_index(0).and_then(|v| v.as_tbl()).cloned() else {
        return;
    };
    let Some(row_match) = ctx.aparam_index(0).and_then(|v| v.as_ac()).cloned() else {
        log::error!("tbl-filter requires a row-match expression parameter");
        return;
    };
    let columns: Vec<usize> = ctx
        .aparam_index(1)
        .and_then(|v| v.as_ac())
        .map(|items| items.iter().filter_map(|i| i.as_uint()).map(|u| u as usize).collect())
        .unwrap_or_default();

    let out_cols: Vec<usize> = if columns.is_empty() {
        (0..table.ncols()).collect()
    } else {
        columns
    };
    if out_cols.iter().any(|&c| c >= table.ncols()) {
        log::error!("tbl-filter column index out of range");
        return;
    }

    let mut out = Table::new(out_cols.len());
    for row in table.rows() {
        // substitute integer labels with the row's cell at that column
        let substituted: Vec<Ari> = row_match
            .iter()
            .map(|item| match item.as_label().and_then(|l| l.parse::<usize>().ok()) {
                Some(col) if col < row.len() => row[col].clone(),
                _ => item.clone(),
            })
            .collect();
        let matched = eval::eval_target(ctx.runctx, &Ari::ac(substituted))
            .map(|v| v.is_truthy())
            .unwrap_or(false);
        if matched {
            out.push_row(out_cols.iter().map(|&c| row[c].clone()).collect());
        }
    }
    ctx.set_result(Ari::tbl(out));
}

fn oper_list_get(ctx: &mut OperEvalCtx<'_>) {
    let (Some(list), Some(index)) = (
        ctx.operand_index(0).and_then(|v| v.as_ac()),
        ctx.operand_index(1).and_then(|v| v.as_uint()),
    ) else {
        return;
    };
    // out-of-range yields no value
    if let Some(item) = list.get(index as usize) {
        let item = item.clone();
        ctx.set_result(item);
    }
}

fn oper_map_get(ctx: &mut OperEvalCtx<'_>) {
    let Some(map) = ctx.operand_index(0).and_then(|v| v.as_am()) else {
        return;
    };
    let Some(key) = ctx.operand_index(1) else {
        return;
    };
    if let Some(value) = map.get(key) {
        let value = value.clone();
        ctx.set_result(value);
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Register the module.
pub fn init(core: &Arc<AgentCore>) -> Result<(), AgentError> {
    let mut store = core.store.write();
    let ns = store.add_namespace(
        IdSeg::with_enum(IETF_ORG_NAME, IETF_ORG_ENUM),
        IdSeg::with_enum(MODEL_NAME, MODEL_ENUM),
        MODEL_REVISION,
    )?;

    register_edds(ns)?;
    register_ctrls(ns)?;
    register_opers(ns)?;

    log::debug!("registered {}/{}", IETF_ORG_NAME, MODEL_NAME);
    Ok(())
}

fn register_edds(ns: &mut crate::amm::Namespace) -> Result<(), AgentError> {
    let mut register = |name: &str, obj_enum: i64, typ: SemType, produce: EddProducer| {
        ns.register(
            ObjType::Edd,
            ObjDesc::new(
                IdSeg::with_enum(name, obj_enum),
                ObjData::Edd(EddData { typ, produce }),
            ),
        )
        .map(|_| ())
        .map_err(AgentError::from)
    };

    register(
        "sw-vendor",
        EDD_SW_VENDOR,
        SemType::Builtin(AriType::TextStr),
        EddProducer::new(|ctx| ctx.set_result(Ari::text(config::SW_VENDOR))),
    )?;
    register(
        "sw-version",
        EDD_SW_VERSION,
        SemType::Builtin(AriType::TextStr),
        EddProducer::new(|ctx| ctx.set_result(Ari::text(config::SW_VERSION))),
    )?;
    register(
        "capability",
        EDD_CAPABILITY,
        SemType::Builtin(AriType::Tbl),
        EddProducer::new(|ctx| {
            let store = ctx.runctx.core.store.read();
            let mut table = Table::new(3);
            for ns in store.namespaces().filter(|n| !n.obsolete && !n.is_odm()) {
                table.push_row(vec![
                    Ari::text(ns.org_id.name.clone()),
                    Ari::text(ns.model_id.name.clone()),
                    Ari::text(ns.revision.clone()),
                ]);
            }
            ctx.set_result(Ari::tbl(table));
        }),
    )?;

    let counters: [(&str, i64, fn(&crate::instr::Instr) -> &std::sync::atomic::AtomicU64); 6] = [
        ("num-execset-recv", EDD_NUM_EXECSET_RECV, |i| &i.num_execset_recv),
        ("num-ctrls-run", EDD_NUM_CTRLS_RUN, |i| &i.num_ctrls_run),
        ("num-ctrls-succeeded", EDD_NUM_CTRLS_SUCCEEDED, |i| {
            &i.num_ctrls_succeeded
        }),
        ("num-ctrls-failed", EDD_NUM_CTRLS_FAILED, |i| &i.num_ctrls_failed),
        ("num-tbrs-trig", EDD_NUM_TBRS_TRIG, |i| &i.num_tbrs_trig),
        ("num-sbrs-trig", EDD_NUM_SBRS_TRIG, |i| &i.num_sbrs_trig),
    ];
    for (name, obj_enum, pick) in counters {
        register(
            name,
            obj_enum,
            SemType::Builtin(AriType::Uvast),
            EddProducer::new(move |ctx| {
                let value = instr::read(pick(&ctx.runctx.core.instr));
                ctx.set_result(Ari::uint(value));
            }),
        )?;
    }

    ns.register(
        ObjType::Edd,
        ObjDesc::new(
            IdSeg::with_enum("namespace-list", EDD_NAMESPACE_LIST),
            ObjData::Edd(EddData {
                typ: SemType::Builtin(AriType::Tbl),
                produce: EddProducer::new(|ctx| {
                    let include_adm = ctx
                        .aparam_name("include-adm")
                        .and_then(|v| v.as_bool())
                        .unwrap_or(true);
                    let store = ctx.runctx.core.store.read();
                    let mut table = Table::new(3);
                    for ns in store.namespaces().filter(|n| !n.obsolete) {
                        if !include_adm && !ns.is_odm() {
                            continue;
                        }
                        table.push_row(vec![
                            Ari::text(ns.org_id.name.clone()),
                            Ari::text(ns.model_id.name.clone()),
                            Ari::text(ns.revision.clone()),
                        ]);
                    }
                    ctx.set_result(Ari::tbl(table));
                }),
            }),
        )
        .with_params(vec![FormalParam::with_default(
            "include-adm",
            SemType::Builtin(AriType::Bool),
            Ari::bool(true),
        )]),
    )?;

    Ok(())
}

fn register_ctrls(ns: &mut crate::amm::Namespace) -> Result<(), AgentError> {
    let exec_or_null = || {
        SemType::union(vec![
            amm_base::exec_tgt_type(),
            SemType::Builtin(AriType::Null),
        ])
    };

    let mut register = |name: &str,
                        obj_enum: i64,
                        fparams: Vec<FormalParam>,
                        result_typ: Option<SemType>,
                        body: fn(&mut CtrlExecCtx<'_>)| {
        ns.register(
            ObjType::Ctrl,
            ObjDesc::new(
                IdSeg::with_enum(name, obj_enum),
                ObjData::Ctrl(CtrlData {
                    result_typ,
                    execute: CtrlExecutor::new(body),
                }),
            )
            .with_params(fparams),
        )
        .map(|_| ())
        .map_err(AgentError::from)
    };

    register(
        "if-then-else",
        CTRL_IF_THEN_ELSE,
        vec![
            FormalParam::new("condition", amm_base::eval_tgt_type()),
            FormalParam::with_default("on-truthy", exec_or_null(), Ari::null()),
            FormalParam::with_default("on-falsy", exec_or_null(), Ari::null()),
        ],
        Some(SemType::Builtin(AriType::Bool)),
        ctrl_if_then_else,
    )?;
    register(
        "catch",
        CTRL_CATCH,
        vec![
            FormalParam::new("try", amm_base::exec_tgt_type()),
            FormalParam::with_default("on-failure", exec_or_null(), Ari::null()),
        ],
        Some(SemType::Builtin(AriType::Bool)),
        ctrl_catch,
    )?;
    register(
        "wait-for",
        CTRL_WAIT_FOR,
        vec![FormalParam::new("duration", SemType::Builtin(AriType::Td))],
        None,
        ctrl_wait_for,
    )?;
    register(
        "wait-until",
        CTRL_WAIT_UNTIL,
        vec![FormalParam::new("time", SemType::Builtin(AriType::Tp))],
        None,
        ctrl_wait_until,
    )?;
    register(
        "wait-cond",
        CTRL_WAIT_COND,
        vec![FormalParam::new("condition", amm_base::eval_tgt_type())],
        None,
        ctrl_wait_cond_check,
    )?;
    register(
        "inspect",
        CTRL_INSPECT,
        vec![FormalParam::new("ref", amm_base::value_obj_type())],
        Some(amm_base::any_type()),
        ctrl_inspect,
    )?;
    register(
        "report-on",
        CTRL_REPORT_ON,
        vec![
            FormalParam::new("template", amm_base::rpt_tgt_type()),
            FormalParam::with_default(
                "destination",
                SemType::union(vec![
                    SemType::Builtin(AriType::TextStr),
                    SemType::Builtin(AriType::Null),
                ]),
                Ari::null(),
            ),
        ],
        None,
        ctrl_report_on,
    )?;
    register(
        "var-store",
        CTRL_VAR_STORE,
        vec![
            FormalParam::new("target", SemType::Builtin(AriType::Var)),
            FormalParam::new("value", amm_base::any_type()),
        ],
        None,
        ctrl_var_store,
    )?;
    register(
        "var-reset",
        CTRL_VAR_RESET,
        vec![FormalParam::new("target", SemType::Builtin(AriType::Var))],
        None,
        ctrl_var_reset,
    )?;
    register(
        "ensure-var",
        CTRL_ENSURE_VAR,
        vec![
            FormalParam::new("target", SemType::Builtin(AriType::Var)),
            FormalParam::new("init", amm_base::any_type()),
        ],
        None,
        ctrl_ensure_var,
    )?;
    register(
        "obsolete-var",
        CTRL_OBSOLETE_VAR,
        vec![FormalParam::new("target", SemType::Builtin(AriType::Var))],
        None,
        ctrl_obsolete_var,
    )?;
    register(
        "tbr-enable",
        CTRL_TBR_ENABLE,
        vec![FormalParam::new("target", SemType::Builtin(AriType::Tbr))],
        None,
        ctrl_tbr_enable,
    )?;
    register(
        "tbr-disable",
        CTRL_TBR_DISABLE,
        vec![FormalParam::new("target", SemType::Builtin(AriType::Tbr))],
        None,
        ctrl_tbr_disable,
    )?;
    register(
        "sbr-enable",
        CTRL_SBR_ENABLE,
        vec![FormalParam::new("target", SemType::Builtin(AriType::Sbr))],
        None,
        ctrl_sbr_enable,
    )?;
    register(
        "sbr-disable",
        CTRL_SBR_DISABLE,
        vec![FormalParam::new("target", SemType::Builtin(AriType::Sbr))],
        None,
        ctrl_sbr_disable,
    )?;

    Ok(())
}

fn register_opers(ns: &mut crate::amm::Namespace) -> Result<(), AgentError> {
    let numeric_or_time = || {
        SemType::union(vec![
            amm_base::numeric_type(),
            SemType::Builtin(AriType::Tp),
            SemType::Builtin(AriType::Td),
        ])
    };

    let mut register = |name: &str,
                        obj_enum: i64,
                        operands: Vec<NamedType>,
                        result_typ: SemType,
                        body: OperEvaluator| {
        ns.register(
            ObjType::Oper,
            ObjDesc::new(
                IdSeg::with_enum(name, obj_enum),
                ObjData::Oper(OperData {
                    operands,
                    result_typ,
                    evaluate: body,
                }),
            ),
        )
        .map(|_| ())
        .map_err(AgentError::from)
    };

    let unary_numeric = |name: &str| vec![NamedType::new(name, numeric_or_time())];
    let binary_numeric = || {
        vec![
            NamedType::new("lhs", numeric_or_time()),
            NamedType::new("rhs", numeric_or_time()),
        ]
    };
    let binary_integer = || {
        vec![
            NamedType::new("lhs", amm_base::integer_type()),
            NamedType::new("rhs", amm_base::integer_type()),
        ]
    };
    let binary_bool = || {
        vec![
            NamedType::new("lhs", SemType::Builtin(AriType::Bool)),
            NamedType::new("rhs", SemType::Builtin(AriType::Bool)),
        ]
    };
    let binary_any = || {
        vec![
            NamedType::new("lhs", amm_base::any_type()),
            NamedType::new("rhs", amm_base::any_type()),
        ]
    };

    register(
        "negate",
        OPER_NEGATE,
        unary_numeric("val"),
        amm_base::numeric_type(),
        OperEvaluator::new(oper_negate),
    )?;
    register(
        "add",
        OPER_ADD,
        binary_numeric(),
        amm_base::numeric_type(),
        OperEvaluator::new(oper_add),
    )?;
    register(
        "sub",
        OPER_SUB,
        binary_numeric(),
        amm_base::numeric_type(),
        OperEvaluator::new(oper_sub),
    )?;
    register(
        "multiply",
        OPER_MULTIPLY,
        binary_numeric(),
        amm_base::numeric_type(),
        OperEvaluator::new(oper_multiply),
    )?;
    register(
        "divide",
        OPER_DIVIDE,
        binary_numeric(),
        amm_base::numeric_type(),
        OperEvaluator::new(oper_divide),
    )?;
    register(
        "remainder",
        OPER_REMAINDER,
        binary_numeric(),
        amm_base::numeric_type(),
        OperEvaluator::new(oper_remainder),
    )?;
    register(
        "bit-not",
        OPER_BIT_NOT,
        vec![NamedType::new("val", amm_base::integer_type())],
        amm_base::integer_type(),
        OperEvaluator::new(oper_bit_not),
    )?;
    register(
        "bit-and",
        OPER_BIT_AND,
        binary_integer(),
        amm_base::integer_type(),
        OperEvaluator::new(|ctx| bitwise(ctx, |a, b| a & b, |a, b| a & b)),
    )?;
    register(
        "bit-or",
        OPER_BIT_OR,
        binary_integer(),
        amm_base::integer_type(),
        OperEvaluator::new(|ctx| bitwise(ctx, |a, b| a | b, |a, b| a | b)),
    )?;
    register(
        "bit-xor",
        OPER_BIT_XOR,
        binary_integer(),
        amm_base::integer_type(),
        OperEvaluator::new(|ctx| bitwise(ctx, |a, b| a ^ b, |a, b| a ^ b)),
    )?;
    register(
        "bool-not",
        OPER_BOOL_NOT,
        vec![NamedType::new("val", SemType::Builtin(AriType::Bool))],
        SemType::Builtin(AriType::Bool),
        OperEvaluator::new(|ctx| {
            if let Some(v) = ctx.operand_index(0).and_then(|v| v.as_bool()) {
                ctx.set_result(Ari::bool(!v));
            }
        }),
    )?;
    register(
        "bool-and",
        OPER_BOOL_AND,
        binary_bool(),
        SemType::Builtin(AriType::Bool),
        OperEvaluator::new(|ctx| boolean(ctx, |a, b| a && b)),
    )?;
    register(
        "bool-or",
        OPER_BOOL_OR,
        binary_bool(),
        SemType::Builtin(AriType::Bool),
        OperEvaluator::new(|ctx| boolean(ctx, |a, b| a || b)),
    )?;
    register(
        "bool-xor",
        OPER_BOOL_XOR,
        binary_bool(),
        SemType::Builtin(AriType::Bool),
        OperEvaluator::new(|ctx| boolean(ctx, |a, b| a ^ b)),
    )?;
    register(
        "compare-eq",
        OPER_COMPARE_EQ,
        binary_any(),
        SemType::Builtin(AriType::Bool),
        OperEvaluator::new(|ctx| {
            if let (Some(a), Some(b)) = (ctx.operand_index(0), ctx.operand_index(1)) {
                let eq = a == b;
                ctx.set_result(Ari::bool(eq));
            }
        }),
    )?;
    register(
        "compare-ne",
        OPER_COMPARE_NE,
        binary_any(),
        SemType::Builtin(AriType::Bool),
        OperEvaluator::new(|ctx| {
            if let (Some(a), Some(b)) = (ctx.operand_index(0), ctx.operand_index(1)) {
                let ne = a != b;
                ctx.set_result(Ari::bool(ne));
            }
        }),
    )?;
    register(
        "compare-gt",
        OPER_COMPARE_GT,
        binary_numeric(),
        SemType::Builtin(AriType::Bool),
        OperEvaluator::new(|ctx| comparison(ctx, std::cmp::Ordering::is_gt)),
    )?;
    register(
        "compare-ge",
        OPER_COMPARE_GE,
        binary_numeric(),
        SemType::Builtin(AriType::Bool),
        OperEvaluator::new(|ctx| comparison(ctx, std::cmp::Ordering::is_ge)),
    )?;
    register(
        "compare-lt",
        OPER_COMPARE_LT,
        binary_numeric(),
        SemType::Builtin(AriType::Bool),
        OperEvaluator::new(|ctx| comparison(ctx, std::cmp::Ordering::is_lt)),
    )?;
    register(
        "compare-le",
        OPER_COMPARE_LE,
        binary_numeric(),
        SemType::Builtin(AriType::Bool),
        OperEvaluator::new(|ctx| comparison(ctx, std::cmp::Ordering::is_le)),
    )?;
    register(
        "list-get",
        OPER_LIST_GET,
        vec![
            NamedType::new("list", SemType::Builtin(AriType::Ac)),
            NamedType::new("index", amm_base::integer_type()),
        ],
        amm_base::any_type(),
        OperEvaluator::new(oper_list_get),
    )?;
    register(
        "map-get",
        OPER_MAP_GET,
        vec![
            NamedType::new("map", SemType::Builtin(AriType::Am)),
            NamedType::new("key", amm_base::any_type()),
        ],
        amm_base::any_type(),
        OperEvaluator::new(oper_map_get),
    )?;
    drop(register);
    ns.register(
        ObjType::Oper,
        ObjDesc::new(
            IdSeg::with_enum("tbl-filter", OPER_TBL_FILTER),
            ObjData::Oper(OperData {
                operands: vec![NamedType::new("in", SemType::Builtin(AriType::Tbl))],
                result_typ: SemType::Builtin(AriType::Tbl),
                evaluate: OperEvaluator::new(oper_tbl_filter),
            }),
        )
        .with_params(vec![
            FormalParam::new("row-match", amm_base::expr_type()),
            FormalParam::with_default(
                "columns",
                SemType::union(vec![
                    SemType::ulist(amm_base::integer_type()),
                    SemType::Builtin(AriType::Null),
                ]),
                Ari::null(),
            ),
        ]),
    )?;

    Ok(())
}
