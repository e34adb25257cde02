// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The `ietf/amm-base` ADM: foundation TYPEDEFs referenced by every other
//! module (value objects, expressions, macros, report templates).

use std::sync::Arc;

use super::{IETF_ORG_ENUM, IETF_ORG_NAME};
use crate::agent::{AgentCore, AgentError};
use crate::amm::{IdSeg, ObjData, ObjDesc, SemType, TypedefData};
use crate::ari::{Ari, AriType, ObjRef, ObjType};

pub const MODEL_NAME: &str = "amm-base";
pub const MODEL_ENUM: i64 = 0;
pub const MODEL_REVISION: &str = "2025-07-03";

// Object enumerations for ./typedef/*
pub const TYPEDEF_ANY: i64 = 1;
pub const TYPEDEF_VALUE_OBJ: i64 = 2;
pub const TYPEDEF_NUMERIC: i64 = 3;
pub const TYPEDEF_INTEGER: i64 = 4;
pub const TYPEDEF_TIME: i64 = 5;
pub const TYPEDEF_EXPR_ITEM: i64 = 6;
pub const TYPEDEF_EXPR: i64 = 7;
pub const TYPEDEF_EXEC_ITEM: i64 = 8;
pub const TYPEDEF_EXEC_TGT: i64 = 9;
pub const TYPEDEF_MAC: i64 = 10;
pub const TYPEDEF_RPTT_ITEM: i64 = 11;
pub const TYPEDEF_RPTT: i64 = 12;
pub const TYPEDEF_EVAL_TGT: i64 = 13;
pub const TYPEDEF_RPT_TGT: i64 = 14;
pub const TYPEDEF_NONCE: i64 = 15;

/// Reference to one of this module's TYPEDEFs.
pub fn typedef_ref(obj_enum: i64) -> Ari {
    Ari::objref(ObjRef::with_enums(
        IETF_ORG_ENUM,
        MODEL_ENUM,
        ObjType::Typedef,
        obj_enum,
    ))
}

/// `use of ./typedef/any`: matches every defined value.
pub fn any_type() -> SemType {
    SemType::use_of(typedef_ref(TYPEDEF_ANY))
}

pub fn value_obj_type() -> SemType {
    SemType::use_of(typedef_ref(TYPEDEF_VALUE_OBJ))
}

pub fn numeric_type() -> SemType {
    SemType::use_of(typedef_ref(TYPEDEF_NUMERIC))
}

pub fn integer_type() -> SemType {
    SemType::use_of(typedef_ref(TYPEDEF_INTEGER))
}

pub fn expr_type() -> SemType {
    SemType::use_of(typedef_ref(TYPEDEF_EXPR))
}

pub fn mac_type() -> SemType {
    SemType::use_of(typedef_ref(TYPEDEF_MAC))
}

pub fn exec_tgt_type() -> SemType {
    SemType::use_of(typedef_ref(TYPEDEF_EXEC_TGT))
}

pub fn rptt_type() -> SemType {
    SemType::use_of(typedef_ref(TYPEDEF_RPTT))
}

pub fn eval_tgt_type() -> SemType {
    SemType::use_of(typedef_ref(TYPEDEF_EVAL_TGT))
}

pub fn rpt_tgt_type() -> SemType {
    SemType::use_of(typedef_ref(TYPEDEF_RPT_TGT))
}

pub fn nonce_type() -> SemType {
    SemType::use_of(typedef_ref(TYPEDEF_NONCE))
}

fn all_builtins() -> Vec<SemType> {
    AriType::ALL
        .iter()
        .map(|t| SemType::Builtin(*t))
        .collect()
}

fn numeric_builtins() -> Vec<SemType> {
    [
        AriType::Int,
        AriType::Uint,
        AriType::Vast,
        AriType::Uvast,
        AriType::Real32,
        AriType::Real64,
    ]
    .iter()
    .map(|t| SemType::Builtin(*t))
    .collect()
}

/// Register the module. Must run before any module that references it.
pub fn init(core: &Arc<AgentCore>) -> Result<(), AgentError> {
    let mut store = core.store.write();
    let ns = store.add_namespace(
        IdSeg::with_enum(IETF_ORG_NAME, IETF_ORG_ENUM),
        IdSeg::with_enum(MODEL_NAME, MODEL_ENUM),
        MODEL_REVISION,
    )?;

    let mut register = |name: &str, obj_enum: i64, typ: SemType| -> Result<(), AgentError> {
        ns.register(
            ObjType::Typedef,
            ObjDesc::new(
                IdSeg::with_enum(name, obj_enum),
                ObjData::Typedef(TypedefData { typ }),
            ),
        )?;
        Ok(())
    };

    register("any", TYPEDEF_ANY, SemType::union(all_builtins()))?;
    register(
        "value-obj",
        TYPEDEF_VALUE_OBJ,
        SemType::union(vec![
            SemType::Builtin(AriType::Const),
            SemType::Builtin(AriType::Var),
            SemType::Builtin(AriType::Edd),
        ]),
    )?;
    register("numeric", TYPEDEF_NUMERIC, SemType::union(numeric_builtins()))?;
    register(
        "integer",
        TYPEDEF_INTEGER,
        SemType::union(
            [AriType::Int, AriType::Uint, AriType::Vast, AriType::Uvast]
                .iter()
                .map(|t| SemType::Builtin(*t))
                .collect(),
        ),
    )?;
    register(
        "time",
        TYPEDEF_TIME,
        SemType::union(vec![
            SemType::Builtin(AriType::Tp),
            SemType::Builtin(AriType::Td),
        ]),
    )?;

    // an expression item is any literal operand, a value producer, or an
    // operator; nested ACs are spliced by the evaluator
    let mut expr_item = numeric_builtins();
    expr_item.extend([
        SemType::Builtin(AriType::Bool),
        SemType::Builtin(AriType::TextStr),
        SemType::Builtin(AriType::ByteStr),
        SemType::Builtin(AriType::Tp),
        SemType::Builtin(AriType::Td),
        SemType::Builtin(AriType::Label),
        SemType::Builtin(AriType::Ac),
        SemType::Builtin(AriType::Am),
        SemType::Builtin(AriType::Tbl),
        SemType::Builtin(AriType::Const),
        SemType::Builtin(AriType::Var),
        SemType::Builtin(AriType::Edd),
        SemType::Builtin(AriType::Oper),
    ]);
    register("expr-item", TYPEDEF_EXPR_ITEM, SemType::union(expr_item))?;
    register(
        "expr",
        TYPEDEF_EXPR,
        SemType::ulist(SemType::use_of(typedef_ref(TYPEDEF_EXPR_ITEM))),
    )?;

    register(
        "exec-item",
        TYPEDEF_EXEC_ITEM,
        SemType::union(vec![
            SemType::Builtin(AriType::Ctrl),
            SemType::Builtin(AriType::Const),
            SemType::Builtin(AriType::Var),
            SemType::Builtin(AriType::Edd),
        ]),
    )?;
    register(
        "exec-tgt",
        TYPEDEF_EXEC_TGT,
        SemType::union(vec![
            SemType::use_of(typedef_ref(TYPEDEF_EXEC_ITEM)),
            SemType::use_of(typedef_ref(TYPEDEF_MAC)),
        ]),
    )?;
    register(
        "mac",
        TYPEDEF_MAC,
        SemType::ulist(SemType::use_of(typedef_ref(TYPEDEF_EXEC_TGT))),
    )?;

    register(
        "rptt-item",
        TYPEDEF_RPTT_ITEM,
        SemType::union(vec![
            SemType::use_of(typedef_ref(TYPEDEF_VALUE_OBJ)),
            SemType::use_of(typedef_ref(TYPEDEF_EXPR)),
        ]),
    )?;
    register(
        "rptt",
        TYPEDEF_RPTT,
        SemType::ulist(SemType::use_of(typedef_ref(TYPEDEF_RPTT_ITEM))),
    )?;
    register(
        "eval-tgt",
        TYPEDEF_EVAL_TGT,
        SemType::union(vec![
            SemType::use_of(typedef_ref(TYPEDEF_EXPR)),
            SemType::use_of(typedef_ref(TYPEDEF_VALUE_OBJ)),
        ]),
    )?;
    register(
        "rpt-tgt",
        TYPEDEF_RPT_TGT,
        SemType::union(vec![
            SemType::use_of(typedef_ref(TYPEDEF_RPTT)),
            SemType::use_of(typedef_ref(TYPEDEF_VALUE_OBJ)),
        ]),
    )?;
    register(
        "nonce",
        TYPEDEF_NONCE,
        SemType::union(vec![
            SemType::Builtin(AriType::Null),
            SemType::Builtin(AriType::Vast),
            SemType::Builtin(AriType::Uvast),
            SemType::Builtin(AriType::ByteStr),
        ]),
    )?;

    log::debug!("registered {}/{}", IETF_ORG_NAME, MODEL_NAME);
    Ok(())
}
