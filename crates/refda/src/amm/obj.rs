// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object descriptors held by the store, one shape per object kind.
//!
//! Cross-object references (typedef uses, IDENT bases, rule actions) are
//! stored as ARI paths and resolved lazily during dereference, so cycles and
//! forward references carry no ownership hazard. Descriptors are cloned out
//! of the store by dereference; callbacks are shared through `Arc`.

use std::fmt;
use std::sync::Arc;

use super::semtype::{NamedType, SemType};
use crate::ari::{Ari, RefSeg, TimeDuration, TimePoint};
use crate::eval::OperEvalCtx;
use crate::exec::CtrlExecCtx;
use crate::valprod::EddProdCtx;

/// Identity segment of a namespace or object: a name plus an optional
/// integer enumeration. Both forms key the same entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdSeg {
    pub name: String,
    pub intenum: Option<i64>,
}

impl IdSeg {
    pub fn named(name: impl Into<String>) -> Self {
        IdSeg {
            name: name.into(),
            intenum: None,
        }
    }

    pub fn with_enum(name: impl Into<String>, intenum: i64) -> Self {
        IdSeg {
            name: name.into(),
            intenum: Some(intenum),
        }
    }

    /// Whether a reference segment selects this identity.
    pub fn matches(&self, seg: &RefSeg) -> bool {
        match seg {
            RefSeg::Int(v) => self.intenum == Some(*v),
            RefSeg::Name(v) => self.name == *v,
        }
    }
}

impl fmt::Display for IdSeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.intenum {
            Some(e) => write!(f, "{}({})", self.name, e),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Formal parameter: name, semantic type, optional default value.
#[derive(Debug, Clone)]
pub struct FormalParam {
    pub name: String,
    pub typ: SemType,
    pub default: Option<Ari>,
}

impl FormalParam {
    pub fn new(name: impl Into<String>, typ: SemType) -> Self {
        FormalParam {
            name: name.into(),
            typ,
            default: None,
        }
    }

    pub fn with_default(name: impl Into<String>, typ: SemType, default: Ari) -> Self {
        FormalParam {
            name: name.into(),
            typ,
            default: Some(default),
        }
    }
}

/// EDD producer callback.
#[derive(Clone)]
pub struct EddProducer(pub Arc<dyn Fn(&mut EddProdCtx<'_>) + Send + Sync>);

impl EddProducer {
    pub fn new(f: impl Fn(&mut EddProdCtx<'_>) + Send + Sync + 'static) -> Self {
        EddProducer(Arc::new(f))
    }
}

impl fmt::Debug for EddProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EddProducer(..)")
    }
}

/// CTRL executor callback.
#[derive(Clone)]
pub struct CtrlExecutor(pub Arc<dyn for<'a> Fn(&mut CtrlExecCtx<'a>) + Send + Sync>);

impl CtrlExecutor {
    pub fn new(f: impl for<'a> Fn(&mut CtrlExecCtx<'a>) + Send + Sync + 'static) -> Self {
        CtrlExecutor(Arc::new(f))
    }
}

impl fmt::Debug for CtrlExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CtrlExecutor(..)")
    }
}

/// OPER evaluator callback.
#[derive(Clone)]
pub struct OperEvaluator(pub Arc<dyn Fn(&mut OperEvalCtx<'_>) + Send + Sync>);

impl OperEvaluator {
    pub fn new(f: impl Fn(&mut OperEvalCtx<'_>) + Send + Sync + 'static) -> Self {
        OperEvaluator(Arc::new(f))
    }
}

impl fmt::Debug for OperEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OperEvaluator(..)")
    }
}

/// IDENT: an ordered list of base references to other IDENTs.
#[derive(Debug, Clone, Default)]
pub struct IdentData {
    pub bases: Vec<Ari>,
}

/// TYPEDEF: a named semantic type.
#[derive(Debug, Clone)]
pub struct TypedefData {
    pub typ: SemType,
}

/// CONST: a semantic type and an immutable literal value.
#[derive(Debug, Clone)]
pub struct ConstData {
    pub typ: SemType,
    pub value: Ari,
}

/// VAR: a semantic type, an initial value, and the current value.
#[derive(Debug, Clone)]
pub struct VarData {
    pub typ: SemType,
    pub init: Ari,
    pub value: Ari,
}

impl VarData {
    pub fn new(typ: SemType, init: Ari) -> Self {
        VarData {
            typ,
            value: init.clone(),
            init,
        }
    }
}

/// EDD: a produced semantic type and a producer callback.
#[derive(Debug, Clone)]
pub struct EddData {
    pub typ: SemType,
    pub produce: EddProducer,
}

/// CTRL: an optional result type and an executor callback.
#[derive(Debug, Clone)]
pub struct CtrlData {
    pub result_typ: Option<SemType>,
    pub execute: CtrlExecutor,
}

/// OPER: named operand types, a result type, and an evaluator callback.
#[derive(Debug, Clone)]
pub struct OperData {
    pub operands: Vec<NamedType>,
    pub result_typ: SemType,
    pub evaluate: OperEvaluator,
}

/// SBR: state-based rule.
#[derive(Debug, Clone)]
pub struct SbrData {
    /// MAC to expand when the condition is truthy.
    pub action: Ari,
    /// EXPR polled every `min_interval`.
    pub condition: Ari,
    pub min_interval: TimeDuration,
    /// Zero means unlimited.
    pub max_exec_count: u64,
    pub init_enabled: bool,
    pub enabled: bool,
    pub exec_count: u64,
}

impl SbrData {
    pub fn reached_max_exec_count(&self) -> bool {
        self.max_exec_count != 0 && self.exec_count >= self.max_exec_count
    }
}

/// TBR: time-based rule.
#[derive(Debug, Clone)]
pub struct TbrData {
    /// MAC to expand on each period.
    pub action: Ari,
    /// TP literal for an absolute start, TD literal for a relative one.
    pub start_time: Ari,
    pub period: TimeDuration,
    /// Zero means unlimited.
    pub max_exec_count: u64,
    pub init_enabled: bool,
    pub enabled: bool,
    pub exec_count: u64,
    /// Reference for relative start times, set when the rule is registered.
    pub absolute_start: TimePoint,
}

impl TbrData {
    pub fn reached_max_exec_count(&self) -> bool {
        self.max_exec_count != 0 && self.exec_count >= self.max_exec_count
    }
}

/// Object-kind-specific payload of a descriptor.
#[derive(Debug, Clone)]
pub enum ObjData {
    Ident(IdentData),
    Typedef(TypedefData),
    Const(ConstData),
    Var(VarData),
    Edd(EddData),
    Ctrl(CtrlData),
    Oper(OperData),
    Sbr(SbrData),
    Tbr(TbrData),
}

/// One registered object.
#[derive(Debug, Clone)]
pub struct ObjDesc {
    pub id: IdSeg,
    pub fparams: Vec<FormalParam>,
    pub data: ObjData,
    pub obsolete: bool,
}

impl ObjDesc {
    pub fn new(id: IdSeg, data: ObjData) -> Self {
        ObjDesc {
            id,
            fparams: Vec::new(),
            data,
            obsolete: false,
        }
    }

    pub fn with_params(mut self, fparams: Vec<FormalParam>) -> Self {
        self.fparams = fparams;
        self
    }

    pub fn as_var(&self) -> Option<&VarData> {
        match &self.data {
            ObjData::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_var_mut(&mut self) -> Option<&mut VarData> {
        match &mut self.data {
            ObjData::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ctrl(&self) -> Option<&CtrlData> {
        match &self.data {
            ObjData::Ctrl(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_oper(&self) -> Option<&OperData> {
        match &self.data {
            ObjData::Oper(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_sbr(&self) -> Option<&SbrData> {
        match &self.data {
            ObjData::Sbr(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sbr_mut(&mut self) -> Option<&mut SbrData> {
        match &mut self.data {
            ObjData::Sbr(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tbr(&self) -> Option<&TbrData> {
        match &self.data {
            ObjData::Tbr(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_tbr_mut(&mut self) -> Option<&mut TbrData> {
        match &mut self.data {
            ObjData::Tbr(t) => Some(t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idseg_matches_both_forms() {
        let id = IdSeg::with_enum("inspect", 5);
        assert!(id.matches(&RefSeg::Int(5)));
        assert!(id.matches(&RefSeg::name("inspect")));
        assert!(!id.matches(&RefSeg::Int(6)));
        assert!(!id.matches(&RefSeg::name("other")));

        let unnumbered = IdSeg::named("flag");
        assert!(!unnumbered.matches(&RefSeg::Int(0)));
        assert!(unnumbered.matches(&RefSeg::name("flag")));
    }

    #[test]
    fn test_rule_max_count_zero_is_unlimited() {
        let mut sbr = SbrData {
            action: Ari::ac(vec![]),
            condition: Ari::ac(vec![]),
            min_interval: TimeDuration::from_millis(100),
            max_exec_count: 0,
            init_enabled: false,
            enabled: false,
            exec_count: 1_000_000,
        };
        assert!(!sbr.reached_max_exec_count());
        sbr.max_exec_count = 3;
        assert!(sbr.reached_max_exec_count());
        sbr.exec_count = 2;
        assert!(!sbr.reached_max_exec_count());
    }
}
