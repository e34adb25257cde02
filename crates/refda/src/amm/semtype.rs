// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Semantic type system: a recursive type expression with `match` and
//! `convert` over ARI values.
//!
//! Typedef uses are ARI paths resolved against the store at match time, so
//! recursive and forward type references work without ownership cycles. A
//! depth guard bounds pathological self-referential typedefs.

use std::fmt;

use super::store::ObjStore;
use crate::ari::{Ari, AriType, Lit, LitValue, ObjType, Real};

/// Recursion guard for typedef chains and nested containers.
const MAX_TYPE_DEPTH: usize = 32;

/// Result of matching a value against a semantic type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRes {
    Positive,
    Negative,
    /// The value was the undefined literal.
    Undefined,
}

/// A named member type, used for OPER operands, TBLT columns and SEQ slots.
#[derive(Debug, Clone)]
pub struct NamedType {
    pub name: String,
    pub typ: SemType,
}

impl NamedType {
    pub fn new(name: impl Into<String>, typ: SemType) -> Self {
        NamedType {
            name: name.into(),
            typ,
        }
    }
}

/// Semantic type expression.
#[derive(Debug, Clone)]
pub enum SemType {
    /// One of the fixed ARI types.
    Builtin(AriType),
    /// Named reference to a TYPEDEF, resolved lazily.
    Use(Ari),
    /// Ordered alternatives, first match wins.
    Union(Vec<SemType>),
    /// Uniform list: AC whose items all match the item type.
    Ulist(Box<SemType>),
    /// Uniform map: AM whose keys and values match.
    Umap {
        key: Box<SemType>,
        value: Box<SemType>,
    },
    /// Table template: TBL with one type per named column.
    Tblt(Vec<NamedType>),
    /// Positional sequence: AC with one type per named slot.
    Seq(Vec<NamedType>),
}

impl SemType {
    pub fn use_of(typedef_ref: Ari) -> SemType {
        SemType::Use(typedef_ref)
    }

    pub fn union(alts: Vec<SemType>) -> SemType {
        SemType::Union(alts)
    }

    pub fn ulist(item: SemType) -> SemType {
        SemType::Ulist(Box::new(item))
    }

    pub fn umap(key: SemType, value: SemType) -> SemType {
        SemType::Umap {
            key: Box::new(key),
            value: Box::new(value),
        }
    }
}

/// Conversion failure.
#[derive(Debug, Clone)]
pub enum TypeError {
    /// The value does not match and cannot be converted.
    Negative { expected: String, value: String },
    /// A typedef use did not resolve in the store.
    Unresolved(String),
    /// The typedef chain or nesting exceeded the depth guard.
    DepthExceeded,
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeError::Negative { expected, value } => {
                write!(f, "value {} does not convert to {}", value, expected)
            }
            TypeError::Unresolved(path) => write!(f, "typedef {} did not resolve", path),
            TypeError::DepthExceeded => write!(f, "type recursion depth exceeded"),
        }
    }
}

impl std::error::Error for TypeError {}

impl SemType {
    /// Match a value against this type.
    pub fn match_ari(&self, store: &ObjStore, value: &Ari) -> MatchRes {
        if value.is_undefined() {
            return MatchRes::Undefined;
        }
        self.match_inner(store, value, 0)
    }

    fn match_inner(&self, store: &ObjStore, value: &Ari, depth: usize) -> MatchRes {
        if depth > MAX_TYPE_DEPTH {
            return MatchRes::Negative;
        }
        match self {
            SemType::Builtin(t) => builtin_match(*t, value),
            SemType::Use(path) => match resolve_typedef(store, path) {
                Some(typ) => typ.match_inner(store, value, depth + 1),
                None => MatchRes::Negative,
            },
            SemType::Union(alts) => {
                for alt in alts {
                    if alt.match_inner(store, value, depth + 1) == MatchRes::Positive {
                        return MatchRes::Positive;
                    }
                }
                MatchRes::Negative
            }
            SemType::Ulist(item) => match value.as_ac() {
                Some(items) => {
                    for member in items {
                        if item.match_inner(store, member, depth + 1) != MatchRes::Positive {
                            return MatchRes::Negative;
                        }
                    }
                    MatchRes::Positive
                }
                None => MatchRes::Negative,
            },
            SemType::Umap { key, value: val } => match value.as_am() {
                Some(map) => {
                    for (k, v) in map {
                        if key.match_inner(store, k, depth + 1) != MatchRes::Positive
                            || val.match_inner(store, v, depth + 1) != MatchRes::Positive
                        {
                            return MatchRes::Negative;
                        }
                    }
                    MatchRes::Positive
                }
                None => MatchRes::Negative,
            },
            SemType::Tblt(cols) => match value.as_tbl() {
                Some(table) => {
                    if table.ncols() != cols.len() {
                        return MatchRes::Negative;
                    }
                    for row in table.rows() {
                        for (cell, col) in row.iter().zip(cols) {
                            if col.typ.match_inner(store, cell, depth + 1) != MatchRes::Positive {
                                return MatchRes::Negative;
                            }
                        }
                    }
                    MatchRes::Positive
                }
                None => MatchRes::Negative,
            },
            SemType::Seq(slots) => match value.as_ac() {
                Some(items) => {
                    if items.len() != slots.len() {
                        return MatchRes::Negative;
                    }
                    for (item, slot) in items.iter().zip(slots) {
                        if slot.typ.match_inner(store, item, depth + 1) != MatchRes::Positive {
                            return MatchRes::Negative;
                        }
                    }
                    MatchRes::Positive
                }
                None => MatchRes::Negative,
            },
        }
    }

    /// Convert a value into this type, preserving value where possible.
    /// The undefined literal passes through unchanged.
    pub fn convert(&self, store: &ObjStore, value: &Ari) -> Result<Ari, TypeError> {
        if value.is_undefined() {
            return Ok(Ari::undefined());
        }
        self.convert_inner(store, value, 0)
    }

    fn convert_inner(&self, store: &ObjStore, value: &Ari, depth: usize) -> Result<Ari, TypeError> {
        if depth > MAX_TYPE_DEPTH {
            return Err(TypeError::DepthExceeded);
        }
        // a matching value converts by identity; lossy conversions apply
        // only when the shape does not already fit
        if self.match_inner(store, value, depth) == MatchRes::Positive {
            return Ok(value.clone());
        }
        match self {
            SemType::Builtin(t) => builtin_convert(*t, value).ok_or_else(|| TypeError::Negative {
                expected: t.name().to_string(),
                value: value.to_string(),
            }),
            SemType::Use(path) => match resolve_typedef(store, path) {
                Some(typ) => typ.convert_inner(store, value, depth + 1),
                None => Err(TypeError::Unresolved(path.to_string())),
            },
            SemType::Union(alts) => {
                for alt in alts {
                    if let Ok(converted) = alt.convert_inner(store, value, depth + 1) {
                        return Ok(converted);
                    }
                }
                Err(TypeError::Negative {
                    expected: "union".to_string(),
                    value: value.to_string(),
                })
            }
            SemType::Ulist(item) => {
                let items = value.as_ac().ok_or_else(|| TypeError::Negative {
                    expected: "ulist".to_string(),
                    value: value.to_string(),
                })?;
                let mut out = Vec::with_capacity(items.len());
                for member in items {
                    out.push(item.convert_inner(store, member, depth + 1)?);
                }
                Ok(Ari::ac(out))
            }
            SemType::Umap { key, value: val } => {
                let map = value.as_am().ok_or_else(|| TypeError::Negative {
                    expected: "umap".to_string(),
                    value: value.to_string(),
                })?;
                let mut out = std::collections::BTreeMap::new();
                for (k, v) in map {
                    out.insert(
                        key.convert_inner(store, k, depth + 1)?,
                        val.convert_inner(store, v, depth + 1)?,
                    );
                }
                Ok(Ari::am(out))
            }
            SemType::Tblt(_) | SemType::Seq(_) => {
                // shape types convert by identity when they match
                if self.match_inner(store, value, depth) == MatchRes::Positive {
                    Ok(value.clone())
                } else {
                    Err(TypeError::Negative {
                        expected: "table/sequence template".to_string(),
                        value: value.to_string(),
                    })
                }
            }
        }
    }
}

/// Resolve a typedef-use path to the named type expression.
fn resolve_typedef(store: &ObjStore, path: &Ari) -> Option<SemType> {
    let r = path.as_ref_path()?;
    if r.obj_type != ObjType::Typedef {
        return None;
    }
    let ns = store.find_namespace(&r.org, &r.model)?;
    let desc = ns.find_object(ObjType::Typedef, &r.obj)?;
    match &desc.data {
        super::obj::ObjData::Typedef(td) => Some(td.typ.clone()),
        _ => None,
    }
}

fn builtin_match(t: AriType, value: &Ari) -> MatchRes {
    let positive = match (t, value) {
        // object types match references of the same kind
        (_, Ari::Ref(r)) => {
            ObjType::from_ari_type(t).is_some_and(|obj_type| r.obj_type == obj_type)
        }
        (t, Ari::Lit(lit)) => lit_matches(t, lit),
    };
    if positive {
        MatchRes::Positive
    } else {
        MatchRes::Negative
    }
}

fn lit_matches(t: AriType, lit: &Lit) -> bool {
    match (t, &lit.value) {
        (AriType::Null, LitValue::Null) => true,
        (AriType::Bool, LitValue::Bool(_)) => true,
        (AriType::Int, LitValue::Int(v)) => i32::try_from(*v).is_ok(),
        (AriType::Int, LitValue::Uint(v)) => i32::try_from(*v).is_ok(),
        (AriType::Uint, LitValue::Uint(v)) => u32::try_from(*v).is_ok(),
        (AriType::Uint, LitValue::Int(v)) => u32::try_from(*v).is_ok(),
        (AriType::Vast, LitValue::Int(_)) => true,
        (AriType::Vast, LitValue::Uint(v)) => i64::try_from(*v).is_ok(),
        (AriType::Uvast, LitValue::Uint(_)) => true,
        (AriType::Uvast, LitValue::Int(v)) => *v >= 0,
        (AriType::Real32 | AriType::Real64, LitValue::Real(_)) => true,
        (AriType::TextStr, LitValue::Text(_)) => true,
        (AriType::ByteStr | AriType::Cbor, LitValue::Bytes(_)) => true,
        (AriType::Label, LitValue::Label(_)) => true,
        (AriType::Tp, LitValue::Tp(_)) => true,
        (AriType::Td, LitValue::Td(_)) => true,
        (AriType::AriType, LitValue::Type(_)) => true,
        (AriType::Ac, LitValue::Ac(_)) => true,
        (AriType::Am, LitValue::Am(_)) => true,
        (AriType::Tbl, LitValue::Tbl(_)) => true,
        (AriType::ExecSet, LitValue::ExecSet(_)) => true,
        (AriType::RptSet, LitValue::RptSet(_)) => true,
        _ => false,
    }
}

/// Builtin conversions: widen integers, stringify numbers, boolean by the
/// zero/nonzero rule. Returns `None` where no value-preserving conversion
/// exists.
fn builtin_convert(t: AriType, value: &Ari) -> Option<Ari> {
    let lit = match value {
        Ari::Ref(r) => {
            // references convert only by identity to their object type
            return if ObjType::from_ari_type(t) == Some(r.obj_type) {
                Some(value.clone())
            } else {
                None
            };
        }
        Ari::Lit(lit) => lit,
    };

    match t {
        AriType::Null => matches!(lit.value, LitValue::Null).then(Ari::null),
        AriType::Bool => match &lit.value {
            LitValue::Bool(v) => Some(Ari::bool(*v)),
            LitValue::Int(v) => Some(Ari::bool(*v != 0)),
            LitValue::Uint(v) => Some(Ari::bool(*v != 0)),
            _ => None,
        },
        AriType::Int | AriType::Vast => {
            let (min, max) = if t == AriType::Int {
                (i64::from(i32::MIN), i64::from(i32::MAX))
            } else {
                (i64::MIN, i64::MAX)
            };
            let v = match &lit.value {
                LitValue::Int(v) => *v,
                LitValue::Uint(v) => i64::try_from(*v).ok()?,
                LitValue::Real(Real(r)) if r.fract() == 0.0 && r.is_finite() => *r as i64,
                _ => return None,
            };
            (min..=max).contains(&v).then(|| Ari::int(v))
        }
        AriType::Uint | AriType::Uvast => {
            let max = if t == AriType::Uint {
                u64::from(u32::MAX)
            } else {
                u64::MAX
            };
            let v = match &lit.value {
                LitValue::Uint(v) => *v,
                LitValue::Int(v) => u64::try_from(*v).ok()?,
                LitValue::Real(Real(r)) if r.fract() == 0.0 && *r >= 0.0 && r.is_finite() => {
                    *r as u64
                }
                _ => return None,
            };
            (v <= max).then(|| Ari::uint(v))
        }
        AriType::Real32 | AriType::Real64 => match &lit.value {
            LitValue::Real(Real(v)) => Some(Ari::real(*v)),
            LitValue::Int(v) => Some(Ari::real(*v as f64)),
            LitValue::Uint(v) => Some(Ari::real(*v as f64)),
            _ => None,
        },
        AriType::TextStr => match &lit.value {
            LitValue::Text(v) => Some(Ari::text(v.clone())),
            LitValue::Label(v) => Some(Ari::text(v.clone())),
            LitValue::Int(v) => Some(Ari::text(v.to_string())),
            LitValue::Uint(v) => Some(Ari::text(v.to_string())),
            LitValue::Real(Real(v)) => Some(Ari::text(v.to_string())),
            _ => None,
        },
        AriType::ByteStr | AriType::Cbor => match &lit.value {
            LitValue::Bytes(v) => Some(Ari::bytes(v.clone())),
            _ => None,
        },
        AriType::Label => match &lit.value {
            LitValue::Label(v) => Some(Ari::label(v.clone())),
            LitValue::Text(v) => Some(Ari::label(v.clone())),
            _ => None,
        },
        AriType::Tp => lit_tp(lit),
        AriType::Td => match &lit.value {
            LitValue::Td(v) => Some(Ari::td(*v)),
            LitValue::Int(v) => Some(Ari::td(crate::ari::TimeDuration::from_secs(*v))),
            LitValue::Uint(v) => i64::try_from(*v)
                .ok()
                .map(|s| Ari::td(crate::ari::TimeDuration::from_secs(s))),
            _ => None,
        },
        AriType::AriType => match &lit.value {
            LitValue::Type(v) => Some(Ari::aritype(*v)),
            _ => None,
        },
        AriType::Ac | AriType::Am | AriType::Tbl | AriType::ExecSet | AriType::RptSet => {
            lit_matches(t, lit).then(|| value.clone())
        }
        _ => None,
    }
}

fn lit_tp(lit: &Lit) -> Option<Ari> {
    match &lit.value {
        LitValue::Tp(v) => Some(Ari::tp(*v)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ari::TimeDuration;

    fn empty_store() -> ObjStore {
        ObjStore::new()
    }

    #[test]
    fn test_builtin_match_undefined() {
        let store = empty_store();
        let t = SemType::Builtin(AriType::Bool);
        assert_eq!(t.match_ari(&store, &Ari::undefined()), MatchRes::Undefined);
        assert_eq!(t.match_ari(&store, &Ari::bool(true)), MatchRes::Positive);
        assert_eq!(t.match_ari(&store, &Ari::uint(1)), MatchRes::Negative);
    }

    #[test]
    fn test_builtin_int_ranges() {
        let store = empty_store();
        let int32 = SemType::Builtin(AriType::Int);
        assert_eq!(store_match(&store, &int32, &Ari::int(-5)), MatchRes::Positive);
        assert_eq!(
            store_match(&store, &int32, &Ari::uint(u64::from(u32::MAX))),
            MatchRes::Negative
        );
        let uvast = SemType::Builtin(AriType::Uvast);
        assert_eq!(
            store_match(&store, &uvast, &Ari::uint(u64::MAX)),
            MatchRes::Positive
        );
        assert_eq!(store_match(&store, &uvast, &Ari::int(-1)), MatchRes::Negative);
    }

    fn store_match(store: &ObjStore, t: &SemType, v: &Ari) -> MatchRes {
        t.match_ari(store, v)
    }

    #[test]
    fn test_convert_bool_zero_nonzero() {
        let store = empty_store();
        let t = SemType::Builtin(AriType::Bool);
        assert_eq!(
            t.convert(&store, &Ari::uint(0)).expect("convert"),
            Ari::bool(false)
        );
        assert_eq!(
            t.convert(&store, &Ari::int(-3)).expect("convert"),
            Ari::bool(true)
        );
        assert!(t.convert(&store, &Ari::text("x")).is_err());
    }

    #[test]
    fn test_convert_undefined_passthrough() {
        let store = empty_store();
        let t = SemType::Builtin(AriType::Uint);
        let out = t.convert(&store, &Ari::undefined()).expect("convert");
        assert!(out.is_undefined());
    }

    #[test]
    fn test_convert_widen_and_stringify() {
        let store = empty_store();
        let real = SemType::Builtin(AriType::Real64);
        assert_eq!(
            real.convert(&store, &Ari::uint(4)).expect("convert"),
            Ari::real(4.0)
        );
        let text = SemType::Builtin(AriType::TextStr);
        assert_eq!(
            text.convert(&store, &Ari::int(-12)).expect("convert"),
            Ari::text("-12")
        );
        let td = SemType::Builtin(AriType::Td);
        assert_eq!(
            td.convert(&store, &Ari::uint(2)).expect("convert"),
            Ari::td(TimeDuration::from_secs(2))
        );
    }

    #[test]
    fn test_union_first_match_wins() {
        let store = empty_store();
        let t = SemType::union(vec![
            SemType::Builtin(AriType::Null),
            SemType::Builtin(AriType::TextStr),
        ]);
        assert_eq!(t.match_ari(&store, &Ari::null()), MatchRes::Positive);
        assert_eq!(t.match_ari(&store, &Ari::text("x")), MatchRes::Positive);
        assert_eq!(t.match_ari(&store, &Ari::uint(1)), MatchRes::Negative);
    }

    #[test]
    fn test_ulist_checks_every_item() {
        let store = empty_store();
        let t = SemType::ulist(SemType::Builtin(AriType::Uvast));
        assert_eq!(
            t.match_ari(&store, &Ari::ac(vec![Ari::uint(1), Ari::uint(2)])),
            MatchRes::Positive
        );
        assert_eq!(
            t.match_ari(&store, &Ari::ac(vec![Ari::uint(1), Ari::text("x")])),
            MatchRes::Negative
        );
        // empty list is uniformly typed
        assert_eq!(t.match_ari(&store, &Ari::ac(vec![])), MatchRes::Positive);
    }

    #[test]
    fn test_object_type_matches_reference() {
        let store = empty_store();
        let t = SemType::Builtin(AriType::Ctrl);
        let ctrl = Ari::objref(crate::ari::ObjRef::with_enums(1, 1, ObjType::Ctrl, 2));
        let edd = Ari::objref(crate::ari::ObjRef::with_enums(1, 1, ObjType::Edd, 2));
        assert_eq!(t.match_ari(&store, &ctrl), MatchRes::Positive);
        assert_eq!(t.match_ari(&store, &edd), MatchRes::Negative);
    }
}
