// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ARI (Application Resource Identifier) value model.
//!
//! Every datum handled by the agent is an [`Ari`]: a tagged variant that is
//! either a literal (primitive or structured payload, optionally tagged with
//! a named ARI type) or an object reference path with actual parameters.
//! Equality is structural and recursive, and the type tag participates.

pub mod objpath;
pub mod time;

use std::collections::BTreeMap;
use std::fmt;

pub use objpath::{ObjRef, ObjType, RefSeg};
pub use time::{TimeDuration, TimePoint};

/// Closed enumeration of named ARI types.
///
/// Non-negative codes are literal types; negative codes are object types.
/// The codes are part of the canonical binary encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AriType {
    Null,
    Bool,
    Int,
    Uint,
    Vast,
    Uvast,
    Real32,
    Real64,
    TextStr,
    ByteStr,
    Tp,
    Td,
    Label,
    Cbor,
    AriType,
    Ac,
    Am,
    Tbl,
    ExecSet,
    RptSet,
    Namespace,
    Ident,
    Typedef,
    Const,
    Var,
    Edd,
    Ctrl,
    Oper,
    Sbr,
    Tbr,
}

impl AriType {
    pub const ALL: [AriType; 30] = [
        AriType::Null,
        AriType::Bool,
        AriType::Int,
        AriType::Uint,
        AriType::Vast,
        AriType::Uvast,
        AriType::Real32,
        AriType::Real64,
        AriType::TextStr,
        AriType::ByteStr,
        AriType::Tp,
        AriType::Td,
        AriType::Label,
        AriType::Cbor,
        AriType::AriType,
        AriType::Ac,
        AriType::Am,
        AriType::Tbl,
        AriType::ExecSet,
        AriType::RptSet,
        AriType::Namespace,
        AriType::Ident,
        AriType::Typedef,
        AriType::Const,
        AriType::Var,
        AriType::Edd,
        AriType::Ctrl,
        AriType::Oper,
        AriType::Sbr,
        AriType::Tbr,
    ];

    /// Stable wire code.
    pub fn code(&self) -> i64 {
        match self {
            AriType::Null => 0,
            AriType::Bool => 1,
            AriType::Int => 4,
            AriType::Uint => 5,
            AriType::Vast => 6,
            AriType::Uvast => 7,
            AriType::Real32 => 8,
            AriType::Real64 => 9,
            AriType::TextStr => 10,
            AriType::ByteStr => 11,
            AriType::Tp => 12,
            AriType::Td => 13,
            AriType::Label => 14,
            AriType::Cbor => 15,
            AriType::AriType => 16,
            AriType::Ac => 17,
            AriType::Am => 18,
            AriType::Tbl => 19,
            AriType::ExecSet => 20,
            AriType::RptSet => 21,
            AriType::Namespace => -10,
            AriType::Ident => -1,
            AriType::Typedef => -2,
            AriType::Const => -3,
            AriType::Var => -4,
            AriType::Edd => -5,
            AriType::Ctrl => -6,
            AriType::Oper => -7,
            AriType::Sbr => -8,
            AriType::Tbr => -9,
        }
    }

    pub fn from_code(code: i64) -> Option<AriType> {
        AriType::ALL.iter().copied().find(|t| t.code() == code)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AriType::Null => "NULL",
            AriType::Bool => "BOOL",
            AriType::Int => "INT",
            AriType::Uint => "UINT",
            AriType::Vast => "VAST",
            AriType::Uvast => "UVAST",
            AriType::Real32 => "REAL32",
            AriType::Real64 => "REAL64",
            AriType::TextStr => "TEXTSTR",
            AriType::ByteStr => "BYTESTR",
            AriType::Tp => "TP",
            AriType::Td => "TD",
            AriType::Label => "LABEL",
            AriType::Cbor => "CBOR",
            AriType::AriType => "ARITYPE",
            AriType::Ac => "AC",
            AriType::Am => "AM",
            AriType::Tbl => "TBL",
            AriType::ExecSet => "EXECSET",
            AriType::RptSet => "RPTSET",
            AriType::Namespace => "NAMESPACE",
            AriType::Ident => "IDENT",
            AriType::Typedef => "TYPEDEF",
            AriType::Const => "CONST",
            AriType::Var => "VAR",
            AriType::Edd => "EDD",
            AriType::Ctrl => "CTRL",
            AriType::Oper => "OPER",
            AriType::Sbr => "SBR",
            AriType::Tbr => "TBR",
        }
    }

    pub fn from_name(name: &str) -> Option<AriType> {
        let upper = name.to_ascii_uppercase();
        AriType::ALL.iter().copied().find(|t| t.name() == upper)
    }
}

/// 64-bit float with total ordering and bitwise equality, so the value model
/// can be a map key and derive `Eq`/`Ord`/`Hash` throughout.
#[derive(Debug, Clone, Copy)]
pub struct Real(pub f64);

impl PartialEq for Real {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == std::cmp::Ordering::Equal
    }
}

impl Eq for Real {}

impl PartialOrd for Real {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Real {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl std::hash::Hash for Real {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

/// Row-major table with a fixed column count.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Table {
    ncols: usize,
    cells: Vec<Ari>,
}

impl Table {
    pub fn new(ncols: usize) -> Self {
        Table {
            ncols,
            cells: Vec::new(),
        }
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn nrows(&self) -> usize {
        if self.ncols == 0 {
            0
        } else {
            self.cells.len() / self.ncols
        }
    }

    /// Append one row. The row length must equal the column count.
    pub fn push_row(&mut self, row: Vec<Ari>) -> bool {
        if row.len() != self.ncols {
            return false;
        }
        self.cells.extend(row);
        true
    }

    pub fn row(&self, index: usize) -> Option<&[Ari]> {
        if index >= self.nrows() {
            return None;
        }
        Some(&self.cells[index * self.ncols..(index + 1) * self.ncols])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Ari]> {
        self.cells.chunks_exact(self.ncols.max(1))
    }

    pub fn cells(&self) -> &[Ari] {
        &self.cells
    }

    pub fn from_cells(ncols: usize, cells: Vec<Ari>) -> Option<Table> {
        if ncols == 0 && !cells.is_empty() {
            return None;
        }
        if ncols != 0 && cells.len() % ncols != 0 {
            return None;
        }
        Some(Table { ncols, cells })
    }
}

/// Execution set: a nonce and an ordered list of execution targets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExecSet {
    /// Null, integer, or byte string.
    pub nonce: Box<Ari>,
    pub targets: Vec<Ari>,
}

/// One report within a report set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Report {
    /// Offset from the enclosing set's reference time.
    pub reltime: TimeDuration,
    /// The original target reported on.
    pub source: Ari,
    pub items: Vec<Ari>,
}

/// Report set: a nonce, a reference time, and the reports.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RptSet {
    pub nonce: Box<Ari>,
    pub reftime: TimePoint,
    pub reports: Vec<Report>,
}

/// Literal payload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LitValue {
    /// Marks "no value"; never legal inside a report or on a value path.
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Real(Real),
    Bytes(Vec<u8>),
    Text(String),
    Label(String),
    Tp(TimePoint),
    Td(TimeDuration),
    Type(AriType),
    Ac(Vec<Ari>),
    Am(BTreeMap<Ari, Ari>),
    Tbl(Table),
    ExecSet(ExecSet),
    RptSet(RptSet),
}

/// A literal value, optionally tagged with a named ARI type indicating the
/// intended interpretation. The tag participates in equality and framing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lit {
    pub typ: Option<AriType>,
    pub value: LitValue,
}

/// The universal value: literal or object reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Ari {
    Lit(Lit),
    Ref(ObjRef),
}

impl Ari {
    pub fn undefined() -> Ari {
        Ari::Lit(Lit {
            typ: None,
            value: LitValue::Undefined,
        })
    }

    pub fn null() -> Ari {
        Ari::Lit(Lit {
            typ: None,
            value: LitValue::Null,
        })
    }

    pub fn bool(v: bool) -> Ari {
        Ari::Lit(Lit {
            typ: None,
            value: LitValue::Bool(v),
        })
    }

    /// Untagged integers are kept in canonical form: non-negative values
    /// use the unsigned payload so `int(5)` and `uint(5)` are the same value
    /// (and encode identically).
    pub fn int(v: i64) -> Ari {
        if v >= 0 {
            Ari::uint(v as u64)
        } else {
            Ari::Lit(Lit {
                typ: None,
                value: LitValue::Int(v),
            })
        }
    }

    pub fn uint(v: u64) -> Ari {
        Ari::Lit(Lit {
            typ: None,
            value: LitValue::Uint(v),
        })
    }

    pub fn real(v: f64) -> Ari {
        Ari::Lit(Lit {
            typ: None,
            value: LitValue::Real(Real(v)),
        })
    }

    pub fn text(v: impl Into<String>) -> Ari {
        Ari::Lit(Lit {
            typ: None,
            value: LitValue::Text(v.into()),
        })
    }

    pub fn bytes(v: Vec<u8>) -> Ari {
        Ari::Lit(Lit {
            typ: None,
            value: LitValue::Bytes(v),
        })
    }

    /// Labels are always type-tagged.
    pub fn label(v: impl Into<String>) -> Ari {
        Ari::Lit(Lit {
            typ: Some(AriType::Label),
            value: LitValue::Label(v.into()),
        })
    }

    pub fn tp(v: TimePoint) -> Ari {
        Ari::Lit(Lit {
            typ: Some(AriType::Tp),
            value: LitValue::Tp(v),
        })
    }

    pub fn td(v: TimeDuration) -> Ari {
        Ari::Lit(Lit {
            typ: Some(AriType::Td),
            value: LitValue::Td(v),
        })
    }

    pub fn aritype(t: AriType) -> Ari {
        Ari::Lit(Lit {
            typ: Some(AriType::AriType),
            value: LitValue::Type(t),
        })
    }

    /// Structured values always carry their type tag.
    pub fn ac(items: Vec<Ari>) -> Ari {
        Ari::Lit(Lit {
            typ: Some(AriType::Ac),
            value: LitValue::Ac(items),
        })
    }

    pub fn am(map: BTreeMap<Ari, Ari>) -> Ari {
        Ari::Lit(Lit {
            typ: Some(AriType::Am),
            value: LitValue::Am(map),
        })
    }

    pub fn tbl(table: Table) -> Ari {
        Ari::Lit(Lit {
            typ: Some(AriType::Tbl),
            value: LitValue::Tbl(table),
        })
    }

    pub fn execset(nonce: Ari, targets: Vec<Ari>) -> Ari {
        Ari::Lit(Lit {
            typ: Some(AriType::ExecSet),
            value: LitValue::ExecSet(ExecSet {
                nonce: Box::new(nonce),
                targets,
            }),
        })
    }

    pub fn rptset(nonce: Ari, reftime: TimePoint, reports: Vec<Report>) -> Ari {
        Ari::Lit(Lit {
            typ: Some(AriType::RptSet),
            value: LitValue::RptSet(RptSet {
                nonce: Box::new(nonce),
                reftime,
                reports,
            }),
        })
    }

    /// A literal explicitly tagged with a named type.
    pub fn typed(typ: AriType, value: LitValue) -> Ari {
        Ari::Lit(Lit {
            typ: Some(typ),
            value,
        })
    }

    pub fn objref(r: ObjRef) -> Ari {
        Ari::Ref(r)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn is_ref(&self) -> bool {
        matches!(self, Ari::Ref(_))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(
            self,
            Ari::Lit(Lit {
                value: LitValue::Undefined,
                ..
            })
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(
            self,
            Ari::Lit(Lit {
                value: LitValue::Null,
                ..
            })
        )
    }

    /// The literal type tag, if this is a tagged literal.
    pub fn lit_type(&self) -> Option<AriType> {
        match self {
            Ari::Lit(lit) => lit.typ,
            Ari::Ref(_) => None,
        }
    }

    pub fn as_lit(&self) -> Option<&Lit> {
        match self {
            Ari::Lit(lit) => Some(lit),
            Ari::Ref(_) => None,
        }
    }

    pub fn as_ref_path(&self) -> Option<&ObjRef> {
        match self {
            Ari::Ref(r) => Some(r),
            Ari::Lit(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Ari::Lit(Lit {
                value: LitValue::Bool(v),
                ..
            }) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Ari::Lit(Lit {
                value: LitValue::Int(v),
                ..
            }) => Some(*v),
            Ari::Lit(Lit {
                value: LitValue::Uint(v),
                ..
            }) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Ari::Lit(Lit {
                value: LitValue::Uint(v),
                ..
            }) => Some(*v),
            Ari::Lit(Lit {
                value: LitValue::Int(v),
                ..
            }) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Ari::Lit(Lit {
                value: LitValue::Real(Real(v)),
                ..
            }) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Ari::Lit(Lit {
                value: LitValue::Text(v),
                ..
            }) => Some(v),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            Ari::Lit(Lit {
                value: LitValue::Label(v),
                ..
            }) => Some(v),
            _ => None,
        }
    }

    pub fn as_td(&self) -> Option<TimeDuration> {
        match self {
            Ari::Lit(Lit {
                value: LitValue::Td(v),
                ..
            }) => Some(*v),
            _ => None,
        }
    }

    pub fn as_tp(&self) -> Option<TimePoint> {
        match self {
            Ari::Lit(Lit {
                value: LitValue::Tp(v),
                ..
            }) => Some(*v),
            _ => None,
        }
    }

    pub fn as_ac(&self) -> Option<&Vec<Ari>> {
        match self {
            Ari::Lit(Lit {
                value: LitValue::Ac(items),
                ..
            }) => Some(items),
            _ => None,
        }
    }

    pub fn as_am(&self) -> Option<&BTreeMap<Ari, Ari>> {
        match self {
            Ari::Lit(Lit {
                value: LitValue::Am(map),
                ..
            }) => Some(map),
            _ => None,
        }
    }

    pub fn as_tbl(&self) -> Option<&Table> {
        match self {
            Ari::Lit(Lit {
                value: LitValue::Tbl(t),
                ..
            }) => Some(t),
            _ => None,
        }
    }

    pub fn as_execset(&self) -> Option<&ExecSet> {
        match self {
            Ari::Lit(Lit {
                value: LitValue::ExecSet(e),
                ..
            }) => Some(e),
            _ => None,
        }
    }

    pub fn as_rptset(&self) -> Option<&RptSet> {
        match self {
            Ari::Lit(Lit {
                value: LitValue::RptSet(r),
                ..
            }) => Some(r),
            _ => None,
        }
    }

    /// Truthiness used by conditions: undefined/null are false, booleans
    /// are themselves, numerics are nonzero, strings are nonempty, and
    /// structured values are true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Ari::Ref(_) => true,
            Ari::Lit(lit) => match &lit.value {
                LitValue::Undefined | LitValue::Null => false,
                LitValue::Bool(v) => *v,
                LitValue::Int(v) => *v != 0,
                LitValue::Uint(v) => *v != 0,
                LitValue::Real(Real(v)) => *v != 0.0,
                LitValue::Text(v) => !v.is_empty(),
                LitValue::Bytes(v) => !v.is_empty(),
                _ => true,
            },
        }
    }
}

impl fmt::Display for Ari {
    /// Diagnostic text form; the full grammar lives in `codec::text`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::codec::text::encode(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_structural_and_symmetric() {
        let a = Ari::ac(vec![Ari::int(1), Ari::text("x")]);
        let b = Ari::ac(vec![Ari::int(1), Ari::text("x")]);
        let c = Ari::ac(vec![Ari::int(2), Ari::text("x")]);
        assert_eq!(a, a);
        assert_eq!(a, b);
        assert_eq!(b, a);
        assert_ne!(a, c);
    }

    #[test]
    fn test_type_tag_participates_in_equality() {
        let untagged = Ari::int(5);
        let tagged = Ari::typed(AriType::Int, LitValue::Int(5));
        assert_ne!(untagged, tagged);
    }

    #[test]
    fn test_untagged_integers_are_canonical() {
        assert_eq!(Ari::int(5), Ari::uint(5));
        assert_eq!(Ari::int(-5).as_int(), Some(-5));
        assert_eq!(Ari::int(-5).as_uint(), None);
    }

    #[test]
    fn test_undefined_and_null_are_distinct() {
        assert_ne!(Ari::undefined(), Ari::null());
        assert!(Ari::undefined().is_undefined());
        assert!(Ari::null().is_null());
        assert!(!Ari::null().is_undefined());
    }

    #[test]
    fn test_truthiness() {
        assert!(!Ari::undefined().is_truthy());
        assert!(!Ari::null().is_truthy());
        assert!(!Ari::bool(false).is_truthy());
        assert!(Ari::bool(true).is_truthy());
        assert!(!Ari::int(0).is_truthy());
        assert!(Ari::int(-3).is_truthy());
        assert!(!Ari::text("").is_truthy());
        assert!(Ari::text("x").is_truthy());
        assert!(Ari::ac(vec![]).is_truthy());
    }

    #[test]
    fn test_table_shape() {
        let mut t = Table::new(2);
        assert!(t.push_row(vec![Ari::int(1), Ari::int(2)]));
        assert!(t.push_row(vec![Ari::int(3), Ari::int(4)]));
        assert!(!t.push_row(vec![Ari::int(5)]));
        assert_eq!(t.nrows(), 2);
        assert_eq!(t.row(1), Some(&[Ari::int(3), Ari::int(4)][..]));
        assert_eq!(t.row(2), None);
    }

    #[test]
    fn test_real_total_order_allows_map_keys() {
        let mut map = BTreeMap::new();
        map.insert(Ari::real(1.5), Ari::text("a"));
        map.insert(Ari::real(f64::NAN), Ari::text("nan"));
        let key = Ari::real(1.5);
        assert_eq!(map.get(&key).and_then(|v| v.as_text()), Some("a"));
    }
}
