// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dereference and actual-parameter binding.
//!
//! Dereference resolves an object-reference ARI against the store and
//! produces a [`Lookup`] record carrying a cloned descriptor plus the
//! itemized argument set. The store lock is held by the caller only for the
//! duration of this step; the returned record is owned by the execution
//! item and outlives the lock.

use std::collections::HashMap;

use super::obj::{FormalParam, IdSeg, ObjDesc};
use super::semtype::MatchRes;
use super::store::{ObjStore, StoreError};
use crate::ari::{Ari, ObjRef, ObjType};

/// Itemized argument set: ordered actuals, a name index, and a flag noting
/// whether any slot ended up undefined.
#[derive(Debug, Clone, Default)]
pub struct ItemizedParams {
    pub ordered: Vec<Ari>,
    pub named: HashMap<String, usize>,
    pub any_undefined: bool,
}

impl ItemizedParams {
    pub fn index(&self, i: usize) -> Option<&Ari> {
        self.ordered.get(i)
    }

    pub fn name(&self, name: &str) -> Option<&Ari> {
        self.named.get(name).and_then(|i| self.ordered.get(*i))
    }
}

/// Result of a successful dereference.
#[derive(Debug, Clone)]
pub struct Lookup {
    pub ns_org: IdSeg,
    pub ns_model: IdSeg,
    pub obj_type: ObjType,
    pub obj: ObjDesc,
    pub aparams: ItemizedParams,
}

impl Lookup {
    /// The bare (parameterless) path of the resolved object, by enumeration
    /// where available.
    pub fn path(&self) -> ObjRef {
        let org = match self.ns_org.intenum {
            Some(e) => crate::ari::RefSeg::Int(e),
            None => crate::ari::RefSeg::name(self.ns_org.name.clone()),
        };
        let model = match self.ns_model.intenum {
            Some(e) => crate::ari::RefSeg::Int(e),
            None => crate::ari::RefSeg::name(self.ns_model.name.clone()),
        };
        let obj = match self.obj.id.intenum {
            Some(e) => crate::ari::RefSeg::Int(e),
            None => crate::ari::RefSeg::name(self.obj.id.name.clone()),
        };
        ObjRef::new(org, model, self.obj_type, obj)
    }
}

/// Resolve an object-reference ARI and bind its actual parameters.
pub fn dereference(store: &ObjStore, target: &Ari) -> Result<Lookup, StoreError> {
    let r = target.as_ref_path().ok_or_else(|| StoreError::NotFound {
        reference: target.to_string(),
    })?;

    let ns = store
        .find_namespace(&r.org, &r.model)
        .ok_or_else(|| StoreError::NotFound {
            reference: target.to_string(),
        })?;

    let desc = match ns.find_object(r.obj_type, &r.obj) {
        Some(desc) => desc,
        None => {
            // distinguish a mistyped reference from a missing object
            if let Some((actual, _)) = ns.find_object_any_type(&r.obj) {
                return Err(StoreError::WrongType {
                    reference: target.to_string(),
                    actual,
                });
            }
            return Err(StoreError::NotFound {
                reference: target.to_string(),
            });
        }
    };

    let aparams = bind_params(store, &desc.fparams, r);

    Ok(Lookup {
        ns_org: ns.org_id.clone(),
        ns_model: ns.model_id.clone(),
        obj_type: r.obj_type,
        obj: desc.clone(),
        aparams,
    })
}

/// Compute actuals from formals: positional argument, then named argument,
/// then declared default, then undefined. Each actual is coerced through
/// the formal's semantic type; coercion failure leaves the slot undefined.
pub fn bind_params(store: &ObjStore, fparams: &[FormalParam], r: &ObjRef) -> ItemizedParams {
    let mut out = ItemizedParams::default();

    for (i, fp) in fparams.iter().enumerate() {
        let supplied = r
            .params
            .get(i)
            .filter(|v| !v.is_undefined())
            .or_else(|| r.named_params.get(&fp.name).filter(|v| !v.is_undefined()))
            .or(fp.default.as_ref());

        let actual = match supplied {
            None => Ari::undefined(),
            Some(v) => match fp.typ.match_ari(store, v) {
                MatchRes::Positive => v.clone(),
                _ => match fp.typ.convert(store, v) {
                    Ok(converted) => converted,
                    Err(_) => {
                        log::warn!(
                            "parameter \"{}\" failed coercion from {}",
                            fp.name,
                            v
                        );
                        Ari::undefined()
                    }
                },
            },
        };

        if actual.is_undefined() {
            out.any_undefined = true;
        }
        out.named.insert(fp.name.clone(), i);
        out.ordered.push(actual);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amm::obj::{ConstData, ObjData};
    use crate::amm::semtype::SemType;
    use crate::ari::AriType;

    fn store_with_ctrl(fparams: Vec<FormalParam>) -> ObjStore {
        let mut store = ObjStore::new();
        let ns = store
            .add_namespace(
                IdSeg::with_enum("example", 65535),
                IdSeg::with_enum("adm", 10),
                "2025-01-03",
            )
            .expect("add ns");
        ns.register(
            ObjType::Ctrl,
            ObjDesc::new(
                IdSeg::with_enum("do-it", 1),
                ObjData::Ctrl(crate::amm::obj::CtrlData {
                    result_typ: None,
                    execute: crate::amm::obj::CtrlExecutor::new(|_| {}),
                }),
            )
            .with_params(fparams),
        )
        .expect("register ctrl");
        ns.register(
            ObjType::Const,
            ObjDesc::new(
                IdSeg::with_enum("answer", 2),
                ObjData::Const(ConstData {
                    typ: SemType::Builtin(AriType::Uvast),
                    value: Ari::uint(42),
                }),
            ),
        )
        .expect("register const");
        store
    }

    fn ctrl_ref() -> ObjRef {
        ObjRef::with_enums(65535, 10, ObjType::Ctrl, 1)
    }

    #[test]
    fn test_deref_not_found_vs_wrong_type() {
        let store = store_with_ctrl(vec![]);

        let missing = Ari::objref(ObjRef::with_enums(65535, 10, ObjType::Ctrl, 99));
        assert!(matches!(
            dereference(&store, &missing),
            Err(StoreError::NotFound { .. })
        ));

        // object 2 exists but as a CONST
        let mistyped = Ari::objref(ObjRef::with_enums(65535, 10, ObjType::Edd, 2));
        match dereference(&store, &mistyped) {
            Err(StoreError::WrongType { actual, .. }) => assert_eq!(actual, ObjType::Const),
            other => panic!("expected wrong-type, got {:?}", other),
        }

        let missing_ns = Ari::objref(ObjRef::with_enums(7, 7, ObjType::Ctrl, 1));
        assert!(matches!(
            dereference(&store, &missing_ns),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_deref_resolves_by_name_and_enum() {
        let store = store_with_ctrl(vec![]);
        let by_enum = dereference(&store, &Ari::objref(ctrl_ref())).expect("deref by enum");
        assert_eq!(by_enum.obj_type, ObjType::Ctrl);
        assert_eq!(by_enum.obj.id.name, "do-it");

        let by_name = dereference(
            &store,
            &Ari::objref(ObjRef::with_names("example", "adm", ObjType::Ctrl, "do-it")),
        )
        .expect("deref by name");
        assert_eq!(by_name.obj.id.intenum, Some(1));
    }

    #[test]
    fn test_param_binding_cascade() {
        let fparams = vec![
            FormalParam::new("first", SemType::Builtin(AriType::Uvast)),
            FormalParam::with_default("second", SemType::Builtin(AriType::Uvast), Ari::uint(7)),
            FormalParam::new("third", SemType::Builtin(AriType::Uvast)),
        ];
        let store = store_with_ctrl(fparams);

        // positional for first, named for third, default for second
        let r = ctrl_ref()
            .with_params(vec![Ari::uint(1)])
            .with_named_param("third", Ari::uint(3));
        let lookup = dereference(&store, &Ari::objref(r)).expect("deref");
        assert_eq!(lookup.aparams.index(0), Some(&Ari::uint(1)));
        assert_eq!(lookup.aparams.index(1), Some(&Ari::uint(7)));
        assert_eq!(lookup.aparams.index(2), Some(&Ari::uint(3)));
        assert_eq!(lookup.aparams.name("second"), Some(&Ari::uint(7)));
        assert!(!lookup.aparams.any_undefined);
    }

    #[test]
    fn test_param_binding_undefined_flag() {
        let fparams = vec![FormalParam::new("only", SemType::Builtin(AriType::Uvast))];
        let store = store_with_ctrl(fparams);

        // no argument at all
        let lookup = dereference(&store, &Ari::objref(ctrl_ref())).expect("deref");
        assert!(lookup.aparams.any_undefined);
        assert!(lookup.aparams.index(0).expect("slot").is_undefined());

        // explicit undefined positional falls through to undefined too
        let r = ctrl_ref().with_params(vec![Ari::undefined()]);
        let lookup = dereference(&store, &Ari::objref(r)).expect("deref");
        assert!(lookup.aparams.any_undefined);
    }

    #[test]
    fn test_param_coercion_failure_marks_undefined() {
        let fparams = vec![FormalParam::new("num", SemType::Builtin(AriType::Uvast))];
        let store = store_with_ctrl(fparams);

        let r = ctrl_ref().with_params(vec![Ari::text("not a number")]);
        let lookup = dereference(&store, &Ari::objref(r)).expect("deref");
        assert!(lookup.aparams.any_undefined);
        assert!(lookup.aparams.index(0).expect("slot").is_undefined());
    }

    #[test]
    fn test_param_coercion_converts() {
        let fparams = vec![FormalParam::new("b", SemType::Builtin(AriType::Bool))];
        let store = store_with_ctrl(fparams);

        let r = ctrl_ref().with_params(vec![Ari::uint(3)]);
        let lookup = dereference(&store, &Ari::objref(r)).expect("deref");
        assert_eq!(lookup.aparams.index(0), Some(&Ari::bool(true)));
    }
}
