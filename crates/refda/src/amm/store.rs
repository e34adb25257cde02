// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The object store: an ordered list of namespaces, each owning containers
//! of object descriptors indexed by name and enumeration.
//!
//! Namespaces with a non-negative model id are ADMs and immutable once
//! registered; negative model ids are ODMs, mutable via CTRL. Obsolete
//! namespaces and objects stay in the store but are hidden from enumeration.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use super::obj::{IdSeg, ObjData, ObjDesc};
use super::semtype::SemType;
use crate::ari::{Ari, ObjType, RefSeg};

/// Store error, covering dereference and registration failures.
#[derive(Debug, Clone)]
pub enum StoreError {
    /// A path segment had no match (`DEREF_NOT_FOUND`).
    NotFound { reference: String },
    /// The reference's type tag conflicts with the registered object type
    /// (`DEREF_WRONG_TYPE`).
    WrongType {
        reference: String,
        actual: ObjType,
    },
    /// Namespace already registered under either identity form.
    DuplicateNamespace { org: String, model: String },
    /// Object name or enumeration already present in the container.
    DuplicateObject { name: String },
    /// Attempted mutation of an ADM namespace.
    Immutable { ns: String },
    /// Binding pass found unresolved references.
    Unbound { missing: Vec<String> },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { reference } => {
                write!(f, "dereference found no match for {}", reference)
            }
            StoreError::WrongType { reference, actual } => write!(
                f,
                "reference {} conflicts with registered object type {}",
                reference, actual
            ),
            StoreError::DuplicateNamespace { org, model } => {
                write!(f, "namespace {}/{} already registered", org, model)
            }
            StoreError::DuplicateObject { name } => {
                write!(f, "object {} already registered", name)
            }
            StoreError::Immutable { ns } => write!(f, "namespace {} is an immutable ADM", ns),
            StoreError::Unbound { missing } => {
                write!(f, "{} unresolved references: ", missing.len())?;
                for (i, m) in missing.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(m)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// Container of descriptors of one object type: a list for stable ordering
/// plus by-name and by-enum indexes.
#[derive(Debug, Clone, Default)]
pub struct ObjContainer {
    list: Vec<ObjDesc>,
    by_name: HashMap<String, usize>,
    by_enum: HashMap<i64, usize>,
}

impl ObjContainer {
    /// Insert a descriptor, failing atomically on either key collision.
    fn add(&mut self, desc: ObjDesc) -> Result<&mut ObjDesc, StoreError> {
        if self.by_name.contains_key(&desc.id.name) {
            return Err(StoreError::DuplicateObject {
                name: desc.id.name.clone(),
            });
        }
        if let Some(e) = desc.id.intenum {
            if self.by_enum.contains_key(&e) {
                return Err(StoreError::DuplicateObject {
                    name: desc.id.name.clone(),
                });
            }
        }
        let index = self.list.len();
        self.by_name.insert(desc.id.name.clone(), index);
        if let Some(e) = desc.id.intenum {
            self.by_enum.insert(e, index);
        }
        self.list.push(desc);
        Ok(&mut self.list[index])
    }

    fn find(&self, seg: &RefSeg) -> Option<&ObjDesc> {
        let index = match seg {
            RefSeg::Int(e) => *self.by_enum.get(e)?,
            RefSeg::Name(n) => *self.by_name.get(n)?,
        };
        self.list.get(index)
    }

    fn find_mut(&mut self, seg: &RefSeg) -> Option<&mut ObjDesc> {
        let index = match seg {
            RefSeg::Int(e) => *self.by_enum.get(e)?,
            RefSeg::Name(n) => *self.by_name.get(n)?,
        };
        self.list.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjDesc> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// One ADM or ODM namespace.
#[derive(Debug, Clone)]
pub struct Namespace {
    pub org_id: IdSeg,
    pub model_id: IdSeg,
    pub revision: String,
    pub features: BTreeSet<String>,
    pub obsolete: bool,
    containers: HashMap<ObjType, ObjContainer>,
}

impl Namespace {
    fn new(org_id: IdSeg, model_id: IdSeg, revision: &str) -> Self {
        Namespace {
            org_id,
            model_id,
            revision: revision.to_string(),
            features: BTreeSet::new(),
            obsolete: false,
            containers: HashMap::new(),
        }
    }

    /// ODM namespaces carry a negative model id and are operator-mutable.
    pub fn is_odm(&self) -> bool {
        matches!(self.model_id.intenum, Some(e) if e < 0)
    }

    pub fn register(&mut self, obj_type: ObjType, desc: ObjDesc) -> Result<&mut ObjDesc, StoreError> {
        self.containers.entry(obj_type).or_default().add(desc)
    }

    pub fn find_object(&self, obj_type: ObjType, seg: &RefSeg) -> Option<&ObjDesc> {
        self.containers.get(&obj_type)?.find(seg)
    }

    pub fn find_object_mut(&mut self, obj_type: ObjType, seg: &RefSeg) -> Option<&mut ObjDesc> {
        self.containers.get_mut(&obj_type)?.find_mut(seg)
    }

    /// Search all containers for a name, used to distinguish wrong-type
    /// references from plain not-found.
    pub fn find_object_any_type(&self, seg: &RefSeg) -> Option<(ObjType, &ObjDesc)> {
        for t in ObjType::ALL {
            if let Some(desc) = self.find_object(t, seg) {
                return Some((t, desc));
            }
        }
        None
    }

    pub fn container(&self, obj_type: ObjType) -> Option<&ObjContainer> {
        self.containers.get(&obj_type)
    }

    pub fn objects(&self, obj_type: ObjType) -> impl Iterator<Item = &ObjDesc> {
        self.containers
            .get(&obj_type)
            .into_iter()
            .flat_map(|c| c.list.iter())
    }
}

/// The store proper. Access is serialized by a single reader/writer lock
/// owned by the agent; the store itself is lock-free.
#[derive(Debug, Clone, Default)]
pub struct ObjStore {
    namespaces: Vec<Namespace>,
}

impl ObjStore {
    pub fn new() -> Self {
        ObjStore {
            namespaces: Vec::new(),
        }
    }

    /// Register a namespace, rejecting duplicates by either identity form.
    pub fn add_namespace(
        &mut self,
        org_id: IdSeg,
        model_id: IdSeg,
        revision: &str,
    ) -> Result<&mut Namespace, StoreError> {
        let dup = self.namespaces.iter().any(|ns| {
            let name_clash = ns.org_id.name == org_id.name && ns.model_id.name == model_id.name;
            let enum_clash = ns.org_id.intenum.is_some()
                && ns.org_id.intenum == org_id.intenum
                && ns.model_id.intenum.is_some()
                && ns.model_id.intenum == model_id.intenum;
            name_clash || enum_clash
        });
        if dup {
            return Err(StoreError::DuplicateNamespace {
                org: org_id.name,
                model: model_id.name,
            });
        }
        self.namespaces
            .push(Namespace::new(org_id, model_id, revision));
        let index = self.namespaces.len() - 1;
        Ok(&mut self.namespaces[index])
    }

    pub fn find_namespace(&self, org: &RefSeg, model: &RefSeg) -> Option<&Namespace> {
        self.namespaces
            .iter()
            .find(|ns| ns.org_id.matches(org) && ns.model_id.matches(model))
    }

    pub fn find_namespace_mut(&mut self, org: &RefSeg, model: &RefSeg) -> Option<&mut Namespace> {
        self.namespaces
            .iter_mut()
            .find(|ns| ns.org_id.matches(org) && ns.model_id.matches(model))
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.iter()
    }

    pub fn namespaces_mut(&mut self) -> impl Iterator<Item = &mut Namespace> {
        self.namespaces.iter_mut()
    }

    /// Walk every registered type reference and IDENT base and verify each
    /// resolves in the store. Re-run after any ODM mutation that introduces
    /// cross-references.
    pub fn bind_refs(&self) -> Result<(), StoreError> {
        let mut missing = Vec::new();
        for ns in &self.namespaces {
            for obj_type in ObjType::ALL {
                for desc in ns.objects(obj_type) {
                    self.bind_desc(desc, &mut missing);
                }
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Unbound { missing })
        }
    }

    fn bind_desc(&self, desc: &ObjDesc, missing: &mut Vec<String>) {
        for fp in &desc.fparams {
            self.bind_type(&fp.typ, missing);
        }
        match &desc.data {
            ObjData::Ident(data) => {
                for base in &data.bases {
                    let ok = base
                        .as_ref_path()
                        .filter(|r| r.obj_type == ObjType::Ident)
                        .and_then(|r| {
                            self.find_namespace(&r.org, &r.model)
                                .and_then(|ns| ns.find_object(ObjType::Ident, &r.obj))
                        })
                        .is_some();
                    if !ok {
                        missing.push(base.to_string());
                    }
                }
            }
            ObjData::Typedef(data) => self.bind_type(&data.typ, missing),
            ObjData::Const(data) => self.bind_type(&data.typ, missing),
            ObjData::Var(data) => self.bind_type(&data.typ, missing),
            ObjData::Edd(data) => self.bind_type(&data.typ, missing),
            ObjData::Ctrl(data) => {
                if let Some(t) = &data.result_typ {
                    self.bind_type(t, missing);
                }
            }
            ObjData::Oper(data) => {
                for op in &data.operands {
                    self.bind_type(&op.typ, missing);
                }
                self.bind_type(&data.result_typ, missing);
            }
            ObjData::Sbr(_) | ObjData::Tbr(_) => {}
        }
    }

    fn bind_type(&self, typ: &SemType, missing: &mut Vec<String>) {
        match typ {
            SemType::Builtin(_) => {}
            SemType::Use(path) => {
                let ok = path
                    .as_ref_path()
                    .filter(|r| r.obj_type == ObjType::Typedef)
                    .and_then(|r| {
                        self.find_namespace(&r.org, &r.model)
                            .and_then(|ns| ns.find_object(ObjType::Typedef, &r.obj))
                    })
                    .is_some();
                if !ok {
                    missing.push(path.to_string());
                }
            }
            SemType::Union(alts) => {
                for alt in alts {
                    self.bind_type(alt, missing);
                }
            }
            SemType::Ulist(item) => self.bind_type(item, missing),
            SemType::Umap { key, value } => {
                self.bind_type(key, missing);
                self.bind_type(value, missing);
            }
            SemType::Tblt(cols) => {
                for col in cols {
                    self.bind_type(&col.typ, missing);
                }
            }
            SemType::Seq(slots) => {
                for slot in slots {
                    self.bind_type(&slot.typ, missing);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ari::AriType;

    fn seg(name: &str, e: i64) -> IdSeg {
        IdSeg::with_enum(name, e)
    }

    fn typedef_desc(name: &str, e: i64) -> ObjDesc {
        ObjDesc::new(
            seg(name, e),
            ObjData::Typedef(super::super::obj::TypedefData {
                typ: SemType::Builtin(AriType::Uvast),
            }),
        )
    }

    #[test]
    fn test_add_namespace_rejects_duplicates_by_either_form() {
        let mut store = ObjStore::new();
        store
            .add_namespace(seg("ietf", 1), seg("amm-base", 0), "2025-01-01")
            .expect("first add");
        // same names, different enums
        assert!(matches!(
            store.add_namespace(seg("ietf", 9), seg("amm-base", 9), "2025-01-01"),
            Err(StoreError::DuplicateNamespace { .. })
        ));
        // same enums, different names
        assert!(matches!(
            store.add_namespace(seg("other", 1), seg("other-model", 0), "2025-01-01"),
            Err(StoreError::DuplicateNamespace { .. })
        ));
        // disjoint is fine
        store
            .add_namespace(seg("ietf", 1), seg("dtnma-agent", 1), "2025-01-01")
            .expect("second add");
    }

    #[test]
    fn test_register_rejects_duplicate_name_or_enum_atomically() {
        let mut store = ObjStore::new();
        let ns = store
            .add_namespace(seg("example", 65535), seg("adm", 10), "2025-01-03")
            .expect("add ns");
        ns.register(ObjType::Typedef, typedef_desc("first", 1))
            .expect("register");

        // duplicate name
        assert!(ns
            .register(ObjType::Typedef, typedef_desc("first", 2))
            .is_err());
        // duplicate enum
        assert!(ns
            .register(ObjType::Typedef, typedef_desc("second", 1))
            .is_err());
        // no partial state: the failed registrations left one object
        assert_eq!(ns.container(ObjType::Typedef).map(|c| c.len()), Some(1));
        // lookups by both keys still hit the original
        assert!(ns
            .find_object(ObjType::Typedef, &RefSeg::name("first"))
            .is_some());
        assert!(ns.find_object(ObjType::Typedef, &RefSeg::Int(1)).is_some());
        assert!(ns
            .find_object(ObjType::Typedef, &RefSeg::name("second"))
            .is_none());
    }

    #[test]
    fn test_same_name_in_different_containers_is_allowed() {
        let mut store = ObjStore::new();
        let ns = store
            .add_namespace(seg("example", 65535), seg("adm", 10), "2025-01-03")
            .expect("add ns");
        ns.register(ObjType::Typedef, typedef_desc("shared", 1))
            .expect("register typedef");
        ns.register(
            ObjType::Const,
            ObjDesc::new(
                seg("shared", 1),
                ObjData::Const(super::super::obj::ConstData {
                    typ: SemType::Builtin(AriType::Uvast),
                    value: Ari::uint(1),
                }),
            ),
        )
        .expect("register const with same name in another container");
    }

    #[test]
    fn test_bind_refs_reports_unresolved_typedef_use() {
        let mut store = ObjStore::new();
        let ns = store
            .add_namespace(seg("example", 65535), seg("adm", 10), "2025-01-03")
            .expect("add ns");
        let desc = ObjDesc::new(
            seg("bad", 1),
            ObjData::Const(super::super::obj::ConstData {
                typ: SemType::use_of(Ari::objref(crate::ari::ObjRef::with_enums(
                    1,
                    0,
                    ObjType::Typedef,
                    99,
                ))),
                value: Ari::uint(1),
            }),
        );
        ns.register(ObjType::Const, desc).expect("register");
        match store.bind_refs() {
            Err(StoreError::Unbound { missing }) => assert_eq!(missing.len(), 1),
            other => panic!("expected unbound error, got {:?}", other),
        }
    }

    #[test]
    fn test_bind_refs_resolves_cross_namespace() {
        let mut store = ObjStore::new();
        store
            .add_namespace(seg("ietf", 1), seg("amm-base", 0), "2025-01-01")
            .expect("add base ns")
            .register(ObjType::Typedef, typedef_desc("counter", 3))
            .expect("register typedef");

        let user = store
            .add_namespace(seg("example", 65535), seg("adm", 10), "2025-01-03")
            .expect("add user ns");
        user.register(
            ObjType::Edd,
            ObjDesc::new(
                seg("uses-counter", 1),
                ObjData::Edd(super::super::obj::EddData {
                    typ: SemType::use_of(Ari::objref(crate::ari::ObjRef::with_enums(
                        1,
                        0,
                        ObjType::Typedef,
                        3,
                    ))),
                    produce: super::super::obj::EddProducer::new(|_| {}),
                }),
            ),
        )
        .expect("register edd");

        store.bind_refs().expect("binding should resolve");
    }

    #[test]
    fn test_odm_detection() {
        let mut store = ObjStore::new();
        let adm = store
            .add_namespace(seg("example", 65535), seg("adm", 10), "2025-01-03")
            .expect("adm");
        assert!(!adm.is_odm());
        let odm = store
            .add_namespace(seg("example2", 65536), seg("!odm", -5), "2025-01-03")
            .expect("odm");
        assert!(odm.is_odm());
    }
}
