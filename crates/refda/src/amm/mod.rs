// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Application Management Model: the typed object store, the semantic type
//! system, and the dereference / parameter-binding engine.

pub mod lookup;
pub mod obj;
pub mod semtype;
pub mod store;

pub use lookup::{dereference, ItemizedParams, Lookup};
pub use obj::{
    ConstData, CtrlData, CtrlExecutor, EddData, EddProducer, FormalParam, IdSeg, IdentData,
    ObjData, ObjDesc, OperData, OperEvaluator, SbrData, TbrData, TypedefData, VarData,
};
pub use semtype::{MatchRes, NamedType, SemType, TypeError};
pub use store::{Namespace, ObjStore, StoreError};
