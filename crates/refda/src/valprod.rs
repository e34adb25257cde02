// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Value production: read CONST/VAR state, or invoke an EDD producer.

use std::fmt;

use crate::amm::{ItemizedParams, Lookup, ObjData};
use crate::ari::Ari;
use crate::runctx::RunCtx;

/// Production failure.
#[derive(Debug, Clone)]
pub enum ProdError {
    /// The dereferenced object kind does not produce values.
    NotProducer { obj: String },
    /// The EDD callback left its result unset (`PROD_FAILED`).
    Failed { obj: String },
}

impl fmt::Display for ProdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProdError::NotProducer { obj } => {
                write!(f, "object {} is not a value producer", obj)
            }
            ProdError::Failed { obj } => write!(f, "production failed for {}", obj),
        }
    }
}

impl std::error::Error for ProdError {}

/// Context handed to an EDD producer callback.
pub struct EddProdCtx<'a> {
    pub runctx: &'a RunCtx,
    pub aparams: &'a ItemizedParams,
    result: Option<Ari>,
}

impl<'a> EddProdCtx<'a> {
    pub fn aparam_index(&self, i: usize) -> Option<&Ari> {
        self.aparams.index(i)
    }

    pub fn aparam_name(&self, name: &str) -> Option<&Ari> {
        self.aparams.name(name)
    }

    pub fn has_aparam_undefined(&self) -> bool {
        self.aparams.any_undefined
    }

    /// Set the produced value. Leaving it unset fails the production.
    pub fn set_result(&mut self, value: Ari) {
        self.result = Some(value);
    }
}

/// Produce a value from a resolved non-CTRL reference.
///
/// CONST and VAR read from the dereferenced descriptor snapshot; EDD runs
/// the registered producer with the actual-parameter context. The caller
/// must not hold the store lock: producers may take it themselves.
pub fn produce(runctx: &RunCtx, lookup: &Lookup) -> Result<Ari, ProdError> {
    match &lookup.obj.data {
        ObjData::Const(data) => Ok(data.value.clone()),
        ObjData::Var(data) => Ok(data.value.clone()),
        ObjData::Edd(data) => {
            let mut ctx = EddProdCtx {
                runctx,
                aparams: &lookup.aparams,
                result: None,
            };
            (data.produce.0)(&mut ctx);
            match ctx.result {
                Some(value) if !value.is_undefined() => Ok(value),
                _ => Err(ProdError::Failed {
                    obj: lookup.obj.id.name.clone(),
                }),
            }
        }
        _ => Err(ProdError::NotProducer {
            obj: lookup.obj.id.name.clone(),
        }),
    }
}
