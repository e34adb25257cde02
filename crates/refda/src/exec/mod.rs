// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution engine: target expansion, the cooperative run loop with
//! deferred finishes, EXECSET intake, and the rule-scheduler arm.

pub mod ctx;
pub mod proc;
pub mod rules;
pub mod seq;
pub mod worker;

pub use ctx::CtrlExecCtx;
pub use seq::{ExecItem, ExecSeq, ExecStage, ExecStatus};

use std::fmt;
use std::sync::Arc;

use crate::agent::MsgData;
use crate::ari::Ari;
use crate::runctx::RunCtx;

/// Expansion failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecError {
    /// A literal target that is not a MAC, or a reference to an object kind
    /// that cannot execute (`EXEC_BAD_TYPE`).
    BadType,
    /// Target dereference failed (`EXEC_DEREF_FAILED`).
    DerefFailed,
    /// A value-producing reference failed during expansion
    /// (`EXEC_PROD_FAILED`).
    ProdFailed,
    /// A rule operation addressed an object that is not a rule or could not
    /// be updated.
    BadRule,
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::BadType => f.write_str("target is not executable"),
            ExecError::DerefFailed => f.write_str("target dereference failed"),
            ExecError::ProdFailed => f.write_str("target production failed"),
            ExecError::BadRule => f.write_str("object is not a usable rule"),
        }
    }
}

impl std::error::Error for ExecError {}

/// Input to the execution worker.
pub enum ExecInput {
    /// A message from ingress: an EXECSET, or the undefined sentinel that
    /// signals end-of-stream.
    Msg(MsgData),
    /// A directly injected target with an optional observable status.
    Target {
        runctx: Arc<RunCtx>,
        target: Ari,
        status: Option<Arc<ExecStatus>>,
    },
}
