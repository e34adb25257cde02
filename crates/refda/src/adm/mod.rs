// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Builtin ADM modules, initialized in dependency order: the amm-base
//! foundation typedefs first, then the agent and alarms modules that
//! reference them.

pub mod alarms;
pub mod amm_base;
pub mod dtnma_agent;

use std::sync::Arc;

use crate::agent::{AgentCore, AgentError};

/// Organization segment shared by the builtin modules.
pub const IETF_ORG_NAME: &str = "ietf";
pub const IETF_ORG_ENUM: i64 = 1;

/// Register every builtin ADM. Cross-ADM references resolve during the
/// later binding pass.
pub fn register_builtins(core: &Arc<AgentCore>) -> Result<(), AgentError> {
    amm_base::init(core)?;
    dtnma_agent::init(core)?;
    alarms::init(core)?;
    Ok(())
}
