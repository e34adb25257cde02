// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Run context: the ambient state of one execution activity.

use std::sync::Arc;

use crate::agent::{AgentCore, MsgData};
use crate::ari::Ari;

/// Context for agent runtime activities: which agent, which manager caused
/// the activity (undefined when agent-initiated), the EXECSET nonce, and the
/// ACL groups derived from the source endpoint.
#[derive(Debug, Clone)]
pub struct RunCtx {
    pub core: Arc<AgentCore>,
    /// The manager identity which caused the execution; the undefined value
    /// when triggered by the agent itself (rules).
    pub mgr_ident: Ari,
    /// The enclosing EXECSET nonce; undefined outside EXECSET handling.
    pub nonce: Ari,
    /// Cached ACL-derived group ids. Policy is out of scope; the hook
    /// computes an empty set.
    pub acl_groups: Vec<u64>,
}

impl RunCtx {
    /// Context for agent-initiated work (rule actions, conditions).
    pub fn agent_own(core: Arc<AgentCore>) -> Arc<RunCtx> {
        Arc::new(RunCtx {
            core,
            mgr_ident: Ari::undefined(),
            nonce: Ari::undefined(),
            acl_groups: Vec::new(),
        })
    }

    /// Context for an incoming EXECSET message.
    pub fn from_msg(core: Arc<AgentCore>, msg: &MsgData) -> Arc<RunCtx> {
        let nonce = msg
            .value
            .as_execset()
            .map(|es| (*es.nonce).clone())
            .unwrap_or_else(Ari::undefined);
        let acl_groups = acl_groups_for(&msg.ident);
        Arc::new(RunCtx {
            core,
            mgr_ident: msg.ident.clone(),
            nonce,
            acl_groups,
        })
    }
}

/// ACL hook: derive group ids from a source endpoint. Authentication policy
/// is out of scope, so every source maps to the empty group set.
pub fn acl_groups_for(_src: &Ari) -> Vec<u64> {
    Vec::new()
}
