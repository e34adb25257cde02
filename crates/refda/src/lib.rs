// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # REFDA - DTNMA Reference Agent runtime
//!
//! A pure Rust implementation of the core runtime of a Delay-Tolerant
//! Network Management Architecture (DTNMA) reference agent: an autonomous
//! managed entity that receives execution sets (EXECSET) from managers,
//! carries them out against its local typed data model, and emits report
//! sets (RPTSET) in return.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use refda::{Agent, transport::MemTransport};
//!
//! fn main() -> Result<(), refda::AgentError> {
//!     let (agent_side, _mgr_side) = MemTransport::pair();
//!     let mut agent = Agent::new();
//!     agent.register_builtins()?;
//!     agent.bindrefs()?;
//!     agent.start(agent_side)?;
//!     // ... the agent now serves EXECSETs until stop()
//!     agent.stop()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                          Agent Lifecycle                           |
//! |        init -> register ADMs -> bindrefs -> start -> stop          |
//! +--------------------------------------------------------------------+
//! |                         Execution Engine                           |
//! |  EXECSET intake | expansion | run loop | timeline | TBR/SBR rules  |
//! +--------------------------------------------------------------------+
//! |                     Data Model & Evaluation                        |
//! |  object store | semantic types | dereference | valprod | EXPR eval |
//! +--------------------------------------------------------------------+
//! |                        Value & Transport                           |
//! |   ARI model | binary codec | text codec | ingress/egress workers   |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Agent`] | Lifecycle owner: store, queues, worker threads |
//! | [`ari::Ari`] | The universal value: literal or object reference |
//! | [`amm::ObjStore`] | Namespaces of typed object descriptors |
//! | [`transport::Transport`] | Receive/send contract for manager links |

/// Builtin ADM modules (amm-base, dtnma-agent, alarms).
pub mod adm;
/// Agent state and lifecycle.
pub mod agent;
/// Alarm bookkeeping keyed by (resource, category).
pub mod alarms;
/// Object store, semantic typing, dereference and parameter binding.
pub mod amm;
/// ARI value model: literals, references, time values.
pub mod ari;
/// Canonical binary codec and diagnostic text codec.
pub mod codec;
/// Global configuration constants.
pub mod config;
/// Egress worker (reporting queue to transport).
pub mod egress;
/// Expression evaluator over reverse-Polish operand streams.
pub mod eval;
/// Execution engine: sequences, expansion, worker, rules.
pub mod exec;
/// Ingress worker (transport to execs queue).
pub mod ingress;
/// Instrumentation counters.
pub mod instr;
/// Reporting: RPTT walks and RPTSET assembly.
pub mod reporting;
/// Run context for execution activities.
pub mod runctx;
/// Timeline of scheduled events.
pub mod timeline;
/// Transport abstraction and bundled implementations.
pub mod transport;
/// Value production from CONST/VAR/EDD objects.
pub mod valprod;

pub use agent::{Agent, AgentCore, AgentError, MsgData};
pub use ari::{Ari, AriType, ObjRef, ObjType, RefSeg, TimeDuration, TimePoint};
pub use runctx::RunCtx;
