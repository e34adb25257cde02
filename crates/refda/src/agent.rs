// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Agent state and lifecycle: the shared core, worker threads, and the
//! init / register / bind / start / stop sequence.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{bounded, Receiver, Sender};
use parking_lot::RwLock;

use crate::alarms::AlarmTable;
use crate::amm::{ObjStore, SemType, StoreError};
use crate::ari::{Ari, TimePoint};
use crate::config;
use crate::egress;
use crate::exec::worker::exec_worker;
use crate::exec::{ExecError, ExecInput, ExecStatus};
use crate::ingress;
use crate::instr::Instr;
use crate::runctx::RunCtx;
use crate::transport::Transport;

/// One queued message: an endpoint identity plus an ARI value. Ingress uses
/// the identity as the source; egress as the destination. A message whose
/// value is the undefined literal is an end-of-stream sentinel.
#[derive(Debug, Clone)]
pub struct MsgData {
    pub ident: Ari,
    pub value: Ari,
}

impl MsgData {
    pub fn sentinel() -> MsgData {
        MsgData {
            ident: Ari::undefined(),
            value: Ari::undefined(),
        }
    }
}

/// Agent error surfaced by lifecycle and registration operations.
#[derive(Debug)]
pub enum AgentError {
    Store(StoreError),
    Exec(ExecError),
    Lifecycle(String),
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentError::Store(e) => write!(f, "store error: {}", e),
            AgentError::Exec(e) => write!(f, "exec error: {}", e),
            AgentError::Lifecycle(msg) => write!(f, "lifecycle error: {}", msg),
        }
    }
}

impl std::error::Error for AgentError {}

impl From<StoreError> for AgentError {
    fn from(e: StoreError) -> Self {
        AgentError::Store(e)
    }
}

impl From<ExecError> for AgentError {
    fn from(e: ExecError) -> Self {
        AgentError::Exec(e)
    }
}

/// Shared agent state reachable from every worker and callback.
pub struct AgentCore {
    /// The object store behind its single reader/writer lock.
    pub store: RwLock<ObjStore>,
    pub instr: Instr,
    /// Daemon-run flag observed by all workers.
    pub running: AtomicBool,
    pub alarms: AlarmTable,
    execs_tx: Sender<ExecInput>,
    rptgs_tx: Sender<MsgData>,
}

impl fmt::Debug for AgentCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AgentCore")
    }
}

impl AgentCore {
    /// The agent's current wall-clock time.
    pub fn now(&self) -> TimePoint {
        TimePoint::now()
    }

    /// The semantic type recognizing MAC literals.
    pub fn mac_type(&self) -> SemType {
        crate::adm::amm_base::mac_type()
    }

    /// The semantic type recognizing EXPR literals.
    pub fn expr_type(&self) -> SemType {
        crate::adm::amm_base::expr_type()
    }

    /// The semantic type recognizing RPTT literals.
    pub fn rptt_type(&self) -> SemType {
        crate::adm::amm_base::rptt_type()
    }

    /// Enqueue input for the execution worker.
    pub(crate) fn send_exec(&self, input: ExecInput) {
        if self.execs_tx.send(input).is_err() {
            log::error!("exec queue is closed");
        }
    }

    /// Enqueue a report for the egress worker.
    pub(crate) fn send_rpt(&self, msg: MsgData) {
        if self.rptgs_tx.send(msg).is_err() {
            log::error!("reporting queue is closed");
        }
    }

    /// Signal end-of-stream to the execution worker.
    pub fn push_exec_sentinel(&self) {
        self.send_exec(ExecInput::Msg(MsgData::sentinel()));
    }

    /// Signal end-of-stream to the egress worker.
    pub(crate) fn push_rpt_sentinel(&self) {
        self.send_rpt(MsgData::sentinel());
    }

    /// Ingress entry point: enqueue one received ARI when it is an EXECSET.
    pub fn push_execset(&self, src: Ari, value: Ari) {
        if value.as_execset().is_none() {
            log::error!("ignoring input ARI that is not an EXECSET");
            return;
        }
        crate::instr::count(&self.instr.num_execset_recv);
        self.send_exec(ExecInput::Msg(MsgData { ident: src, value }));
    }
}

/// The agent: shared core plus worker thread handles.
pub struct Agent {
    core: Arc<AgentCore>,
    execs_rx: Option<Receiver<ExecInput>>,
    rptgs_rx: Option<Receiver<MsgData>>,
    workers: Vec<JoinHandle<()>>,
}

impl Default for Agent {
    fn default() -> Self {
        Agent::new()
    }
}

impl Agent {
    /// Create an agent with an empty store, counters, queues, and timeline.
    pub fn new() -> Agent {
        let (execs_tx, execs_rx) = bounded(config::EXECS_QUEUE_CAP);
        let (rptgs_tx, rptgs_rx) = bounded(config::RPTGS_QUEUE_CAP);
        Agent {
            core: Arc::new(AgentCore {
                store: RwLock::new(ObjStore::new()),
                instr: Instr::new(),
                running: AtomicBool::new(false),
                alarms: AlarmTable::new(),
                execs_tx,
                rptgs_tx,
            }),
            execs_rx: Some(execs_rx),
            rptgs_rx: Some(rptgs_rx),
            workers: Vec::new(),
        }
    }

    pub fn core(&self) -> &Arc<AgentCore> {
        &self.core
    }

    /// Register the builtin foundation ADMs in dependency order.
    pub fn register_builtins(&self) -> Result<(), AgentError> {
        crate::adm::register_builtins(&self.core)
    }

    /// Walk all registered references; any unresolved reference is a
    /// startup error.
    pub fn bindrefs(&self) -> Result<(), AgentError> {
        self.core.store.read().bind_refs()?;
        Ok(())
    }

    /// Launch the worker threads bound to a transport.
    pub fn start(&mut self, transport: Arc<dyn Transport>) -> Result<(), AgentError> {
        let execs_rx = self
            .execs_rx
            .take()
            .ok_or_else(|| AgentError::Lifecycle("agent already started".into()))?;
        let rptgs_rx = self
            .rptgs_rx
            .take()
            .ok_or_else(|| AgentError::Lifecycle("agent already started".into()))?;

        self.core.running.store(true, Ordering::Release);

        let spawn = |name: &str,
                     f: Box<dyn FnOnce() + Send>|
         -> Result<JoinHandle<()>, AgentError> {
            std::thread::Builder::new()
                .name(name.to_string())
                .spawn(f)
                .map_err(|e| AgentError::Lifecycle(format!("cannot spawn {}: {}", name, e)))
        };

        let core = self.core.clone();
        let t = transport.clone();
        self.workers.push(spawn(
            config::INGRESS_THREAD_NAME,
            Box::new(move || ingress::ingress_worker(core, t)),
        )?);

        let core = self.core.clone();
        let t = transport.clone();
        self.workers.push(spawn(
            config::EGRESS_THREAD_NAME,
            Box::new(move || egress::egress_worker(core, rptgs_rx, t)),
        )?);

        let core = self.core.clone();
        self.workers.push(spawn(
            config::EXEC_THREAD_NAME,
            Box::new(move || exec_worker(core, execs_rx)),
        )?);

        Ok(())
    }

    /// Inject an agent-directed execution target, returning its observable
    /// status.
    pub fn exec_target(&self, target: Ari) -> Arc<ExecStatus> {
        let runctx = RunCtx::agent_own(self.core.clone());
        let status = ExecStatus::new();
        self.core.send_exec(ExecInput::Target {
            runctx,
            target,
            status: Some(status.clone()),
        });
        status
    }

    /// Inject a target attributed to a manager, as if carried by an EXECSET
    /// with the given nonce.
    pub fn exec_target_for(&self, mgr: Ari, nonce: Ari, target: Ari) -> Arc<ExecStatus> {
        let runctx = Arc::new(RunCtx {
            core: self.core.clone(),
            acl_groups: crate::runctx::acl_groups_for(&mgr),
            mgr_ident: mgr,
            nonce,
        });
        let status = ExecStatus::new();
        self.core.send_exec(ExecInput::Target {
            runctx,
            target,
            status: Some(status.clone()),
        });
        status
    }

    /// Stop the workers: trip the running flag, enqueue end sentinels, and
    /// join.
    pub fn stop(&mut self) -> Result<(), AgentError> {
        self.core.running.store(false, Ordering::Release);
        self.core.push_exec_sentinel();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                log::error!("worker thread panicked during shutdown");
            }
        }
        Ok(())
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            let _ = self.stop();
        }
    }
}
