// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ingress worker: adapt the transport receive side to the execs queue,
//! admitting only EXECSET-typed ARIs.

use std::sync::Arc;

use crate::agent::AgentCore;
use crate::instr;
use crate::transport::{Transport, TransportError};

pub(crate) fn ingress_worker(core: Arc<AgentCore>, transport: Arc<dyn Transport>) {
    log::info!("worker started");

    while core.running.load(std::sync::atomic::Ordering::Acquire) {
        match transport.recv(&core.running) {
            Ok((values, src)) => {
                if values.is_empty() {
                    continue;
                }
                log::info!("message has {} ARIs", values.len());
                for value in values {
                    core.push_execset(src.clone(), value);
                }
            }
            Err(TransportError::Eof) => {
                log::info!("transport closed, stopping");
                // flush the input queue but keep the daemon running
                core.push_exec_sentinel();
                break;
            }
            Err(err) => {
                log::info!("transport receive failed ({}), stopping", err);
                instr::count(&core.instr.num_execset_recv_failure);
                core.push_exec_sentinel();
                break;
            }
        }
    }

    log::info!("worker stopped");
}
