// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Egress worker: pop the reporting queue, hand ARIs to the transport.

use std::sync::Arc;

use crossbeam::channel::Receiver;

use crate::agent::{AgentCore, MsgData};
use crate::transport::Transport;

pub(crate) fn egress_worker(
    _core: Arc<AgentCore>,
    rptgs_rx: Receiver<MsgData>,
    transport: Arc<dyn Transport>,
) {
    log::info!("worker started");

    while let Ok(msg) = rptgs_rx.recv() {
        if msg.value.is_undefined() {
            // end-of-stream sentinel from the execution worker
            log::info!("got undefined report, stopping");
            break;
        }
        if let Err(err) = transport.send(&[msg.value], &msg.ident) {
            log::error!("failed to send report to {}: {}", msg.ident, err);
        }
    }

    log::info!("worker stopped");
}
