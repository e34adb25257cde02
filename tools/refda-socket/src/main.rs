// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Daemon binding a REFDA agent to a Unix datagram socket transport.
//!
//! Managers exchange newline-delimited hex-encoded binary ARIs with the
//! agent socket: EXECSETs inbound, RPTSETs outbound.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use refda::transport::UnixDgramTransport;
use refda::Agent;

#[derive(Parser, Debug)]
#[command(name = "refda-socket", about = "DTNMA reference agent over a Unix datagram socket")]
struct Args {
    /// Path for the agent's datagram socket.
    #[arg(short, long, default_value = "/tmp/refda.sock")]
    socket: PathBuf,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info")]
    log_level: log::LevelFilter,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .init();

    let transport =
        Arc::new(UnixDgramTransport::bind(&args.socket).with_context(|| {
            format!("cannot bind agent socket at {}", args.socket.display())
        })?);

    let mut agent = Agent::new();
    agent.register_builtins().context("ADM registration failed")?;
    agent.bindrefs().context("reference binding failed")?;
    agent.start(transport).context("worker startup failed")?;
    log::info!("agent running on {}", args.socket.display());

    let stop_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = stop_flag.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Release);
    })
    .context("cannot install signal handler")?;

    while !stop_flag.load(Ordering::Acquire) {
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    log::info!("shutting down");
    agent.stop().context("shutdown failed")?;
    Ok(())
}
