// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory pair transport for tests and embedding: the agent side
//! implements [`Transport`]; the manager side drives it directly.
//!
//! Messages cross the pair in canonical binary form, so the codec is
//! exercised end-to-end exactly as on a real wire.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use super::{Transport, TransportError};
use crate::ari::Ari;
use crate::codec;
use crate::config;

/// Agent-side endpoint of the pair.
pub struct MemTransport {
    to_agent_rx: Receiver<(Vec<u8>, Ari)>,
    from_agent_tx: Sender<(Vec<u8>, Ari)>,
}

/// Manager-side endpoint of the pair.
pub struct MgrLink {
    to_agent_tx: Sender<(Vec<u8>, Ari)>,
    from_agent_rx: Receiver<(Vec<u8>, Ari)>,
    /// The manager endpoint identity presented as the message source.
    pub endpoint: Ari,
}

impl MemTransport {
    /// Build a connected pair.
    pub fn pair() -> (Arc<MemTransport>, MgrLink) {
        let (to_agent_tx, to_agent_rx) = unbounded();
        let (from_agent_tx, from_agent_rx) = unbounded();
        (
            Arc::new(MemTransport {
                to_agent_rx,
                from_agent_tx,
            }),
            MgrLink {
                to_agent_tx,
                from_agent_rx,
                endpoint: Ari::text("mem://mgr"),
            },
        )
    }
}

impl Transport for MemTransport {
    fn send(&self, values: &[Ari], dest: &Ari) -> Result<(), TransportError> {
        let bytes = codec::encode_list(values);
        self.from_agent_tx
            .send((bytes, dest.clone()))
            .map_err(|_| TransportError::Eof)
    }

    fn recv(&self, running: &AtomicBool) -> Result<(Vec<Ari>, Ari), TransportError> {
        let poll = Duration::from_millis(config::TRANSPORT_POLL_MS);
        loop {
            if !running.load(Ordering::Acquire) {
                return Err(TransportError::Eof);
            }
            match self.to_agent_rx.recv_timeout(poll) {
                Ok((bytes, src)) => {
                    let values = codec::decode_list(&bytes)?;
                    return Ok((values, src));
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(TransportError::Eof),
            }
        }
    }
}

impl MgrLink {
    /// Deliver ARIs to the agent as one message from this manager.
    pub fn send_values(&self, values: &[Ari]) -> Result<(), TransportError> {
        let bytes = codec::encode_list(values);
        self.to_agent_tx
            .send((bytes, self.endpoint.clone()))
            .map_err(|_| TransportError::Eof)
    }

    /// Wait for one agent-originated message; returns the decoded values
    /// and the destination endpoint the agent addressed.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<(Vec<Ari>, Ari)> {
        match self.from_agent_rx.recv_timeout(timeout) {
            Ok((bytes, dest)) => match codec::decode_list(&bytes) {
                Ok(values) => Some((values, dest)),
                Err(err) => {
                    log::error!("manager-side decode failed: {}", err);
                    None
                }
            },
            Err(_) => None,
        }
    }

    /// Close the manager-to-agent direction, signalling EOF to ingress.
    pub fn close(self) {
        drop(self.to_agent_tx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_roundtrip() {
        let (agent_side, mgr) = MemTransport::pair();
        let running = AtomicBool::new(true);

        mgr.send_values(&[Ari::execset(Ari::uint(1), vec![Ari::ac(vec![])])])
            .expect("send");
        let (values, src) = agent_side.recv(&running).expect("recv");
        assert_eq!(values.len(), 1);
        assert_eq!(src, Ari::text("mem://mgr"));

        agent_side
            .send(&[Ari::uint(5)], &src)
            .expect("send back");
        let (values, dest) = mgr
            .recv_timeout(Duration::from_millis(100))
            .expect("mgr recv");
        assert_eq!(values, vec![Ari::uint(5)]);
        assert_eq!(dest, Ari::text("mem://mgr"));
    }

    #[test]
    fn test_recv_observes_running_flag() {
        let (agent_side, _mgr) = MemTransport::pair();
        let running = AtomicBool::new(false);
        assert!(matches!(
            agent_side.recv(&running),
            Err(TransportError::Eof)
        ));
    }
}
