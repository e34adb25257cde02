// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Unix datagram socket transport with hex-encoded ARI lines.
//!
//! Each datagram carries newline-delimited lines; each line is the
//! lowercase hex encoding of one canonical-binary ARI. Endpoint ARIs are
//! text strings holding the peer socket's filesystem path.

use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::{Transport, TransportError};
use crate::ari::Ari;
use crate::codec;
use crate::config;

/// Largest accepted datagram.
const MAX_DGRAM: usize = 65536;

pub struct UnixDgramTransport {
    sock: UnixDatagram,
    local_path: PathBuf,
}

impl UnixDgramTransport {
    /// Bind the agent socket at `path`, replacing any stale socket file.
    pub fn bind(path: impl AsRef<Path>) -> std::io::Result<UnixDgramTransport> {
        let path = path.as_ref().to_path_buf();
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        let sock = UnixDatagram::bind(&path)?;
        sock.set_read_timeout(Some(Duration::from_millis(config::TRANSPORT_POLL_MS)))?;
        log::info!("bound agent socket at {}", path.display());
        Ok(UnixDgramTransport {
            sock,
            local_path: path,
        })
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    fn dest_path(dest: &Ari) -> Result<PathBuf, TransportError> {
        match dest.as_text() {
            Some(text) => Ok(PathBuf::from(text)),
            None => Err(TransportError::BadEndpoint(dest.to_string())),
        }
    }
}

impl Drop for UnixDgramTransport {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.local_path);
    }
}

impl Transport for UnixDgramTransport {
    fn send(&self, values: &[Ari], dest: &Ari) -> Result<(), TransportError> {
        let path = Self::dest_path(dest)?;
        let mut payload = String::new();
        for value in values {
            payload.push_str(&hex::encode(codec::encode(value)));
            payload.push('\n');
        }
        self.sock.send_to(payload.as_bytes(), &path)?;
        Ok(())
    }

    fn recv(&self, running: &AtomicBool) -> Result<(Vec<Ari>, Ari), TransportError> {
        let mut buf = vec![0u8; MAX_DGRAM];
        loop {
            if !running.load(Ordering::Acquire) {
                return Err(TransportError::Eof);
            }
            let (len, peer) = match self.sock.recv_from(&mut buf) {
                Ok(ok) => ok,
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(e) => return Err(TransportError::Io(e)),
            };

            let src = peer
                .as_pathname()
                .map(|p| Ari::text(p.display().to_string()))
                .unwrap_or_else(|| Ari::text(""));

            let text = String::from_utf8_lossy(&buf[..len]);
            let mut values = Vec::new();
            for line in text.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let bytes = hex::decode(line).map_err(|_| {
                    TransportError::BadEndpoint(format!("non-hex line from {}", src))
                })?;
                let (value, consumed) = codec::decode(&bytes)?;
                if consumed != bytes.len() {
                    log::warn!("trailing bytes after ARI on socket line");
                }
                values.push(value);
            }
            return Ok((values, src));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_line_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let agent_path = dir.path().join("agent.sock");
        let mgr_path = dir.path().join("mgr.sock");

        let agent = UnixDgramTransport::bind(&agent_path).expect("bind agent");
        let mgr = UnixDgramTransport::bind(&mgr_path).expect("bind mgr");
        let running = AtomicBool::new(true);

        let execset = Ari::execset(Ari::uint(1), vec![Ari::ac(vec![])]);
        mgr.send(
            std::slice::from_ref(&execset),
            &Ari::text(agent_path.display().to_string()),
        )
        .expect("send");

        let (values, src) = agent.recv(&running).expect("recv");
        assert_eq!(values, vec![execset]);
        assert_eq!(src.as_text(), Some(mgr_path.display().to_string().as_str()));
    }

    #[test]
    fn test_socket_recv_observes_running_flag() {
        let dir = tempfile::tempdir().expect("tempdir");
        let agent = UnixDgramTransport::bind(dir.path().join("a.sock")).expect("bind");
        let running = AtomicBool::new(false);
        assert!(matches!(agent.recv(&running), Err(TransportError::Eof)));
    }
}
