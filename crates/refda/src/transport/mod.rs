// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transport abstraction: a pair of receive/send primitives over ARI lists
//! with endpoint metadata. Endpoint identifiers are themselves ARIs,
//! typically text-string URIs.

pub mod mem;
pub mod socket;

pub use mem::{MemTransport, MgrLink};
pub use socket::UnixDgramTransport;

use std::fmt;
use std::sync::atomic::AtomicBool;

use crate::ari::Ari;
use crate::codec::CodecError;

/// Transport failure.
#[derive(Debug)]
pub enum TransportError {
    /// The peer closed the stream (`TRANSPORT_EOF`).
    Eof,
    Io(std::io::Error),
    Codec(CodecError),
    /// The destination endpoint ARI is not addressable by this transport.
    BadEndpoint(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Eof => f.write_str("end of stream"),
            TransportError::Io(e) => write!(f, "I/O error: {}", e),
            TransportError::Codec(e) => write!(f, "codec error: {}", e),
            TransportError::BadEndpoint(e) => write!(f, "bad endpoint: {}", e),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e)
    }
}

impl From<CodecError> for TransportError {
    fn from(e: CodecError) -> Self {
        TransportError::Codec(e)
    }
}

/// The two primitives every transport implements.
pub trait Transport: Send + Sync {
    /// Encode each ARI in binary form and frame them as a single message
    /// bound for `dest`. Must not reorder values.
    fn send(&self, values: &[Ari], dest: &Ari) -> Result<(), TransportError>;

    /// Block, respecting the running flag, for one inbound message; return
    /// the decoded ARI list with the source endpoint.
    fn recv(&self, running: &AtomicBool) -> Result<(Vec<Ari>, Ari), TransportError>;
}
