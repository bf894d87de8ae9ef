//! Error taxonomy for the link layer.
//!
//! Mirrors the hand-rolled `NetworkError`/`ErrorType` split the rest of
//! this codebase uses instead of a generic boxed error: codec failures
//! are locally recoverable (drop the datagram), network failures are
//! logged and left to the resend timer or the caller to notice.

use std::fmt;
use std::io;

/// Failure decoding a raw datagram into a [`crate::message::Message`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CodecError {
    /// Buffer shorter than the 6-byte mandatory header.
    TooShort,
    /// The type byte isn't one of the known `MessageType` values.
    UnknownType(u8),
    /// Buffer long enough but shorter than the minimum length for its type.
    TooShortForType,
    /// Embedded CRC does not match the recomputed CRC.
    CrcMismatch,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::TooShort => write!(f, "datagram shorter than the mandatory header"),
            CodecError::UnknownType(t) => write!(f, "unknown message type {}", t),
            CodecError::TooShortForType => write!(f, "datagram shorter than the minimum length for its type"),
            CodecError::CrcMismatch => write!(f, "CRC mismatch"),
        }
    }
}

/// Failure in the UDP transport plumbing. Never surfaced to the application
/// directly - only through logging and the resend/connection-status callbacks.
#[derive(Debug)]
pub enum NetError {
    SendFailed(io::Error),
    RecvFailed(io::Error),
    ResolveFailed,
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetError::SendFailed(err) => write!(f, "send failed: {}", err),
            NetError::RecvFailed(err) => write!(f, "recv failed: {}", err),
            NetError::ResolveFailed => write!(f, "failed to resolve relay address"),
        }
    }
}

impl From<io::Error> for NetError {
    #[inline]
    fn from(err: io::Error) -> Self {
        NetError::RecvFailed(err)
    }
}

/// Internal-only protocol conditions. Never returned to the application;
/// see spec §7 propagation policy.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ProtocolError {
    /// An ACK referenced a resend slot whose stored CRC no longer matches.
    SupersededAck,
    /// No inbound datagram arrived before the connection timeout fired.
    Timeout,
}
