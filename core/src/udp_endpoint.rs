//! Non-blocking UDP socket with lazy, self-healing address resolution
//! (C4), built on `mio::net::UdpSocket`.
//!
//! Resolution mirrors the lazy resolve-then-reuse pattern in the original
//! `Transmitter::sendMessage`: a `(host, port)` pair is resolved to a
//! `SocketAddr` on first use and the result is cached; a send failure
//! invalidates the cache so a transient DNS hiccup or peer restart
//! self-heals on the next send instead of wedging forever on a stale
//! address.

use std::cell::RefCell;
use std::net::{SocketAddr, ToSocketAddrs};

use mio::net::UdpSocket;
use mio::{Ready, Token};

use crate::error::NetError;
use crate::event_loop::EventLoop;

/// Datagrams larger than this are never produced by this crate, but a
/// buffer this size is kept for `recv_from` so a misbehaving peer's
/// oversized datagram is still detected (and counted as a receive error)
/// rather than silently truncated without notice.
pub const RECV_BUFFER_LEN: usize = 65536;

pub struct UdpEndpoint {
    socket: UdpSocket,
    cache: RefCell<Option<(String, u16, SocketAddr)>>,
}

impl UdpEndpoint {
    /// Binds an ephemeral local port on all interfaces.
    pub fn bind() -> std::io::Result<UdpEndpoint> {
        let addr: SocketAddr = "0.0.0.0:0".parse().expect("valid bind address literal");
        Self::bind_to(addr)
    }

    pub fn bind_to(addr: SocketAddr) -> std::io::Result<UdpEndpoint> {
        Ok(UdpEndpoint {
            socket: UdpSocket::bind(&addr)?,
            cache: RefCell::new(None),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Exposes the raw socket for [`crate::event_loop::EventLoop::register_io`].
    pub(crate) fn evented(&self) -> &UdpSocket {
        &self.socket
    }

    /// Registers this socket's readiness on `event_loop` under `token`,
    /// for callers outside this crate that drive their own event loop
    /// directly (the relay daemon has no `Transport` of its own).
    pub fn register(&self, event_loop: &EventLoop, token: Token, interest: Ready) -> std::io::Result<()> {
        event_loop.register_io(&self.socket, token, interest)
    }

    fn resolve(&self, host: &str, port: u16) -> Result<SocketAddr, NetError> {
        if let Some((cached_host, cached_port, addr)) = self.cache.borrow().as_ref() {
            if cached_host == host && *cached_port == port {
                return Ok(*addr);
            }
        }

        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|_| NetError::ResolveFailed)?
            .next()
            .ok_or(NetError::ResolveFailed)?;

        *self.cache.borrow_mut() = Some((host.to_string(), port, addr));
        Ok(addr)
    }

    /// Sends `bytes` to `host:port`, resolving (and caching) the address
    /// on first use. A send failure invalidates the cache.
    pub fn send_to(&self, bytes: &[u8], host: &str, port: u16) -> Result<usize, NetError> {
        let addr = self.resolve(host, port)?;
        match self.socket.send_to(bytes, &addr) {
            Ok(n) => Ok(n),
            Err(err) => {
                self.cache.borrow_mut().take();
                Err(NetError::SendFailed(err))
            }
        }
    }

    /// Non-blocking receive. `WouldBlock` means "no datagram pending" and
    /// should be treated as a normal, silent condition by the caller.
    pub fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), NetError> {
        self.socket.recv_from(buf).map_err(NetError::RecvFailed)
    }

    /// Sends to an already-resolved address, bypassing the host/port
    /// cache. Used by the relay daemon, which only ever forwards to
    /// addresses it just observed in a `recv_from` and has no concept of
    /// a hostname to resolve.
    pub fn send_to_addr(&self, bytes: &[u8], addr: SocketAddr) -> Result<usize, NetError> {
        self.socket.send_to(bytes, &addr).map_err(NetError::SendFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_an_ephemeral_port() {
        let endpoint = UdpEndpoint::bind().unwrap();
        assert!(endpoint.local_addr().unwrap().port() > 0);
    }

    #[test]
    fn loopback_round_trip() {
        let a = UdpEndpoint::bind().unwrap();
        let b = UdpEndpoint::bind().unwrap();
        let b_port = b.local_addr().unwrap().port();

        // mio UdpSocket is non-blocking; retry until the datagram lands.
        let mut sent = false;
        for _ in 0..100 {
            if a.send_to(b"hi", "127.0.0.1", b_port).is_ok() {
                sent = true;
                break;
            }
        }
        assert!(sent);

        let mut buf = [0u8; 16];
        let mut received = None;
        for _ in 0..10_000 {
            match b.recv_from(&mut buf) {
                Ok((n, _)) => {
                    received = Some(n);
                    break;
                }
                Err(_) => std::thread::yield_now(),
            }
        }
        assert_eq!(received, Some(2));
        assert_eq!(&buf[..2], b"hi");
    }
}
