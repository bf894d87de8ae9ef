//! Reliable-datagram transport and framed message codec for a
//! controller/slave telepresence link.
//!
//! A [`transport::Transport`] owns one non-blocking UDP socket
//! ([`udp_endpoint::UdpEndpoint`]) and drives it, together with its own
//! resend/keepalive/rate timers, off a single [`event_loop::EventLoop`].
//! Everything this crate sends or receives is framed by
//! [`message::Message`]; the relay between two `Transport`s never
//! inspects that framing, it only forwards bytes.

pub mod callbacks;
pub mod error;
pub mod event_loop;
pub mod logging;
pub mod message;
pub mod timer;
pub mod transport;
pub mod udp_endpoint;

pub use callbacks::{Callbacks, ConnectionStatus};
pub use error::{CodecError, NetError, ProtocolError};
pub use event_loop::EventLoop;
pub use message::{full_type, FullType, Message, MessageType, Subtype};
pub use timer::Timer;
pub use transport::Transport;
pub use udp_endpoint::UdpEndpoint;
