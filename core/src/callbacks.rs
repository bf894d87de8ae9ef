//! Callback registration surface for [`crate::transport::Transport`].
//!
//! Modeled as a configuration struct of optional boxed closures rather
//! than a trait object the caller implements, per the open-question
//! decision recorded in DESIGN.md: it lets a station register only the
//! callbacks it cares about and keeps `Transport::new` free of a generic
//! parameter.

use std::time::Duration;

use crate::message::Subtype;

/// Connection liveness as tracked by the resend/connection-timeout state
/// machine. Starts at `Lost` until the first inbound datagram arrives.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ConnectionStatus {
    Ok,
    Retrying,
    Lost,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        ConnectionStatus::Lost
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionStatus::Ok => "Ok",
            ConnectionStatus::Retrying => "Retrying",
            ConnectionStatus::Lost => "Lost",
        };
        f.write_str(s)
    }
}

#[derive(Default)]
pub struct Callbacks {
    pub on_rtt: Option<Box<dyn FnMut(Duration)>>,
    pub on_resend_timeout: Option<Box<dyn FnMut(u64)>>,
    pub on_resend_counter: Option<Box<dyn FnMut(u32)>>,
    pub on_video: Option<Box<dyn FnMut(Vec<u8>, Subtype)>>,
    pub on_audio: Option<Box<dyn FnMut(Vec<u8>)>>,
    pub on_debug: Option<Box<dyn FnMut(String)>>,
    pub on_value: Option<Box<dyn FnMut(Subtype, u16)>>,
    pub on_periodic_value: Option<Box<dyn FnMut(Subtype, u16)>>,
    pub on_network_rate: Option<Box<dyn FnMut(u64, u64, u64, u64)>>,
    pub on_connection_status: Option<Box<dyn FnMut(ConnectionStatus)>>,
}
