//! Stateless UDP relay: forwards raw datagrams between a controller and a
//! slave station without ever decoding them.
//!
//! A faithful Rust rendition of `netrelay.c`: two listening sockets
//! (slave-facing and controller-facing), each remembering only the most
//! recently seen peer address of the *opposite* role. A datagram arriving
//! on one socket is forwarded verbatim to the other socket's last known
//! peer; if there is no known peer yet, it is dropped with a log line
//! instead of queued, exactly as the original does nothing when the
//! opposite port is still zero.

use std::net::SocketAddr;

use clap::{App, Arg};
use mio::{Ready, Token};
use slog::{info, o, warn, Logger};

use linkcore::event_loop::EventLoop;
use linkcore::udp_endpoint::UdpEndpoint;

const CONTROLLER_TOKEN: Token = Token(0);
const SLAVE_TOKEN: Token = Token(1);

/// Port the relay listens on for datagrams from the controller station.
/// Matches `NETRELAY_CLIENT_STREAM_PORT` in the original.
const DEFAULT_CONTROLLER_PORT: u16 = 8500;
/// Port the relay listens on for datagrams from the slave station.
/// Matches `NETRELAY_SERVER_STREAM_PORT` in the original.
const DEFAULT_SLAVE_PORT: u16 = 12347;

fn main() -> std::io::Result<()> {
    let matches = App::new("linkrelay")
        .version("0.1.0")
        .author("Pleco Link Contributors")
        .about("Stateless UDP relay between a controller and a slave station")
        .arg(
            Arg::with_name("controller-port")
                .long("controller-port")
                .value_name("PORT")
                .help("Port to listen on for controller-side datagrams")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("slave-port")
                .long("slave-port")
                .value_name("PORT")
                .help("Port to listen on for slave-side datagrams")
                .takes_value(true),
        )
        .get_matches();

    let controller_port: u16 = matches
        .value_of("controller-port")
        .map(|v| v.parse().expect("controller-port must be a u16"))
        .unwrap_or(DEFAULT_CONTROLLER_PORT);
    let slave_port: u16 = matches
        .value_of("slave-port")
        .map(|v| v.parse().expect("slave-port must be a u16"))
        .unwrap_or(DEFAULT_SLAVE_PORT);

    let log = linkcore::logging::terminal(slog::Level::Info);
    let log = log.new(o!("component" => "linkrelay"));

    let event_loop = EventLoop::new()?;

    let controller_addr: SocketAddr = format!("0.0.0.0:{}", controller_port).parse().unwrap();
    let slave_addr: SocketAddr = format!("0.0.0.0:{}", slave_port).parse().unwrap();
    let controller_socket = UdpEndpoint::bind_to(controller_addr)?;
    let slave_socket = UdpEndpoint::bind_to(slave_addr)?;
    controller_socket.register(&event_loop, CONTROLLER_TOKEN, Ready::readable())?;
    slave_socket.register(&event_loop, SLAVE_TOKEN, Ready::readable())?;

    info!(log, "listening"; "controller_port" => controller_port, "slave_port" => slave_port);

    let mut last_controller: Option<SocketAddr> = None;
    let mut last_slave: Option<SocketAddr> = None;
    let mut buf = [0u8; 65536];

    loop {
        let events = event_loop.run_once(None)?;
        for (token, ready) in events {
            if !ready.is_readable() {
                continue;
            }
            match token {
                CONTROLLER_TOKEN => forward(
                    &log,
                    &controller_socket,
                    &slave_socket,
                    &mut buf,
                    &mut last_controller,
                    last_slave,
                    "controller",
                    "slave",
                ),
                SLAVE_TOKEN => forward(
                    &log,
                    &slave_socket,
                    &controller_socket,
                    &mut buf,
                    &mut last_slave,
                    last_controller,
                    "slave",
                    "controller",
                ),
                _ => {}
            }
        }
    }
}

/// Drains every pending datagram on `from`, recording the sender as the
/// new last-known address for its role, and forwards each one verbatim
/// to `last_peer` on `to` (if a peer has been seen yet).
#[allow(clippy::too_many_arguments)]
fn forward(
    log: &Logger,
    from: &UdpEndpoint,
    to: &UdpEndpoint,
    buf: &mut [u8],
    last_from: &mut Option<SocketAddr>,
    last_peer: Option<SocketAddr>,
    from_role: &str,
    to_role: &str,
) {
    loop {
        match from.recv_from(buf) {
            Ok((n, peer)) => {
                *last_from = Some(peer);
                match last_peer {
                    Some(peer_addr) => {
                        if let Err(err) = to.send_to_addr(&buf[..n], peer_addr) {
                            warn!(log, "forward failed"; "from" => from_role, "to" => to_role, "error" => %err);
                        }
                    }
                    None => {
                        warn!(log, "no known peer yet, dropping"; "from" => from_role, "to" => to_role, "bytes" => n);
                    }
                }
            }
            Err(_) => return,
        }
    }
}
