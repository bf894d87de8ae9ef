//! Demo controller station: sends periodic drive values and pings,
//! prints everything it hears back from the slave. Anchors the
//! environment/CLI contract named for station binaries: the relay
//! host/port may come from `LINK_RELAY_HOST`/`LINK_RELAY_PORT`, a config
//! file, or the first positional argument - in that order of increasing
//! precedence - mirroring `controller/main.cpp`'s `PLECO_RELAY_IP`
//! handling.

mod config;

use std::time::Duration;

use clap::{App, Arg};
use slog::{info, o};

use linkcore::event_loop::EventLoop;
use linkcore::message::{subtype_name, well_known};
use linkcore::transport::Transport;

use config::StationConfig;

fn main() -> std::io::Result<()> {
    let matches = App::new("linkcontroller")
        .version("0.1.0")
        .author("Pleco Link Contributors")
        .about("Demo controller station")
        .arg(Arg::with_name("RELAY_HOST").help("Relay host, overrides LINK_RELAY_HOST and the config file").index(1))
        .arg(
            Arg::with_name("port")
                .long("port")
                .value_name("PORT")
                .help("Relay port, overrides LINK_RELAY_PORT and the config file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("config")
                .long("config")
                .value_name("FILE")
                .help("Path to a TOML config file")
                .takes_value(true),
        )
        .get_matches();

    let mut config = match matches.value_of("config") {
        Some(path) => StationConfig::load(path).unwrap_or_else(|err| {
            eprintln!("failed to read config {}: {}, using defaults", path, err);
            StationConfig::default()
        }),
        None => StationConfig::default(),
    };

    if let Ok(host) = std::env::var("LINK_RELAY_HOST") {
        config.relay_host = host;
    }
    if let Ok(port) = std::env::var("LINK_RELAY_PORT") {
        if let Ok(port) = port.parse() {
            config.relay_port = port;
        }
    }
    if let Some(host) = matches.value_of("RELAY_HOST") {
        config.relay_host = host.to_string();
    }
    if let Some(port) = matches.value_of("port") {
        config.relay_port = port.parse().expect("port must be a u16");
    }

    let log = config.build_logger();
    let log = log.new(o!("component" => "linkcontroller"));

    let event_loop = EventLoop::new()?;
    let transport = Transport::new(&event_loop, config.relay_host.clone(), config.relay_port, Some(log.clone()))?;

    {
        let log = log.clone();
        transport.on_connection_status(move |status| info!(log, "connection status changed"; "status" => %status));
    }
    {
        let log = log.clone();
        transport.on_rtt(move |rtt| info!(log, "round trip"; "rtt_ms" => rtt.as_millis() as u64));
    }
    {
        let log = log.clone();
        transport.on_resend_counter(move |count| info!(log, "resend count"; "count" => count));
    }
    {
        let log = log.clone();
        transport.on_network_rate(move |payload_rx, total_rx, payload_tx, total_tx| {
            info!(log, "network rate";
                "payload_rx_bps" => payload_rx, "total_rx_bps" => total_rx,
                "payload_tx_bps" => payload_tx, "total_tx_bps" => total_tx);
        });
    }
    {
        let log = log.clone();
        transport.on_value(move |subtype, value| {
            info!(log, "telemetry value"; "subtype" => subtype_name(subtype), "value" => value)
        });
    }

    transport.enable_auto_ping(config.auto_ping);

    info!(log, "started"; "relay_host" => config.relay_host.as_str(), "relay_port" => config.relay_port);

    let mut turn = 0u16;
    loop {
        transport.step(Some(Duration::from_millis(100)))?;
        transport.send_value(well_known::SPEED_TURN, turn);
        turn = turn.wrapping_add(1);
    }
}
