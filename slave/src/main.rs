//! Demo slave station: answers pings, reports battery/temperature values
//! on a periodic timer, and forwards any debug text it receives to its
//! own log. Anchors the same environment/CLI contract as the controller
//! binary (`LINK_RELAY_HOST`/`LINK_RELAY_PORT`, optional config file,
//! first positional argument wins).

mod config;

use std::time::{Duration, Instant};

use clap::{App, Arg};
use slog::{info, o};

use linkcore::event_loop::EventLoop;
use linkcore::message::{subtype_name, well_known};
use linkcore::transport::Transport;

use config::StationConfig;

fn main() -> std::io::Result<()> {
    let matches = App::new("linkslave")
        .version("0.1.0")
        .author("Pleco Link Contributors")
        .about("Demo slave station")
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
    let log = log.new(o!("component" => "linkslave"));

    let event_loop = EventLoop::new()?;
    let transport = Transport::new(&event_loop, config.relay_host.clone(), config.relay_port, Some(log.clone()))?;

    {
        let log = log.clone();
        transport.on_connection_status(move |status| info!(log, "connection status changed"; "status" => %status));
    }
    {
        let log = log.clone();
        transport.on_value(move |subtype, value| {
            info!(log, "drive command"; "subtype" => subtype_name(subtype), "value" => value)
        });
    }
    {
        let log = log.clone();
        transport.on_debug(move |text| info!(log, "debug from peer"; "text" => %text));
    }

    transport.enable_auto_ping(config.auto_ping);

    info!(log, "started"; "relay_host" => config.relay_host.as_str(), "relay_port" => config.relay_port);

    let mut last_telemetry = Instant::now();
    loop {
        transport.step(Some(Duration::from_millis(100)))?;
        if last_telemetry.elapsed() >= Duration::from_secs(1) {
            transport.send_periodic_value(well_known::BATTERY_VOLTAGE, 126);
            transport.send_periodic_value(well_known::TEMPERATURE, 38);
            last_telemetry = Instant::now();
        }
    }
}
