//! Dumps the default station config as TOML, the same
//! `serdeconv::to_toml_string` round trip `gamerunner_config` uses.

#[path = "../config.rs"]
mod config;

use clap::{App, Arg};
use config::StationConfig;

fn main() {
    let matches = App::new("linkslave-gen-config")
        .version("0.1.0")
        .author("Pleco Link Contributors")
        .about("Prints the default linkslave config as TOML")
        .arg(
            Arg::with_name("OUT")
                .help("Write to this file instead of stdout")
                .index(1),
        )
        .get_matches();

    let toml = serdeconv::to_toml_string(&StationConfig::default()).expect("default config always serializes");

    match matches.value_of("OUT") {
        Some(path) => std::fs::write(path, toml).expect("failed to write config file"),
        None => println!("{}", toml),
    }
}
