//! Optional TOML configuration, round-tripped with `serde` + `serdeconv`
//! the same way `GameConfig`/`authenticator::core::Config` do. Nothing
//! here persists anything linkcore itself produces - only the station's
//! own startup parameters.

use serde_derive::{Deserialize, Serialize};
use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::Severity;
use sloggers::Build;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StationConfig {
    pub relay_host: String,
    pub relay_port: u16,
    pub auto_ping: bool,
    pub log_level: String,
}

impl Default for StationConfig {
    fn default() -> Self {
        StationConfig {
            relay_host: "127.0.0.1".to_string(),
            relay_port: 8500,
            auto_ping: true,
            log_level: "info".to_string(),
        }
    }
}

impl StationConfig {
    pub fn load(path: &str) -> Result<StationConfig, serdeconv::Error> {
        serdeconv::from_toml_file(path)
    }

    /// Builds a terminal logger at `log_level`, the same `sloggers`
    /// terminal-drain construction `flux::logging::init` performs.
    pub fn build_logger(&self) -> slog::Logger {
        let severity = self.log_level.parse().unwrap_or(Severity::Info);
        let mut builder = TerminalLoggerBuilder::new();
        builder.level(severity);
        builder.destination(Destination::Stderr);
        builder.build().expect("terminal logger always builds")
    }
}
