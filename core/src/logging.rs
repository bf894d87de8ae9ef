//! Thin `slog` wrapper, grounded on `flux::logging`: the rest of this
//! crate takes a `slog::Logger` wherever it logs and falls back to a
//! discarding root logger when the caller doesn't supply one.

use slog::{o, Discard, Drain, Logger};

/// A logger that throws every record away. Used as the default when
/// [`crate::transport::Transport::new`] is built without an explicit logger.
pub fn discard() -> Logger {
    Logger::root(Discard, o!())
}

/// Builds a terminal logger at the given minimum level, the same kind of
/// terminal drain `flux::logging::init` wires up via `sloggers`.
pub fn terminal(level: slog::Level) -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = std::sync::Mutex::new(drain).fuse();
    let drain = slog::LevelFilter::new(drain, level).fuse();
    Logger::root(drain, o!())
}
