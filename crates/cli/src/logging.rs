//! Logging setup for the `rollcall` binary.
//!
//! Library crates emit `tracing` events; this module installs the subscriber.
//! Logs always go to stderr so `--json` output on stdout stays parseable.
//!
//! - `warn` (default): normalization warnings, dropped duplicate rows
//! - `info` (`-v`): load and run milestones
//! - `debug` (`-vv`): column-level detail
//! - `trace` (`-vvv`)
//!
//! `RUST_LOG` overrides the level chosen from `-v`.

use std::io;

use clap::ValueEnum;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable single-line format.
    #[default]
    Text,
    /// JSON lines for machine parsing.
    Json,
}

pub fn level_from_verbosity(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Default filter: our crates at `level`, everything else at `warn`.
fn default_directives(level: Level) -> String {
    let level = level.as_str().to_lowercase();
    format!("warn,rollcall={level},rollcall_recon={level},rollcall_io={level}")
}

/// Install the global subscriber. Call once, at startup.
pub fn init_logging(verbosity: u8, format: LogFormat) {
    let level = level_from_verbosity(verbosity);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    match format {
        LogFormat::Json => {
            let layer = fmt::layer().json().with_writer(io::stderr).with_target(true);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        LogFormat::Text => {
            let layer = fmt::layer()
                .compact()
                .with_writer(io::stderr)
                .with_target(false)
                .without_time();
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    }
}
