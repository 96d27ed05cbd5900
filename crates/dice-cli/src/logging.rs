#![forbid(unsafe_code)]

//! Tracing subscriber setup.
//!
//! Logs always go to stderr; stdout carries the die rendering or the JSON
//! event stream.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    #[must_use]
    pub fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Filter from `--log-level` when given, else `RUST_LOG`, else `info`.
///
/// An unparsable directive falls back to `info` rather than failing startup.
#[must_use]
pub fn env_filter(level: Option<&str>) -> EnvFilter {
    let parsed = match level {
        Some(directives) => EnvFilter::try_new(directives).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    };
    parsed.unwrap_or_else(|| EnvFilter::new("info"))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init(level: Option<&str>, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(env_filter(level));
    let installed = match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    if installed.is_err() {
        tracing::debug!(target: "dice.cli", "global subscriber already installed");
    }
}
