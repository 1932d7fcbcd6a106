//! Tracing subscriber setup for the binary.
//!
//! The library only emits events; the binary installs a subscriber here.
//! Output goes to stderr because stdout carries JSON-RPC traffic in session
//! mode.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging options.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Verbosity level (`-v` count).
    pub verbosity: u8,
    /// Filter directive that overrides verbosity (e.g., from `RUST_LOG`).
    pub env_filter: Option<String>,
}

impl LoggingConfig {
    /// Creates a config from a `-v` count, honouring `RUST_LOG` when set.
    pub fn from_verbosity(verbosity: u8) -> Self {
        Self {
            verbosity,
            env_filter: std::env::var("RUST_LOG").ok().filter(|v| !v.is_empty()),
        }
    }

    /// Converts verbosity to a filter string.
    pub fn verbosity_to_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Installs the global subscriber.
    pub fn init(self) -> anyhow::Result<()> {
        let filter = match &self.env_filter {
            Some(directive) => EnvFilter::try_new(directive)?,
            None => EnvFilter::try_new(self.verbosity_to_filter())?,
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact();

        Registry::default().with(filter).with(fmt_layer).try_init()?;
        Ok(())
    }
}
