//! Logging initialization.
//!
//! Configures the `tracing` subscriber with level filtering via the
//! `SEARCH_CONSOLE_LOG` environment variable, falling back to the level from
//! the config file. Output goes to stderr so it never mixes with results.
//!
//! ```bash
//! SEARCH_CONSOLE_LOG=debug search-console
//! SEARCH_CONSOLE_LOG=search_console::client=trace,warn search-console
//! ```

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::schema::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV: &str = "SEARCH_CONSOLE_LOG";

/// Builds the filter: `SEARCH_CONSOLE_LOG` when set and valid, else `fallback`.
pub fn filter(fallback: LogLevel) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback.as_str()))
}

/// Installs the global subscriber. Does nothing if one is already set.
pub fn init(fallback: LogLevel) {
    let installed = fmt()
        .with_env_filter(filter(fallback))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    if installed.is_err() {
        tracing::debug!("Global subscriber already set");
    }
}
