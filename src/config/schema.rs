//! TOML configuration schema types for the search console.
//!
//! All structs derive `Deserialize` and `Serialize` with defaults via
//! `#[serde(default)]`, so a partial file fills in the rest.
//!
//! Duration fields use human-readable strings (e.g. `"1s"`, `"250ms"`)
//! parsed by the `humantime` crate at the call site.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::ReconnectPolicy;
use crate::config::error::ConfigError;

/// Default search server address.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:3000";

/// Default prompt text.
pub const DEFAULT_PROMPT: &str = "Who are you looking for? ";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration encompassing all sections.
///
/// ```toml
/// [server]
/// [reconnect]
/// [prompt]
/// [supervisor]
/// [log]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Where the search server listens.
    pub server: ServerConfig,
    /// Connection retry behavior.
    pub reconnect: ReconnectConfig,
    /// Prompt appearance.
    pub prompt: PromptConfig,
    /// Session restart behavior.
    pub supervisor: SupervisorConfig,
    /// Logging verbosity.
    pub log: LogConfig,
}

impl Config {
    /// Checks every derived value, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.address.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "server.address must not be empty".to_string(),
            });
        }
        self.reconnect.policy()?;
        self.supervisor.restart_delay()?;
        Ok(())
    }
}

fn parse_duration(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value).map_err(|e| ConfigError::InvalidDuration {
        field,
        value: value.to_string(),
        message: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Search server endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// `host:port` of the search server.
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Reconnect
// ---------------------------------------------------------------------------

/// Connection retry settings from the `[reconnect]` section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before the first retry (e.g. `"1s"`).
    pub initial_delay: String,
    /// Cap for the doubling delay (e.g. `"5s"`).
    pub max_delay: String,
    /// Consecutive failures before giving up. `0` retries forever.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: "1s".to_string(),
            max_delay: "5s".to_string(),
            max_attempts: 0,
        }
    }
}

impl ReconnectConfig {
    /// Parses the section into a [`ReconnectPolicy`].
    pub fn policy(&self) -> Result<ReconnectPolicy, ConfigError> {
        let initial_delay = parse_duration("reconnect.initial_delay", &self.initial_delay)?;
        let max_delay = parse_duration("reconnect.max_delay", &self.max_delay)?;
        if initial_delay > max_delay {
            return Err(ConfigError::Invalid {
                message: format!(
                    "reconnect.initial_delay ({}) exceeds reconnect.max_delay ({})",
                    self.initial_delay, self.max_delay
                ),
            });
        }
        Ok(ReconnectPolicy {
            initial_delay,
            max_delay,
            max_attempts: self.max_attempts,
        })
    }
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PromptConfig {
    /// Text shown before each query.
    pub text: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            text: DEFAULT_PROMPT.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Supervisor
// ---------------------------------------------------------------------------

/// Restart settings from the `[supervisor]` section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Start a fresh session after a fatal error instead of exiting.
    pub restart_on_fatal: bool,
    /// Pause before the fresh session starts.
    pub restart_delay: String,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart_on_fatal: true,
            restart_delay: "1s".to_string(),
        }
    }
}

impl SupervisorConfig {
    /// Parsed `restart_delay`.
    pub fn restart_delay(&self) -> Result<Duration, ConfigError> {
        parse_duration("supervisor.restart_delay", &self.restart_delay)
    }
}

// ---------------------------------------------------------------------------
// Log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    /// Verbosity when `SEARCH_CONSOLE_LOG` is unset.
    pub level: LogLevel,
}

/// Log verbosity levels (kebab-case in TOML).
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LogLevel {
    /// Only errors.
    Error,
    /// Errors and warnings (default).
    #[default]
    Warn,
    /// Informational messages.
    Info,
    /// Debug-level detail.
    Debug,
    /// Full trace output.
    Trace,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_config_all_fields() {
        let toml_str = r#"
[server]
address = "10.0.0.5:4000"

[reconnect]
initial_delay = "250ms"
max_delay = "2s"
max_attempts = 3

[prompt]
text = "> "

[supervisor]
restart_on_fatal = false
restart_delay = "500ms"

[log]
level = "debug"
"#;
        let config: Config = toml::from_str(toml_str).expect("valid TOML should parse");
        assert_eq!(config.server.address, "10.0.0.5:4000");
        assert_eq!(config.reconnect.initial_delay, "250ms");
        assert_eq!(config.reconnect.max_delay, "2s");
        assert_eq!(config.reconnect.max_attempts, 3);
        assert_eq!(config.prompt.text, "> ");
        assert!(!config.supervisor.restart_on_fatal);
        assert_eq!(config.supervisor.restart_delay, "500ms");
        assert_eq!(config.log.level, LogLevel::Debug);
    }

    #[test]
    fn parse_empty_string_uses_all_defaults() {
        let config: Config = toml::from_str("").expect("empty string should parse");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn parse_unknown_fields_are_ignored() {
        let toml_str = r#"
unknown_key = "hello"

[server]
future_field = 42
"#;
        let config: Config = toml::from_str(toml_str).expect("unknown fields should be ignored");
        assert_eq!(config.server.address, DEFAULT_ADDRESS);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[reconnect]
max_attempts = 5
"#;
        let config: Config = toml::from_str(toml_str).expect("partial config should parse");
        assert_eq!(config.reconnect.max_attempts, 5);
        assert_eq!(config.reconnect.initial_delay, "1s");
        assert_eq!(config.prompt.text, DEFAULT_PROMPT);
        assert!(config.supervisor.restart_on_fatal);
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.server.address, "127.0.0.1:3000");
        assert_eq!(config.prompt.text, "Who are you looking for? ");
        assert_eq!(config.log.level, LogLevel::Warn);
        assert_eq!(config.reconnect.max_attempts, 0);
    }

    #[test]
    fn default_policy_matches_transport_default() {
        let policy = Config::default()
            .reconnect
            .policy()
            .expect("default durations should parse");
        assert_eq!(policy, ReconnectPolicy::default());
    }

    #[test]
    fn policy_parses_humantime_values() {
        let reconnect = ReconnectConfig {
            initial_delay: "200ms".to_string(),
            max_delay: "1m".to_string(),
            max_attempts: 2,
        };
        let policy = reconnect.policy().expect("should parse");
        assert_eq!(policy.initial_delay, Duration::from_millis(200));
        assert_eq!(policy.max_delay, Duration::from_secs(60));
        assert_eq!(policy.max_attempts, 2);
    }

    #[test]
    fn policy_rejects_bad_duration() {
        let reconnect = ReconnectConfig {
            max_delay: "soon".to_string(),
            ..ReconnectConfig::default()
        };
        match reconnect.policy() {
            Err(ConfigError::InvalidDuration { field, value, .. }) => {
                assert_eq!(field, "reconnect.max_delay");
                assert_eq!(value, "soon");
            }
            other => panic!("expected InvalidDuration, got: {other:?}"),
        }
    }

    #[test]
    fn policy_rejects_initial_above_max() {
        let reconnect = ReconnectConfig {
            initial_delay: "10s".to_string(),
            max_delay: "5s".to_string(),
            max_attempts: 0,
        };
        assert!(matches!(
            reconnect.policy(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn restart_delay_parses() {
        let supervisor = SupervisorConfig::default();
        assert_eq!(
            supervisor.restart_delay().expect("should parse"),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn validate_catches_each_section() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.server.address = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.supervisor.restart_delay = "whenever".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDuration {
                field: "supervisor.restart_delay",
                ..
            })
        ));
    }

    #[test]
    fn log_level_all_variants() {
        for (input, expected) in [
            ("error", LogLevel::Error),
            ("warn", LogLevel::Warn),
            ("info", LogLevel::Info),
            ("debug", LogLevel::Debug),
            ("trace", LogLevel::Trace),
        ] {
            let toml_str = format!("level = \"{}\"", input);
            let log: LogConfig = toml::from_str(&toml_str).expect("log level should parse");
            assert_eq!(log.level, expected);
            assert_eq!(log.level.as_str(), input);
        }
    }

    #[test]
    fn invalid_log_level_returns_error() {
        let result: Result<LogConfig, _> = toml::from_str(r#"level = "verbose""#);
        assert!(result.is_err());
    }

    #[test]
    fn roundtrip_serialize_deserialize() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).expect("serialization should succeed");
        let parsed: Config = toml::from_str(&toml_str).expect("roundtrip should parse");
        assert_eq!(config, parsed);
    }
}
