//! Default configuration template and file creation.
//!
//! The template is a commented TOML file matching `Config::default()`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::error::ConfigError;
use crate::config::xdg;

/// A commented TOML template with all default values.
///
/// Every value here must match `Config::default()` from `schema.rs`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Search Console Configuration
#
# This file was generated with the built-in defaults.
# Edit values to customize the client.
#
# Location: $XDG_CONFIG_HOME/search-console/config.toml

# ==============================================================================
# Server
# ==============================================================================

[server]

# Address of the search server as host:port.
# Overridden by --address on the command line.
address = "127.0.0.1:3000"

# ==============================================================================
# Reconnect
# ==============================================================================

[reconnect]

# Delay before the first retry after a failed or dropped connection.
# The delay doubles on every consecutive failure.
# Examples: "500ms", "1s", "2s"
initial_delay = "1s"

# Upper bound for the retry delay.
max_delay = "5s"

# Consecutive failed attempts before the client gives up.
# 0 means retry forever.
max_attempts = 0

# ==============================================================================
# Prompt
# ==============================================================================

[prompt]

# Text shown before each query.
text = "Who are you looking for? "

# ==============================================================================
# Supervisor
# ==============================================================================

[supervisor]

# Start a fresh session after a fatal error instead of exiting.
restart_on_fatal = true

# Pause before the fresh session starts.
restart_delay = "1s"

# ==============================================================================
# Logging
# ==============================================================================

[log]

# Logging verbosity, written to stderr.
# Options: "error", "warn", "info", "debug", "trace"
# The SEARCH_CONSOLE_LOG environment variable takes precedence.
level = "warn"
"#;

/// Writes the default template to `path`.
///
/// - If the file exists and `force` is `false`, returns `ConfigError::AlreadyExists`.
/// - If the file exists and `force` is `true`, backs it up to `.toml.backup` first.
pub fn create_default_config(path: &Path, force: bool) -> Result<PathBuf, ConfigError> {
    if path.exists() {
        if !force {
            return Err(ConfigError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        let backup_path = path.with_extension("toml.backup");
        fs::rename(path, &backup_path).map_err(|e| ConfigError::WriteError {
            path: backup_path.clone(),
            source: e,
        })?;
        tracing::info!("Backed up existing config to {}", backup_path.display());
    }

    write_default_config(path)?;
    tracing::info!("Created default configuration at {}", path.display());
    Ok(path.to_path_buf())
}

/// Writes the template, creating parent dirs and setting 0600 permissions.
fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let write_error = |source| ConfigError::WriteError {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        xdg::ensure_dir(parent).map_err(write_error)?;
    }

    fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(write_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(write_error)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Config;

    #[test]
    fn template_values_match_config_default() {
        let from_template: Config =
            toml::from_str(DEFAULT_CONFIG_TEMPLATE).expect("template should parse");
        assert_eq!(from_template, Config::default());
    }

    #[test]
    fn template_contains_all_section_headers() {
        for section in ["[server]", "[reconnect]", "[prompt]", "[supervisor]", "[log]"] {
            assert!(
                DEFAULT_CONFIG_TEMPLATE.contains(section),
                "missing {section} section"
            );
        }
    }

    #[test]
    fn creates_file_and_parent_dirs() {
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let path = tmp.path().join("nested/search-console/config.toml");
        let written = create_default_config(&path, false).expect("should succeed");
        assert_eq!(written, path);
        let content = fs::read_to_string(&path).expect("should read");
        assert_eq!(content, DEFAULT_CONFIG_TEMPLATE);
    }

    #[test]
    fn without_force_returns_already_exists() {
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let path = tmp.path().join("config.toml");
        create_default_config(&path, false).expect("first call should succeed");
        let err = create_default_config(&path, false).expect_err("should fail");
        match err {
            ConfigError::AlreadyExists { path: p } => assert_eq!(p, path),
            other => panic!("expected AlreadyExists, got: {other:?}"),
        }
    }

    #[test]
    fn with_force_creates_backup() {
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let path = tmp.path().join("config.toml");
        fs::write(&path, "# custom content\n").expect("write custom config");

        create_default_config(&path, true).expect("force should succeed");

        let backup = path.with_extension("toml.backup");
        let backup_content = fs::read_to_string(&backup).expect("read backup");
        assert_eq!(backup_content, "# custom content\n");
        let content = fs::read_to_string(&path).expect("read new");
        assert_eq!(content, DEFAULT_CONFIG_TEMPLATE);
    }

    #[cfg(unix)]
    #[test]
    fn file_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempfile::tempdir().expect("failed to create temp dir");
        let path = tmp.path().join("config.toml");
        create_default_config(&path, false).expect("should succeed");
        let mode = fs::metadata(&path)
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600, "file should be owner-only read/write");
    }
}
