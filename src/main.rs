//! Search console - CLI entry point
//!
//! Without a subcommand, runs the interactive client against the configured
//! search server. `config` manages the configuration file.

use clap::{Parser, Subcommand};
use search_console::config::default;
use search_console::config::loader::ConfigLoader;
use search_console::config::xdg;
use search_console::{logging, supervisor, Config, ConfigError, Console, LineInput, Output};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Interactive client for a remote search service
#[derive(Parser)]
#[command(name = "search-console")]
#[command(version, about = "Interactive client for a remote search service")]
struct Cli {
    /// Configuration file (defaults to the XDG location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Search server address as host:port, overriding the config file
    #[arg(long)]
    address: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands for the search-console CLI
#[derive(Subcommand)]
enum Commands {
    /// Manage configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Actions for the `config` subcommand.
#[derive(Subcommand)]
enum ConfigAction {
    /// Create default configuration file
    Init {
        /// Overwrite existing configuration (creates backup)
        #[arg(long)]
        force: bool,
    },
    /// Show configuration file path
    Path,
    /// Validate configuration file
    Validate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config { action }) => run_config_command(cli.config.as_deref(), action),
        None => run_client(cli.config.as_deref(), cli.address),
    }
}

fn run_config_command(path: Option<&Path>, action: ConfigAction) -> ExitCode {
    let target = path.map(Path::to_path_buf).unwrap_or_else(xdg::config_path);
    let result = match action {
        ConfigAction::Init { force } => {
            default::create_default_config(&target, force).map(|path| {
                println!("Created configuration at {}", path.display());
            })
        }
        ConfigAction::Path => {
            println!("{}", target.display());
            Ok(())
        }
        ConfigAction::Validate => ConfigLoader::load(path).and_then(|config| {
            config.validate()?;
            println!("Configuration is valid");
            println!("{config:#?}");
            Ok(())
        }),
    };
    if let Err(e) = result {
        eprintln!("Config error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn load_config(path: Option<&Path>, address: Option<String>) -> Result<Config, ConfigError> {
    let mut config = ConfigLoader::load(path)?;
    if let Some(address) = address {
        config.server.address = address;
    }
    config.validate()?;
    Ok(config)
}

fn run_client(path: Option<&Path>, address: Option<String>) -> ExitCode {
    let config = match load_config(path, address) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(config.log.level);

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let input = match LineInput::stdin() {
        Ok(input) => input,
        Err(e) => {
            eprintln!("Failed to start input reader: {e}");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let exit = rt.block_on(supervisor::run(
        &config,
        input,
        || Box::new(Console::new()) as Box<dyn Output>,
        shutdown,
    ));

    match exit {
        Ok(exit) if exit.is_success() => ExitCode::SUCCESS,
        Ok(exit) => {
            tracing::debug!("Exiting: {:?}", exit);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Config error: {e}");
            ExitCode::FAILURE
        }
    }
}
