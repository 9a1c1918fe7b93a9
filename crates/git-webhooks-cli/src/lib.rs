//! # git-webhooks CLI
//!
//! Command-line interface for the git-webhooks deployment server.
//!
//! - `serve` (the default) runs the HTTP server
//! - `config check` validates the configuration and prints a summary
//! - `config show` prints the resolved configuration with secrets masked

use clap::{Parser, Subcommand};
use git_webhooks_api::{ServiceConfig, ServiceConfigError, ServiceError};
use git_webhooks_core::{Provider, ShellLauncher};
use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// File name of the per-user configuration, relative to the home directory.
pub const DEFAULT_CONFIG_FILE: &str = ".gitwebhooks.toml";

// ============================================================================
// CLI Structure
// ============================================================================

/// git-webhooks - deploy repositories when their git host says so
#[derive(Parser, Debug)]
#[command(name = "git-webhooks")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Webhook receiver that runs deployment commands for GitHub, Gitee, GitLab and custom hosts")]
pub struct Cli {
    /// Configuration file path (defaults to ~/.gitwebhooks.toml)
    #[arg(short, long, global = true, env = "GITWEBHOOKS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level, overrides `logging.level`
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Subcommand to execute; `serve` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the webhook server
    Serve {
        /// Host to bind, overrides `server.host`
        #[arg(long)]
        host: Option<String>,

        /// Port to bind, overrides `server.port`
        #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
        port: Option<u16>,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Load and validate the configuration
    Check,

    /// Print the resolved configuration with secrets masked
    Show,
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ServiceConfigError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Failed to initialise logging: {message}")]
    Logging { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Configuration(_) => 2,
            CliError::Service(ServiceError::Configuration(_)) => 2,
            CliError::Service(ServiceError::BindFailed { .. })
            | CliError::Service(ServiceError::ServerFailed { .. }) => 3,
            CliError::Logging { .. } | CliError::Io(_) => 1,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    run(Cli::parse()).await
}

/// Execute an already parsed command line.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let (path, required) = resolve_config_path(cli.config.as_deref());
    let loaded = ServiceConfig::load(path.as_deref(), required);

    let logging = match &loaded {
        Ok(config) => config.logging.clone(),
        Err(_) => Default::default(),
    };
    initialize_logging(
        cli.log_level.as_deref().unwrap_or(&logging.level),
        cli.json_logs || logging.json_format,
        logging.file_path.as_deref(),
    )?;

    let config = loaded?;
    if let Some(path) = &path {
        info!(path = %path.display(), required, "Configuration loaded");
    }

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => execute_serve_command(config, host, port).await,
        Commands::Config { action } => match action {
            ConfigCommands::Check => {
                print!("{}", render_summary(&config));
                Ok(())
            }
            ConfigCommands::Show => {
                print!("{}", config.redacted().to_toml()?);
                Ok(())
            }
        },
    }
}

/// Pick the configuration file.
///
/// An explicit path must exist. The per-user default is optional.
pub fn resolve_config_path(explicit: Option<&Path>) -> (Option<PathBuf>, bool) {
    match explicit {
        Some(path) => (Some(path.to_path_buf()), true),
        None => (
            dirs::home_dir().map(|home| home.join(DEFAULT_CONFIG_FILE)),
            false,
        ),
    }
}

/// Initialize logging.
///
/// `RUST_LOG` wins over `level`. Console logs go to stderr; stdout carries
/// command output only. When `file_path` is set a second, uncoloured layer
/// appends to that file.
pub fn initialize_logging(
    level: &str,
    json: bool,
    file_path: Option<&Path>,
) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_layer = match file_path {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .with(file_layer)
        .try_init()
        .map_err(|e| CliError::Logging {
            message: e.to_string(),
        })
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn execute_serve_command(
    mut config: ServiceConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), CliError> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    info!(
        host = %config.server.host,
        port = config.server.port,
        "Starting git-webhooks server"
    );

    git_webhooks_api::start_server(config, Arc::new(ShellLauncher::new())).await?;
    Ok(())
}

/// Human-readable summary printed by `config check`.
pub fn render_summary(config: &ServiceConfig) -> String {
    let mut summary = String::from("Configuration OK\n");
    let _ = writeln!(
        summary,
        "  listen: {}:{}",
        config.server.host, config.server.port
    );

    for provider in Provider::ALL {
        let (verify, events) = match config.providers.section(provider) {
            Some(section) => {
                let events = section.handle_events.to_vec();
                let events = if events.is_empty() {
                    "all".to_string()
                } else {
                    events.join(", ")
                };
                (section.verify, events)
            }
            None => (false, "all".to_string()),
        };
        let _ = writeln!(
            summary,
            "  {provider}: verification {}, events: {events}",
            if verify { "on" } else { "off" }
        );
    }

    let _ = writeln!(summary, "  repositories: {}", config.repositories.len());
    summary
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
