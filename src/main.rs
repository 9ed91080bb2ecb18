//! Proplink - Listing Service gateway
//!
//! Proplink sits between a real-estate marketing site and a third-party
//! Listing Service. It caches upstream responses, aggregates paginated
//! results, applies the filters the Listing Service cannot, and serves the
//! result over HTTP.

use clap::{Parser, Subcommand};
use proplink_core::{ProplinkConfig, ProplinkError, Result};
use proplink_infra::{init_logger, logger_config_from_env, LoggerConfig};
use proplink_serve::ServerBuilder;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "proplink")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Proplink - caching, filtering gateway for a property Listing Service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Configuration file path (YAML or TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Server host address (overrides configuration)
        #[arg(long)]
        host: Option<String>,

        /// Server port (overrides configuration)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate a configuration file
    Validate,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("{}", proplink_core::version_info());
        return Ok(());
    }

    let config = ProplinkConfig::load(cli.config.as_deref())?;
    init_logging(&cli, &config)?;

    match cli.command {
        Commands::Serve { host, port } => handle_serve(config, host, port).await,
        Commands::Validate => handle_validate(cli.config.as_deref(), &config),
        Commands::Version => Ok(()),
    }
}

fn init_logging(cli: &Cli, config: &ProplinkConfig) -> Result<()> {
    let mut logger = logger_config_from_env(LoggerConfig::from(&config.logging));
    if cli.verbose {
        logger.level = "debug".to_string();
    }
    if cli.json_logs {
        logger.json_format = true;
    }
    init_logger(logger)
}

async fn handle_serve(config: ProplinkConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    config.validate()?;
    info!("Starting Proplink v{}", env!("CARGO_PKG_VERSION"));

    let mut builder = ServerBuilder::from_config(config);
    if let Some(host) = host {
        builder = builder.host(host);
    }
    if let Some(port) = port {
        builder = builder.port(port);
    }

    builder.build()?.start().await
}

fn handle_validate(path: Option<&Path>, config: &ProplinkConfig) -> Result<()> {
    let path = path.ok_or_else(|| {
        ProplinkError::validation("validate requires --config <file>")
    })?;
    info!("Validating configuration at {:?}", path);

    match config.validate() {
        Ok(()) => {
            let result = serde_json::json!({
                "valid": true,
                "message": "Configuration is valid",
                "credentialConfigured": config.listing_service.credential().is_some(),
                "cacheEnabled": config.cache.enabled,
                "ttlSeconds": config.cache.ttl_seconds,
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => {
            let result = serde_json::json!({
                "valid": false,
                "error": e.to_string(),
            });
            println!("{}", serde_json::to_string_pretty(&result)?);
            Err(e)
        }
    }
}
