//! Notes service CLI server
//!
//! ```sh
//! # Run with default config (~/.config/notes-service/config.toml)
//! notes-service
//!
//! # Custom config path
//! notes-service --config /etc/notes-service/config.toml
//!
//! # Validate config without starting
//! notes-service --check
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use notes_service::config::{AppConfig, ENV_CONFIG_PATH};
use notes_service::server::{init_tracing, ServerHandle, ServerOptions};

/// Notes service: accounts, personal notes and admin user management.
#[derive(Parser, Debug)]
#[command(
    name = "notes-service",
    version,
    about = "REST server for personal notes with user accounts",
    long_about = "Notes service: REST API for registering, logging in and keeping \
                  personal notes, with an admin user-management API.\n\n\
                  Default config: ~/.config/notes-service/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = ENV_CONFIG_PATH)]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,

    /// Skip creating the default admin user.
    #[arg(long)]
    no_admin: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(notes_service::default_config_path);

    let loaded = AppConfig::load(&config_path);

    if cli.check {
        return Ok(match loaded {
            Ok(config) => {
                println!("Configuration is valid");
                println!("   Config file : {}", config_path.display());
                println!("   API address : {}", config.server.address());
                println!("   Storage     : {:?}", config.database.backend);
                println!("   Database    : {}", config.database.connection_url());
                println!("   Log level   : {}", config.logging.level);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Invalid configuration in {}: {}", config_path.display(), e);
                ExitCode::FAILURE
            }
        });
    }

    let mut config = match loaded {
        Ok(mut cfg) => {
            if let Some(ref level) = cli.log_level {
                cfg.logging.level = level.clone();
            }
            init_tracing(&cfg);
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            let level = cli.log_level.clone().unwrap_or_else(|| "info".to_string());
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new(level))
                .init();
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
            AppConfig::default()
        }
    };

    if let Some(port) = cli.api_port {
        info!("CLI override: api_port = {}", port);
        config.server.api_port = port;
    }

    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
        create_default_admin: !cli.no_admin,
    })
    .await?;

    handle.install_signal_handler();
    info!("Press Ctrl+C to shut down gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(ExitCode::SUCCESS)
}
