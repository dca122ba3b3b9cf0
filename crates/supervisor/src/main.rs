//! vh-supervisord
//!
//! Daemon wrapping the supervisor: loads configuration, installs the
//! VirtualHere server binary when missing, starts the supervised server,
//! and tears everything down on Ctrl+C.

use anyhow::{Context, Result};
use clap::Parser;
use common::setup_logging;
use supervisor::config::SupervisorConfig;
use supervisor::install::{BinaryInstaller, HttpInstaller};
use supervisor::plugin::PluginFacade;
use supervisor::process::ServerProcess;
use supervisor::supervisor::ServerSupervisor;
use supervisor::system::SystemState;
use tokio::signal;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "vh-supervisord")]
#[command(
    author,
    version,
    about = "Supervisor for the VirtualHere USB sharing server"
)]
#[command(long_about = "
Supervises the VirtualHere USB server: launches it, receives its device
bind/unbind callbacks on a local listener, and keeps the host awake (sleep
masked, display dimmed) while a device is attached to a remote client.

EXAMPLES:
    # Run with default config
    vh-supervisord

    # Run with custom config
    vh-supervisord --config /path/to/config.toml

    # Run with debug logging
    vh-supervisord --log-level debug

CONFIGURATION:
    The supervisor looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/vh-supervisor/config.toml
    3. /etc/vh-supervisor/config.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = SupervisorConfig::default();
        let path = SupervisorConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = if let Some(ref path) = args.config {
        SupervisorConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        SupervisorConfig::load_or_default()
    };

    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.server.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("vh-supervisord v{}", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", log_level);

    let executable = if config.install.auto_install {
        HttpInstaller::from_config(&config)
            .ensure_installed()
            .await
            .context("Failed to install VirtualHere server")?
    } else {
        config.server.executable.clone()
    };

    let system = SystemState::from_settings(&config.system);
    let process = ServerProcess::new(
        executable,
        config.server.config_path.clone(),
        &config.server.plugin_dir,
    );
    let mut plugin = PluginFacade::new(ServerSupervisor::new(system, process));

    let deck_ip = plugin
        .start_server()
        .await
        .context("Failed to start VirtualHere server")?;
    info!("VirtualHere server running, clients connect to {}", deck_ip);
    info!("Press Ctrl+C to shutdown");

    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down..."),
        Err(e) => tracing::error!("Error waiting for Ctrl+C: {}", e),
    }

    plugin.stop_server().await;
    info!("Supervisor shutdown complete");
    Ok(())
}
