//! Main application entry point for the WebSandbox bridge.
//!
//! Loads the configuration, sets up logging, and serves web clients over an
//! in-memory world until a termination signal arrives.

mod cli;
mod config;
mod logging;
mod signals;

use anyhow::anyhow;
use cli::CliArgs;
use config::AppConfig;
use sandbox_server::world::MemoryWorld;
use sandbox_server::{create_standalone_server, BridgeServer};
use std::sync::Arc;
use tokio::time::{interval, timeout, Duration};
use tracing::{error, info, warn};

/// How often the health line is logged.
const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// How long connections get to wind down after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Main application struct.
pub struct Application {
    config: AppConfig,
    server: Arc<BridgeServer>,
    world: Arc<MemoryWorld>,
}

impl Application {
    /// Loads configuration, applies CLI overrides and builds the server.
    pub async fn new(args: CliArgs) -> anyhow::Result<Self> {
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        if let Some(bind_address) = args.bind_address {
            config.server.bind_address = bind_address;
        }

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }

        if args.json_logs {
            config.logging.json_format = true;
        }

        config
            .validate()
            .map_err(|e| anyhow!("Configuration validation failed: {e}"))?;

        logging::setup_logging(&config.logging)?;

        let world = Arc::new(config.memory_world());
        let server = Arc::new(create_standalone_server(config.to_server_config()?, world.clone()));

        info!("🚀 WebSandbox v{}", env!("CARGO_PKG_VERSION"));
        info!("📂 Config: {}", args.config_path.display());

        Ok(Self {
            config,
            server,
            world,
        })
    }

    /// Serves until a shutdown signal or a fatal listener error.
    pub async fn run(self) -> anyhow::Result<()> {
        let viewport = self.config.viewport();
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        if let Some(public_address) = &self.config.server.public_address {
            info!("  🔗 Players connect at: {}", public_address);
        }
        info!(
            "  🌍 Viewport: center {} radius {} y offset {} ({} blocks)",
            viewport.center,
            viewport.radius,
            viewport.y_offset,
            viewport.cell_count()
        );
        info!("  👥 Max connections: {}", self.config.server.max_connections);

        let mut server_handle = {
            let server = self.server.clone();
            tokio::spawn(async move { server.start().await })
        };

        let monitoring_handle = {
            let server = self.server.clone();
            let world = self.world.clone();
            tokio::spawn(async move {
                let mut ticker = interval(STATS_INTERVAL);
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    info!(
                        "📊 {} sessions | {} connections | {} edited blocks",
                        server.state().registry.len(),
                        server.active_connections(),
                        world.edit_count()
                    );
                }
            })
        };

        info!("🛑 Press Ctrl+C to gracefully shutdown");

        let finished = tokio::select! {
            signal = signals::wait_for_shutdown_signal() => {
                info!("📡 Received {}", signal?);
                None
            }
            joined = &mut server_handle => Some(joined),
        };

        let outcome = match finished {
            None => {
                info!("🛑 Shutdown signal received, initiating graceful shutdown...");
                self.server.shutdown();
                if timeout(SHUTDOWN_GRACE, &mut server_handle).await.is_err() {
                    warn!("⏳ Server did not stop in time");
                    server_handle.abort();
                }
                Ok(())
            }
            Some(Ok(Ok(()))) => Ok(()),
            Some(Ok(Err(e))) => {
                error!("❌ Server error: {}", e);
                Err(e.into())
            }
            Some(Err(e)) => Err(anyhow!("server task failed: {e}")),
        };

        monitoring_handle.abort();
        info!("✅ WebSandbox shutdown complete");
        outcome
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let app = Application::new(args).await?;
    app.run().await
}
