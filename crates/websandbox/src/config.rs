//! Configuration management for the WebSandbox bridge.
//!
//! This module handles loading, validation, and conversion of the bridge
//! configuration from TOML files. Every key is optional; missing keys take
//! the defaults below.

use anyhow::Context;
use sandbox_server::viewport::Viewport;
use sandbox_server::world::{BlockPos, BlockTypeId, MemoryWorld};
use sandbox_server::ServerConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use tracing::info;

/// Largest radius accepted; the snapshot grows with its cube.
pub const MAX_RADIUS: u16 = 128;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Network settings
    pub server: ServerSettings,
    /// Mirrored region and edit policy
    pub viewport: ViewportSettings,
    /// Terrain of the built-in world
    pub world: WorldSettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
}

/// Network binding and connection limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Network address to bind the server to (e.g., "0.0.0.0:4081")
    pub bind_address: String,
    /// Maximum number of concurrent client connections
    pub max_connections: usize,
    /// Lines each connection may have waiting before it is dropped
    pub outbound_queue_capacity: usize,
    /// Address players should open in their browser, only logged
    pub public_address: Option<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4081".to_string(),
            max_connections: 1000,
            outbound_queue_capacity: 65536,
            public_address: None,
        }
    }
}

/// The cube of the world mirrored to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    pub x_center: i32,
    pub y_center: i32,
    pub z_center: i32,
    /// Half the side length of the cube
    pub radius: u16,
    /// Vertical shift applied to client coordinates
    pub y_offset: i32,
    /// Let clients edit blocks they cannot see
    pub allow_out_of_viewport_edits: bool,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            x_center: 0,
            y_center: 75,
            z_center: 0,
            radius: 16,
            y_offset: 20,
            allow_out_of_viewport_edits: false,
        }
    }
}

/// Flat terrain of the in-memory world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    /// Y of the surface layer
    pub ground_level: i32,
    /// Block type of the surface layer
    pub surface_block: u16,
    /// Block type below the surface
    pub fill_block: u16,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            ground_level: 64,
            surface_block: 2,
            fill_block: 1,
        }
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration to that
    /// path and returns it.
    pub async fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(
            BlockPos::new(self.viewport.x_center, self.viewport.y_center, self.viewport.z_center),
            self.viewport.radius,
            self.viewport.y_offset,
        )
    }

    /// Converts the file configuration into the server's own.
    pub fn to_server_config(&self) -> anyhow::Result<ServerConfig> {
        let bind_address: SocketAddr = self
            .server
            .bind_address
            .parse()
            .with_context(|| format!("invalid bind address {:?}", self.server.bind_address))?;

        Ok(ServerConfig {
            bind_address,
            max_connections: self.server.max_connections,
            outbound_queue_capacity: self.server.outbound_queue_capacity,
            viewport: self.viewport(),
            allow_out_of_viewport_edits: self.viewport.allow_out_of_viewport_edits,
        })
    }

    /// Builds the in-memory world described by `[world]`.
    pub fn memory_world(&self) -> MemoryWorld {
        MemoryWorld::new(
            self.world.ground_level,
            BlockTypeId(self.world.surface_block),
            BlockTypeId(self.world.fill_block),
        )
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.parse::<SocketAddr>().is_err() {
            return Err(format!("Invalid bind address: {}", &self.server.bind_address));
        }

        if self.server.max_connections == 0 {
            return Err("max_connections must be at least 1".to_string());
        }

        if self.viewport.radius == 0 || self.viewport.radius > MAX_RADIUS {
            return Err(format!(
                "Viewport radius must be between 1 and {MAX_RADIUS}, got {}",
                self.viewport.radius
            ));
        }

        // The whole join snapshot has to fit in a connection's queue.
        let min_capacity = ServerConfig::min_queue_capacity(&self.viewport());
        if self.server.outbound_queue_capacity < min_capacity {
            return Err(format!(
                "outbound_queue_capacity {} cannot hold a snapshot of radius {} (needs {min_capacity})",
                self.server.outbound_queue_capacity, self.viewport.radius
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {VALID_LOG_LEVELS:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandbox_server::world::WorldProvider;
    use tempfile::{NamedTempFile, TempDir};
    use tokio::fs;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.server.bind_address, "0.0.0.0:4081");
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.server.outbound_queue_capacity, 65536);
        assert!(config.server.public_address.is_none());

        assert_eq!(config.viewport.x_center, 0);
        assert_eq!(config.viewport.y_center, 75);
        assert_eq!(config.viewport.z_center, 0);
        assert_eq!(config.viewport.radius, 16);
        assert_eq!(config.viewport.y_offset, 20);
        assert!(!config.viewport.allow_out_of_viewport_edits);

        assert_eq!(config.world.ground_level, 64);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();

        assert_eq!(config, AppConfig::default());
        assert!(path.exists());

        // The written file loads back to the same configuration.
        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded, config);
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[server]
bind_address = "127.0.0.1:9000"
max_connections = 50
outbound_queue_capacity = 4096
public_address = "http://sandbox.example:4081"

[viewport]
x_center = 100
y_center = 70
z_center = -20
radius = 8
y_offset = 4
allow_out_of_viewport_edits = true

[world]
ground_level = 60
surface_block = 3
fill_block = 4

[logging]
level = "debug"
json_format = true
"#;

        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(temp_file.path()).await.unwrap();

        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
        assert_eq!(config.server.max_connections, 50);
        assert_eq!(config.server.outbound_queue_capacity, 4096);
        assert_eq!(
            config.server.public_address.as_deref(),
            Some("http://sandbox.example:4081")
        );
        assert_eq!(config.viewport.x_center, 100);
        assert_eq!(config.viewport.radius, 8);
        assert!(config.viewport.allow_out_of_viewport_edits);
        assert_eq!(config.world.surface_block, 3);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), "[viewport]\nradius = 4\n").await.unwrap();

        let config = AppConfig::load_from_file(temp_file.path()).await.unwrap();

        assert_eq!(config.viewport.radius, 4);
        assert_eq!(config.viewport.y_center, 75);
        assert_eq!(config.server, ServerSettings::default());
        assert_eq!(config.logging, LoggingSettings::default());
    }

    #[tokio::test]
    async fn test_malformed_file_is_an_error() {
        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), "[viewport\nradius = ").await.unwrap();

        assert!(AppConfig::load_from_file(temp_file.path()).await.is_err());
    }

    #[test]
    fn test_to_server_config_conversion() {
        let mut config = AppConfig::default();
        config.server.bind_address = "127.0.0.1:5000".to_string();
        config.viewport.allow_out_of_viewport_edits = true;

        let server_config = config.to_server_config().unwrap();

        assert_eq!(server_config.bind_address, "127.0.0.1:5000".parse().unwrap());
        assert_eq!(server_config.max_connections, 1000);
        assert_eq!(server_config.viewport.center, BlockPos::new(0, 75, 0));
        assert_eq!(server_config.viewport.radius, 16);
        assert_eq!(server_config.viewport.y_offset, 20);
        assert!(server_config.allow_out_of_viewport_edits);
    }

    #[test]
    fn test_memory_world_follows_settings() {
        let mut config = AppConfig::default();
        config.world.ground_level = 10;
        config.world.surface_block = 7;

        let world = config.memory_world();
        assert_eq!(world.block_type(BlockPos::new(0, 10, 0)).unwrap(), BlockTypeId(7));
        assert_eq!(world.highest_solid_y(3, 3).unwrap(), 10);
    }

    #[test]
    fn test_validation_invalid_bind_address() {
        let mut config = AppConfig::default();
        config.server.bind_address = "not-an-address".to_string();
        assert!(config.validate().unwrap_err().contains("Invalid bind address"));
    }

    #[test]
    fn test_validation_radius_bounds() {
        let mut config = AppConfig::default();
        config.viewport.radius = 0;
        assert!(config.validate().is_err());

        config.viewport.radius = MAX_RADIUS + 1;
        assert!(config.validate().is_err());

        config.viewport.radius = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_queue_must_hold_snapshot() {
        let mut config = AppConfig::default();
        config.viewport.radius = 16;
        config.server.outbound_queue_capacity = 32 * 32 * 32;
        assert!(config.validate().unwrap_err().contains("outbound_queue_capacity"));

        config.server.outbound_queue_capacity = 32 * 32 * 32 + 16;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_connections() {
        let mut config = AppConfig::default();
        config.server.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_log_levels() {
        let mut config = AppConfig::default();
        for level in VALID_LOG_LEVELS {
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "{level} should be accepted");
        }
        config.logging.level = "verbose".to_string();
        assert!(config.validate().unwrap_err().contains("Invalid log level"));
    }
}
