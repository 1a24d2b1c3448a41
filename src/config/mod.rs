//! Configuration management for boatlink.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::link::LinkConfig;
use crate::mission::MissionConfig;

/// Environment variable overriding the vehicle host.
pub const ENV_VEHICLE_HOST: &str = "BOATLINK_VEHICLE_HOST";

/// Environment variable overriding the vehicle command port.
pub const ENV_VEHICLE_PORT: &str = "BOATLINK_VEHICLE_PORT";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Link configuration.
    #[serde(default)]
    pub link: LinkConfig,

    /// Mission engine configuration.
    #[serde(default)]
    pub mission: MissionConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| Error::Config(format!("Failed to write config: {e}")))?;

        Ok(())
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.link.vehicle_addr.port() == 0 {
            return Err(Error::InvalidConfig("vehicle port must not be 0".into()));
        }

        if self.link.tick_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "tick interval must be greater than zero".into(),
            ));
        }

        if self.link.recv_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "receive timeout must be greater than zero".into(),
            ));
        }

        if self.link.queue_capacity == 0 {
            return Err(Error::InvalidConfig(
                "command queue capacity must be at least 1".into(),
            ));
        }

        if self.mission.log_capacity == 0 {
            return Err(Error::InvalidConfig(
                "mission log capacity must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Apply `BOATLINK_VEHICLE_HOST` / `BOATLINK_VEHICLE_PORT` overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        let host = std::env::var(ENV_VEHICLE_HOST).ok();
        let port = std::env::var(ENV_VEHICLE_PORT).ok();
        self.apply_overrides(host.as_deref(), port.as_deref())
    }

    /// Override the vehicle host and/or port. Hostnames are resolved here.
    pub fn apply_overrides(&mut self, host: Option<&str>, port: Option<&str>) -> Result<()> {
        let port = match port {
            Some(port) => port
                .trim()
                .parse::<u16>()
                .map_err(|e| Error::InvalidConfig(format!("invalid vehicle port {port:?}: {e}")))?,
            None => self.link.vehicle_addr.port(),
        };

        self.link.vehicle_addr = match host {
            Some(host) => resolve_vehicle(host.trim(), port)?,
            None => SocketAddr::new(self.link.vehicle_addr.ip(), port),
        };

        Ok(())
    }

    /// Get default config path.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("org", "boatlink", "boatlink").map_or_else(
            || PathBuf::from("boatlink.toml"),
            |dirs| dirs.config_dir().join("config.toml"),
        )
    }

    /// Create example configuration.
    pub fn example() -> Self {
        Self {
            link: LinkConfig::new(
                SocketAddr::from(([192, 168, 4, 1], crate::DEFAULT_COMMAND_PORT)),
                SocketAddr::from(([0, 0, 0, 0], crate::DEFAULT_TELEMETRY_PORT)),
            ),
            logging: LoggingConfig {
                level: "debug".into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

fn resolve_vehicle(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| Error::InvalidConfig(format!("cannot resolve vehicle host {host:?}: {e}")))?
        .next()
        .ok_or_else(|| Error::InvalidConfig(format!("no address for vehicle host {host:?}")))
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text or json).
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Enable colored output.
    #[serde(default = "default_color")]
    pub color: bool,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}
fn default_color() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            color: default_color(),
        }
    }
}

/// Initialize logging. `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| Error::Config(format!("Failed to init logging: {e}")))?;
    } else {
        subscriber
            .with(fmt::layer().with_ansi(config.color))
            .try_init()
            .map_err(|e| Error::Config(format!("Failed to init logging: {e}")))?;
    }

    Ok(())
}
