//! # Configuration Management
//!
//! Centralized configuration for the shard protocol core.
//!
//! This module provides structured configuration for the server loop and the
//! per-session framer, including listen parameters, protocol hard limits, and
//! logging options.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-variable overrides via `from_env()`
//!
//! ## Security Considerations
//! - The pending-buffer cap and declared-length cap bound memory per session
//! - The violation budget disconnects peers that keep sending garbage

use crate::error::{ProtocolError, Result};
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Opcode byte that doubles as the modern login-seed marker. A session whose
/// very first byte is this value skips the legacy 4-byte seed exchange.
pub const LOGIN_SEED_MARKER: u8 = 0xEF;

/// Hard cap on a session's pending (unframed) bytes.
pub const MAX_PENDING_BUFFER_BYTES: usize = 0x1_0000;

/// Largest declared frame length the framer will accept.
pub const MAX_DECLARED_PACKET_LENGTH: usize = 0x8000;

/// Protocol violations a single session may accumulate before disconnect.
pub const MAX_PROTOCOL_VIOLATIONS_PER_SESSION: u32 = 32;

/// Main configuration structure containing all configurable settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct NetworkConfig {
    /// Server-loop configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Per-session protocol hard limits
    #[serde(default)]
    pub protocol: ProtocolLimits,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NetworkConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("SHARDNET_SERVER_ADDRESS") {
            config.server.address = addr;
        }

        if let Ok(cap) = std::env::var("SHARDNET_MAX_PENDING_BUFFER_BYTES") {
            if let Ok(val) = cap.parse::<usize>() {
                config.protocol.max_pending_buffer_bytes = val;
            }
        }

        if let Ok(len) = std::env::var("SHARDNET_MAX_DECLARED_PACKET_LENGTH") {
            if let Ok(val) = len.parse::<usize>() {
                config.protocol.max_declared_packet_length = val;
            }
        }

        if let Ok(budget) = std::env::var("SHARDNET_MAX_VIOLATIONS_PER_SESSION") {
            if let Ok(val) = budget.parse::<u32>() {
                config.protocol.max_violations_per_session = val;
            }
        }

        if let Ok(timeout) = std::env::var("SHARDNET_CONNECTION_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.server.connection_timeout = Duration::from_millis(val);
            }
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.protocol.validate());
        errors.extend(self.logging.validate());

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Server-loop configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address (e.g., "0.0.0.0:2593")
    pub address: String,

    /// Advisory idle budget for a connection. The framing core applies no
    /// idle timeout of its own; a deployment that wants one reads this value
    /// and enforces it around the transport.
    #[serde(with = "duration_serde")]
    pub connection_timeout: Duration,

    /// Timeout for graceful server shutdown
    #[serde(with = "duration_serde")]
    pub shutdown_timeout: Duration,

    /// Maximum number of concurrent connections
    pub max_connections: usize,

    /// Capacity of each session's outbound byte queue
    pub outbound_queue_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::from("0.0.0.0:2593"),
            connection_timeout: timeout::DEFAULT_TIMEOUT,
            shutdown_timeout: timeout::SHUTDOWN_TIMEOUT,
            max_connections: 4096,
            outbound_queue_limit: 256,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Server address cannot be empty".to_string());
        } else if self.address.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid server address format: '{}' (expected format: '0.0.0.0:2593')",
                self.address
            ));
        }

        if self.connection_timeout.as_millis() < 100 {
            errors.push("Connection timeout too short (minimum: 100ms)".to_string());
        } else if self.connection_timeout.as_secs() > 600 {
            errors.push("Connection timeout too long (maximum: 600s)".to_string());
        }

        if self.shutdown_timeout.as_secs() < 1 {
            errors.push("Shutdown timeout too short (minimum: 1s)".to_string());
        } else if self.shutdown_timeout.as_secs() > 60 {
            errors.push("Shutdown timeout too long (maximum: 60s)".to_string());
        }

        if self.max_connections == 0 {
            errors.push("Max connections must be greater than 0".to_string());
        } else if self.max_connections > 100_000 {
            errors.push(format!(
                "Max connections very high: {} (ensure system resources can support this)",
                self.max_connections
            ));
        }

        if self.outbound_queue_limit == 0 {
            errors.push("Outbound queue limit must be greater than 0".to_string());
        }

        errors
    }
}

/// Per-session protocol hard limits enforced by the framer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProtocolLimits {
    /// Hard cap on pending (unframed) bytes; exceeding it disconnects the session
    pub max_pending_buffer_bytes: usize,

    /// Largest declared frame length accepted from a descriptor or wire header
    pub max_declared_packet_length: usize,

    /// Violations a session may accumulate before forced disconnect
    pub max_violations_per_session: u32,
}

impl Default for ProtocolLimits {
    fn default() -> Self {
        Self {
            max_pending_buffer_bytes: MAX_PENDING_BUFFER_BYTES,
            max_declared_packet_length: MAX_DECLARED_PACKET_LENGTH,
            max_violations_per_session: MAX_PROTOCOL_VIOLATIONS_PER_SESSION,
        }
    }
}

impl ProtocolLimits {
    /// Validate protocol limits
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.max_pending_buffer_bytes == 0 {
            errors.push("Pending buffer cap cannot be 0".to_string());
        } else if self.max_pending_buffer_bytes < 1024 {
            errors.push("Pending buffer cap too small (minimum: 1 KB)".to_string());
        } else if self.max_pending_buffer_bytes > 16 * 1024 * 1024 {
            errors.push(format!(
                "Pending buffer cap too large: {} bytes (maximum recommended: 16 MB)",
                self.max_pending_buffer_bytes
            ));
        }

        if self.max_declared_packet_length == 0 {
            errors.push("Max declared packet length cannot be 0".to_string());
        } else if self.max_declared_packet_length > self.max_pending_buffer_bytes {
            errors.push(
                "Max declared packet length cannot exceed the pending buffer cap".to_string(),
            );
        }

        if self.max_violations_per_session == 0 {
            errors.push("Violation budget must be greater than 0".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("shardnet"),
            log_level: Level::INFO,
            log_to_console: true,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
