//! Configuration for the Ghalib controller driver
//!
//! Loads configuration from a TOML file. Every field has a default, so an
//! empty file (or no file at all) yields the stock driver behaviour: connect
//! to `127.0.0.1:4120`, read 256-byte chunks, poll every 5 ms.
//!
//! ```toml
//! [connection]
//! host = "127.0.0.1"
//! port = 4120
//! framing = "per_chunk"
//!
//! [device]
//! registration_name = "simplecontroller_right"
//!
//! [logging]
//! level = "info"
//!
//! [settings.driver_simplecontroller]
//! mycontroller_model_number = "MyController-1"
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level driver configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DriverConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Key/value settings store, `[settings.<section>]` tables of strings
    #[serde(default)]
    pub settings: BTreeMap<String, BTreeMap<String, String>>,
}

/// How received bytes are split into records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FramingMode {
    /// Each receive is parsed on its own; chunks without a complete record are dropped
    #[default]
    PerChunk,
    /// Bytes are accumulated across receives and only complete records are parsed
    Buffered,
}

/// Data source connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionConfig {
    /// Data source host (default: 127.0.0.1)
    #[serde(default = "default_host")]
    pub host: String,

    /// Data source TCP port (default: 4120)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Connect timeout in milliseconds (default: 2000)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Read timeout in milliseconds; absent means receive blocks until data
    #[serde(default)]
    pub read_timeout_ms: Option<u64>,

    /// Receive buffer size in bytes (default: 256)
    #[serde(default = "default_receive_buffer_size")]
    pub receive_buffer_size: usize,

    /// Pause after every loop iteration in milliseconds (default: 5)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Record framing (default: per_chunk)
    #[serde(default)]
    pub framing: FramingMode,
}

/// Device identity and host registration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Name passed to the host when the device is registered
    #[serde(default = "default_registration_name")]
    pub registration_name: String,

    /// Input profile path set on the property container at activation
    #[serde(default = "default_input_profile_path")]
    pub input_profile_path: String,

    /// Settings section holding the model number
    #[serde(default = "default_main_section")]
    pub main_section: String,

    /// Settings section holding the serial number for a left-hand controller
    #[serde(default = "default_left_hand_section")]
    pub left_hand_section: String,

    /// Settings section holding the serial number for any other role
    #[serde(default = "default_right_hand_section")]
    pub right_hand_section: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            connect_timeout_ms: default_connect_timeout(),
            read_timeout_ms: None,
            receive_buffer_size: default_receive_buffer_size(),
            poll_interval_ms: default_poll_interval(),
            framing: FramingMode::default(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            registration_name: default_registration_name(),
            input_profile_path: default_input_profile_path(),
            main_section: default_main_section(),
            left_hand_section: default_left_hand_section(),
            right_hand_section: default_right_hand_section(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    4120
}
fn default_connect_timeout() -> u64 {
    2000
}
fn default_receive_buffer_size() -> usize {
    256
}
fn default_poll_interval() -> u64 {
    5
}
fn default_registration_name() -> String {
    "simplecontroller_right".to_string()
}
fn default_input_profile_path() -> String {
    "{simplecontroller}/input/mycontroller_profile.json".to_string()
}
fn default_main_section() -> String {
    "driver_simplecontroller".to_string()
}
// Installed driver settings files use these section names per role.
fn default_left_hand_section() -> String {
    "driver_simplecontroller_right_controller".to_string()
}
fn default_right_hand_section() -> String {
    "driver_simplecontroller_left_controller".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl ConnectionConfig {
    /// Endpoint string in `host:port` form
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl DriverConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: DriverConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the publisher cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.connection.receive_buffer_size == 0 {
            return Err(Error::Config(
                "connection.receive_buffer_size must be greater than zero".to_string(),
            ));
        }
        if self.connection.read_timeout_ms == Some(0) {
            return Err(Error::Config(
                "connection.read_timeout_ms must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }
}
