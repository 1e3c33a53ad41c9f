//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field is optional; missing values take the defaults
//! below, so an empty document is a valid configuration.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{CrsfLinkError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub link: LinkConfig,
    pub telemetry: TelemetryConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SerialConfig {
    /// Device path; empty tries the usual ELRS device paths
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Read timeout; the reader may take this long to notice shutdown
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Pipeline configuration, handed to the link unchanged
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LinkConfig {
    /// Never transmit; only decode inbound frames
    #[serde(default)]
    pub read_only: bool,

    /// Decode inbound RC channel frames into the store
    #[serde(default = "default_read_channels")]
    pub read_channels: bool,

    /// Period of outbound RC channel frames
    #[serde(default = "default_writer_interval_ms")]
    pub writer_interval_ms: u64,

    /// Chunks buffered between reader and parser before chunks are dropped
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Bytes requested per transport read
    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,
}

// Default value functions
fn default_serial_port() -> String { String::new() }
fn default_baud_rate() -> u32 { 420000 }
fn default_timeout_ms() -> u64 { 1000 }

fn default_read_channels() -> bool { true }
fn default_writer_interval_ms() -> u64 { 5 }
fn default_queue_depth() -> usize { 64 }
fn default_read_buffer_size() -> usize { 128 }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u64 { 100 }

/// Baud rates supported by ELRS/CRSF hardware
const VALID_BAUD_RATES: [u32; 6] = [115200, 400000, 420000, 921600, 1870000, 3750000];

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            read_only: false,
            read_channels: default_read_channels(),
            writer_interval_ms: default_writer_interval_ms(),
            queue_depth: default_queue_depth(),
            read_buffer_size: default_read_buffer_size(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            log_interval_ms: default_log_interval_ms(),
        }
    }
}

impl SerialConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl LinkConfig {
    pub fn writer_interval(&self) -> Duration {
        Duration::from_millis(self.writer_interval_ms)
    }
}

impl TelemetryConfig {
    pub fn log_interval(&self) -> Duration {
        Duration::from_millis(self.log_interval_ms)
    }
}

fn invalid(message: impl std::fmt::Display) -> CrsfLinkError {
    CrsfLinkError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use crsf_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if !VALID_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 115200, 400000, 420000, 921600, 1870000, 3750000",
            ));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if self.link.writer_interval_ms == 0 || self.link.writer_interval_ms > 1000 {
            return Err(invalid("writer_interval_ms must be between 1 and 1000"));
        }

        if self.link.queue_depth == 0 || self.link.queue_depth > 4096 {
            return Err(invalid("queue_depth must be between 1 and 4096"));
        }

        if self.link.read_buffer_size == 0 || self.link.read_buffer_size > 4096 {
            return Err(invalid("read_buffer_size must be between 1 and 4096"));
        }

        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.log_interval_ms == 0 || self.telemetry.log_interval_ms > 60000 {
            return Err(invalid("log_interval_ms must be between 1 and 60000"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_empty_document_equals_default() {
        assert_eq!(Config::from_toml_str("").unwrap(), Config::default());
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[serial]
port = "/dev/ttyUSB0"
baud_rate = 115200

[link]
read_only = true
writer_interval_ms = 4

[telemetry]
enabled = false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.serial.timeout_ms, 1000);
        assert!(config.link.read_only);
        assert!(config.link.read_channels);
        assert_eq!(config.link.writer_interval(), Duration::from_millis(4));
        assert!(!config.telemetry.enabled);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/crsf-link.toml");
        assert!(matches!(result, Err(CrsfLinkError::Io(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = Config::from_toml_str("[link\nread_only = true");
        assert!(matches!(result, Err(CrsfLinkError::Config(_))));
    }

    #[test]
    fn test_wrong_field_type() {
        let result = Config::from_toml_str("[link]\nqueue_depth = \"deep\"");
        assert!(matches!(result, Err(CrsfLinkError::Config(_))));
    }

    #[test]
    fn test_explicit_serial_port_allowed() {
        let mut config = Config::default();
        config.serial.port = "/dev/ttyAMA0".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_log_dir_when_enabled() {
        let mut config = Config::default();
        config.telemetry.enabled = true;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_disabled() {
        let mut config = Config::default();
        config.telemetry.enabled = false;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_ms_bounds() {
        let mut config = Config::default();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());
        config.serial.timeout_ms = 10001;
        assert!(config.validate().is_err());
        config.serial.timeout_ms = 10000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_writer_interval_bounds() {
        let mut config = Config::default();
        config.link.writer_interval_ms = 0;
        assert!(config.validate().is_err());
        config.link.writer_interval_ms = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_queue_depth_bounds() {
        let mut config = Config::default();
        config.link.queue_depth = 0;
        assert!(config.validate().is_err());
        config.link.queue_depth = 4097;
        assert!(config.validate().is_err());
        config.link.queue_depth = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_read_buffer_size_zero() {
        let mut config = Config::default();
        config.link.read_buffer_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_interval_bounds() {
        let mut config = Config::default();
        config.telemetry.log_interval_ms = 0;
        assert!(config.validate().is_err());
        config.telemetry.log_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rotation_limits_zero() {
        let mut config = Config::default();
        config.telemetry.max_records_per_file = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.telemetry.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = Config::default();
        config.serial.baud_rate = 9600;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in &VALID_BAUD_RATES {
            let mut config = Config::default();
            config.serial.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_default_functions() {
        assert!(default_serial_port().is_empty());
        assert_eq!(default_baud_rate(), 420000);
        assert_eq!(default_timeout_ms(), 1000);
        assert!(default_read_channels());
        assert_eq!(default_writer_interval_ms(), 5);
        assert_eq!(default_queue_depth(), 64);
        assert_eq!(default_read_buffer_size(), 128);
        assert!(default_telemetry_enabled());
        assert_eq!(default_log_dir(), "./logs");
        assert_eq!(default_max_records_per_file(), 10000);
        assert_eq!(default_max_files_to_keep(), 10);
        assert_eq!(default_log_interval_ms(), 100);
    }
}
