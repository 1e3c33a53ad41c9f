//! # Serial Transport Module
//!
//! Opens the serial device a CRSF link runs over.
//!
//! This module handles:
//! - Opening the port 8N1 at the configured baud rate (420,000 by default)
//! - Auto-detecting common USB device paths
//! - Handing the async stream to the link pipeline

use std::time::Duration;

use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

use crate::config::SerialConfig;
use crate::error::{CrsfLinkError, Result};

/// Device paths tried when no port is configured (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC devices (most common for ELRS)
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Serial connection to a CRSF device
pub struct CrsfSerial {
    port: SerialStream,
    device_path: String,
}

impl std::fmt::Debug for CrsfSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrsfSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl CrsfSerial {
    /// Open the configured port, or auto-detect one if `port` is empty
    ///
    /// # Errors
    ///
    /// * `Serial` - the configured port could not be opened
    /// * `SerialPortNotFound` - auto-detection found no usable device
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use crsf_link::config::SerialConfig;
    /// use crsf_link::serial::CrsfSerial;
    ///
    /// fn main() -> anyhow::Result<()> {
    ///     let serial = CrsfSerial::open(&SerialConfig::default())?;
    ///     println!("Connected to: {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(config: &SerialConfig) -> Result<Self> {
        if config.port.is_empty() {
            Self::open_with_paths(DEFAULT_DEVICE_PATHS, config.baud_rate, config.timeout())
        } else {
            let port = Self::open_port(&config.port, config.baud_rate, config.timeout())?;
            info!(path = %config.port, baud_rate = config.baud_rate, "opened serial port");
            Ok(Self {
                port,
                device_path: config.port.clone(),
            })
        }
    }

    /// Open the first of `paths` that succeeds
    pub fn open_with_paths(paths: &[&str], baud_rate: u32, timeout: Duration) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate, timeout) {
                Ok(port) => {
                    info!(path = %path, baud_rate, "opened serial port");
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => warn!("Failed to open {}: {}", path, e),
            }
        }

        Err(CrsfLinkError::SerialPortNotFound(paths.join(", ")))
    }

    fn open_port(path: &str, baud_rate: u32, timeout: Duration) -> Result<SerialStream> {
        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(timeout)
            .open_native_async()
            .map_err(|source| CrsfLinkError::Serial {
                path: path.to_string(),
                source,
            })
    }

    /// Path of the opened device (e.g., "/dev/ttyACM0")
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Duplex stream for [`crate::link::CrsfLink::start`]
    pub fn into_stream(self) -> SerialStream {
        self.port
    }
}
