//! # Error Types
//!
//! Custom error types for CRSF Link using `thiserror`.

use thiserror::Error;

/// Main error type for CRSF Link
#[derive(Debug, Error)]
pub enum CrsfLinkError {
    /// Transport I/O errors (read or write failure)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport reached end of stream
    #[error("Transport closed")]
    TransportClosed,

    /// Serial port could not be opened
    #[error("Failed to open {path}: {source}")]
    Serial {
        path: String,
        #[source]
        source: tokio_serial::Error,
    },

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Telemetry serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Length byte of zero following `address`
    #[error("Frame length is zero (address 0x{address:02X})")]
    ZeroLength { address: u8 },

    /// Length byte above the protocol maximum
    #[error("Frame length {0} exceeds maximum")]
    LengthTooLarge(u8),

    /// Frame body does not have the size its decoder requires
    #[error("Invalid frame length: expected {expected} bytes, got {actual}")]
    FrameLength { expected: usize, actual: usize },

    /// Trailing checksum does not match the computed one
    #[error("CRC mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    Checksum { expected: u8, actual: u8 },

    /// Frame type byte outside the supported set
    #[error("Unsupported frame type: 0x{0:02X}")]
    UnsupportedFrameType(u8),

    /// Payload of a known type could not be interpreted
    #[error("Malformed payload: {0}")]
    Decode(String),

    /// Channel value outside the 11-bit range
    #[error("Channel {index} value {value} is out of range (0-2047)")]
    ChannelOutOfRange { index: usize, value: u16 },

    /// `start` called on a running link
    #[error("Link already started")]
    AlreadyRunning,

    /// `stop` called on an idle link
    #[error("Link not started")]
    NotRunning,

    /// Activity stopped because shutdown was requested
    #[error("Cancelled")]
    Cancelled,

    /// Activity panicked or was aborted
    #[error("Task failed: {0}")]
    TaskFailed(String),
}

impl CrsfLinkError {
    /// Whether the error concerns a single frame and the stream can continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ZeroLength { .. }
                | Self::LengthTooLarge(_)
                | Self::FrameLength { .. }
                | Self::Checksum { .. }
                | Self::UnsupportedFrameType(_)
                | Self::Decode(_)
        )
    }

    /// Whether the error is a run of zero bytes on an idle or blank line
    ///
    /// 0x00 is the broadcast address, so every two zero bytes frame as a
    /// zero-length frame.
    pub fn is_idle_line(&self) -> bool {
        matches!(self, Self::ZeroLength { address: 0x00 })
    }
}

/// Result type alias for CRSF Link
pub type Result<T> = std::result::Result<T, CrsfLinkError>;
