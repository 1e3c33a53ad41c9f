//! # CRSF Protocol Constants and Types
//!
//! Core protocol definitions for CRSF (Crossfire) communication.
//!
//! Wire layout of every frame:
//!
//! ```text
//! [address:1][length:1][type:1][payload:0..60][crc:1]
//! ```
//!
//! `length` counts Type + Payload + CRC. The CRC covers Type + Payload.

use std::fmt;

use serde::Serialize;

use crate::error::CrsfLinkError;

/// Address used for outbound frames (flight controller, also the classic sync byte)
pub const CRSF_SYNC_BYTE: u8 = 0xC8;

/// Largest accepted value of the length byte (type + 60 payload bytes + crc)
pub const CRSF_MAX_FRAME_LENGTH: u8 = 62;

/// Maximum CRSF payload size
pub const CRSF_MAX_PAYLOAD_SIZE: usize = 60;

/// Number of RC channels
pub const CRSF_NUM_CHANNELS: usize = 16;

/// RC channels payload size (22 bytes for 16 channels × 11 bits)
pub const CRSF_RC_CHANNELS_PAYLOAD_SIZE: usize = 22;

/// RC channels frame length (type + payload + crc)
pub const CRSF_RC_CHANNELS_FRAME_LENGTH: u8 = 0x18; // 24 bytes

/// Channel value range (11-bit: 0-2047)
pub const CRSF_CHANNEL_VALUE_MIN: u16 = 0;
pub const CRSF_CHANNEL_VALUE_MAX: u16 = 2047;

/// Calibrated stick travel: 172 = 988us, 992 = 1500us, 1811 = 2012us
pub const CRSF_CHANNEL_VALUE_TRAVEL_MIN: u16 = 172;
pub const CRSF_CHANNEL_VALUE_CENTER: u16 = 992;
pub const CRSF_CHANNEL_VALUE_TRAVEL_MAX: u16 = 1811;

/// Telemetry payload sizes
pub const CRSF_GPS_PAYLOAD_SIZE: usize = 15;
pub const CRSF_VARIO_PAYLOAD_SIZE: usize = 2;
pub const CRSF_BATTERY_SENSOR_PAYLOAD_SIZE: usize = 8;
pub const CRSF_BARO_ALTITUDE_PAYLOAD_SIZE: usize = 3;
pub const CRSF_LINK_STATS_PAYLOAD_SIZE: usize = 10;
pub const CRSF_LINK_RX_PAYLOAD_SIZE: usize = 5;
pub const CRSF_LINK_TX_PAYLOAD_SIZE: usize = 6;
pub const CRSF_ATTITUDE_PAYLOAD_SIZE: usize = 6;

/// RC channels array type (16 channels, 11-bit values)
pub type RcChannels = [u16; CRSF_NUM_CHANNELS];

/// Link endpoints allowed in the address byte
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Address {
    Broadcast = 0x00,
    Usb = 0x10,
    Bluetooth = 0x12,
    TbsCorePnpPro = 0x80,
    CurrentSensor = 0xC0,
    Gps = 0xC2,
    TbsBlackbox = 0xC4,
    FlightController = 0xC8,
    RaceTag = 0xCC,
    RadioTransmitter = 0xEA,
    Receiver = 0xEC,
    Transmitter = 0xEE,
    ElrsLua = 0xEF,
}

impl Address {
    /// Whether `byte` can start a frame
    pub fn is_valid(byte: u8) -> bool {
        Self::try_from(byte).is_ok()
    }
}

impl TryFrom<u8> for Address {
    type Error = u8;

    fn try_from(byte: u8) -> std::result::Result<Self, u8> {
        let address = match byte {
            0x00 => Self::Broadcast,
            0x10 => Self::Usb,
            0x12 => Self::Bluetooth,
            0x80 => Self::TbsCorePnpPro,
            0xC0 => Self::CurrentSensor,
            0xC2 => Self::Gps,
            0xC4 => Self::TbsBlackbox,
            0xC8 => Self::FlightController,
            0xCC => Self::RaceTag,
            0xEA => Self::RadioTransmitter,
            0xEC => Self::Receiver,
            0xEE => Self::Transmitter,
            0xEF => Self::ElrsLua,
            other => return Err(other),
        };
        Ok(address)
    }
}

/// Frame types this link knows how to decode
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    Gps = 0x02,
    Vario = 0x07,
    BatterySensor = 0x08,
    BaroAltitude = 0x09,
    LinkStatistics = 0x14,
    RcChannelsPacked = 0x16,
    LinkStatisticsRx = 0x1C,
    LinkStatisticsTx = 0x1D,
    Attitude = 0x1E,
    FlightMode = 0x21,
}

impl TryFrom<u8> for FrameType {
    type Error = CrsfLinkError;

    fn try_from(byte: u8) -> std::result::Result<Self, CrsfLinkError> {
        let frame_type = match byte {
            0x02 => Self::Gps,
            0x07 => Self::Vario,
            0x08 => Self::BatterySensor,
            0x09 => Self::BaroAltitude,
            0x14 => Self::LinkStatistics,
            0x16 => Self::RcChannelsPacked,
            0x1C => Self::LinkStatisticsRx,
            0x1D => Self::LinkStatisticsTx,
            0x1E => Self::Attitude,
            0x21 => Self::FlightMode,
            other => return Err(CrsfLinkError::UnsupportedFrameType(other)),
        };
        Ok(frame_type)
    }
}

/// GPS telemetry data
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GpsData {
    /// Latitude in degrees
    pub latitude: f64,

    /// Longitude in degrees
    pub longitude: f64,

    /// Ground speed in km/h
    pub ground_speed: f32,

    /// Heading in degrees
    pub heading: f32,

    /// Altitude in meters
    pub altitude: i32,

    /// Number of satellites
    pub satellites: u8,
}

/// Variometer (climb rate) data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VarioData {
    /// Vertical speed in cm/s
    pub vertical_speed: i16,
}

/// Battery sensor telemetry data
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BatterySensorData {
    /// Battery voltage in volts
    pub voltage: f32,

    /// Current draw in amperes
    pub current: f32,

    /// Capacity used in mAh
    pub capacity_used: u32,

    /// Battery remaining percentage (0-100%)
    pub remaining_percent: u8,
}

/// Barometric altitude data
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BarometerData {
    /// Altitude in decimeters
    pub altitude_dm: i32,

    /// Vertical speed in cm/s (decompressed from the log-packed byte)
    pub vertical_speed: i16,
}

/// Link statistics telemetry data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStatsData {
    /// Uplink RSSI (antenna 1) in -dBm
    pub uplink_rssi_1: u8,

    /// Uplink RSSI (antenna 2) in -dBm (diversity)
    pub uplink_rssi_2: u8,

    /// Uplink link quality (0-100%)
    pub uplink_lq: u8,

    /// Uplink SNR in dB
    pub uplink_snr: i8,

    /// Active antenna (0 or 1)
    pub active_antenna: u8,

    /// RF mode / packet rate
    pub rf_mode: u8,

    /// Uplink TX power (encoded)
    pub uplink_tx_power: u8,

    /// Downlink RSSI in -dBm
    pub downlink_rssi: u8,

    /// Downlink link quality (0-100%)
    pub downlink_lq: u8,

    /// Downlink SNR in dB
    pub downlink_snr: i8,
}

/// Receiver-side link statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkRxData {
    pub rssi_db: u8,
    pub rssi_percent: u8,
    pub link_quality: u8,
    pub snr: i8,
    pub rf_power_db: u8,
}

/// Transmitter-side link statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkTxData {
    pub rssi_db: u8,
    pub rssi_percent: u8,
    pub link_quality: u8,
    pub snr: i8,
    pub rf_power_db: u8,
    /// Packet rate in frames per second
    pub fps: u16,
}

/// Attitude telemetry data
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AttitudeData {
    /// Pitch in radians
    pub pitch: f32,

    /// Roll in radians
    pub roll: f32,

    /// Yaw in radians
    pub yaw: f32,
}

/// Flight mode reported by the flight controller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlightModeData {
    pub mode: String,
}

impl fmt::Display for GpsData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lat: {:.7} Lon: {:.7} Speed: {:.1}km/h Heading: {:.2} Alt: {}m Sats: {}",
            self.latitude, self.longitude, self.ground_speed, self.heading, self.altitude, self.satellites
        )
    }
}

impl fmt::Display for VarioData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VerticalSpeed: {}cm/s", self.vertical_speed)
    }
}

impl fmt::Display for BatterySensorData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Voltage: {:.1}V Current: {:.1}A Used: {}mAh Remaining: {}%",
            self.voltage, self.current, self.capacity_used, self.remaining_percent
        )
    }
}

impl fmt::Display for BarometerData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Altitude: {}dm VerticalSpeed: {}cm/s",
            self.altitude_dm, self.vertical_speed
        )
    }
}

impl fmt::Display for LinkStatsData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UpRSSI: -{}/-{}dBm UpLQ: {}% UpSNR: {}dB Antenna: {} RFMode: {} TxPower: {} DownRSSI: -{}dBm DownLQ: {}% DownSNR: {}dB",
            self.uplink_rssi_1,
            self.uplink_rssi_2,
            self.uplink_lq,
            self.uplink_snr,
            self.active_antenna,
            self.rf_mode,
            self.uplink_tx_power,
            self.downlink_rssi,
            self.downlink_lq,
            self.downlink_snr
        )
    }
}

impl fmt::Display for LinkRxData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RSSI: -{}dBm ({}%) LQ: {}% SNR: {}dB Power: {}dBm",
            self.rssi_db, self.rssi_percent, self.link_quality, self.snr, self.rf_power_db
        )
    }
}

impl fmt::Display for LinkTxData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RSSI: -{}dBm ({}%) LQ: {}% SNR: {}dB Power: {}dBm FPS: {}",
            self.rssi_db, self.rssi_percent, self.link_quality, self.snr, self.rf_power_db, self.fps
        )
    }
}

impl fmt::Display for AttitudeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pitch: {:.4} Roll: {:.4} Yaw: {:.4}",
            self.pitch, self.roll, self.yaw
        )
    }
}

impl fmt::Display for FlightModeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mode: {}", self.mode)
    }
}
