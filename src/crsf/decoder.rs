//! # CRSF Packet Decoder
//!
//! Decodes validated frame bodies into typed telemetry records and routes
//! each body to its decoder by frame type.
//!
//! Every decoder takes the frame *body* (Type + Payload + CRC, i.e. exactly
//! `length` bytes) and re-checks the CRC before touching the payload.

use super::channels::ChannelsData;
use super::crc::crc8_dvb_s2;
use super::protocol::*;
use crate::error::{CrsfLinkError, Result};

/// Linearity constant of the log-packed vertical speed
const VSPEED_KL: f32 = 100.0;

/// Range constant of the log-packed vertical speed
const VSPEED_KR: f32 = 0.026;

/// One decoded frame, ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryUpdate {
    Channels(ChannelsData),
    Gps(GpsData),
    Vario(VarioData),
    BatterySensor(BatterySensorData),
    Barometer(BarometerData),
    LinkStats(LinkStatsData),
    LinkRx(LinkRxData),
    LinkTx(LinkTxData),
    Attitude(AttitudeData),
    FlightMode(FlightModeData),
}

/// Routes frame bodies to the decoder for their type
#[derive(Debug, Clone, Copy)]
pub struct FrameDispatcher {
    read_channels: bool,
}

impl FrameDispatcher {
    /// Create a dispatcher
    ///
    /// # Arguments
    ///
    /// * `read_channels` - Decode inbound RC channel frames; when false they are ignored
    pub fn new(read_channels: bool) -> Self {
        Self { read_channels }
    }

    /// Decode a frame body according to its type byte
    ///
    /// # Returns
    ///
    /// * `Ok(Some(update))` - Decoded record
    /// * `Ok(None)` - RC channels frame while channel tracking is disabled
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFrameType` for unknown types, and length, CRC or
    /// payload errors from the selected decoder.
    pub fn dispatch(&self, frame_type: u8, body: &[u8]) -> Result<Option<TelemetryUpdate>> {
        let update = match FrameType::try_from(frame_type)? {
            FrameType::RcChannelsPacked => {
                if !self.read_channels {
                    return Ok(None);
                }
                TelemetryUpdate::Channels(decode_rc_channels(body)?)
            }
            FrameType::Gps => TelemetryUpdate::Gps(decode_gps(body)?),
            FrameType::Vario => TelemetryUpdate::Vario(decode_vario(body)?),
            FrameType::BatterySensor => TelemetryUpdate::BatterySensor(decode_battery_sensor(body)?),
            FrameType::BaroAltitude => TelemetryUpdate::Barometer(decode_barometer(body)?),
            FrameType::LinkStatistics => TelemetryUpdate::LinkStats(decode_link_statistics(body)?),
            FrameType::LinkStatisticsRx => TelemetryUpdate::LinkRx(decode_link_rx(body)?),
            FrameType::LinkStatisticsTx => TelemetryUpdate::LinkTx(decode_link_tx(body)?),
            FrameType::Attitude => TelemetryUpdate::Attitude(decode_attitude(body)?),
            FrameType::FlightMode => TelemetryUpdate::FlightMode(decode_flight_mode(body)?),
        };

        Ok(Some(update))
    }
}

/// Check the trailing CRC of a body and return its payload
///
/// # Errors
///
/// Returns error if the body is shorter than type + crc or the CRC mismatches
pub fn verified_payload(body: &[u8]) -> Result<&[u8]> {
    if body.len() < 2 {
        return Err(CrsfLinkError::FrameLength {
            expected: 2,
            actual: body.len(),
        });
    }

    let (data, crc) = body.split_at(body.len() - 1);
    let expected = crc8_dvb_s2(data);
    if expected != crc[0] {
        return Err(CrsfLinkError::Checksum {
            expected,
            actual: crc[0],
        });
    }

    Ok(&data[1..])
}

/// Validate type, exact length and CRC of a fixed-size record
fn checked_payload(body: &[u8], frame_type: FrameType, payload_size: usize) -> Result<&[u8]> {
    let expected = payload_size + 2;
    if body.len() != expected {
        return Err(CrsfLinkError::FrameLength {
            expected,
            actual: body.len(),
        });
    }

    if body[0] != frame_type as u8 {
        return Err(CrsfLinkError::Decode(format!(
            "expected {:?} frame, got type 0x{:02X}",
            frame_type, body[0]
        )));
    }

    verified_payload(body)
}

/// Decode an RC channels body (24 bytes: type + 22-byte payload + crc)
pub fn decode_rc_channels(body: &[u8]) -> Result<ChannelsData> {
    let payload = checked_payload(body, FrameType::RcChannelsPacked, CRSF_RC_CHANNELS_PAYLOAD_SIZE)?;

    let mut packed = [0u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE];
    packed.copy_from_slice(payload);

    Ok(ChannelsData::from_payload(&packed))
}

/// Decode GPS telemetry (15-byte payload)
pub fn decode_gps(body: &[u8]) -> Result<GpsData> {
    let payload = checked_payload(body, FrameType::Gps, CRSF_GPS_PAYLOAD_SIZE)?;

    // Latitude / longitude: degrees × 10^7
    let lat_raw = i32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let lon_raw = i32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);

    // Ground speed: km/h × 10
    let speed_raw = u16::from_be_bytes([payload[8], payload[9]]);

    // Heading: degrees × 100
    let heading_raw = u16::from_be_bytes([payload[10], payload[11]]);

    // Altitude: meters + 1000
    let altitude_raw = u16::from_be_bytes([payload[12], payload[13]]);

    Ok(GpsData {
        latitude: lat_raw as f64 / 10_000_000.0,
        longitude: lon_raw as f64 / 10_000_000.0,
        ground_speed: speed_raw as f32 / 10.0,
        heading: heading_raw as f32 / 100.0,
        altitude: i32::from(altitude_raw) - 1000,
        satellites: payload[14],
    })
}

/// Decode variometer telemetry (2-byte payload, cm/s)
pub fn decode_vario(body: &[u8]) -> Result<VarioData> {
    let payload = checked_payload(body, FrameType::Vario, CRSF_VARIO_PAYLOAD_SIZE)?;

    Ok(VarioData {
        vertical_speed: i16::from_be_bytes([payload[0], payload[1]]),
    })
}

/// Decode battery sensor telemetry (8-byte payload)
pub fn decode_battery_sensor(body: &[u8]) -> Result<BatterySensorData> {
    let payload = checked_payload(body, FrameType::BatterySensor, CRSF_BATTERY_SENSOR_PAYLOAD_SIZE)?;

    // Voltage and current in tenths
    let voltage_dv = u16::from_be_bytes([payload[0], payload[1]]);
    let current_da = u16::from_be_bytes([payload[2], payload[3]]);

    // Capacity: 3 bytes, big-endian, in mAh
    let capacity_used = u32::from_be_bytes([0, payload[4], payload[5], payload[6]]);

    Ok(BatterySensorData {
        voltage: voltage_dv as f32 / 10.0,
        current: current_da as f32 / 10.0,
        capacity_used,
        remaining_percent: payload[7],
    })
}

/// Decode barometric altitude (3-byte payload)
///
/// Altitude is decimeters + 10000 when bit 15 is clear, otherwise whole
/// meters in the low 15 bits. Vertical speed is log-compressed into one byte.
pub fn decode_barometer(body: &[u8]) -> Result<BarometerData> {
    let payload = checked_payload(body, FrameType::BaroAltitude, CRSF_BARO_ALTITUDE_PAYLOAD_SIZE)?;

    let altitude_packed = u16::from_be_bytes([payload[0], payload[1]]);
    let altitude_dm = if altitude_packed & 0x8000 == 0 {
        i32::from(altitude_packed) - 10_000
    } else {
        i32::from(altitude_packed & 0x7FFF) * 10
    };

    Ok(BarometerData {
        altitude_dm,
        vertical_speed: unpack_vertical_speed(payload[2] as i8),
    })
}

fn unpack_vertical_speed(packed: i8) -> i16 {
    let magnitude = i32::from(packed).abs() as f32;
    let speed = ((magnitude * VSPEED_KR).exp() - 1.0) * VSPEED_KL;
    (speed.round() as i16) * i16::from(packed.signum())
}

/// Decode Link Statistics telemetry (10-byte payload)
pub fn decode_link_statistics(body: &[u8]) -> Result<LinkStatsData> {
    let payload = checked_payload(body, FrameType::LinkStatistics, CRSF_LINK_STATS_PAYLOAD_SIZE)?;

    Ok(LinkStatsData {
        uplink_rssi_1: payload[0],
        uplink_rssi_2: payload[1],
        uplink_lq: payload[2],
        uplink_snr: payload[3] as i8,
        active_antenna: payload[4],
        rf_mode: payload[5],
        uplink_tx_power: payload[6],
        downlink_rssi: payload[7],
        downlink_lq: payload[8],
        downlink_snr: payload[9] as i8,
    })
}

/// Decode receiver link statistics (5-byte payload)
pub fn decode_link_rx(body: &[u8]) -> Result<LinkRxData> {
    let payload = checked_payload(body, FrameType::LinkStatisticsRx, CRSF_LINK_RX_PAYLOAD_SIZE)?;

    Ok(LinkRxData {
        rssi_db: payload[0],
        rssi_percent: payload[1],
        link_quality: payload[2],
        snr: payload[3] as i8,
        rf_power_db: payload[4],
    })
}

/// Decode transmitter link statistics (6-byte payload, fps in tens)
pub fn decode_link_tx(body: &[u8]) -> Result<LinkTxData> {
    let payload = checked_payload(body, FrameType::LinkStatisticsTx, CRSF_LINK_TX_PAYLOAD_SIZE)?;

    Ok(LinkTxData {
        rssi_db: payload[0],
        rssi_percent: payload[1],
        link_quality: payload[2],
        snr: payload[3] as i8,
        rf_power_db: payload[4],
        fps: u16::from(payload[5]) * 10,
    })
}

/// Decode attitude telemetry (6-byte payload, radians × 10000)
pub fn decode_attitude(body: &[u8]) -> Result<AttitudeData> {
    let payload = checked_payload(body, FrameType::Attitude, CRSF_ATTITUDE_PAYLOAD_SIZE)?;

    let angle = |hi: u8, lo: u8| i16::from_be_bytes([hi, lo]) as f32 / 10_000.0;

    Ok(AttitudeData {
        pitch: angle(payload[0], payload[1]),
        roll: angle(payload[2], payload[3]),
        yaw: angle(payload[4], payload[5]),
    })
}

/// Decode flight mode (NUL-terminated ASCII payload)
pub fn decode_flight_mode(body: &[u8]) -> Result<FlightModeData> {
    if body.first() != Some(&(FrameType::FlightMode as u8)) {
        return Err(CrsfLinkError::Decode("expected FlightMode frame".to_string()));
    }

    let payload = verified_payload(body)?;
    if payload.is_empty() {
        return Err(CrsfLinkError::Decode("empty flight mode".to_string()));
    }

    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    let mode = std::str::from_utf8(&payload[..end])
        .map_err(|e| CrsfLinkError::Decode(format!("flight mode is not valid text: {}", e)))?;

    Ok(FlightModeData {
        mode: mode.to_string(),
    })
}
