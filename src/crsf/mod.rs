//! # CRSF Protocol Module
//!
//! Implementation of the Crossfire (CRSF) protocol as spoken between a flight
//! controller and an ExpressLRS or TBS radio module.
//!
//! This module handles:
//! - CRC8-DVB-S2 checksum calculation
//! - RC channels packing (16 channels, 11-bit resolution)
//! - Frame synchronization over a chunked byte stream
//! - Telemetry frame decoding (Link Stats, Battery, GPS, etc.)

pub mod channels;
pub mod crc;
pub mod decoder;
pub mod encoder;
pub mod protocol;
pub mod sync;
