//! # Telemetry Store
//!
//! Last-write-wins cache of the most recent value of every telemetry record
//! plus the RC channels, shared between the link activities.
//!
//! Each setter holds the write lock only for the one field assignment, so
//! fields are independent: a snapshot taken while the parser is busy may mix
//! values of different ages, but never a half-written field.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::crsf::channels::ChannelsData;
use crate::crsf::decoder::TelemetryUpdate;
use crate::crsf::protocol::*;

/// Aggregate telemetry snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrsfData {
    pub channels: ChannelsData,
    pub gps: GpsData,
    pub vario: VarioData,
    pub battery_sensor: BatterySensorData,
    pub barometer: BarometerData,
    pub link_stats: LinkStatsData,
    pub link_rx: LinkRxData,
    pub link_tx: LinkTxData,
    pub attitude: AttitudeData,
    pub flight_mode: FlightModeData,
}

impl fmt::Display for CrsfData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Channels: {{{}}}", self.channels)?;
        writeln!(f, "GPS: {{{}}}", self.gps)?;
        writeln!(f, "Vario: {{{}}}", self.vario)?;
        writeln!(f, "Battery: {{{}}}", self.battery_sensor)?;
        writeln!(f, "Barometer: {{{}}}", self.barometer)?;
        writeln!(f, "LinkStats: {{{}}}", self.link_stats)?;
        writeln!(f, "LinkRx: {{{}}}", self.link_rx)?;
        writeln!(f, "LinkTx: {{{}}}", self.link_tx)?;
        writeln!(f, "Attitude: {{{}}}", self.attitude)?;
        write!(f, "FlightMode: {{{}}}", self.flight_mode)
    }
}

/// Shared handle to the telemetry aggregate; clones share the same data
#[derive(Debug, Clone, Default)]
pub struct TelemetryStore {
    data: Arc<RwLock<CrsfData>>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every field
    pub fn snapshot(&self) -> CrsfData {
        self.read().clone()
    }

    /// Current RC channels
    pub fn channels(&self) -> ChannelsData {
        self.read().channels
    }

    /// Replace the whole aggregate
    pub fn set_data(&self, data: CrsfData) {
        *self.write() = data;
    }

    /// Reset every telemetry record to empty, keeping the channels
    pub fn clear_telemetry(&self) {
        let mut data = self.write();
        let channels = data.channels;
        *data = CrsfData {
            channels,
            ..CrsfData::default()
        };
    }

    pub fn set_channels(&self, channels: ChannelsData) {
        self.write().channels = channels;
    }

    pub fn set_gps(&self, gps: GpsData) {
        self.write().gps = gps;
    }

    pub fn set_vario(&self, vario: VarioData) {
        self.write().vario = vario;
    }

    pub fn set_battery_sensor(&self, battery: BatterySensorData) {
        self.write().battery_sensor = battery;
    }

    pub fn set_barometer(&self, barometer: BarometerData) {
        self.write().barometer = barometer;
    }

    pub fn set_link_stats(&self, stats: LinkStatsData) {
        self.write().link_stats = stats;
    }

    pub fn set_link_rx(&self, link_rx: LinkRxData) {
        self.write().link_rx = link_rx;
    }

    pub fn set_link_tx(&self, link_tx: LinkTxData) {
        self.write().link_tx = link_tx;
    }

    pub fn set_attitude(&self, attitude: AttitudeData) {
        self.write().attitude = attitude;
    }

    pub fn set_flight_mode(&self, flight_mode: FlightModeData) {
        self.write().flight_mode = flight_mode;
    }

    /// Store a decoded frame in its field
    pub fn apply(&self, update: TelemetryUpdate) {
        match update {
            TelemetryUpdate::Channels(data) => self.set_channels(data),
            TelemetryUpdate::Gps(data) => self.set_gps(data),
            TelemetryUpdate::Vario(data) => self.set_vario(data),
            TelemetryUpdate::BatterySensor(data) => self.set_battery_sensor(data),
            TelemetryUpdate::Barometer(data) => self.set_barometer(data),
            TelemetryUpdate::LinkStats(data) => self.set_link_stats(data),
            TelemetryUpdate::LinkRx(data) => self.set_link_rx(data),
            TelemetryUpdate::LinkTx(data) => self.set_link_tx(data),
            TelemetryUpdate::Attitude(data) => self.set_attitude(data),
            TelemetryUpdate::FlightMode(data) => self.set_flight_mode(data),
        }
    }

    // Every write is a single assignment, so a poisoned lock still holds
    // consistent data
    fn read(&self) -> RwLockReadGuard<'_, CrsfData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CrsfData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}
