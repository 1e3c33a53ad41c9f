//! # Telemetry Module
//!
//! Holds decoded telemetry and records it to disk.
//!
//! This module handles:
//! - The shared last-write-wins telemetry store
//! - Formatting snapshots as JSONL (JSON Lines)
//! - Writing to rotating log files
//! - Retaining only the last N files

pub mod logger;
pub mod store;

pub use logger::TelemetryLogger;
pub use store::{CrsfData, TelemetryStore};
