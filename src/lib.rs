//! # CRSF Link Library
//!
//! Speak the Crossfire (CRSF) serial protocol with an ExpressLRS or TBS
//! radio module.
//!
//! This library provides a frame synchronizer, the 16-channel RC codec,
//! telemetry decoders and a concurrent reader/parser/writer pipeline that
//! keeps a typed telemetry snapshot up to date while transmitting RC channels.

pub mod config;
pub mod crsf;
pub mod error;
pub mod link;
pub mod serial;
pub mod shutdown;
pub mod telemetry;

pub use error::{CrsfLinkError, Result};
pub use link::CrsfLink;
pub use telemetry::{CrsfData, TelemetryStore};
