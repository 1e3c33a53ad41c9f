//! # CRSF Link
//!
//! Runs a CRSF link over a serial port: transmits RC channels, decodes
//! telemetry and optionally records it to rotating JSONL files.
//!
//! # Usage
//!
//! ```bash
//! crsf-link [config.toml]
//! ```
//!
//! Without a config path the built-in defaults are used (auto-detected port,
//! 420,000 baud, channels written every 5ms). Log verbosity follows
//! `RUST_LOG` and defaults to `info`.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crsf_link::config::{Config, TelemetryConfig};
use crsf_link::serial::CrsfSerial;
use crsf_link::telemetry::TelemetryLogger;
use crsf_link::{CrsfLink, TelemetryStore};

#[tokio::main]
async fn main() -> Result<()> {
    let (writer, _log_guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("CRSF Link v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("loading config from {path}"))?,
        None => {
            info!("no config file given, using defaults");
            Config::default()
        }
    };

    let serial = CrsfSerial::open(&config.serial)?;
    info!("Serial port opened at: {}", serial.device_path());

    let link = Arc::new(CrsfLink::new(config.link.clone()));

    let recorder = if config.telemetry.enabled {
        let logger = TelemetryLogger::new(&config.telemetry)?;
        Some(tokio::spawn(record_telemetry(
            logger,
            link.store(),
            config.telemetry.clone(),
        )))
    } else {
        None
    };

    let mut runner = tokio::spawn({
        let link = link.clone();
        let stream = serial.into_stream();
        async move { link.start(stream).await }
    });

    info!("Press Ctrl+C to exit");

    let result = tokio::select! {
        result = &mut runner => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            if let Err(e) = link.stop() {
                error!(error = %e, "failed to stop link");
            }
            runner.await
        }
    };

    if let Some(recorder) = recorder {
        recorder.abort();
    }

    result?.context("CRSF link failed")?;
    info!("CRSF link shut down cleanly");
    Ok(())
}

/// Append a telemetry snapshot every `log_interval` until aborted
async fn record_telemetry(
    mut logger: TelemetryLogger,
    store: TelemetryStore,
    config: TelemetryConfig,
) {
    let mut ticker = interval(config.log_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(dir = %config.log_dir, "recording telemetry");

    loop {
        ticker.tick().await;
        if let Err(e) = logger.log(&store.snapshot()) {
            warn!(error = %e, "failed to record telemetry");
        }
    }
}
