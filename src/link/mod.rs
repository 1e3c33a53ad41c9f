//! # Link Pipeline
//!
//! Runs one CRSF session over a duplex byte transport as three concurrent
//! activities sharing a shutdown signal:
//!
//! - **reader**: transport bytes into a bounded hand-off queue
//! - **parser**: frame synchronizer, dispatcher and telemetry store updates
//! - **writer**: periodic RC channel frames, unless the link is read-only
//!
//! Malformed input never stops a session. It ends on an explicit
//! [`CrsfLink::stop`] or on the first transport failure, whichever comes
//! first.

mod parser;
mod reader;
mod writer;

use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::config::LinkConfig;
use crate::crsf::channels::ChannelsData;
use crate::crsf::decoder::FrameDispatcher;
use crate::crsf::protocol::RcChannels;
use crate::crsf::sync::FrameSynchronizer;
use crate::error::{CrsfLinkError, Result};
use crate::shutdown::ShutdownSignal;
use crate::telemetry::{CrsfData, TelemetryStore};

/// CRSF link engine
///
/// A link can be started again after it stopped. Each session starts with
/// empty telemetry; channel values set with [`CrsfLink::set_channels`] are
/// kept across sessions.
#[derive(Debug)]
pub struct CrsfLink {
    config: LinkConfig,
    store: TelemetryStore,
    session: Mutex<Option<ShutdownSignal>>,
}

impl CrsfLink {
    /// Create an idle link
    pub fn new(config: LinkConfig) -> Self {
        Self {
            config,
            store: TelemetryStore::new(),
            session: Mutex::new(None),
        }
    }

    /// Shared handle to the telemetry store
    pub fn store(&self) -> TelemetryStore {
        self.store.clone()
    }

    /// Copy of the current telemetry
    pub fn snapshot(&self) -> CrsfData {
        self.store.snapshot()
    }

    /// Set the channel values the writer transmits
    ///
    /// # Errors
    ///
    /// Returns `ChannelOutOfRange` if any value exceeds 11 bits.
    pub fn set_channels(&self, values: RcChannels) -> Result<()> {
        self.store.set_channels(ChannelsData::new(values)?);
        Ok(())
    }

    /// Whether a session is active
    pub fn is_running(&self) -> bool {
        self.session().is_some()
    }

    /// Request the active session to stop
    ///
    /// Returns immediately; the matching [`CrsfLink::start`] call returns
    /// once all activities have exited.
    ///
    /// # Errors
    ///
    /// Returns `NotRunning` if no session is active.
    pub fn stop(&self) -> Result<()> {
        match self.session().as_ref() {
            Some(signal) => {
                info!("stopping CRSF link");
                signal.trigger();
                Ok(())
            }
            None => Err(CrsfLinkError::NotRunning),
        }
    }

    /// Run a session over `transport` until stopped or the transport fails
    ///
    /// # Errors
    ///
    /// * `AlreadyRunning` - another session is active
    /// * `TransportClosed` - the transport reached end of stream
    /// * `Io` - a transport read or write failed
    /// * `TaskFailed` - an activity panicked
    pub async fn start<T>(&self, transport: T) -> Result<()>
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let session = self.begin()?;
        let signal = session.signal.clone();

        let (read_half, write_half) = tokio::io::split(transport);
        let (queue_tx, queue_rx) = mpsc::channel::<Bytes>(self.config.queue_depth);

        let mut tasks = JoinSet::new();
        tasks.spawn(reader::run(
            read_half,
            queue_tx,
            self.config.read_buffer_size,
            signal.subscribe(),
        ));
        tasks.spawn(parser::run(
            FrameSynchronizer::new(queue_rx, signal.subscribe()),
            FrameDispatcher::new(self.config.read_channels),
            self.store.clone(),
        ));
        if self.config.read_only {
            debug!("read-only link, writer disabled");
        } else {
            tasks.spawn(writer::run(
                write_half,
                self.store.clone(),
                self.config.writer_interval(),
                signal.subscribe(),
            ));
        }

        info!(
            read_only = self.config.read_only,
            read_channels = self.config.read_channels,
            "CRSF link started"
        );

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let result = joined.unwrap_or_else(|e| Err(CrsfLinkError::TaskFailed(e.to_string())));
            match result {
                Ok(()) | Err(CrsfLinkError::Cancelled) => {}
                Err(e) => {
                    if first_error.is_none() {
                        error!(error = %e, "link activity failed");
                        first_error = Some(e);
                    } else {
                        debug!(error = %e, "link activity failed after shutdown");
                    }
                }
            }
            // One finished activity ends the session
            signal.trigger();
        }

        drop(session);
        info!("CRSF link stopped");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn begin(&self) -> Result<Session<'_>> {
        let mut slot = self.session();
        if slot.is_some() {
            return Err(CrsfLinkError::AlreadyRunning);
        }
        // Telemetry belongs to a session; outbound channels carry over
        self.store.clear_telemetry();
        let signal = ShutdownSignal::new();
        *slot = Some(signal.clone());
        Ok(Session { link: self, signal })
    }

    fn session(&self) -> MutexGuard<'_, Option<ShutdownSignal>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Active session; cancels its activities and frees the link when dropped,
/// including when the `start` future itself is dropped
struct Session<'a> {
    link: &'a CrsfLink,
    signal: ShutdownSignal,
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.signal.trigger();
        self.link.session().take();
    }
}
