//! Reader activity: transport bytes into the hand-off queue.
//!
//! A full queue drops the newest chunk with a warning. Fresh channel and
//! telemetry frames supersede stale ones, so stalling the transport read
//! would only add latency.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::error::{CrsfLinkError, Result};
use crate::shutdown::Shutdown;

/// Read chunks until shutdown or a transport failure
///
/// # Errors
///
/// * `Cancelled` - shutdown requested or parser gone
/// * `TransportClosed` - end of stream
/// * `Io` - read failure
pub(crate) async fn run<R>(
    mut transport: R,
    queue: mpsc::Sender<Bytes>,
    buffer_size: usize,
    mut shutdown: Shutdown,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; buffer_size];
    let mut dropped: u64 = 0;

    loop {
        let n = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Err(CrsfLinkError::Cancelled),
            read = transport.read(&mut buf) => read?,
        };

        if n == 0 {
            return Err(CrsfLinkError::TransportClosed);
        }

        match queue.try_send(Bytes::copy_from_slice(&buf[..n])) {
            Ok(()) => {}
            Err(TrySendError::Full(chunk)) => {
                dropped += 1;
                warn!(bytes = chunk.len(), dropped, "hand-off queue full, dropping chunk");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("parser stopped, reader exiting");
                return Err(CrsfLinkError::Cancelled);
            }
        }
    }
}
