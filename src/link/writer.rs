//! Writer activity: periodic RC channel frames onto the transport.

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use crate::crsf::encoder::encode_rc_channels_frame;
use crate::error::{CrsfLinkError, Result};
use crate::shutdown::Shutdown;
use crate::telemetry::TelemetryStore;

/// Number of frames between status log messages
const LOG_INTERVAL_FRAMES: u64 = 1000;

/// Transmit the stored channels every `period` until shutdown
///
/// # Errors
///
/// * `Cancelled` - shutdown requested
/// * `Io` - write failure; the link is considered down
pub(crate) async fn run<W>(
    mut transport: W,
    store: TelemetryStore,
    period: Duration,
    mut shutdown: Shutdown,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sent: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Err(CrsfLinkError::Cancelled),
            _ = ticker.tick() => {}
        }

        let frame = encode_rc_channels_frame(store.channels().values());

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Err(CrsfLinkError::Cancelled),
            written = send_frame(&mut transport, &frame) => written?,
        }

        sent += 1;
        if sent % LOG_INTERVAL_FRAMES == 0 {
            debug!(sent, "transmitted channel frames");
        }
    }
}

async fn send_frame<W>(transport: &mut W, frame: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    transport.write_all(frame).await?;
    transport.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crsf::channels::ChannelsData;
    use crate::shutdown::ShutdownSignal;
    use std::io;
    use tokio::io::AsyncReadExt;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_writes_stored_channels_then_fails_on_error() {
        let signal = ShutdownSignal::new();
        let store = TelemetryStore::new();
        let mut values = [0u16; 16];
        values[0] = 992;
        store.set_channels(ChannelsData::new(values).unwrap());

        let expected = encode_rc_channels_frame(&values);
        let transport = Builder::new()
            .write(&expected)
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
            .build();

        let result = run(transport, store, Duration::from_millis(1), signal.subscribe()).await;
        match result {
            Err(CrsfLinkError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("Expected Io error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_frames_follow_store_updates() {
        let signal = ShutdownSignal::new();
        let store = TelemetryStore::new();
        let (transport, mut device) = tokio::io::duplex(1024);

        let writer = tokio::spawn(run(
            transport,
            store.clone(),
            Duration::from_millis(2),
            signal.subscribe(),
        ));

        let mut frame = [0u8; 26];
        device.read_exact(&mut frame).await.unwrap();
        assert_eq!(frame.to_vec(), encode_rc_channels_frame(&[0u16; 16]));

        store.set_channels(ChannelsData::new([1811; 16]).unwrap());
        let expected = encode_rc_channels_frame(&[1811u16; 16]);
        let mut seen = false;
        for _ in 0..50 {
            device.read_exact(&mut frame).await.unwrap();
            if frame.to_vec() == expected {
                seen = true;
                break;
            }
        }
        assert!(seen, "updated channels never transmitted");

        signal.trigger();
        let result = tokio::time::timeout(Duration::from_secs(1), writer)
            .await
            .expect("writer ignored shutdown")
            .unwrap();
        assert!(matches!(result, Err(CrsfLinkError::Cancelled)));
    }

    #[tokio::test]
    async fn test_shutdown_while_transport_blocked() {
        let signal = ShutdownSignal::new();
        // Tiny buffer nobody drains: the first write blocks
        let (transport, _device) = tokio::io::duplex(4);

        let writer = tokio::spawn(run(
            transport,
            TelemetryStore::new(),
            Duration::from_millis(1),
            signal.subscribe(),
        ));
        tokio::time::sleep(Duration::from_millis(10)).await;
        signal.trigger();

        let result = tokio::time::timeout(Duration::from_secs(1), writer)
            .await
            .expect("writer ignored shutdown")
            .unwrap();
        assert!(matches!(result, Err(CrsfLinkError::Cancelled)));
    }
}
