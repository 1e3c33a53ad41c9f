//! # CRSF Frame Synchronizer
//!
//! Turns the chunked byte stream from the reader into validated frames.
//!
//! The synchronizer seeks a valid address byte, reads the length byte,
//! then reads exactly `length` body bytes (Type + Payload + CRC) and checks
//! the CRC. Chunks arrive in arbitrary sizes; a carry-over cursor into the
//! current chunk keeps every byte consumed exactly once across chunk
//! boundaries.
//!
//! Framing and CRC errors are returned to the caller and the next call
//! resumes seeking at the following byte. `Cancelled` is returned when
//! shutdown is requested or the queue is closed.

use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;
use tracing::trace;

use super::crc::crc8_dvb_s2;
use super::protocol::{Address, CRSF_MAX_FRAME_LENGTH};
use crate::error::{CrsfLinkError, Result};
use crate::shutdown::Shutdown;

/// A structurally valid frame with a verified CRC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    address: Address,
    body: Bytes,
}

impl RawFrame {
    /// Address byte the frame was sent to
    pub fn address(&self) -> Address {
        self.address
    }

    /// Value of the length byte
    pub fn length(&self) -> u8 {
        self.body.len() as u8
    }

    /// Frame type byte
    pub fn frame_type(&self) -> u8 {
        self.body[0]
    }

    /// Type + Payload + CRC
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Reassembles frames from the reader's hand-off queue
#[derive(Debug)]
pub struct FrameSynchronizer {
    queue: mpsc::Receiver<Bytes>,
    shutdown: Shutdown,
    chunk: Bytes,
    cursor: usize,
}

impl FrameSynchronizer {
    pub fn new(queue: mpsc::Receiver<Bytes>, shutdown: Shutdown) -> Self {
        Self {
            queue,
            shutdown,
            chunk: Bytes::new(),
            cursor: 0,
        }
    }

    /// Wait for the next frame
    ///
    /// # Errors
    ///
    /// * `ZeroLength` / `LengthTooLarge` - bad length byte (recoverable)
    /// * `Checksum` - CRC mismatch (recoverable)
    /// * `Cancelled` - shutdown requested or queue closed
    pub async fn next_frame(&mut self) -> Result<RawFrame> {
        let address = loop {
            let byte = self.next_byte().await?;
            match Address::try_from(byte) {
                Ok(address) => break address,
                Err(byte) => trace!(byte, "skipping non-address byte"),
            }
        };

        let length = self.next_byte().await?;
        if length == 0 {
            return Err(CrsfLinkError::ZeroLength {
                address: address as u8,
            });
        }
        if length > CRSF_MAX_FRAME_LENGTH {
            return Err(CrsfLinkError::LengthTooLarge(length));
        }

        let body = self.next_bytes(length as usize).await?;

        let (data, crc) = body.split_at(body.len() - 1);
        let expected = crc8_dvb_s2(data);
        if expected != crc[0] {
            return Err(CrsfLinkError::Checksum {
                expected,
                actual: crc[0],
            });
        }

        Ok(RawFrame { address, body })
    }

    async fn next_byte(&mut self) -> Result<u8> {
        while self.cursor >= self.chunk.len() {
            self.refill().await?;
        }

        let byte = self.chunk[self.cursor];
        self.cursor += 1;
        Ok(byte)
    }

    async fn next_bytes(&mut self, len: usize) -> Result<Bytes> {
        // Whole body inside the current chunk: share it instead of copying
        if self.chunk.len() - self.cursor >= len {
            let bytes = self.chunk.slice(self.cursor..self.cursor + len);
            self.cursor += len;
            return Ok(bytes);
        }

        let mut bytes = BytesMut::with_capacity(len);
        while bytes.len() < len {
            if self.cursor >= self.chunk.len() {
                self.refill().await?;
                continue;
            }

            let take = (len - bytes.len()).min(self.chunk.len() - self.cursor);
            bytes.extend_from_slice(&self.chunk[self.cursor..self.cursor + take]);
            self.cursor += take;
        }

        Ok(bytes.freeze())
    }

    async fn refill(&mut self) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(CrsfLinkError::Cancelled),
            chunk = self.queue.recv() => match chunk {
                Some(chunk) => {
                    self.chunk = chunk;
                    self.cursor = 0;
                    Ok(())
                }
                None => Err(CrsfLinkError::Cancelled),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crsf::encoder::{build_frame, encode_rc_channels_frame};
    use crate::crsf::protocol::{FrameType, CRSF_SYNC_BYTE};
    use crate::shutdown::ShutdownSignal;

    /// Synchronizer fed with `chunks`, queue closed afterwards
    fn synchronizer(chunks: Vec<Vec<u8>>, signal: &ShutdownSignal) -> FrameSynchronizer {
        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            tx.try_send(Bytes::from(chunk)).unwrap();
        }
        FrameSynchronizer::new(rx, signal.subscribe())
    }

    fn channels_frame() -> Vec<u8> {
        encode_rc_channels_frame(&[992u16; 16])
    }

    #[tokio::test]
    async fn test_single_frame_single_chunk() {
        let signal = ShutdownSignal::new();
        let frame = channels_frame();
        let mut sync = synchronizer(vec![frame.clone()], &signal);

        let raw = sync.next_frame().await.unwrap();
        assert_eq!(raw.address(), Address::FlightController);
        assert_eq!(raw.length(), 24);
        assert_eq!(raw.frame_type(), FrameType::RcChannelsPacked as u8);
        assert_eq!(raw.body(), &frame[2..]);

        assert!(matches!(sync.next_frame().await, Err(CrsfLinkError::Cancelled)));
    }

    #[tokio::test]
    async fn test_all_zero_channels_frame() {
        let signal = ShutdownSignal::new();
        let mut bytes = vec![0xC8, 0x18, 0x16];
        bytes.extend_from_slice(&[0u8; 22]);
        bytes.push(crc8_dvb_s2(&bytes[2..]));
        let mut sync = synchronizer(vec![bytes], &signal);

        let raw = sync.next_frame().await.unwrap();
        assert_eq!(raw.body().len(), 24);
        assert!(raw.body()[1..23].iter().all(|&b| b == 0));
    }

    #[tokio::test]
    async fn test_resync_discards_leading_garbage() {
        let signal = ShutdownSignal::new();
        let garbage = vec![0x01, 0x55, 0xAA, 0xFF, 0x16, 0x42, 0xC9];
        let mut stream = garbage.clone();
        stream.extend_from_slice(&channels_frame());
        let mut sync = synchronizer(vec![stream], &signal);

        let raw = sync.next_frame().await.unwrap();
        assert_eq!(raw.body(), &channels_frame()[2..]);
        assert!(matches!(sync.next_frame().await, Err(CrsfLinkError::Cancelled)));
    }

    #[tokio::test]
    async fn test_frame_split_byte_by_byte() {
        let signal = ShutdownSignal::new();
        let frame = channels_frame();
        let chunks = frame.iter().map(|&b| vec![b]).collect();
        let mut sync = synchronizer(chunks, &signal);

        let raw = sync.next_frame().await.unwrap();
        assert_eq!(raw.body(), &frame[2..]);
    }

    #[tokio::test]
    async fn test_frames_straddling_chunks() {
        let signal = ShutdownSignal::new();
        let first = build_frame(CRSF_SYNC_BYTE, FrameType::Vario as u8, &[0x00, 0x10]).unwrap();
        let second = channels_frame();
        let third = build_frame(0xEA, FrameType::FlightMode as u8, b"ACRO\0").unwrap();

        let mut stream = first.clone();
        stream.extend_from_slice(&second);
        stream.extend_from_slice(&third);

        // Uneven chunk sizes, including an empty chunk
        let cuts = [3, 0, 10, 1, 17, 4];
        let mut chunks = Vec::new();
        let mut rest = stream.as_slice();
        for cut in cuts {
            let (head, tail) = rest.split_at(cut.min(rest.len()));
            chunks.push(head.to_vec());
            rest = tail;
        }
        chunks.push(rest.to_vec());

        let mut sync = synchronizer(chunks, &signal);
        assert_eq!(sync.next_frame().await.unwrap().body(), &first[2..]);
        assert_eq!(sync.next_frame().await.unwrap().body(), &second[2..]);
        let raw = sync.next_frame().await.unwrap();
        assert_eq!(raw.address(), Address::RadioTransmitter);
        assert_eq!(raw.body(), &third[2..]);
    }

    #[tokio::test]
    async fn test_zero_length_rejected_then_resumes() {
        let signal = ShutdownSignal::new();
        let mut stream = vec![0xC8, 0x00];
        stream.extend_from_slice(&channels_frame());
        let mut sync = synchronizer(vec![stream], &signal);

        assert!(matches!(
            sync.next_frame().await,
            Err(CrsfLinkError::ZeroLength { address: 0xC8 })
        ));
        assert_eq!(sync.next_frame().await.unwrap().body(), &channels_frame()[2..]);
    }

    #[tokio::test]
    async fn test_zeroed_line_reports_idle_line() {
        let signal = ShutdownSignal::new();
        let mut stream = vec![0x00; 6];
        stream.extend_from_slice(&channels_frame());
        let mut sync = synchronizer(vec![stream], &signal);

        for _ in 0..3 {
            let err = sync.next_frame().await.unwrap_err();
            assert!(err.is_idle_line(), "unexpected error: {:?}", err);
        }
        assert_eq!(sync.next_frame().await.unwrap().body(), &channels_frame()[2..]);
    }

    #[tokio::test]
    async fn test_oversize_length_rejected_then_resumes() {
        let signal = ShutdownSignal::new();
        let mut stream = vec![0xC8, 63];
        stream.extend_from_slice(&channels_frame());
        let mut sync = synchronizer(vec![stream], &signal);

        assert!(matches!(
            sync.next_frame().await,
            Err(CrsfLinkError::LengthTooLarge(63))
        ));
        assert_eq!(sync.next_frame().await.unwrap().body(), &channels_frame()[2..]);
    }

    #[tokio::test]
    async fn test_max_length_accepted() {
        let signal = ShutdownSignal::new();
        let frame = build_frame(CRSF_SYNC_BYTE, 0x7F, &[0x5A; 60]).unwrap();
        assert_eq!(frame[1], 62);
        let mut sync = synchronizer(vec![frame], &signal);

        assert_eq!(sync.next_frame().await.unwrap().length(), 62);
    }

    #[tokio::test]
    async fn test_crc_error_then_next_frame() {
        let signal = ShutdownSignal::new();
        let mut corrupted = channels_frame();
        corrupted[10] ^= 0x01;
        let mut stream = corrupted;
        stream.extend_from_slice(&channels_frame());
        let mut sync = synchronizer(vec![stream], &signal);

        assert!(matches!(
            sync.next_frame().await,
            Err(CrsfLinkError::Checksum { .. })
        ));
        assert_eq!(sync.next_frame().await.unwrap().body(), &channels_frame()[2..]);
    }

    #[tokio::test]
    async fn test_shutdown_while_waiting_for_body() {
        let signal = ShutdownSignal::new();
        let (tx, rx) = mpsc::channel(4);
        tx.send(Bytes::from_static(&[0xC8, 0x18, 0x16, 0x00])).await.unwrap();
        let mut sync = FrameSynchronizer::new(rx, signal.subscribe());

        let pending = tokio::spawn(async move { sync.next_frame().await });
        tokio::task::yield_now().await;
        signal.trigger();

        let result = tokio::time::timeout(std::time::Duration::from_secs(1), pending)
            .await
            .expect("synchronizer ignored shutdown")
            .unwrap();
        assert!(matches!(result, Err(CrsfLinkError::Cancelled)));
        drop(tx);
    }
}
