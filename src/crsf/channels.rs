//! # RC Channel Codec
//!
//! Packs 16 channels (11 bits each) into the 22-byte `RC_CHANNELS_PACKED`
//! payload and back. Channels form one continuous LSB-first bitstream with
//! no byte alignment between channels:
//!
//! ```text
//! Byte 0: Ch1[0:7]
//! Byte 1: Ch1[8:10] | Ch2[0:4]
//! Byte 2: Ch2[5:10] | Ch3[0:1]
//! ...
//! ```

use std::fmt;

use serde::Serialize;

use super::protocol::{
    RcChannels, CRSF_CHANNEL_VALUE_MAX, CRSF_NUM_CHANNELS, CRSF_RC_CHANNELS_PAYLOAD_SIZE,
};
use crate::error::{CrsfLinkError, Result};

/// Bits per channel
const CHANNEL_BITS: u32 = 11;

/// Mask selecting the 11 value bits of a channel
const CHANNEL_MASK: u16 = 0x07FF;

/// Validated set of 16 channel values, each within 0-2047
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelsData {
    channels: RcChannels,
}

impl ChannelsData {
    /// Build channel data, rejecting any value above 2047
    ///
    /// # Errors
    ///
    /// Returns `ChannelOutOfRange` naming the first offending channel
    pub fn new(channels: RcChannels) -> Result<Self> {
        if let Some((index, &value)) = channels
            .iter()
            .enumerate()
            .find(|(_, &value)| value > CRSF_CHANNEL_VALUE_MAX)
        {
            return Err(CrsfLinkError::ChannelOutOfRange { index, value });
        }

        Ok(Self { channels })
    }

    /// All channel values
    pub fn values(&self) -> &RcChannels {
        &self.channels
    }

    /// Value of one channel (0-based)
    pub fn get(&self, index: usize) -> Option<u16> {
        self.channels.get(index).copied()
    }

    /// Pack into the 22-byte wire payload
    pub fn to_payload(&self) -> [u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE] {
        pack_channels(&self.channels)
    }

    /// Unpack from a 22-byte wire payload
    pub fn from_payload(payload: &[u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE]) -> Self {
        Self {
            channels: unpack_channels(payload),
        }
    }
}

impl fmt::Display for ChannelsData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.channels.iter().enumerate() {
            if i != 0 {
                f.write_str(" ")?;
            }
            write!(f, "Channel{}: {}", i + 1, value)?;
        }
        Ok(())
    }
}

/// Pack 16 channels into a 22-byte payload
///
/// Each value is masked to 11 bits first, so a caller passing a full
/// 16-bit value cannot corrupt its neighbours.
///
/// # Examples
///
/// ```
/// use crsf_link::crsf::channels::pack_channels;
///
/// let mut channels = [0u16; 16];
/// channels[0] = 992;
/// let payload = pack_channels(&channels);
/// assert_eq!(&payload[..2], &[0xE0, 0x03]);
/// ```
pub fn pack_channels(channels: &RcChannels) -> [u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE] {
    let mut payload = [0u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE];
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut index = 0;

    for &channel in channels.iter() {
        acc |= u32::from(channel & CHANNEL_MASK) << bits;
        bits += CHANNEL_BITS;

        while bits >= 8 {
            payload[index] = acc as u8;
            acc >>= 8;
            bits -= 8;
            index += 1;
        }
    }

    payload
}

/// Unpack a 22-byte payload into 16 channels
pub fn unpack_channels(payload: &[u8; CRSF_RC_CHANNELS_PAYLOAD_SIZE]) -> RcChannels {
    let mut channels = [0u16; CRSF_NUM_CHANNELS];
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut index = 0;

    for &byte in payload.iter() {
        acc |= u32::from(byte) << bits;
        bits += 8;

        // 176 bits divide evenly into 16 channels, so index never overruns
        if bits >= CHANNEL_BITS {
            channels[index] = (acc as u16) & CHANNEL_MASK;
            acc >>= CHANNEL_BITS;
            bits -= CHANNEL_BITS;
            index += 1;
        }
    }

    channels
}
