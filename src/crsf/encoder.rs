//! # CRSF Packet Encoder
//!
//! Builds outbound CRSF frames. RC channels are the only frame this link
//! transmits, but any type/payload pair can be framed.

use super::channels::pack_channels;
use super::crc::crc8_dvb_s2;
use super::protocol::*;
use crate::error::{CrsfLinkError, Result};

/// Frame a payload as `[address][length][type][payload][crc]`
///
/// # Errors
///
/// Returns error if the payload exceeds `CRSF_MAX_PAYLOAD_SIZE` (60 bytes)
pub fn build_frame(address: u8, frame_type: u8, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() > CRSF_MAX_PAYLOAD_SIZE {
        return Err(CrsfLinkError::FrameLength {
            expected: CRSF_MAX_PAYLOAD_SIZE,
            actual: payload.len(),
        });
    }

    let mut frame = Vec::with_capacity(payload.len() + 4);
    frame.push(address);
    frame.push((payload.len() + 2) as u8); // type + payload + crc
    frame.push(frame_type);
    frame.extend_from_slice(payload);

    // CRC over Type + Payload
    let crc = crc8_dvb_s2(&frame[2..]);
    frame.push(crc);

    Ok(frame)
}

/// Encode RC channels into a complete CRSF frame
///
/// # Arguments
///
/// * `channels` - Array of 16 channel values (masked to 11 bits)
///
/// # Returns
///
/// * `Vec<u8>` - Complete CRSF frame (26 bytes: address + length + type + 22-byte payload + crc)
///
/// # Examples
///
/// ```
/// use crsf_link::crsf::encoder::encode_rc_channels_frame;
///
/// let channels = [992u16; 16]; // All channels at center
/// let frame = encode_rc_channels_frame(&channels);
/// assert_eq!(frame.len(), 26);
/// assert_eq!(&frame[..3], &[0xC8, 0x18, 0x16]);
/// ```
pub fn encode_rc_channels_frame(channels: &RcChannels) -> Vec<u8> {
    let payload = pack_channels(channels);

    let mut frame = Vec::with_capacity(CRSF_RC_CHANNELS_FRAME_LENGTH as usize + 2);
    frame.push(CRSF_SYNC_BYTE);
    frame.push(CRSF_RC_CHANNELS_FRAME_LENGTH);
    frame.push(FrameType::RcChannelsPacked as u8);
    frame.extend_from_slice(&payload);
    frame.push(crc8_dvb_s2(&frame[2..]));

    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crsf::crc::verify;

    #[test]
    fn test_encode_rc_channels_frame_length() {
        let frame = encode_rc_channels_frame(&[CRSF_CHANNEL_VALUE_CENTER; CRSF_NUM_CHANNELS]);

        // sync(1) + length(1) + type(1) + payload(22) + crc(1)
        assert_eq!(frame.len(), 26);
    }

    #[test]
    fn test_encode_rc_channels_frame_structure() {
        let frame = encode_rc_channels_frame(&[CRSF_CHANNEL_VALUE_CENTER; CRSF_NUM_CHANNELS]);

        assert_eq!(frame[0], CRSF_SYNC_BYTE);
        assert_eq!(frame[1], CRSF_RC_CHANNELS_FRAME_LENGTH);
        assert_eq!(frame[2], FrameType::RcChannelsPacked as u8);
        assert_eq!(frame[1] as usize, frame.len() - 2);
    }

    #[test]
    fn test_crc_excludes_address_and_length() {
        let frame = encode_rc_channels_frame(&[1500u16; CRSF_NUM_CHANNELS]);

        assert!(verify(&frame[2..25], frame[25]));
        assert_eq!(frame[25], crc8_dvb_s2(&frame[2..25]));
    }

    #[test]
    fn test_encode_frame_different_data_different_crc() {
        let frame1 = encode_rc_channels_frame(&[1000u16; CRSF_NUM_CHANNELS]);
        let frame2 = encode_rc_channels_frame(&[1500u16; CRSF_NUM_CHANNELS]);

        assert_ne!(frame1[25], frame2[25]);
    }

    #[test]
    fn test_build_frame_matches_channel_encoder() {
        let channels = [CRSF_CHANNEL_VALUE_CENTER; CRSF_NUM_CHANNELS];
        let generic = build_frame(
            CRSF_SYNC_BYTE,
            FrameType::RcChannelsPacked as u8,
            &pack_channels(&channels),
        )
        .unwrap();

        assert_eq!(generic, encode_rc_channels_frame(&channels));
    }

    #[test]
    fn test_build_frame_empty_payload() {
        let frame = build_frame(0xEA, 0x21, &[]).unwrap();
        assert_eq!(frame, vec![0xEA, 0x02, 0x21, crc8_dvb_s2(&[0x21])]);
    }

    #[test]
    fn test_build_frame_max_payload() {
        let frame = build_frame(CRSF_SYNC_BYTE, 0x02, &[0u8; CRSF_MAX_PAYLOAD_SIZE]).unwrap();
        assert_eq!(frame[1], CRSF_MAX_FRAME_LENGTH);
    }

    #[test]
    fn test_build_frame_payload_too_large() {
        let result = build_frame(CRSF_SYNC_BYTE, 0x02, &[0u8; CRSF_MAX_PAYLOAD_SIZE + 1]);
        assert!(matches!(result, Err(CrsfLinkError::FrameLength { .. })));
    }
}
