use crate::error::{ModemError, Result};
use crate::FRAME_HEADER_SIZE;

/// CRC-32/MPEG-2 (poly 0x04C11DB7, init 0xFFFFFFFF, MSB-first, no final XOR)
///
/// The checksum of an empty payload is 0xFFFFFFFF, so a frame made only of
/// zero bytes (what silence demodulates to) can never validate.
pub fn crc32(data: &[u8]) -> u32 {
    const POLYNOMIAL: u32 = 0x04C1_1DB7;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= (byte as u32) << 24;
        for _ in 0..8 {
            if crc & 0x8000_0000 != 0 {
                crc = (crc << 1) ^ POLYNOMIAL;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// Total frame size for a payload of `payload_len` bytes
pub fn frame_len(payload_len: usize) -> usize {
    FRAME_HEADER_SIZE + payload_len
}

/// A validated frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub payload_len: u32,
    pub checksum: u32,
    pub payload: Vec<u8>,
}

pub struct FrameEncoder;
pub struct FrameDecoder;

impl FrameEncoder {
    /// Layout: payload length (4 bytes BE) | CRC-32 of payload (4 bytes BE) | payload
    pub fn build(payload: &[u8]) -> Vec<u8> {
        let mut frame = Vec::with_capacity(frame_len(payload.len()));
        frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        frame.extend_from_slice(&crc32(payload).to_be_bytes());
        frame.extend_from_slice(payload);
        frame
    }
}

impl FrameDecoder {
    /// Read the declared payload length from a frame header
    pub fn declared_len(data: &[u8]) -> Result<usize> {
        let header = data
            .get(..4)
            .ok_or(ModemError::TooShort { len: data.len() })?;
        Ok(u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize)
    }

    /// Parse and verify a frame. Bytes past the declared payload are ignored
    /// (symbol padding); anything short of it fails the whole frame.
    pub fn parse(data: &[u8]) -> Result<Frame> {
        if data.len() < FRAME_HEADER_SIZE {
            return Err(ModemError::TooShort { len: data.len() });
        }

        let payload_len = Self::declared_len(data)?;
        let end = FRAME_HEADER_SIZE
            .checked_add(payload_len)
            .filter(|&end| end <= data.len())
            .ok_or(ModemError::TooShort { len: data.len() })?;

        let expected = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        let payload = &data[FRAME_HEADER_SIZE..end];
        let actual = crc32(payload);

        if expected != actual {
            return Err(ModemError::ChecksumMismatch { expected, actual });
        }

        Ok(Frame {
            payload_len: payload_len as u32,
            checksum: actual,
            payload: payload.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_check_value() {
        assert_eq!(crc32(b"123456789"), 0x0376_E6E7);
        assert_eq!(crc32(b""), 0xFFFF_FFFF);
    }

    #[test]
    fn test_frame_build_parse() {
        let encoded = FrameEncoder::build(b"Hello");
        assert_eq!(encoded.len(), frame_len(5));
        assert_eq!(&encoded[..4], &[0, 0, 0, 5]);

        let frame = FrameDecoder::parse(&encoded).unwrap();
        assert_eq!(frame.payload_len, 5);
        assert_eq!(frame.payload, b"Hello");
        assert_eq!(frame.checksum, crc32(b"Hello"));
    }

    #[test]
    fn test_empty_payload_frame() {
        let encoded = FrameEncoder::build(b"");
        assert_eq!(encoded.len(), FRAME_HEADER_SIZE);
        assert_eq!(&encoded[4..], &[0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(FrameDecoder::parse(&encoded).unwrap().payload.is_empty());
    }

    #[test]
    fn test_all_zero_frame_rejected() {
        match FrameDecoder::parse(&[0u8; 16]) {
            Err(ModemError::ChecksumMismatch { expected: 0, actual }) => {
                assert_eq!(actual, 0xFFFF_FFFF)
            }
            other => panic!("Expected ChecksumMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_trailing_padding_ignored() {
        let mut encoded = FrameEncoder::build(b"pad me");
        encoded.extend_from_slice(&[0, 0, 0]);
        assert_eq!(FrameDecoder::parse(&encoded).unwrap().payload, b"pad me");
    }

    #[test]
    fn test_short_header_rejected() {
        let encoded = FrameEncoder::build(b"Hello");
        match FrameDecoder::parse(&encoded[..FRAME_HEADER_SIZE - 1]) {
            Err(ModemError::TooShort { len }) => assert_eq!(len, FRAME_HEADER_SIZE - 1),
            other => panic!("Expected TooShort, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let encoded = FrameEncoder::build(b"Hello World");
        assert!(matches!(
            FrameDecoder::parse(&encoded[..encoded.len() - 1]),
            Err(ModemError::TooShort { .. })
        ));
    }

    #[test]
    fn test_corrupted_payload_rejected() {
        let mut encoded = FrameEncoder::build(b"Hello World");
        // Same length, different content; the stored CRC no longer matches
        encoded[FRAME_HEADER_SIZE + 1] = b'g';

        match FrameDecoder::parse(&encoded) {
            Err(ModemError::ChecksumMismatch { expected, actual }) => {
                assert_eq!(expected, crc32(b"Hello World"));
                assert_eq!(actual, crc32(b"Hgllo World"));
            }
            other => panic!("Expected ChecksumMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_declared_len() {
        let encoded = FrameEncoder::build(&[7u8; 300]);
        assert_eq!(FrameDecoder::declared_len(&encoded).unwrap(), 300);
        assert!(FrameDecoder::declared_len(&encoded[..3]).is_err());
    }
}
