//! CRC-32 integrity check for configuration frames.
//!
//! The checksum is the standard CRC-32 (ISO-HDLC, as used by zlib) over the
//! frame body: bytes `1..29`. The report ID at byte 0 and the checksum field
//! itself at bytes `29..33` are not covered.

use crate::error::{Error, Result};
use crate::frame::{Frame, CRC_OFFSET};

/// Byte range of a frame covered by the checksum.
pub const CRC_RANGE: std::ops::Range<usize> = 1..CRC_OFFSET;

/// Compute the CRC-32 over the checksummed region of a frame.
pub fn compute(frame: &Frame) -> u32 {
    crc32fast::hash(&frame[CRC_RANGE])
}

/// The checksum a frame carries in its trailing 4 bytes (little-endian).
pub fn stored(frame: &Frame) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&frame[CRC_OFFSET..]);
    u32::from_le_bytes(raw)
}

/// Recompute the checksum of `frame` and compare it against `expected`.
pub fn verify(frame: &Frame, expected: u32) -> Result<()> {
    let computed = compute(frame);
    if computed != expected {
        return Err(Error::ChecksumMismatch { expected, computed });
    }
    Ok(())
}

/// Verify a frame against the checksum it carries.
pub fn check_frame(frame: &Frame) -> Result<()> {
    verify(frame, stored(frame))
}

/// Write the checksum of the frame body into its trailing 4 bytes.
pub fn seal(frame: &mut Frame) {
    let crc = compute(frame);
    frame[CRC_OFFSET..].copy_from_slice(&crc.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FRAME_LEN;

    fn sample_frame() -> Frame {
        let mut frame = [0u8; FRAME_LEN];
        frame[0] = 100;
        frame[1] = 4;
        frame[2] = 3;
        seal(&mut frame);
        frame
    }

    #[test]
    fn standard_check_value() {
        // CRC-32/ISO-HDLC check value for "123456789".
        assert_eq!(crc32fast::hash(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn compute_covers_only_body() {
        let mut frame = [0u8; FRAME_LEN];
        frame[1..10].copy_from_slice(b"123456789");
        assert_eq!(compute(&frame), crc32fast::hash(&frame[1..29]));
    }

    #[test]
    fn sealed_frame_verifies() {
        let frame = sample_frame();
        assert!(check_frame(&frame).is_ok());
    }

    #[test]
    fn body_bit_flip_is_detected() {
        let mut frame = sample_frame();
        frame[17] ^= 0x40;
        assert!(matches!(
            check_frame(&frame),
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn report_id_is_not_covered() {
        let mut frame = sample_frame();
        frame[0] = 0xFF;
        assert!(check_frame(&frame).is_ok());
    }

    #[test]
    fn corrupted_crc_field_is_detected() {
        let mut frame = sample_frame();
        frame[31] ^= 0x01;
        assert!(check_frame(&frame).is_err());
    }

    #[test]
    fn verify_reports_both_values() {
        let frame = sample_frame();
        let good = compute(&frame);
        match verify(&frame, good ^ 1) {
            Err(Error::ChecksumMismatch { expected, computed }) => {
                assert_eq!(expected, good ^ 1);
                assert_eq!(computed, good);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
