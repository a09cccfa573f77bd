use crate::core::error::{Error, ErrorKind, Result};

/// Variable byte encoding for integers (best for small integers)
pub struct VByteEncoder;

impl VByteEncoder {
    pub const MAX_LEN: usize = 10;

    /// Encode single u64 value
    /// Values < 128 use 1 byte, < 16384 use 2 bytes, etc.
    pub fn encode_u64(output: &mut Vec<u8>, mut value: u64) {
        while value >= 128 {
            output.push((value & 127) as u8 | 128);
            value >>= 7;
        }
        output.push(value as u8);
    }

    /// Encode into a fixed buffer at `pos`; returns the new position, or `None`
    /// when the value does not fit.
    pub fn encode_u64_into(output: &mut [u8], mut pos: usize, mut value: u64) -> Option<usize> {
        loop {
            let slot = output.get_mut(pos)?;
            if value < 128 {
                *slot = value as u8;
                return Some(pos + 1);
            }
            *slot = (value & 127) as u8 | 128;
            value >>= 7;
            pos += 1;
        }
    }

    pub fn encoded_len(mut value: u64) -> usize {
        let mut len = 1;
        while value >= 128 {
            value >>= 7;
            len += 1;
        }
        len
    }

    /// Decode single u64 value, returns (value, bytes_consumed)
    pub fn decode_u64(input: &[u8]) -> Result<(u64, usize)> {
        let mut value = 0u64;
        let mut shift = 0;

        for (i, &byte) in input.iter().enumerate() {
            value |= ((byte & 127) as u64) << shift;

            if byte & 128 == 0 {
                return Ok((value, i + 1));
            }

            shift += 7;
            if shift > 63 {
                return Err(Error::new(ErrorKind::Corruption, "VByte overflow"));
            }
        }

        Err(Error::new(ErrorKind::Corruption, "Incomplete VByte"))
    }

}

#[inline]
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_values() {
        for value in [0u64, 127, 128, 16_383, 16_384, u32::MAX as u64, u64::MAX] {
            let mut out = Vec::new();
            VByteEncoder::encode_u64(&mut out, value);
            assert_eq!(out.len(), VByteEncoder::encoded_len(value));
            assert_eq!(VByteEncoder::decode_u64(&out).unwrap(), (value, out.len()));
        }
    }

    #[test]
    fn bounded_encoding_reports_overflow() {
        let mut buf = [0u8; 2];
        assert_eq!(VByteEncoder::encode_u64_into(&mut buf, 0, 300), Some(2));
        assert_eq!(VByteEncoder::encode_u64_into(&mut buf, 1, 300), None);
    }

    #[test]
    fn truncated_input_is_corruption() {
        let err = VByteEncoder::decode_u64(&[0x80, 0x80]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Corruption);
    }

    #[test]
    fn zigzag_is_symmetric() {
        for value in [0i64, -1, 1, i64::MIN, i64::MAX, -4096] {
            assert_eq!(zigzag_decode(zigzag_encode(value)), value);
        }
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
    }
}
