use crate::compression::vbyte::VByteEncoder;
use crate::core::error::{Error, Result};

/// Patched frame-of-reference codec for blocks of sorted integers.
///
/// ```text
/// varint(count) varint(first)
/// [count > 1]  u8 width, varint(exceptions), packed deltas (width bits each),
///              exceptions * (varint(index), varint(delta >> width))
/// ```
/// Deltas whose bit length exceeds `width` keep their low bits in the frame and
/// store the high bits as an exception.
pub struct PForBlock;

impl PForBlock {
    pub fn encode(values: &[u64], output: &mut Vec<u8>) {
        debug_assert!(values.windows(2).all(|w| w[0] < w[1]), "block values must be strictly increasing");

        VByteEncoder::encode_u64(output, values.len() as u64);
        let Some(&first) = values.first() else {
            return;
        };
        VByteEncoder::encode_u64(output, first);
        if values.len() == 1 {
            return;
        }

        let deltas: Vec<u64> = values.windows(2).map(|w| w[1] - w[0]).collect();
        let width = Self::choose_width(&deltas);
        output.push(width as u8);

        let exceptions: Vec<(usize, u64)> = deltas
            .iter()
            .enumerate()
            .filter(|(_, d)| bit_length(**d) > width)
            .map(|(i, d)| (i, *d >> width))
            .collect();
        VByteEncoder::encode_u64(output, exceptions.len() as u64);

        let mask = low_mask(width);
        let mut acc: u128 = 0;
        let mut bits = 0u32;
        for &delta in &deltas {
            acc |= ((delta & mask) as u128) << bits;
            bits += width;
            while bits >= 8 {
                output.push(acc as u8);
                acc >>= 8;
                bits -= 8;
            }
        }
        if bits > 0 {
            output.push(acc as u8);
        }

        for (index, high) in exceptions {
            VByteEncoder::encode_u64(output, index as u64);
            VByteEncoder::encode_u64(output, high);
        }
    }

    /// Picks the frame width minimising packed bytes plus exception overhead.
    fn choose_width(deltas: &[u64]) -> u32 {
        let mut histogram = [0usize; 65];
        for &delta in deltas {
            histogram[bit_length(delta) as usize] += 1;
        }
        let max_width = (0..=64).rev().find(|w| histogram[*w] > 0).unwrap_or(0) as u32;

        let mut best = (usize::MAX, max_width);
        for width in 0..=max_width {
            let packed = (deltas.len() * width as usize).div_ceil(8);
            let exceptions: usize = ((width + 1)..=max_width)
                .map(|bits| histogram[bits as usize] * (2 + (bits - width) as usize / 7 + 1))
                .sum();
            let cost = packed + exceptions;
            if cost < best.0 {
                best = (cost, width);
            }
        }
        best.1
    }

    pub fn decode(data: &[u8], output: &mut Vec<u64>) -> Result<usize> {
        let (count, mut pos) = VByteEncoder::decode_u64(data)?;
        let count = count as usize;
        if count == 0 {
            return Ok(pos);
        }
        let (first, consumed) = VByteEncoder::decode_u64(&data[pos..])?;
        pos += consumed;
        let start = output.len();
        output.push(first);
        if count == 1 {
            return Ok(pos);
        }

        let width = *data.get(pos).ok_or_else(|| Error::corruption("truncated block width"))? as u32;
        pos += 1;
        if width > 64 {
            return Err(Error::corruption(format!("invalid block width {}", width)));
        }
        let (exception_count, consumed) = VByteEncoder::decode_u64(&data[pos..])?;
        pos += consumed;

        let packed_len = ((count - 1) * width as usize).div_ceil(8);
        let packed = data
            .get(pos..pos + packed_len)
            .ok_or_else(|| Error::corruption("truncated packed block"))?;
        pos += packed_len;

        let mut deltas = Vec::with_capacity(count - 1);
        let mask = low_mask(width);
        let mut acc: u128 = 0;
        let mut bits = 0u32;
        let mut bytes = packed.iter();
        for _ in 0..count - 1 {
            while bits < width {
                let byte = *bytes.next().ok_or_else(|| Error::corruption("packed block underflow"))?;
                acc |= (byte as u128) << bits;
                bits += 8;
            }
            deltas.push((acc as u64) & mask);
            acc >>= width;
            bits -= width;
        }

        for _ in 0..exception_count {
            let (index, consumed) = VByteEncoder::decode_u64(&data[pos..])?;
            pos += consumed;
            let (high, consumed) = VByteEncoder::decode_u64(&data[pos..])?;
            pos += consumed;
            let slot = deltas
                .get_mut(index as usize)
                .ok_or_else(|| Error::corruption(format!("exception index {} out of range", index)))?;
            *slot |= high << width;
        }

        let mut prev = first;
        for delta in deltas {
            prev = prev.wrapping_add(delta);
            output.push(prev);
        }
        debug_assert_eq!(output.len() - start, count);
        Ok(pos)
    }
}

#[inline]
fn bit_length(value: u64) -> u32 {
    64 - value.leading_zeros()
}

#[inline]
fn low_mask(width: u32) -> u64 {
    if width >= 64 { u64::MAX } else { (1u64 << width) - 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(data: &[u8]) -> Vec<u64> {
        let mut out = Vec::new();
        let consumed = PForBlock::decode(data, &mut out).unwrap();
        assert_eq!(consumed, data.len());
        out
    }

    #[test]
    fn dense_block_packs_tightly() {
        let values: Vec<u64> = (1000..1128).collect();
        let mut out = Vec::new();
        PForBlock::encode(&values, &mut out);
        // 127 deltas of one bit each
        assert!(out.len() < 32, "encoded size {}", out.len());
        assert_eq!(decode_all(&out), values);
    }

    #[test]
    fn outliers_become_exceptions() {
        let mut values: Vec<u64> = (0..100).map(|i| i * 4).collect();
        values.push(1 << 40);
        values.push((1 << 40) + 3);
        let mut out = Vec::new();
        PForBlock::encode(&values, &mut out);
        assert_eq!(decode_all(&out), values);
    }

    #[test]
    fn extreme_values() {
        let values = vec![0, u64::MAX / 2, u64::MAX - 1];
        let mut out = Vec::new();
        PForBlock::encode(&values, &mut out);
        assert_eq!(decode_all(&out), values);

        let single = vec![42];
        out.clear();
        PForBlock::encode(&single, &mut out);
        assert_eq!(decode_all(&out), single);
    }
}
