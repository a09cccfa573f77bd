use bytes::Bytes;
use crate::compression::vbyte::{zigzag_decode, zigzag_encode, VByteEncoder};
use crate::core::error::{Error, Result};

/// Codec for small posting sets.
///
/// Layout: `varint(count)` followed by `count` zig-zag varint deltas, the first
/// one relative to zero. Repeated values are elided before the count is written.
pub struct DeltaEncoder;

impl DeltaEncoder {
    /// Encodes the sorted `values` into `scratch`. Returns the number of bytes
    /// written, or `None` if the encoding does not fit.
    pub fn encode_sorted_into(values: &[u64], scratch: &mut [u8]) -> Option<usize> {
        debug_assert!(values.windows(2).all(|w| w[0] <= w[1]), "values must be sorted");

        let distinct = values.len() - values.windows(2).filter(|w| w[0] == w[1]).count();
        let mut pos = VByteEncoder::encode_u64_into(scratch, 0, distinct as u64)?;

        let mut prev = 0u64;
        for (i, &value) in values.iter().enumerate() {
            if i > 0 && value == prev {
                continue;
            }
            let delta = value.wrapping_sub(prev) as i64;
            pos = VByteEncoder::encode_u64_into(scratch, pos, zigzag_encode(delta))?;
            prev = value;
        }
        Some(pos)
    }

    pub fn decode(data: &[u8]) -> Result<Vec<u64>> {
        let mut decoder = DeltaDecoder::new(Bytes::copy_from_slice(data))?;
        let mut values = Vec::with_capacity(decoder.remaining());
        while let Some(value) = decoder.next_value()? {
            values.push(value);
        }
        Ok(values)
    }
}

/// Streaming decoder over an encoded small set.
#[derive(Debug, Clone)]
pub struct DeltaDecoder {
    data: Bytes,
    pos: usize,
    remaining: usize,
    prev: u64,
}

impl DeltaDecoder {
    pub fn new(data: Bytes) -> Result<Self> {
        let (count, consumed) = VByteEncoder::decode_u64(&data)?;
        if count as usize > data.len() {
            return Err(Error::corruption(format!(
                "small posting set claims {} values in {} bytes",
                count,
                data.len()
            )));
        }
        Ok(DeltaDecoder {
            data,
            pos: consumed,
            remaining: count as usize,
            prev: 0,
        })
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn next_value(&mut self) -> Result<Option<u64>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        let (raw, consumed) = VByteEncoder::decode_u64(&self.data[self.pos..])?;
        self.pos += consumed;
        self.remaining -= 1;
        self.prev = self.prev.wrapping_add(zigzag_decode(raw) as u64);
        Ok(Some(self.prev))
    }

    /// Decodes up to `buffer.len()` values.
    pub fn fill(&mut self, buffer: &mut [u64]) -> Result<usize> {
        let mut read = 0;
        while read < buffer.len() {
            match self.next_value()? {
                Some(value) => {
                    buffer[read] = value;
                    read += 1;
                }
                None => break,
            }
        }
        Ok(read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_are_elided() {
        let mut scratch = [0u8; 64];
        let len = DeltaEncoder::encode_sorted_into(&[5, 5, 9, 9, 9, 1000], &mut scratch).unwrap();
        assert_eq!(DeltaEncoder::decode(&scratch[..len]).unwrap(), vec![5, 9, 1000]);
        assert_eq!(scratch[0], 3);
    }

    #[test]
    fn overflow_is_reported_not_truncated() {
        let values: Vec<u64> = (0..100).map(|i| i * 1_000_000).collect();
        let mut scratch = [0u8; 32];
        assert!(DeltaEncoder::encode_sorted_into(&values, &mut scratch).is_none());
    }

    #[test]
    fn decoder_fills_in_chunks() {
        let values: Vec<u64> = (1..=10).map(|i| i * 3).collect();
        let mut scratch = [0u8; 64];
        let len = DeltaEncoder::encode_sorted_into(&values, &mut scratch).unwrap();
        let mut decoder = DeltaDecoder::new(Bytes::copy_from_slice(&scratch[..len])).unwrap();
        let mut buf = [0u64; 4];
        let mut out = Vec::new();
        loop {
            let read = decoder.fill(&mut buf).unwrap();
            if read == 0 {
                break;
            }
            out.extend_from_slice(&buf[..read]);
        }
        assert_eq!(out, values);
    }
}
