use crate::core::error::{Error, Result};
use crate::storage::RecordId;

/// Packing of a term frequency into the low bits of a stored entry id.
pub struct EntryIdEncodings;

impl EntryIdEncodings {
    pub const FREQUENCY_BITS: u32 = 8;
    pub const MAX_FREQUENCY: u64 = (1 << Self::FREQUENCY_BITS) - 1;
    /// Largest entry id whose encoded form still fits a tagged `i64` term id.
    pub const MAX_ENTRY_ID: u64 = (1 << 53) - 1;

    #[inline]
    pub fn encode(entry_id: u64, frequency: u32) -> u64 {
        debug_assert!(entry_id <= Self::MAX_ENTRY_ID);
        (entry_id << Self::FREQUENCY_BITS) | (frequency as u64).min(Self::MAX_FREQUENCY)
    }

    #[inline]
    pub fn decode(encoded: u64) -> (u64, u32) {
        (
            encoded >> Self::FREQUENCY_BITS,
            (encoded & Self::MAX_FREQUENCY) as u32,
        )
    }

    #[inline]
    pub fn decode_and_discard_frequency(encoded: u64) -> u64 {
        encoded >> Self::FREQUENCY_BITS
    }

    /// Strips the frequency of every value in place.
    pub fn discard_frequencies(values: &mut [u64]) {
        for value in values.iter_mut() {
            *value >>= Self::FREQUENCY_BITS;
        }
    }

}

/// Merges sorted `incoming` into sorted `existing`, keeping one value per
/// entry id. Incoming values win.
pub fn merge_by_entry(existing: &[u64], incoming: &[u64]) -> Vec<u64> {
    let entry = EntryIdEncodings::decode_and_discard_frequency;
    let mut merged: Vec<u64> = Vec::with_capacity(existing.len() + incoming.len());
    let (mut i, mut j) = (0, 0);
    while i < existing.len() || j < incoming.len() {
        let take_incoming = match (existing.get(i), incoming.get(j)) {
            (Some(a), Some(b)) => entry(*b) <= entry(*a),
            (None, Some(_)) => true,
            _ => false,
        };
        let value = if take_incoming {
            j += 1;
            incoming[j - 1]
        } else {
            i += 1;
            existing[i - 1]
        };
        match merged.last_mut() {
            Some(last) if entry(*last) == entry(value) => {
                if take_incoming {
                    *last = value;
                }
            }
            _ => merged.push(value),
        }
    }
    merged
}

/// Value of a term in a field's dictionary, tagged by its two low bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermId {
    /// One encoded entry id stored inline.
    Single(u64),
    /// Record holding a delta-encoded small set.
    Small(RecordId),
    /// Header record of a posting list.
    Set(RecordId),
}

impl TermId {
    const TAG_MASK: i64 = 0b11;
    const SMALL_TAG: i64 = 0b01;
    const SET_TAG: i64 = 0b10;

    pub fn from_raw(raw: i64) -> Result<TermId> {
        let value = (raw >> 2) as u64;
        match raw & Self::TAG_MASK {
            0 => Ok(TermId::Single(value)),
            Self::SMALL_TAG => Ok(TermId::Small(value)),
            Self::SET_TAG => Ok(TermId::Set(value)),
            _ => Err(Error::corruption(format!("invalid term id tag in {:#x}", raw))),
        }
    }

    pub fn to_raw(self) -> i64 {
        match self {
            TermId::Single(encoded) => (encoded as i64) << 2,
            TermId::Small(record) => ((record as i64) << 2) | Self::SMALL_TAG,
            TermId::Set(record) => ((record as i64) << 2) | Self::SET_TAG,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            TermId::Single(_) => "single",
            TermId::Small(_) => "small",
            TermId::Set(_) => "set",
        }
    }
}

/// Order-preserving 8-byte keys for the numeric trees.
pub struct NumericKey;

impl NumericKey {
    pub fn from_long(value: i64) -> [u8; 8] {
        ((value as u64) ^ (1 << 63)).to_be_bytes()
    }

    pub fn to_long(key: &[u8]) -> Option<i64> {
        let bytes: [u8; 8] = key.try_into().ok()?;
        Some((u64::from_be_bytes(bytes) ^ (1 << 63)) as i64)
    }

    pub fn from_double(value: f64) -> [u8; 8] {
        // -0.0 and 0.0 share a key
        let value = if value == 0.0 { 0.0 } else { value };
        let bits = value.to_bits();
        let ordered = if bits >> 63 == 1 { !bits } else { bits | (1 << 63) };
        ordered.to_be_bytes()
    }

    pub fn to_double(key: &[u8]) -> Option<f64> {
        let bytes: [u8; 8] = key.try_into().ok()?;
        let ordered = u64::from_be_bytes(bytes);
        let bits = if ordered >> 63 == 1 { ordered & !(1 << 63) } else { !ordered };
        Some(f64::from_bits(bits))
    }
}
