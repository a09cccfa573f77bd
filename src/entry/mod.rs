pub mod reader;
pub mod spatial;
pub mod store;
pub mod writer;

pub use reader::{EntryReader, FieldItem, FieldReader, IndexEntryFieldType};
pub use store::EntryStore;
pub use writer::{EntryBuilder, StoredValue};

use crate::compression::vbyte::VByteEncoder;
use crate::core::error::{Error, Result};

/// Layout of a record in the entries container:
/// varint(external id length), external id, payload.
pub fn encode_entry_blob(external_id: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(VByteEncoder::MAX_LEN + external_id.len() + payload.len());
    VByteEncoder::encode_u64(&mut blob, external_id.len() as u64);
    blob.extend_from_slice(external_id);
    blob.extend_from_slice(payload);
    blob
}

/// Splits an entries-container record into (external id, payload).
pub fn decode_entry_blob(blob: &[u8]) -> Result<(&[u8], &[u8])> {
    let (len, read) = VByteEncoder::decode_u64(blob)?;
    let end = read
        .checked_add(len as usize)
        .filter(|end| *end <= blob.len())
        .ok_or_else(|| Error::corruption(format!("entry blob truncated: id length {} of {} bytes", len, blob.len())))?;
    Ok((&blob[read..end], &blob[end..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_splits_identity_and_payload() {
        let blob = encode_entry_blob(b"list/500", &[1, 2, 3]);
        let (id, payload) = decode_entry_blob(&blob).unwrap();
        assert_eq!(id, b"list/500");
        assert_eq!(payload, &[1, 2, 3]);
        assert!(decode_entry_blob(&blob[..4]).is_err());
    }
}
