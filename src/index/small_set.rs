use bytes::Bytes;
use crate::compression::delta::{DeltaDecoder, DeltaEncoder};
use crate::core::constants::SMALL_POSTINGS_CONTAINER;
use crate::core::error::{Error, Result};
use crate::storage::{RecordId, Transaction, WriteTransaction};

/// Immutable count-prefixed delta blob holding a handful of encoded ids.
pub struct SmallSet;

impl SmallSet {
    /// Encodes sorted values into `scratch`; `None` when they do not fit.
    pub fn encode(values: &[u64], scratch: &mut [u8]) -> Option<usize> {
        DeltaEncoder::encode_sorted_into(values, scratch)
    }

    pub fn store(txn: &mut WriteTransaction, encoded: &[u8]) -> Result<RecordId> {
        let container = txn.create_container(SMALL_POSTINGS_CONTAINER);
        txn.allocate(container, encoded)
    }

    pub fn load(txn: &impl Transaction, record: RecordId) -> Result<Bytes> {
        let container = txn
            .container_id(SMALL_POSTINGS_CONTAINER)
            .ok_or_else(|| Error::corruption(format!("small set {} without a small postings container", record)))?;
        txn.get(container, record)
    }

    pub fn decoder(txn: &impl Transaction, record: RecordId) -> Result<DeltaDecoder> {
        DeltaDecoder::new(Self::load(txn, record)?)
    }

    pub fn values(txn: &impl Transaction, record: RecordId) -> Result<Vec<u64>> {
        DeltaEncoder::decode(&Self::load(txn, record)?)
    }

    pub fn free(txn: &mut WriteTransaction, record: RecordId) -> Result<()> {
        let container = txn.create_container(SMALL_POSTINGS_CONTAINER);
        txn.delete(container, record)
    }
}
