use std::sync::Arc;
use crate::core::constants::ENTRIES_CONTAINER;
use crate::core::error::{Error, ErrorKind, Result};
use crate::entry::{decode_entry_blob, EntryReader};
use crate::storage::transaction::RecordMap;
use crate::storage::Transaction;

/// Snapshot of the entries container, resolving entry ids back to their data.
#[derive(Debug, Clone, Default)]
pub struct EntryStore {
    records: Arc<RecordMap>,
}

impl EntryStore {
    pub fn open(txn: &impl Transaction) -> Self {
        let records = txn
            .container_id(ENTRIES_CONTAINER)
            .and_then(|container| txn.container_records(container))
            .unwrap_or_default();
        EntryStore { records }
    }

    pub fn contains(&self, entry_id: u64) -> bool {
        self.records.contains_key(&entry_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Live entry ids, ascending, strictly after `after` when given.
    pub fn ids_after(&self, after: Option<u64>) -> impl Iterator<Item = u64> + '_ {
        let start = after.map_or(0, |id| id.saturating_add(1));
        self.records.range(start..).map(|(id, _)| *id)
    }

    pub fn reader(&self, entry_id: u64) -> Result<EntryReader> {
        let (_, payload) = decode_entry_blob(self.blob(entry_id)?)?;
        EntryReader::new(payload)
    }

    pub fn identity(&self, entry_id: u64) -> Result<Vec<u8>> {
        let (identity, _) = decode_entry_blob(self.blob(entry_id)?)?;
        Ok(identity.to_vec())
    }

    fn blob(&self, entry_id: u64) -> Result<&[u8]> {
        self.records
            .get(&entry_id)
            .map(|blob| blob.as_ref())
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("entry {} does not exist", entry_id)))
    }
}
