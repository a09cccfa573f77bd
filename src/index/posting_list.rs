use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::trace;
use crate::compression::bitpack::PForBlock;
use crate::core::constants::POSTING_LISTS_CONTAINER;
use crate::core::error::{Error, Result};
use crate::index::posting::{merge_by_entry, EntryIdEncodings};
use crate::storage::transaction::RecordMap;
use crate::storage::{ContainerId, RecordId, Transaction, WriteTransaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct BlockRef {
    first: u64,
    last: u64,
    count: u32,
    record: RecordId,
}

impl BlockRef {
    #[inline]
    fn first_entry(&self) -> u64 {
        EntryIdEncodings::decode_and_discard_frequency(self.first)
    }

    #[inline]
    fn last_entry(&self) -> u64 {
        EntryIdEncodings::decode_and_discard_frequency(self.last)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PostingListHeader {
    number_of_entries: u64,
    block_size: u32,
    blocks: Vec<BlockRef>,
}

/// Persistent sorted set of encoded entry ids, stored as a header record plus
/// PFor-compressed blocks in the posting lists container.
///
/// Values are ordered by entry id; a given entry id appears at most once, with
/// the most recently added frequency.
#[derive(Debug, Clone)]
pub struct PostingList {
    id: RecordId,
    container: ContainerId,
    header: PostingListHeader,
}

impl PostingList {
    /// Allocates an empty posting list and returns its id.
    pub fn create(txn: &mut WriteTransaction, block_size: usize) -> Result<PostingList> {
        let container = txn.create_container(POSTING_LISTS_CONTAINER);
        let header = PostingListHeader {
            number_of_entries: 0,
            block_size: block_size as u32,
            blocks: Vec::new(),
        };
        let id = txn.allocate(container, &bincode::serialize(&header)?)?;
        trace!(posting_list = id, "posting list created");
        Ok(PostingList { id, container, header })
    }

    pub fn open(txn: &impl Transaction, id: RecordId) -> Result<PostingList> {
        let container = txn
            .container_id(POSTING_LISTS_CONTAINER)
            .ok_or_else(|| Error::corruption(format!("posting list {} without a posting lists container", id)))?;
        let header: PostingListHeader = bincode::deserialize(&txn.get(container, id)?)
            .map_err(|e| Error::corruption(format!("invalid posting list header {}: {}", id, e)))?;
        Ok(PostingList { id, container, header })
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Exact number of stored values.
    pub fn number_of_entries(&self) -> u64 {
        self.header.number_of_entries
    }

    pub fn block_count(&self) -> usize {
        self.header.blocks.len()
    }

    /// Adds sorted encoded values. Entry ids already present keep a single
    /// slot and take the new frequency.
    pub fn add(&mut self, txn: &mut WriteTransaction, values: &[u64]) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        debug_assert!(values.windows(2).all(|w| w[0] <= w[1]), "values must be sorted");

        let block_size = (self.header.block_size as usize).max(1);
        if self.header.blocks.is_empty() {
            let merged = merge_by_entry(&[], values);
            let mut blocks = Vec::new();
            for chunk in merged.chunks(block_size) {
                blocks.push(self.write_block(txn, None, chunk)?);
            }
            self.header.number_of_entries = merged.len() as u64;
            self.header.blocks = blocks;
            return self.save(txn);
        }

        let mut new_blocks = Vec::with_capacity(self.header.blocks.len());
        let old_blocks = std::mem::take(&mut self.header.blocks);
        let mut rest = values;
        let mut decoded = Vec::with_capacity(block_size);
        for (i, block) in old_blocks.iter().enumerate() {
            // block i owns entry ids below the first entry id of block i + 1
            let upper = old_blocks.get(i + 1).map(|next| next.first_entry());
            let take = match upper {
                Some(upper) => rest.partition_point(|v| EntryIdEncodings::decode_and_discard_frequency(*v) < upper),
                None => rest.len(),
            };
            let (mine, tail) = rest.split_at(take);
            rest = tail;
            if mine.is_empty() {
                new_blocks.push(*block);
                continue;
            }

            decoded.clear();
            PForBlock::decode(&txn.get(self.container, block.record)?, &mut decoded)?;
            let merged = merge_by_entry(&decoded, mine);
            self.header.number_of_entries += merged.len() as u64;
            self.header.number_of_entries -= block.count as u64;

            let mut chunks = merged.chunks(block_size);
            if let Some(chunk) = chunks.next() {
                new_blocks.push(self.write_block(txn, Some(block.record), chunk)?);
            }
            for chunk in chunks {
                new_blocks.push(self.write_block(txn, None, chunk)?);
            }
        }
        debug_assert!(rest.is_empty());
        self.header.blocks = new_blocks;
        self.save(txn)
    }

    pub fn remove(&mut self, txn: &mut WriteTransaction, entry_id: u64) -> Result<bool> {
        Ok(self.remove_many(txn, &[entry_id])? == 1)
    }

    /// Removes the given sorted entry ids, whatever frequency they were stored
    /// with. Returns how many were present.
    pub fn remove_many(&mut self, txn: &mut WriteTransaction, entry_ids: &[u64]) -> Result<usize> {
        debug_assert!(entry_ids.windows(2).all(|w| w[0] <= w[1]), "entry ids must be sorted");
        let mut removed = 0;
        let old_blocks = std::mem::take(&mut self.header.blocks);
        let mut new_blocks = Vec::with_capacity(old_blocks.len());
        let mut rest = entry_ids;
        let mut decoded = Vec::new();

        for block in old_blocks {
            let skip = rest.partition_point(|id| *id < block.first_entry());
            rest = &rest[skip..];
            let take = rest.partition_point(|id| *id <= block.last_entry());
            let (mine, tail) = rest.split_at(take);
            rest = tail;
            if mine.is_empty() {
                new_blocks.push(block);
                continue;
            }

            decoded.clear();
            PForBlock::decode(&txn.get(self.container, block.record)?, &mut decoded)?;
            let before = decoded.len();
            decoded.retain(|v| mine.binary_search(&EntryIdEncodings::decode_and_discard_frequency(*v)).is_err());
            let gone = before - decoded.len();
            if gone == 0 {
                new_blocks.push(block);
                continue;
            }
            removed += gone;
            if decoded.is_empty() {
                txn.delete(self.container, block.record)?;
            } else {
                new_blocks.push(self.write_block(txn, Some(block.record), &decoded)?);
            }
        }

        self.header.blocks = new_blocks;
        if removed > 0 {
            self.header.number_of_entries -= removed as u64;
            self.save(txn)?;
        }
        Ok(removed)
    }

    /// All encoded values, in order.
    pub fn values(&self, txn: &impl Transaction) -> Result<Vec<u64>> {
        let mut values = Vec::with_capacity(self.header.number_of_entries as usize);
        for block in &self.header.blocks {
            PForBlock::decode(&txn.get(self.container, block.record)?, &mut values)?;
        }
        Ok(values)
    }

    /// Frees the header and every block.
    pub fn delete(self, txn: &mut WriteTransaction) -> Result<()> {
        for block in &self.header.blocks {
            txn.delete(self.container, block.record)?;
        }
        txn.delete(self.container, self.id)?;
        trace!(posting_list = self.id, "posting list removed");
        Ok(())
    }

    pub fn iter(&self, txn: &impl Transaction) -> Result<PostingListIterator> {
        let records = txn
            .container_records(self.container)
            .ok_or_else(|| Error::corruption("posting lists container disappeared"))?;
        Ok(PostingListIterator {
            blocks: Arc::new(self.header.blocks.clone()),
            records,
            next_block: 0,
            buffer: Vec::new(),
            pos: 0,
            exhausted: false,
        })
    }

    fn write_block(&self, txn: &mut WriteTransaction, record: Option<RecordId>, values: &[u64]) -> Result<BlockRef> {
        let mut encoded = Vec::with_capacity(values.len() * 2 + 16);
        PForBlock::encode(values, &mut encoded);
        let record = match record {
            Some(record) => {
                txn.update(self.container, record, &encoded)?;
                record
            }
            None => txn.allocate(self.container, &encoded)?,
        };
        Ok(BlockRef {
            first: values[0],
            last: values[values.len() - 1],
            count: values.len() as u32,
            record,
        })
    }

    fn save(&self, txn: &mut WriteTransaction) -> Result<()> {
        txn.update(self.container, self.id, &bincode::serialize(&self.header)?)
    }
}

/// Forward iterator over a posting list snapshot. Yields encoded values.
#[derive(Debug, Clone)]
pub struct PostingListIterator {
    blocks: Arc<Vec<BlockRef>>,
    records: Arc<RecordMap>,
    next_block: usize,
    buffer: Vec<u64>,
    pos: usize,
    exhausted: bool,
}

impl PostingListIterator {
    fn load_block(&mut self, index: usize) -> Result<()> {
        let block = self.blocks[index];
        let data = self
            .records
            .get(&block.record)
            .ok_or_else(|| Error::corruption(format!("posting block {} is missing", block.record)))?;
        self.buffer.clear();
        PForBlock::decode(data, &mut self.buffer)?;
        self.pos = 0;
        self.next_block = index + 1;
        Ok(())
    }

    pub fn next_value(&mut self) -> Result<Option<u64>> {
        while self.pos >= self.buffer.len() {
            if self.exhausted || self.next_block >= self.blocks.len() {
                self.exhausted = true;
                return Ok(None);
            }
            self.load_block(self.next_block)?;
        }
        self.pos += 1;
        Ok(Some(self.buffer[self.pos - 1]))
    }

    /// Moves forward so that the next value has an entry id `>= entry_id`.
    /// Never moves backwards.
    pub fn seek(&mut self, entry_id: u64) -> Result<()> {
        if self.exhausted {
            return Ok(());
        }
        let current_covers = self.pos < self.buffer.len()
            && EntryIdEncodings::decode_and_discard_frequency(self.buffer[self.buffer.len() - 1]) >= entry_id;
        if !current_covers {
            let offset = self.blocks[self.next_block..].partition_point(|b| b.last_entry() < entry_id);
            let index = self.next_block + offset;
            if index >= self.blocks.len() {
                self.buffer.clear();
                self.pos = 0;
                self.exhausted = true;
                return Ok(());
            }
            self.load_block(index)?;
        }
        let offset = self.buffer[self.pos..]
            .partition_point(|v| EntryIdEncodings::decode_and_discard_frequency(*v) < entry_id);
        self.pos += offset;
        Ok(())
    }

    /// Copies up to `buffer.len()` encoded values into `buffer`.
    ///
    /// With `prune_greater_than`, blocks whose first entry id is above the
    /// bound are never decoded and the iterator ends there.
    pub fn fill(&mut self, buffer: &mut [u64], prune_greater_than: Option<u64>) -> Result<usize> {
        let mut read = 0;
        while read < buffer.len() {
            if self.pos >= self.buffer.len() {
                if self.exhausted || self.next_block >= self.blocks.len() {
                    self.exhausted = true;
                    break;
                }
                if let Some(bound) = prune_greater_than {
                    if self.blocks[self.next_block].first_entry() > bound {
                        self.exhausted = true;
                        break;
                    }
                }
                self.load_block(self.next_block)?;
            }
            let n = (self.buffer.len() - self.pos).min(buffer.len() - read);
            buffer[read..read + n].copy_from_slice(&self.buffer[self.pos..self.pos + n]);
            self.pos += n;
            read += n;
        }
        Ok(read)
    }

    /// Frequency stored for `entry_id`, if present. Does not move the iterator.
    pub fn frequency_of(&self, entry_id: u64) -> Result<Option<u32>> {
        let index = self.blocks.partition_point(|b| b.last_entry() < entry_id);
        let Some(block) = self.blocks.get(index) else {
            return Ok(None);
        };
        if block.first_entry() > entry_id {
            return Ok(None);
        }
        let data = self
            .records
            .get(&block.record)
            .ok_or_else(|| Error::corruption(format!("posting block {} is missing", block.record)))?;
        let mut values = Vec::with_capacity(block.count as usize);
        PForBlock::decode(data, &mut values)?;
        Ok(values
            .iter()
            .find(|v| EntryIdEncodings::decode_and_discard_frequency(**v) == entry_id)
            .map(|v| EntryIdEncodings::decode(*v).1))
    }
}
