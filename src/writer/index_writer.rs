use std::collections::BTreeMap;
use roaring::RoaringTreemap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
use crate::core::config::IndexConfig;
use crate::core::constants::{ENTRIES_CONTAINER, FIELDS_TREE, LAST_ENTRY_ID, NUMBER_OF_ENTRIES};
use crate::core::error::{Error, ErrorKind, Result};
use crate::entry::{decode_entry_blob, encode_entry_blob, EntryReader};
use crate::index::{merge_by_entry, EntryIdEncodings, PostingList, SmallSet, TermDictionary, TermId, TermTree};
use crate::schema::IndexFieldsMapping;
use crate::storage::{ContainerId, Environment, Transaction, WriteTransaction};
use crate::writer::batch::TermBuffer;
use crate::writer::extraction::{FieldTerms, TermExtractor};
use crate::writer::suggestions::SuggestionsAccumulator;

/// What a commit did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitStats {
    pub entries_added: u64,
    pub entries_deleted: u64,
    pub terms_written: u64,
    pub terms_removed: u64,
    /// Terms that were stored (or rebuilt) as a posting list.
    pub sets_created: u64,
    pub suggestion_keys: u64,
    pub version: Option<u64>,
}

enum TxnHandle<'t> {
    Owned(WriteTransaction),
    Borrowed(&'t mut WriteTransaction),
}

impl TxnHandle<'_> {
    fn get(&mut self) -> &mut WriteTransaction {
        match self {
            TxnHandle::Owned(txn) => txn,
            TxnHandle::Borrowed(txn) => txn,
        }
    }
}

/// Turns entries into committed dictionary and posting list state.
///
/// One writer owns one write transaction: either its own (see [`IndexWriter::new`],
/// committed by [`IndexWriter::commit`]) or a caller's (see
/// [`IndexWriter::for_transaction`], which the caller commits afterwards).
/// Additions and deletions are buffered and only reach the dictionaries on commit.
pub struct IndexWriter<'t> {
    txn: TxnHandle<'t>,
    mapping: IndexFieldsMapping,
    config: IndexConfig,
    entries: ContainerId,
    extractor: TermExtractor,
    buffer: TermBuffer,
    /// Entries allocated by this writer; their terms exist only in `buffer`.
    batch_entries: RoaringTreemap,
    deletions: RoaringTreemap,
    suggestions: SuggestionsAccumulator,
    scratch: Vec<u8>,
    stats: CommitStats,
}

impl IndexWriter<'static> {
    /// Opens the environment's write transaction; fails if another writer is active.
    pub fn new(env: &Environment, mapping: IndexFieldsMapping, config: IndexConfig) -> Result<Self> {
        let txn = env.write_txn()?;
        Self::with_handle(TxnHandle::Owned(txn), mapping, config)
    }
}

impl<'t> IndexWriter<'t> {
    pub fn for_transaction(
        txn: &'t mut WriteTransaction,
        mapping: IndexFieldsMapping,
        config: IndexConfig,
    ) -> Result<Self> {
        Self::with_handle(TxnHandle::Borrowed(txn), mapping, config)
    }

    fn with_handle(mut txn: TxnHandle<'t>, mapping: IndexFieldsMapping, config: IndexConfig) -> Result<Self> {
        config.validate()?;
        let entries = txn.get().create_container(ENTRIES_CONTAINER);
        for binding in mapping.iter() {
            txn.get().tree_add(FIELDS_TREE, binding.field_name.as_bytes(), binding.field_id as i64);
        }
        Ok(IndexWriter {
            txn,
            suggestions: SuggestionsAccumulator::new(config.suggestion_ngram_min, config.suggestion_ngram_max),
            scratch: vec![0u8; config.small_posting_max_bytes],
            mapping,
            config,
            entries,
            extractor: TermExtractor::new(),
            buffer: TermBuffer::new(),
            batch_entries: RoaringTreemap::new(),
            deletions: RoaringTreemap::new(),
            stats: CommitStats::default(),
        })
    }

    pub fn mapping(&self) -> &IndexFieldsMapping {
        &self.mapping
    }

    /// Read access to the writer's transaction, including uncommitted changes.
    pub fn transaction(&mut self) -> &WriteTransaction {
        self.txn.get()
    }

    /// Stores the entry and buffers its terms. Returns the new entry id.
    pub fn index(&mut self, external_id: &[u8], payload: &[u8]) -> Result<u64> {
        let reader = EntryReader::new(payload)?;
        let fields = self.extractor.extract(&self.mapping, &reader)?;

        let txn = self.txn.get();
        check_entry_id(txn.state().next_record_id + 1)?;
        let entry_id = txn.allocate(self.entries, &encode_entry_blob(external_id, payload))?;
        self.batch_entries.insert(entry_id);
        txn.write_i64(LAST_ENTRY_ID, entry_id as i64);
        txn.increment(NUMBER_OF_ENTRIES, 1);

        for field in &fields {
            if txn.tree_get(FIELDS_TREE, field.field_name.as_bytes()).is_none() {
                txn.tree_add(FIELDS_TREE, field.field_name.as_bytes(), -1);
            }
            for (tree, term) in &field.terms {
                self.buffer.insert(&field.field_name, *tree, term, entry_id);
            }
            for term in &field.suggestions {
                self.suggestions.add(&field.field_name, term);
            }
            record_length(txn, field, entry_id, 1);
        }

        self.stats.entries_added += 1;
        trace!(entry_id, fields = fields.len(), "entry indexed");
        Ok(entry_id)
    }

    /// Queues the entry whose unique `term` in `field` resolves to a single id.
    /// Returns false when the term is not in the dictionary.
    pub fn try_delete_entry(&mut self, field: &str, term: &[u8]) -> Result<bool> {
        let tree = TermDictionary::tree_name(field, TermTree::Text);
        match TermDictionary::lookup(&*self.txn.get(), &tree, term)? {
            None => Ok(false),
            Some(TermId::Single(encoded)) => {
                self.deletions.insert(EntryIdEncodings::decode_and_discard_frequency(encoded));
                Ok(true)
            }
            Some(other) => Err(Error::new(
                ErrorKind::DataIntegrity,
                format!(
                    "term '{}' in field '{}' is not unique ({} representation)",
                    String::from_utf8_lossy(term),
                    field,
                    other.kind_name()
                ),
            )),
        }
    }

    /// Queues an entry by id. Returns false when no such entry is stored.
    pub fn delete_entry(&mut self, entry_id: u64) -> Result<bool> {
        if self.txn.get().try_get(self.entries, entry_id).is_none() {
            return Ok(false);
        }
        self.deletions.insert(entry_id);
        Ok(true)
    }

    /// Replaces the entry identified by `term` in `field` with a new payload.
    pub fn update(&mut self, field: &str, term: &[u8], external_id: &[u8], payload: &[u8]) -> Result<u64> {
        self.try_delete_entry(field, term)?;
        self.index(external_id, payload)
    }

    pub fn pending_deletions(&self) -> u64 {
        self.deletions.len()
    }

    /// Applies queued deletions, then buffered terms, then suggestion deltas.
    /// A writer that owns its transaction commits it.
    pub fn commit(mut self) -> Result<CommitStats> {
        if !self.deletions.is_empty() {
            self.delete_phase()?;
        }
        self.insert_phase()?;
        self.stats.suggestion_keys = self.suggestions.merge_into(self.txn.get()) as u64;

        let mut stats = std::mem::take(&mut self.stats);
        if let TxnHandle::Owned(txn) = self.txn {
            stats.version = Some(txn.commit()?);
        }
        info!(
            added = stats.entries_added,
            deleted = stats.entries_deleted,
            terms_written = stats.terms_written,
            terms_removed = stats.terms_removed,
            sets_created = stats.sets_created,
            "index writer committed"
        );
        Ok(stats)
    }

    fn delete_phase(&mut self) -> Result<()> {
        // field tree -> term -> entry ids (ascending, since deletions iterate in order)
        let mut removals: BTreeMap<String, BTreeMap<Vec<u8>, Vec<u64>>> = BTreeMap::new();
        let deletions = std::mem::take(&mut self.deletions);
        let dropped = self.buffer.remove_entries(|entry_id| deletions.contains(entry_id));
        if dropped > 0 {
            trace!(dropped, "buffered postings of deleted entries dropped");
        }

        for entry_id in deletions.iter() {
            let in_batch = self.batch_entries.contains(entry_id);
            let txn = self.txn.get();
            let blob = txn.get(self.entries, entry_id)?;
            let (_, payload) = decode_entry_blob(&blob)?;
            let reader = EntryReader::new(payload)?;
            let fields = self.extractor.extract(&self.mapping, &reader)?;

            for field in &fields {
                // entries of this batch only ever reached the buffer
                if !in_batch {
                    for (tree, term) in &field.terms {
                        let postings = removals
                            .entry(TermDictionary::tree_name(&field.field_name, *tree))
                            .or_default()
                            .entry(term.clone())
                            .or_default();
                        if postings.last() != Some(&entry_id) {
                            postings.push(entry_id);
                        }
                    }
                }
                for term in &field.suggestions {
                    self.suggestions.remove(&field.field_name, term);
                }
                record_length(txn, field, entry_id, -1);
            }

            txn.delete(self.entries, entry_id)?;
            let remaining = txn.increment(NUMBER_OF_ENTRIES, -1);
            debug_assert!(remaining >= 0, "entry counter went negative");
            self.stats.entries_deleted += 1;
        }

        for (tree, terms) in removals {
            for (term, entry_ids) in terms {
                self.remove_from_term(&tree, &term, &entry_ids)?;
            }
        }
        debug!(deleted = self.stats.entries_deleted, "deletion phase done");
        Ok(())
    }

    fn remove_from_term(&mut self, tree: &str, term: &[u8], entry_ids: &[u64]) -> Result<()> {
        let txn = self.txn.get();
        let Some(term_id) = TermDictionary::lookup(&*txn, tree, term)? else {
            warn!(tree, term = %String::from_utf8_lossy(term), "deleted entry references a missing term");
            return Ok(());
        };

        let remaining = match term_id {
            TermId::Single(encoded) => {
                let entry = EntryIdEncodings::decode_and_discard_frequency(encoded);
                if entry_ids.binary_search(&entry).is_ok() { Vec::new() } else { return Ok(()) }
            }
            TermId::Small(record) => {
                let mut values = SmallSet::values(&*txn, record)?;
                values.retain(|v| entry_ids.binary_search(&EntryIdEncodings::decode_and_discard_frequency(*v)).is_err());
                SmallSet::free(txn, record)?;
                values
            }
            TermId::Set(record) => {
                let mut list = PostingList::open(&*txn, record)?;
                list.remove_many(txn, entry_ids)?;
                if list.number_of_entries() > self.config.set_shrink_threshold {
                    return Ok(());
                }
                let values = list.values(&*txn)?;
                list.delete(txn)?;
                values
            }
        };

        if remaining.is_empty() {
            txn.tree_remove(tree, term);
            self.stats.terms_removed += 1;
            Ok(())
        } else {
            self.add_new_term(tree, term, &remaining).map(|_| ())
        }
    }

    fn insert_phase(&mut self) -> Result<()> {
        for (field, tree_kind, terms) in self.buffer.drain_sorted() {
            let tree = TermDictionary::tree_name(&field, tree_kind);
            for (term, values) in terms {
                self.insert_term(&tree, &term, &values)?;
            }
        }
        Ok(())
    }

    fn insert_term(&mut self, tree: &str, term: &[u8], values: &[u64]) -> Result<()> {
        let txn = self.txn.get();
        let merged = match TermDictionary::lookup(&*txn, tree, term)? {
            None => values.to_vec(),
            Some(TermId::Set(record)) => {
                let mut list = PostingList::open(&*txn, record)?;
                list.add(txn, values)?;
                self.stats.terms_written += 1;
                return Ok(());
            }
            Some(TermId::Small(record)) => {
                let existing = SmallSet::values(&*txn, record)?;
                SmallSet::free(txn, record)?;
                merge_by_entry(&existing, values)
            }
            Some(TermId::Single(encoded)) => merge_by_entry(&[encoded], values),
        };
        self.add_new_term(tree, term, &merged)?;
        Ok(())
    }

    /// Stores `values` (sorted, one per entry id) under `term`, picking the
    /// representation: one value inline, a small set when it fits the scratch
    /// buffer, a posting list otherwise.
    pub fn add_new_term(&mut self, tree: &str, term: &[u8], values: &[u64]) -> Result<TermId> {
        debug_assert!(!values.is_empty());
        debug_assert!(
            values.windows(2).all(|w| EntryIdEncodings::decode_and_discard_frequency(w[0])
                < EntryIdEncodings::decode_and_discard_frequency(w[1])),
            "postings must be strictly increasing by entry id"
        );

        let txn = self.txn.get();
        let term_id = if values.len() == 1 {
            TermId::Single(values[0])
        } else if let Some(len) = SmallSet::encode(values, &mut self.scratch) {
            TermId::Small(SmallSet::store(txn, &self.scratch[..len])?)
        } else {
            let mut list = PostingList::create(txn, self.config.posting_block_size)?;
            list.add(txn, values)?;
            self.stats.sets_created += 1;
            trace!(tree, entries = values.len(), "term promoted to posting list");
            TermId::Set(list.id())
        };

        txn.tree_add(tree, term, term_id.to_raw());
        self.stats.terms_written += 1;
        Ok(term_id)
    }
}

fn check_entry_id(entry_id: u64) -> Result<()> {
    if entry_id > EntryIdEncodings::MAX_ENTRY_ID {
        return Err(Error::new(
            ErrorKind::InvalidState,
            format!("entry id {} exceeds the addressable range", entry_id),
        ));
    }
    Ok(())
}

/// Adds (`sign` = 1) or retracts (`sign` = -1) an entry's length statistics.
fn record_length(txn: &mut WriteTransaction, field: &FieldTerms, entry_id: u64, sign: i64) {
    if field.length == 0 {
        return;
    }
    let lengths = TermDictionary::lengths_tree(&field.field_name);
    if sign > 0 {
        txn.tree_add(&lengths, &entry_id.to_be_bytes(), field.length as i64);
    } else {
        txn.tree_remove(&lengths, &entry_id.to_be_bytes());
    }
    txn.increment(&TermDictionary::total_length_key(&field.field_name), sign * field.length as i64);
    txn.increment(&TermDictionary::entries_with_field_key(&field.field_name), sign);
}
