use std::ops::Bound;
use tracing::debug;
use crate::core::config::IndexConfig;
use crate::core::constants::{EMPTY_VALUE, LAST_ENTRY_ID, NULL_VALUE, NUMBER_OF_ENTRIES};
use crate::core::error::Result;
use crate::core::stats::{FieldStats, IndexStats};
use crate::entry::{EntryReader, EntryStore};
use crate::index::{TermDictionary, TermId, TermTree};
use crate::query::{
    AllEntriesMatch, BinaryMatch, FieldRef, InTermProvider, MultiTermMatch, OrderBy, QueryMatch, SortDirection,
    SortKind, SortingMatch, TermFilter, TermMatch, TermProvider, TreeTermProvider, UnaryMatch, UnaryOperation,
    UnaryValue,
};
use crate::schema::IndexFieldsMapping;
use crate::scoring::{Boosting, TermScorer};
use crate::search::suggest::{self, Suggestion};
use crate::storage::{Environment, ReadTransaction, Transaction};

/// Read side of an index: builds query matches over one snapshot and
/// resolves the entry ids they produce.
pub struct IndexSearcher {
    txn: ReadTransaction,
    mapping: IndexFieldsMapping,
    config: IndexConfig,
    store: EntryStore,
}

impl IndexSearcher {
    /// Opens a searcher on the latest committed state of `env`.
    pub fn new(env: &Environment, mapping: IndexFieldsMapping, config: IndexConfig) -> Self {
        Self::from_transaction(env.read_txn(), mapping, config)
    }

    pub fn from_transaction(txn: ReadTransaction, mapping: IndexFieldsMapping, config: IndexConfig) -> Self {
        let store = EntryStore::open(&txn);
        debug!(version = txn.state().version(), entries = store.len(), "index searcher opened");
        IndexSearcher { txn, mapping, config, store }
    }

    pub fn transaction(&self) -> &ReadTransaction {
        &self.txn
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    fn term_match(&self, tree: &str, term: &[u8]) -> Result<TermMatch> {
        let term = TermDictionary::lookup(&self.txn, tree, term)?;
        Ok(TermMatch::open(&self.txn, term)?.with_simd(self.config.simd))
    }

    /// Entries holding exactly `term` in `field`. The term is not analyzed.
    pub fn term_query(&self, field: &str, term: impl AsRef<[u8]>) -> Result<TermMatch> {
        self.term_match(field, term.as_ref())
    }

    pub fn boosted_term_query(&self, field: &str, term: impl AsRef<[u8]>, boosting: Boosting) -> Result<TermMatch> {
        let Some(id) = TermDictionary::lookup(&self.txn, field, term.as_ref())? else {
            return Ok(TermMatch::empty());
        };
        let cardinality = TermDictionary::cardinality(&self.txn, id)?;
        let scorer = TermScorer::new(&self.txn, field, boosting, cardinality, &self.config);
        Ok(TermMatch::open(&self.txn, Some(id))?
            .with_simd(self.config.simd)
            .with_scorer(scorer))
    }

    /// Entries whose `field` was written as null.
    pub fn null_query(&self, field: &str) -> Result<TermMatch> {
        self.term_match(field, NULL_VALUE)
    }

    /// Entries whose `field` was written as an empty value.
    pub fn empty_query(&self, field: &str) -> Result<TermMatch> {
        self.term_match(field, EMPTY_VALUE)
    }

    pub fn in_query(&self, field: &str, terms: Vec<Vec<u8>>) -> Result<MultiTermMatch<InTermProvider>> {
        let provider = InTermProvider::new(&self.txn, field, terms)?;
        self.multi_term(provider, field, None)
    }

    /// OR over every term of `field`'s `tree` accepted by `filter`.
    pub fn multi_term_query(
        &self,
        field: &str,
        tree: TermTree,
        filter: TermFilter,
        boosting: Option<Boosting>,
    ) -> Result<MultiTermMatch<TreeTermProvider>> {
        let provider = TreeTermProvider::new(&self.txn, &TermDictionary::tree_name(field, tree), filter);
        self.multi_term(provider, field, boosting)
    }

    fn multi_term<P: TermProvider>(
        &self,
        provider: P,
        field: &str,
        boosting: Option<Boosting>,
    ) -> Result<MultiTermMatch<P>> {
        MultiTermMatch::new(self.txn.clone(), provider, field, boosting, self.config.clone())
    }

    pub fn starts_with_query(&self, field: &str, prefix: impl AsRef<[u8]>) -> Result<MultiTermMatch<TreeTermProvider>> {
        self.multi_term_query(field, TermTree::Text, TermFilter::StartsWith(prefix.as_ref().to_vec()), None)
    }

    pub fn ends_with_query(&self, field: &str, suffix: impl AsRef<[u8]>) -> Result<MultiTermMatch<TreeTermProvider>> {
        self.multi_term_query(field, TermTree::Text, TermFilter::EndsWith(suffix.as_ref().to_vec()), None)
    }

    pub fn contains_query(&self, field: &str, needle: impl AsRef<[u8]>) -> Result<MultiTermMatch<TreeTermProvider>> {
        self.multi_term_query(field, TermTree::Text, TermFilter::Contains(needle.as_ref().to_vec()), None)
    }

    /// Entries with any non-null value in `field`.
    pub fn exists_query(&self, field: &str) -> Result<MultiTermMatch<TreeTermProvider>> {
        self.multi_term_query(field, TermTree::Text, TermFilter::Exists, None)
    }

    pub fn term_range_query(
        &self,
        field: &str,
        low: Bound<&[u8]>,
        high: Bound<&[u8]>,
    ) -> Result<MultiTermMatch<TreeTermProvider>> {
        self.multi_term_query(field, TermTree::Text, TermFilter::range(low, high), None)
    }

    pub fn regex_query(&self, field: &str, pattern: &str) -> Result<MultiTermMatch<TreeTermProvider>> {
        self.multi_term_query(field, TermTree::Text, TermFilter::regex(pattern)?, None)
    }

    pub fn fuzzy_query(
        &self,
        field: &str,
        term: &str,
        max_edits: u8,
        prefix_length: usize,
    ) -> Result<MultiTermMatch<TreeTermProvider>> {
        self.multi_term_query(field, TermTree::Text, TermFilter::fuzzy(term, max_edits, prefix_length)?, None)
    }

    /// Entries with a numeric value of `field` in `[low, high]`, served by the long tree.
    pub fn between_long(&self, field: &str, low: i64, high: i64) -> Result<MultiTermMatch<TreeTermProvider>> {
        self.multi_term_query(field, TermTree::Long, TermFilter::long_range(low, high), None)
    }

    pub fn between_double(&self, field: &str, low: f64, high: f64) -> Result<MultiTermMatch<TreeTermProvider>> {
        self.multi_term_query(field, TermTree::Double, TermFilter::double_range(low, high)?, None)
    }

    pub fn all_entries(&self) -> AllEntriesMatch {
        AllEntriesMatch::new(self.store.clone())
    }

    pub fn and<L: QueryMatch, R: QueryMatch>(&self, left: L, right: R) -> BinaryMatch<L, R> {
        BinaryMatch::and(left, right).with_batch_size(self.config.fill_batch_size)
    }

    pub fn or<L: QueryMatch, R: QueryMatch>(&self, left: L, right: R) -> BinaryMatch<L, R> {
        BinaryMatch::or(left, right).with_batch_size(self.config.fill_batch_size)
    }

    pub fn and_not<L: QueryMatch, R: QueryMatch>(&self, left: L, right: R) -> BinaryMatch<L, R> {
        BinaryMatch::and_not(left, right).with_batch_size(self.config.fill_batch_size)
    }

    /// Declared fields are read by id; anything else as a dynamic field.
    pub fn field_ref(&self, field: &str) -> FieldRef {
        match self.mapping.get_by_name(field) {
            Some(binding) => FieldRef::Known(binding.field_id),
            None => FieldRef::Dynamic(field.to_string()),
        }
    }

    /// Keeps the entries of `inner` whose stored `field` satisfies `operation` against `value`.
    pub fn unary<M: QueryMatch>(
        &self,
        inner: M,
        field: &str,
        operation: UnaryOperation,
        value: UnaryValue,
    ) -> Result<UnaryMatch<M>> {
        UnaryMatch::new(inner, self.store.clone(), self.field_ref(field), operation, value)
    }

    pub fn between<M: QueryMatch>(&self, inner: M, field: &str, low: UnaryValue, high: UnaryValue) -> Result<UnaryMatch<M>> {
        UnaryMatch::between(inner, self.store.clone(), self.field_ref(field), low, high, false)
    }

    pub fn not_between<M: QueryMatch>(
        &self,
        inner: M,
        field: &str,
        low: UnaryValue,
        high: UnaryValue,
    ) -> Result<UnaryMatch<M>> {
        UnaryMatch::between(inner, self.store.clone(), self.field_ref(field), low, high, true)
    }

    pub fn order_by_score<M: QueryMatch>(&self, inner: M, take: Option<usize>) -> SortingMatch<M> {
        SortingMatch::order_by_score(inner, self.store.clone(), take, self.config.fill_batch_size)
    }

    pub fn order_by<M: QueryMatch>(
        &self,
        inner: M,
        field: &str,
        direction: SortDirection,
        kind: SortKind,
        take: Option<usize>,
    ) -> SortingMatch<M> {
        let order = OrderBy::Field { field: self.field_ref(field), direction, kind };
        SortingMatch::new(inner, self.store.clone(), order, take, self.config.fill_batch_size)
    }

    pub fn get_reader_for(&self, entry_id: u64) -> Result<EntryReader> {
        self.store.reader(entry_id)
    }

    /// External id the entry was indexed under.
    pub fn get_identity(&self, entry_id: u64) -> Result<Vec<u8>> {
        self.store.identity(entry_id)
    }

    pub fn number_of_entries(&self) -> u64 {
        self.txn.read_i64(NUMBER_OF_ENTRIES).unwrap_or(0).max(0) as u64
    }

    /// Exact number of entries holding `term` in `field`.
    pub fn term_count(&self, field: &str, term: impl AsRef<[u8]>) -> Result<u64> {
        match TermDictionary::lookup(&self.txn, field, term.as_ref())? {
            Some(id) => TermDictionary::cardinality(&self.txn, id),
            None => Ok(0),
        }
    }

    pub fn stats(&self) -> Result<IndexStats> {
        let mut posting_lists = 0;
        let mut fields = Vec::new();
        for name in TermDictionary::registered_fields(&self.txn) {
            for tree in [TermTree::Text, TermTree::Long, TermTree::Double] {
                for (_, raw) in self.txn.tree_cursor(&TermDictionary::tree_name(&name, tree)) {
                    if matches!(TermId::from_raw(raw)?, TermId::Set(_)) {
                        posting_lists += 1;
                    }
                }
            }
            let scalar = |key: String| self.txn.read_i64(&key).unwrap_or(0).max(0) as u64;
            fields.push(FieldStats {
                terms: self.txn.tree_len(&name),
                long_terms: self.txn.tree_len(&TermDictionary::tree_name(&name, TermTree::Long)),
                double_terms: self.txn.tree_len(&TermDictionary::tree_name(&name, TermTree::Double)),
                total_length: scalar(TermDictionary::total_length_key(&name)),
                entries_with_field: scalar(TermDictionary::entries_with_field_key(&name)),
                suggestion_keys: self.txn.tree_len(&TermDictionary::suggestions_tree(&name)),
                name,
            });
        }
        Ok(IndexStats {
            number_of_entries: self.number_of_entries(),
            last_entry_id: self.txn.read_i64(LAST_ENTRY_ID).unwrap_or(0).max(0) as u64,
            posting_lists,
            fields,
        })
    }

    /// Terms of `field` within `max_edits` of `word`, closest and most frequent first.
    pub fn suggest(&self, field: &str, word: &str, max_edits: u8, take: usize) -> Result<Vec<Suggestion>> {
        suggest::suggest(&self.txn, field, word, max_edits, take)
    }
}
