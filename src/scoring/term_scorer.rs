use std::sync::Arc;
use crate::core::config::IndexConfig;
use crate::core::constants::NUMBER_OF_ENTRIES;
use crate::index::TermDictionary;
use crate::scoring::scorer::{BM25Scorer, Boosting, ConstantScorer, DocStats, Scorer, TermFrequencyScorer};
use crate::storage::transaction::TreeMap;
use crate::storage::Transaction;

/// Length statistics of one field, read from a snapshot.
#[derive(Debug, Clone)]
pub struct FieldLengths {
    lengths: Arc<TreeMap>,
    average: f32,
}

impl FieldLengths {
    pub fn load(txn: &impl Transaction, field: &str) -> FieldLengths {
        let total = txn.read_i64(&TermDictionary::total_length_key(field)).unwrap_or(0);
        let entries = txn.read_i64(&TermDictionary::entries_with_field_key(field)).unwrap_or(0);
        FieldLengths {
            lengths: txn.tree(&TermDictionary::lengths_tree(field)).unwrap_or_default(),
            average: if entries > 0 { total as f32 / entries as f32 } else { 0.0 },
        }
    }

    pub fn average(&self) -> f32 {
        self.average
    }

    pub fn length_of(&self, entry_id: u64) -> Option<u32> {
        self.lengths.get(&entry_id.to_be_bytes()[..]).map(|len| *len as u32)
    }

    pub fn doc_stats(&self, entry_id: u64) -> DocStats {
        DocStats {
            doc_length: self.length_of(entry_id).map_or(self.average, |len| len as f32),
            avg_doc_length: self.average,
        }
    }
}

/// Scoring strategy bound to one term of one field.
pub struct TermScorer {
    scorer: Box<dyn Scorer>,
    lengths: Option<FieldLengths>,
}

impl TermScorer {
    pub fn new(
        txn: &impl Transaction,
        field: &str,
        boosting: Boosting,
        term_cardinality: u64,
        config: &IndexConfig,
    ) -> TermScorer {
        let scorer: Box<dyn Scorer> = match boosting {
            Boosting::Constant(value) => Box::new(ConstantScorer { value }),
            Boosting::TermFrequency => Box::new(TermFrequencyScorer { term_cardinality }),
            Boosting::Bm25 => {
                let total = txn.read_i64(NUMBER_OF_ENTRIES).unwrap_or(0).max(0) as u64;
                Box::new(BM25Scorer::new(config.bm25_k1, config.bm25_b, total, term_cardinality))
            }
        };
        let lengths = scorer.requires_lengths().then(|| FieldLengths::load(txn, field));
        TermScorer { scorer, lengths }
    }

    pub fn name(&self) -> &str {
        self.scorer.name()
    }

    pub fn score(&self, entry_id: u64, frequency: u32) -> f32 {
        let stats = match &self.lengths {
            Some(lengths) => lengths.doc_stats(entry_id),
            None => DocStats::unknown(),
        };
        self.scorer.score(frequency, &stats)
    }
}
