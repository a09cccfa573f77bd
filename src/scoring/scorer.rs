use serde::{Deserialize, Serialize};

/// How a term match contributes to an entry's relevance score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Boosting {
    /// Every match scores the same value.
    Constant(f32),
    /// Frequency of the term in the entry divided by the number of entries
    /// holding the term.
    TermFrequency,
    Bm25,
}

/// Per-entry statistics for scoring
#[derive(Debug, Clone, Copy)]
pub struct DocStats {
    pub doc_length: f32,      // Terms the entry has in the scored field
    pub avg_doc_length: f32,  // Average over entries that have the field
}

impl DocStats {
    pub fn unknown() -> Self {
        DocStats {
            doc_length: 1.0,
            avg_doc_length: 1.0,
        }
    }
}

/// Scorer trait
pub trait Scorer: Send + Sync {
    fn score(&self, frequency: u32, doc_stats: &DocStats) -> f32;

    fn name(&self) -> &str;

    fn requires_lengths(&self) -> bool {
        false
    }
}

pub struct ConstantScorer {
    pub value: f32,
}

impl Scorer for ConstantScorer {
    fn score(&self, _frequency: u32, _doc_stats: &DocStats) -> f32 {
        self.value
    }

    fn name(&self) -> &str {
        "constant"
    }
}

pub struct TermFrequencyScorer {
    pub term_cardinality: u64,
}

impl Scorer for TermFrequencyScorer {
    fn score(&self, frequency: u32, _doc_stats: &DocStats) -> f32 {
        frequency as f32 / self.term_cardinality.max(1) as f32
    }

    fn name(&self) -> &str {
        "term_frequency"
    }
}

/// BM25 Scorer
pub struct BM25Scorer {
    pub k1: f32,  // Term frequency saturation (default: 1.2)
    pub b: f32,   // Length normalization strength (default: 0.75)
    pub idf: f32,
}

impl BM25Scorer {
    pub fn new(k1: f32, b: f32, total_entries: u64, term_cardinality: u64) -> Self {
        BM25Scorer {
            k1,
            b,
            idf: Self::idf(total_entries, term_cardinality),
        }
    }

    /// Probabilistic idf, kept positive for terms present in most entries.
    pub fn idf(total_entries: u64, term_cardinality: u64) -> f32 {
        let n = total_entries.max(term_cardinality) as f32;
        let df = term_cardinality as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }
}

impl Scorer for BM25Scorer {
    fn score(&self, frequency: u32, doc_stats: &DocStats) -> f32 {
        let tf = frequency as f32;
        let avg_doc_len = if doc_stats.avg_doc_length > 0.0 { doc_stats.avg_doc_length } else { 1.0 };

        // BM25 formula
        let numerator = self.idf * tf * (self.k1 + 1.0);
        let denominator = tf + self.k1 * (1.0 - self.b + self.b * (doc_stats.doc_length / avg_doc_len));

        numerator / denominator
    }

    fn name(&self) -> &str {
        "bm25"
    }

    fn requires_lengths(&self) -> bool {
        true
    }
}
