use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, ErrorKind, Result};

/// Tuning knobs shared by the writer and the query operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Upper bound of the scratch buffer used to encode a small posting set.
    /// Sets that do not fit are promoted to a full posting list.
    pub small_posting_max_bytes: usize,
    /// Number of ids per posting list block.
    pub posting_block_size: usize,
    /// Deleting from a posting list that ends up at or under this cardinality
    /// rebuilds the term as a small set (or a single id).
    pub set_shrink_threshold: u64,
    /// Block size used by operators that stream their inner match.
    pub fill_batch_size: usize,
    /// Allows the vectorized intersection path when the CPU supports it.
    pub simd: bool,
    pub suggestion_ngram_min: usize,
    pub suggestion_ngram_max: usize,
    pub bm25_k1: f32,
    pub bm25_b: f32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            small_posting_max_bytes: 256,
            posting_block_size: 128,
            set_shrink_threshold: 8,
            fill_batch_size: 4096,
            simd: true,
            suggestion_ngram_min: 2,
            suggestion_ngram_max: 3,
            bm25_k1: 1.2,
            bm25_b: 0.75,
        }
    }
}

impl IndexConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: IndexConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn validate(&self) -> Result<()> {
        if self.small_posting_max_bytes < 16 {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("small_posting_max_bytes must be >= 16, got {}", self.small_posting_max_bytes),
            ));
        }
        if self.posting_block_size < 4 || self.posting_block_size > u16::MAX as usize {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("posting_block_size out of range: {}", self.posting_block_size),
            ));
        }
        if self.fill_batch_size == 0 {
            return Err(Error::new(ErrorKind::InvalidArgument, "fill_batch_size must be positive"));
        }
        if self.suggestion_ngram_min == 0 || self.suggestion_ngram_min > self.suggestion_ngram_max {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!(
                    "invalid suggestion n-gram range {}..={}",
                    self.suggestion_ngram_min, self.suggestion_ngram_max
                ),
            ));
        }
        Ok(())
    }
}
