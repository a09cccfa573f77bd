pub mod scorer;
pub mod term_scorer;

pub use scorer::{BM25Scorer, Boosting, ConstantScorer, DocStats, Scorer, TermFrequencyScorer};
pub use term_scorer::{FieldLengths, TermScorer};
