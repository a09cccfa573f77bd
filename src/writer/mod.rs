pub mod batch;
pub mod extraction;
pub mod index_writer;
pub mod suggestions;

pub use extraction::{FieldTerms, TermExtractor};
pub use index_writer::{CommitStats, IndexWriter};
pub use suggestions::SuggestionsAccumulator;
