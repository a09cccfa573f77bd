pub mod searcher;
pub mod suggest;

pub use searcher::IndexSearcher;
pub use suggest::Suggestion;
