pub mod analyzer;
pub mod filters;
pub mod token;
pub mod tokenizer;

pub use analyzer::{Analyzer, AnalyzerRegistry, KeywordAnalyzer, NGramAnalyzer, StandardAnalyzer};
pub use token::TokenSpan;
