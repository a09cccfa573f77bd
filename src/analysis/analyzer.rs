use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use parking_lot::RwLock;
use rust_stemmers::Algorithm;
use crate::analysis::filters::{LowercaseFilter, NGramFilter, StemmerFilter, StopWordFilter, TokenFilter};
use crate::analysis::token::{Token, TokenSpan};
use crate::analysis::tokenizer::{StandardTokenizer, Tokenizer};
use crate::core::error::{Error, ErrorKind, Result};

/// Turns a field value into the terms that get indexed.
///
/// Callers size their buffers with [`Analyzer::output_buffer_size`] and hand
/// them to [`Analyzer::execute`], which overwrites both.
pub trait Analyzer: Send + Sync {
    fn name(&self) -> &str;

    /// Upper bounds for (output bytes, token count) for an input of `input_len` bytes.
    fn output_buffer_size(&self, input_len: usize) -> (usize, usize);

    fn execute(&self, input: &[u8], output: &mut Vec<u8>, tokens: &mut Vec<TokenSpan>);
}

impl fmt::Debug for dyn Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Analyzer({})", self.name())
    }
}

/// Tokenizer followed by a chain of filters. The stock configurations
/// segment on unicode words and lowercase; `english` adds stop words and stemming.
pub struct StandardAnalyzer {
    pub tokenizer: Box<dyn Tokenizer>,
    pub filters: Vec<Box<dyn TokenFilter>>,
    pub name: String,
    /// Multiplier applied to the input length when sizing the output buffer.
    expansion: usize,
}

impl StandardAnalyzer {
    pub fn new(name: impl Into<String>, tokenizer: Box<dyn Tokenizer>) -> Self {
        StandardAnalyzer {
            tokenizer,
            filters: Vec::new(),
            name: name.into(),
            expansion: 4,
        }
    }

    pub fn add_filter(mut self, filter: Box<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_expansion(mut self, expansion: usize) -> Self {
        self.expansion = expansion.max(1);
        self
    }

    pub fn analyze(&self, text: &str) -> Vec<Token> {
        let mut tokens = self.tokenizer.tokenize(text);
        for filter in &self.filters {
            filter.apply(&mut tokens);
        }
        tokens
    }

    /// Lowercased unicode words without stop words or stemming.
    pub fn standard() -> Self {
        StandardAnalyzer::new("standard", Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
    }

    pub fn english() -> Self {
        StandardAnalyzer::new("english", Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
            .add_filter(Box::new(StopWordFilter::english()))
            .add_filter(Box::new(StemmerFilter::new(Algorithm::English)))
    }
}

impl Analyzer for StandardAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_buffer_size(&self, input_len: usize) -> (usize, usize) {
        (input_len * self.expansion, input_len * self.expansion / 2 + 1)
    }

    fn execute(&self, input: &[u8], output: &mut Vec<u8>, tokens: &mut Vec<TokenSpan>) {
        output.clear();
        tokens.clear();
        let text = String::from_utf8_lossy(input);
        for token in self.analyze(&text) {
            if token.text.is_empty() {
                continue;
            }
            tokens.push(TokenSpan {
                offset: output.len() as u32,
                length: token.text.len() as u32,
            });
            output.extend_from_slice(token.text.as_bytes());
        }
    }
}

/// Lowercased character n-grams of every word.
pub struct NGramAnalyzer {
    inner: StandardAnalyzer,
}

impl NGramAnalyzer {
    pub fn new(min_gram: usize, max_gram: usize) -> Self {
        let inner = StandardAnalyzer::new("ngram", Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
            .add_filter(Box::new(NGramFilter::new(min_gram, max_gram)))
            .with_expansion(max_gram.max(1) * 4);
        NGramAnalyzer { inner }
    }
}

impl Analyzer for NGramAnalyzer {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn output_buffer_size(&self, input_len: usize) -> (usize, usize) {
        self.inner.output_buffer_size(input_len)
    }

    fn execute(&self, input: &[u8], output: &mut Vec<u8>, tokens: &mut Vec<TokenSpan>) {
        self.inner.execute(input, output, tokens)
    }
}

/// Emits the input as one term, optionally lowercased.
pub struct KeywordAnalyzer {
    lowercase: bool,
}

impl KeywordAnalyzer {
    pub fn new(lowercase: bool) -> Self {
        KeywordAnalyzer { lowercase }
    }
}

impl Analyzer for KeywordAnalyzer {
    fn name(&self) -> &str {
        if self.lowercase { "lowercase_keyword" } else { "keyword" }
    }

    fn output_buffer_size(&self, input_len: usize) -> (usize, usize) {
        // lowercasing may grow some code points
        (input_len * 3 / 2 + 4, 1)
    }

    fn execute(&self, input: &[u8], output: &mut Vec<u8>, tokens: &mut Vec<TokenSpan>) {
        output.clear();
        tokens.clear();
        if input.is_empty() {
            return;
        }
        if self.lowercase {
            output.extend_from_slice(String::from_utf8_lossy(input).to_lowercase().as_bytes());
        } else {
            output.extend_from_slice(input);
        }
        tokens.push(TokenSpan { offset: 0, length: output.len() as u32 });
    }
}

/// Registry for managing analyzers by name
pub struct AnalyzerRegistry {
    analyzers: RwLock<HashMap<String, Arc<dyn Analyzer>>>,
}

impl Default for AnalyzerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        let registry = AnalyzerRegistry {
            analyzers: RwLock::new(HashMap::new()),
        };
        registry.register("standard", Arc::new(StandardAnalyzer::standard()));
        registry.register("english", Arc::new(StandardAnalyzer::english()));
        registry.register("keyword", Arc::new(KeywordAnalyzer::new(false)));
        registry.register("lowercase_keyword", Arc::new(KeywordAnalyzer::new(true)));
        registry
    }

    pub fn register(&self, name: &str, analyzer: Arc<dyn Analyzer>) {
        self.analyzers.write().insert(name.to_string(), analyzer);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Analyzer>> {
        self.analyzers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("Analyzer '{}' not found", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(analyzer: &dyn Analyzer, input: &str) -> Vec<String> {
        let (bytes, count) = analyzer.output_buffer_size(input.len());
        let mut output = Vec::with_capacity(bytes);
        let mut tokens = Vec::with_capacity(count);
        analyzer.execute(input.as_bytes(), &mut output, &mut tokens);
        tokens
            .iter()
            .map(|t| String::from_utf8(t.slice(&output).to_vec()).unwrap())
            .collect()
    }

    #[test]
    fn standard_pipeline_fills_spans() {
        assert_eq!(run(&StandardAnalyzer::standard(), "Hello World hello"), vec!["hello", "world", "hello"]);
    }

    #[test]
    fn english_pipeline_stems_and_drops_stop_words() {
        assert_eq!(run(&StandardAnalyzer::english(), "The Foxes are jumping"), vec!["fox", "jump"]);
    }

    #[test]
    fn ngram_analyzer_emits_grams_per_word() {
        assert_eq!(run(&NGramAnalyzer::new(2, 3), "Abc d"), vec!["ab", "bc", "abc"]);
    }

    #[test]
    fn keyword_lowercases_whole_value() {
        assert_eq!(run(&KeywordAnalyzer::new(true), "Users/1-A"), vec!["users/1-a"]);
        assert!(run(&KeywordAnalyzer::new(false), "").is_empty());
    }

    #[test]
    fn registry_reports_unknown_analyzers() {
        let registry = AnalyzerRegistry::new();
        assert!(registry.get("english").is_ok());
        assert_eq!(registry.get("klingon").err().unwrap().kind, ErrorKind::NotFound);
    }
}
