use std::collections::HashSet;
use rust_stemmers::{Algorithm, Stemmer};
use crate::analysis::token::Token;

pub trait TokenFilter: Send + Sync {
    fn apply(&self, tokens: &mut Vec<Token>);

    fn name(&self) -> &str;
}

pub struct LowercaseFilter;

impl TokenFilter for LowercaseFilter {
    fn apply(&self, tokens: &mut Vec<Token>) {
        for token in tokens.iter_mut() {
            if token.text.chars().any(char::is_uppercase) {
                token.text = token.text.to_lowercase();
            }
        }
    }

    fn name(&self) -> &str {
        "lowercase"
    }
}

pub struct StopWordFilter {
    stop_words: HashSet<String>,
}

impl StopWordFilter {
    pub fn new<I, S>(stop_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StopWordFilter {
            stop_words: stop_words.into_iter().map(Into::into).collect(),
        }
    }

    pub fn english() -> Self {
        StopWordFilter::new([
            "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is",
            "it", "its", "of", "on", "that", "the", "to", "was", "will", "with",
        ])
    }
}

impl TokenFilter for StopWordFilter {
    fn apply(&self, tokens: &mut Vec<Token>) {
        tokens.retain(|token| !self.stop_words.contains(&token.text));
    }

    fn name(&self) -> &str {
        "stop_words"
    }
}

pub struct StemmerFilter {
    stemmer: Stemmer,
}

impl StemmerFilter {
    pub fn new(algorithm: Algorithm) -> Self {
        StemmerFilter {
            stemmer: Stemmer::create(algorithm),
        }
    }
}

impl TokenFilter for StemmerFilter {
    fn apply(&self, tokens: &mut Vec<Token>) {
        for token in tokens.iter_mut() {
            let stemmed = self.stemmer.stem(&token.text);
            if stemmed != token.text {
                token.text = stemmed.into_owned();
            }
        }
    }

    fn name(&self) -> &str {
        "stemmer"
    }
}

/// Replaces every token by its character n-grams.
pub struct NGramFilter {
    pub min_gram: usize,
    pub max_gram: usize,
}

impl NGramFilter {
    pub fn new(min_gram: usize, max_gram: usize) -> Self {
        NGramFilter { min_gram, max_gram }
    }
}

impl TokenFilter for NGramFilter {
    fn apply(&self, tokens: &mut Vec<Token>) {
        let mut grams = Vec::new();
        for token in tokens.drain(..) {
            for gram in char_ngrams(&token.text, self.min_gram, self.max_gram) {
                grams.push(Token::new(gram, token.position));
            }
        }
        *tokens = grams;
    }

    fn name(&self) -> &str {
        "ngram"
    }
}

/// Character n-grams of `text` for every size in `min..=max`.
pub fn char_ngrams(text: &str, min: usize, max: usize) -> Vec<&str> {
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let chars = boundaries.len() - 1;

    let mut grams = Vec::new();
    for n in min.max(1)..=max.min(chars) {
        for start in 0..=chars - n {
            grams.push(&text[boundaries[start]..boundaries[start + n]]);
        }
    }
    grams
}
