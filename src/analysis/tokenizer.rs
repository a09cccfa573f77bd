use unicode_segmentation::UnicodeSegmentation;
use crate::analysis::token::Token;

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;

    fn name(&self) -> &str;
}

/// Splits on Unicode word boundaries (UAX #29).
#[derive(Clone)]
pub struct StandardTokenizer {
    pub max_token_length: usize,
}

impl Default for StandardTokenizer {
    fn default() -> Self {
        StandardTokenizer {
            max_token_length: 255,
        }
    }
}

impl Tokenizer for StandardTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        text.unicode_words()
            .filter(|word| word.len() <= self.max_token_length)
            .enumerate()
            .map(|(position, word)| Token::new(word, position as u32))
            .collect()
    }

    fn name(&self) -> &str {
        "standard"
    }
}

/// Emits the whole input as a single token.
#[derive(Clone, Default)]
pub struct KeywordTokenizer;

impl Tokenizer for KeywordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        if text.is_empty() {
            return Vec::new();
        }
        vec![Token::new(text, 0)]
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_splits_words_and_drops_punctuation() {
        let tokens = StandardTokenizer::default().tokenize("The quick, brown fox!");
        let words: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(words, vec!["The", "quick", "brown", "fox"]);
        assert_eq!(tokens[3].position, 3);
    }

    #[test]
    fn keyword_keeps_input_whole() {
        assert_eq!(KeywordTokenizer.tokenize("list/500")[0].text, "list/500");
        assert!(KeywordTokenizer.tokenize("").is_empty());
    }
}
