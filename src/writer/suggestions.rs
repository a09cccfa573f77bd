use std::collections::HashMap;
use tracing::debug;
use crate::analysis::filters::char_ngrams;
use crate::core::constants::{SUGGESTION_NGRAM_TAG, SUGGESTION_TERM_TAG};
use crate::index::TermDictionary;
use crate::storage::{Transaction, WriteTransaction};

/// Pending frequency changes of the suggestion tables, per field.
#[derive(Debug, Default)]
pub struct SuggestionsAccumulator {
    ngram_min: usize,
    ngram_max: usize,
    fields: HashMap<String, HashMap<Vec<u8>, i64>>,
}

impl SuggestionsAccumulator {
    pub fn new(ngram_min: usize, ngram_max: usize) -> Self {
        SuggestionsAccumulator {
            ngram_min,
            ngram_max,
            fields: HashMap::new(),
        }
    }

    pub fn add(&mut self, field: &str, term: &[u8]) {
        self.apply(field, term, 1);
    }

    pub fn remove(&mut self, field: &str, term: &[u8]) {
        self.apply(field, term, -1);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.values().all(|keys| keys.is_empty())
    }

    fn apply(&mut self, field: &str, term: &[u8], delta: i64) {
        let keys = self.fields.entry(field.to_string()).or_default();
        *keys.entry(term_key(term)).or_insert(0) += delta;

        let Ok(text) = std::str::from_utf8(term) else {
            return;
        };
        for gram in char_ngrams(text, self.ngram_min, self.ngram_max) {
            *keys.entry(ngram_key(gram.as_bytes())).or_insert(0) += delta;
        }
    }

    /// Folds every delta into the `<field>-S` trees. Keys whose frequency
    /// drops to zero or below are removed. Returns the number of keys touched.
    pub fn merge_into(&mut self, txn: &mut WriteTransaction) -> usize {
        let mut touched = 0;
        for (field, keys) in self.fields.drain() {
            let tree = TermDictionary::suggestions_tree(&field);
            let mut keys: Vec<_> = keys.into_iter().filter(|(_, delta)| *delta != 0).collect();
            keys.sort_unstable_by(|a, b| a.0.cmp(&b.0));
            for (key, delta) in keys {
                let current = txn.tree_get(&tree, &key).unwrap_or(0);
                let updated = current + delta;
                if updated > 0 {
                    txn.tree_add(&tree, &key, updated);
                } else {
                    txn.tree_remove(&tree, &key);
                }
                touched += 1;
            }
            debug!(field = %field, total_keys = touched, "suggestions merged");
        }
        touched
    }
}

pub fn term_key(term: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(term.len() + 1);
    key.push(SUGGESTION_TERM_TAG);
    key.extend_from_slice(term);
    key
}

pub fn ngram_key(gram: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(gram.len() + 1);
    key.push(SUGGESTION_NGRAM_TAG);
    key.extend_from_slice(gram);
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Environment, Transaction};

    #[test]
    fn deltas_accumulate_and_vanish_at_zero() {
        let env = Environment::in_memory();
        let mut txn = env.write_txn().unwrap();

        let mut acc = SuggestionsAccumulator::new(2, 3);
        acc.add("Name", b"oren");
        acc.add("Name", b"oren");
        acc.add("Name", b"ore");
        acc.merge_into(&mut txn);

        let tree = TermDictionary::suggestions_tree("Name");
        assert_eq!(txn.tree_get(&tree, &term_key(b"oren")), Some(2));
        assert_eq!(txn.tree_get(&tree, &ngram_key(b"ore")), Some(3));
        assert_eq!(txn.tree_get(&tree, &term_key(b"ore")), Some(1));

        let mut acc = SuggestionsAccumulator::new(2, 3);
        acc.remove("Name", b"ore");
        acc.merge_into(&mut txn);
        assert_eq!(txn.tree_get(&tree, &term_key(b"ore")), None);
        assert_eq!(txn.tree_get(&tree, &ngram_key(b"ore")), Some(2));
        assert!(acc.is_empty());
    }
}
