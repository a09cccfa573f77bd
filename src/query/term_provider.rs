use std::ops::Bound;
use levenshtein_automata::{Distance, LevenshteinAutomatonBuilder, DFA};
use regex::bytes::Regex;
use crate::core::constants::{EMPTY_VALUE, NULL_VALUE};
use crate::core::error::{Error, ErrorKind, Result};
use crate::index::{NumericKey, TermId};
use crate::storage::{Transaction, TreeCursor};

/// Edit distances above this are refused; the automaton grows too quickly.
pub const MAX_FUZZY_EDITS: u8 = 2;

/// Source of the terms a multi-term match walks through, in tree order.
pub trait TermProvider {
    /// The next matching term and its postings handle.
    fn next_term(&mut self) -> Result<Option<(Vec<u8>, TermId)>>;

    /// Starts over from the first term.
    fn reset(&mut self);

    fn name(&self) -> &'static str;
}

/// Provider over an explicit list of terms; missing terms are skipped.
pub struct InTermProvider {
    terms: Vec<(Vec<u8>, TermId)>,
    pos: usize,
}

impl InTermProvider {
    pub fn new(txn: &impl Transaction, tree: &str, mut terms: Vec<Vec<u8>>) -> Result<InTermProvider> {
        terms.sort();
        terms.dedup();
        let mut resolved = Vec::with_capacity(terms.len());
        for term in terms {
            if let Some(raw) = txn.tree_get(tree, &term) {
                resolved.push((term, TermId::from_raw(raw)?));
            }
        }
        Ok(InTermProvider { terms: resolved, pos: 0 })
    }
}

impl TermProvider for InTermProvider {
    fn next_term(&mut self) -> Result<Option<(Vec<u8>, TermId)>> {
        let next = self.terms.get(self.pos).cloned();
        if next.is_some() {
            self.pos += 1;
        }
        Ok(next)
    }

    fn reset(&mut self) {
        self.pos = 0;
    }

    fn name(&self) -> &'static str {
        "in"
    }
}

/// Which keys of a tree a [`TreeTermProvider`] yields.
pub enum TermFilter {
    StartsWith(Vec<u8>),
    EndsWith(Vec<u8>),
    Contains(Vec<u8>),
    /// Every stored term except the null marker.
    Exists,
    Range { low: Bound<Vec<u8>>, high: Bound<Vec<u8>> },
    Regex(Regex),
    Fuzzy { dfa: DFA, max_edits: u8, prefix: Vec<u8> },
}

enum Step {
    Yield,
    Skip,
    Stop,
}

fn is_marker(key: &[u8]) -> bool {
    key == NULL_VALUE || key == EMPTY_VALUE
}

impl TermFilter {
    pub fn range(low: Bound<&[u8]>, high: Bound<&[u8]>) -> TermFilter {
        TermFilter::Range {
            low: low.map(|k| k.to_vec()),
            high: high.map(|k| k.to_vec()),
        }
    }

    /// Inclusive range over a long tree. Inverted bounds are swapped.
    pub fn long_range(low: i64, high: i64) -> TermFilter {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        TermFilter::Range {
            low: Bound::Included(NumericKey::from_long(low).to_vec()),
            high: Bound::Included(NumericKey::from_long(high).to_vec()),
        }
    }

    /// Inclusive range over a double tree. Inverted bounds are swapped.
    pub fn double_range(low: f64, high: f64) -> Result<TermFilter> {
        if low.is_nan() || high.is_nan() {
            return Err(Error::new(ErrorKind::InvalidArgument, "NaN is not a valid range bound"));
        }
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        Ok(TermFilter::Range {
            low: Bound::Included(NumericKey::from_double(low).to_vec()),
            high: Bound::Included(NumericKey::from_double(high).to_vec()),
        })
    }

    pub fn regex(pattern: &str) -> Result<TermFilter> {
        Ok(TermFilter::Regex(Regex::new(pattern)?))
    }

    /// Terms within `max_edits` of `term` that share its first `prefix_length` bytes.
    pub fn fuzzy(term: &str, max_edits: u8, prefix_length: usize) -> Result<TermFilter> {
        if max_edits > MAX_FUZZY_EDITS {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("fuzzy edit distance {} exceeds {}", max_edits, MAX_FUZZY_EDITS),
            ));
        }
        let dfa = LevenshteinAutomatonBuilder::new(max_edits, true).build_dfa(term);
        let prefix = term.as_bytes()[..prefix_length.min(term.len())].to_vec();
        Ok(TermFilter::Fuzzy { dfa, max_edits, prefix })
    }

    fn start(&self, cursor: &mut TreeCursor) {
        match self {
            TermFilter::StartsWith(prefix) => cursor.seek(prefix),
            TermFilter::Fuzzy { prefix, .. } if !prefix.is_empty() => cursor.seek(prefix),
            TermFilter::Range { low: Bound::Included(key), .. } => cursor.seek(key),
            TermFilter::Range { low: Bound::Excluded(key), .. } => cursor.seek_after(key),
            _ => {}
        }
    }

    fn step(&self, key: &[u8]) -> Step {
        let yield_if = |matched: bool| if matched { Step::Yield } else { Step::Skip };
        match self {
            TermFilter::StartsWith(prefix) => {
                if key.starts_with(prefix) {
                    yield_if(!is_marker(key))
                } else {
                    Step::Stop
                }
            }
            TermFilter::EndsWith(suffix) => yield_if(!is_marker(key) && key.ends_with(suffix)),
            TermFilter::Contains(needle) => yield_if(
                !is_marker(key) && (needle.is_empty() || key.windows(needle.len()).any(|w| w == needle.as_slice())),
            ),
            TermFilter::Exists => yield_if(key != NULL_VALUE),
            TermFilter::Range { high, .. } => {
                let below = match high {
                    Bound::Included(h) => key <= h.as_slice(),
                    Bound::Excluded(h) => key < h.as_slice(),
                    Bound::Unbounded => true,
                };
                if below { yield_if(!is_marker(key)) } else { Step::Stop }
            }
            TermFilter::Regex(regex) => yield_if(!is_marker(key) && regex.is_match(key)),
            TermFilter::Fuzzy { dfa, max_edits, prefix } => {
                if !key.starts_with(prefix) {
                    return Step::Stop;
                }
                let mut state = dfa.initial_state();
                for &byte in key {
                    state = dfa.transition(state, byte);
                }
                yield_if(matches!(dfa.distance(state), Distance::Exact(d) if d <= *max_edits))
            }
        }
    }

    fn name(&self) -> &'static str {
        match self {
            TermFilter::StartsWith(_) => "starts_with",
            TermFilter::EndsWith(_) => "ends_with",
            TermFilter::Contains(_) => "contains",
            TermFilter::Exists => "exists",
            TermFilter::Range { .. } => "range",
            TermFilter::Regex(_) => "regex",
            TermFilter::Fuzzy { .. } => "fuzzy",
        }
    }
}

/// Walks one term tree in key order, yielding the keys accepted by a [`TermFilter`].
pub struct TreeTermProvider {
    cursor: TreeCursor,
    filter: TermFilter,
    done: bool,
}

impl TreeTermProvider {
    pub fn new(txn: &impl Transaction, tree: &str, filter: TermFilter) -> TreeTermProvider {
        let mut cursor = txn.tree_cursor(tree);
        filter.start(&mut cursor);
        TreeTermProvider { cursor, filter, done: false }
    }
}

impl TermProvider for TreeTermProvider {
    fn next_term(&mut self) -> Result<Option<(Vec<u8>, TermId)>> {
        if self.done {
            return Ok(None);
        }
        for (key, raw) in self.cursor.by_ref() {
            match self.filter.step(&key) {
                Step::Yield => return Ok(Some((key, TermId::from_raw(raw)?))),
                Step::Skip => continue,
                Step::Stop => break,
            }
        }
        self.done = true;
        Ok(None)
    }

    fn reset(&mut self) {
        self.cursor.reset();
        self.done = false;
    }

    fn name(&self) -> &'static str {
        self.filter.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Environment;

    fn terms(provider: &mut impl TermProvider) -> Vec<String> {
        let mut out = Vec::new();
        while let Some((term, _)) = provider.next_term().unwrap() {
            out.push(String::from_utf8_lossy(&term).into_owned());
        }
        out
    }

    fn env_with(words: &[&str]) -> Environment {
        let env = Environment::in_memory();
        let mut txn = env.write_txn().unwrap();
        for (i, word) in words.iter().enumerate() {
            txn.tree_add("Name", word.as_bytes(), TermId::Single((i as u64 + 1) << 8).to_raw());
        }
        txn.tree_add("Name", NULL_VALUE, TermId::Single(99 << 8).to_raw());
        txn.commit().unwrap();
        env
    }

    #[test]
    fn prefix_stops_at_first_non_matching_key() {
        let env = env_with(&["car", "card", "care", "cat", "dog"]);
        let txn = env.read_txn();
        let mut provider = TreeTermProvider::new(&txn, "Name", TermFilter::StartsWith(b"car".to_vec()));
        assert_eq!(terms(&mut provider), vec!["car", "card", "care"]);
        provider.reset();
        assert_eq!(terms(&mut provider).len(), 3);
    }

    #[test]
    fn exists_skips_null_marker() {
        let env = env_with(&["a", "b"]);
        let txn = env.read_txn();
        let mut provider = TreeTermProvider::new(&txn, "Name", TermFilter::Exists);
        assert_eq!(terms(&mut provider), vec!["a", "b"]);
    }

    #[test]
    fn range_honours_bound_kinds() {
        let env = env_with(&["b", "c", "d", "e"]);
        let txn = env.read_txn();
        let filter = TermFilter::range(Bound::Excluded(b"b"), Bound::Included(b"d"));
        let mut provider = TreeTermProvider::new(&txn, "Name", filter);
        assert_eq!(terms(&mut provider), vec!["c", "d"]);
    }

    #[test]
    fn fuzzy_and_regex() {
        let env = env_with(&["kitten", "mitten", "sitting", "kitchen"]);
        let txn = env.read_txn();
        let mut fuzzy = TreeTermProvider::new(&txn, "Name", TermFilter::fuzzy("kitten", 1, 0).unwrap());
        assert_eq!(terms(&mut fuzzy), vec!["kitten", "mitten"]);

        let mut prefixed = TreeTermProvider::new(&txn, "Name", TermFilter::fuzzy("kitten", 2, 1).unwrap());
        assert_eq!(terms(&mut prefixed), vec!["kitchen", "kitten"]);

        let mut regex = TreeTermProvider::new(&txn, "Name", TermFilter::regex("^.itt").unwrap());
        assert_eq!(terms(&mut regex), vec!["kitten", "mitten", "sitting"]);

        assert_eq!(TermFilter::fuzzy("kitten", 3, 0).err().map(|e| e.kind), Some(ErrorKind::InvalidArgument));
    }

    #[test]
    fn in_provider_sorts_and_skips_missing() {
        let env = env_with(&["x", "y", "z"]);
        let txn = env.read_txn();
        let wanted = vec![b"z".to_vec(), b"nope".to_vec(), b"x".to_vec(), b"x".to_vec()];
        let mut provider = InTermProvider::new(&txn, "Name", wanted).unwrap();
        assert_eq!(terms(&mut provider), vec!["x", "z"]);
    }
}
