use levenshtein_automata::{Distance, LevenshteinAutomatonBuilder};
use serde::{Deserialize, Serialize};
use crate::core::constants::SUGGESTION_TERM_TAG;
use crate::core::error::{Error, ErrorKind, Result};
use crate::index::TermDictionary;
use crate::query::MAX_FUZZY_EDITS;
use crate::storage::Transaction;

/// A stored term close to the requested word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub term: String,
    pub distance: u8,
    pub frequency: i64,
}

/// Whole terms recorded in the suggestions tree of `field` within `max_edits`
/// of `word`, closest first, then most frequent. Only the whole-term keys are
/// scanned; n-gram keys hold per-gram counts and are not consulted here.
pub fn suggest(
    txn: &impl Transaction,
    field: &str,
    word: &str,
    max_edits: u8,
    take: usize,
) -> Result<Vec<Suggestion>> {
    if max_edits > MAX_FUZZY_EDITS {
        return Err(Error::new(
            ErrorKind::InvalidArgument,
            format!("suggestion edit distance {} exceeds {}", max_edits, MAX_FUZZY_EDITS),
        ));
    }
    let dfa = LevenshteinAutomatonBuilder::new(max_edits, true).build_dfa(word);
    let mut cursor = txn.tree_cursor(&TermDictionary::suggestions_tree(field));
    cursor.seek(&[SUGGESTION_TERM_TAG]);

    let mut found = Vec::new();
    for (key, frequency) in cursor {
        if key.first() != Some(&SUGGESTION_TERM_TAG) {
            break;
        }
        let term = &key[1..];
        let mut state = dfa.initial_state();
        for &byte in term {
            state = dfa.transition(state, byte);
        }
        if let Distance::Exact(distance) = dfa.distance(state) {
            found.push(Suggestion {
                term: String::from_utf8_lossy(term).into_owned(),
                distance,
                frequency,
            });
        }
    }

    found.sort_by(|a, b| {
        a.distance
            .cmp(&b.distance)
            .then(b.frequency.cmp(&a.frequency))
            .then_with(|| a.term.cmp(&b.term))
    });
    found.truncate(take);
    Ok(found)
}
