use std::collections::HashMap;
use crate::index::{EntryIdEncodings, TermTree};

/// Entry ids (with their term frequency) gathered for one term.
pub type TermPostings = Vec<(u64, u32)>;

/// Accumulation buffer of a writer: field → tree → term → postings.
///
/// Entry ids are handed out in increasing order, so appending keeps every
/// postings list sorted. A repeated entry at the tail bumps its frequency.
#[derive(Debug, Default)]
pub struct TermBuffer {
    fields: HashMap<String, [HashMap<Vec<u8>, TermPostings>; 3]>,
    pending: usize,
}

fn slot(tree: TermTree) -> usize {
    match tree {
        TermTree::Text => 0,
        TermTree::Long => 1,
        TermTree::Double => 2,
    }
}

const TREES: [TermTree; 3] = [TermTree::Text, TermTree::Long, TermTree::Double];

impl TermBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: &str, tree: TermTree, term: &[u8], entry_id: u64) {
        debug_assert!(!term.is_empty(), "empty terms must be replaced by a sentinel");
        if !self.fields.contains_key(field) {
            self.fields.insert(field.to_string(), Default::default());
        }
        let Some(trees) = self.fields.get_mut(field) else {
            return;
        };
        let postings = trees[slot(tree)].entry(term.to_vec()).or_default();
        match postings.last_mut() {
            Some((last, freq)) if *last == entry_id => *freq = freq.saturating_add(1),
            Some((last, _)) if *last > entry_id => {
                debug_assert!(false, "entry {} inserted after {}", entry_id, last);
            }
            _ => {
                postings.push((entry_id, 1));
                self.pending += 1;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending == 0
    }

    /// Drops every buffered posting of the entries matched by `is_removed`.
    /// Terms left without postings are dropped too. Returns the postings removed.
    pub fn remove_entries(&mut self, mut is_removed: impl FnMut(u64) -> bool) -> usize {
        let mut removed = 0;
        for trees in self.fields.values_mut() {
            for terms in trees.iter_mut() {
                terms.retain(|_, postings| {
                    let before = postings.len();
                    postings.retain(|(entry, _)| !is_removed(*entry));
                    removed += before - postings.len();
                    !postings.is_empty()
                });
            }
        }
        self.fields.retain(|_, trees| trees.iter().any(|terms| !terms.is_empty()));
        self.pending -= removed;
        removed
    }

    /// Number of (term, entry) pairs waiting for commit.
    pub fn len(&self) -> usize {
        self.pending
    }

    /// Empties the buffer, yielding `(field, tree, terms)` groups ordered by
    /// field then tree, with terms in lexicographic order and postings already
    /// packed with their frequency.
    pub fn drain_sorted(&mut self) -> Vec<(String, TermTree, Vec<(Vec<u8>, Vec<u64>)>)> {
        let mut fields: Vec<_> = self.fields.drain().collect();
        fields.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        self.pending = 0;

        let mut groups = Vec::new();
        for (field, trees) in fields {
            for (tree, terms) in TREES.into_iter().zip(trees) {
                if terms.is_empty() {
                    continue;
                }
                let mut terms: Vec<(Vec<u8>, Vec<u64>)> = terms
                    .into_iter()
                    .map(|(term, postings)| {
                        let encoded = postings
                            .into_iter()
                            .map(|(entry, freq)| EntryIdEncodings::encode(entry, freq))
                            .collect();
                        (term, encoded)
                    })
                    .collect();
                terms.sort_unstable_by(|a, b| a.0.cmp(&b.0));
                groups.push((field.clone(), tree, terms));
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_terms_raise_frequency() {
        let mut buffer = TermBuffer::new();
        buffer.insert("Content", TermTree::Text, b"fox", 4);
        buffer.insert("Content", TermTree::Text, b"fox", 4);
        buffer.insert("Content", TermTree::Text, b"dog", 4);
        buffer.insert("Content", TermTree::Text, b"fox", 9);
        assert_eq!(buffer.len(), 3);

        let groups = buffer.drain_sorted();
        assert_eq!(groups.len(), 1);
        let (field, tree, terms) = &groups[0];
        assert_eq!((field.as_str(), *tree), ("Content", TermTree::Text));
        assert_eq!(terms[0].0, b"dog");
        assert_eq!(terms[1].1, vec![EntryIdEncodings::encode(4, 2), EntryIdEncodings::encode(9, 1)]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn removed_entries_leave_no_postings() {
        let mut buffer = TermBuffer::new();
        buffer.insert("Content", TermTree::Text, b"ghost", 3);
        buffer.insert("Content", TermTree::Text, b"ghost", 5);
        buffer.insert("Content", TermTree::Text, b"only", 5);
        buffer.insert("Age", TermTree::Long, &[7; 8], 5);

        assert_eq!(buffer.remove_entries(|entry| entry == 5), 3);
        assert_eq!(buffer.len(), 1);
        let groups = buffer.drain_sorted();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].2, vec![(b"ghost".to_vec(), vec![EntryIdEncodings::encode(3, 1)])]);
    }

    #[test]
    fn trees_are_kept_apart() {
        let mut buffer = TermBuffer::new();
        buffer.insert("Age", TermTree::Long, &[1; 8], 1);
        buffer.insert("Age", TermTree::Text, b"30", 1);
        let groups = buffer.drain_sorted();
        assert_eq!(groups.iter().map(|g| g.1).collect::<Vec<_>>(), vec![TermTree::Text, TermTree::Long]);
    }
}
