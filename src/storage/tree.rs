use std::ops::Bound;
use std::sync::Arc;
use crate::storage::transaction::TreeMap;

/// Forward cursor over a snapshot of a compact tree.
///
/// The cursor owns its snapshot, so it can outlive the transaction borrow it
/// was created from.
#[derive(Debug, Clone)]
pub struct TreeCursor {
    tree: Arc<TreeMap>,
    lower: Bound<Vec<u8>>,
    start: Bound<Vec<u8>>,
}

impl TreeCursor {
    pub fn new(tree: Arc<TreeMap>) -> Self {
        TreeCursor {
            tree,
            lower: Bound::Unbounded,
            start: Bound::Unbounded,
        }
    }

    /// Positions the cursor on the first key `>= key`.
    pub fn seek(&mut self, key: &[u8]) {
        self.lower = Bound::Included(key.to_vec());
        self.start = self.lower.clone();
    }

    /// Positions the cursor on the first key `> key`.
    pub fn seek_after(&mut self, key: &[u8]) {
        self.lower = Bound::Excluded(key.to_vec());
        self.start = self.lower.clone();
    }

    /// Goes back to where the last seek (or the beginning) left the cursor.
    pub fn reset(&mut self) {
        self.lower = self.start.clone();
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

}

impl Iterator for TreeCursor {
    type Item = (Vec<u8>, i64);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = self
            .tree
            .range::<[u8], _>((self.lower.as_ref().map(|k| k.as_slice()), Bound::Unbounded))
            .next()
            .map(|(k, v)| (k.clone(), *v))?;
        self.lower = Bound::Excluded(key.clone());
        Some((key, value))
    }
}
