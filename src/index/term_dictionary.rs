use crate::core::constants::{
    DOUBLE_TREE_SUFFIX, ENTRIES_WITH_FIELD_SUFFIX, FIELDS_TREE, LENGTHS_TREE_SUFFIX, LONG_TREE_SUFFIX,
    SUGGESTIONS_TREE_SUFFIX, TOTAL_LENGTH_SUFFIX,
};
use crate::core::error::Result;
use crate::index::posting::TermId;
use crate::index::posting_list::PostingList;
use crate::index::small_set::SmallSet;
use crate::storage::Transaction;

/// Which of a field's dictionaries a term lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TermTree {
    Text,
    /// Order-preserving `i64` keys.
    Long,
    /// Order-preserving `f64` keys.
    Double,
}

/// Naming and lookups over the per-field compact trees.
pub struct TermDictionary;

impl TermDictionary {
    pub fn tree_name(field: &str, tree: TermTree) -> String {
        match tree {
            TermTree::Text => field.to_string(),
            TermTree::Long => format!("{}{}", field, LONG_TREE_SUFFIX),
            TermTree::Double => format!("{}{}", field, DOUBLE_TREE_SUFFIX),
        }
    }

    pub fn lengths_tree(field: &str) -> String {
        format!("{}{}", field, LENGTHS_TREE_SUFFIX)
    }

    pub fn suggestions_tree(field: &str) -> String {
        format!("{}{}", field, SUGGESTIONS_TREE_SUFFIX)
    }

    /// Root scalar holding the summed term count of `field`.
    pub fn total_length_key(field: &str) -> String {
        format!("{}{}", field, TOTAL_LENGTH_SUFFIX)
    }

    /// Root scalar counting the entries that carry `field`.
    pub fn entries_with_field_key(field: &str) -> String {
        format!("{}{}", field, ENTRIES_WITH_FIELD_SUFFIX)
    }

    pub fn lookup(txn: &impl Transaction, tree: &str, term: &[u8]) -> Result<Option<TermId>> {
        txn.tree_get(tree, term).map(TermId::from_raw).transpose()
    }

    /// Exact number of entries behind a term id.
    pub fn cardinality(txn: &impl Transaction, term: TermId) -> Result<u64> {
        Ok(match term {
            TermId::Single(_) => 1,
            TermId::Small(record) => SmallSet::decoder(txn, record)?.remaining() as u64,
            TermId::Set(record) => PostingList::open(txn, record)?.number_of_entries(),
        })
    }

    /// Every encoded id behind a term id, in order.
    pub fn postings(txn: &impl Transaction, term: TermId) -> Result<Vec<u64>> {
        match term {
            TermId::Single(encoded) => Ok(vec![encoded]),
            TermId::Small(record) => SmallSet::values(txn, record),
            TermId::Set(record) => PostingList::open(txn, record)?.values(txn),
        }
    }

    /// Field names ever written to this environment.
    pub fn registered_fields(txn: &impl Transaction) -> Vec<String> {
        txn.tree_cursor(FIELDS_TREE)
            .map(|(key, _)| String::from_utf8_lossy(&key).into_owned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_names_follow_suffix_convention() {
        assert_eq!(TermDictionary::tree_name("Age", TermTree::Text), "Age");
        assert_eq!(TermDictionary::tree_name("Age", TermTree::Long), "Age\0L");
        assert_eq!(TermDictionary::tree_name("Age", TermTree::Double), "Age\0D");
        assert_eq!(TermDictionary::suggestions_tree("Name"), "Name\0S");
        assert_eq!(TermDictionary::lengths_tree("Name"), "Name\0N");
        assert_eq!(TermDictionary::total_length_key("Name"), "Name\0TotalLength");
    }

    #[test]
    fn internal_names_never_equal_a_text_tree() {
        let internal = [
            FIELDS_TREE.to_string(),
            TermDictionary::tree_name("Age", TermTree::Long),
            TermDictionary::tree_name("Age", TermTree::Double),
            TermDictionary::lengths_tree("Age"),
            TermDictionary::suggestions_tree("Age"),
        ];
        for name in &internal {
            assert!(crate::schema::validate_field_name(name).is_err(), "{:?}", name);
        }
        assert_ne!(TermDictionary::tree_name("Fields", TermTree::Text), FIELDS_TREE);
        assert_ne!(TermDictionary::tree_name("Age-L", TermTree::Text), TermDictionary::tree_name("Age", TermTree::Long));
    }
}
