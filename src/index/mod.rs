pub mod posting;
pub mod posting_list;
pub mod small_set;
pub mod term_dictionary;

pub use posting::{merge_by_entry, EntryIdEncodings, NumericKey, TermId};
pub use posting_list::{PostingList, PostingListIterator};
pub use small_set::SmallSet;
pub use term_dictionary::{TermDictionary, TermTree};
