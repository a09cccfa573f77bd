pub mod all_entries;
pub mod binary_match;
pub mod matcher;
pub mod multi_term;
pub mod results;
pub mod sorting_match;
pub mod term_match;
pub mod term_provider;
pub mod unary_match;

pub use all_entries::AllEntriesMatch;
pub use binary_match::{BinaryMatch, BinaryOperation};
pub use matcher::{collect_all, QueryCountConfidence, QueryMatch};
pub use multi_term::MultiTermMatch;
pub use results::{RankedEntry, SortValue, TopKCollector};
pub use sorting_match::{OrderBy, SortDirection, SortKind, SortingMatch};
pub use term_match::TermMatch;
pub use term_provider::{InTermProvider, TermFilter, TermProvider, TreeTermProvider, MAX_FUZZY_EDITS};
pub use unary_match::{FieldRef, UnaryMatch, UnaryOperation, UnaryValue};
