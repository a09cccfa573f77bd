//! Well-known names shared by writers and readers opened on the same environment.

/// Joins a field name to the suffix of its internal trees and scalars.
/// Field names cannot contain it, so no field can name another field's data.
pub const RESERVED_NAME_CHAR: char = '\0';

pub const FIELDS_TREE: &str = "\0Fields";
pub const POSTING_LISTS_CONTAINER: &str = "PostingLists";
pub const SMALL_POSTINGS_CONTAINER: &str = "SmallPostings";
pub const ENTRIES_CONTAINER: &str = "EntriesContainer";

pub const NUMBER_OF_ENTRIES: &str = "NumberOfEntries";
pub const LAST_ENTRY_ID: &str = "LastEntryId";

/// Term stored for explicit null values.
pub const NULL_VALUE: &[u8] = b"\0@null";
/// Term stored for empty strings, so that "" never reaches the dictionary.
pub const EMPTY_VALUE: &[u8] = b"\0@empty";

pub const LONG_TREE_SUFFIX: &str = "\0L";
pub const DOUBLE_TREE_SUFFIX: &str = "\0D";
pub const LENGTHS_TREE_SUFFIX: &str = "\0N";
pub const SUGGESTIONS_TREE_SUFFIX: &str = "\0S";

pub const TOTAL_LENGTH_SUFFIX: &str = "\0TotalLength";
pub const ENTRIES_WITH_FIELD_SUFFIX: &str = "\0EntriesWithField";

/// Geohash prefixes indexed for every spatial point.
pub const GEOHASH_MAX_PRECISION: usize = 9;

/// Terms longer than this are cut before they reach a dictionary.
pub const MAX_TERM_LENGTH: usize = 512;

/// Key tags inside a suggestions tree.
pub const SUGGESTION_TERM_TAG: u8 = 0;
pub const SUGGESTION_NGRAM_TAG: u8 = 1;
