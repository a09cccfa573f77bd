//! Embedded full-text index core.
//!
//! Entries are written through an [`IndexWriter`], which turns field values
//! into terms and keeps, per term, the ids of the entries holding it. Reads go
//! through an [`IndexSearcher`], which composes [`QueryMatch`] operators over a
//! snapshot of the [`Environment`].

pub mod analysis;
pub mod compression;
pub mod core;
pub mod entry;
pub mod index;
pub mod memory;
pub mod query;
pub mod schema;
pub mod scoring;
pub mod search;
pub mod simd;
pub mod storage;
pub mod writer;

pub use crate::core::config::IndexConfig;
pub use crate::core::error::{Error, ErrorKind, Result};
pub use crate::core::types::{FieldId, FieldValue, SpatialPoint};
pub use entry::{EntryBuilder, EntryReader};
pub use query::{collect_all, QueryCountConfidence, QueryMatch};
pub use schema::{FieldBinding, FieldIndexingMode, IndexFieldsMapping};
pub use scoring::Boosting;
pub use search::IndexSearcher;
pub use storage::{Environment, EnvironmentOptions};
pub use writer::{CommitStats, IndexWriter};
