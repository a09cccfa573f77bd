pub mod environment;
pub mod persistence;
pub mod transaction;
pub mod tree;

pub use environment::{Environment, EnvironmentOptions};
pub use transaction::{ContainerId, ReadTransaction, RecordId, Transaction, WriteTransaction};
pub use tree::TreeCursor;
