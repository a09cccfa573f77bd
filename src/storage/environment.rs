use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use parking_lot::RwLock;
use tracing::info;
use crate::core::error::{Error, Result};
use crate::storage::persistence;
use crate::storage::transaction::{ReadTransaction, StoreState, WriteTransaction};

#[derive(Debug, Clone, Default)]
pub struct EnvironmentOptions {
    /// Directory holding the durable snapshot. `None` keeps everything in memory.
    pub path: Option<PathBuf>,
    pub compress_snapshots: bool,
}

impl EnvironmentOptions {
    pub fn durable(path: impl Into<PathBuf>) -> Self {
        EnvironmentOptions {
            path: Some(path.into()),
            compress_snapshots: true,
        }
    }
}

pub(crate) struct EnvironmentInner {
    pub(crate) current: RwLock<Arc<StoreState>>,
    pub(crate) writer_active: AtomicBool,
    pub(crate) options: EnvironmentOptions,
}

/// Transactional record/tree store the index is built on.
///
/// Readers get immutable snapshots; at most one write transaction may be open
/// at any time and its changes become visible only when it commits.
#[derive(Clone)]
pub struct Environment {
    inner: Arc<EnvironmentInner>,
}

impl Environment {
    pub fn in_memory() -> Self {
        Self::with_state(EnvironmentOptions::default(), StoreState::default())
    }

    pub fn open(options: EnvironmentOptions) -> Result<Self> {
        let state = match &options.path {
            Some(path) => {
                std::fs::create_dir_all(path)?;
                match persistence::load(path)? {
                    Some(state) => {
                        info!(path = %path.display(), version = state.version, "environment recovered");
                        state
                    }
                    None => StoreState::default(),
                }
            }
            None => StoreState::default(),
        };
        Ok(Self::with_state(options, state))
    }

    fn with_state(options: EnvironmentOptions, state: StoreState) -> Self {
        Environment {
            inner: Arc::new(EnvironmentInner {
                current: RwLock::new(Arc::new(state)),
                writer_active: AtomicBool::new(false),
                options,
            }),
        }
    }

    pub fn read_txn(&self) -> ReadTransaction {
        ReadTransaction {
            state: self.inner.current.read().clone(),
        }
    }

    /// Opens the write transaction. Fails fast when another one is still open.
    pub fn write_txn(&self) -> Result<WriteTransaction> {
        if self
            .inner
            .writer_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::invalid_state("a write transaction is already open on this environment"));
        }
        let state = (**self.inner.current.read()).clone();
        Ok(WriteTransaction {
            env: self.inner.clone(),
            state,
            finished: false,
        })
    }

    pub fn version(&self) -> u64 {
        self.inner.current.read().version
    }

    pub fn is_durable(&self) -> bool {
        self.inner.options.path.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::storage::transaction::Transaction;

    #[test]
    fn second_writer_fails_fast() {
        let env = Environment::in_memory();
        let txn = env.write_txn().unwrap();
        let err = env.write_txn().err().unwrap();
        assert_eq!(err.kind, ErrorKind::InvalidState);
        drop(txn);
        assert!(env.write_txn().is_ok());
    }

    #[test]
    fn readers_keep_their_snapshot() {
        let env = Environment::in_memory();
        let mut txn = env.write_txn().unwrap();
        txn.write_i64("counter", 1);
        txn.commit().unwrap();

        let before = env.read_txn();
        let mut txn = env.write_txn().unwrap();
        txn.increment("counter", 41);
        txn.tree_add("terms", b"a", 7);
        txn.commit().unwrap();

        assert_eq!(before.read_i64("counter"), Some(1));
        assert_eq!(before.tree_get("terms", b"a"), None);
        let after = env.read_txn();
        assert_eq!(after.read_i64("counter"), Some(42));
        assert_eq!(after.tree_get("terms", b"a"), Some(7));
    }

    #[test]
    fn dropped_writer_rolls_back() {
        let env = Environment::in_memory();
        let mut txn = env.write_txn().unwrap();
        let container = txn.create_container("things");
        txn.allocate(container, b"payload").unwrap();
        drop(txn);
        assert!(env.read_txn().container_id("things").is_none());
    }
}
