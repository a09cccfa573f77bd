use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use bytes::Bytes;
use tracing::debug;
use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::environment::EnvironmentInner;
use crate::storage::tree::TreeCursor;

pub type ContainerId = u32;
pub type RecordId = u64;
pub type RecordMap = BTreeMap<RecordId, Bytes>;
pub type TreeMap = BTreeMap<Vec<u8>, i64>;

/// Committed (or in-flight) contents of an environment.
///
/// Every container, tree and the root table sit behind their own `Arc`, so a
/// write transaction only copies what it touches and snapshots held by
/// readers are never disturbed.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub(crate) version: u64,
    pub(crate) next_record_id: u64,
    pub(crate) containers: HashMap<String, ContainerId>,
    pub(crate) records: HashMap<ContainerId, Arc<RecordMap>>,
    pub(crate) trees: HashMap<String, Arc<TreeMap>>,
    pub(crate) root: Arc<BTreeMap<String, i64>>,
}

impl StoreState {
    pub fn version(&self) -> u64 {
        self.version
    }
}

/// Read operations available on both read and write transactions.
pub trait Transaction {
    fn state(&self) -> &StoreState;

    fn container_id(&self, name: &str) -> Option<ContainerId> {
        self.state().containers.get(name).copied()
    }

    fn get(&self, container: ContainerId, record: RecordId) -> Result<Bytes> {
        self.state()
            .records
            .get(&container)
            .and_then(|records| records.get(&record))
            .cloned()
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::NotFound,
                    format!("record {} not found in container {}", record, container),
                )
            })
    }

    fn try_get(&self, container: ContainerId, record: RecordId) -> Option<Bytes> {
        self.state()
            .records
            .get(&container)
            .and_then(|records| records.get(&record))
            .cloned()
    }

    /// Snapshot of a container's records, ordered by record id.
    fn container_records(&self, container: ContainerId) -> Option<Arc<RecordMap>> {
        self.state().records.get(&container).cloned()
    }

    fn tree(&self, name: &str) -> Option<Arc<TreeMap>> {
        self.state().trees.get(name).cloned()
    }

    fn tree_get(&self, name: &str, key: &[u8]) -> Option<i64> {
        self.state().trees.get(name).and_then(|tree| tree.get(key).copied())
    }

    fn tree_len(&self, name: &str) -> usize {
        self.state().trees.get(name).map(|tree| tree.len()).unwrap_or(0)
    }

    fn tree_cursor(&self, name: &str) -> TreeCursor {
        TreeCursor::new(self.tree(name).unwrap_or_default())
    }

    fn read_i64(&self, key: &str) -> Option<i64> {
        self.state().root.get(key).copied()
    }
}

/// Point-in-time view of the environment.
#[derive(Debug, Clone)]
pub struct ReadTransaction {
    pub(crate) state: Arc<StoreState>,
}

impl Transaction for ReadTransaction {
    fn state(&self) -> &StoreState {
        &self.state
    }
}

/// The single write transaction of an environment.
///
/// Dropping it without calling [`WriteTransaction::commit`] discards every change.
pub struct WriteTransaction {
    pub(crate) env: Arc<EnvironmentInner>,
    pub(crate) state: StoreState,
    pub(crate) finished: bool,
}

impl Transaction for WriteTransaction {
    fn state(&self) -> &StoreState {
        &self.state
    }
}

impl WriteTransaction {
    pub fn create_container(&mut self, name: &str) -> ContainerId {
        if let Some(id) = self.state.containers.get(name) {
            return *id;
        }
        let id = self.state.containers.len() as ContainerId + 1;
        self.state.containers.insert(name.to_string(), id);
        self.state.records.insert(id, Arc::new(RecordMap::new()));
        id
    }

    fn records_mut(&mut self, container: ContainerId) -> Result<&mut RecordMap> {
        self.state
            .records
            .get_mut(&container)
            .map(Arc::make_mut)
            .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("container {} does not exist", container)))
    }

    /// Stores `data` as a new record; record ids grow monotonically across the environment.
    pub fn allocate(&mut self, container: ContainerId, data: &[u8]) -> Result<RecordId> {
        self.state.next_record_id += 1;
        let id = self.state.next_record_id;
        self.records_mut(container)?.insert(id, Bytes::copy_from_slice(data));
        Ok(id)
    }

    pub fn update(&mut self, container: ContainerId, record: RecordId, data: &[u8]) -> Result<()> {
        let records = self.records_mut(container)?;
        match records.get_mut(&record) {
            Some(slot) => {
                *slot = Bytes::copy_from_slice(data);
                Ok(())
            }
            None => Err(Error::new(
                ErrorKind::NotFound,
                format!("cannot update missing record {} in container {}", record, container),
            )),
        }
    }

    pub fn delete(&mut self, container: ContainerId, record: RecordId) -> Result<()> {
        match self.records_mut(container)?.remove(&record) {
            Some(_) => Ok(()),
            None => Err(Error::new(
                ErrorKind::NotFound,
                format!("cannot delete missing record {} in container {}", record, container),
            )),
        }
    }

    fn tree_mut(&mut self, name: &str) -> &mut TreeMap {
        let tree = self.state.trees.entry(name.to_string()).or_default();
        Arc::make_mut(tree)
    }

    pub fn tree_add(&mut self, name: &str, key: &[u8], value: i64) {
        debug_assert!(!key.is_empty(), "empty keys are never stored in a compact tree");
        self.tree_mut(name).insert(key.to_vec(), value);
    }

    pub fn tree_remove(&mut self, name: &str, key: &[u8]) -> Option<i64> {
        if !self.state.trees.contains_key(name) {
            return None;
        }
        self.tree_mut(name).remove(key)
    }

    pub fn write_i64(&mut self, key: &str, value: i64) {
        Arc::make_mut(&mut self.state.root).insert(key.to_string(), value);
    }

    pub fn increment(&mut self, key: &str, delta: i64) -> i64 {
        let root = Arc::make_mut(&mut self.state.root);
        let slot = root.entry(key.to_string()).or_insert(0);
        *slot += delta;
        *slot
    }

    /// Publishes every change atomically. Durable environments persist the new
    /// state before it becomes visible to readers.
    pub fn commit(mut self) -> Result<u64> {
        self.state.version += 1;
        let state = std::mem::take(&mut self.state);
        if let Some(path) = &self.env.options.path {
            crate::storage::persistence::save(path, &state, self.env.options.compress_snapshots)?;
        }
        let version = state.version;
        *self.env.current.write() = Arc::new(state);
        self.finished = true;
        debug!(version, "write transaction committed");
        Ok(version)
    }
}

impl Drop for WriteTransaction {
    fn drop(&mut self) {
        if !self.finished {
            debug!(version = self.state.version, "write transaction rolled back");
        }
        self.env.writer_active.store(false, Ordering::Release);
    }
}
