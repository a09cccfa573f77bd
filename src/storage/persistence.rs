use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::compression::compress::{CompressedBlock, CompressionType};
use crate::core::error::{Error, Result};
use crate::storage::transaction::{RecordMap, StoreState, TreeMap};

const SNAPSHOT_FILE: &str = "snapshot.bin";
const SNAPSHOT_TMP_FILE: &str = "snapshot.tmp";

// [ HEADER (format, checksum, committed_at) ]
// [ BODY (optionally lz4) = bincode(PersistedState) ]
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotHeader {
    format: u32,
    version: u64,
    checksum: u32,
    committed_at: DateTime<Utc>,
}

impl SnapshotHeader {
    const FORMAT: u32 = 1;
}

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    header: SnapshotHeader,
    body: CompressedBlock,
}

#[derive(Serialize, Deserialize)]
struct PersistedState {
    version: u64,
    next_record_id: u64,
    containers: Vec<(String, u32, Vec<(u64, Vec<u8>)>)>,
    trees: Vec<(String, Vec<(Vec<u8>, i64)>)>,
    root: Vec<(String, i64)>,
}

impl PersistedState {
    fn from_state(state: &StoreState) -> Self {
        let mut containers: Vec<_> = state
            .containers
            .iter()
            .map(|(name, id)| {
                let records = state
                    .records
                    .get(id)
                    .map(|records| records.iter().map(|(k, v)| (*k, v.to_vec())).collect())
                    .unwrap_or_default();
                (name.clone(), *id, records)
            })
            .collect();
        containers.sort_by_key(|(_, id, _)| *id);

        let mut trees: Vec<_> = state
            .trees
            .iter()
            .map(|(name, tree)| (name.clone(), tree.iter().map(|(k, v)| (k.clone(), *v)).collect()))
            .collect();
        trees.sort_by(|a: &(String, Vec<_>), b| a.0.cmp(&b.0));

        PersistedState {
            version: state.version,
            next_record_id: state.next_record_id,
            containers,
            trees,
            root: state.root.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        }
    }

    fn into_state(self) -> StoreState {
        let mut containers = HashMap::new();
        let mut records = HashMap::new();
        for (name, id, entries) in self.containers {
            containers.insert(name, id);
            let map: RecordMap = entries.into_iter().map(|(k, v)| (k, Bytes::from(v))).collect();
            records.insert(id, Arc::new(map));
        }
        let trees = self
            .trees
            .into_iter()
            .map(|(name, entries)| (name, Arc::new(entries.into_iter().collect::<TreeMap>())))
            .collect();

        StoreState {
            version: self.version,
            next_record_id: self.next_record_id,
            containers,
            records,
            trees,
            root: Arc::new(self.root.into_iter().collect::<BTreeMap<_, _>>()),
        }
    }
}

/// Writes the whole state next to the live snapshot, then renames it into place.
pub(crate) fn save(dir: &Path, state: &StoreState, compress: bool) -> Result<()> {
    let body = bincode::serialize(&PersistedState::from_state(state))?;
    let compression = if compress { CompressionType::Lz4 } else { CompressionType::None };
    let block = CompressedBlock::compress(&body, compression);

    let mut hasher = Hasher::new();
    hasher.update(&block.data);

    let file = SnapshotFile {
        header: SnapshotHeader {
            format: SnapshotHeader::FORMAT,
            version: state.version,
            checksum: hasher.finalize(),
            committed_at: Utc::now(),
        },
        body: block,
    };

    let tmp = dir.join(SNAPSHOT_TMP_FILE);
    fs::write(&tmp, bincode::serialize(&file)?)?;
    fs::rename(&tmp, dir.join(SNAPSHOT_FILE))?;
    debug!(version = state.version, bytes = body.len(), "snapshot persisted");
    Ok(())
}

pub(crate) fn load(dir: &Path) -> Result<Option<StoreState>> {
    let path = dir.join(SNAPSHOT_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let data = fs::read(&path)?;
    let file: SnapshotFile = bincode::deserialize(&data)?;
    if file.header.format != SnapshotHeader::FORMAT {
        return Err(Error::corruption(format!("unknown snapshot format {}", file.header.format)));
    }

    let mut hasher = Hasher::new();
    hasher.update(&file.body.data);
    if hasher.finalize() != file.header.checksum {
        return Err(Error::corruption(format!("snapshot checksum mismatch in {}", path.display())));
    }

    let persisted: PersistedState = bincode::deserialize(&file.body.decompress()?)?;
    Ok(Some(persisted.into_state()))
}
