use crate::core::error::Result;
use crate::entry::EntryStore;
use crate::query::matcher::{QueryCountConfidence, QueryMatch};

/// Every live entry of a snapshot, ascending.
pub struct AllEntriesMatch {
    store: EntryStore,
    last: Option<u64>,
    done: bool,
}

impl AllEntriesMatch {
    pub fn new(store: EntryStore) -> Self {
        AllEntriesMatch { store, last: None, done: false }
    }
}

impl QueryMatch for AllEntriesMatch {
    fn count(&self) -> u64 {
        self.store.len() as u64
    }

    fn confidence(&self) -> QueryCountConfidence {
        QueryCountConfidence::High
    }

    fn fill(&mut self, buffer: &mut [u64]) -> Result<usize> {
        if self.done {
            return Ok(0);
        }
        let mut read = 0;
        for (slot, id) in buffer.iter_mut().zip(self.store.ids_after(self.last)) {
            *slot = id;
            read += 1;
        }
        if read == 0 {
            self.done = true;
        } else {
            self.last = Some(buffer[read - 1]);
        }
        Ok(read)
    }

    fn and_with(&mut self, buffer: &mut [u64], count: usize) -> Result<usize> {
        let mut kept = 0;
        for i in 0..count {
            let id = buffer[i];
            if self.store.contains(id) {
                buffer[kept] = id;
                kept += 1;
            }
        }
        Ok(kept)
    }
}
