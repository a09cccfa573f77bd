use std::cmp::Ordering;
use std::collections::BinaryHeap;
use serde::{Deserialize, Serialize};

/// Value an entry is ranked by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SortValue {
    Score(f32),
    Long(i64),
    Double(f64),
    Bytes(Vec<u8>),
    /// The entry has no usable value; always ranked last.
    Missing,
}

impl SortValue {
    fn compare(&self, other: &SortValue) -> Ordering {
        match (self, other) {
            (SortValue::Missing, SortValue::Missing) => Ordering::Equal,
            (SortValue::Missing, _) => Ordering::Greater,
            (_, SortValue::Missing) => Ordering::Less,
            (SortValue::Score(a), SortValue::Score(b)) => a.total_cmp(b),
            (SortValue::Long(a), SortValue::Long(b)) => a.cmp(b),
            (SortValue::Double(a), SortValue::Double(b)) => a.total_cmp(b),
            (SortValue::Bytes(a), SortValue::Bytes(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortValue::Score(_) => 0,
            SortValue::Long(_) => 1,
            SortValue::Double(_) => 2,
            SortValue::Bytes(_) => 3,
            SortValue::Missing => 4,
        }
    }
}

/// One ranked entry of a sorted result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub entry_id: u64,
    pub value: SortValue,
}

/// Ordering wrapper: `Less` means "comes first in the result".
#[derive(Debug, Clone)]
struct Ranked {
    entry: RankedEntry,
    descending: bool,
}

impl Ranked {
    fn order(&self, other: &Ranked) -> Ordering {
        let by_value = match (&self.entry.value, &other.entry.value) {
            (SortValue::Missing, _) | (_, SortValue::Missing) => self.entry.value.compare(&other.entry.value),
            (a, b) if self.descending => b.compare(a),
            (a, b) => a.compare(b),
        };
        by_value.then(self.entry.entry_id.cmp(&other.entry.entry_id))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.order(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order(other)
    }
}

/// Keeps the best `k` entries seen so far (all of them when `k` is `None`).
///
/// The heap top is the worst retained entry, so a full collector rejects a
/// candidate with a single comparison.
pub struct TopKCollector {
    heap: BinaryHeap<Ranked>,
    k: Option<usize>,
    descending: bool,
    total_collected: usize,
}

impl TopKCollector {
    pub fn new(k: Option<usize>, descending: bool) -> Self {
        TopKCollector {
            heap: BinaryHeap::with_capacity(k.map_or(0, |k| k + 1)),
            k,
            descending,
            total_collected: 0,
        }
    }

    pub fn collect(&mut self, entry_id: u64, value: SortValue) {
        self.total_collected += 1;
        if self.k == Some(0) {
            return;
        }
        let candidate = Ranked { entry: RankedEntry { entry_id, value }, descending: self.descending };
        if let (Some(k), Some(worst)) = (self.k, self.heap.peek()) {
            if self.heap.len() >= k && candidate >= *worst {
                return;
            }
        }
        self.heap.push(candidate);
        if self.k.is_some_and(|k| self.heap.len() > k) {
            self.heap.pop();
        }
    }

    pub fn total_collected(&self) -> usize {
        self.total_collected
    }

    /// Retained entries, best first.
    pub fn into_sorted(self) -> Vec<RankedEntry> {
        self.heap.into_sorted_vec().into_iter().map(|ranked| ranked.entry).collect()
    }
}
