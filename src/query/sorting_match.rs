use tracing::debug;
use crate::core::error::{Error, ErrorKind, Result};
use crate::entry::{EntryStore, FieldItem};
use crate::query::matcher::{QueryCountConfidence, QueryMatch};
use crate::query::results::{RankedEntry, SortValue, TopKCollector};
use crate::query::unary_match::FieldRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// How a field value is interpreted when ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKind {
    Lexical,
    Long,
    Double,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderBy {
    /// Highest relevance first.
    Score,
    Field { field: FieldRef, direction: SortDirection, kind: SortKind },
}

fn sort_value(item: FieldItem<'_>, kind: SortKind) -> Option<SortValue> {
    match (kind, item) {
        (_, FieldItem::Null) => None,
        (SortKind::Lexical, FieldItem::Empty) => Some(SortValue::Bytes(Vec::new())),
        (SortKind::Lexical, FieldItem::Raw(bytes)) => Some(SortValue::Bytes(bytes.to_vec())),
        (SortKind::Lexical, FieldItem::Tuple { text, .. }) => Some(SortValue::Bytes(text.to_vec())),
        (SortKind::Long, FieldItem::Tuple { long, .. }) => Some(SortValue::Long(long)),
        (SortKind::Double, FieldItem::Tuple { double, .. }) => Some(SortValue::Double(double)),
        (SortKind::Long, FieldItem::Raw(bytes)) => {
            std::str::from_utf8(bytes).ok()?.parse().ok().map(SortValue::Long)
        }
        (SortKind::Double, FieldItem::Raw(bytes)) => {
            std::str::from_utf8(bytes).ok()?.parse().ok().map(SortValue::Double)
        }
        (SortKind::Long | SortKind::Double, FieldItem::Empty) => None,
    }
}

/// Terminal operator that drains its inner match and yields ids in ranked order.
///
/// The output is ordered by the sort key, not by entry id, so a sorting match
/// cannot take part in an intersection.
pub struct SortingMatch<M> {
    inner: M,
    store: EntryStore,
    order: OrderBy,
    take: Option<usize>,
    batch: usize,
    results: Option<Vec<RankedEntry>>,
    pos: usize,
}

impl<M: QueryMatch> SortingMatch<M> {
    pub fn new(inner: M, store: EntryStore, order: OrderBy, take: Option<usize>, batch: usize) -> Self {
        SortingMatch {
            inner,
            store,
            order,
            take,
            batch: batch.max(1),
            results: None,
            pos: 0,
        }
    }

    pub fn order_by_score(inner: M, store: EntryStore, take: Option<usize>, batch: usize) -> Self {
        Self::new(inner, store, OrderBy::Score, take, batch)
    }

    fn value_of(&self, entry_id: u64, field: &FieldRef, kind: SortKind) -> Result<SortValue> {
        let reader = self.store.reader(entry_id)?;
        let value = field
            .read(&reader)
            .and_then(|field| field.read_many().find_map(|item| sort_value(item, kind)));
        Ok(value.unwrap_or(SortValue::Missing))
    }

    fn materialize(&mut self) -> Result<()> {
        if self.results.is_some() {
            return Ok(());
        }
        let descending = match &self.order {
            OrderBy::Score => true,
            OrderBy::Field { direction, .. } => *direction == SortDirection::Descending,
        };
        let mut collector = TopKCollector::new(self.take, descending);
        let mut ids = vec![0u64; self.batch];
        let mut scores = vec![0f32; self.batch];
        let order = self.order.clone();
        loop {
            let read = self.inner.fill(&mut ids)?;
            if read == 0 {
                break;
            }
            match &order {
                OrderBy::Score => {
                    scores[..read].fill(0.0);
                    self.inner.score(&ids[..read], &mut scores[..read], 1.0)?;
                    for (id, score) in ids[..read].iter().zip(&scores[..read]) {
                        collector.collect(*id, SortValue::Score(*score));
                    }
                }
                OrderBy::Field { field, kind, .. } => {
                    for id in &ids[..read] {
                        collector.collect(*id, self.value_of(*id, field, *kind)?);
                    }
                }
            }
        }
        debug!(
            collected = collector.total_collected(),
            take = ?self.take,
            "sorting match materialized"
        );
        self.results = Some(collector.into_sorted());
        Ok(())
    }

    /// Ranked entries with the value each was ordered by.
    pub fn results(&mut self) -> Result<&[RankedEntry]> {
        self.materialize()?;
        Ok(self.results.as_deref().unwrap_or_default())
    }
}

impl<M: QueryMatch> QueryMatch for SortingMatch<M> {
    fn count(&self) -> u64 {
        match &self.results {
            Some(results) => results.len() as u64,
            None => {
                let count = self.inner.count();
                self.take.map_or(count, |take| count.min(take as u64))
            }
        }
    }

    fn confidence(&self) -> QueryCountConfidence {
        if self.results.is_some() {
            QueryCountConfidence::High
        } else {
            self.inner.confidence()
        }
    }

    fn is_boosting(&self) -> bool {
        self.inner.is_boosting()
    }

    fn fill(&mut self, buffer: &mut [u64]) -> Result<usize> {
        self.materialize()?;
        let Some(results) = &self.results else {
            return Ok(0);
        };
        let n = (results.len() - self.pos).min(buffer.len());
        for (slot, entry) in buffer.iter_mut().zip(&results[self.pos..self.pos + n]) {
            *slot = entry.entry_id;
        }
        self.pos += n;
        Ok(n)
    }

    fn and_with(&mut self, _buffer: &mut [u64], _count: usize) -> Result<usize> {
        Err(Error::new(
            ErrorKind::UnsupportedOperation,
            "a sorting match is terminal and cannot be intersected",
        ))
    }

    fn score(&mut self, ids: &[u64], scores: &mut [f32], boost: f32) -> Result<()> {
        self.inner.score(ids, scores, boost)
    }
}
