use bytes::Bytes;
use crate::compression::delta::DeltaDecoder;
use crate::core::error::Result;
use crate::index::{EntryIdEncodings, PostingList, PostingListIterator, SmallSet, TermId};
use crate::memory::buffer_pool::BufferPool;
use crate::query::matcher::{QueryCountConfidence, QueryMatch};
use crate::scoring::TermScorer;
use crate::simd::SimdOps;
use crate::storage::Transaction;

const AND_WITH_CHUNK: usize = 4096;

enum TermMatchKind {
    Empty,
    YieldOnce { encoded: u64, done: bool },
    YieldSmall { data: Bytes, decoder: DeltaDecoder },
    YieldSet { start: PostingListIterator, cursor: PostingListIterator },
}

/// Postings of a single term, whatever their representation.
pub struct TermMatch {
    kind: TermMatchKind,
    count: u64,
    scorer: Option<TermScorer>,
    simd: bool,
}

impl TermMatch {
    pub fn empty() -> TermMatch {
        TermMatch {
            kind: TermMatchKind::Empty,
            count: 0,
            scorer: None,
            simd: false,
        }
    }

    /// Opens the postings behind `term`. A missing term matches nothing.
    pub fn open(txn: &impl Transaction, term: Option<TermId>) -> Result<TermMatch> {
        let (kind, count) = match term {
            None => return Ok(Self::empty()),
            Some(TermId::Single(encoded)) => (TermMatchKind::YieldOnce { encoded, done: false }, 1),
            Some(TermId::Small(record)) => {
                let data = SmallSet::load(txn, record)?;
                let decoder = DeltaDecoder::new(data.clone())?;
                let count = decoder.remaining() as u64;
                (TermMatchKind::YieldSmall { data, decoder }, count)
            }
            Some(TermId::Set(record)) => {
                let list = PostingList::open(txn, record)?;
                let start = list.iter(txn)?;
                (
                    TermMatchKind::YieldSet { cursor: start.clone(), start },
                    list.number_of_entries(),
                )
            }
        };
        Ok(TermMatch {
            kind,
            count,
            scorer: None,
            simd: true,
        })
    }

    pub fn with_scorer(mut self, scorer: TermScorer) -> TermMatch {
        self.scorer = Some(scorer);
        self
    }

    /// Allows or forbids the vectorized intersection path.
    pub fn with_simd(mut self, simd: bool) -> TermMatch {
        self.simd = simd;
        self
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            TermMatchKind::Empty => "empty",
            TermMatchKind::YieldOnce { .. } => "once",
            TermMatchKind::YieldSmall { .. } => "small",
            TermMatchKind::YieldSet { .. } => "set",
        }
    }

    /// Frequency stored for `entry_id`, found by walking the postings from the start.
    pub fn frequency_of(&self, entry_id: u64) -> Result<Option<u32>> {
        match &self.kind {
            TermMatchKind::Empty => Ok(None),
            TermMatchKind::YieldOnce { encoded, .. } => {
                let (id, freq) = EntryIdEncodings::decode(*encoded);
                Ok((id == entry_id).then_some(freq))
            }
            TermMatchKind::YieldSmall { data, .. } => {
                let mut decoder = DeltaDecoder::new(data.clone())?;
                while let Some(value) = decoder.next_value()? {
                    let (id, freq) = EntryIdEncodings::decode(value);
                    if id >= entry_id {
                        return Ok((id == entry_id).then_some(freq));
                    }
                }
                Ok(None)
            }
            TermMatchKind::YieldSet { start, .. } => start.frequency_of(entry_id),
        }
    }

    fn and_with_set(start: &PostingListIterator, buffer: &mut [u64], count: usize, simd: bool) -> Result<usize> {
        let mut postings = start.clone();
        let mut found_ids = BufferPool::get(count);
        let mut chunk = BufferPool::get(AND_WITH_CHUNK.min(count.max(64)));
        let max = buffer[count - 1];
        let mut found = 0;
        let mut next = 0;

        while next < count {
            postings.seek(buffer[next])?;
            let read = postings.fill(&mut chunk, Some(max))?;
            if read == 0 {
                break;
            }
            EntryIdEncodings::discard_frequencies(&mut chunk[..read]);
            let last = chunk[read - 1];
            let end = next + buffer[next..count].partition_point(|v| *v <= last);
            found += SimdOps::intersect(&buffer[next..end], &chunk[..read], &mut found_ids[found..], simd);
            next = end;
        }

        buffer[..found].copy_from_slice(&found_ids[..found]);
        Ok(found)
    }
}

impl QueryMatch for TermMatch {
    fn count(&self) -> u64 {
        self.count
    }

    fn confidence(&self) -> QueryCountConfidence {
        QueryCountConfidence::High
    }

    fn is_boosting(&self) -> bool {
        self.scorer.is_some()
    }

    fn fill(&mut self, buffer: &mut [u64]) -> Result<usize> {
        if buffer.is_empty() {
            return Ok(0);
        }
        match &mut self.kind {
            TermMatchKind::Empty => Ok(0),
            TermMatchKind::YieldOnce { encoded, done } => {
                if *done {
                    return Ok(0);
                }
                *done = true;
                buffer[0] = EntryIdEncodings::decode_and_discard_frequency(*encoded);
                Ok(1)
            }
            TermMatchKind::YieldSmall { decoder, .. } => {
                let read = decoder.fill(buffer)?;
                EntryIdEncodings::discard_frequencies(&mut buffer[..read]);
                Ok(read)
            }
            TermMatchKind::YieldSet { cursor, .. } => {
                let read = cursor.fill(buffer, None)?;
                EntryIdEncodings::discard_frequencies(&mut buffer[..read]);
                Ok(read)
            }
        }
    }

    fn and_with(&mut self, buffer: &mut [u64], count: usize) -> Result<usize> {
        if count == 0 {
            return Ok(0);
        }
        match &self.kind {
            TermMatchKind::Empty => Ok(0),
            TermMatchKind::YieldOnce { encoded, .. } => {
                let id = EntryIdEncodings::decode_and_discard_frequency(*encoded);
                if buffer[..count].binary_search(&id).is_ok() {
                    buffer[0] = id;
                    Ok(1)
                } else {
                    Ok(0)
                }
            }
            TermMatchKind::YieldSmall { data, .. } => {
                // decoded from the start on every call
                let mut decoder = DeltaDecoder::new(data.clone())?;
                let mut ids = BufferPool::get(decoder.remaining());
                let read = decoder.fill(&mut ids)?;
                EntryIdEncodings::discard_frequencies(&mut ids[..read]);
                Ok(SimdOps::intersect_in_place(buffer, count, &ids[..read], false))
            }
            TermMatchKind::YieldSet { start, .. } => Self::and_with_set(start, buffer, count, self.simd),
        }
    }

    fn score(&mut self, ids: &[u64], scores: &mut [f32], boost: f32) -> Result<()> {
        let Some(scorer) = &self.scorer else {
            return Ok(());
        };
        for (id, score) in ids.iter().zip(scores.iter_mut()) {
            if let Some(frequency) = self.frequency_of(*id)? {
                *score += boost * scorer.score(*id, frequency);
            }
        }
        Ok(())
    }
}
