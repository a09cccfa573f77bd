use crate::core::error::Result;
use crate::memory::buffer_pool::BufferPool;
use crate::query::matcher::{QueryCountConfidence, QueryMatch};
use crate::simd::SimdOps;

const DEFAULT_BATCH_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperation {
    And,
    Or,
    AndNot,
}

/// Read-ahead window over one side of an `Or`.
struct Lookahead {
    buffer: Vec<u64>,
    pos: usize,
    len: usize,
    done: bool,
}

impl Lookahead {
    fn new() -> Self {
        Lookahead { buffer: Vec::new(), pos: 0, len: 0, done: false }
    }

    fn peek<M: QueryMatch>(&mut self, source: &mut M, batch: usize) -> Result<Option<u64>> {
        if self.pos == self.len && !self.done {
            if self.buffer.len() != batch {
                self.buffer.resize(batch, 0);
            }
            self.len = source.fill(&mut self.buffer)?;
            self.pos = 0;
            self.done = self.len == 0;
        }
        Ok((self.pos < self.len).then(|| self.buffer[self.pos]))
    }

    fn advance(&mut self) {
        self.pos += 1;
    }
}

/// Boolean composition of two matches.
pub struct BinaryMatch<L, R> {
    operation: BinaryOperation,
    left: L,
    right: R,
    left_ahead: Lookahead,
    right_ahead: Lookahead,
    left_drives: bool,
    batch: usize,
    produced: u64,
    exhausted: bool,
}

impl<L: QueryMatch, R: QueryMatch> BinaryMatch<L, R> {
    fn new(operation: BinaryOperation, left: L, right: R) -> Self {
        let left_drives = left.count() <= right.count();
        BinaryMatch {
            operation,
            left,
            right,
            left_ahead: Lookahead::new(),
            right_ahead: Lookahead::new(),
            left_drives,
            batch: DEFAULT_BATCH_SIZE,
            produced: 0,
            exhausted: false,
        }
    }

    /// Ids present in both sides. Fill is driven by the side with the smaller count.
    pub fn and(left: L, right: R) -> Self {
        Self::new(BinaryOperation::And, left, right)
    }

    pub fn or(left: L, right: R) -> Self {
        Self::new(BinaryOperation::Or, left, right)
    }

    /// Ids of `left` missing from `right`.
    pub fn and_not(left: L, right: R) -> Self {
        Self::new(BinaryOperation::AndNot, left, right)
    }

    pub fn with_batch_size(mut self, batch: usize) -> Self {
        self.batch = batch.max(1);
        self
    }

    pub fn operation(&self) -> BinaryOperation {
        self.operation
    }

    fn fill_and(&mut self, buffer: &mut [u64]) -> Result<usize> {
        loop {
            let read = if self.left_drives {
                self.left.fill(buffer)?
            } else {
                self.right.fill(buffer)?
            };
            if read == 0 {
                return Ok(0);
            }
            let kept = if self.left_drives {
                self.right.and_with(buffer, read)?
            } else {
                self.left.and_with(buffer, read)?
            };
            if kept > 0 {
                return Ok(kept);
            }
        }
    }

    fn fill_or(&mut self, buffer: &mut [u64]) -> Result<usize> {
        let mut written = 0;
        while written < buffer.len() {
            let l = self.left_ahead.peek(&mut self.left, self.batch)?;
            let r = self.right_ahead.peek(&mut self.right, self.batch)?;
            let next = match (l, r) {
                (None, None) => break,
                (Some(a), None) => {
                    self.left_ahead.advance();
                    a
                }
                (None, Some(b)) => {
                    self.right_ahead.advance();
                    b
                }
                (Some(a), Some(b)) => {
                    if a <= b {
                        self.left_ahead.advance();
                    }
                    if b <= a {
                        self.right_ahead.advance();
                    }
                    a.min(b)
                }
            };
            buffer[written] = next;
            written += 1;
        }
        Ok(written)
    }

    fn fill_and_not(&mut self, buffer: &mut [u64]) -> Result<usize> {
        loop {
            let read = self.left.fill(buffer)?;
            if read == 0 {
                return Ok(0);
            }
            let mut hits = BufferPool::copy_of(&buffer[..read]);
            let excluded = self.right.and_with(&mut hits, read)?;
            let kept = SimdOps::difference_in_place(buffer, read, &hits[..excluded]);
            if kept > 0 {
                return Ok(kept);
            }
        }
    }
}

impl<L: QueryMatch, R: QueryMatch> QueryMatch for BinaryMatch<L, R> {
    fn count(&self) -> u64 {
        if self.exhausted {
            return self.produced;
        }
        match self.operation {
            BinaryOperation::And => self.left.count().min(self.right.count()),
            BinaryOperation::Or => self.left.count().saturating_add(self.right.count()),
            BinaryOperation::AndNot => self.left.count(),
        }
    }

    fn confidence(&self) -> QueryCountConfidence {
        if self.exhausted {
            return QueryCountConfidence::High;
        }
        match self.operation {
            BinaryOperation::And | BinaryOperation::Or => {
                self.left.confidence().combine(self.right.confidence())
            }
            BinaryOperation::AndNot => self.left.confidence().combine(QueryCountConfidence::Normal),
        }
    }

    fn is_boosting(&self) -> bool {
        match self.operation {
            BinaryOperation::AndNot => self.left.is_boosting(),
            _ => self.left.is_boosting() || self.right.is_boosting(),
        }
    }

    fn fill(&mut self, buffer: &mut [u64]) -> Result<usize> {
        if self.exhausted || buffer.is_empty() {
            return Ok(0);
        }
        let read = match self.operation {
            BinaryOperation::And => self.fill_and(buffer)?,
            BinaryOperation::Or => self.fill_or(buffer)?,
            BinaryOperation::AndNot => self.fill_and_not(buffer)?,
        };
        self.produced += read as u64;
        self.exhausted = read == 0;
        Ok(read)
    }

    fn and_with(&mut self, buffer: &mut [u64], count: usize) -> Result<usize> {
        if count == 0 {
            return Ok(0);
        }
        match self.operation {
            BinaryOperation::And => {
                let kept = self.left.and_with(buffer, count)?;
                if kept == 0 {
                    return Ok(0);
                }
                self.right.and_with(buffer, kept)
            }
            BinaryOperation::Or => {
                let mut left_hits = BufferPool::copy_of(&buffer[..count]);
                let l = self.left.and_with(&mut left_hits, count)?;
                let mut right_hits = BufferPool::copy_of(&buffer[..count]);
                let r = self.right.and_with(&mut right_hits, count)?;
                let merged = SimdOps::union_sorted(&left_hits[..l], &right_hits[..r]);
                buffer[..merged.len()].copy_from_slice(&merged);
                Ok(merged.len())
            }
            BinaryOperation::AndNot => {
                let kept = self.left.and_with(buffer, count)?;
                if kept == 0 {
                    return Ok(0);
                }
                let mut hits = BufferPool::copy_of(&buffer[..kept]);
                let excluded = self.right.and_with(&mut hits, kept)?;
                Ok(SimdOps::difference_in_place(buffer, kept, &hits[..excluded]))
            }
        }
    }

    fn score(&mut self, ids: &[u64], scores: &mut [f32], boost: f32) -> Result<()> {
        if self.left.is_boosting() {
            self.left.score(ids, scores, boost)?;
        }
        if self.operation != BinaryOperation::AndNot && self.right.is_boosting() {
            self.right.score(ids, scores, boost)?;
        }
        Ok(())
    }
}
