use crate::core::error::Result;

/// How far a match's reported count can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueryCountConfidence {
    Low,
    Normal,
    /// The count is exact.
    High,
}

impl QueryCountConfidence {
    pub fn combine(self, other: QueryCountConfidence) -> QueryCountConfidence {
        self.min(other)
    }
}

/// A composable query operator producing ascending, duplicate-free entry ids.
///
/// `fill` is pull-based: call it until it returns 0; once it has returned 0
/// it keeps returning 0. `and_with` intersects a sorted candidate buffer with
/// everything the match would produce and does not disturb `fill` progress.
pub trait QueryMatch {
    fn count(&self) -> u64;

    fn confidence(&self) -> QueryCountConfidence;

    fn is_boosting(&self) -> bool {
        false
    }

    /// Writes up to `buffer.len()` ids and returns how many were written.
    fn fill(&mut self, buffer: &mut [u64]) -> Result<usize>;

    /// Keeps in `buffer[..count]` only ids this match contains; returns the
    /// new length.
    fn and_with(&mut self, buffer: &mut [u64], count: usize) -> Result<usize>;

    /// Adds this match's contribution, scaled by `boost`, to `scores[i]` for
    /// each `ids[i]` it contains. Non-boosting matches add nothing.
    fn score(&mut self, ids: &[u64], scores: &mut [f32], boost: f32) -> Result<()> {
        let _ = (ids, scores, boost);
        Ok(())
    }
}

impl<M: QueryMatch + ?Sized> QueryMatch for Box<M> {
    fn count(&self) -> u64 {
        (**self).count()
    }

    fn confidence(&self) -> QueryCountConfidence {
        (**self).confidence()
    }

    fn is_boosting(&self) -> bool {
        (**self).is_boosting()
    }

    fn fill(&mut self, buffer: &mut [u64]) -> Result<usize> {
        (**self).fill(buffer)
    }

    fn and_with(&mut self, buffer: &mut [u64], count: usize) -> Result<usize> {
        (**self).and_with(buffer, count)
    }

    fn score(&mut self, ids: &[u64], scores: &mut [f32], boost: f32) -> Result<()> {
        (**self).score(ids, scores, boost)
    }
}

/// Drains a match into a vector. Meant for tests and small result sets.
pub fn collect_all<M: QueryMatch + ?Sized>(query: &mut M, batch: usize) -> Result<Vec<u64>> {
    let mut ids = Vec::new();
    let mut buffer = vec![0u64; batch.max(1)];
    loop {
        let read = query.fill(&mut buffer)?;
        if read == 0 {
            return Ok(ids);
        }
        ids.extend_from_slice(&buffer[..read]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_combines_to_weakest() {
        use QueryCountConfidence::*;
        assert_eq!(High.combine(Normal), Normal);
        assert_eq!(Low.combine(High), Low);
        assert!(Low < Normal && Normal < High);
    }
}
