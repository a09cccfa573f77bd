use tracing::trace;
use crate::core::config::IndexConfig;
use crate::core::error::Result;
use crate::index::{TermDictionary, TermId};
use crate::query::matcher::{QueryCountConfidence, QueryMatch};
use crate::query::term_match::TermMatch;
use crate::query::term_provider::TermProvider;
use crate::scoring::{Boosting, TermScorer};
use crate::simd::SimdOps;
use crate::storage::ReadTransaction;

enum Stage {
    Pending,
    Empty,
    Streaming(TermMatch),
    Materialized { ids: Vec<u64>, pos: usize },
}

/// OR over every term a [`TermProvider`] yields.
///
/// A provider with a single term streams straight from that term's postings.
/// With more terms the leaves are drained one after the other and the merged
/// ids are sorted only when a leaf started below the previous leaf's last id.
pub struct MultiTermMatch<P: TermProvider> {
    txn: ReadTransaction,
    provider: P,
    field: String,
    boosting: Option<Boosting>,
    config: IndexConfig,
    stage: Stage,
    count: u64,
    confidence: QueryCountConfidence,
}

impl<P: TermProvider> MultiTermMatch<P> {
    pub fn new(
        txn: ReadTransaction,
        mut provider: P,
        field: impl Into<String>,
        boosting: Option<Boosting>,
        config: IndexConfig,
    ) -> Result<MultiTermMatch<P>> {
        let mut count = 0;
        let mut terms = 0;
        while let Some((_, term)) = provider.next_term()? {
            count += TermDictionary::cardinality(&txn, term)?;
            terms += 1;
        }
        provider.reset();
        let confidence = if terms <= 1 {
            QueryCountConfidence::High
        } else {
            QueryCountConfidence::Normal
        };
        trace!(provider = provider.name(), terms, count, "multi-term match opened");
        Ok(MultiTermMatch {
            txn,
            provider,
            field: field.into(),
            boosting,
            config,
            stage: Stage::Pending,
            count,
            confidence,
        })
    }

    fn leaf(&self, term: TermId) -> Result<TermMatch> {
        Ok(TermMatch::open(&self.txn, Some(term))?.with_simd(self.config.simd))
    }

    fn resolve(&mut self) -> Result<()> {
        if !matches!(self.stage, Stage::Pending) {
            return Ok(());
        }
        let Some((_, first)) = self.provider.next_term()? else {
            self.stage = Stage::Empty;
            return Ok(());
        };
        let Some((_, second)) = self.provider.next_term()? else {
            self.stage = Stage::Streaming(self.leaf(first)?);
            return Ok(());
        };

        let mut ids: Vec<u64> = Vec::with_capacity(self.count as usize);
        let mut buffer = vec![0u64; self.config.fill_batch_size];
        let mut needs_sort = false;
        let mut next = Some(second);
        let mut term = first;
        loop {
            let mut leaf = self.leaf(term)?;
            let mut first_fill = true;
            loop {
                let read = leaf.fill(&mut buffer)?;
                if read == 0 {
                    break;
                }
                if first_fill && ids.last().is_some_and(|last| *last >= buffer[0]) {
                    needs_sort = true;
                }
                first_fill = false;
                ids.extend_from_slice(&buffer[..read]);
            }
            term = match next.take() {
                Some(term) => term,
                None => match self.provider.next_term()? {
                    Some((_, term)) => term,
                    None => break,
                },
            };
        }
        if needs_sort {
            ids.sort_unstable();
            ids.dedup();
        }
        self.provider.reset();
        self.count = ids.len() as u64;
        self.confidence = QueryCountConfidence::High;
        self.stage = Stage::Materialized { ids, pos: 0 };
        Ok(())
    }

    fn score_leaves(&mut self, ids: &[u64], scores: &mut [f32], boost: f32, boosting: Boosting) -> Result<()> {
        while let Some((_, term)) = self.provider.next_term()? {
            let cardinality = TermDictionary::cardinality(&self.txn, term)?;
            let scorer = TermScorer::new(&self.txn, &self.field, boosting, cardinality, &self.config);
            TermMatch::open(&self.txn, Some(term))?
                .with_scorer(scorer)
                .score(ids, scores, boost)?;
        }
        Ok(())
    }
}

impl<P: TermProvider> QueryMatch for MultiTermMatch<P> {
    fn count(&self) -> u64 {
        self.count
    }

    fn confidence(&self) -> QueryCountConfidence {
        self.confidence
    }

    fn is_boosting(&self) -> bool {
        self.boosting.is_some()
    }

    fn fill(&mut self, buffer: &mut [u64]) -> Result<usize> {
        self.resolve()?;
        match &mut self.stage {
            Stage::Pending | Stage::Empty => Ok(0),
            Stage::Streaming(leaf) => leaf.fill(buffer),
            Stage::Materialized { ids, pos } => {
                let n = (ids.len() - *pos).min(buffer.len());
                buffer[..n].copy_from_slice(&ids[*pos..*pos + n]);
                *pos += n;
                Ok(n)
            }
        }
    }

    fn and_with(&mut self, buffer: &mut [u64], count: usize) -> Result<usize> {
        self.resolve()?;
        match &mut self.stage {
            Stage::Pending | Stage::Empty => Ok(0),
            Stage::Streaming(leaf) => leaf.and_with(buffer, count),
            Stage::Materialized { ids, .. } => {
                Ok(SimdOps::intersect_in_place(buffer, count, ids, self.config.simd))
            }
        }
    }

    fn score(&mut self, ids: &[u64], scores: &mut [f32], boost: f32) -> Result<()> {
        let Some(boosting) = self.boosting else {
            return Ok(());
        };
        self.provider.reset();
        let result = self.score_leaves(ids, scores, boost, boosting);
        self.provider.reset();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::analysis::StandardAnalyzer;
    use crate::entry::EntryBuilder;
    use crate::query::matcher::collect_all;
    use crate::query::term_provider::{TermFilter, TreeTermProvider};
    use crate::schema::IndexFieldsMapping;
    use crate::storage::Environment;
    use crate::writer::IndexWriter;

    fn index(contents: &[&str]) -> (Environment, Vec<u64>) {
        let env = Environment::in_memory();
        let mapping = IndexFieldsMapping::builder()
            .analyzed("Content", Arc::new(StandardAnalyzer::standard()))
            .build()
            .unwrap();
        let mut writer = IndexWriter::new(&env, mapping, IndexConfig::default()).unwrap();
        let mut ids = Vec::new();
        for (i, content) in contents.iter().enumerate() {
            let mut builder = EntryBuilder::new();
            builder.write(0, *content);
            ids.push(writer.index(format!("e/{}", i).as_bytes(), &builder.finish().unwrap()).unwrap());
        }
        writer.commit().unwrap();
        (env, ids)
    }

    fn starts_with(env: &Environment, prefix: &str) -> MultiTermMatch<TreeTermProvider> {
        let txn = env.read_txn();
        let provider = TreeTermProvider::new(&txn, "Content", TermFilter::StartsWith(prefix.as_bytes().to_vec()));
        MultiTermMatch::new(txn, provider, "Content", None, IndexConfig::default()).unwrap()
    }

    #[test]
    fn merges_leaves_in_order() {
        let (env, ids) = index(&["apple", "apricot", "apple banana", "avocado"]);
        let mut query = starts_with(&env, "ap");
        assert_eq!(query.count(), 3);
        assert_eq!(query.confidence(), QueryCountConfidence::Normal);

        assert_eq!(collect_all(&mut query, 2).unwrap(), vec![ids[0], ids[1], ids[2]]);
        assert_eq!(query.confidence(), QueryCountConfidence::High);
        assert_eq!(query.fill(&mut [0; 4]).unwrap(), 0);

        let mut candidates = vec![ids[1], ids[3]];
        assert_eq!(query.and_with(&mut candidates, 2).unwrap(), 1);
        assert_eq!(candidates[0], ids[1]);
    }

    #[test]
    fn single_leaf_streams() {
        let (env, ids) = index(&["apple", "pear", "apple"]);
        let mut query = starts_with(&env, "app");
        assert_eq!(query.confidence(), QueryCountConfidence::High);
        assert_eq!(collect_all(&mut query, 1).unwrap(), vec![ids[0], ids[2]]);

        let mut none = starts_with(&env, "zz");
        assert_eq!(none.count(), 0);
        assert_eq!(none.fill(&mut [0; 4]).unwrap(), 0);
        assert_eq!(none.and_with(&mut [ids[0]], 1).unwrap(), 0);
    }
}
