use std::sync::Arc;
use kestrel::analysis::KeywordAnalyzer;
use kestrel::simd::SimdOps;
use kestrel::{EntryBuilder, Environment, IndexConfig, IndexFieldsMapping, IndexSearcher, IndexWriter, QueryMatch};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SIZES: [usize; 7] = [1, 3, 4, 5, 4095, 4096, 4097];

fn sorted_sample(rng: &mut StdRng, len: usize, universe: u64) -> Vec<u64> {
    let mut values: Vec<u64> = (0..len).map(|_| rng.gen_range(0..universe)).collect();
    values.sort_unstable();
    values.dedup();
    values
}

#[test]
fn vector_and_scalar_intersections_agree() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for &a_len in &SIZES {
        for &b_len in &SIZES {
            for density in [2u64, 8, 64] {
                let universe = (a_len.max(b_len) as u64) * density;
                let a = sorted_sample(&mut rng, a_len, universe);
                let b = sorted_sample(&mut rng, b_len, universe);
                let mut scalar = vec![0; a.len().min(b.len())];
                let mut vector = vec![0; a.len().min(b.len())];
                let n = SimdOps::intersect_scalar(&a, &b, &mut scalar);
                let m = SimdOps::intersect(&a, &b, &mut vector, true);
                assert_eq!(&scalar[..n], &vector[..m], "sizes {} x {}, density {}", a_len, b_len, density);
            }
        }
    }
}

#[test]
fn posting_list_and_with_is_identical_with_and_without_simd() {
    let env = Environment::in_memory();
    let mapping = IndexFieldsMapping::builder()
        .analyzed("Bucket", Arc::new(KeywordAnalyzer::new(false)))
        .build()
        .unwrap();
    let config = IndexConfig { posting_block_size: 64, ..IndexConfig::default() };

    let mut rng = StdRng::seed_from_u64(42);
    let mut writer = IndexWriter::new(&env, mapping.clone(), config.clone()).unwrap();
    let mut ids = Vec::new();
    for i in 0..6000 {
        let bucket = if rng.gen_bool(0.6) { "hot" } else { "cold" };
        let mut builder = EntryBuilder::new();
        builder.write(0, bucket);
        ids.push(writer.index(format!("k/{}", i).as_bytes(), &builder.finish().unwrap()).unwrap());
    }
    writer.commit().unwrap();

    let search = IndexSearcher::new(&env, mapping, config);
    for &size in &SIZES {
        let mut candidates: Vec<u64> = (0..size).map(|_| ids[rng.gen_range(0..ids.len())]).collect();
        candidates.sort_unstable();
        candidates.dedup();

        let mut with_simd = candidates.clone();
        let mut without_simd = candidates.clone();
        let n = search
            .term_query("Bucket", "hot")
            .unwrap()
            .with_simd(true)
            .and_with(&mut with_simd, candidates.len())
            .unwrap();
        let m = search
            .term_query("Bucket", "hot")
            .unwrap()
            .with_simd(false)
            .and_with(&mut without_simd, candidates.len())
            .unwrap();
        assert_eq!(&with_simd[..n], &without_simd[..m], "candidate size {}", size);
    }
}
