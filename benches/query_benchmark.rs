use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kestrel::analysis::StandardAnalyzer;
use kestrel::simd::SimdOps;
use kestrel::{
    collect_all, Boosting, EntryBuilder, Environment, IndexConfig, IndexFieldsMapping, IndexSearcher, IndexWriter,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

const WORDS: [&str; 12] = [
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india", "juliet", "kilo", "lima",
];

fn mapping() -> IndexFieldsMapping {
    IndexFieldsMapping::builder()
        .exact("Id")
        .analyzed("Content", Arc::new(StandardAnalyzer::standard()))
        .with_suggestions()
        .build()
        .unwrap()
}

/// Fills an in-memory environment with `n` entries of skewed random words.
fn populate(n: u64) -> Environment {
    let env = Environment::in_memory();
    let mut rng = StdRng::seed_from_u64(7);
    let mut writer = IndexWriter::new(&env, mapping(), IndexConfig::default()).unwrap();
    for i in 0..n {
        let content = (0..20)
            .map(|_| {
                // low indexes dominate so that posting lists differ in size
                let a = rng.gen_range(0..WORDS.len());
                WORDS[rng.gen_range(0..=a)]
            })
            .collect::<Vec<_>>()
            .join(" ");
        let key = format!("q/{}", i);
        let mut builder = EntryBuilder::new();
        builder.write(0, key.as_str()).write(1, content);
        writer.index(key.as_bytes(), &builder.finish().unwrap()).unwrap();
    }
    writer.commit().unwrap();
    env
}

fn bench_term_query(c: &mut Criterion) {
    let env = populate(20_000);
    let search = IndexSearcher::new(&env, mapping(), IndexConfig::default());

    let mut group = c.benchmark_group("term_query");
    for word in ["alpha", "foxtrot", "lima"] {
        group.bench_with_input(BenchmarkId::from_parameter(word), &word, |b, word| {
            b.iter(|| {
                let mut query = search.term_query("Content", *word).unwrap();
                black_box(collect_all(&mut query, 4096).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_boolean_queries(c: &mut Criterion) {
    let env = populate(20_000);
    let search = IndexSearcher::new(&env, mapping(), IndexConfig::default());

    c.bench_function("and_common_rare", |b| {
        b.iter(|| {
            let left = search.term_query("Content", "alpha").unwrap();
            let right = search.term_query("Content", "kilo").unwrap();
            let mut query = search.and(left, right);
            black_box(collect_all(&mut query, 4096).unwrap())
        });
    });

    c.bench_function("or_two_terms", |b| {
        b.iter(|| {
            let left = search.term_query("Content", "golf").unwrap();
            let right = search.term_query("Content", "hotel").unwrap();
            let mut query = search.or(left, right);
            black_box(collect_all(&mut query, 4096).unwrap())
        });
    });

    c.bench_function("prefix_query", |b| {
        b.iter(|| {
            let mut query = search.starts_with_query("Content", "d").unwrap();
            black_box(collect_all(&mut query, 4096).unwrap())
        });
    });
}

fn bench_ranking(c: &mut Criterion) {
    let env = populate(10_000);
    let search = IndexSearcher::new(&env, mapping(), IndexConfig::default());

    let mut group = c.benchmark_group("top_k_bm25");
    for k in [10usize, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(k), k, |b, &k| {
            b.iter(|| {
                let query = search.boosted_term_query("Content", "charlie", Boosting::Bm25).unwrap();
                let mut ranked = search.order_by_score(query, Some(k));
                black_box(ranked.results().unwrap().len())
            });
        });
    }
    group.finish();

    c.bench_function("suggest_one_edit", |b| {
        b.iter(|| black_box(search.suggest("Content", "delte", 1, 5).unwrap()));
    });
}

fn bench_intersection(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(11);
    let mut sample = |len: usize| {
        let mut values: Vec<u64> = (0..len).map(|_| rng.gen_range(0..(len as u64 * 4))).collect();
        values.sort_unstable();
        values.dedup();
        values
    };
    let a = sample(100_000);
    let b_side = sample(100_000);
    let mut out = vec![0u64; a.len().min(b_side.len())];

    let mut group = c.benchmark_group("intersect");
    group.bench_function("scalar", |b| b.iter(|| black_box(SimdOps::intersect_scalar(&a, &b_side, &mut out))));
    group.bench_function("simd", |b| b.iter(|| black_box(SimdOps::intersect(&a, &b_side, &mut out, true))));
    group.finish();
}

criterion_group!(benches, bench_term_query, bench_boolean_queries, bench_ranking, bench_intersection);
criterion_main!(benches);
