use std::sync::Arc;
use kestrel::analysis::StandardAnalyzer;
use kestrel::query::{SortDirection, SortKind, UnaryOperation, UnaryValue};
use kestrel::{
    collect_all, Boosting, EntryBuilder, Environment, EnvironmentOptions, ErrorKind, FieldValue, IndexConfig,
    IndexFieldsMapping, IndexSearcher, IndexWriter, QueryMatch,
};
use tempfile::tempdir;

fn mapping() -> IndexFieldsMapping {
    IndexFieldsMapping::builder()
        .exact("Id")
        .analyzed("Content", Arc::new(StandardAnalyzer::standard()))
        .with_suggestions()
        .exact("Age")
        .build()
        .unwrap()
}

fn payload(id: &str, content: &str) -> Vec<u8> {
    let mut builder = EntryBuilder::new();
    builder.write(0, id).write(1, content);
    builder.finish().unwrap()
}

fn index_all(env: &Environment, entries: &[(String, String)]) -> Vec<u64> {
    let mut writer = IndexWriter::new(env, mapping(), IndexConfig::default()).unwrap();
    let ids = entries
        .iter()
        .map(|(id, content)| writer.index(id.as_bytes(), &payload(id, content)).unwrap())
        .collect();
    writer.commit().unwrap();
    ids
}

fn searcher(env: &Environment) -> IndexSearcher {
    IndexSearcher::new(env, mapping(), IndexConfig::default())
}

fn list_entries(n: usize) -> Vec<(String, String)> {
    (0..n).map(|i| (format!("list/{}", i), i.to_string())).collect()
}

#[test]
fn term_lookup_then_delete_by_unique_id() {
    let env = Environment::in_memory();
    index_all(&env, &list_entries(1000));

    let search = searcher(&env);
    assert_eq!(search.number_of_entries(), 1000);
    let mut query = search.term_query("Content", "500").unwrap();
    let ids = collect_all(&mut query, 16).unwrap();
    assert_eq!(ids.len(), 1);
    let reader = search.get_reader_for(ids[0]).unwrap();
    assert_eq!(reader.get(0).unwrap().read(), Some(&b"list/500"[..]));
    assert_eq!(search.get_identity(ids[0]).unwrap(), b"list/500".to_vec());

    let mut writer = IndexWriter::new(&env, mapping(), IndexConfig::default()).unwrap();
    assert!(writer.try_delete_entry("Id", b"list/500").unwrap());
    writer.commit().unwrap();

    let search = searcher(&env);
    let mut query = search.term_query("Content", "500").unwrap();
    assert_eq!(collect_all(&mut query, 16).unwrap(), Vec::<u64>::new());
    assert_eq!(search.number_of_entries(), 999);
    assert!(search.get_reader_for(ids[0]).is_err());
}

#[test]
fn snapshots_do_not_see_later_commits() {
    let env = Environment::in_memory();
    index_all(&env, &list_entries(10));
    let before = searcher(&env);

    index_all(&env, &[("list/10".to_string(), "10".to_string())]);
    assert_eq!(before.number_of_entries(), 10);
    assert_eq!(before.term_count("Content", "10").unwrap(), 0);
    assert_eq!(searcher(&env).term_count("Content", "10").unwrap(), 1);
}

#[test]
fn deleting_an_entry_reduces_every_term_by_one() {
    let env = Environment::in_memory();
    let entries: Vec<_> = (0..30).map(|i| (format!("doc/{}", i), format!("common word{}", i % 3))).collect();
    index_all(&env, &entries);

    let search = searcher(&env);
    assert_eq!(search.term_count("Content", "common").unwrap(), 30);
    assert_eq!(search.term_count("Content", "word1").unwrap(), 10);

    let mut writer = IndexWriter::new(&env, mapping(), IndexConfig::default()).unwrap();
    assert!(writer.try_delete_entry("Id", b"doc/4").unwrap());
    writer.commit().unwrap();

    let search = searcher(&env);
    assert_eq!(search.term_count("Content", "common").unwrap(), 29);
    assert_eq!(search.term_count("Content", "word1").unwrap(), 9);
    assert_eq!(search.term_count("Content", "word0").unwrap(), 10);
    assert_eq!(search.term_count("Id", "doc/4").unwrap(), 0);
}

#[test]
fn entry_counter_tracks_inserts_minus_deletes() {
    let env = Environment::in_memory();
    index_all(&env, &list_entries(25));

    let mut writer = IndexWriter::new(&env, mapping(), IndexConfig::default()).unwrap();
    for i in [3, 7, 11, 19] {
        assert!(writer.try_delete_entry("Id", format!("list/{}", i).as_bytes()).unwrap());
    }
    assert!(!writer.try_delete_entry("Id", b"list/404").unwrap());
    writer.commit().unwrap();

    let search = searcher(&env);
    assert_eq!(search.number_of_entries(), 21);
    assert_eq!(search.all_entries().count(), 21);
}

#[test]
fn term_frequency_boosting_ranks_deterministically() {
    let env = Environment::in_memory();
    let entries = [("e/0", "alpha beta"), ("e/1", "alpha"), ("e/2", "beta"), ("e/3", "beta"), ("e/4", "beta")];
    let owned: Vec<_> = entries.iter().map(|(id, c)| (id.to_string(), c.to_string())).collect();
    let ids = index_all(&env, &owned);

    for _ in 0..3 {
        let search = searcher(&env);
        let alpha = search.boosted_term_query("Content", "alpha", Boosting::TermFrequency).unwrap();
        let beta = search.boosted_term_query("Content", "beta", Boosting::TermFrequency).unwrap();
        let mut ranked = search.order_by_score(search.or(alpha, beta), None);

        let results = ranked.results().unwrap().to_vec();
        let order: Vec<u64> = results.iter().map(|r| r.entry_id).collect();
        assert_eq!(order, ids);
        match results[0].value {
            kestrel::query::SortValue::Score(score) => assert!((score - 0.75).abs() < 1e-6),
            ref other => panic!("unexpected sort value {:?}", other),
        }
    }
}

#[test]
fn bm25_prefers_shorter_documents() {
    let env = Environment::in_memory();
    let entries = vec![
        ("d/0".to_string(), "rust".to_string()),
        ("d/1".to_string(), "rust is a language with many many words in it".to_string()),
        ("d/2".to_string(), "python".to_string()),
    ];
    let ids = index_all(&env, &entries);

    let search = searcher(&env);
    let rust = search.boosted_term_query("Content", "rust", Boosting::Bm25).unwrap();
    let mut ranked = search.order_by_score(rust, Some(1));
    assert_eq!(collect_all(&mut ranked, 4).unwrap(), vec![ids[0]]);
}

#[test]
fn multi_term_and_unary_filters() {
    let env = Environment::in_memory();
    let mut writer = IndexWriter::new(&env, mapping(), IndexConfig::default()).unwrap();
    let mut ids = Vec::new();
    for (i, (name, age)) in [("ann", 31), ("andrew", 45), ("bob", 27), ("anita", 19)].iter().enumerate() {
        let mut builder = EntryBuilder::new();
        builder.write(0, format!("p/{}", i)).write(1, *name).write(2, FieldValue::long(*age));
        ids.push(writer.index(format!("p/{}", i).as_bytes(), &builder.finish().unwrap()).unwrap());
    }
    writer.commit().unwrap();

    let search = searcher(&env);
    let mut prefix = search.starts_with_query("Content", "an").unwrap();
    assert_eq!(collect_all(&mut prefix, 2).unwrap(), vec![ids[0], ids[1], ids[3]]);

    let mut ages = search.between_long("Age", 40, 20).unwrap();
    assert_eq!(collect_all(&mut ages, 8).unwrap(), vec![ids[0], ids[2]]);

    let prefix = search.starts_with_query("Content", "an").unwrap();
    let mut older = search.unary(prefix, "Age", UnaryOperation::GreaterThan, UnaryValue::Long(30)).unwrap();
    assert_eq!(collect_all(&mut older, 8).unwrap(), vec![ids[0], ids[1]]);

    let all = search.all_entries();
    let mut outside = search.not_between(all, "Age", UnaryValue::Long(44), UnaryValue::Long(20)).unwrap();
    assert_eq!(collect_all(&mut outside, 8).unwrap(), vec![ids[1], ids[3]]);

    let mut by_age = search.order_by(search.all_entries(), "Age", SortDirection::Descending, SortKind::Long, Some(2));
    assert_eq!(collect_all(&mut by_age, 8).unwrap(), vec![ids[1], ids[0]]);

    let mut sorted = search.order_by_score(search.all_entries(), None);
    let err = sorted.and_with(&mut [ids[0]], 1).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedOperation);
}

#[test]
fn suggestions_follow_inserts_and_deletes() {
    let env = Environment::in_memory();
    let entries = vec![
        ("s/0".to_string(), "search engine".to_string()),
        ("s/1".to_string(), "search".to_string()),
        ("s/2".to_string(), "starch".to_string()),
    ];
    index_all(&env, &entries);

    let found = searcher(&env).suggest("Content", "serch", 1, 5).unwrap();
    assert_eq!(found[0].term, "search");
    assert_eq!(found[0].frequency, 2);

    let mut writer = IndexWriter::new(&env, mapping(), IndexConfig::default()).unwrap();
    writer.try_delete_entry("Id", b"s/1").unwrap();
    writer.commit().unwrap();
    let found = searcher(&env).suggest("Content", "search", 0, 5).unwrap();
    assert_eq!(found[0].frequency, 1);

    let stats = searcher(&env).stats().unwrap();
    assert_eq!(stats.number_of_entries, 2);
    let content = stats.fields.iter().find(|f| f.name == "Content").unwrap();
    assert_eq!(content.entries_with_field, 2);
    assert!(content.suggestion_keys > 0);
}

#[test]
fn durable_environment_survives_reopen() {
    let dir = tempdir().unwrap();
    {
        let env = Environment::open(EnvironmentOptions::durable(dir.path())).unwrap();
        assert!(env.is_durable());
        index_all(&env, &list_entries(50));
    }
    let env = Environment::open(EnvironmentOptions::durable(dir.path())).unwrap();
    let search = searcher(&env);
    assert_eq!(search.number_of_entries(), 50);
    assert_eq!(search.term_count("Content", "42").unwrap(), 1);
}

#[test]
fn second_writer_fails_fast() {
    let env = Environment::in_memory();
    let _writer = IndexWriter::new(&env, mapping(), IndexConfig::default()).unwrap();
    let err = IndexWriter::new(&env, mapping(), IndexConfig::default()).err().unwrap();
    assert_eq!(err.kind, ErrorKind::InvalidState);
}
