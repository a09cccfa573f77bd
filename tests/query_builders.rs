use std::ops::Bound;
use kestrel::{
    collect_all, EntryBuilder, Environment, FieldValue, IndexConfig, IndexFieldsMapping, IndexSearcher, IndexWriter,
    QueryMatch, SpatialPoint,
};

fn mapping() -> IndexFieldsMapping {
    IndexFieldsMapping::builder()
        .exact("Id")
        .exact("Name")
        .exact("Weight")
        .build()
        .unwrap()
}

fn fruit_index(env: &Environment) -> Vec<u64> {
    let rows = [
        (FieldValue::text("apple"), FieldValue::double(1.5)),
        (FieldValue::text("pineapple"), FieldValue::double(2.5)),
        (FieldValue::text("grape"), FieldValue::Null),
        (FieldValue::Empty, FieldValue::double(0.5)),
        (FieldValue::text("apricot"), FieldValue::double(10.0)),
    ];
    let mut writer = IndexWriter::new(env, mapping(), IndexConfig::default()).unwrap();
    let mut ids = Vec::new();
    for (i, (name, weight)) in rows.into_iter().enumerate() {
        let key = format!("u/{}", i);
        let mut builder = EntryBuilder::new();
        builder.write(0, key.as_str()).write(1, name).write(2, weight);
        if i == 3 {
            builder.write_dynamic("Where", SpatialPoint::new(57.64911, 10.40744));
        }
        ids.push(writer.index(key.as_bytes(), &builder.finish().unwrap()).unwrap());
    }
    writer.commit().unwrap();
    ids
}

fn run(mut query: impl QueryMatch) -> Vec<u64> {
    collect_all(&mut query, 2).unwrap()
}

#[test]
fn sentinel_and_set_queries() {
    let env = Environment::in_memory();
    let ids = fruit_index(&env);
    let search = IndexSearcher::new(&env, mapping(), IndexConfig::default());

    assert_eq!(run(search.null_query("Weight").unwrap()), vec![ids[2]]);
    assert_eq!(run(search.empty_query("Name").unwrap()), vec![ids[3]]);

    let terms = vec![b"grape".to_vec(), b"apple".to_vec(), b"missing".to_vec()];
    assert_eq!(run(search.in_query("Name", terms).unwrap()), vec![ids[0], ids[2]]);
}

#[test]
fn pattern_queries_skip_sentinels() {
    let env = Environment::in_memory();
    let ids = fruit_index(&env);
    let search = IndexSearcher::new(&env, mapping(), IndexConfig::default());

    assert_eq!(run(search.ends_with_query("Name", "apple").unwrap()), vec![ids[0], ids[1]]);
    assert_eq!(run(search.contains_query("Name", "ric").unwrap()), vec![ids[4]]);
    assert_eq!(run(search.regex_query("Name", "^(apple|grape)$").unwrap()), vec![ids[0], ids[2]]);
    assert!(search.regex_query("Name", "(unclosed").is_err());

    // null is the only value that does not count as present
    assert_eq!(run(search.exists_query("Weight").unwrap()), vec![ids[0], ids[1], ids[3], ids[4]]);
    assert_eq!(run(search.exists_query("Name").unwrap()), ids.clone());
}

#[test]
fn range_and_fuzzy_queries() {
    let env = Environment::in_memory();
    let ids = fruit_index(&env);
    let search = IndexSearcher::new(&env, mapping(), IndexConfig::default());

    let range = search
        .term_range_query("Name", Bound::Included(&b"apple"[..]), Bound::Excluded(&b"grape"[..]))
        .unwrap();
    assert_eq!(run(range), vec![ids[0], ids[4]]);

    assert_eq!(run(search.fuzzy_query("Name", "grap", 1, 0).unwrap()), vec![ids[2]]);
    assert_eq!(run(search.fuzzy_query("Name", "aple", 1, 2).unwrap()), vec![ids[0]]);
    assert!(search.fuzzy_query("Name", "grap", 3, 0).is_err());

    assert_eq!(run(search.between_double("Weight", 2.0, 1.0).unwrap()), vec![ids[0]]);
    assert_eq!(run(search.between_double("Weight", 0.0, 3.0).unwrap()), vec![ids[0], ids[1], ids[3]]);
    assert!(search.between_double("Weight", f64::NAN, 1.0).is_err());

    let heavy = search.and_not(
        search.exists_query("Weight").unwrap(),
        search.between_double("Weight", 0.0, 2.0).unwrap(),
    );
    assert_eq!(run(heavy), vec![ids[1], ids[4]]);
}

#[test]
fn stored_values_read_back() {
    let env = Environment::in_memory();
    let ids = fruit_index(&env);
    let search = IndexSearcher::new(&env, mapping(), IndexConfig::default());

    let reader = search.get_reader_for(ids[0]).unwrap();
    let weight = reader.get(2).unwrap();
    assert_eq!(weight.read_double(), Some(1.5));
    assert_eq!(weight.read_long(), Some(1));
    assert_eq!(reader.known_fields().collect::<Vec<_>>().len(), 3);

    let reader = search.get_reader_for(ids[3]).unwrap();
    let point = reader.get_dynamic("Where").unwrap().read_spatial().unwrap();
    assert_eq!(point, SpatialPoint::new(57.64911, 10.40744));

    let stats = search.stats().unwrap();
    let name = stats.fields.iter().find(|f| f.name == "Name").unwrap();
    assert_eq!(name.entries_with_field, 5);
    assert!((name.average_length() - 1.0).abs() < f32::EPSILON);
}

#[test]
fn delete_by_entry_id() {
    let env = Environment::in_memory();
    let ids = fruit_index(&env);

    let mut writer = IndexWriter::new(&env, mapping(), IndexConfig::default()).unwrap();
    assert!(writer.delete_entry(ids[4]).unwrap());
    assert!(!writer.delete_entry(ids[4] + 100).unwrap());
    assert_eq!(writer.pending_deletions(), 1);
    writer.commit().unwrap();

    let search = IndexSearcher::new(&env, mapping(), IndexConfig::default());
    assert_eq!(search.term_count("Name", "apricot").unwrap(), 0);
    assert_eq!(run(search.between_double("Weight", 5.0, 20.0).unwrap()), Vec::<u64>::new());
    assert_eq!(search.number_of_entries(), 4);

    let mut builder = EntryBuilder::new();
    builder.write(0, "u/9").write(1, "fig");
    assert_eq!(builder.field_count(), 2);
}

#[test]
fn user_field_names_stay_out_of_internal_trees() {
    let env = Environment::in_memory();
    let mapping = IndexFieldsMapping::builder()
        .exact("Id")
        .exact("Fields")
        .exact("Age")
        .build()
        .unwrap();
    let mut writer = IndexWriter::new(&env, mapping.clone(), IndexConfig::default()).unwrap();
    let mut builder = EntryBuilder::new();
    builder.write(0, "a/1").write(1, "Id").write(2, FieldValue::long(30));
    let first = writer.index(b"a/1", &builder.finish().unwrap()).unwrap();
    let mut builder = EntryBuilder::new();
    builder.write(0, "a/2").write_dynamic("Age-L", FieldValue::long(40));
    writer.index(b"a/2", &builder.finish().unwrap()).unwrap();
    writer.commit().unwrap();

    let search = IndexSearcher::new(&env, mapping, IndexConfig::default());
    assert_eq!(run(search.term_query("Fields", "Id").unwrap()), vec![first]);
    assert_eq!(run(search.exists_query("Fields").unwrap()), vec![first]);
    assert_eq!(run(search.between_long("Age", i64::MIN, i64::MAX).unwrap()), vec![first]);
    let stats = search.stats().unwrap();
    assert!(stats.fields.iter().any(|f| f.name == "Age-L" && f.long_terms == 1));
}
