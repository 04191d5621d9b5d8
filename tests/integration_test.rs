use std::env;
use std::rc::Rc;

use fixtureset::{
    assert_data_sets_equal, assert_tables_equal, CachedDataSet, CompositeDataSet, Config,
    DataSet, DataSetRef, DatabaseDataSet, DuplicateTablePolicy, Error, FailureKind,
    FilteredDataSet, FlatDtdProducer, FlatXmlProducer, ReplacementDataSet, Replacements,
    SequenceTableFilter, SortedTable, Table, Value,
};
use rusqlite::Connection;

fn path_to_testdata(filename: &str) -> String {
    env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set")
        + "/resources/test/"
        + filename
}

fn load_xml(filename: &str, config: &Config) -> fixtureset::Result<CachedDataSet> {
    let mut producer = FlatXmlProducer::from_file(path_to_testdata(filename), config)?;
    CachedDataSet::from_producer(&mut producer, config)
}

fn people_db() -> Rc<Connection> {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE person (id INTEGER PRIMARY KEY, name VARCHAR(40) NOT NULL, \
             score DECIMAL(5,2));
         CREATE TABLE link (from_id INTEGER, to_id INTEGER);
         CREATE TABLE empty_table (x INTEGER);
         INSERT INTO person VALUES (3, 'carol & co', 8.25);
         INSERT INTO person VALUES (1, 'alice', 9.5);
         INSERT INTO person VALUES (2, 'bob', 7);
         INSERT INTO link VALUES (1, 2);",
    )
    .unwrap();
    Rc::new(conn)
}

#[test]
fn test_split_table_is_merged_in_first_appearance_order() {
    let ds = load_xml("people.xml", &Config::default()).unwrap();
    assert_eq!(
        ds.table_names().unwrap(),
        vec!["PERSON", "LINK", "EMPTY_TABLE"]
    );
    let person = ds.table("person").unwrap();
    assert_eq!(person.row_count().unwrap(), 3);
    assert_eq!(person.value(2, "NAME").unwrap(), Value::from("carol & co"));
    let empty = ds.table("EMPTY_TABLE").unwrap();
    assert_eq!(empty.row_count().unwrap(), 0);
    assert!(empty.table_meta_data().columns().is_empty());
}

#[test]
fn test_split_table_is_rejected_without_merging() {
    let config = Config::default().with_duplicate_tables(DuplicateTablePolicy::Reject);
    assert!(matches!(
        load_xml("people.xml", &config),
        Err(Error::AmbiguousTableName(ref n)) if n == "PERSON"
    ));
}

#[test]
fn test_composite_of_datasets() {
    let a: DataSetRef = Rc::new(load_xml("people.xml", &Config::default()).unwrap());
    let b: DataSetRef = Rc::new(load_xml("sensing.xml", &Config::default()).unwrap());

    let combined = CompositeDataSet::new(vec![a.clone(), b.clone()], true, false).unwrap();
    assert_eq!(
        combined.table_names().unwrap(),
        vec!["PERSON", "LINK", "EMPTY_TABLE"]
    );
    assert_eq!(combined.table("PERSON").unwrap().row_count().unwrap(), 6);

    assert!(matches!(
        CompositeDataSet::new(vec![a, b], false, false),
        Err(Error::AmbiguousTableName(_))
    ));
}

#[test]
fn test_flat_xml_round_trip() {
    let original = load_xml("people.xml", &Config::default()).unwrap();
    let mut out = vec![];
    fixtureset::write_flat_xml(&original, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("NAME=\"carol &amp; co\""));

    let config = Config::default();
    let mut producer = FlatXmlProducer::new(text, &config);
    let reloaded = CachedDataSet::from_producer(&mut producer, &config).unwrap();
    assert_data_sets_equal(&original, &reloaded).unwrap();
}

#[test]
fn test_database_matches_fixture() {
    let expected = load_xml("people.xml", &Config::default()).unwrap();
    let actual = DatabaseDataSet::new(people_db(), Config::default()).unwrap();
    // LINK has no primary key, so its single row needs no ordering.
    match assert_data_sets_equal(&expected, &actual) {
        Err(Error::Comparison(f)) => {
            // EMPTY_TABLE declares no columns in the fixture but one in the database.
            assert_eq!(
                f.kind,
                FailureKind::ColumnNames {
                    table: "EMPTY_TABLE".to_string()
                }
            );
        }
        other => panic!("unexpected {:?}", other),
    }

    let filter = SequenceTableFilter::new(&["PERSON", "LINK"], false);
    let expected: DataSetRef = Rc::new(expected);
    let actual: DataSetRef = Rc::new(actual);
    let expected = FilteredDataSet::new(expected, &filter).unwrap();
    let actual = FilteredDataSet::new(actual, &filter).unwrap();
    assert_data_sets_equal(&expected, &actual).unwrap();
}

#[test]
fn test_forward_only_database_table_compares() {
    let config = Config::default().with_forward_only(true).with_batch_size(2);
    let db = DatabaseDataSet::new(people_db(), config).unwrap();
    let actual = db.table("PERSON").unwrap();
    let expected = load_xml("people.xml", &Config::default())
        .unwrap()
        .table("PERSON")
        .unwrap();
    assert_tables_equal(expected.as_ref(), actual.as_ref()).unwrap();

    let again = db.table("PERSON").unwrap();
    assert_eq!(again.value(1, "NAME").unwrap(), Value::from("bob"));
    let err = again.value(0, "NAME").unwrap_err();
    assert!(err.is_bounds());
    assert!(matches!(
        err,
        Error::ForwardOnly { requested: 0, current: 1, .. }
    ));
    let past_end = again.value(3, "NAME").unwrap_err();
    assert!(past_end.is_bounds());
}

#[test]
fn test_value_mismatch_against_database() {
    let conn = people_db();
    conn.execute("UPDATE person SET score = 9.75 WHERE id = 1", [])
        .unwrap();
    let expected = load_xml("people.xml", &Config::default()).unwrap();
    let actual = DatabaseDataSet::new(conn, Config::default()).unwrap();
    let err = assert_tables_equal(
        expected.table("PERSON").unwrap().as_ref(),
        actual.table("PERSON").unwrap().as_ref(),
    )
    .unwrap_err();
    match err {
        Error::Comparison(f) => {
            assert_eq!(
                f.kind,
                FailureKind::Value {
                    table: "PERSON".to_string(),
                    row: 0,
                    column: "SCORE".to_string()
                }
            );
            assert_eq!(f.expected, "9.5");
            assert_eq!(f.actual, "9.75");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_column_sensing_and_replacement() {
    let plain = load_xml("sensing.xml", &Config::default()).unwrap();
    assert_eq!(
        plain.table_meta_data("PERSON").unwrap().column_names(),
        vec!["ID", "NAME"]
    );

    let sensing = load_xml("sensing.xml", &Config::default().with_column_sensing(true)).unwrap();
    let person = sensing.table("PERSON").unwrap();
    assert_eq!(
        person.table_meta_data().column_names(),
        vec!["ID", "NAME", "NICKNAME"]
    );
    assert_eq!(person.value(0, "NICKNAME").unwrap(), Value::NoValue);
    assert_eq!(person.value(1, "NICKNAME").unwrap(), Value::from("bobby"));

    let replaced = ReplacementDataSet::new(
        Rc::new(sensing),
        Replacements::new().value("[NULL]", Value::Null),
    );
    let person = replaced.table("PERSON").unwrap();
    assert_eq!(person.value(2, "NAME").unwrap(), Value::Null);
    assert_eq!(person.value(1, "NAME").unwrap(), Value::from("bob"));
}

#[test]
fn test_dtd_supplies_metadata() {
    let config = Config::default();
    let mut dtd = FlatDtdProducer::from_file(path_to_testdata("people.dtd")).unwrap();
    let metadata = CachedDataSet::from_producer(&mut dtd, &config).unwrap();
    assert_eq!(metadata.table_names().unwrap(), vec!["PERSON", "LINK"]);
    assert_eq!(metadata.table("PERSON").unwrap().row_count().unwrap(), 0);

    let mut producer = FlatXmlProducer::from_file(path_to_testdata("sensing.xml"), &config)
        .unwrap()
        .with_metadata(Rc::new(metadata));
    let ds = CachedDataSet::from_producer(&mut producer, &config).unwrap();
    let person = ds.table("PERSON").unwrap();
    assert_eq!(
        person.table_meta_data().column_names(),
        vec!["ID", "NAME", "NICKNAME"]
    );
    assert_eq!(person.value(0, "NICKNAME").unwrap(), Value::NoValue);
    assert_eq!(person.value(1, "NICKNAME").unwrap(), Value::from("bobby"));
}

#[test]
fn test_sorted_table_orders_fixture_rows() {
    let ds = load_xml("people.xml", &Config::default()).unwrap();
    let sorted = SortedTable::with_columns(
        ds.table("PERSON").unwrap(),
        &["NAME"],
        fixtureset::SortMode::Text,
    )
    .unwrap();
    let sorted: Rc<dyn Table> = Rc::new(sorted);
    let names: Vec<Value> = (0..3).map(|r| sorted.value(r, "NAME").unwrap()).collect();
    assert_eq!(
        names,
        vec![
            Value::from("alice"),
            Value::from("bob"),
            Value::from("carol & co")
        ]
    );
}
