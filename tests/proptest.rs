//! Property-based tests for the table registry, the type system and the assertion engine.

use std::collections::HashSet;

use fixtureset::{
    assert_tables_equal, comparison_type, Column, DataType, MemoryTable, OrderedTableNameMap,
    TableMetaData, Value,
};
use proptest::prelude::*;

fn any_data_type() -> impl Strategy<Value = DataType> {
    prop::sample::select(vec![
        DataType::Unknown,
        DataType::Varchar,
        DataType::Integer,
        DataType::BigInt,
        DataType::Decimal,
        DataType::Double,
        DataType::Date,
        DataType::Timestamp,
        DataType::Boolean,
    ])
}

fn int_table(column_type: DataType, values: &[i64]) -> MemoryTable {
    MemoryTable::with_rows(
        TableMetaData::new("T", vec![Column::new("V", column_type)]),
        values.iter().map(|v| vec![Value::Int(*v)]).collect(),
    )
    .unwrap()
}

proptest! {
    /// Distinct names come back in insertion order, each under its own spelling.
    #[test]
    fn registry_keeps_insertion_order(names in prop::collection::vec("[a-z]{1,8}", 1..30)) {
        let mut map = OrderedTableNameMap::new(false);
        let mut seen = HashSet::new();
        let mut expected = vec![];
        for (i, n) in names.iter().enumerate() {
            let result = map.add(n, i);
            if seen.insert(n.to_uppercase()) {
                prop_assert!(result.is_ok());
                expected.push(n.clone());
            } else {
                prop_assert!(result.is_err(), "{} added twice", n);
            }
        }
        prop_assert_eq!(map.table_names(), expected);
        prop_assert_eq!(map.len(), seen.len());
    }

    /// Lookups agree for every case variant of a name in a case-insensitive map.
    #[test]
    fn registry_lookup_ignores_case(name in "[a-zA-Z_]{1,12}") {
        let mut map = OrderedTableNameMap::new(false);
        map.add(&name, 1).unwrap();
        prop_assert_eq!(map.get(&name.to_lowercase()), Some(&1));
        prop_assert_eq!(map.get(&name.to_uppercase()), Some(&1));
        prop_assert!(map.add(&name.to_lowercase(), 2).is_err());

        let mut strict = OrderedTableNameMap::new(true);
        strict.add(&name, 1).unwrap();
        let lower = name.to_lowercase();
        prop_assert_eq!(strict.get(&lower).is_some(), lower == name);
    }

    #[test]
    fn comparison_type_is_symmetric(a in any_data_type(), b in any_data_type()) {
        prop_assert_eq!(comparison_type(a, b), comparison_type(b, a));
    }

    /// Comparing tables gives the same verdict in both directions.
    #[test]
    fn table_comparison_is_symmetric(
        a in prop::collection::vec(-1000i64..1000, 0..20),
        b in prop::collection::vec(-1000i64..1000, 0..20),
        ta in any_data_type(),
        tb in any_data_type(),
    ) {
        prop_assume!(ta != DataType::Date && tb != DataType::Date);
        prop_assume!(ta != DataType::Timestamp && tb != DataType::Timestamp);
        prop_assume!(ta != DataType::Boolean && tb != DataType::Boolean);
        let x = int_table(ta, &a);
        let y = int_table(tb, &b);
        let forward = assert_tables_equal(&x, &y).is_ok();
        let backward = assert_tables_equal(&y, &x).is_ok();
        prop_assert_eq!(forward, backward);
        prop_assert_eq!(forward, a == b);
    }
}
