//! Unites the tables of several datasets, or several loose tables, into one dataset.

use std::rc::Rc;

use crate::error::Result;
use crate::registry::OrderedTableNameMap;
use crate::table::CompositeTable;
use crate::table_traits::{DataSet, TableRef};

use super::DataSetRef;

/// holds the union of its inputs' tables, in first-seen order.
///
/// With `combine` set, tables that share a name are concatenated into one `CompositeTable`,
/// in input order. Without it a repeated name fails with `AmbiguousTableName` while the
/// composite is being built, so no row is ever read.
pub struct CompositeDataSet {
    tables: OrderedTableNameMap<TableRef>,
}

impl CompositeDataSet {
    pub fn new(datasets: Vec<DataSetRef>, combine: bool, case_sensitive: bool) -> Result<Self> {
        let mut tables = vec![];
        for ds in &datasets {
            for t in ds.iter()? {
                tables.push(t?);
            }
        }
        Self::from_tables(tables, combine, case_sensitive)
    }

    pub fn from_tables(tables: Vec<TableRef>, combine: bool, case_sensitive: bool) -> Result<Self> {
        let mut groups: OrderedTableNameMap<Vec<TableRef>> =
            OrderedTableNameMap::new(case_sensitive);
        for t in tables {
            let name = t.table_meta_data().table_name().to_string();
            match groups.get_mut(&name) {
                Some(group) if combine => group.push(t),
                _ => groups.add(&name, vec![t])?,
            }
        }
        let mut registry = OrderedTableNameMap::new(case_sensitive);
        for (name, mut group) in groups.into_entries() {
            let table: TableRef = if group.len() == 1 {
                group.remove(0)
            } else {
                tracing::debug!(table = name.as_str(), parts = group.len(), "combining tables");
                Rc::new(CompositeTable::merge(group)?)
            };
            registry.add(&name, table)?;
        }
        Ok(CompositeDataSet { tables: registry })
    }
}

impl DataSet for CompositeDataSet {
    fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.tables.table_names())
    }

    fn table(&self, name: &str) -> Result<TableRef> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| crate::error::Error::NoSuchTable(name.to_string()))
    }

    fn is_case_sensitive(&self) -> bool {
        self.tables.is_case_sensitive()
    }
}

#[test]
fn test_combine_concatenates_rows_in_input_order() {
    use super::memory::{make_table, MemoryDataSet};
    use crate::sql_value::Value;
    let first =
        MemoryDataSet::from_tables(vec![make_table("T", &[1, 2]), make_table("U", &[9])], false)
            .unwrap();
    let second = MemoryDataSet::from_tables(vec![make_table("t", &[3])], false).unwrap();
    let ds = CompositeDataSet::new(vec![Rc::new(first), Rc::new(second)], true, false).unwrap();
    assert_eq!(ds.table_names().unwrap(), vec!["T", "U"]);
    let t = ds.table("T").unwrap();
    assert_eq!(t.row_count().unwrap(), 3);
    let ids: Vec<Value> = (0..3).map(|r| t.value(r, "ID").unwrap()).collect();
    assert_eq!(ids, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
}

#[test]
fn test_without_combine_repeated_name_is_ambiguous() {
    use super::memory::make_table;
    use crate::error::Error;
    let r = CompositeDataSet::from_tables(vec![make_table("T", &[1]), make_table("T", &[2])], false, false);
    assert!(matches!(r, Err(Error::AmbiguousTableName(ref n)) if n == "T"));
}
