//! Defines `MemoryDataSet`, a dataset assembled from tables the caller already holds.

use std::rc::Rc;

use crate::config::DuplicateTablePolicy;
use crate::error::{Error, Result};
use crate::registry::OrderedTableNameMap;
use crate::table::{CompositeTable, MemoryTable};
use crate::table_traits::{DataSet, TableRef};

/// holds tables in the order they were added.
///
/// Adding a second table under a name already present fails with `AmbiguousTableName` under
/// the default `Reject` policy. Under `Merge` the two tables are joined into a
/// `CompositeTable`, earlier rows first.
pub struct MemoryDataSet {
    tables: OrderedTableNameMap<TableRef>,
    policy: DuplicateTablePolicy,
}

impl MemoryDataSet {
    pub fn new(case_sensitive: bool) -> Self {
        Self::with_policy(case_sensitive, DuplicateTablePolicy::Reject)
    }

    pub fn with_policy(case_sensitive: bool, policy: DuplicateTablePolicy) -> Self {
        MemoryDataSet {
            tables: OrderedTableNameMap::new(case_sensitive),
            policy,
        }
    }

    pub fn from_tables(tables: Vec<TableRef>, case_sensitive: bool) -> Result<Self> {
        let mut ds = Self::new(case_sensitive);
        for t in tables {
            ds.add_table(t)?;
        }
        Ok(ds)
    }

    pub fn from_memory_tables(tables: Vec<MemoryTable>, case_sensitive: bool) -> Result<Self> {
        Self::from_tables(
            tables.into_iter().map(|t| Rc::new(t) as TableRef).collect(),
            case_sensitive,
        )
    }

    pub fn add_table(&mut self, table: TableRef) -> Result<()> {
        let name = table.table_meta_data().table_name().to_string();
        let existing = match self.tables.get(&name) {
            None => return self.tables.add(&name, table),
            Some(existing) => existing.clone(),
        };
        match self.policy {
            DuplicateTablePolicy::Reject => Err(Error::AmbiguousTableName(name)),
            DuplicateTablePolicy::Merge => {
                tracing::debug!(table = name.as_str(), "merging duplicate table");
                let merged = CompositeTable::merge(vec![existing, table])?;
                self.tables.update(&name, Rc::new(merged))
            }
        }
    }

    pub fn policy(&self) -> DuplicateTablePolicy {
        self.policy
    }
}

impl DataSet for MemoryDataSet {
    fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.tables.table_names())
    }

    fn table(&self, name: &str) -> Result<TableRef> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NoSuchTable(name.to_string()))
    }

    fn is_case_sensitive(&self) -> bool {
        self.tables.is_case_sensitive()
    }
}

#[cfg(test)]
pub(crate) fn make_table(name: &str, rows: &[i64]) -> TableRef {
    use crate::metadata::{Column, TableMetaData};
    use crate::sql_type::DataType;
    use crate::sql_value::Value;
    let meta = TableMetaData::new(name, vec![Column::new("ID", DataType::Integer)]);
    let rows = rows.iter().map(|r| vec![Value::Int(*r)]).collect();
    Rc::new(MemoryTable::with_rows(meta, rows).unwrap())
}

#[test]
fn test_memory_data_set_order_and_lookup() {
    let ds = MemoryDataSet::from_tables(
        vec![make_table("B", &[1]), make_table("a", &[2]), make_table("C", &[])],
        false,
    )
    .unwrap();
    assert_eq!(ds.table_names().unwrap(), vec!["B", "a", "C"]);
    assert_eq!(ds.table("A").unwrap().row_count().unwrap(), 1);
    assert!(matches!(ds.table("D"), Err(Error::NoSuchTable(_))));
    let names: Vec<String> = ds
        .reverse_iter()
        .unwrap()
        .map(|t| t.unwrap().table_meta_data().table_name().to_string())
        .collect();
    assert_eq!(names, vec!["C", "a", "B"]);
}

#[test]
fn test_memory_data_set_duplicate_policy() {
    let rejected =
        MemoryDataSet::from_tables(vec![make_table("T", &[1]), make_table("t", &[2])], false);
    assert!(matches!(rejected, Err(Error::AmbiguousTableName(_))));

    let mut merged = MemoryDataSet::with_policy(false, DuplicateTablePolicy::Merge);
    merged.add_table(make_table("T", &[1, 2])).unwrap();
    merged.add_table(make_table("T", &[3])).unwrap();
    let t = merged.table("T").unwrap();
    assert_eq!(t.row_count().unwrap(), 3);
    assert_eq!(t.value(2, "ID").unwrap(), crate::sql_value::Value::Int(3));
    assert_eq!(merged.table_names().unwrap().len(), 1);
}

#[test]
fn test_case_sensitive_data_set_keeps_both_spellings() {
    let ds =
        MemoryDataSet::from_tables(vec![make_table("T", &[1]), make_table("t", &[2])], true).unwrap();
    assert_eq!(ds.table_names().unwrap(), vec!["T", "t"]);
    assert!(ds.is_case_sensitive());
}
