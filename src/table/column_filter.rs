//! Hides some columns of a table.

use crate::error::Result;
use crate::metadata::{Column, TableMetaData};
use crate::pattern::PatternSet;
use crate::sql_value::Value;
use crate::table_traits::{Table, TableRef};

/// decides which columns of a table stay visible.
pub trait ColumnFilter {
    fn accept(&self, table_name: &str, column: &Column) -> bool;
}

impl ColumnFilter for PatternSet {
    fn accept(&self, _table_name: &str, column: &Column) -> bool {
        self.accepts(column.name())
    }
}

/// shows only the columns a `ColumnFilter` accepts, keeping their declaration order.
pub struct ColumnFilterTable {
    inner: TableRef,
    meta: TableMetaData,
}

impl ColumnFilterTable {
    pub fn new(inner: TableRef, filter: &dyn ColumnFilter) -> Self {
        let source = inner.table_meta_data();
        let meta = source.retain_columns(|c| filter.accept(source.table_name(), c));
        ColumnFilterTable { inner, meta }
    }

    /// hides the columns matching any of `patterns` (case-insensitive wildcards).
    pub fn excluding<S: AsRef<str>>(inner: TableRef, patterns: &[S]) -> Self {
        let set = patterns
            .iter()
            .fold(PatternSet::new(false), |s, p| s.exclude(p.as_ref()));
        Self::new(inner, &set)
    }

    /// keeps only the columns matching any of `patterns` (case-insensitive wildcards).
    pub fn including<S: AsRef<str>>(inner: TableRef, patterns: &[S]) -> Self {
        let set = patterns
            .iter()
            .fold(PatternSet::new(false), |s, p| s.include(p.as_ref()));
        Self::new(inner, &set)
    }
}

impl Table for ColumnFilterTable {
    fn table_meta_data(&self) -> &TableMetaData {
        &self.meta
    }

    fn row_count(&self) -> Result<usize> {
        self.inner.row_count()
    }

    fn value(&self, row: usize, column: &str) -> Result<Value> {
        self.meta.column_index(column)?;
        self.inner.value(row, column)
    }

    fn close(&self) -> Result<()> {
        self.inner.close()
    }
}

#[test]
fn test_column_filter_table() {
    use crate::error::Error;
    use crate::table::MemoryTable;
    use std::rc::Rc;
    let inner = MemoryTable::with_rows(
        TableMetaData::with_unknown_columns("T", &["ID", "NAME", "CREATED_AT", "UPDATED_AT"]),
        vec![vec![
            Value::Int(1),
            Value::from("n"),
            Value::from("c"),
            Value::from("u"),
        ]],
    )
    .unwrap();
    let inner: TableRef = Rc::new(inner);
    let t = ColumnFilterTable::excluding(inner.clone(), &["*_at"]);
    assert_eq!(t.table_meta_data().column_names(), vec!["ID", "NAME"]);
    assert_eq!(t.value(0, "name").unwrap(), Value::from("n"));
    assert!(matches!(
        t.value(0, "CREATED_AT"),
        Err(Error::NoSuchColumn { .. })
    ));
    let t = ColumnFilterTable::including(inner, &["ID", "created*"]);
    assert_eq!(t.table_meta_data().column_names(), vec!["ID", "CREATED_AT"]);
    assert_eq!(t.row_count().unwrap(), 1);
}
