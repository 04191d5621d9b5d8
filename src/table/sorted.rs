//! Presents the rows of a table ordered by some of its columns.

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::metadata::TableMetaData;
use crate::sql_type::{compare_cast_values, DataType};
use crate::sql_value::Value;
use crate::table::MemoryTable;
use crate::table_traits::{check_row, Table, TableRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    /// orders by each column's data type (numbers numerically, dates chronologically).
    Typed,
    /// orders by the text form of each value.
    Text,
}

/// sorts a table once, at construction. Ties keep their original relative order.
pub struct SortedTable {
    inner: TableRef,
    order: Vec<usize>,
    sort_columns: Vec<String>,
}

impl SortedTable {
    /// sorts by every column, in declaration order.
    pub fn new(table: TableRef) -> Result<Self> {
        let names = table.table_meta_data().column_names();
        Self::with_columns(table, &names, SortMode::Typed)
    }

    /// sorts by the primary key. Fails with `NoPrimaryKey` when none is declared.
    pub fn by_primary_keys(table: TableRef) -> Result<Self> {
        let keys = table.table_meta_data().primary_key_names();
        if keys.is_empty() {
            return Err(Error::NoPrimaryKey(
                table.table_meta_data().table_name().to_string(),
            ));
        }
        Self::with_columns(table, &keys, SortMode::Typed)
    }

    pub fn with_columns<S: AsRef<str>>(
        table: TableRef,
        columns: &[S],
        mode: SortMode,
    ) -> Result<Self> {
        let table: TableRef = match table.row_count() {
            Ok(_) => table,
            Err(Error::RowCountUnsupported(_)) => Rc::new(MemoryTable::copy_of(table.as_ref())?),
            Err(e) => return Err(e),
        };
        let meta = table.table_meta_data();
        let mut sort_columns = vec![];
        let mut types = vec![];
        for c in columns {
            let col = meta.column(c.as_ref())?;
            sort_columns.push(col.name().to_string());
            types.push(match mode {
                SortMode::Typed => col.data_type(),
                SortMode::Text => DataType::Varchar,
            });
        }
        let count = table.row_count()?;
        let mut keys: Vec<Vec<Value>> = Vec::with_capacity(count);
        for row in 0..count {
            let mut key = Vec::with_capacity(sort_columns.len());
            for (name, dt) in sort_columns.iter().zip(types.iter()) {
                key.push(dt.type_cast(&table.value(row, name)?)?);
            }
            keys.push(key);
        }
        let mut order: Vec<usize> = (0..count).collect();
        order.sort_by(|a, b| {
            keys[*a]
                .iter()
                .zip(keys[*b].iter())
                .map(|(x, y)| compare_cast_values(x, y))
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        tracing::debug!(
            table = meta.table_name(),
            columns = ?sort_columns,
            "sorted table"
        );
        Ok(SortedTable {
            inner: table,
            order,
            sort_columns,
        })
    }

    pub fn sort_columns(&self) -> &[String] {
        &self.sort_columns
    }
}

impl Table for SortedTable {
    fn table_meta_data(&self) -> &TableMetaData {
        self.inner.table_meta_data()
    }

    fn row_count(&self) -> Result<usize> {
        Ok(self.order.len())
    }

    fn value(&self, row: usize, column: &str) -> Result<Value> {
        self.inner.table_meta_data().column_index(column)?;
        check_row(self.inner.table_meta_data().table_name(), row, self.order.len())?;
        self.inner.value(self.order[row], column)
    }
}

#[cfg(test)]
fn make_table() -> TableRef {
    use crate::metadata::Column;
    let meta = TableMetaData::new(
        "T",
        vec![
            Column::new("N", DataType::Integer),
            Column::new("S", DataType::Varchar),
        ],
    );
    Rc::new(
        MemoryTable::with_rows(
            meta,
            vec![
                vec![Value::from("10"), Value::from("b")],
                vec![Value::Int(9), Value::from("a")],
                vec![Value::Null, Value::from("c")],
                vec![Value::Int(9), Value::from("0")],
            ],
        )
        .unwrap(),
    )
}

#[test]
fn test_sorted_typed() {
    let s = SortedTable::new(make_table()).unwrap();
    let ns: Vec<Value> = (0..4).map(|r| s.value(r, "S").unwrap()).collect();
    assert_eq!(
        ns,
        vec![
            Value::from("c"),
            Value::from("0"),
            Value::from("a"),
            Value::from("b")
        ]
    );
}

#[test]
fn test_sorted_text() {
    let s = SortedTable::with_columns(make_table(), &["N"], SortMode::Text).unwrap();
    // "10" sorts before "9" as text; the two 9s keep their order.
    let ss: Vec<Value> = (0..4).map(|r| s.value(r, "S").unwrap()).collect();
    assert_eq!(
        ss,
        vec![
            Value::from("c"),
            Value::from("b"),
            Value::from("a"),
            Value::from("0")
        ]
    );
}

#[test]
fn test_sorted_by_missing_primary_key() {
    let err = SortedTable::by_primary_keys(make_table()).err().unwrap();
    assert!(matches!(err, Error::NoPrimaryKey(ref t) if t == "T"));
}
