//! Concatenates the rows of several tables under one metadata.

use crate::error::{Error, Result};
use crate::metadata::TableMetaData;
use crate::sql_value::Value;
use crate::table_traits::{Table, TableRef};

/// shows the rows of each sub-table in turn.
///
/// A column of the composite metadata that a sub-table does not declare reads as `NoValue`
/// for that sub-table's rows.
pub struct CompositeTable {
    meta: TableMetaData,
    tables: Vec<TableRef>,
}

impl CompositeTable {
    pub fn new(meta: TableMetaData, tables: Vec<TableRef>) -> Self {
        CompositeTable { meta, tables }
    }

    /// combines tables sharing a name. The metadata is the first table's, widened with the
    /// columns later tables add.
    pub fn merge(tables: Vec<TableRef>) -> Result<Self> {
        let mut iter = tables.iter();
        let first = match iter.next() {
            Some(t) => t.table_meta_data().clone(),
            None => {
                return Err(Error::InvalidValue(String::from(
                    "a composite table needs at least one table",
                )))
            }
        };
        let meta = iter.fold(first, |acc, t| acc.merge(t.table_meta_data()));
        Ok(CompositeTable::new(meta, tables))
    }

    /// finds the sub-table holding `row` and the row's index within it.
    fn locate(&self, row: usize) -> Result<(&TableRef, usize)> {
        let mut offset = row;
        let mut total = 0;
        for t in &self.tables {
            let n = t.row_count()?;
            if offset < n {
                return Ok((t, offset));
            }
            offset -= n;
            total += n;
        }
        Err(Error::RowOutOfBounds {
            table: self.meta.table_name().to_string(),
            row,
            limit: total,
        })
    }
}

impl Table for CompositeTable {
    fn table_meta_data(&self) -> &TableMetaData {
        &self.meta
    }

    fn row_count(&self) -> Result<usize> {
        let mut total = 0;
        for t in &self.tables {
            total += t.row_count()?;
        }
        Ok(total)
    }

    fn value(&self, row: usize, column: &str) -> Result<Value> {
        self.meta.column_index(column)?;
        let (table, local_row) = self.locate(row)?;
        if table.table_meta_data().find_column(column).is_none() {
            return Ok(Value::NoValue);
        }
        table.value(local_row, column)
    }

    fn close(&self) -> Result<()> {
        let mut first_error = None;
        for t in &self.tables {
            if let Err(e) = t.close() {
                tracing::warn!(table = self.meta.table_name(), error = %e, "closing sub-table failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
fn make_table(columns: &[&str], rows: Vec<Vec<Value>>) -> TableRef {
    use crate::table::MemoryTable;
    std::rc::Rc::new(
        MemoryTable::with_rows(TableMetaData::with_unknown_columns("T", columns), rows).unwrap(),
    )
}

#[test]
fn test_composite_concatenates_rows_in_order() {
    let t1 = make_table(&["A"], vec![vec![Value::Int(1)], vec![Value::Int(2)]]);
    let t2 = make_table(&["A", "B"], vec![vec![Value::Int(3), Value::from("z")]]);
    let c = CompositeTable::merge(vec![t1, t2]).unwrap();
    assert_eq!(c.row_count().unwrap(), 3);
    assert_eq!(c.table_meta_data().column_names(), vec!["A", "B"]);
    assert_eq!(c.value(0, "A").unwrap(), Value::Int(1));
    assert_eq!(c.value(2, "A").unwrap(), Value::Int(3));
    assert_eq!(c.value(1, "B").unwrap(), Value::NoValue);
    assert_eq!(c.value(2, "b").unwrap(), Value::from("z"));
    assert!(matches!(
        c.value(3, "A"),
        Err(Error::RowOutOfBounds { row: 3, limit: 3, .. })
    ));
    assert!(matches!(c.value(0, "Q"), Err(Error::NoSuchColumn { .. })));
}
