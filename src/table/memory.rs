//! provides an in-memory table of fixture data.
//!
//! The table is implemented with rust native data structures. The uses of MemoryTable are:
//!   - To hold fixtures built by hand in tests.
//!   - To collect the rows a producer streams into a cached dataset.
//!   - To materialise a forward-only table so that it can be counted and read in any order.

use streaming_iterator::StreamingIterator;

use crate::error::{Error, Result};
use crate::metadata::TableMetaData;
use crate::sql_value::Value;
use crate::table_traits::{check_row, RowCursor, Table};

#[derive(Debug, Clone)]
pub struct MemoryTable {
    meta: TableMetaData,
    rows: Vec<Vec<Value>>,
}

impl MemoryTable {
    pub fn new(meta: TableMetaData) -> Self {
        MemoryTable { meta, rows: vec![] }
    }

    pub fn with_rows(meta: TableMetaData, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut t = MemoryTable::new(meta);
        for r in rows {
            t.add_row(r)?;
        }
        Ok(t)
    }

    /// copies every row of `table`. Works on forward-only tables, reading them once.
    pub fn copy_of(table: &dyn Table) -> Result<Self> {
        let mut t = MemoryTable::new(table.table_meta_data().clone());
        t.add_table_rows(table)?;
        Ok(t)
    }

    /// appends a row. It must hold one value per declared column.
    pub fn add_row(&mut self, values: Vec<Value>) -> Result<()> {
        let expected = self.meta.columns().len();
        if values.len() != expected {
            return Err(Error::InvalidValue(format!(
                "row for table {} has {} values but the table has {} columns",
                self.meta.table_name(),
                values.len(),
                expected
            )));
        }
        self.rows.push(values);
        Ok(())
    }

    /// appends every row of `table`, matching columns by name. Columns this table declares but
    /// `table` lacks are filled with `NoValue`.
    pub fn add_table_rows(&mut self, table: &dyn Table) -> Result<()> {
        let source = table.table_meta_data();
        let mapping: Vec<Option<usize>> = self
            .meta
            .columns()
            .iter()
            .map(|c| source.find_column(c.name()))
            .collect();
        let mut cursor = RowCursor::new(table)?;
        while let Some(row) = cursor.next() {
            let values = mapping
                .iter()
                .map(|m| match m {
                    Some(i) => row[*i].clone(),
                    None => Value::NoValue,
                })
                .collect();
            self.rows.push(values);
        }
        cursor.finish()
    }

    pub fn set_value(&mut self, row: usize, column: &str, value: Value) -> Result<()> {
        check_row(self.meta.table_name(), row, self.rows.len())?;
        let col = self.meta.column_index(column)?;
        self.rows[row][col] = value;
        Ok(())
    }

    /// replaces the metadata with `meta`, which must keep every existing column. Existing rows
    /// get `NoValue` for the new columns.
    pub fn widen(&mut self, meta: TableMetaData) -> Result<()> {
        let mapping: Vec<usize> = self
            .meta
            .columns()
            .iter()
            .map(|c| meta.column_index(c.name()))
            .collect::<Result<_>>()?;
        let width = meta.columns().len();
        for row in self.rows.iter_mut() {
            let mut widened = vec![Value::NoValue; width];
            for (old, new) in mapping.iter().enumerate() {
                widened[*new] = std::mem::replace(&mut row[old], Value::NoValue);
            }
            *row = widened;
        }
        self.meta = meta;
        Ok(())
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }
}

impl Table for MemoryTable {
    fn table_meta_data(&self) -> &TableMetaData {
        &self.meta
    }

    fn row_count(&self) -> Result<usize> {
        Ok(self.rows.len())
    }

    fn value(&self, row: usize, column: &str) -> Result<Value> {
        let col = self.meta.column_index(column)?;
        check_row(self.meta.table_name(), row, self.rows.len())?;
        Ok(self.rows[row][col].clone())
    }
}

#[cfg(test)]
fn make_table() -> MemoryTable {
    use crate::metadata::Column;
    use crate::sql_type::DataType;
    let meta = TableMetaData::new(
        "T",
        vec![
            Column::new("A", DataType::Integer),
            Column::new("B", DataType::Varchar),
        ],
    );
    MemoryTable::with_rows(
        meta,
        vec![
            vec![Value::Int(1), Value::from("x")],
            vec![Value::Int(2), Value::from("y")],
        ],
    )
    .unwrap()
}

#[test]
fn test_memory_table() {
    let tbl = make_table();
    assert_eq!(tbl.row_count().unwrap(), 2);
    assert_eq!(tbl.value(1, "b").unwrap(), Value::from("y"));
    assert!(matches!(
        tbl.value(2, "A"),
        Err(Error::RowOutOfBounds { row: 2, limit: 2, .. })
    ));
    assert!(matches!(tbl.value(0, "C"), Err(Error::NoSuchColumn { .. })));
    let mut it = RowCursor::new(&tbl).unwrap();
    it.advance();
    assert_eq!(it.get(), Some(&vec![Value::Int(1), Value::from("x")]));
    assert_eq!(it.row_index(), Some(0));
    it.advance();
    it.advance();
    assert_eq!(it.get(), None);
}

#[test]
fn test_add_row_checks_width() {
    let mut tbl = make_table();
    assert!(matches!(
        tbl.add_row(vec![Value::Int(3)]),
        Err(Error::InvalidValue(_))
    ));
    assert_eq!(tbl.row_count().unwrap(), 2);
}

#[test]
fn test_widen_backfills_no_value() {
    use crate::metadata::Column;
    use crate::sql_type::DataType;
    let mut tbl = make_table();
    let wider = tbl
        .table_meta_data()
        .merge(&TableMetaData::new("T", vec![Column::new("C", DataType::Unknown)]));
    tbl.widen(wider).unwrap();
    assert_eq!(tbl.value(0, "C").unwrap(), Value::NoValue);
    assert_eq!(tbl.value(1, "A").unwrap(), Value::Int(2));
    tbl.add_row(vec![Value::Int(3), Value::from("z"), Value::from("c")])
        .unwrap();
    assert_eq!(tbl.value(2, "c").unwrap(), Value::from("c"));
}

#[test]
fn test_copy_of() {
    let tbl = make_table();
    let copy = MemoryTable::copy_of(&tbl).unwrap();
    assert_eq!(copy.rows(), tbl.rows());
}
