//! Tables backed by the result of a live query.
//!
//! A `ResultCursor` is the query side: it describes its columns and steps through rows once.
//! `ScrollableResultTable` reads the whole result up front so that rows can be visited in any
//! order. `ForwardOnlyResultTable` reads as it goes: rows must be visited in non-decreasing
//! order and the row count is unknown.

use std::cell::{Cell, RefCell};

use crate::error::{Error, Result};
use crate::metadata::{Column, Nullable, TableMetaData};
use crate::sql_type::DataTypeFactory;
use crate::sql_value::Value;
use crate::table::MemoryTable;
use crate::table_traits::{check_row, Table};

/// describes one column of a query result, as the database reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub type_code: i32,
    pub type_name: String,
    pub nullable: Nullable,
}

pub trait ResultCursor {
    fn columns(&self) -> &[ColumnInfo];

    /// moves to the next row. Returns false once the result is exhausted.
    fn advance(&mut self) -> Result<bool>;

    /// returns column `index` of the current row.
    fn value(&self, index: usize) -> Result<Value>;

    /// releases the result. Calling it again does nothing.
    fn close(&mut self) -> Result<()>;
}

/// derives table metadata from the columns a cursor reports.
pub fn meta_data_from_columns(
    table_name: &str,
    columns: &[ColumnInfo],
    factory: &DataTypeFactory,
) -> TableMetaData {
    TableMetaData::new(
        table_name,
        columns
            .iter()
            .map(|c| {
                Column::new(
                    c.name.as_str(),
                    factory.create_data_type(c.type_code, &c.type_name),
                )
                .nullable(c.nullable)
            })
            .collect(),
    )
}

/// maps each column of `meta` to the cursor column with the same name.
fn column_mapping(meta: &TableMetaData, columns: &[ColumnInfo]) -> Result<Vec<usize>> {
    meta.columns()
        .iter()
        .map(|c| {
            columns
                .iter()
                .position(|info| info.name.eq_ignore_ascii_case(c.name()))
                .ok_or_else(|| Error::NoSuchColumn {
                    table: meta.table_name().to_string(),
                    column: c.name().to_string(),
                })
        })
        .collect()
}

/// reads `cursor` to the end and closes it. When reading fails the cursor is still closed,
/// and a close failure is only logged.
fn drain(
    meta: &TableMetaData,
    mapping: &[usize],
    cursor: &mut dyn ResultCursor,
) -> Result<MemoryTable> {
    let mut read = || -> Result<MemoryTable> {
        let mut table = MemoryTable::new(meta.clone());
        while cursor.advance()? {
            let row = mapping
                .iter()
                .map(|i| cursor.value(*i))
                .collect::<Result<Vec<Value>>>()?;
            table.add_row(row)?;
        }
        Ok(table)
    };
    match read() {
        Ok(table) => {
            cursor.close()?;
            Ok(table)
        }
        Err(e) => {
            if let Err(close_error) = cursor.close() {
                tracing::warn!(
                    table = meta.table_name(),
                    error = %close_error,
                    "close failed while handling an earlier error"
                );
            }
            Err(e)
        }
    }
}

/// holds every row of a query result in memory.
pub struct ScrollableResultTable {
    rows: MemoryTable,
}

impl ScrollableResultTable {
    /// reads the cursor completely, then closes it.
    pub fn new(meta: TableMetaData, mut cursor: Box<dyn ResultCursor>) -> Result<Self> {
        let mapping = column_mapping(&meta, cursor.columns())?;
        let rows = drain(&meta, &mapping, cursor.as_mut())?;
        tracing::debug!(table = meta.table_name(), rows = rows.rows().len(), "result materialised");
        Ok(ScrollableResultTable { rows })
    }
}

impl Table for ScrollableResultTable {
    fn table_meta_data(&self) -> &TableMetaData {
        self.rows.table_meta_data()
    }

    fn row_count(&self) -> Result<usize> {
        self.rows.row_count()
    }

    fn value(&self, row: usize, column: &str) -> Result<Value> {
        self.rows.value(row, column)
    }
}

/// reads a query result one row at a time.
///
/// The current row is held in the table, so it can be read any number of times, even after a
/// read past the end has exhausted the cursor. Asking for a later row moves the cursor
/// forward; asking for an earlier one fails with `ForwardOnly`. Once the result is exhausted,
/// rows past the end fail with `RowOutOfBounds`.
///
/// The cursor is closed by `close` or, failing that, when the table is dropped.
pub struct ForwardOnlyResultTable {
    meta: TableMetaData,
    mapping: Vec<usize>,
    cursor: RefCell<Box<dyn ResultCursor>>,
    current: Cell<Option<usize>>,
    /// values of row `current`, in the order of `meta`'s columns.
    row: RefCell<Vec<Value>>,
    exhausted: Cell<bool>,
    closed: Cell<bool>,
}

impl ForwardOnlyResultTable {
    pub fn new(meta: TableMetaData, cursor: Box<dyn ResultCursor>) -> Result<Self> {
        let mapping = column_mapping(&meta, cursor.columns())?;
        Ok(ForwardOnlyResultTable {
            meta,
            mapping,
            cursor: RefCell::new(cursor),
            current: Cell::new(None),
            row: RefCell::new(vec![]),
            exhausted: Cell::new(false),
            closed: Cell::new(false),
        })
    }

    fn rows_seen(&self) -> usize {
        self.current.get().map_or(0, |c| c + 1)
    }

    /// moves the cursor onto `row`.
    fn seek(&self, row: usize) -> Result<()> {
        if let Some(current) = self.current.get() {
            if row < current {
                return Err(Error::ForwardOnly {
                    table: self.meta.table_name().to_string(),
                    requested: row,
                    current,
                });
            }
        }
        let mut cursor = self.cursor.borrow_mut();
        while self.current.get() != Some(row) {
            if self.exhausted.get() || !cursor.advance()? {
                self.exhausted.set(true);
                return check_row(self.meta.table_name(), row, self.rows_seen());
            }
            let next = self.rows_seen();
            if next == row {
                // Rows skipped on the way are not read.
                let values = self
                    .mapping
                    .iter()
                    .map(|i| cursor.value(*i))
                    .collect::<Result<Vec<Value>>>()?;
                *self.row.borrow_mut() = values;
            }
            self.current.set(Some(next));
        }
        Ok(())
    }
}

impl Table for ForwardOnlyResultTable {
    fn table_meta_data(&self) -> &TableMetaData {
        &self.meta
    }

    fn row_count(&self) -> Result<usize> {
        Err(Error::RowCountUnsupported(self.meta.table_name().to_string()))
    }

    fn value(&self, row: usize, column: &str) -> Result<Value> {
        let col = self.meta.column_index(column)?;
        if self.closed.get() {
            return Err(Error::Closed(self.meta.table_name().to_string()));
        }
        self.seek(row)?;
        self.row
            .borrow()
            .get(col)
            .cloned()
            .ok_or_else(|| Error::InvalidValue(format!("row {} was not read", row)))
    }

    fn close(&self) -> Result<()> {
        if self.closed.replace(true) {
            return Ok(());
        }
        tracing::trace!(table = self.meta.table_name(), "closing result");
        self.row.borrow_mut().clear();
        self.cursor.borrow_mut().close()
    }
}

impl Drop for ForwardOnlyResultTable {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(table = self.meta.table_name(), error = %e, "closing result on drop failed");
        }
    }
}

/// a cursor over rows held in memory.
#[cfg(test)]
pub(crate) struct VecCursor {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<Value>>,
    pub position: Option<usize>,
    pub closes: std::rc::Rc<Cell<usize>>,
    pub fail_close: bool,
}

#[cfg(test)]
impl VecCursor {
    pub fn new(names: &[&str], rows: Vec<Vec<Value>>) -> Self {
        VecCursor {
            columns: names
                .iter()
                .map(|n| ColumnInfo {
                    name: n.to_string(),
                    type_code: crate::sql_type::codes::VARCHAR,
                    type_name: String::from("VARCHAR"),
                    nullable: Nullable::NullableUnknown,
                })
                .collect(),
            rows,
            position: None,
            closes: std::rc::Rc::new(Cell::new(0)),
            fail_close: false,
        }
    }
}

#[cfg(test)]
impl ResultCursor for VecCursor {
    fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    fn advance(&mut self) -> Result<bool> {
        let next = self.position.map_or(0, |p| p + 1);
        self.position = Some(next);
        Ok(next < self.rows.len())
    }

    fn value(&self, index: usize) -> Result<Value> {
        match self.position {
            Some(p) if p < self.rows.len() => Ok(self.rows[p][index].clone()),
            _ => Err(Error::InvalidValue(String::from("cursor is not on a row"))),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.closes.set(self.closes.get() + 1);
        if self.fail_close {
            return Err(Error::InvalidValue(String::from("close failed")));
        }
        Ok(())
    }
}

#[cfg(test)]
fn make_cursor() -> VecCursor {
    VecCursor::new(
        &["A", "B"],
        vec![
            vec![Value::Int(1), Value::from("x")],
            vec![Value::Int(2), Value::from("y")],
            vec![Value::Int(3), Value::from("z")],
        ],
    )
}

#[cfg(test)]
fn cursor_meta(cursor: &VecCursor) -> TableMetaData {
    meta_data_from_columns("T", cursor.columns(), &DataTypeFactory::new())
}

#[test]
fn test_forward_only_monotonic_reads() {
    let cursor = make_cursor();
    let t = ForwardOnlyResultTable::new(cursor_meta(&cursor), Box::new(cursor)).unwrap();
    assert!(matches!(t.row_count(), Err(Error::RowCountUnsupported(_))));
    assert_eq!(t.value(0, "A").unwrap(), Value::Int(1));
    assert_eq!(t.value(0, "b").unwrap(), Value::from("x"));
    assert_eq!(t.value(2, "A").unwrap(), Value::Int(3));
    match t.value(1, "A") {
        Err(Error::ForwardOnly { requested, current, .. }) => {
            assert_eq!(requested, 1);
            assert_eq!(current, 2);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(
        t.value(3, "A"),
        Err(Error::RowOutOfBounds { row: 3, limit: 3, .. })
    ));
    assert!(matches!(t.value(2, "C"), Err(Error::NoSuchColumn { .. })));
}

#[test]
fn test_forward_only_rereads_last_row_after_end() {
    let cursor = make_cursor();
    let t = ForwardOnlyResultTable::new(cursor_meta(&cursor), Box::new(cursor)).unwrap();
    assert_eq!(t.value(2, "A").unwrap(), Value::Int(3));
    assert!(matches!(
        t.value(3, "A"),
        Err(Error::RowOutOfBounds { row: 3, limit: 3, .. })
    ));
    assert_eq!(t.value(2, "A").unwrap(), Value::Int(3));
    assert_eq!(t.value(2, "B").unwrap(), Value::from("z"));
    assert!(matches!(t.value(4, "A"), Err(Error::RowOutOfBounds { .. })));
    assert!(matches!(t.value(1, "A"), Err(Error::ForwardOnly { .. })));
}

#[test]
fn test_forward_only_close_is_idempotent() {
    let cursor = make_cursor();
    let closes = cursor.closes.clone();
    let t = ForwardOnlyResultTable::new(cursor_meta(&cursor), Box::new(cursor)).unwrap();
    t.close().unwrap();
    t.close().unwrap();
    assert!(matches!(t.value(0, "A"), Err(Error::Closed(_))));
    drop(t);
    assert_eq!(closes.get(), 1);
}

#[test]
fn test_forward_only_closes_on_drop() {
    let mut cursor = make_cursor();
    cursor.fail_close = true;
    let closes = cursor.closes.clone();
    let t = ForwardOnlyResultTable::new(cursor_meta(&cursor), Box::new(cursor)).unwrap();
    drop(t);
    assert_eq!(closes.get(), 1);
}

#[test]
fn test_scrollable_reads_everything_and_closes() {
    let cursor = make_cursor();
    let closes = cursor.closes.clone();
    let meta = TableMetaData::new(
        "T",
        vec![
            Column::new("B", crate::sql_type::DataType::Varchar),
            Column::new("A", crate::sql_type::DataType::Integer),
        ],
    );
    let t = ScrollableResultTable::new(meta, Box::new(cursor)).unwrap();
    assert_eq!(closes.get(), 1);
    assert_eq!(t.row_count().unwrap(), 3);
    assert_eq!(t.value(2, "B").unwrap(), Value::from("z"));
    assert_eq!(t.value(0, "A").unwrap(), Value::Int(1));
}

#[test]
fn test_meta_data_must_match_cursor_columns() {
    let cursor = make_cursor();
    let meta = TableMetaData::with_unknown_columns("T", &["A", "MISSING"]);
    assert!(matches!(
        ScrollableResultTable::new(meta, Box::new(cursor)),
        Err(Error::NoSuchColumn { .. })
    ));
}
