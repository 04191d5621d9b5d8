//! Traits common to all tables and datasets, whatever backs them.

use std::rc::Rc;

use streaming_iterator::StreamingIterator;

use crate::error::{Error, Result};
use crate::metadata::TableMetaData;
use crate::sql_value::Value;

/// gives row-indexed access to the values of one table.
pub trait Table {
    fn table_meta_data(&self) -> &TableMetaData;

    /// returns the number of rows. Forward-only tables return `RowCountUnsupported`.
    fn row_count(&self) -> Result<usize>;

    /// returns the value at `row` in `column` (case-insensitive column name).
    ///
    /// Fails with `NoSuchColumn` for an undeclared column and with a bounds error for a row
    /// outside the table. `Value::NoValue` comes back only for cells the source never offered.
    fn value(&self, row: usize, column: &str) -> Result<Value>;

    /// releases whatever resource backs the table. Calling it twice is harmless.
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

pub type TableRef = Rc<dyn Table>;

/// iterates over the tables of a dataset, in registry order or its reverse.
pub type TableIter<'a> = Box<dyn Iterator<Item = Result<TableRef>> + 'a>;

/// is an ordered collection of named tables.
pub trait DataSet {
    /// returns the names in dataset order.
    fn table_names(&self) -> Result<Vec<String>>;

    /// returns table `name`, or `NoSuchTable`.
    fn table(&self, name: &str) -> Result<TableRef>;

    fn is_case_sensitive(&self) -> bool;

    fn table_meta_data(&self, name: &str) -> Result<TableMetaData> {
        Ok(self.table(name)?.table_meta_data().clone())
    }

    /// returns a fresh iterator positioned before the first table.
    fn iter(&self) -> Result<TableIter<'_>> {
        let names = self.table_names()?;
        Ok(Box::new(names.into_iter().map(move |n| self.table(&n))))
    }

    /// returns a fresh iterator positioned after the last table, moving backward.
    fn reverse_iter(&self) -> Result<TableIter<'_>> {
        let names = self.table_names()?;
        Ok(Box::new(names.into_iter().rev().map(move |n| self.table(&n))))
    }
}

/// fails with `RowOutOfBounds` unless `row < count`.
pub fn check_row(table_name: &str, row: usize, count: usize) -> Result<()> {
    if row >= count {
        return Err(Error::RowOutOfBounds {
            table: table_name.to_string(),
            row,
            limit: count,
        });
    }
    Ok(())
}

/// reads every column of one row, in declaration order.
pub fn read_row(table: &dyn Table, row: usize) -> Result<Vec<Value>> {
    table
        .table_meta_data()
        .columns()
        .iter()
        .map(|c| table.value(row, c.name()))
        .collect()
}

/// steps through the rows of any table once, from the first row.
///
/// Tables that know their row count are read up to it. Forward-only tables are read until
/// they report a row out of bounds. Any other failure ends the iteration and is returned by
/// `finish`.
pub struct RowCursor<'a> {
    table: &'a dyn Table,
    known_count: Option<usize>,
    next_row: usize,
    item: Option<Vec<Value>>,
    error: Option<Error>,
    done: bool,
}

impl<'a> RowCursor<'a> {
    pub fn new(table: &'a dyn Table) -> Result<RowCursor<'a>> {
        let known_count = match table.row_count() {
            Ok(n) => Some(n),
            Err(Error::RowCountUnsupported(_)) => None,
            Err(e) => return Err(e),
        };
        Ok(RowCursor {
            table,
            known_count,
            next_row: 0,
            item: None,
            error: None,
            done: false,
        })
    }

    /// returns the index of the row `get` currently yields.
    pub fn row_index(&self) -> Option<usize> {
        self.item.as_ref().map(|_| self.next_row - 1)
    }

    /// returns the first failure met while reading, if any.
    pub fn finish(self) -> Result<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn read_next(&mut self) -> Result<Option<Vec<Value>>> {
        let row = self.next_row;
        match self.known_count {
            Some(n) if row >= n => return Ok(None),
            Some(_) => {}
            None => {
                // Probe the first column to learn whether the row exists.
                let md = self.table.table_meta_data();
                let first = match md.columns().first() {
                    Some(c) => c.name().to_string(),
                    None => return Ok(None),
                };
                match self.table.value(row, &first) {
                    Err(Error::RowOutOfBounds { .. }) => return Ok(None),
                    Err(e) => return Err(e),
                    Ok(_) => {}
                }
            }
        }
        read_row(self.table, row).map(Some)
    }
}

impl<'a> StreamingIterator for RowCursor<'a> {
    type Item = Vec<Value>;

    fn advance(&mut self) {
        if self.done {
            self.item = None;
            return;
        }
        match self.read_next() {
            Ok(Some(values)) => {
                self.next_row += 1;
                self.item = Some(values);
            }
            Ok(None) => {
                self.done = true;
                self.item = None;
            }
            Err(e) => {
                self.done = true;
                self.item = None;
                self.error = Some(e);
            }
        }
    }

    fn get(&self) -> Option<&Vec<Value>> {
        self.item.as_ref()
    }
}
