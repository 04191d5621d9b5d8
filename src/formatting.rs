//! formatting prints out tables nicely.

use std::fmt::{self, Write};

use streaming_iterator::StreamingIterator;

use crate::error::{Error, Result};
use crate::metadata::TableMetaData;
use crate::sql_value::Value;
use crate::table_traits::{DataSet, RowCursor, Table};

fn format_cells<I: Iterator<Item = String>>(cells: I) -> String {
    format!(
        "   | {} |",
        cells
            .map(|x| format!("{:15}", x))
            .collect::<Vec<String>>()
            .join(" | ")
    )
}

fn write_header(out: &mut String, meta: &TableMetaData, detailed: bool) -> fmt::Result {
    writeln!(out, "Full Dump of Table {}", meta.table_name())?;
    writeln!(
        out,
        "{}",
        format_cells(meta.columns().iter().map(|c| c.name().to_string()))
    )?;
    if detailed {
        writeln!(
            out,
            "{}",
            format_cells(meta.columns().iter().map(|c| c.data_type().to_string()))
        )?;
    }
    Ok(())
}

fn write_row(out: &mut String, rowid: usize, row: &[Value]) -> fmt::Result {
    write!(out, "{:2} |", rowid)?;
    for v in row {
        write!(out, " {:15} |", v.to_string())?;
    }
    writeln!(out)
}

/// Formats every row of `table`, one line per row, under a header of column names.
/// With `detailed`, a second header line gives the column types.
pub fn format_table(table: &dyn Table, detailed: bool) -> Result<String> {
    let mut out = String::new();
    write_header(&mut out, table.table_meta_data(), detailed).map_err(format_error)?;
    let mut cursor = RowCursor::new(table)?;
    let mut rowid = 0;
    while let Some(row) = cursor.next() {
        write_row(&mut out, rowid, row).map_err(format_error)?;
        rowid += 1;
    }
    cursor.finish()?;
    Ok(out)
}

fn format_error(e: fmt::Error) -> Error {
    Error::InvalidValue(format!("formatting failed: {}", e))
}

/// Formats each table of `data_set` in dataset order.
pub fn format_data_set(data_set: &dyn DataSet, detailed: bool) -> Result<String> {
    let mut out = String::new();
    for table in data_set.iter()? {
        out.push_str(&format_table(table?.as_ref(), detailed)?);
    }
    Ok(out)
}

#[test]
fn test_format_table() {
    use crate::metadata::{Column, TableMetaData};
    use crate::sql_type::DataType;
    use crate::sql_value::Value;
    use crate::table::MemoryTable;
    let t = MemoryTable::with_rows(
        TableMetaData::new(
            "T",
            vec![
                Column::new("A", DataType::Integer),
                Column::new("B", DataType::Varchar),
            ],
        ),
        vec![vec![Value::Int(1), Value::Null]],
    )
    .unwrap();
    let s = format_table(&t, true).unwrap();
    let lines: Vec<&str> = s.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "Full Dump of Table T");
    assert!(lines[1].contains("A              "));
    assert!(lines[2].contains("INTEGER"));
    assert!(lines[3].starts_with(" 0 | 1 "));
    assert!(lines[3].contains("NULL"));
}
