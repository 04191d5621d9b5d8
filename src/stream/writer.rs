//! Writes a dataset as flat XML, one row element per line.

use std::io::Write;

use crate::error::Result;
use crate::metadata::TableMetaData;
use crate::sql_value::Value;
use crate::table_traits::DataSet;

use super::consumer::{check_row_width, Consumer, Producer, ProtocolEvent, ProtocolState};
use super::producer::DataSetProducer;

/// escapes text for use inside a double-quoted attribute.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            _ => out.push(c),
        }
    }
    out
}

/// a consumer that streams what it receives to `out` as flat XML.
///
/// Null and absent values are left out of a row. A table without rows is written as a single
/// empty element, so that reading the output back declares the table.
pub struct FlatXmlWriter<W: Write> {
    out: W,
    state: ProtocolState,
    doctype: Option<String>,
    open: Option<TableMetaData>,
    rows_in_table: usize,
}

impl<W: Write> FlatXmlWriter<W> {
    pub fn new(out: W) -> Self {
        FlatXmlWriter {
            out,
            state: ProtocolState::NotStarted,
            doctype: None,
            open: None,
            rows_in_table: 0,
        }
    }

    /// adds a DOCTYPE naming an external DTD.
    pub fn with_doctype(mut self, system_id: &str) -> Self {
        self.doctype = Some(system_id.to_string());
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Consumer for FlatXmlWriter<W> {
    fn start_data_set(&mut self) -> Result<()> {
        self.state.advance(ProtocolEvent::StartDataSet)?;
        writeln!(self.out, "<?xml version='1.0' encoding='UTF-8'?>")?;
        if let Some(id) = &self.doctype {
            writeln!(self.out, "<!DOCTYPE dataset SYSTEM \"{}\">", escape(id))?;
        }
        writeln!(self.out, "<dataset>")?;
        Ok(())
    }

    fn end_data_set(&mut self) -> Result<()> {
        self.state.advance(ProtocolEvent::EndDataSet)?;
        writeln!(self.out, "</dataset>")?;
        self.out.flush()?;
        Ok(())
    }

    fn start_table(&mut self, meta: &TableMetaData) -> Result<()> {
        self.state.advance(ProtocolEvent::StartTable)?;
        self.open = Some(meta.clone());
        self.rows_in_table = 0;
        Ok(())
    }

    fn end_table(&mut self) -> Result<()> {
        self.state.advance(ProtocolEvent::EndTable)?;
        if let Some(meta) = self.open.take() {
            if self.rows_in_table == 0 {
                writeln!(self.out, "  <{}/>", meta.table_name())?;
            }
        }
        Ok(())
    }

    fn row(&mut self, values: &[Value]) -> Result<()> {
        self.state.advance(ProtocolEvent::Row)?;
        let meta = match &self.open {
            Some(m) => m,
            None => return Ok(()),
        };
        check_row_width(meta, values)?;
        let mut line = format!("  <{}", meta.table_name());
        for (c, v) in meta.columns().iter().zip(values) {
            if v.is_absent() {
                continue;
            }
            line.push_str(&format!(" {}=\"{}\"", c.name(), escape(&v.to_string())));
        }
        line.push_str("/>");
        writeln!(self.out, "{}", line)?;
        self.rows_in_table += 1;
        Ok(())
    }

    fn widen_table(&mut self, meta: &TableMetaData) -> Result<()> {
        self.state.advance(ProtocolEvent::WidenTable)?;
        self.open = Some(meta.clone());
        Ok(())
    }
}

/// writes every table of `data_set` to `out` as flat XML.
pub fn write_flat_xml<W: Write>(data_set: &dyn DataSet, out: &mut W) -> Result<()> {
    let mut writer = FlatXmlWriter::new(out);
    DataSetProducer::new(data_set).produce(&mut writer)
}

#[test]
fn test_escape() {
    assert_eq!(escape(r#"a<b & "c"'"#), "a&lt;b &amp; &quot;c&quot;&apos;");
    assert_eq!(escape("x\ny"), "x&#10;y");
}

#[test]
fn test_writer_output() {
    use crate::dataset::MemoryDataSet;
    use crate::metadata::Column;
    use crate::sql_type::DataType;
    use crate::table::MemoryTable;
    let t = MemoryTable::with_rows(
        TableMetaData::new(
            "T",
            vec![
                Column::new("A", DataType::Integer),
                Column::new("B", DataType::Varchar),
            ],
        ),
        vec![
            vec![Value::Int(1), Value::from("x&y")],
            vec![Value::Int(2), Value::Null],
        ],
    )
    .unwrap();
    let empty = MemoryTable::new(TableMetaData::new("E", vec![]));
    let ds = MemoryDataSet::from_memory_tables(vec![t, empty], false).unwrap();
    let mut out = vec![];
    write_flat_xml(&ds, &mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "<?xml version='1.0' encoding='UTF-8'?>\n\
         <dataset>\n  \
         <T A=\"1\" B=\"x&amp;y\"/>\n  \
         <T A=\"2\"/>\n  \
         <E/>\n\
         </dataset>\n"
    );
}

#[test]
fn test_writer_rejects_rows_outside_a_table() {
    let mut w = FlatXmlWriter::new(vec![]);
    w.start_data_set().unwrap();
    assert!(w.row(&[]).is_err());
}
