//! Presents a table with its table name and column names in lower case.

use crate::error::Result;
use crate::metadata::TableMetaData;
use crate::sql_value::Value;
use crate::table_traits::{Table, TableRef};

pub fn lower_case_meta_data(meta: &TableMetaData) -> Result<TableMetaData> {
    let columns = meta
        .columns()
        .iter()
        .map(|c| c.renamed(c.name().to_lowercase()))
        .collect();
    let keys: Vec<String> = meta
        .primary_key_names()
        .iter()
        .map(|k| k.to_lowercase())
        .collect();
    TableMetaData::with_primary_keys(meta.table_name().to_lowercase(), columns, &keys)
}

pub struct LowerCaseTable {
    inner: TableRef,
    meta: TableMetaData,
}

impl LowerCaseTable {
    pub fn new(inner: TableRef) -> Result<Self> {
        let meta = lower_case_meta_data(inner.table_meta_data())?;
        Ok(LowerCaseTable { inner, meta })
    }
}

impl Table for LowerCaseTable {
    fn table_meta_data(&self) -> &TableMetaData {
        &self.meta
    }

    fn row_count(&self) -> Result<usize> {
        self.inner.row_count()
    }

    fn value(&self, row: usize, column: &str) -> Result<Value> {
        let col = self.meta.column_index(column)?;
        let source_name = self.inner.table_meta_data().columns()[col].name().to_string();
        self.inner.value(row, &source_name)
    }

    fn close(&self) -> Result<()> {
        self.inner.close()
    }
}

#[test]
fn test_lower_case_table() {
    use crate::metadata::Column;
    use crate::sql_type::DataType;
    use crate::table::MemoryTable;
    let meta = TableMetaData::with_primary_keys(
        "PERSON",
        vec![
            Column::new("ID", DataType::Integer),
            Column::new("Name", DataType::Varchar),
        ],
        &["ID"],
    )
    .unwrap();
    let inner = MemoryTable::with_rows(meta, vec![vec![Value::Int(1), Value::from("x")]]).unwrap();
    let t = LowerCaseTable::new(std::rc::Rc::new(inner)).unwrap();
    assert_eq!(t.table_meta_data().table_name(), "person");
    assert_eq!(t.table_meta_data().column_names(), vec!["id", "name"]);
    assert_eq!(t.table_meta_data().primary_key_names(), vec!["id"]);
    assert_eq!(t.value(0, "name").unwrap(), Value::from("x"));
}
