//! Applies one set of value replacements to every table of a dataset.

use std::rc::Rc;

use crate::error::Result;
use crate::table::{ReplacementTable, Replacements};
use crate::table_traits::{DataSet, TableRef};

use super::DataSetRef;

pub struct ReplacementDataSet {
    inner: DataSetRef,
    replacements: Rc<Replacements>,
}

impl ReplacementDataSet {
    pub fn new(inner: DataSetRef, replacements: Replacements) -> Self {
        ReplacementDataSet {
            inner,
            replacements: Rc::new(replacements),
        }
    }
}

impl DataSet for ReplacementDataSet {
    fn table_names(&self) -> Result<Vec<String>> {
        self.inner.table_names()
    }

    fn table(&self, name: &str) -> Result<TableRef> {
        let inner = self.inner.table(name)?;
        Ok(Rc::new(ReplacementTable::new(inner, self.replacements.clone())))
    }

    fn is_case_sensitive(&self) -> bool {
        self.inner.is_case_sensitive()
    }
}

#[test]
fn test_replacement_data_set() {
    use super::memory::MemoryDataSet;
    use crate::metadata::{Column, TableMetaData};
    use crate::sql_type::DataType;
    use crate::sql_value::Value;
    use crate::table::MemoryTable;
    let meta = TableMetaData::new("T", vec![Column::new("V", DataType::Varchar)]);
    let t = MemoryTable::with_rows(
        meta,
        vec![vec![Value::from("[NULL]")], vec![Value::from("keep")]],
    )
    .unwrap();
    let ds = MemoryDataSet::from_memory_tables(vec![t], false).unwrap();
    let r = ReplacementDataSet::new(
        Rc::new(ds),
        Replacements::new().value("[NULL]", Value::Null),
    );
    let t = r.table("t").unwrap();
    assert_eq!(t.value(0, "V").unwrap(), Value::Null);
    assert_eq!(t.value(1, "V").unwrap(), Value::from("keep"));
}
