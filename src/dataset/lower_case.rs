//! Presents every table of a dataset through a `LowerCaseTable`.

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::registry::OrderedTableNameMap;
use crate::table::LowerCaseTable;
use crate::table_traits::{DataSet, TableRef};

use super::DataSetRef;

pub struct LowerCaseDataSet {
    inner: DataSetRef,
    /// lower-case name to the name `inner` knows the table by.
    names: OrderedTableNameMap<String>,
}

impl LowerCaseDataSet {
    pub fn new(inner: DataSetRef) -> Result<Self> {
        let mut names = OrderedTableNameMap::new(inner.is_case_sensitive());
        for n in inner.table_names()? {
            names.add(&n.to_lowercase(), n.clone())?;
        }
        Ok(LowerCaseDataSet { inner, names })
    }
}

impl DataSet for LowerCaseDataSet {
    fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.names.table_names())
    }

    fn table(&self, name: &str) -> Result<TableRef> {
        let source_name = self
            .names
            .get(name)
            .ok_or_else(|| Error::NoSuchTable(name.to_string()))?;
        let table = LowerCaseTable::new(self.inner.table(source_name)?)?;
        Ok(Rc::new(table))
    }

    fn is_case_sensitive(&self) -> bool {
        self.names.is_case_sensitive()
    }
}

#[test]
fn test_lower_case_data_set() {
    use super::memory::{make_table, MemoryDataSet};
    let ds = MemoryDataSet::from_tables(vec![make_table("ORDERS", &[5])], false).unwrap();
    let lc = LowerCaseDataSet::new(Rc::new(ds)).unwrap();
    assert_eq!(lc.table_names().unwrap(), vec!["orders"]);
    let t = lc.table("orders").unwrap();
    assert_eq!(t.table_meta_data().column_names(), vec!["id"]);
    assert_eq!(t.value(0, "id").unwrap(), crate::sql_value::Value::Int(5));
}
