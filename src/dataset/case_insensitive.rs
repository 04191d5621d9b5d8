//! A case-insensitive view over a dataset whose own lookups may be case-sensitive.

use crate::error::{Error, Result};
use crate::registry::OrderedTableNameMap;
use crate::table_traits::{DataSet, TableRef};

use super::DataSetRef;

pub struct CaseInsensitiveDataSet {
    inner: DataSetRef,
    names: OrderedTableNameMap<String>,
}

impl CaseInsensitiveDataSet {
    /// fails with `AmbiguousTableName` when two tables of `inner` differ only by case.
    pub fn new(inner: DataSetRef) -> Result<Self> {
        let mut names = OrderedTableNameMap::new(false);
        for n in inner.table_names()? {
            names.add(&n, n.clone())?;
        }
        Ok(CaseInsensitiveDataSet { inner, names })
    }
}

impl DataSet for CaseInsensitiveDataSet {
    fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.names.table_names())
    }

    fn table(&self, name: &str) -> Result<TableRef> {
        match self.names.get(name) {
            Some(source_name) => self.inner.table(source_name),
            None => Err(Error::NoSuchTable(name.to_string())),
        }
    }

    fn is_case_sensitive(&self) -> bool {
        false
    }
}

#[test]
fn test_case_insensitive_view() {
    use super::memory::{make_table, MemoryDataSet};
    use std::rc::Rc;
    let sensitive =
        MemoryDataSet::from_tables(vec![make_table("Orders", &[1]), make_table("items", &[])], true)
            .unwrap();
    assert!(sensitive.table("ORDERS").is_err());
    let view = CaseInsensitiveDataSet::new(Rc::new(sensitive)).unwrap();
    assert_eq!(view.table("ORDERS").unwrap().row_count().unwrap(), 1);
    assert_eq!(view.table_names().unwrap(), vec!["Orders", "items"]);

    let clash =
        MemoryDataSet::from_tables(vec![make_table("T", &[1]), make_table("t", &[2])], true)
            .unwrap();
    assert!(matches!(
        CaseInsensitiveDataSet::new(Rc::new(clash)),
        Err(Error::AmbiguousTableName(_))
    ));
}
