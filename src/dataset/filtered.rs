//! Restricts, and optionally reorders, the tables a dataset exposes.

use crate::error::{Error, Result};
use crate::pattern::PatternSet;
use crate::registry::{case_key, OrderedTableNameMap};
use crate::table_traits::{DataSet, TableRef};

use super::DataSetRef;

/// decides which tables of a dataset are visible, and in what order.
pub trait TableFilter {
    fn accept(&self, table_name: &str) -> bool;

    /// returns the visible subset of `names`. The default keeps dataset order.
    fn filter_names(&self, names: &[String]) -> Vec<String> {
        names.iter().filter(|n| self.accept(n)).cloned().collect()
    }
}

/// exposes the named tables in the order listed. Names the dataset lacks are skipped.
#[derive(Debug, Clone)]
pub struct SequenceTableFilter {
    names: Vec<String>,
    case_sensitive: bool,
}

impl SequenceTableFilter {
    pub fn new<S: AsRef<str>>(names: &[S], case_sensitive: bool) -> Self {
        SequenceTableFilter {
            names: names.iter().map(|n| n.as_ref().to_string()).collect(),
            case_sensitive,
        }
    }
}

impl TableFilter for SequenceTableFilter {
    fn accept(&self, table_name: &str) -> bool {
        let key = case_key(table_name, self.case_sensitive);
        self.names
            .iter()
            .any(|n| case_key(n, self.case_sensitive) == key)
    }

    fn filter_names(&self, names: &[String]) -> Vec<String> {
        self.names
            .iter()
            .filter_map(|wanted| {
                let key = case_key(wanted, self.case_sensitive);
                names
                    .iter()
                    .find(|n| case_key(n, self.case_sensitive) == key)
                    .cloned()
            })
            .collect()
    }
}

/// exposes tables whose names match `*`/`?` wildcard include and exclude patterns.
#[derive(Debug, Clone, Default)]
pub struct PatternTableFilter {
    patterns: PatternSet,
}

impl PatternTableFilter {
    pub fn new(case_sensitive: bool) -> Self {
        PatternTableFilter {
            patterns: PatternSet::new(case_sensitive),
        }
    }

    pub fn include(mut self, pattern: &str) -> Self {
        self.patterns = self.patterns.include(pattern);
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.patterns = self.patterns.exclude(pattern);
        self
    }
}

impl TableFilter for PatternTableFilter {
    fn accept(&self, table_name: &str) -> bool {
        self.patterns.accepts(table_name)
    }
}

/// the visible table names are fixed when the view is built.
pub struct FilteredDataSet {
    inner: DataSetRef,
    names: OrderedTableNameMap<()>,
}

impl FilteredDataSet {
    pub fn new(inner: DataSetRef, filter: &dyn TableFilter) -> Result<Self> {
        let mut names = OrderedTableNameMap::new(inner.is_case_sensitive());
        for n in filter.filter_names(&inner.table_names()?) {
            names.add(&n, ())?;
        }
        Ok(FilteredDataSet { inner, names })
    }
}

impl DataSet for FilteredDataSet {
    fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.names.table_names())
    }

    fn table(&self, name: &str) -> Result<TableRef> {
        match self.names.original_name(name) {
            Some(n) => self.inner.table(n),
            None => Err(Error::NoSuchTable(name.to_string())),
        }
    }

    fn is_case_sensitive(&self) -> bool {
        self.names.is_case_sensitive()
    }
}

#[cfg(test)]
fn make_data_set() -> DataSetRef {
    use super::memory::{make_table, MemoryDataSet};
    let tables = ["A", "B", "C_LOG", "D"]
        .iter()
        .map(|n| make_table(n, &[1]))
        .collect();
    std::rc::Rc::new(MemoryDataSet::from_tables(tables, false).unwrap())
}

#[test]
fn test_sequence_filter_reorders_and_skips_absent() {
    let filter = SequenceTableFilter::new(&["d", "missing", "A"], false);
    let ds = FilteredDataSet::new(make_data_set(), &filter).unwrap();
    assert_eq!(ds.table_names().unwrap(), vec!["D", "A"]);
    assert!(ds.table("a").is_ok());
    assert!(matches!(ds.table("B"), Err(Error::NoSuchTable(_))));
}

#[test]
fn test_pattern_filter() {
    let filter = PatternTableFilter::new(false).exclude("*_log").exclude("?");
    let ds = FilteredDataSet::new(make_data_set(), &filter).unwrap();
    assert!(ds.table_names().unwrap().is_empty());

    let filter = PatternTableFilter::new(false).include("c*").include("B");
    let ds = FilteredDataSet::new(make_data_set(), &filter).unwrap();
    assert_eq!(ds.table_names().unwrap(), vec!["B", "C_LOG"]);
}
