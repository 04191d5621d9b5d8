//! Defines `CachedDataSet`, a consumer that keeps everything a producer streams to it.

use std::rc::Rc;

use crate::config::{Config, DuplicateTablePolicy};
use crate::error::{Error, Result};
use crate::metadata::TableMetaData;
use crate::registry::OrderedTableNameMap;
use crate::sql_value::Value;
use crate::stream::{check_row_width, Consumer, Producer, ProtocolEvent, ProtocolState};
use crate::table::MemoryTable;
use crate::table_traits::{DataSet, Table, TableRef};

/// column layout of the table currently receiving rows.
struct OpenTable {
    meta: TableMetaData,
    /// stored column position for each column of `meta`.
    mapping: Vec<usize>,
}

/// materialises a producer's output into memory tables.
///
/// Queries fail with `NotReady` until the producer has called `end_data_set`. A table name
/// seen a second time is handled by the configured `DuplicateTablePolicy`: `Merge` reopens the
/// existing table, widening it with any new columns, and `Reject` fails with
/// `AmbiguousTableName`.
pub struct CachedDataSet {
    state: ProtocolState,
    policy: DuplicateTablePolicy,
    case_sensitive: bool,
    building: OrderedTableNameMap<MemoryTable>,
    open: Option<OpenTable>,
    tables: OrderedTableNameMap<TableRef>,
}

impl CachedDataSet {
    pub fn new(config: &Config) -> Self {
        let case_sensitive = config.case_sensitive_table_names;
        CachedDataSet {
            state: ProtocolState::NotStarted,
            policy: config.duplicate_tables,
            case_sensitive,
            building: OrderedTableNameMap::new(case_sensitive),
            open: None,
            tables: OrderedTableNameMap::new(case_sensitive),
        }
    }

    /// runs `producer` to completion and returns the cached result.
    pub fn from_producer(producer: &mut dyn Producer, config: &Config) -> Result<Self> {
        let mut ds = CachedDataSet::new(config);
        producer.produce(&mut ds)?;
        if !ds.is_ready() {
            return Err(Error::NotReady);
        }
        Ok(ds)
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_complete()
    }

    fn ready_tables(&self) -> Result<&OrderedTableNameMap<TableRef>> {
        if self.is_ready() {
            Ok(&self.tables)
        } else {
            Err(Error::NotReady)
        }
    }

    fn no_open_table(&self) -> Error {
        Error::Protocol {
            state: format!("{:?}", self.state),
            event: String::from("Row"),
        }
    }

    fn open_table_name(&self) -> Result<String> {
        self.building
            .last_table_name()
            .map(|n| n.to_string())
            .ok_or_else(|| self.no_open_table())
    }

    fn stored_table(&mut self, name: &str) -> Result<&mut MemoryTable> {
        self.building
            .get_mut(name)
            .ok_or_else(|| Error::NoSuchTable(name.to_string()))
    }

    /// widens the stored table to hold every column of `meta`, then remaps the open table.
    fn open_with(&mut self, name: &str, meta: &TableMetaData) -> Result<()> {
        let stored = self.stored_table(name)?;
        if stored.table_meta_data().lacks_columns_of(meta) {
            let widened = stored.table_meta_data().merge(meta);
            stored.widen(widened)?;
        }
        let stored_meta = stored.table_meta_data();
        let mapping = meta
            .columns()
            .iter()
            .map(|c| stored_meta.column_index(c.name()))
            .collect::<Result<Vec<usize>>>()?;
        self.open = Some(OpenTable {
            meta: meta.clone(),
            mapping,
        });
        Ok(())
    }
}

impl Consumer for CachedDataSet {
    fn start_data_set(&mut self) -> Result<()> {
        self.state.advance(ProtocolEvent::StartDataSet)
    }

    fn end_data_set(&mut self) -> Result<()> {
        self.state.advance(ProtocolEvent::EndDataSet)?;
        let building = std::mem::replace(
            &mut self.building,
            OrderedTableNameMap::new(self.case_sensitive),
        );
        for (name, table) in building.into_entries() {
            self.tables.add(&name, Rc::new(table))?;
        }
        tracing::debug!(tables = self.tables.len(), "cached dataset complete");
        Ok(())
    }

    fn start_table(&mut self, meta: &TableMetaData) -> Result<()> {
        self.state.advance(ProtocolEvent::StartTable)?;
        let name = meta.table_name();
        if self.building.contains_table(name) {
            match self.policy {
                DuplicateTablePolicy::Reject => {
                    return Err(Error::AmbiguousTableName(name.to_string()))
                }
                DuplicateTablePolicy::Merge => {
                    tracing::debug!(table = name, "reopening table");
                    self.building.set_last_table(name)?;
                }
            }
        } else {
            self.building.add(name, MemoryTable::new(meta.clone()))?;
        }
        self.open_with(name, meta)
    }

    fn end_table(&mut self) -> Result<()> {
        self.state.advance(ProtocolEvent::EndTable)?;
        self.open = None;
        Ok(())
    }

    fn row(&mut self, values: &[Value]) -> Result<()> {
        self.state.advance(ProtocolEvent::Row)?;
        let name = self.open_table_name()?;
        let open = self.open.as_ref().ok_or_else(|| self.no_open_table())?;
        check_row_width(&open.meta, values)?;
        let mapping = open.mapping.clone();
        let stored = self.stored_table(&name)?;
        let mut row = vec![Value::NoValue; stored.table_meta_data().columns().len()];
        for (v, target) in values.iter().zip(mapping) {
            row[target] = v.clone();
        }
        stored.add_row(row)
    }

    fn widen_table(&mut self, meta: &TableMetaData) -> Result<()> {
        self.state.advance(ProtocolEvent::WidenTable)?;
        let name = self.open_table_name()?;
        self.open_with(&name, meta)
    }
}

impl DataSet for CachedDataSet {
    fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.ready_tables()?.table_names())
    }

    fn table(&self, name: &str) -> Result<TableRef> {
        self.ready_tables()?
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NoSuchTable(name.to_string()))
    }

    fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }
}

#[cfg(test)]
fn meta(name: &str, columns: &[&str]) -> TableMetaData {
    TableMetaData::with_unknown_columns(name, columns)
}

#[test]
fn test_not_ready_until_end_data_set() {
    let mut ds = CachedDataSet::new(&Config::default());
    assert!(matches!(ds.table_names(), Err(Error::NotReady)));
    ds.start_data_set().unwrap();
    ds.start_table(&meta("T", &["A"])).unwrap();
    ds.row(&[Value::from("1")]).unwrap();
    ds.end_table().unwrap();
    assert!(matches!(ds.table("T"), Err(Error::NotReady)));
    ds.end_data_set().unwrap();
    assert_eq!(ds.table("t").unwrap().row_count().unwrap(), 1);
}

#[test]
fn test_repeated_table_is_merged_and_widened() {
    let mut ds = CachedDataSet::new(&Config::default());
    ds.start_data_set().unwrap();
    ds.start_table(&meta("T", &["A"])).unwrap();
    ds.row(&[Value::from("1")]).unwrap();
    ds.end_table().unwrap();
    ds.start_table(&meta("U", &[])).unwrap();
    ds.end_table().unwrap();
    ds.start_table(&meta("T", &["B", "A"])).unwrap();
    ds.row(&[Value::from("b"), Value::from("2")]).unwrap();
    ds.end_table().unwrap();
    ds.end_data_set().unwrap();

    assert_eq!(ds.table_names().unwrap(), vec!["T", "U"]);
    let t = ds.table("T").unwrap();
    assert_eq!(t.table_meta_data().column_names(), vec!["A", "B"]);
    assert_eq!(t.value(0, "A").unwrap(), Value::from("1"));
    assert_eq!(t.value(0, "B").unwrap(), Value::NoValue);
    assert_eq!(t.value(1, "A").unwrap(), Value::from("2"));
    assert_eq!(t.value(1, "B").unwrap(), Value::from("b"));
}

#[test]
fn test_repeated_table_rejected_under_reject_policy() {
    let config = Config::default().with_duplicate_tables(DuplicateTablePolicy::Reject);
    let mut ds = CachedDataSet::new(&config);
    ds.start_data_set().unwrap();
    ds.start_table(&meta("T", &["A"])).unwrap();
    ds.end_table().unwrap();
    assert!(matches!(
        ds.start_table(&meta("t", &["A"])),
        Err(Error::AmbiguousTableName(_))
    ));
}

#[test]
fn test_widen_table_backfills_earlier_rows() {
    let mut ds = CachedDataSet::new(&Config::default());
    ds.start_data_set().unwrap();
    ds.start_table(&meta("T", &["A"])).unwrap();
    ds.row(&[Value::from("1")]).unwrap();
    ds.widen_table(&meta("T", &["A", "B"])).unwrap();
    ds.row(&[Value::from("2"), Value::from("x")]).unwrap();
    assert!(matches!(ds.row(&[Value::from("3")]), Err(Error::InvalidValue(_))));
    ds.end_table().unwrap();
    ds.end_data_set().unwrap();
    let t = ds.table("T").unwrap();
    assert_eq!(t.value(0, "B").unwrap(), Value::NoValue);
    assert_eq!(t.value(1, "B").unwrap(), Value::from("x"));
}

#[test]
fn test_rows_outside_a_table_are_protocol_errors() {
    let mut ds = CachedDataSet::new(&Config::default());
    assert!(matches!(ds.row(&[]), Err(Error::Protocol { .. })));
    ds.start_data_set().unwrap();
    assert!(matches!(ds.end_table(), Err(Error::Protocol { .. })));
}
