//! Defines the push protocol by which a producer feeds a dataset to a consumer.
//!
//! A producer calls, strictly nested:
//!
//! ```text
//! start_data_set
//!     (start_table (row | widen_table)* end_table)*
//! end_data_set
//! ```
//!
//! `widen_table` is only issued by producers running with column sensing: it announces that
//! the open table has gained columns, appended after the existing ones.

use crate::error::{Error, Result};
use crate::metadata::TableMetaData;
use crate::sql_value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    NotStarted,
    DataSetStarted,
    TableStarted,
    TableEnded,
    DataSetEnded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolEvent {
    StartDataSet,
    StartTable,
    Row,
    WidenTable,
    EndTable,
    EndDataSet,
}

impl ProtocolState {
    /// returns the state after `event`, or a `Protocol` error when `event` is illegal here.
    pub fn next(self, event: ProtocolEvent) -> Result<ProtocolState> {
        use ProtocolEvent as E;
        use ProtocolState as S;
        match (self, event) {
            (S::NotStarted, E::StartDataSet) => Ok(S::DataSetStarted),
            (S::DataSetStarted | S::TableEnded, E::StartTable) => Ok(S::TableStarted),
            (S::TableStarted, E::Row | E::WidenTable) => Ok(S::TableStarted),
            (S::TableStarted, E::EndTable) => Ok(S::TableEnded),
            (S::DataSetStarted | S::TableEnded, E::EndDataSet) => Ok(S::DataSetEnded),
            (state, event) => Err(Error::Protocol {
                state: format!("{:?}", state),
                event: format!("{:?}", event),
            }),
        }
    }

    pub fn advance(&mut self, event: ProtocolEvent) -> Result<()> {
        *self = self.next(event)?;
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        *self == ProtocolState::DataSetEnded
    }
}

/// receives a dataset one call at a time.
pub trait Consumer {
    fn start_data_set(&mut self) -> Result<()>;

    fn end_data_set(&mut self) -> Result<()>;

    fn start_table(&mut self, meta: &TableMetaData) -> Result<()>;

    fn end_table(&mut self) -> Result<()>;

    /// receives one row, holding one value per column of the open table.
    fn row(&mut self, values: &[Value]) -> Result<()>;

    /// replaces the open table's metadata with `meta`, which keeps the current columns first
    /// and appends new ones. Rows already received lack the new columns.
    fn widen_table(&mut self, meta: &TableMetaData) -> Result<()>;
}

/// drives a consumer through one complete protocol session.
pub trait Producer {
    fn produce(&mut self, consumer: &mut dyn Consumer) -> Result<()>;
}

/// fails unless `values` has one entry per column of `meta`.
pub fn check_row_width(meta: &TableMetaData, values: &[Value]) -> Result<()> {
    if values.len() != meta.columns().len() {
        return Err(Error::InvalidValue(format!(
            "row for table {} has {} values but the table has {} columns",
            meta.table_name(),
            values.len(),
            meta.columns().len()
        )));
    }
    Ok(())
}

#[test]
fn test_protocol_accepts_nested_sequence() {
    use ProtocolEvent::*;
    let mut s = ProtocolState::NotStarted;
    for e in [
        StartDataSet,
        StartTable,
        Row,
        WidenTable,
        Row,
        EndTable,
        StartTable,
        EndTable,
        EndDataSet,
    ] {
        s.advance(e).unwrap();
    }
    assert!(s.is_complete());
}

#[test]
fn test_protocol_rejects_illegal_calls() {
    use ProtocolEvent::*;
    assert!(ProtocolState::NotStarted.next(Row).is_err());
    assert!(ProtocolState::DataSetStarted.next(Row).is_err());
    assert!(ProtocolState::TableStarted.next(StartTable).is_err());
    assert!(ProtocolState::TableStarted.next(EndDataSet).is_err());
    assert!(ProtocolState::DataSetEnded.next(StartDataSet).is_err());
    match ProtocolState::TableEnded.next(EndTable) {
        Err(Error::Protocol { state, event }) => {
            assert_eq!(state, "TableEnded");
            assert_eq!(event, "EndTable");
        }
        other => panic!("unexpected {:?}", other),
    }
}
