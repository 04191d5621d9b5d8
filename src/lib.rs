//! Test fixtures for relational databases: tables and datasets held in memory, read from flat
//! XML files or queried live from SQLite, decorated in various ways, and compared for equality.

pub mod assertion;
pub mod config;
pub mod dataset;
pub mod error;
pub mod formatting;
pub mod metadata;
pub mod pattern;
pub mod registry;
pub mod result_table;
pub mod sql_type;
pub mod sql_value;
pub mod sqlite;
pub mod stream;
pub mod table;
pub mod table_traits;

extern crate pest;
#[macro_use]
extern crate pest_derive;

pub use assertion::{
    assert_data_sets_equal, assert_equals_ignore_cols, assert_tables_equal, Assertion,
    ComparerLookup, ComparisonFailure, DefaultComparer, FailureKind, ToleranceComparer,
    ValueComparer,
};
pub use config::{Config, DuplicateTablePolicy};
pub use dataset::{
    CachedDataSet, CaseInsensitiveDataSet, CompositeDataSet, DataSetRef, FilteredDataSet,
    LowerCaseDataSet, MemoryDataSet, PatternTableFilter, ReplacementDataSet,
    SequenceTableFilter, TableFilter,
};
pub use error::{Error, Result};
pub use metadata::{Column, Nullable, TableMetaData};
pub use registry::OrderedTableNameMap;
pub use result_table::{ForwardOnlyResultTable, ResultCursor, ScrollableResultTable};
pub use sql_type::{comparison_type, DataType, DataTypeFactory};
pub use sql_value::Value;
pub use sqlite::DatabaseDataSet;
pub use stream::{
    write_dtd, write_flat_xml, Consumer, DataSetProducer, FlatDtdProducer, FlatXmlProducer,
    FlatXmlWriter, Producer,
};
pub use table::{
    ColumnFilter, ColumnFilterTable, CompositeTable, LowerCaseTable, MemoryTable,
    ReplacementTable, Replacements, SortMode, SortedTable,
};
pub use table_traits::{DataSet, Table, TableRef};
