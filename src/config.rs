//! Settings shared by producers, consumers and database-backed datasets.
//!
//! A `Config` is built by the caller and passed down explicitly; nothing here is global.

use crate::sql_type::DataTypeFactory;

/// says what a dataset does when a table name it already holds arrives again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateTablePolicy {
    /// appends the new rows to the existing table and widens its columns.
    Merge,
    /// fails with `AmbiguousTableName`.
    Reject,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub case_sensitive_table_names: bool,
    /// lets each flat XML row add columns that earlier rows of its table lacked.
    pub column_sensing: bool,
    pub duplicate_tables: DuplicateTablePolicy,
    /// takes column declarations from a DTD when the document has one.
    pub dtd_metadata: bool,
    /// reads database tables through forward-only cursors rather than materialising them.
    pub forward_only: bool,
    /// number of rows a forward-only database cursor fetches at a time.
    pub batch_size: usize,
    pub data_type_factory: DataTypeFactory,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            case_sensitive_table_names: false,
            column_sensing: false,
            duplicate_tables: DuplicateTablePolicy::Merge,
            dtd_metadata: true,
            forward_only: false,
            batch_size: 100,
            data_type_factory: DataTypeFactory::new(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_case_sensitive_table_names(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive_table_names = case_sensitive;
        self
    }

    pub fn with_column_sensing(mut self, column_sensing: bool) -> Self {
        self.column_sensing = column_sensing;
        self
    }

    pub fn with_duplicate_tables(mut self, policy: DuplicateTablePolicy) -> Self {
        self.duplicate_tables = policy;
        self
    }

    pub fn with_dtd_metadata(mut self, dtd_metadata: bool) -> Self {
        self.dtd_metadata = dtd_metadata;
        self
    }

    pub fn with_forward_only(mut self, forward_only: bool) -> Self {
        self.forward_only = forward_only;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_data_type_factory(mut self, factory: DataTypeFactory) -> Self {
        self.data_type_factory = factory;
        self
    }
}
