//! Table implementations: the in-memory table and the decorators that wrap any other table.

pub mod column_filter;
pub mod composite;
pub mod lower_case;
pub mod memory;
pub mod replacement;
pub mod sorted;

pub use column_filter::{ColumnFilter, ColumnFilterTable};
pub use composite::CompositeTable;
pub use lower_case::LowerCaseTable;
pub use memory::MemoryTable;
pub use replacement::{ReplacementTable, Replacements};
pub use sorted::{SortMode, SortedTable};
