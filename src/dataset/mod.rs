//! Dataset implementations and the decorators that present another dataset differently.

use std::rc::Rc;

use crate::table_traits::DataSet;

pub mod cached;
pub mod case_insensitive;
pub mod composite;
pub mod filtered;
pub mod lower_case;
pub mod memory;
pub mod replacement;

pub use cached::CachedDataSet;
pub use case_insensitive::CaseInsensitiveDataSet;
pub use composite::CompositeDataSet;
pub use filtered::{FilteredDataSet, PatternTableFilter, SequenceTableFilter, TableFilter};
pub use lower_case::LowerCaseDataSet;
pub use memory::MemoryDataSet;
pub use replacement::ReplacementDataSet;

/// a shared handle on any dataset, as held by decorators.
pub type DataSetRef = Rc<dyn DataSet>;
