//! Replays an existing dataset through the streaming protocol.

use streaming_iterator::StreamingIterator;
use tracing::instrument;

use crate::error::Result;
use crate::table_traits::{DataSet, RowCursor, Table};

use super::consumer::{Consumer, Producer};

pub struct DataSetProducer<'a> {
    data_set: &'a dyn DataSet,
}

impl<'a> DataSetProducer<'a> {
    pub fn new(data_set: &'a dyn DataSet) -> Self {
        DataSetProducer { data_set }
    }
}

fn produce_table(table: &dyn Table, consumer: &mut dyn Consumer) -> Result<()> {
    consumer.start_table(table.table_meta_data())?;
    let mut cursor = RowCursor::new(table)?;
    while let Some(row) = cursor.next() {
        consumer.row(row)?;
    }
    cursor.finish()?;
    consumer.end_table()
}

impl<'a> Producer for DataSetProducer<'a> {
    /// sends every table, closing each once its rows are sent. A close failure after an
    /// earlier failure is logged and the earlier failure returned.
    #[instrument(skip_all)]
    fn produce(&mut self, consumer: &mut dyn Consumer) -> Result<()> {
        consumer.start_data_set()?;
        for table in self.data_set.iter()? {
            let table = table?;
            match produce_table(table.as_ref(), consumer) {
                Ok(()) => table.close()?,
                Err(e) => {
                    if let Err(close_error) = table.close() {
                        tracing::warn!(
                            table = table.table_meta_data().table_name(),
                            error = %close_error,
                            "close failed while handling an earlier error"
                        );
                    }
                    return Err(e);
                }
            }
        }
        consumer.end_data_set()
    }
}

#[test]
fn test_replay_into_cached_data_set() {
    use crate::config::Config;
    use crate::dataset::memory::{make_table, MemoryDataSet};
    use crate::dataset::CachedDataSet;
    use crate::sql_value::Value;
    let source =
        MemoryDataSet::from_tables(vec![make_table("A", &[1, 2]), make_table("B", &[])], false)
            .unwrap();
    let mut producer = DataSetProducer::new(&source);
    let copy = CachedDataSet::from_producer(&mut producer, &Config::default()).unwrap();
    assert_eq!(copy.table_names().unwrap(), vec!["A", "B"]);
    let a = copy.table("A").unwrap();
    assert_eq!(a.value(1, "ID").unwrap(), Value::Int(2));
    assert_eq!(copy.table("B").unwrap().row_count().unwrap(), 0);
}
