//! Reads fixtures out of a live SQLite database.
//!
//! `SqliteCursor` implements `ResultCursor`, fetching rows in pages of `batch_size` so that a
//! forward-only table never holds more than one page. Table scans resume each page after the
//! last key read; arbitrary queries fall back to LIMIT and OFFSET.
//! `DatabaseDataSet` presents the user tables of a connection as a dataset.

use std::rc::Rc;

use itertools::Itertools;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::metadata::{Column, Nullable, TableMetaData};
use crate::registry::OrderedTableNameMap;
use crate::result_table::{
    meta_data_from_columns, ColumnInfo, ForwardOnlyResultTable, ResultCursor,
    ScrollableResultTable,
};
use crate::sql_type::{codes, DataTypeFactory};
use crate::sql_value::Value;
use crate::table_traits::{DataSet, TableRef};

pub fn value_from_sql(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(x) => Value::Real(x),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}

/// quotes `name` for use as an SQL identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// how `SqliteCursor` fetches its next page.
enum Paging {
    /// re-runs the query with LIMIT and OFFSET. Used for arbitrary queries, whose pages are
    /// only stable when the query orders its rows, and which cost a rescan per page.
    Offset(usize),
    /// scans a table in key order, resuming after the key of the last row read. `keys` are
    /// the primary key columns, or `rowid` for a table without a primary key. A row whose key
    /// holds NULL ends the scan, since it compares as neither greater nor smaller.
    Keyset {
        table: String,
        keys: Vec<String>,
        last: Option<Vec<SqlValue>>,
    },
}

pub struct SqliteCursor {
    conn: Rc<Connection>,
    sql: String,
    columns: Vec<ColumnInfo>,
    batch_size: usize,
    paging: Paging,
    buffer: Vec<Vec<Value>>,
    pos: usize,
    exhausted: bool,
    current: Option<Vec<Value>>,
    closed: bool,
}

fn column_infos(conn: &Connection, sql: &str) -> Result<Vec<ColumnInfo>> {
    let stmt = conn.prepare(sql)?;
    let columns: Vec<ColumnInfo> = stmt
        .columns()
        .iter()
        .map(|c| ColumnInfo {
            name: c.name().to_string(),
            type_code: codes::OTHER,
            type_name: c.decl_type().unwrap_or("").to_string(),
            nullable: Nullable::NullableUnknown,
        })
        .collect();
    Ok(columns)
}

impl SqliteCursor {
    /// pages through the result of `sql` with LIMIT and OFFSET.
    pub fn new(conn: Rc<Connection>, sql: &str, batch_size: usize) -> Result<Self> {
        let sql = sql.trim().trim_end_matches(';').to_string();
        let columns = column_infos(&conn, &sql)?;
        Ok(Self::with_paging(conn, sql, columns, batch_size, Paging::Offset(0)))
    }

    /// reads every row of `table` ordered by `keys`, resuming each page after the last key
    /// read. With no keys the table is read in `rowid` order.
    pub fn table_scan<S: AsRef<str>>(
        conn: Rc<Connection>,
        table: &str,
        keys: &[S],
        batch_size: usize,
    ) -> Result<Self> {
        let sql = format!("SELECT * FROM {}", quote_identifier(table));
        let columns = column_infos(&conn, &sql)?;
        let mut keys: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();
        if keys.is_empty() {
            keys.push(String::from("rowid"));
        }
        let paging = Paging::Keyset {
            table: table.to_string(),
            keys,
            last: None,
        };
        Ok(Self::with_paging(conn, sql, columns, batch_size, paging))
    }

    fn with_paging(
        conn: Rc<Connection>,
        sql: String,
        columns: Vec<ColumnInfo>,
        batch_size: usize,
        paging: Paging,
    ) -> Self {
        SqliteCursor {
            conn,
            sql,
            columns,
            batch_size: batch_size.max(1),
            paging,
            buffer: vec![],
            pos: 0,
            exhausted: false,
            current: None,
            closed: false,
        }
    }

    /// the next page's query, its parameters, and how many leading key columns it selects.
    fn page_query(&self) -> (String, Vec<SqlValue>, usize) {
        match &self.paging {
            Paging::Offset(offset) => (
                format!(
                    "SELECT * FROM ({}) LIMIT {} OFFSET {}",
                    self.sql, self.batch_size, offset
                ),
                vec![],
                0,
            ),
            Paging::Keyset { table, keys, last } => {
                let key_list = keys.iter().map(|k| quote_identifier(k)).join(", ");
                let mut sql = format!("SELECT {}, * FROM {}", key_list, quote_identifier(table));
                if let Some(last) = last {
                    let placeholders = (1..=last.len()).map(|i| format!("?{}", i)).join(", ");
                    sql.push_str(&format!(" WHERE ({}) > ({})", key_list, placeholders));
                }
                sql.push_str(&format!(" ORDER BY {} LIMIT {}", key_list, self.batch_size));
                (sql, last.clone().unwrap_or_default(), keys.len())
            }
        }
    }

    fn fetch_batch(&mut self) -> Result<()> {
        let (sql, params, key_width) = self.page_query();
        let width = self.columns.len();
        let batch = {
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
                let key = (0..key_width)
                    .map(|i| row.get::<_, SqlValue>(i))
                    .collect::<rusqlite::Result<Vec<SqlValue>>>()?;
                let values = (key_width..key_width + width)
                    .map(|i| row.get_ref(i).map(value_from_sql))
                    .collect::<rusqlite::Result<Vec<Value>>>()?;
                Ok((key, values))
            })?;
            rows.collect::<rusqlite::Result<Vec<(Vec<SqlValue>, Vec<Value>)>>>()?
        };
        tracing::trace!(rows = batch.len(), "fetched batch");
        self.exhausted = batch.len() < self.batch_size;
        match &mut self.paging {
            Paging::Offset(offset) => *offset += batch.len(),
            Paging::Keyset { last, .. } => {
                if let Some((key, _)) = batch.last() {
                    *last = Some(key.clone());
                }
            }
        }
        self.buffer = batch.into_iter().map(|(_, values)| values).collect();
        self.pos = 0;
        Ok(())
    }
}

impl ResultCursor for SqliteCursor {
    fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    fn advance(&mut self) -> Result<bool> {
        if self.closed {
            return Err(Error::Closed(self.sql.clone()));
        }
        if self.pos >= self.buffer.len() {
            if self.exhausted {
                self.current = None;
                return Ok(false);
            }
            self.fetch_batch()?;
            if self.buffer.is_empty() {
                self.current = None;
                return Ok(false);
            }
        }
        self.current = Some(std::mem::take(&mut self.buffer[self.pos]));
        self.pos += 1;
        Ok(true)
    }

    fn value(&self, index: usize) -> Result<Value> {
        match &self.current {
            Some(row) => row.get(index).cloned().ok_or_else(|| {
                Error::InvalidValue(format!("result has no column at index {}", index))
            }),
            None => Err(Error::InvalidValue(String::from(
                "result cursor is not positioned on a row",
            ))),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.buffer.clear();
        self.current = None;
        Ok(())
    }
}

/// reads a table's columns and primary key through `PRAGMA table_info`.
fn read_meta_data(
    conn: &Connection,
    table_name: &str,
    create_sql: Option<&str>,
    factory: &DataTypeFactory,
) -> Result<TableMetaData> {
    let autoincrement = create_sql
        .map(|s| s.to_uppercase().contains("AUTOINCREMENT"))
        .unwrap_or(false);
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_identifier(table_name)))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut keys: Vec<(i64, String)> = vec![];
    let mut columns = vec![];
    for (name, type_name, not_null, default, pk) in rows {
        let type_name = type_name.unwrap_or_default();
        let mut column = Column::new(
            name.as_str(),
            factory.create_data_type(codes::OTHER, &type_name),
        )
        .nullable(if not_null != 0 {
            Nullable::NoNulls
        } else {
            Nullable::Nullable
        });
        if let Some(d) = default {
            column = column.default_value(d);
        }
        if pk > 0 {
            keys.push((pk, name.clone()));
            if autoincrement && type_name.eq_ignore_ascii_case("INTEGER") {
                column = column.auto_increment(true);
            }
        }
        columns.push(column);
    }
    keys.sort();
    let key_names: Vec<String> = keys.into_iter().map(|(_, n)| n).collect();
    TableMetaData::with_primary_keys(table_name, columns, &key_names)
}

/// the user tables of a SQLite connection.
///
/// Table metadata is read when the dataset is built; rows are queried each time a table is
/// requested, ordered by primary key when the table has one and by `rowid` otherwise. Whether
/// the returned table is forward-only or scrollable follows `Config::forward_only`.
pub struct DatabaseDataSet {
    conn: Rc<Connection>,
    config: Config,
    tables: OrderedTableNameMap<TableMetaData>,
}

impl DatabaseDataSet {
    pub fn new(conn: Rc<Connection>, config: Config) -> Result<Self> {
        let mut tables = OrderedTableNameMap::new(config.case_sensitive_table_names);
        let listed = {
            let mut stmt = conn.prepare(
                "SELECT name, sql FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };
        for (name, sql) in listed {
            let meta = read_meta_data(&conn, &name, sql.as_deref(), &config.data_type_factory)?;
            tables.add(&name, meta)?;
        }
        tracing::debug!(tables = tables.len(), "read database metadata");
        Ok(DatabaseDataSet {
            conn,
            config,
            tables,
        })
    }

    fn open(&self, meta: TableMetaData, cursor: SqliteCursor) -> Result<TableRef> {
        if self.config.forward_only {
            Ok(Rc::new(ForwardOnlyResultTable::new(meta, Box::new(cursor))?))
        } else {
            Ok(Rc::new(ScrollableResultTable::new(meta, Box::new(cursor))?))
        }
    }

    /// runs `sql` and presents its result as a table named `table_name`. Column types come
    /// from the declared types the query reports.
    pub fn query_table(&self, table_name: &str, sql: &str) -> Result<TableRef> {
        let cursor = SqliteCursor::new(self.conn.clone(), sql, self.config.batch_size)?;
        let meta = meta_data_from_columns(
            table_name,
            cursor.columns(),
            &self.config.data_type_factory,
        );
        self.open(meta, cursor)
    }
}

impl DataSet for DatabaseDataSet {
    fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.tables.table_names())
    }

    fn table(&self, name: &str) -> Result<TableRef> {
        let meta = self
            .tables
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NoSuchTable(name.to_string()))?;
        let cursor = SqliteCursor::table_scan(
            self.conn.clone(),
            meta.table_name(),
            &meta.primary_key_names(),
            self.config.batch_size,
        )?;
        self.open(meta, cursor)
    }

    fn is_case_sensitive(&self) -> bool {
        self.tables.is_case_sensitive()
    }

    fn table_meta_data(&self, name: &str) -> Result<TableMetaData> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NoSuchTable(name.to_string()))
    }
}

#[cfg(test)]
fn make_connection() -> Rc<Connection> {
    use crate::sql_type::DataType;
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE person (id INTEGER PRIMARY KEY AUTOINCREMENT, name VARCHAR(20) NOT NULL, \
             score DECIMAL(5,2) DEFAULT 0);
         CREATE TABLE link (b TEXT, a TEXT, PRIMARY KEY (a, b));",
    )
    .unwrap();
    let rows = [(3, "carol", "7.5"), (1, "alice", "9.25"), (2, "bob", "8")];
    for (id, name, score) in rows {
        let params = [
            DataType::Integer.bind(&Value::Int(id)).unwrap(),
            DataType::Varchar.bind(&Value::from(name)).unwrap(),
            DataType::Decimal.bind(&Value::from(score)).unwrap(),
        ];
        conn.execute(
            "INSERT INTO person (id, name, score) VALUES (?1, ?2, ?3)",
            rusqlite::params_from_iter(params.iter()),
        )
        .unwrap();
    }
    Rc::new(conn)
}

#[test]
fn test_database_meta_data() {
    use crate::sql_type::DataType;
    let ds = DatabaseDataSet::new(make_connection(), Config::default()).unwrap();
    assert_eq!(ds.table_names().unwrap(), vec!["link", "person"]);

    let person = ds.table_meta_data("PERSON").unwrap();
    assert_eq!(person.column_names(), vec!["id", "name", "score"]);
    assert_eq!(person.primary_key_names(), vec!["id"]);
    let cols = person.columns();
    assert!(cols[0].is_auto_increment());
    assert_eq!(cols[0].data_type(), DataType::Integer);
    assert_eq!(cols[1].data_type(), DataType::Varchar);
    assert_eq!(cols[1].nullability(), Nullable::NoNulls);
    assert_eq!(cols[2].data_type(), DataType::Decimal);
    assert_eq!(cols[2].default(), Some("0"));

    let link = ds.table_meta_data("link").unwrap();
    assert_eq!(link.primary_key_names(), vec!["a", "b"]);
    assert!(matches!(ds.table_meta_data("nope"), Err(Error::NoSuchTable(_))));
}

#[test]
fn test_database_table_rows_ordered_by_key() {
    let ds = DatabaseDataSet::new(make_connection(), Config::default()).unwrap();
    let t = ds.table("person").unwrap();
    assert_eq!(t.row_count().unwrap(), 3);
    assert_eq!(t.value(0, "name").unwrap(), Value::from("alice"));
    assert_eq!(t.value(2, "ID").unwrap(), Value::Int(3));
}

#[test]
fn test_forward_only_database_table_pages() {
    let config = Config::default().with_forward_only(true).with_batch_size(2);
    let ds = DatabaseDataSet::new(make_connection(), config).unwrap();
    let t = ds.table("person").unwrap();
    assert!(matches!(t.row_count(), Err(Error::RowCountUnsupported(_))));
    assert_eq!(t.value(0, "id").unwrap(), Value::Int(1));
    assert_eq!(t.value(2, "id").unwrap(), Value::Int(3));
    assert!(matches!(t.value(1, "id"), Err(Error::ForwardOnly { .. })));
    assert!(matches!(t.value(3, "id"), Err(Error::RowOutOfBounds { .. })));
    t.close().unwrap();
}

#[test]
fn test_query_table() {
    let ds = DatabaseDataSet::new(make_connection(), Config::default()).unwrap();
    let t = ds
        .query_table("top", "SELECT name, score FROM person WHERE id > 1 ORDER BY id;")
        .unwrap();
    assert_eq!(t.table_meta_data().table_name(), "top");
    assert_eq!(t.table_meta_data().column_names(), vec!["name", "score"]);
    assert_eq!(t.row_count().unwrap(), 2);
    assert_eq!(t.value(1, "name").unwrap(), Value::from("carol"));
}

#[test]
fn test_forward_only_database_table_rereads_after_end() {
    let config = Config::default().with_forward_only(true).with_batch_size(2);
    let ds = DatabaseDataSet::new(make_connection(), config).unwrap();
    let t = ds.table("person").unwrap();
    assert_eq!(t.value(2, "id").unwrap(), Value::Int(3));
    assert!(matches!(
        t.value(3, "id"),
        Err(Error::RowOutOfBounds { row: 3, limit: 3, .. })
    ));
    assert_eq!(t.value(2, "id").unwrap(), Value::Int(3));
    assert_eq!(t.value(2, "name").unwrap(), Value::from("carol"));
}

#[test]
fn test_table_scan_pages_by_key() {
    let conn = make_connection();
    conn.execute_batch(
        "CREATE TABLE note (body TEXT);
         INSERT INTO note VALUES ('first');
         INSERT INTO note VALUES ('second');
         INSERT INTO note VALUES ('third');
         INSERT INTO link VALUES ('y', 'x');
         INSERT INTO link VALUES ('x', 'x');
         INSERT INTO link VALUES ('z', 'a');",
    )
    .unwrap();
    let mut cursor = SqliteCursor::table_scan(conn.clone(), "link", &["a", "b"], 1).unwrap();
    let mut seen = vec![];
    while cursor.advance().unwrap() {
        seen.push((cursor.value(1).unwrap(), cursor.value(0).unwrap()));
    }
    assert_eq!(
        seen,
        vec![
            (Value::from("a"), Value::from("z")),
            (Value::from("x"), Value::from("x")),
            (Value::from("x"), Value::from("y")),
        ]
    );

    let mut cursor = SqliteCursor::table_scan::<&str>(conn, "note", &[], 2).unwrap();
    let mut bodies = vec![];
    while cursor.advance().unwrap() {
        bodies.push(cursor.value(0).unwrap());
    }
    assert_eq!(
        bodies,
        vec![Value::from("first"), Value::from("second"), Value::from("third")]
    );
    cursor.close().unwrap();
    assert!(matches!(cursor.advance(), Err(Error::Closed(_))));
}
