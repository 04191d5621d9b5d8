//! Describes the columns and primary key of a table.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::registry::case_key;
use crate::sql_type::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullable {
    NoNulls,
    Nullable,
    NullableUnknown,
}

/// A column definition: name, semantic type, nullability and the optional defaults a database
/// reports. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data_type: DataType,
    nullable: Nullable,
    default_value: Option<String>,
    auto_increment: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: Nullable::NullableUnknown,
            default_value: None,
            auto_increment: false,
        }
    }

    pub fn nullable(mut self, nullable: Nullable) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn auto_increment(mut self, auto_increment: bool) -> Self {
        self.auto_increment = auto_increment;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    #[inline]
    pub fn nullability(&self) -> Nullable {
        self.nullable
    }

    pub fn default(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment
    }

    /// returns a copy of this column under another name.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

/// names a table and lists its columns in declaration order, plus the primary-key subset.
///
/// Column lookup by name is case-insensitive. The primary key keeps the order it was declared
/// in, which is the order used when it serves as a sort key.
#[derive(Debug, Clone, PartialEq)]
pub struct TableMetaData {
    table_name: String,
    columns: Vec<Column>,
    primary_keys: Vec<usize>,
    index: HashMap<String, usize>,
}

impl TableMetaData {
    pub fn new(table_name: impl Into<String>, columns: Vec<Column>) -> Self {
        let mut index = HashMap::new();
        for (i, c) in columns.iter().enumerate() {
            index.entry(case_key(c.name(), false)).or_insert(i);
        }
        Self {
            table_name: table_name.into(),
            columns,
            primary_keys: vec![],
            index,
        }
    }

    /// builds metadata with a primary key. Fails with `NoSuchColumn` when a key name is not
    /// one of `columns`.
    pub fn with_primary_keys<S: AsRef<str>>(
        table_name: impl Into<String>,
        columns: Vec<Column>,
        primary_keys: &[S],
    ) -> Result<Self> {
        let mut md = Self::new(table_name, columns);
        let mut keys = Vec::with_capacity(primary_keys.len());
        for k in primary_keys {
            keys.push(md.column_index(k.as_ref())?);
        }
        md.primary_keys = keys;
        Ok(md)
    }

    /// builds metadata whose columns all have type `Unknown`, as flat file sources do.
    pub fn with_unknown_columns<S: AsRef<str>>(table_name: impl Into<String>, names: &[S]) -> Self {
        Self::new(
            table_name,
            names
                .iter()
                .map(|n| Column::new(n.as_ref(), DataType::Unknown))
                .collect(),
        )
    }

    #[inline]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn primary_keys(&self) -> Vec<&Column> {
        self.primary_keys.iter().map(|i| &self.columns[*i]).collect()
    }

    pub fn primary_key_names(&self) -> Vec<String> {
        self.primary_keys()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.index.get(&case_key(name, false)).copied()
    }

    /// returns the position of column `name`, or `NoSuchColumn`.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.find_column(name).ok_or_else(|| Error::NoSuchColumn {
            table: self.table_name.clone(),
            column: name.to_string(),
        })
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    /// returns a copy under another table name.
    pub fn renamed(&self, table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..self.clone()
        }
    }

    /// builds metadata that keeps only the columns for which `keep` holds. Primary key columns
    /// that are dropped also leave the key.
    pub fn retain_columns<F: Fn(&Column) -> bool>(&self, keep: F) -> Self {
        let kept: Vec<usize> = (0..self.columns.len())
            .filter(|i| keep(&self.columns[*i]))
            .collect();
        let columns: Vec<Column> = kept.iter().map(|i| self.columns[*i].clone()).collect();
        let mut md = Self::new(self.table_name.clone(), columns);
        md.primary_keys = self
            .primary_keys
            .iter()
            .filter_map(|pk| kept.iter().position(|k| k == pk))
            .collect();
        md
    }

    /// reconciles this metadata with a later one for the same table: this table's columns in
    /// their declared order, followed by any column of `other` not already present. The
    /// primary key is this table's, or `other`'s when this table declares none.
    pub fn merge(&self, other: &TableMetaData) -> Self {
        let mut columns = self.columns.clone();
        for c in other.columns() {
            if self.find_column(c.name()).is_none() {
                columns.push(c.clone());
            }
        }
        let mut md = Self::new(self.table_name.clone(), columns);
        md.primary_keys = if self.primary_keys.is_empty() {
            other
                .primary_keys()
                .iter()
                .filter_map(|c| md.find_column(c.name()))
                .collect()
        } else {
            self.primary_keys.clone()
        };
        md
    }

    /// returns true when `other` declares a column that this metadata lacks.
    pub fn lacks_columns_of(&self, other: &TableMetaData) -> bool {
        other
            .columns()
            .iter()
            .any(|c| self.find_column(c.name()).is_none())
    }
}

#[cfg(test)]
fn make_columns(names: &[&str]) -> Vec<Column> {
    names
        .iter()
        .map(|n| Column::new(*n, DataType::Varchar))
        .collect()
}

#[test]
fn test_column_lookup_is_case_insensitive() {
    let md = TableMetaData::new("T", make_columns(&["Id", "name"]));
    assert_eq!(md.column_index("ID").unwrap(), 0);
    assert_eq!(md.column_index("NaMe").unwrap(), 1);
    match md.column_index("missing") {
        Err(Error::NoSuchColumn { table, column }) => {
            assert_eq!(table, "T");
            assert_eq!(column, "missing");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_primary_key_must_be_a_declared_column() {
    let md = TableMetaData::with_primary_keys("T", make_columns(&["a", "b", "c"]), &["c", "A"])
        .unwrap();
    assert_eq!(md.primary_key_names(), vec!["c".to_string(), "a".to_string()]);
    let err = TableMetaData::with_primary_keys("T", make_columns(&["a"]), &["b"]).unwrap_err();
    assert!(matches!(err, Error::NoSuchColumn { .. }));
}

#[test]
fn test_merge_appends_new_columns() {
    let first = TableMetaData::with_primary_keys("T", make_columns(&["id", "a"]), &["id"]).unwrap();
    let second = TableMetaData::new("T", make_columns(&["A", "b", "ID"]));
    let merged = first.merge(&second);
    assert_eq!(
        merged.column_names(),
        vec!["id".to_string(), "a".to_string(), "b".to_string()]
    );
    assert_eq!(merged.primary_key_names(), vec!["id".to_string()]);
    assert!(first.lacks_columns_of(&second));
    assert!(!merged.lacks_columns_of(&second));
}

#[test]
fn test_retain_columns_adjusts_primary_key() {
    let md = TableMetaData::with_primary_keys("T", make_columns(&["a", "b", "c"]), &["c", "a"])
        .unwrap();
    let kept = md.retain_columns(|c| c.name() != "a");
    assert_eq!(kept.column_names(), vec!["b".to_string(), "c".to_string()]);
    assert_eq!(kept.primary_key_names(), vec!["c".to_string()]);
}
