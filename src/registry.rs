//! Provides `OrderedTableNameMap`, which remembers which tables a dataset holds and in what order.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// returns the lookup key for `name` under a case policy.
///
/// `str::to_uppercase` applies the Unicode default case mapping, which does not depend on the
/// platform locale, so a given name always yields the same key.
pub fn case_key(name: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        name.to_string()
    } else {
        name.to_uppercase()
    }
}

/// maps table names to values while keeping the names in insertion order.
///
/// Names are stored as given; lookups go through `case_key`. A name can be added only once,
/// and the value for an existing name can be replaced without moving it.
///
/// The "last table" is the most recently added name unless `set_last_table` overrode it.
/// Consumers use it to route rows to whichever table was reopened most recently.
#[derive(Debug, Clone)]
pub struct OrderedTableNameMap<V> {
    case_sensitive: bool,
    values: HashMap<String, V>,
    names: Vec<String>,
    last_table_override: Option<String>,
}

impl<V> OrderedTableNameMap<V> {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            values: HashMap::new(),
            names: vec![],
            last_table_override: None,
        }
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn key(&self, name: &str) -> String {
        case_key(name, self.case_sensitive)
    }

    /// appends `name`. Fails with `AmbiguousTableName`, leaving the map unchanged, when the
    /// name is already present under the case policy.
    pub fn add(&mut self, name: &str, value: V) -> Result<()> {
        let key = self.key(name);
        if self.values.contains_key(&key) {
            return Err(Error::AmbiguousTableName(name.to_string()));
        }
        tracing::trace!(table = name, "registering table name");
        self.values.insert(key, value);
        self.names.push(name.to_string());
        self.last_table_override = None;
        Ok(())
    }

    /// replaces the value of an existing name, keeping its position. Fails with `NoSuchTable`.
    pub fn update(&mut self, name: &str, value: V) -> Result<()> {
        let key = self.key(name);
        match self.values.get_mut(&key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::NoSuchTable(name.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.values.get(&self.key(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        let key = self.key(name);
        self.values.get_mut(&key)
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.values.contains_key(&self.key(name))
    }

    /// returns the names in insertion order, as originally given.
    pub fn table_names(&self) -> Vec<String> {
        self.names.clone()
    }

    /// returns the stored spelling of `name`.
    pub fn original_name(&self, name: &str) -> Option<&str> {
        let key = self.key(name);
        self.names
            .iter()
            .find(|n| self.key(n) == key)
            .map(|n| n.as_str())
    }

    /// returns the values in the same order as `table_names`.
    pub fn ordered_values(&self) -> Vec<&V> {
        self.names
            .iter()
            .filter_map(|n| self.values.get(&self.key(n)))
            .collect()
    }

    /// consumes the map, returning names and values in insertion order.
    pub fn into_entries(mut self) -> Vec<(String, V)> {
        let case_sensitive = self.case_sensitive;
        self.names
            .into_iter()
            .filter_map(|n| {
                let v = self.values.remove(&case_key(&n, case_sensitive));
                v.map(|v| (n, v))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn last_table_name(&self) -> Option<&str> {
        match &self.last_table_override {
            Some(n) => Some(n.as_str()),
            None => self.names.last().map(|n| n.as_str()),
        }
    }

    pub fn is_last_table(&self, name: &str) -> bool {
        match self.last_table_name() {
            Some(last) => self.key(last) == self.key(name),
            None => false,
        }
    }

    /// marks `name` as the last table. Fails with `NoSuchTable` when it was never added.
    pub fn set_last_table(&mut self, name: &str) -> Result<()> {
        match self.original_name(name) {
            Some(n) => {
                self.last_table_override = Some(n.to_string());
                Ok(())
            }
            None => Err(Error::NoSuchTable(name.to_string())),
        }
    }
}

impl<V> Default for OrderedTableNameMap<V> {
    fn default() -> Self {
        Self::new(false)
    }
}

#[test]
fn test_add_keeps_order_and_original_case() {
    let mut m = OrderedTableNameMap::new(false);
    m.add("Zeta", 1).unwrap();
    m.add("alpha", 2).unwrap();
    m.add("MIDDLE", 3).unwrap();
    assert_eq!(m.table_names(), vec!["Zeta", "alpha", "MIDDLE"]);
    assert_eq!(m.ordered_values(), vec![&1, &2, &3]);
}

#[test]
fn test_duplicate_add_is_rejected_without_change() {
    let mut m = OrderedTableNameMap::new(false);
    m.add("T", "first").unwrap();
    m.add("U", "second").unwrap();
    let err = m.add("t", "dup").unwrap_err();
    assert!(matches!(err, Error::AmbiguousTableName(ref n) if n == "t"));
    assert_eq!(m.get("T"), Some(&"first"));
    assert_eq!(m.table_names(), vec!["T", "U"]);
}

#[test]
fn test_case_policy() {
    let mut insensitive = OrderedTableNameMap::new(false);
    insensitive.add("Foo", 7).unwrap();
    assert_eq!(insensitive.get("FOO"), Some(&7));
    assert_eq!(insensitive.get("foo"), Some(&7));

    let mut sensitive = OrderedTableNameMap::new(true);
    sensitive.add("Foo", 7).unwrap();
    assert_eq!(sensitive.get("Foo"), Some(&7));
    assert_eq!(sensitive.get("FOO"), None);
    assert!(!sensitive.contains_table("foo"));
    sensitive.add("FOO", 8).unwrap();
    assert_eq!(sensitive.len(), 2);
}

#[test]
fn test_update_keeps_position() {
    let mut m = OrderedTableNameMap::new(false);
    m.add("a", 1).unwrap();
    m.add("b", 2).unwrap();
    m.update("A", 10).unwrap();
    assert_eq!(m.ordered_values(), vec![&10, &2]);
    assert!(matches!(m.update("c", 3), Err(Error::NoSuchTable(_))));
}

#[test]
fn test_last_table_override() {
    let mut m = OrderedTableNameMap::new(false);
    assert_eq!(m.last_table_name(), None);
    m.add("a", 1).unwrap();
    m.add("b", 2).unwrap();
    assert!(m.is_last_table("B"));
    m.set_last_table("A").unwrap();
    assert_eq!(m.last_table_name(), Some("a"));
    assert!(!m.is_last_table("b"));
    assert!(matches!(m.set_last_table("zzz"), Err(Error::NoSuchTable(_))));
    m.add("c", 3).unwrap();
    assert_eq!(m.last_table_name(), Some("c"));
}

#[test]
fn test_unicode_names_use_fixed_case_mapping() {
    let mut m = OrderedTableNameMap::new(false);
    m.add("straße", 1).unwrap();
    assert_eq!(m.get("STRASSE"), Some(&1));
    m.add("title", 2).unwrap();
    assert_eq!(m.get("TITLE"), Some(&2));
}
