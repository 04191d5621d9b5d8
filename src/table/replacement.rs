//! Substitutes values of a table as they are read.
//!
//! Flat fixture formats cannot spell every value. A replacement maps marker text to the real
//! value: `[NULL]` to SQL NULL, `${now}` to a timestamp chosen by the test, and so on.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::metadata::TableMetaData;
use crate::sql_value::Value;
use crate::table_traits::{Table, TableRef};

/// holds full-value and substring replacements.
///
/// A full-value replacement swaps a whole text cell. Substring replacements rewrite parts of
/// text cells: without delimiters every occurrence of each key is rewritten; with delimiters
/// only delimited placeholders are. In strict mode a delimited placeholder without a
/// configured replacement is an error, otherwise it is left as it is.
#[derive(Debug, Clone, Default)]
pub struct Replacements {
    values: HashMap<String, Value>,
    substrings: Vec<(String, String)>,
    delimiters: Option<(String, String)>,
    strict: bool,
}

impl Replacements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(mut self, marker: &str, replacement: Value) -> Self {
        self.values.insert(marker.to_string(), replacement);
        self
    }

    pub fn substring(mut self, from: &str, to: &str) -> Self {
        self.substrings.retain(|(k, _)| k != from);
        self.substrings.push((from.to_string(), to.to_string()));
        self
    }

    pub fn delimiters(mut self, start: &str, end: &str) -> Self {
        self.delimiters = Some((start.to_string(), end.to_string()));
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    fn lookup_substring(&self, key: &str) -> Option<&str> {
        self.substrings
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// applies the replacements to one value. Only text values are affected.
    pub fn apply(&self, v: Value) -> Result<Value> {
        let text = match v {
            Value::Text(s) => s,
            other => return Ok(other),
        };
        if let Some(r) = self.values.get(&text) {
            return Ok(r.clone());
        }
        if self.substrings.is_empty() && !self.strict {
            return Ok(Value::Text(text));
        }
        match &self.delimiters {
            None => {
                let mut out = text;
                for (from, to) in &self.substrings {
                    if !from.is_empty() {
                        out = out.replace(from.as_str(), to);
                    }
                }
                Ok(Value::Text(out))
            }
            Some((start, end)) => self.replace_delimited(&text, start, end).map(Value::Text),
        }
    }

    fn replace_delimited(&self, text: &str, start: &str, end: &str) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(s) = rest.find(start) {
            let after_start = &rest[s + start.len()..];
            let e = match after_start.find(end) {
                Some(e) => e,
                None => break,
            };
            let key = &after_start[..e];
            out.push_str(&rest[..s]);
            match self.lookup_substring(key) {
                Some(r) => out.push_str(r),
                None if self.strict => {
                    return Err(Error::UnmatchedReplacement(format!("{}{}{}", start, key, end)))
                }
                None => {
                    out.push_str(start);
                    out.push_str(key);
                    out.push_str(end);
                }
            }
            rest = &after_start[e + end.len()..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

pub struct ReplacementTable {
    inner: TableRef,
    replacements: Rc<Replacements>,
}

impl ReplacementTable {
    pub fn new(inner: TableRef, replacements: Rc<Replacements>) -> Self {
        ReplacementTable {
            inner,
            replacements,
        }
    }
}

impl Table for ReplacementTable {
    fn table_meta_data(&self) -> &TableMetaData {
        self.inner.table_meta_data()
    }

    fn row_count(&self) -> Result<usize> {
        self.inner.row_count()
    }

    fn value(&self, row: usize, column: &str) -> Result<Value> {
        self.replacements.apply(self.inner.value(row, column)?)
    }

    fn close(&self) -> Result<()> {
        self.inner.close()
    }
}

#[test]
fn test_full_value_replacement() {
    let r = Replacements::new().value("[NULL]", Value::Null);
    assert_eq!(r.apply(Value::from("[NULL]")).unwrap(), Value::Null);
    assert_eq!(r.apply(Value::from("x[NULL]")).unwrap(), Value::from("x[NULL]"));
    assert_eq!(r.apply(Value::Int(1)).unwrap(), Value::Int(1));
}

#[test]
fn test_substring_replacement() {
    let r = Replacements::new().substring("foo", "bar");
    assert_eq!(r.apply(Value::from("foo-foo")).unwrap(), Value::from("bar-bar"));
}

#[test]
fn test_delimited_replacement() {
    let r = Replacements::new()
        .substring("user", "alice")
        .delimiters("${", "}");
    assert_eq!(
        r.apply(Value::from("hi ${user}, user ${other}")).unwrap(),
        Value::from("hi alice, user ${other}")
    );
    assert_eq!(r.apply(Value::from("${user")).unwrap(), Value::from("${user"));
}

#[test]
fn test_strict_delimited_replacement() {
    let r = Replacements::new()
        .substring("user", "alice")
        .delimiters("${", "}")
        .strict(true);
    match r.apply(Value::from("${missing}")) {
        Err(Error::UnmatchedReplacement(p)) => assert_eq!(p, "${missing}"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_replacement_table() {
    use crate::table::MemoryTable;
    let inner = MemoryTable::with_rows(
        TableMetaData::with_unknown_columns("T", &["A"]),
        vec![vec![Value::from("[NULL]")], vec![Value::from("kept")]],
    )
    .unwrap();
    let t = ReplacementTable::new(
        Rc::new(inner),
        Rc::new(Replacements::new().value("[NULL]", Value::Null)),
    );
    assert_eq!(t.value(0, "A").unwrap(), Value::Null);
    assert_eq!(t.value(1, "A").unwrap(), Value::from("kept"));
}
