//! Defines the semantic column types and how each one casts, orders, stringifies and binds values.
//!
//! Values coming from different sources rarely share a native representation: a flat XML
//! fixture only has text, while a database returns integers, reals and blobs. A `DataType`
//! brings both into one representation so that they can be ordered and compared.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use thiserror::Error;

use crate::sql_value::{Value, DATE_FORMAT};

/// JDBC-style type codes, used as vendor-neutral type identifiers.
pub mod codes {
    pub const BIT: i32 = -7;
    pub const TINYINT: i32 = -6;
    pub const BIGINT: i32 = -5;
    pub const LONGVARBINARY: i32 = -4;
    pub const VARBINARY: i32 = -3;
    pub const BINARY: i32 = -2;
    pub const LONGVARCHAR: i32 = -1;
    pub const NULL: i32 = 0;
    pub const CHAR: i32 = 1;
    pub const NUMERIC: i32 = 2;
    pub const DECIMAL: i32 = 3;
    pub const INTEGER: i32 = 4;
    pub const SMALLINT: i32 = 5;
    pub const FLOAT: i32 = 6;
    pub const REAL: i32 = 7;
    pub const DOUBLE: i32 = 8;
    pub const VARCHAR: i32 = 12;
    pub const BOOLEAN: i32 = 16;
    pub const DATE: i32 = 91;
    pub const TIME: i32 = 92;
    pub const TIMESTAMP: i32 = 93;
    pub const OTHER: i32 = 1111;
    pub const BLOB: i32 = 2004;
    pub const CLOB: i32 = 2005;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// These are the semantic types a column can declare.
pub enum DataType {
    Unknown,
    Char,
    Varchar,
    LongVarchar,
    Clob,
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Decimal,
    Numeric,
    Real,
    Float,
    Double,
    Date,
    Time,
    Timestamp,
    Binary,
    VarBinary,
    LongVarBinary,
    Blob,
}

/// groups data types that share casting and comparison rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Unknown,
    Text,
    Boolean,
    Integer,
    Decimal,
    Float,
    Date,
    Time,
    Timestamp,
    Binary,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Unable to typecast value <{value}> of type {kind} to {target}")]
    TypeCast {
        value: String,
        kind: &'static str,
        target: DataType,
    },
    #[error("Unknown data type name: {0}")]
    UnknownTypeName(String),
}

/// is the string form of a value used when two values are checked for equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalValue {
    NoValue,
    Null,
    Text(String),
}

impl std::fmt::Display for CanonicalValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CanonicalValue::NoValue => f.write_str("[NO_VALUE]"),
            CanonicalValue::Null => f.write_str("NULL"),
            CanonicalValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        TYPE_NAMES
            .get(base_type_name(&upper))
            .copied()
            .ok_or_else(|| Error::UnknownTypeName(String::from(s)))
    }
}

lazy_static::lazy_static! {
    static ref TYPE_NAMES: HashMap<&'static str, DataType> = {
        use DataType::*;
        let mut m = HashMap::new();
        for dt in [
            Unknown, Char, Varchar, LongVarchar, Clob, Boolean, TinyInt, SmallInt, Integer,
            BigInt, Decimal, Numeric, Real, Float, Double, Date, Time, Timestamp, Binary,
            VarBinary, LongVarBinary, Blob,
        ] {
            m.insert(dt.name(), dt);
        }
        m.insert("INT", Integer);
        m.insert("TEXT", Varchar);
        m.insert("STRING", Varchar);
        m.insert("CHARACTER", Char);
        m.insert("NVARCHAR", Varchar);
        m.insert("NCHAR", Char);
        m.insert("BOOL", Boolean);
        m.insert("BIT", Boolean);
        m.insert("DATETIME", Timestamp);
        m.insert("DOUBLE PRECISION", Double);
        m.insert("BYTEA", Blob);
        m
    };
}

/// strips a size suffix such as `(20)` or `(10,2)` from a type name.
fn base_type_name(upper: &str) -> &str {
    match upper.find('(') {
        Some(i) => upper[..i].trim_end(),
        None => upper,
    }
}

fn cast_error(v: &Value, target: DataType) -> Error {
    Error::TypeCast {
        value: v.to_string(),
        kind: v.kind_name(),
        target,
    }
}

fn parse_decimal(s: &str) -> Option<BigDecimal> {
    BigDecimal::from_str(s.trim()).ok()
}

fn real_to_decimal(x: f64) -> Option<BigDecimal> {
    if !x.is_finite() {
        return None;
    }
    // Display gives the shortest text that round-trips, so 0.1 stays 0.1.
    BigDecimal::from_str(&x.to_string()).ok()
}

fn millis_to_timestamp(ms: i64) -> Option<NaiveDateTime> {
    DateTime::<Utc>::from_timestamp_millis(ms).map(|dt| dt.naive_utc())
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    for fmt in [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

impl DataType {
    /// is the upper-case SQL name of the type.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Unknown => "UNKNOWN",
            DataType::Char => "CHAR",
            DataType::Varchar => "VARCHAR",
            DataType::LongVarchar => "LONGVARCHAR",
            DataType::Clob => "CLOB",
            DataType::Boolean => "BOOLEAN",
            DataType::TinyInt => "TINYINT",
            DataType::SmallInt => "SMALLINT",
            DataType::Integer => "INTEGER",
            DataType::BigInt => "BIGINT",
            DataType::Decimal => "DECIMAL",
            DataType::Numeric => "NUMERIC",
            DataType::Real => "REAL",
            DataType::Float => "FLOAT",
            DataType::Double => "DOUBLE",
            DataType::Date => "DATE",
            DataType::Time => "TIME",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Binary => "BINARY",
            DataType::VarBinary => "VARBINARY",
            DataType::LongVarBinary => "LONGVARBINARY",
            DataType::Blob => "BLOB",
        }
    }

    /// returns the JDBC-style type code of the type.
    pub fn sql_type(&self) -> i32 {
        match self {
            DataType::Unknown => codes::OTHER,
            DataType::Char => codes::CHAR,
            DataType::Varchar => codes::VARCHAR,
            DataType::LongVarchar => codes::LONGVARCHAR,
            DataType::Clob => codes::CLOB,
            DataType::Boolean => codes::BOOLEAN,
            DataType::TinyInt => codes::TINYINT,
            DataType::SmallInt => codes::SMALLINT,
            DataType::Integer => codes::INTEGER,
            DataType::BigInt => codes::BIGINT,
            DataType::Decimal => codes::DECIMAL,
            DataType::Numeric => codes::NUMERIC,
            DataType::Real => codes::REAL,
            DataType::Float => codes::FLOAT,
            DataType::Double => codes::DOUBLE,
            DataType::Date => codes::DATE,
            DataType::Time => codes::TIME,
            DataType::Timestamp => codes::TIMESTAMP,
            DataType::Binary => codes::BINARY,
            DataType::VarBinary => codes::VARBINARY,
            DataType::LongVarBinary => codes::LONGVARBINARY,
            DataType::Blob => codes::BLOB,
        }
    }

    /// maps a JDBC-style type code back to a data type. Unrecognised codes give `Unknown`.
    pub fn from_sql_type(code: i32) -> DataType {
        match code {
            codes::CHAR => DataType::Char,
            codes::VARCHAR => DataType::Varchar,
            codes::LONGVARCHAR => DataType::LongVarchar,
            codes::CLOB => DataType::Clob,
            codes::BOOLEAN | codes::BIT => DataType::Boolean,
            codes::TINYINT => DataType::TinyInt,
            codes::SMALLINT => DataType::SmallInt,
            codes::INTEGER => DataType::Integer,
            codes::BIGINT => DataType::BigInt,
            codes::DECIMAL => DataType::Decimal,
            codes::NUMERIC => DataType::Numeric,
            codes::REAL => DataType::Real,
            codes::FLOAT => DataType::Float,
            codes::DOUBLE => DataType::Double,
            codes::DATE => DataType::Date,
            codes::TIME => DataType::Time,
            codes::TIMESTAMP => DataType::Timestamp,
            codes::BINARY => DataType::Binary,
            codes::VARBINARY => DataType::VarBinary,
            codes::LONGVARBINARY => DataType::LongVarBinary,
            codes::BLOB => DataType::Blob,
            _ => DataType::Unknown,
        }
    }

    /// guesses the data type of a value that carries no declared type.
    pub fn for_value(v: &Value) -> DataType {
        match v {
            Value::NoValue | Value::Null => DataType::Unknown,
            Value::Bool(_) => DataType::Boolean,
            Value::Int(_) => DataType::BigInt,
            Value::Decimal(_) => DataType::Decimal,
            Value::Real(_) => DataType::Double,
            Value::Text(_) => DataType::Varchar,
            Value::Bytes(_) => DataType::Blob,
            Value::Date(_) => DataType::Date,
            Value::Time(_) => DataType::Time,
            Value::Timestamp(_) => DataType::Timestamp,
        }
    }

    fn family(&self) -> Family {
        match self {
            DataType::Unknown => Family::Unknown,
            DataType::Char | DataType::Varchar | DataType::LongVarchar | DataType::Clob => {
                Family::Text
            }
            DataType::Boolean => Family::Boolean,
            DataType::TinyInt | DataType::SmallInt | DataType::Integer | DataType::BigInt => {
                Family::Integer
            }
            DataType::Decimal | DataType::Numeric => Family::Decimal,
            DataType::Real | DataType::Float | DataType::Double => Family::Float,
            DataType::Date => Family::Date,
            DataType::Time => Family::Time,
            DataType::Timestamp => Family::Timestamp,
            DataType::Binary | DataType::VarBinary | DataType::LongVarBinary | DataType::Blob => {
                Family::Binary
            }
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.family(),
            Family::Integer | Family::Decimal | Family::Float
        )
    }

    pub fn is_date_time(&self) -> bool {
        matches!(self.family(), Family::Date | Family::Time | Family::Timestamp)
    }

    fn integer_range(&self) -> (i64, i64) {
        match self {
            DataType::TinyInt => (i8::MIN as i64, i8::MAX as i64),
            DataType::SmallInt => (i16::MIN as i64, i16::MAX as i64),
            DataType::Integer => (i32::MIN as i64, i32::MAX as i64),
            _ => (i64::MIN, i64::MAX),
        }
    }

    /// converts `v` to the representation of this type.
    ///
    /// `Null` and `NoValue` pass through unchanged for every type, as does any value cast to
    /// `Unknown`.
    pub fn type_cast(&self, v: &Value) -> Result<Value, Error> {
        if v.is_absent() {
            return Ok(v.clone());
        }
        let err = || cast_error(v, *self);
        match self.family() {
            Family::Unknown => Ok(v.clone()),
            Family::Text => match v {
                Value::Text(_) => Ok(v.clone()),
                other => Ok(Value::Text(other.to_string())),
            },
            Family::Boolean => match v {
                Value::Bool(_) => Ok(v.clone()),
                Value::Int(i) => Ok(Value::Bool(*i != 0)),
                Value::Decimal(d) => Ok(Value::Bool(!d.eq(&BigDecimal::from(0)))),
                Value::Text(s) => match s.trim().to_lowercase().as_str() {
                    "true" | "1" => Ok(Value::Bool(true)),
                    "false" | "0" => Ok(Value::Bool(false)),
                    _ => Err(err()),
                },
                _ => Err(err()),
            },
            Family::Integer => {
                let i = match v {
                    Value::Int(i) => *i,
                    Value::Bool(b) => *b as i64,
                    Value::Real(x) => {
                        // i64::MAX as f64 rounds up to 2^63, which is already out of range.
                        if x.fract() != 0.0 || !(*x >= i64::MIN as f64 && *x < i64::MAX as f64) {
                            return Err(err());
                        }
                        *x as i64
                    }
                    Value::Decimal(d) => {
                        if !d.is_integer() {
                            return Err(err());
                        }
                        d.to_i64().ok_or_else(err)?
                    }
                    Value::Text(s) => match s.trim().parse::<i64>() {
                        Ok(i) => i,
                        Err(_) => {
                            let d = parse_decimal(s).ok_or_else(err)?;
                            if !d.is_integer() {
                                return Err(err());
                            }
                            d.to_i64().ok_or_else(err)?
                        }
                    },
                    _ => return Err(err()),
                };
                let (lo, hi) = self.integer_range();
                if i < lo || i > hi {
                    return Err(err());
                }
                Ok(Value::Int(i))
            }
            Family::Decimal => match v {
                Value::Decimal(_) => Ok(v.clone()),
                Value::Int(i) => Ok(Value::Decimal(BigDecimal::from(*i))),
                Value::Bool(b) => Ok(Value::Decimal(BigDecimal::from(*b as i64))),
                Value::Real(x) => real_to_decimal(*x).map(Value::Decimal).ok_or_else(err),
                Value::Text(s) => parse_decimal(s).map(Value::Decimal).ok_or_else(err),
                _ => Err(err()),
            },
            Family::Float => match v {
                Value::Real(_) => Ok(v.clone()),
                Value::Int(i) => Ok(Value::Real(*i as f64)),
                Value::Bool(b) => Ok(Value::Real(*b as i64 as f64)),
                Value::Decimal(d) => d.to_f64().map(Value::Real).ok_or_else(err),
                Value::Text(s) => s.trim().parse::<f64>().map(Value::Real).map_err(|_| err()),
                _ => Err(err()),
            },
            Family::Date => match v {
                Value::Date(_) => Ok(v.clone()),
                Value::Timestamp(ts) => Ok(Value::Date(ts.date())),
                Value::Int(ms) => millis_to_timestamp(*ms)
                    .map(|ts| Value::Date(ts.date()))
                    .ok_or_else(err),
                Value::Text(s) => parse_timestamp(s)
                    .map(|ts| Value::Date(ts.date()))
                    .ok_or_else(err),
                _ => Err(err()),
            },
            Family::Time => match v {
                Value::Time(_) => Ok(v.clone()),
                Value::Timestamp(ts) => Ok(Value::Time(ts.time())),
                Value::Text(s) => parse_time(s)
                    .or_else(|| parse_timestamp(s).map(|ts| ts.time()))
                    .map(Value::Time)
                    .ok_or_else(err),
                _ => Err(err()),
            },
            Family::Timestamp => match v {
                Value::Timestamp(_) => Ok(v.clone()),
                Value::Date(d) => Ok(Value::Timestamp(d.and_time(NaiveTime::MIN))),
                Value::Int(ms) => millis_to_timestamp(*ms)
                    .map(Value::Timestamp)
                    .ok_or_else(err),
                Value::Text(s) => parse_timestamp(s).map(Value::Timestamp).ok_or_else(err),
                _ => Err(err()),
            },
            Family::Binary => match v {
                Value::Bytes(_) => Ok(v.clone()),
                Value::Text(s) => hex::decode(s.trim()).map(Value::Bytes).map_err(|_| err()),
                _ => Err(err()),
            },
        }
    }

    /// orders two values after casting both to this type. Absent values sort first,
    /// `NoValue` before `Null`.
    pub fn compare(&self, a: &Value, b: &Value) -> Result<Ordering, Error> {
        let a = self.type_cast(a)?;
        let b = self.type_cast(b)?;
        Ok(compare_cast_values(&a, &b))
    }

    /// returns the canonical string form of `v` under this type.
    ///
    /// Two values with different native representations but the same meaning under this
    /// type, for example `Text("1.50")` and `Decimal(1.5)` as `DECIMAL`, share a canonical form.
    pub fn canonical(&self, v: &Value) -> Result<CanonicalValue, Error> {
        let cast = self.type_cast(v)?;
        Ok(match cast {
            Value::NoValue => CanonicalValue::NoValue,
            Value::Null => CanonicalValue::Null,
            Value::Decimal(d) => CanonicalValue::Text(d.normalized().to_string()),
            other => CanonicalValue::Text(other.to_string()),
        })
    }

    /// converts `v` into a value ready to be bound to a SQL statement parameter.
    pub fn bind(&self, v: &Value) -> Result<rusqlite::types::Value, Error> {
        use rusqlite::types::Value as Sql;
        Ok(match self.type_cast(v)? {
            Value::NoValue | Value::Null => Sql::Null,
            Value::Bool(b) => Sql::Integer(b as i64),
            Value::Int(i) => Sql::Integer(i),
            Value::Real(x) => Sql::Real(x),
            Value::Bytes(b) => Sql::Blob(b),
            Value::Text(s) => Sql::Text(s),
            other => Sql::Text(other.to_string()),
        })
    }
}

fn absent_rank(v: &Value) -> u8 {
    match v {
        Value::NoValue => 0,
        Value::Null => 1,
        _ => 2,
    }
}

fn as_decimal(v: &Value) -> Option<BigDecimal> {
    match v {
        Value::Int(i) => Some(BigDecimal::from(*i)),
        Value::Decimal(d) => Some(d.clone()),
        Value::Real(x) => real_to_decimal(*x),
        Value::Text(s) => parse_decimal(s),
        _ => None,
    }
}

/// orders two values that have already been cast to a common type.
/// Mismatched variants (possible only for `Unknown`) are ordered numerically when both read as
/// numbers, and by their text form otherwise.
pub(crate) fn compare_cast_values(a: &Value, b: &Value) -> Ordering {
    let (ra, rb) = (absent_rank(a), absent_rank(b));
    if ra < 2 || rb < 2 {
        return ra.cmp(&rb);
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Decimal(x), Value::Decimal(y)) => x.cmp(y),
        (Value::Real(x), Value::Real(y)) => x.total_cmp(y),
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Bytes(x), Value::Bytes(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        (Value::Time(x), Value::Time(y)) => x.cmp(y),
        (Value::Timestamp(x), Value::Timestamp(y)) => x.cmp(y),
        _ => match (as_decimal(a), as_decimal(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}

/// picks the type used to compare an expected column against an actual column.
///
/// The rule is symmetric in its arguments: equal types win, an `Unknown` side defers to the
/// other side, two numeric types meet at `Decimal`, and anything else is compared as text.
pub fn comparison_type(expected: DataType, actual: DataType) -> DataType {
    if expected == actual {
        expected
    } else if expected == DataType::Unknown {
        actual
    } else if actual == DataType::Unknown {
        expected
    } else if expected.is_numeric() && actual.is_numeric() {
        DataType::Decimal
    } else {
        DataType::Varchar
    }
}

/// maps vendor type codes and type names to data types.
///
/// Lookup order: explicit name overrides, explicit code overrides, the standard code table,
/// the standard name table, and finally SQLite-style affinity rules on the name.
#[derive(Debug, Clone, Default)]
pub struct DataTypeFactory {
    by_name: HashMap<String, DataType>,
    by_code: HashMap<i32, DataType>,
}

impl DataTypeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type_name(mut self, name: &str, data_type: DataType) -> Self {
        self.by_name.insert(name.trim().to_uppercase(), data_type);
        self
    }

    pub fn with_type_code(mut self, code: i32, data_type: DataType) -> Self {
        self.by_code.insert(code, data_type);
        self
    }

    pub fn create_data_type(&self, sql_type: i32, type_name: &str) -> DataType {
        let upper = type_name.trim().to_uppercase();
        let base = base_type_name(&upper);
        if let Some(dt) = self.by_name.get(base).or_else(|| self.by_name.get(&upper)) {
            return *dt;
        }
        if let Some(dt) = self.by_code.get(&sql_type) {
            return *dt;
        }
        match DataType::from_sql_type(sql_type) {
            DataType::Unknown => {}
            dt => return dt,
        }
        if let Some(dt) = TYPE_NAMES.get(base) {
            return *dt;
        }
        affinity(base)
    }
}

/// applies the SQLite column affinity rules to a declared type name.
fn affinity(upper: &str) -> DataType {
    if upper.is_empty() {
        DataType::Unknown
    } else if upper.contains("INT") {
        DataType::BigInt
    } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
        DataType::Varchar
    } else if upper.contains("BLOB") {
        DataType::Blob
    } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        DataType::Double
    } else if upper.contains("DEC") || upper.contains("NUM") {
        DataType::Decimal
    } else {
        DataType::Unknown
    }
}

#[test]
fn test_type_cast_numbers() {
    use DataType::*;
    assert_eq!(Integer.type_cast(&Value::from(" 42 ")).unwrap(), Value::Int(42));
    assert_eq!(Integer.type_cast(&Value::from("7.0")).unwrap(), Value::Int(7));
    assert!(Integer.type_cast(&Value::from("7.5")).is_err());
    assert!(TinyInt.type_cast(&Value::Int(300)).is_err());
    assert_eq!(Double.type_cast(&Value::Int(2)).unwrap(), Value::Real(2.0));
    assert_eq!(
        Decimal.type_cast(&Value::Real(0.1)).unwrap(),
        Value::Decimal(BigDecimal::from_str("0.1").unwrap())
    );
    assert_eq!(Boolean.type_cast(&Value::from("TRUE")).unwrap(), Value::Bool(true));
    assert_eq!(Boolean.type_cast(&Value::Int(0)).unwrap(), Value::Bool(false));
}

#[test]
fn test_type_cast_error_reports_value_kind_and_target() {
    let e = DataType::Integer.type_cast(&Value::from("abc")).unwrap_err();
    assert_eq!(
        e,
        Error::TypeCast {
            value: "abc".to_string(),
            kind: "text",
            target: DataType::Integer
        }
    );
    let msg = e.to_string();
    assert!(msg.contains("abc"));
    assert!(msg.contains("text"));
    assert!(msg.contains("INTEGER"));
}

#[test]
fn test_type_cast_absent_values_pass_through() {
    for dt in [DataType::Integer, DataType::Blob, DataType::Timestamp] {
        assert_eq!(dt.type_cast(&Value::Null).unwrap(), Value::Null);
        assert_eq!(dt.type_cast(&Value::NoValue).unwrap(), Value::NoValue);
    }
}

#[test]
fn test_type_cast_date_time() {
    let ts = DataType::Timestamp
        .type_cast(&Value::from("2021-03-04 05:06:07.250"))
        .unwrap();
    assert_eq!(ts.to_string(), "2021-03-04 05:06:07.250");
    let d = DataType::Date.type_cast(&ts).unwrap();
    assert_eq!(d.to_string(), "2021-03-04");
    let t = DataType::Time.type_cast(&Value::from("05:06")).unwrap();
    assert_eq!(t.to_string(), "05:06:00");
    assert_eq!(
        DataType::Timestamp
            .type_cast(&Value::from("2021-03-04"))
            .unwrap()
            .to_string(),
        "2021-03-04 00:00:00"
    );
    assert_eq!(
        DataType::Timestamp.type_cast(&Value::Int(0)).unwrap().to_string(),
        "1970-01-01 00:00:00"
    );
}

#[test]
fn test_canonical_unifies_representations() {
    let d = DataType::Decimal;
    assert_eq!(
        d.canonical(&Value::from("1.50")).unwrap(),
        d.canonical(&Value::Real(1.5)).unwrap()
    );
    assert_eq!(
        d.canonical(&Value::Int(3)).unwrap(),
        d.canonical(&Value::from("3.000")).unwrap()
    );
    assert_eq!(
        DataType::Blob.canonical(&Value::from("0aff")).unwrap(),
        DataType::Blob.canonical(&Value::Bytes(vec![0x0a, 0xff])).unwrap()
    );
    assert_eq!(d.canonical(&Value::Null).unwrap(), CanonicalValue::Null);
    assert_ne!(
        d.canonical(&Value::Null).unwrap(),
        d.canonical(&Value::NoValue).unwrap()
    );
}

#[test]
fn test_compare() {
    use DataType::*;
    assert_eq!(
        Integer.compare(&Value::from("10"), &Value::Int(9)).unwrap(),
        Ordering::Greater
    );
    assert_eq!(
        Varchar.compare(&Value::from("10"), &Value::Int(9)).unwrap(),
        Ordering::Less
    );
    assert_eq!(
        Integer.compare(&Value::Null, &Value::Int(-100)).unwrap(),
        Ordering::Less
    );
    assert_eq!(
        Unknown.compare(&Value::from("2"), &Value::Int(10)).unwrap(),
        Ordering::Less
    );
}

#[test]
fn test_comparison_type_is_symmetric() {
    use DataType::*;
    let all = [Unknown, Varchar, Integer, Double, Decimal, Date, Blob, Boolean];
    for a in all {
        for b in all {
            assert_eq!(comparison_type(a, b), comparison_type(b, a));
        }
    }
    assert_eq!(comparison_type(Integer, Double), Decimal);
    assert_eq!(comparison_type(Unknown, Date), Date);
    assert_eq!(comparison_type(Date, Blob), Varchar);
}

#[test]
fn test_data_type_factory() {
    let f = DataTypeFactory::new();
    assert_eq!(f.create_data_type(codes::INTEGER, ""), DataType::Integer);
    assert_eq!(f.create_data_type(codes::OTHER, "varchar(20)"), DataType::Varchar);
    assert_eq!(f.create_data_type(codes::OTHER, "UNSIGNED BIG INT"), DataType::BigInt);
    assert_eq!(f.create_data_type(codes::OTHER, "decimal(10, 2)"), DataType::Decimal);
    assert_eq!(f.create_data_type(codes::OTHER, ""), DataType::Unknown);
    let f = f.with_type_name("json", DataType::Clob);
    assert_eq!(f.create_data_type(codes::OTHER, "JSON"), DataType::Clob);
    assert_eq!(DataType::from_str("int").unwrap(), DataType::Integer);
    assert!(DataType::from_str("geometry").is_err());
}

#[test]
fn test_bind() {
    use rusqlite::types::Value as Sql;
    assert_eq!(DataType::Integer.bind(&Value::from("5")).unwrap(), Sql::Integer(5));
    assert_eq!(DataType::Varchar.bind(&Value::NoValue).unwrap(), Sql::Null);
    assert_eq!(
        DataType::Blob.bind(&Value::from("00ff")).unwrap(),
        Sql::Blob(vec![0, 255])
    );
}

#[test]
fn test_integer_cast_rejects_out_of_range_reals() {
    assert!(DataType::BigInt.type_cast(&Value::Real(1e30)).is_err());
    assert!(DataType::BigInt.type_cast(&Value::Real(-1e30)).is_err());
    assert!(DataType::BigInt.type_cast(&Value::Real(9.223372036854775807e18)).is_err());
    assert_eq!(
        DataType::BigInt.type_cast(&Value::Real(-9.223372036854775808e18)).unwrap(),
        Value::Int(i64::MIN)
    );
    assert_eq!(DataType::BigInt.type_cast(&Value::Real(4096.0)).unwrap(), Value::Int(4096));
    assert!(matches!(
        DataType::Integer.compare(&Value::Real(1e30), &Value::Real(5e25)),
        Err(Error::TypeCast { .. })
    ));
}
