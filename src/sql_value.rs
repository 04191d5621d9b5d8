//! Defines an enum of all the values that a table cell can hold.

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use enum_as_inner::EnumAsInner;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S%.f";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Debug, Clone, PartialEq, EnumAsInner)]
/// can hold any value that can be stored in a table cell.
///
/// `NoValue` marks a column that the source never offered for a row (a missing attribute in a
/// flat XML row, or a row written before column sensing discovered the column). It is distinct
/// from `Null`, which is an explicit SQL NULL.
pub enum Value {
    NoValue,
    Null,
    Bool(bool),
    Int(i64),
    Decimal(BigDecimal),
    Real(f64),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// true for both `Null` and `NoValue`.
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Null | Value::NoValue)
    }

    /// names the runtime kind of the value, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::NoValue => "no-value",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Decimal(_) => "decimal",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "timestamp",
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::NoValue => f.write_str("[NO_VALUE]"),
            Value::Null => f.write_str("NULL"),
            Value::Bool(x) => write!(f, "{}", x),
            Value::Int(x) => write!(f, "{}", x),
            Value::Decimal(x) => write!(f, "{}", x),
            Value::Real(x) => write!(f, "{}", x),
            Value::Text(x) => write!(f, "{}", x),
            Value::Bytes(x) => write!(f, "{}", hex::encode(x)),
            Value::Date(x) => write!(f, "{}", x.format(DATE_FORMAT)),
            Value::Time(x) => write!(f, "{}", x.format(TIME_FORMAT)),
            Value::Timestamp(x) => write!(f, "{}", x.format(TIMESTAMP_FORMAT)),
        }
    }
}

impl From<i64> for Value {
    fn from(x: i64) -> Self {
        Value::Int(x)
    }
}

impl From<i32> for Value {
    fn from(x: i32) -> Self {
        Value::Int(x as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Real(x)
    }
}

impl From<bool> for Value {
    fn from(x: bool) -> Self {
        Value::Bool(x)
    }
}

impl From<&str> for Value {
    fn from(x: &str) -> Self {
        Value::Text(x.to_string())
    }
}

impl From<String> for Value {
    fn from(x: String) -> Self {
        Value::Text(x)
    }
}

impl From<Vec<u8>> for Value {
    fn from(x: Vec<u8>) -> Self {
        Value::Bytes(x)
    }
}

impl From<BigDecimal> for Value {
    fn from(x: BigDecimal) -> Self {
        Value::Decimal(x)
    }
}

impl From<NaiveDate> for Value {
    fn from(x: NaiveDate) -> Self {
        Value::Date(x)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(x: NaiveDateTime) -> Self {
        Value::Timestamp(x)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(x: Option<T>) -> Self {
        match x {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[test]
fn test_display() {
    use std::str::FromStr;
    assert_eq!(Value::Int(-3).to_string(), "-3");
    assert_eq!(Value::Real(1.0).to_string(), "1");
    assert_eq!(Value::Real(2.5).to_string(), "2.5");
    assert_eq!(Value::Bytes(vec![0x00, 0x1f, 0xff]).to_string(), "001fff");
    assert_eq!(
        Value::Decimal(BigDecimal::from_str("12.50").unwrap()).to_string(),
        "12.50"
    );
    let ts = NaiveDate::from_ymd_opt(2020, 2, 29)
        .unwrap()
        .and_hms_opt(13, 4, 5)
        .unwrap();
    assert_eq!(Value::Timestamp(ts).to_string(), "2020-02-29 13:04:05");
    assert_eq!(Value::Null.to_string(), "NULL");
}

#[test]
fn test_no_value_is_not_null() {
    assert_ne!(Value::NoValue, Value::Null);
    assert!(Value::NoValue.is_no_value());
    assert!(Value::Null.is_null());
    assert!(Value::NoValue.is_absent());
    assert_eq!(Value::from(None::<i64>), Value::Null);
    assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
}
