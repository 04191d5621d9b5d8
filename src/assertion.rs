//! Compares datasets and tables for equality.
//!
//! Table and column order are ignored, and so are declared column types: each pair of values
//! is compared through the canonical text form of a type chosen from both columns' types (see
//! `comparison_type`). Comparison stops at the first difference, which is returned as an
//! `Error::Comparison` naming where it was found.

use std::collections::HashMap;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use itertools::Itertools;
use tracing::instrument;

use crate::error::{Error, Result};
use crate::registry::case_key;
use crate::sql_type::{comparison_type, DataType};
use crate::sql_value::Value;
use crate::table::{MemoryTable, SortMode, SortedTable};
use crate::table_traits::{DataSet, Table, TableRef};

#[derive(Debug, Clone, PartialEq)]
pub enum FailureKind {
    TableNames,
    ColumnNames { table: String },
    RowCount { table: String },
    Value {
        table: String,
        row: usize,
        column: String,
    },
}

/// describes the first difference found, with both sides in text form.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonFailure {
    pub kind: FailureKind,
    pub expected: String,
    pub actual: String,
}

impl std::fmt::Display for ComparisonFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            FailureKind::TableNames => write!(
                f,
                "table names differ: expected {} but was {}",
                self.expected, self.actual
            ),
            FailureKind::ColumnNames { table } => write!(
                f,
                "columns of table {} differ: expected {} but was {}",
                table, self.expected, self.actual
            ),
            FailureKind::RowCount { table } => write!(
                f,
                "row count of table {} differs: expected {} but was {}",
                table, self.expected, self.actual
            ),
            FailureKind::Value { table, row, column } => write!(
                f,
                "value of {}.{} in row {} differs: expected <{}> but was <{}>",
                table, column, row, self.expected, self.actual
            ),
        }
    }
}

fn failure(kind: FailureKind, expected: impl ToString, actual: impl ToString) -> Error {
    Error::Comparison(ComparisonFailure {
        kind,
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

/// decides whether two values of one column are equal.
pub trait ValueComparer {
    fn equals(&self, data_type: DataType, expected: &Value, actual: &Value) -> Result<bool>;
}

/// compares canonical text forms under the comparison type.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultComparer;

impl ValueComparer for DefaultComparer {
    fn equals(&self, data_type: DataType, expected: &Value, actual: &Value) -> Result<bool> {
        Ok(data_type.canonical(expected)? == data_type.canonical(actual)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToleranceKind {
    Absolute,
    Percentage,
}

/// treats two numbers as equal when they differ by no more than a tolerance.
///
/// An absolute tolerance bounds `|expected - actual|`; a percentage tolerance bounds it by
/// that percentage of `|expected|`. Null and absent values fall back to `DefaultComparer`.
#[derive(Debug, Clone)]
pub struct ToleranceComparer {
    tolerance: BigDecimal,
    kind: ToleranceKind,
}

impl ToleranceComparer {
    pub fn absolute(tolerance: BigDecimal) -> Self {
        ToleranceComparer {
            tolerance: tolerance.abs(),
            kind: ToleranceKind::Absolute,
        }
    }

    pub fn percentage(percent: BigDecimal) -> Self {
        ToleranceComparer {
            tolerance: percent.abs(),
            kind: ToleranceKind::Percentage,
        }
    }
}

fn to_decimal(v: &Value) -> Result<BigDecimal> {
    match DataType::Decimal.type_cast(v)? {
        Value::Decimal(d) => Ok(d),
        other => Err(Error::InvalidValue(format!("{} is not a number", other))),
    }
}

impl ValueComparer for ToleranceComparer {
    fn equals(&self, data_type: DataType, expected: &Value, actual: &Value) -> Result<bool> {
        if expected.is_absent() || actual.is_absent() {
            return DefaultComparer.equals(data_type, expected, actual);
        }
        let e = to_decimal(expected)?;
        let a = to_decimal(actual)?;
        let diff = (&e - &a).abs();
        let limit = match self.kind {
            ToleranceKind::Absolute => self.tolerance.clone(),
            ToleranceKind::Percentage => e.abs() * &self.tolerance / BigDecimal::from(100),
        };
        Ok(diff <= limit)
    }
}

/// picks the comparer for each table column, falling back to a default.
pub struct ComparerLookup {
    default: Rc<dyn ValueComparer>,
    by_column: HashMap<(String, String), Rc<dyn ValueComparer>>,
}

impl Default for ComparerLookup {
    fn default() -> Self {
        ComparerLookup {
            default: Rc::new(DefaultComparer),
            by_column: HashMap::new(),
        }
    }
}

impl ComparerLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, comparer: Rc<dyn ValueComparer>) -> Self {
        self.default = comparer;
        self
    }

    /// uses `comparer` for `column` of `table`. Names are matched case-insensitively.
    pub fn with_column(mut self, table: &str, column: &str, comparer: Rc<dyn ValueComparer>) -> Self {
        self.by_column
            .insert((case_key(table, false), case_key(column, false)), comparer);
        self
    }

    pub fn get(&self, table: &str, column: &str) -> &dyn ValueComparer {
        self.by_column
            .get(&(case_key(table, false), case_key(column, false)))
            .unwrap_or(&self.default)
            .as_ref()
    }
}

/// returns a readable copy of a forward-only table, or `None` when `table` can be counted.
fn materialise(table: &dyn Table) -> Result<Option<MemoryTable>> {
    match table.row_count() {
        Ok(_) => Ok(None),
        Err(Error::RowCountUnsupported(_)) => Ok(Some(MemoryTable::copy_of(table)?)),
        Err(e) => Err(e),
    }
}

/// the case-normalized column names of `table`, sorted, without the ignored ones.
fn sorted_columns(table: &dyn Table, ignored: &[String]) -> Vec<String> {
    table
        .table_meta_data()
        .columns()
        .iter()
        .map(|c| case_key(c.name(), false))
        .filter(|n| !ignored.contains(n))
        .sorted()
        .collect()
}

/// the table names of `data_set` as (normalized, original) pairs, sorted by normalized name.
fn sorted_table_names(data_set: &dyn DataSet) -> Result<Vec<(String, String)>> {
    Ok(data_set
        .table_names()?
        .into_iter()
        .map(|n| (case_key(&n, false), n))
        .sorted()
        .collect())
}

fn join_names<'a>(mut names: impl Iterator<Item = &'a String>) -> String {
    format!("[{}]", names.join(", "))
}

/// compares datasets and tables, consulting a `ComparerLookup` for each column.
#[derive(Default)]
pub struct Assertion {
    comparers: ComparerLookup,
}

impl Assertion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_comparers(comparers: ComparerLookup) -> Self {
        Assertion { comparers }
    }

    #[instrument(skip_all)]
    pub fn assert_data_sets_equal(&self, expected: &dyn DataSet, actual: &dyn DataSet) -> Result<()> {
        if std::ptr::addr_eq(expected as *const dyn DataSet, actual as *const dyn DataSet) {
            return Ok(());
        }
        let expected_names = sorted_table_names(expected)?;
        let actual_names = sorted_table_names(actual)?;
        let same = expected_names.len() == actual_names.len()
            && expected_names
                .iter()
                .zip(actual_names.iter())
                .all(|(e, a)| e.0 == a.0);
        if !same {
            return Err(failure(
                FailureKind::TableNames,
                join_names(expected_names.iter().map(|n| &n.0)),
                join_names(actual_names.iter().map(|n| &n.0)),
            ));
        }
        for ((_, e), (_, a)) in expected_names.iter().zip(actual_names.iter()) {
            let expected_table = expected.table(e)?;
            let actual_table = actual.table(a)?;
            self.assert_tables_equal(expected_table.as_ref(), actual_table.as_ref())?;
        }
        Ok(())
    }

    pub fn assert_tables_equal(&self, expected: &dyn Table, actual: &dyn Table) -> Result<()> {
        self.assert_equals_ignore_cols::<&str>(expected, actual, &[])
    }

    /// compares two tables, leaving out the named columns on both sides.
    #[instrument(skip_all, fields(table = expected.table_meta_data().table_name()))]
    pub fn assert_equals_ignore_cols<S: AsRef<str>>(
        &self,
        expected: &dyn Table,
        actual: &dyn Table,
        ignored: &[S],
    ) -> Result<()> {
        if std::ptr::addr_eq(expected as *const dyn Table, actual as *const dyn Table) {
            return Ok(());
        }
        let table_name = expected.table_meta_data().table_name().to_string();
        let ignored: Vec<String> = ignored
            .iter()
            .map(|c| case_key(c.as_ref(), false))
            .collect();

        let expected_columns = sorted_columns(expected, &ignored);
        let actual_columns = sorted_columns(actual, &ignored);
        if expected_columns != actual_columns {
            return Err(failure(
                FailureKind::ColumnNames {
                    table: table_name.clone(),
                },
                join_names(expected_columns.iter()),
                join_names(actual_columns.iter()),
            ));
        }

        let expected_copy = materialise(expected)?;
        let actual_copy = materialise(actual)?;
        let expected: &dyn Table = match &expected_copy {
            Some(t) => t,
            None => expected,
        };
        let actual: &dyn Table = match &actual_copy {
            Some(t) => t,
            None => actual,
        };

        let expected_rows = expected.row_count()?;
        let actual_rows = actual.row_count()?;
        if expected_rows != actual_rows {
            return Err(failure(
                FailureKind::RowCount { table: table_name },
                expected_rows,
                actual_rows,
            ));
        }

        let mut types = Vec::with_capacity(expected_columns.len());
        for c in &expected_columns {
            let e = expected.table_meta_data().column(c)?.data_type();
            let a = actual.table_meta_data().column(c)?.data_type();
            types.push(comparison_type(e, a));
        }

        for row in 0..expected_rows {
            for (column, data_type) in expected_columns.iter().zip(types.iter()) {
                let e = expected.value(row, column)?;
                let a = actual.value(row, column)?;
                let comparer = self.comparers.get(&table_name, column);
                if !comparer.equals(*data_type, &e, &a)? {
                    return Err(failure(
                        FailureKind::Value {
                            table: table_name.clone(),
                            row,
                            column: column.clone(),
                        },
                        data_type.canonical(&e)?,
                        data_type.canonical(&a)?,
                    ));
                }
            }
        }
        tracing::debug!(table = table_name.as_str(), rows = expected_rows, "tables equal");
        Ok(())
    }

    /// sorts both tables by the text form of all compared columns, then compares them.
    pub fn assert_sorted_tables_equal(&self, expected: TableRef, actual: TableRef) -> Result<()> {
        let columns = sorted_columns(expected.as_ref(), &[]);
        let expected = SortedTable::with_columns(expected, &columns, SortMode::Text)?;
        let actual = SortedTable::with_columns(actual, &columns, SortMode::Text)?;
        self.assert_tables_equal(&expected, &actual)
    }
}

pub fn assert_data_sets_equal(expected: &dyn DataSet, actual: &dyn DataSet) -> Result<()> {
    Assertion::new().assert_data_sets_equal(expected, actual)
}

pub fn assert_tables_equal(expected: &dyn Table, actual: &dyn Table) -> Result<()> {
    Assertion::new().assert_tables_equal(expected, actual)
}

pub fn assert_equals_ignore_cols<S: AsRef<str>>(
    expected: &dyn Table,
    actual: &dyn Table,
    ignored: &[S],
) -> Result<()> {
    Assertion::new().assert_equals_ignore_cols(expected, actual, ignored)
}

#[cfg(test)]
fn make_table(name: &str, columns: &[(&str, DataType)], rows: Vec<Vec<Value>>) -> MemoryTable {
    use crate::metadata::{Column, TableMetaData};
    let meta = TableMetaData::new(
        name,
        columns.iter().map(|(n, t)| Column::new(*n, *t)).collect(),
    );
    MemoryTable::with_rows(meta, rows).unwrap()
}

#[cfg(test)]
fn failure_kind(r: Result<()>) -> FailureKind {
    match r {
        Err(Error::Comparison(f)) => f.kind,
        other => panic!("expected a comparison failure, got {:?}", other),
    }
}

#[test]
fn test_value_mismatch_reports_location() {
    let e = make_table("T", &[("A", DataType::Integer)], vec![vec![Value::Int(1)], vec![Value::Int(2)]]);
    let a = make_table("t", &[("a", DataType::Unknown)], vec![vec![Value::from("1")], vec![Value::from("3")]]);
    match assert_tables_equal(&e, &a) {
        Err(Error::Comparison(f)) => {
            assert_eq!(
                f.kind,
                FailureKind::Value {
                    table: "T".to_string(),
                    row: 1,
                    column: "A".to_string()
                }
            );
            assert_eq!(f.expected, "2");
            assert_eq!(f.actual, "3");
            assert_eq!(f.to_string(), "value of T.A in row 1 differs: expected <2> but was <3>");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_canonical_forms_make_types_irrelevant() {
    let e = make_table("T", &[("D", DataType::Decimal)], vec![vec![Value::from("1.50")]]);
    let a = make_table("T", &[("D", DataType::Double)], vec![vec![Value::Real(1.5)]]);
    assert_tables_equal(&e, &a).unwrap();
    assert_tables_equal(&a, &e).unwrap();
}

#[test]
fn test_null_and_no_value_differ() {
    let e = make_table("T", &[("A", DataType::Varchar)], vec![vec![Value::Null]]);
    let a = make_table("T", &[("A", DataType::Varchar)], vec![vec![Value::NoValue]]);
    assert!(matches!(failure_kind(assert_tables_equal(&e, &a)), FailureKind::Value { .. }));
}

#[test]
fn test_column_name_mismatch_and_ignored_columns() {
    let e = make_table(
        "T",
        &[("A", DataType::Integer), ("TS", DataType::Varchar)],
        vec![vec![Value::Int(1), Value::from("now")]],
    );
    let a = make_table("T", &[("A", DataType::Integer)], vec![vec![Value::Int(1)]]);
    match assert_tables_equal(&e, &a) {
        Err(Error::Comparison(f)) => {
            assert_eq!(f.kind, FailureKind::ColumnNames { table: "T".to_string() });
            assert_eq!(f.expected, "[A, TS]");
            assert_eq!(f.actual, "[A]");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_equals_ignore_cols(&e, &a, &["ts"]).unwrap();
}

#[test]
fn test_tolerance_comparers() {
    let e = make_table("T", &[("X", DataType::Double)], vec![vec![Value::Real(100.0)]]);
    let a = make_table("T", &[("X", DataType::Double)], vec![vec![Value::Real(100.4)]]);
    assert!(assert_tables_equal(&e, &a).is_err());

    let absolute = Assertion::with_comparers(ComparerLookup::new().with_column(
        "t",
        "x",
        Rc::new(ToleranceComparer::absolute(BigDecimal::from(1))),
    ));
    absolute.assert_tables_equal(&e, &a).unwrap();

    let tight = Assertion::with_comparers(ComparerLookup::new().with_default(Rc::new(
        ToleranceComparer::percentage("0.1".parse().unwrap()),
    )));
    assert!(tight.assert_tables_equal(&e, &a).is_err());
    let loose = Assertion::with_comparers(ComparerLookup::new().with_default(Rc::new(
        ToleranceComparer::percentage("0.5".parse().unwrap()),
    )));
    loose.assert_tables_equal(&e, &a).unwrap();
}

#[test]
fn test_forward_only_tables_are_materialised() {
    use crate::result_table::{meta_data_from_columns, ForwardOnlyResultTable, ResultCursor, VecCursor};
    use crate::sql_type::DataTypeFactory;
    let rows = vec![vec![Value::Int(1)], vec![Value::Int(2)]];
    let cursor = VecCursor::new(&["A"], rows.clone());
    let meta = meta_data_from_columns("T", cursor.columns(), &DataTypeFactory::new());
    let actual = ForwardOnlyResultTable::new(meta, Box::new(cursor)).unwrap();
    let expected = make_table("T", &[("A", DataType::Integer)], rows);
    assert_tables_equal(&expected, &actual).unwrap();
}

#[test]
fn test_sorted_comparison() {
    let e = make_table(
        "T",
        &[("A", DataType::Integer)],
        vec![vec![Value::Int(2)], vec![Value::Int(1)]],
    );
    let a = make_table(
        "T",
        &[("A", DataType::Unknown)],
        vec![vec![Value::from("1")], vec![Value::from("2")]],
    );
    assert!(assert_tables_equal(&e, &a).is_err());
    Assertion::new()
        .assert_sorted_tables_equal(Rc::new(e), Rc::new(a))
        .unwrap();
}

#[test]
fn test_basic_equality_and_column_order_irrelevance() {
    let e = make_table(
        "T",
        &[("A", DataType::Integer), ("B", DataType::Varchar)],
        vec![
            vec![Value::Int(1), Value::from("x")],
            vec![Value::Int(2), Value::from("y")],
        ],
    );
    let same = make_table(
        "T",
        &[("A", DataType::Integer), ("B", DataType::Varchar)],
        vec![
            vec![Value::Int(1), Value::from("x")],
            vec![Value::Int(2), Value::from("y")],
        ],
    );
    assert_tables_equal(&e, &same).unwrap();
    let permuted = make_table(
        "T",
        &[("B", DataType::Varchar), ("A", DataType::Integer)],
        vec![
            vec![Value::from("x"), Value::Int(1)],
            vec![Value::from("y"), Value::Int(2)],
        ],
    );
    assert_tables_equal(&e, &permuted).unwrap();
    assert_tables_equal(&permuted, &e).unwrap();
}

#[test]
fn test_row_count_mismatch() {
    let e = make_table(
        "T",
        &[("A", DataType::Integer), ("B", DataType::Varchar)],
        vec![
            vec![Value::Int(1), Value::from("x")],
            vec![Value::Int(2), Value::from("y")],
        ],
    );
    let a = make_table(
        "T",
        &[("A", DataType::Integer), ("B", DataType::Varchar)],
        vec![vec![Value::Int(1), Value::from("x")]],
    );
    match assert_tables_equal(&e, &a) {
        Err(Error::Comparison(f)) => {
            assert_eq!(f.kind, FailureKind::RowCount { table: "T".to_string() });
            assert_eq!(f.expected, "2");
            assert_eq!(f.actual, "1");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_table_name_mismatch() {
    use crate::dataset::MemoryDataSet;
    let expected = MemoryDataSet::from_memory_tables(
        vec![
            make_table("b", &[("A", DataType::Integer)], vec![]),
            make_table("A", &[("A", DataType::Integer)], vec![]),
        ],
        false,
    )
    .unwrap();
    let actual = MemoryDataSet::from_memory_tables(
        vec![
            make_table("a", &[("A", DataType::Integer)], vec![]),
            make_table("C", &[("A", DataType::Integer)], vec![]),
        ],
        false,
    )
    .unwrap();
    match assert_data_sets_equal(&expected, &actual) {
        Err(Error::Comparison(f)) => {
            assert_eq!(f.kind, FailureKind::TableNames);
            assert_eq!(f.expected, "[A, B]");
            assert_eq!(f.actual, "[A, C]");
            assert_eq!(
                f.to_string(),
                "table names differ: expected [A, B] but was [A, C]"
            );
        }
        other => panic!("unexpected {:?}", other),
    }

    let reordered = MemoryDataSet::from_memory_tables(
        vec![
            make_table("A", &[("A", DataType::Integer)], vec![]),
            make_table("B", &[("A", DataType::Integer)], vec![]),
        ],
        false,
    )
    .unwrap();
    assert_data_sets_equal(&expected, &reordered).unwrap();
}

#[test]
fn test_out_of_range_reals_do_not_compare_equal() {
    let e = make_table("T", &[("N", DataType::BigInt)], vec![vec![Value::Real(1e30)]]);
    let a = make_table("T", &[("N", DataType::BigInt)], vec![vec![Value::Real(5e25)]]);
    assert!(matches!(assert_tables_equal(&e, &a), Err(Error::TypeCast(_))));
}
