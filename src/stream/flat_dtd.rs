//! Reads and writes the DTD form of a dataset's metadata.
//!
//! The first `ELEMENT` declaration is the dataset root. The element names listed in its
//! content model are the tables, in that order; when the root is declared `EMPTY` or `ANY`,
//! every other declared element is a table. Each table's `ATTLIST` gives its columns:
//! `#REQUIRED` attributes cannot be null, while `#IMPLIED`, `#FIXED` and defaulted
//! attributes can, the latter two carrying their default value.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use pest::iterators::Pair;
use tracing::instrument;

use crate::error::{Error, Result};
use crate::metadata::{Column, Nullable, TableMetaData};
use crate::pest::Parser;
use crate::sql_type::DataType;
use crate::table_traits::DataSet;

use super::consumer::{Consumer, Producer};
use super::flat_xml::decode_entities;
use super::writer::escape;

#[derive(Parser)]
#[grammar = "flat_dtd.pest"]
struct DtdParser;

#[derive(Debug, Clone, PartialEq)]
enum ContentModel {
    Empty,
    Any,
    Children(Vec<String>),
}

#[derive(Debug, Clone)]
struct ElementDecl {
    name: String,
    content: ContentModel,
}

/// the `ELEMENT` and `ATTLIST` declarations of one DTD.
#[derive(Debug, Default)]
pub struct DtdModel {
    elements: Vec<ElementDecl>,
    attributes: HashMap<String, Vec<Column>>,
}

fn parse_error(e: impl std::fmt::Display) -> Error {
    Error::Parse {
        source_name: "DTD",
        message: e.to_string(),
    }
}

fn quoted_text(pair: Pair<Rule>) -> Result<String> {
    let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
    decode_entities(raw)
}

fn collect_names(group: Pair<Rule>, names: &mut Vec<String>) {
    for particle in group.into_inner() {
        for inner in particle.into_inner() {
            match inner.as_rule() {
                Rule::name => {
                    let n = inner.as_str().to_string();
                    if !names.contains(&n) {
                        names.push(n);
                    }
                }
                Rule::group => collect_names(inner, names),
                _ => {}
            }
        }
    }
}

fn element_decl(pair: Pair<Rule>) -> Result<ElementDecl> {
    let mut inner = pair.into_inner();
    let name = inner
        .next()
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| parse_error("ELEMENT declaration without a name"))?;
    let spec = inner
        .next()
        .and_then(|p| p.into_inner().next())
        .ok_or_else(|| parse_error(format!("ELEMENT {} has no content model", name)))?;
    let content = match spec.as_rule() {
        Rule::empty => ContentModel::Empty,
        Rule::any => ContentModel::Any,
        _ => {
            let mut names = vec![];
            collect_names(spec, &mut names);
            ContentModel::Children(names)
        }
    };
    Ok(ElementDecl { name, content })
}

fn attribute_def(pair: Pair<Rule>) -> Result<Column> {
    let mut name = String::new();
    let mut column = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::name => name = p.as_str().to_string(),
            Rule::default_decl => {
                let decl = p
                    .into_inner()
                    .next()
                    .ok_or_else(|| parse_error("empty attribute default"))?;
                let c = Column::new(name.as_str(), DataType::Unknown);
                column = Some(match decl.as_rule() {
                    Rule::required => c.nullable(Nullable::NoNulls),
                    Rule::implied => c.nullable(Nullable::Nullable),
                    Rule::fixed => {
                        let value = match decl.into_inner().next() {
                            Some(q) => quoted_text(q)?,
                            None => String::new(),
                        };
                        c.nullable(Nullable::Nullable).default_value(value)
                    }
                    _ => c.nullable(Nullable::Nullable).default_value(quoted_text(decl)?),
                });
            }
            _ => {}
        }
    }
    column.ok_or_else(|| parse_error(format!("attribute {} has no default declaration", name)))
}

impl DtdModel {
    pub fn parse(text: &str) -> Result<DtdModel> {
        let dtd = DtdParser::parse(Rule::dtd, text)
            .map_err(parse_error)?
            .next()
            .ok_or_else(|| parse_error("empty parse"))?;
        let mut model = DtdModel::default();
        for decl in dtd.into_inner() {
            match decl.as_rule() {
                Rule::element_decl => model.elements.push(element_decl(decl)?),
                Rule::attlist_decl => {
                    let mut inner = decl.into_inner();
                    let element = inner
                        .next()
                        .map(|p| p.as_str().to_string())
                        .ok_or_else(|| parse_error("ATTLIST without an element name"))?;
                    let columns = model.attributes.entry(element).or_default();
                    for def in inner {
                        columns.push(attribute_def(def)?);
                    }
                }
                _ => {}
            }
        }
        Ok(model)
    }

    pub fn root_name(&self) -> Option<&str> {
        self.elements.first().map(|e| e.name.as_str())
    }

    /// returns the metadata of every table, in the order the root element lists them.
    pub fn table_meta_data(&self) -> Result<Vec<TableMetaData>> {
        let root = match self.elements.first() {
            Some(r) => r,
            None => return Ok(vec![]),
        };
        let names: Vec<String> = match &root.content {
            ContentModel::Children(names) => names.clone(),
            ContentModel::Empty | ContentModel::Any => self.elements[1..]
                .iter()
                .map(|e| e.name.clone())
                .collect(),
        };
        names
            .iter()
            .map(|n| {
                if !self.elements.iter().any(|e| &e.name == n) {
                    return Err(Error::MissingDeclaration(n.clone()));
                }
                let columns = self.attributes.get(n).cloned().unwrap_or_default();
                Ok(TableMetaData::new(n.as_str(), columns))
            })
            .collect()
    }
}

/// streams the tables a DTD declares, each without rows.
pub struct FlatDtdProducer {
    text: String,
}

impl FlatDtdProducer {
    pub fn new(text: impl Into<String>) -> Self {
        FlatDtdProducer { text: text.into() }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(std::fs::read_to_string(path)?))
    }
}

impl Producer for FlatDtdProducer {
    #[instrument(skip_all)]
    fn produce(&mut self, consumer: &mut dyn Consumer) -> Result<()> {
        let tables = DtdModel::parse(&self.text)?.table_meta_data()?;
        tracing::debug!(tables = tables.len(), "DTD parsed");
        consumer.start_data_set()?;
        for t in &tables {
            consumer.start_table(t)?;
            consumer.end_table()?;
        }
        consumer.end_data_set()
    }
}

/// writes a DTD describing the tables of `data_set`, under a root element named `dataset`.
pub fn write_dtd<W: Write>(data_set: &dyn DataSet, out: &mut W) -> Result<()> {
    let names = data_set.table_names()?;
    if names.is_empty() {
        writeln!(out, "<!ELEMENT dataset EMPTY>")?;
        return Ok(());
    }
    writeln!(out, "<!ELEMENT dataset (")?;
    for (i, n) in names.iter().enumerate() {
        let sep = if i + 1 == names.len() { ")>" } else { "," };
        writeln!(out, "    {}*{}", n, sep)?;
    }
    for n in &names {
        let meta = data_set.table_meta_data(n)?;
        writeln!(out)?;
        writeln!(out, "<!ELEMENT {} EMPTY>", n)?;
        writeln!(out, "<!ATTLIST {}", n)?;
        for c in meta.columns() {
            let default = match (c.nullability(), c.default()) {
                (_, Some(d)) => format!("\"{}\"", escape(d)),
                (Nullable::NoNulls, None) => String::from("#REQUIRED"),
                _ => String::from("#IMPLIED"),
            };
            writeln!(out, "    {} CDATA {}", c.name(), default)?;
        }
        writeln!(out, ">")?;
    }
    Ok(())
}

#[cfg(test)]
const SAMPLE: &str = r#"
<!-- orders fixture -->
<!ELEMENT dataset (ORDERS*, (ITEMS | NOTES)*)>
<!ELEMENT ORDERS EMPTY>
<!ATTLIST ORDERS
    ID CDATA #REQUIRED
    STATUS (open|closed) "open"
    NOTE CDATA #IMPLIED
>
<!ELEMENT ITEMS EMPTY>
<!ATTLIST ITEMS ORDER_ID CDATA #REQUIRED>
<!ATTLIST ITEMS SKU CDATA #FIXED 'a&amp;b'>
<!ELEMENT NOTES EMPTY>
<!ENTITY copy "&#169;">
"#;

#[test]
fn test_parse_dtd_tables_and_columns() {
    let tables = DtdModel::parse(SAMPLE).unwrap().table_meta_data().unwrap();
    let names: Vec<&str> = tables.iter().map(|t| t.table_name()).collect();
    assert_eq!(names, vec!["ORDERS", "ITEMS", "NOTES"]);

    let orders = &tables[0];
    assert_eq!(orders.column_names(), vec!["ID", "STATUS", "NOTE"]);
    assert_eq!(orders.columns()[0].nullability(), Nullable::NoNulls);
    assert_eq!(orders.columns()[1].default(), Some("open"));
    assert_eq!(orders.columns()[2].nullability(), Nullable::Nullable);
    assert_eq!(orders.columns()[0].data_type(), DataType::Unknown);

    let items = &tables[1];
    assert_eq!(items.column_names(), vec!["ORDER_ID", "SKU"]);
    assert_eq!(items.columns()[1].default(), Some("a&b"));
    assert!(tables[2].columns().is_empty());
}

#[test]
fn test_undeclared_table_is_missing_declaration() {
    let dtd = "<!ELEMENT dataset (A*, B*)>\n<!ELEMENT A EMPTY>";
    let err = DtdModel::parse(dtd).unwrap().table_meta_data().unwrap_err();
    assert!(matches!(err, Error::MissingDeclaration(ref n) if n == "B"));
}

#[test]
fn test_root_without_content_model_lists_all_elements() {
    let dtd = "<!ELEMENT dataset ANY><!ELEMENT A EMPTY><!ELEMENT B EMPTY>";
    let tables = DtdModel::parse(dtd).unwrap().table_meta_data().unwrap();
    assert_eq!(tables.len(), 2);
    assert!(DtdModel::parse("<!ELEMENT broken").is_err());
}

#[test]
fn test_write_dtd_reads_back() {
    use crate::dataset::MemoryDataSet;
    use crate::table::MemoryTable;
    let a = TableMetaData::new(
        "A",
        vec![
            Column::new("ID", DataType::Integer).nullable(Nullable::NoNulls),
            Column::new("NAME", DataType::Varchar).nullable(Nullable::Nullable),
            Column::new("KIND", DataType::Varchar).default_value("x<y"),
        ],
    );
    let b = TableMetaData::new("B", vec![Column::new("V", DataType::Varchar)]);
    let ds = MemoryDataSet::from_memory_tables(
        vec![MemoryTable::new(a), MemoryTable::new(b)],
        false,
    )
    .unwrap();
    let mut out = vec![];
    write_dtd(&ds, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("<!ELEMENT dataset (\n    A*,\n    B*)>\n"));

    let tables = DtdModel::parse(&text).unwrap().table_meta_data().unwrap();
    assert_eq!(tables[0].column_names(), vec!["ID", "NAME", "KIND"]);
    assert_eq!(tables[0].columns()[0].nullability(), Nullable::NoNulls);
    assert_eq!(tables[0].columns()[1].nullability(), Nullable::Nullable);
    assert_eq!(tables[0].columns()[2].default(), Some("x<y"));
    assert_eq!(tables[1].columns()[0].nullability(), Nullable::Nullable);
}

#[test]
fn test_dtd_producer_feeds_cached_data_set() {
    use crate::config::Config;
    use crate::dataset::CachedDataSet;
    let mut producer = FlatDtdProducer::new(SAMPLE);
    let ds = CachedDataSet::from_producer(&mut producer, &Config::default()).unwrap();
    assert_eq!(ds.table_names().unwrap(), vec!["ORDERS", "ITEMS", "NOTES"]);
    assert_eq!(ds.table("ORDERS").unwrap().row_count().unwrap(), 0);
}
