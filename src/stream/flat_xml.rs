//! Produces a dataset from a flat XML document.
//!
//! A flat XML document has one root element. Each child of the root is a row: its element
//! name names the table and its attributes hold the column values. Consecutive rows with the
//! same element name belong to one table; a name that comes back later reopens the table, and
//! the consumer's duplicate policy decides what that means.
//!
//! ```xml
//! <dataset>
//!   <ORDERS ID="1" STATUS="open"/>
//!   <ORDERS ID="2"/>
//!   <ITEMS/>
//! </dataset>
//! ```
//!
//! Without a DTD, the first row of a table fixes its columns. An element without attributes
//! declares a table and adds no row. A column missing from a row reads as `NoValue`.

use std::path::Path;

use pest::iterators::Pair;
use tracing::instrument;

use crate::config::Config;
use crate::dataset::DataSetRef;
use crate::error::{Error, Result};
use crate::metadata::TableMetaData;
use crate::pest::Parser;
use crate::registry::OrderedTableNameMap;
use crate::sql_value::Value;

use super::consumer::{Consumer, Producer};
use super::flat_dtd::DtdModel;

#[derive(Parser)]
#[grammar = "flat_xml.pest"]
struct FlatXmlParser;

fn parse_error(message: impl std::fmt::Display) -> Error {
    Error::Parse {
        source_name: "flat XML",
        message: message.to_string(),
    }
}

fn char_reference(entity: &str) -> Option<char> {
    let code = match entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => entity.strip_prefix('#')?.parse().ok()?,
    };
    char::from_u32(code)
}

/// replaces the predefined entities and character references in `raw`.
pub(crate) fn decode_entities(raw: &str) -> Result<String> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find(';')
            .ok_or_else(|| parse_error(format!("unterminated entity reference in {:?}", raw)))?;
        let entity = &after[..end];
        let decoded = match entity {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "quot" => '"',
            "apos" => '\'',
            _ => char_reference(entity)
                .ok_or_else(|| parse_error(format!("unknown entity &{};", entity)))?,
        };
        out.push(decoded);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// one child element of the root, with its attributes decoded.
struct RowElement {
    name: String,
    attributes: Vec<(String, String)>,
}

impl RowElement {
    fn attribute(&self, column: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(column))
            .map(|(_, v)| v.as_str())
    }
}

fn tag_of(element: Pair<Rule>) -> Result<(Pair<Rule>, Option<Pair<Rule>>)> {
    let mut inner = element.into_inner();
    let tag = inner
        .next()
        .ok_or_else(|| parse_error("element without a tag"))?;
    let content = inner.next();
    if let Some(end) = inner.next() {
        let opened = tag.clone().into_inner().next().map(|p| p.as_str());
        let closed = end.into_inner().next().map(|p| p.as_str());
        if opened != closed {
            return Err(parse_error(format!(
                "end tag {} does not match {}",
                closed.unwrap_or(""),
                opened.unwrap_or("")
            )));
        }
    }
    Ok((tag, content))
}

fn row_element(element: Pair<Rule>) -> Result<RowElement> {
    let (tag, content) = tag_of(element)?;
    let mut name = String::new();
    let mut attributes: Vec<(String, String)> = vec![];
    for p in tag.into_inner() {
        match p.as_rule() {
            Rule::name => name = p.as_str().to_string(),
            Rule::attribute => {
                let mut parts = p.into_inner();
                let attr = parts.next().map(|n| n.as_str().to_string()).unwrap_or_default();
                let raw = parts
                    .next()
                    .and_then(|q| q.into_inner().next())
                    .map(|v| v.as_str())
                    .unwrap_or("");
                if attributes.iter().any(|(n, _)| *n == attr) {
                    tracing::warn!(element = name.as_str(), attribute = attr.as_str(), "repeated attribute ignored");
                    continue;
                }
                attributes.push((attr, decode_entities(raw)?));
            }
            _ => {}
        }
    }
    if let Some(content) = content {
        if content.into_inner().any(|c| c.as_rule() == Rule::element) {
            tracing::warn!(element = name.as_str(), "nested elements in a row are ignored");
        }
    }
    Ok(RowElement { name, attributes })
}

/// streams the tables of a flat XML document.
///
/// The document is held in memory and checked against the grammar in full before the first
/// event, so a malformed document produces no events at all. Rows are then decoded and sent
/// to the consumer one element at a time.
pub struct FlatXmlProducer {
    text: String,
    column_sensing: bool,
    dtd_metadata: bool,
    case_sensitive: bool,
    metadata: Option<DataSetRef>,
}

impl FlatXmlProducer {
    pub fn new(text: impl Into<String>, config: &Config) -> Self {
        FlatXmlProducer {
            text: text.into(),
            column_sensing: config.column_sensing,
            dtd_metadata: config.dtd_metadata,
            case_sensitive: config.case_sensitive_table_names,
            metadata: None,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P, config: &Config) -> Result<Self> {
        Ok(Self::new(std::fs::read_to_string(path)?, config))
    }

    /// takes table metadata from `metadata`, such as a dataset built from a DTD, in place of
    /// any DOCTYPE in the document.
    pub fn with_metadata(mut self, metadata: DataSetRef) -> Self {
        self.metadata = Some(metadata);
        self
    }

    fn declared_tables(&self, doctype: Option<Pair<Rule>>) -> Result<Option<OrderedTableNameMap<TableMetaData>>> {
        let mut declared = OrderedTableNameMap::new(self.case_sensitive);
        if let Some(ds) = &self.metadata {
            for n in ds.table_names()? {
                declared.add(&n, ds.table_meta_data(&n)?)?;
            }
            return Ok(Some(declared));
        }
        let doctype = match doctype {
            Some(d) if self.dtd_metadata => d,
            _ => return Ok(None),
        };
        let mut subset = None;
        for p in doctype.into_inner() {
            match p.as_rule() {
                Rule::internal_subset => subset = Some(p.as_str()),
                Rule::external_id => {
                    tracing::debug!(id = p.as_str(), "external DTD is not loaded")
                }
                _ => {}
            }
        }
        match subset {
            Some(s) if !s.trim().is_empty() => {
                for t in DtdModel::parse(s)?.table_meta_data()? {
                    let name = t.table_name().to_string();
                    declared.add(&name, t)?;
                }
                Ok(Some(declared))
            }
            _ => Ok(None),
        }
    }

    fn start_meta_data(
        row: &RowElement,
        declared: Option<&OrderedTableNameMap<TableMetaData>>,
    ) -> TableMetaData {
        if let Some(declared) = declared {
            match declared.get(&row.name) {
                Some(meta) => return meta.renamed(row.name.as_str()),
                None => tracing::debug!(table = row.name.as_str(), "table not declared in DTD"),
            }
        }
        let names: Vec<&str> = row.attributes.iter().map(|(n, _)| n.as_str()).collect();
        TableMetaData::with_unknown_columns(row.name.as_str(), &names)
    }
}

impl Producer for FlatXmlProducer {
    #[instrument(skip_all, fields(sensing = self.column_sensing))]
    fn produce(&mut self, consumer: &mut dyn Consumer) -> Result<()> {
        let document = FlatXmlParser::parse(Rule::document, &self.text)
            .map_err(parse_error)?
            .next()
            .ok_or_else(|| parse_error("empty document"))?;
        let mut doctype = None;
        let mut root = None;
        for p in document.into_inner() {
            match p.as_rule() {
                Rule::doctype => doctype = Some(p),
                Rule::element => root = Some(p),
                _ => {}
            }
        }
        let root = root.ok_or_else(|| parse_error("document has no root element"))?;
        let declared = self.declared_tables(doctype)?;

        let (_, content) = tag_of(root)?;
        let children = content
            .into_iter()
            .flat_map(|c| c.into_inner())
            .filter(|p| p.as_rule() == Rule::element);

        consumer.start_data_set()?;
        let mut open: Option<TableMetaData> = None;
        for child in children {
            let row = row_element(child)?;
            let meta = match open.take() {
                Some(m) if m.table_name() == row.name => m,
                previous => {
                    if previous.is_some() {
                        consumer.end_table()?;
                    }
                    let m = Self::start_meta_data(&row, declared.as_ref());
                    consumer.start_table(&m)?;
                    m
                }
            };
            let meta = open.insert(meta);
            if row.attributes.is_empty() {
                continue;
            }

            let extra: Vec<&str> = row
                .attributes
                .iter()
                .map(|(n, _)| n.as_str())
                .filter(|n| meta.find_column(n).is_none())
                .collect();
            if !extra.is_empty() {
                if self.column_sensing {
                    let widened =
                        meta.merge(&TableMetaData::with_unknown_columns(row.name.as_str(), &extra));
                    consumer.widen_table(&widened)?;
                    *meta = widened;
                } else {
                    tracing::warn!(
                        table = row.name.as_str(),
                        columns = ?extra,
                        "ignoring attributes not among the table's columns"
                    );
                }
            }

            let values: Vec<Value> = meta
                .columns()
                .iter()
                .map(|c| match row.attribute(c.name()) {
                    Some(v) => Value::Text(v.to_string()),
                    None => Value::NoValue,
                })
                .collect();
            consumer.row(&values)?;
        }
        if open.is_some() {
            consumer.end_table()?;
        }
        consumer.end_data_set()
    }
}

#[cfg(test)]
fn load(xml: &str, config: &Config) -> Result<crate::dataset::CachedDataSet> {
    let mut producer = FlatXmlProducer::new(xml, config);
    crate::dataset::CachedDataSet::from_producer(&mut producer, config)
}

#[test]
fn test_decode_entities() {
    assert_eq!(decode_entities("a &lt;&amp;&gt; b").unwrap(), "a <&> b");
    assert_eq!(decode_entities("&#65;&#x42;&apos;&quot;").unwrap(), "AB'\"");
    assert!(decode_entities("&bogus;").is_err());
    assert!(decode_entities("a & b").is_err());
}

#[test]
fn test_rows_and_missing_attributes() {
    use crate::table_traits::DataSet;
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- fixture -->
<dataset>
    <ORDERS ID="1" STATUS="open"/>
    <ORDERS ID="2"/>
    <ITEMS SKU='a&amp;b'></ITEMS>
    <EMPTY/>
</dataset>
"#;
    let ds = load(xml, &Config::default()).unwrap();
    assert_eq!(ds.table_names().unwrap(), vec!["ORDERS", "ITEMS", "EMPTY"]);
    let orders = ds.table("ORDERS").unwrap();
    assert_eq!(orders.table_meta_data().column_names(), vec!["ID", "STATUS"]);
    assert_eq!(orders.row_count().unwrap(), 2);
    assert_eq!(orders.value(1, "STATUS").unwrap(), Value::NoValue);
    assert_eq!(ds.table("ITEMS").unwrap().value(0, "SKU").unwrap(), Value::from("a&b"));
    let empty = ds.table("EMPTY").unwrap();
    assert_eq!(empty.row_count().unwrap(), 0);
    assert!(empty.table_meta_data().columns().is_empty());
}

#[test]
fn test_extra_attributes_without_and_with_sensing() {
    use crate::table_traits::DataSet;
    let xml = r#"<dataset><T A="1"/><T A="2" B="x"/><T B="y"/></dataset>"#;

    let plain = load(xml, &Config::default()).unwrap();
    let t = plain.table("T").unwrap();
    assert_eq!(t.table_meta_data().column_names(), vec!["A"]);
    assert_eq!(t.row_count().unwrap(), 3);
    assert_eq!(t.value(2, "A").unwrap(), Value::NoValue);

    let sensing = load(xml, &Config::default().with_column_sensing(true)).unwrap();
    let t = sensing.table("T").unwrap();
    assert_eq!(t.table_meta_data().column_names(), vec!["A", "B"]);
    assert_eq!(t.value(0, "B").unwrap(), Value::NoValue);
    assert_eq!(t.value(1, "B").unwrap(), Value::from("x"));
    assert_eq!(t.value(2, "A").unwrap(), Value::NoValue);
}

#[test]
fn test_doctype_internal_subset_gives_columns() {
    use crate::table_traits::DataSet;
    let xml = r#"<?xml version="1.0"?>
<!DOCTYPE dataset [
    <!ELEMENT dataset (T*, U*)>
    <!ELEMENT T EMPTY>
    <!ATTLIST T A CDATA #REQUIRED B CDATA #IMPLIED>
    <!ELEMENT U EMPTY>
]>
<dataset>
    <T B="b"/>
</dataset>"#;
    let ds = load(xml, &Config::default()).unwrap();
    let t = ds.table("T").unwrap();
    assert_eq!(t.table_meta_data().column_names(), vec!["A", "B"]);
    assert_eq!(t.value(0, "A").unwrap(), Value::NoValue);
    assert_eq!(t.value(0, "B").unwrap(), Value::from("b"));

    let ds = load(xml, &Config::default().with_dtd_metadata(false)).unwrap();
    let t = ds.table("T").unwrap();
    assert_eq!(t.table_meta_data().column_names(), vec!["B"]);
}

#[test]
fn test_explicit_metadata_data_set() {
    use crate::table_traits::DataSet;
    use std::rc::Rc;
    let config = Config::default();
    let mut dtd = super::flat_dtd::FlatDtdProducer::new(
        "<!ELEMENT dataset (T*)><!ELEMENT T EMPTY><!ATTLIST T X CDATA #IMPLIED Y CDATA #IMPLIED>",
    );
    let metadata = crate::dataset::CachedDataSet::from_producer(&mut dtd, &config).unwrap();
    let mut producer = FlatXmlProducer::new(r#"<dataset><T Y="1"/></dataset>"#, &config)
        .with_metadata(Rc::new(metadata));
    let ds = crate::dataset::CachedDataSet::from_producer(&mut producer, &config).unwrap();
    assert_eq!(ds.table("T").unwrap().table_meta_data().column_names(), vec!["X", "Y"]);
}

#[test]
fn test_repeated_table_reopens() {
    use crate::table_traits::DataSet;
    let xml = r#"<dataset><T A="1"/><U/><T A="2"/></dataset>"#;
    let ds = load(xml, &Config::default()).unwrap();
    assert_eq!(ds.table_names().unwrap(), vec!["T", "U"]);
    assert_eq!(ds.table("T").unwrap().row_count().unwrap(), 2);

    let reject = Config::default()
        .with_duplicate_tables(crate::config::DuplicateTablePolicy::Reject);
    assert!(matches!(load(xml, &reject), Err(Error::AmbiguousTableName(_))));
}

#[test]
fn test_malformed_document() {
    let err = load("<dataset><T A='1'></dataset>", &Config::default());
    assert!(matches!(err, Err(Error::Parse { .. })));
    let err = load("<dataset><T A='1'/>", &Config::default());
    assert!(matches!(err, Err(Error::Parse { .. })));
    let err = load("<dataset><T A='1'></U></dataset>", &Config::default());
    assert!(matches!(err, Err(Error::Parse { .. })));
}

#[cfg(test)]
#[derive(Default)]
struct EventLog {
    events: Vec<String>,
}

#[cfg(test)]
impl Consumer for EventLog {
    fn start_data_set(&mut self) -> Result<()> {
        self.events.push(String::from("start"));
        Ok(())
    }

    fn end_data_set(&mut self) -> Result<()> {
        self.events.push(String::from("end"));
        Ok(())
    }

    fn start_table(&mut self, meta: &TableMetaData) -> Result<()> {
        self.events.push(format!("table {}", meta.table_name()));
        Ok(())
    }

    fn end_table(&mut self) -> Result<()> {
        self.events.push(String::from("end table"));
        Ok(())
    }

    fn row(&mut self, values: &[Value]) -> Result<()> {
        self.events.push(format!("row {}", values.len()));
        Ok(())
    }

    fn widen_table(&mut self, meta: &TableMetaData) -> Result<()> {
        self.events.push(format!("widen {}", meta.columns().len()));
        Ok(())
    }
}

#[test]
fn test_rows_are_sent_as_they_are_decoded() {
    let mut log = EventLog::default();
    let xml = r#"<dataset><T A="1"/><T A="&bogus;"/></dataset>"#;
    let mut producer = FlatXmlProducer::new(xml, &Config::default());
    assert!(matches!(producer.produce(&mut log), Err(Error::Parse { .. })));
    assert_eq!(log.events, vec!["start", "table T", "row 1"]);

    let mut log = EventLog::default();
    let mut producer = FlatXmlProducer::new("<dataset><T A='1'>", &Config::default());
    assert!(producer.produce(&mut log).is_err());
    assert!(log.events.is_empty());
}
