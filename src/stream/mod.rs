//! The streaming protocol and the producers and consumers built on it.

pub mod consumer;
pub mod flat_dtd;
pub mod flat_xml;
pub mod producer;
pub mod writer;

pub use consumer::{check_row_width, Consumer, Producer, ProtocolEvent, ProtocolState};
pub use flat_dtd::{write_dtd, DtdModel, FlatDtdProducer};
pub use flat_xml::FlatXmlProducer;
pub use producer::DataSetProducer;
pub use writer::{write_flat_xml, FlatXmlWriter};
