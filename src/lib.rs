//! EDGAR filing HTML parser and XBRL standardization engine.
//!
//! Turns a raw SEC filing document (10-K, 10-Q, 8-K, ...) into a navigable
//! `Document`: a node arena, resolved table matrices, inline-XBRL facts
//! (visible and hidden), and the sections a hybrid detector identified. A
//! separate standardization layer maps the filer-specific XBRL tags on a
//! financial statement onto a canonical concept vocabulary.
//!
//! The pipeline, start to finish:
//!
//! ```text
//! ByteSource -> Tokenizer -> extract_and_strip -> TreeBuilder|StreamingTreeBuilder -> HybridSectionDetector
//! ```
//!
//! [`parse_html`] is the one entry point most callers need; everything else
//! is a building block it assembles.

pub mod builder;
pub mod byte_source;
pub mod config;
pub mod document;
pub mod error;
pub mod html;
pub mod normalize;
pub mod preprocessor;
pub mod sections;
pub mod standardization;
pub mod style;
pub mod table;
pub mod types;

pub use byte_source::ByteSourceInput;
pub use config::{ConfigRegistry, DetectionThresholds, ParserConfig};
pub use document::{parse_html, parse_html_dyn, Document};
pub use error::{ParserError, ParserResult};
pub use sections::SectionCandidate;
pub use standardization::{standardize_statement, ConceptMapper, MapperContext, ReverseIndex, StatementRow, Standardizer, UnmappedTagLogger};
pub use table::TableMatrix;
pub use types::{
    Alignment, Cell, DetectionMethod, DocumentMetadata, FactKind, Node, NodeId, NodeKind, Span, StyleInfo, StyleRef,
    TableClassification, TocLink, XBRLFact,
};
