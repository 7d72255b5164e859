//! Interchange document and markdown report for a merged stack

pub mod error;
pub mod interchange;
pub mod markdown;
pub mod write;


pub use error::{ExportError, Result};
pub use interchange::{
    to_interchange, CatalogSection, ExportOptions, FunctionEntry, GraphSection, Interchange,
    Metadata, NodeEntry, TableEntry,
};
pub use markdown::to_markdown_report;
pub use write::{write_atomic, write_outputs, Outputs};
