//! Extract loading, reference extraction, dependency resolution, and merging

pub mod config;
pub mod error;
pub mod extractor;
pub mod input;
pub mod merger;
pub mod resolver;
pub mod steps;


#[cfg(test)]
pub mod test_utils;

pub use config::{StackmapConfig, CONFIG_FILE};
pub use error::{MergeError, MergeWarning, Result};
pub use extractor::{extract_references, Extraction, ExtractionStats, ResourceRef};
pub use input::{
    load_inputs, DependencyPair, FunctionRecord, LoadedInputs, SchemaExtract, TableRecord,
    WorkflowExtract, WorkflowRecord,
};
pub use merger::{merge, merge_extracts, MergeOptions, MergeOutput, Summary};
pub use resolver::{
    find_orphan_tables, normalize_name, normalize_ref, resolve_function_dependencies,
    FunctionDependencies, FunctionEntry, TableTarget,
};
