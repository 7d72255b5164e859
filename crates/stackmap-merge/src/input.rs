//! Workflow and schema extract formats
//!
//! Both extracts are produced by upstream exporters. Records are validated
//! one at a time so a malformed record is reported by position (and id when
//! known) instead of as an anonymous serde failure.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{MergeError, MergeWarning, Result};

/// One workflow definition. `raw` is the record as read, passed through to
/// the interchange document untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowRecord {
    pub id: String,
    pub name: String,
    pub active: bool,
    pub steps: Vec<Value>,
    pub raw: Value,
}

#[derive(Debug, Deserialize)]
struct RawWorkflow {
    id: Option<Value>,
    name: Option<String>,
    #[serde(default)]
    active: Option<bool>,
    #[serde(default, alias = "steps")]
    nodes: Option<Vec<Value>>,
}

impl WorkflowRecord {
    fn from_value(index: usize, value: Value) -> Result<Self> {
        let record = format!("workflows[{index}]");
        if !value.is_object() {
            return Err(MergeError::malformed(record, "expected an object"));
        }
        let raw: RawWorkflow = serde_json::from_value(value.clone())
            .map_err(|e| MergeError::malformed(&record, e.to_string()))?;

        let id = match raw.id {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::String(_)) => return Err(MergeError::malformed(record, "empty id")),
            Some(_) => {
                return Err(MergeError::malformed(
                    record,
                    "id must be a string or an integer",
                ));
            }
            None => return Err(MergeError::malformed(record, "missing id")),
        };
        let name = match raw.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                return Err(MergeError::malformed(
                    format!("{record} (id {id})"),
                    "missing name",
                ));
            }
        };

        Ok(WorkflowRecord {
            id,
            name,
            active: raw.active.unwrap_or(false),
            steps: raw.nodes.unwrap_or_default(),
            raw: value,
        })
    }
}

/// The workflow extract, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowExtract {
    pub workflows: Vec<WorkflowRecord>,
}

impl WorkflowExtract {
    /// Accepts a bare array of records or an object with a `workflows` array.
    pub fn from_value(value: Value) -> Result<Self> {
        let records = match value {
            Value::Array(records) => records,
            Value::Object(mut map) => match map.remove("workflows") {
                Some(Value::Array(records)) => records,
                Some(_) => {
                    return Err(MergeError::malformed(
                        "workflows",
                        "expected an array of workflows",
                    ));
                }
                None => {
                    return Err(MergeError::malformed(
                        "workflow extract",
                        "object has no `workflows` array",
                    ));
                }
            },
            _ => {
                return Err(MergeError::malformed(
                    "workflow extract",
                    "expected an array or an object",
                ));
            }
        };

        let workflows = records
            .into_iter()
            .enumerate()
            .map(|(i, v)| WorkflowRecord::from_value(i, v))
            .collect::<Result<Vec<_>>>()?;
        Ok(WorkflowExtract { workflows })
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_value(read_json(path)?)
    }
}

/// A catalog table before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRecord {
    pub schema: Option<String>,
    pub name: String,
}

/// A catalog function before normalization. `tables_used` is the bundled
/// per-function dependency list some exporters write instead of pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRecord {
    pub schema: Option<String>,
    pub name: String,
    pub tables_used: Vec<String>,
}

/// A raw function-to-table dependency as reported by the database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyPair {
    #[serde(default)]
    pub function_schema: Option<String>,
    #[serde(default)]
    pub function_name: Option<String>,
    #[serde(default)]
    pub referenced_schema: Option<String>,
    #[serde(default)]
    pub referenced_table: Option<String>,
}

impl DependencyPair {
    pub fn new(function: &str, table: &str) -> Self {
        DependencyPair {
            function_name: Some(function.to_string()),
            referenced_table: Some(table.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTable {
    #[serde(alias = "schema_name", alias = "table_schema")]
    schema: Option<String>,
    #[serde(alias = "table_name")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFunction {
    #[serde(alias = "schema_name", alias = "function_schema")]
    schema: Option<String>,
    #[serde(alias = "function_name")]
    name: Option<String>,
    #[serde(default)]
    tables_used: Option<Vec<String>>,
}

/// The schema extract: table and function catalogs plus dependency pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaExtract {
    pub tables: Vec<TableRecord>,
    pub functions: Vec<FunctionRecord>,
    pub dependencies: Vec<DependencyPair>,
}

impl SchemaExtract {
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Err(MergeError::malformed(
                "schema extract",
                "expected an object",
            ));
        };

        let tables = match map.remove("tables") {
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| parse_table(i, v))
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(MergeError::malformed("tables", "expected an array")),
            None => {
                return Err(MergeError::malformed(
                    "schema extract",
                    "missing `tables` array",
                ));
            }
        };

        let functions = match map.remove("functions") {
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| parse_function(i, v))
                .collect::<Result<Vec<_>>>()?,
            None | Some(Value::Null) => Vec::new(),
            Some(_) => return Err(MergeError::malformed("functions", "expected an array")),
        };

        let dependencies = match map.remove("dependencies") {
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| {
                    serde_json::from_value(v)
                        .map_err(|e| MergeError::malformed(format!("dependencies[{i}]"), e.to_string()))
                })
                .collect::<Result<Vec<_>>>()?,
            None | Some(Value::Null) => Vec::new(),
            Some(_) => {
                return Err(MergeError::malformed(
                    "dependencies",
                    "expected an array",
                ));
            }
        };

        Ok(SchemaExtract {
            tables,
            functions,
            dependencies,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_value(read_json(path)?)
    }
}

fn parse_table(index: usize, value: Value) -> Result<TableRecord> {
    let record = format!("tables[{index}]");
    let raw: RawTable =
        serde_json::from_value(value).map_err(|e| MergeError::malformed(&record, e.to_string()))?;
    match raw.name {
        Some(name) if !name.trim().is_empty() => Ok(TableRecord {
            schema: raw.schema,
            name,
        }),
        _ => Err(MergeError::malformed(record, "missing table name")),
    }
}

fn parse_function(index: usize, value: Value) -> Result<FunctionRecord> {
    let record = format!("functions[{index}]");
    let raw: RawFunction =
        serde_json::from_value(value).map_err(|e| MergeError::malformed(&record, e.to_string()))?;
    match raw.name {
        Some(name) if !name.trim().is_empty() => Ok(FunctionRecord {
            schema: raw.schema,
            name,
            tables_used: raw.tables_used.unwrap_or_default(),
        }),
        _ => Err(MergeError::malformed(record, "missing function name")),
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => MergeError::MissingInput {
            path: path.to_path_buf(),
        },
        _ => MergeError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    serde_json::from_str(&text).map_err(|source| MergeError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// First candidate that exists on disk.
pub fn locate(candidates: &[PathBuf]) -> Option<&Path> {
    candidates.iter().map(PathBuf::as_path).find(|p| p.is_file())
}

/// Both extracts, read before any merging starts.
#[derive(Debug, Clone, Default)]
pub struct LoadedInputs {
    pub workflows: WorkflowExtract,
    pub schema: SchemaExtract,
    pub workflows_path: Option<PathBuf>,
    pub schema_path: Option<PathBuf>,
    pub warnings: Vec<MergeWarning>,
}

/// Load the workflow and schema extracts from the first existing candidate
/// path of each. A missing extract is fatal unless `allow_missing` is set, in
/// which case it is treated as empty and reported as a warning.
pub fn load_inputs(
    workflow_candidates: &[PathBuf],
    schema_candidates: &[PathBuf],
    allow_missing: bool,
) -> Result<LoadedInputs> {
    let mut loaded = LoadedInputs::default();

    match locate(workflow_candidates) {
        Some(path) => {
            loaded.workflows = WorkflowExtract::load(path)?;
            info!(
                "Loaded {} workflows from {}",
                loaded.workflows.workflows.len(),
                path.display()
            );
            loaded.workflows_path = Some(path.to_path_buf());
        }
        None => loaded
            .warnings
            .push(missing(workflow_candidates, allow_missing)?),
    }

    match locate(schema_candidates) {
        Some(path) => {
            loaded.schema = SchemaExtract::load(path)?;
            info!(
                "Loaded {} tables and {} functions from {}",
                loaded.schema.tables.len(),
                loaded.schema.functions.len(),
                path.display()
            );
            loaded.schema_path = Some(path.to_path_buf());
        }
        None => loaded
            .warnings
            .push(missing(schema_candidates, allow_missing)?),
    }

    Ok(loaded)
}

fn missing(candidates: &[PathBuf], allow_missing: bool) -> Result<MergeWarning> {
    let path = candidates.first().cloned().unwrap_or_default();
    if !allow_missing {
        return Err(MergeError::MissingInput { path });
    }
    warn!("No input found at {}, using an empty extract", path.display());
    Ok(MergeWarning::MissingInput {
        path: path.display().to_string(),
    })
}
