//! Core data structures for the stack dependency graph

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unique, stable identifier for a node: `<kind prefix>:<qualified name>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(kind: NodeKind, qualified_name: &str) -> Self {
        NodeId(format!("{}:{}", kind.prefix(), qualified_name))
    }

    pub fn workflow(source_id: &str) -> Self {
        Self::new(NodeKind::Workflow, source_id)
    }

    pub fn table(name: &QualifiedName) -> Self {
        Self::new(NodeKind::Table, &name.to_string())
    }

    pub fn function(name: &QualifiedName) -> Self {
        Self::new(NodeKind::Function, &name.to_string())
    }

    pub fn external(provider: Provider, identifier: &str) -> Self {
        Self::new(
            NodeKind::ExternalResource,
            &format!("{}:{}", provider.tag(), identifier),
        )
    }

    /// Synthetic id of the group node standing in for a collapsed kind.
    pub fn group(kind: NodeKind) -> Self {
        NodeId(format!("group:{}", kind.prefix()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(raw: &str) -> Self {
        NodeId(raw.to_string())
    }
}

impl From<String> for NodeId {
    fn from(raw: String) -> Self {
        NodeId(raw)
    }
}

/// Discriminates what kind of entity a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Workflow,
    Table,
    Function,
    ExternalResource,
}

impl NodeKind {
    pub const ALL: [NodeKind; 4] = [
        NodeKind::Workflow,
        NodeKind::Table,
        NodeKind::Function,
        NodeKind::ExternalResource,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            NodeKind::Workflow => "workflow",
            NodeKind::Table => "table",
            NodeKind::Function => "function",
            NodeKind::ExternalResource => "external",
        }
    }

    /// Plural heading used for category grouping and reports.
    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Workflow => "Workflows",
            NodeKind::Table => "Tables",
            NodeKind::Function => "Functions",
            NodeKind::ExternalResource => "External resources",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "workflow" | "workflows" => Ok(NodeKind::Workflow),
            "table" | "tables" => Ok(NodeKind::Table),
            "function" | "functions" => Ok(NodeKind::Function),
            "external" | "external_resource" | "externals" => Ok(NodeKind::ExternalResource),
            other => Err(format!("unknown node kind '{other}'")),
        }
    }
}

/// Third-party services a workflow step can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Notion,
    BigQuery,
    Microsoft,
    Google,
    OpenAI,
}

impl Provider {
    pub fn tag(self) -> &'static str {
        match self {
            Provider::Notion => "notion",
            Provider::BigQuery => "bigquery",
            Provider::Microsoft => "microsoft",
            Provider::Google => "google",
            Provider::OpenAI => "openai",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::Notion => "Notion",
            Provider::BigQuery => "BigQuery",
            Provider::Microsoft => "Microsoft",
            Provider::Google => "Google",
            Provider::OpenAI => "OpenAI",
        };
        f.write_str(name)
    }
}

/// A schema-qualified database object name after normalization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub schema: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        QualifiedName {
            schema: schema.into(),
            name: name.into(),
        }
    }

    /// Bare name when in `default_schema`, `schema.name` otherwise.
    pub fn relative_to(&self, default_schema: &str) -> String {
        if self.schema == default_schema {
            self.name.clone()
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// A database object name as written by an upstream source, schema optional.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NameRef {
    pub schema: Option<String>,
    pub name: String,
}

impl NameRef {
    pub fn bare(name: impl Into<String>) -> Self {
        NameRef {
            schema: None,
            name: name.into(),
        }
    }

    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        NameRef {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for NameRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A single node in the stack graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    /// Human-facing name, matched by text filtering.
    pub name: String,
    pub qualified_name: String,
    pub data: NodeData,
}

impl GraphNode {
    pub fn workflow(source_id: &str, name: &str, active: bool) -> Self {
        GraphNode {
            id: NodeId::workflow(source_id),
            name: name.to_string(),
            qualified_name: source_id.to_string(),
            data: NodeData::Workflow(WorkflowMeta {
                source_id: source_id.to_string(),
                active,
            }),
        }
    }

    pub fn table(name: &QualifiedName, resolved: bool) -> Self {
        GraphNode {
            id: NodeId::table(name),
            name: name.name.clone(),
            qualified_name: name.to_string(),
            data: NodeData::Table(TableMeta {
                schema: name.schema.clone(),
                used_by_workflows: false,
                resolved,
            }),
        }
    }

    pub fn function(name: &QualifiedName, resolved: bool) -> Self {
        GraphNode {
            id: NodeId::function(name),
            name: name.name.clone(),
            qualified_name: name.to_string(),
            data: NodeData::Function(FunctionMeta {
                schema: name.schema.clone(),
                tables_used: BTreeSet::new(),
                used_by_workflows: false,
                resolved,
            }),
        }
    }

    pub fn external(provider: Provider, identifier: &str) -> Self {
        GraphNode {
            id: NodeId::external(provider, identifier),
            name: format!("{provider}: {identifier}"),
            qualified_name: format!("{}:{}", provider.tag(), identifier),
            data: NodeData::ExternalResource(ExternalMeta {
                provider,
                identifier: identifier.to_string(),
            }),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self.data {
            NodeData::Workflow(_) => NodeKind::Workflow,
            NodeData::Table(_) => NodeKind::Table,
            NodeData::Function(_) => NodeKind::Function,
            NodeData::ExternalResource(_) => NodeKind::ExternalResource,
        }
    }

    /// Whether a workflow depends on this node. Workflows and external
    /// resources report `None`: the flag only exists for database objects.
    pub fn used_by_workflows(&self) -> Option<bool> {
        match &self.data {
            NodeData::Table(meta) => Some(meta.used_by_workflows),
            NodeData::Function(meta) => Some(meta.used_by_workflows),
            _ => None,
        }
    }
}

/// Kind-specific node metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeData {
    Workflow(WorkflowMeta),
    Table(TableMeta),
    Function(FunctionMeta),
    ExternalResource(ExternalMeta),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMeta {
    pub source_id: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMeta {
    pub schema: String,
    pub used_by_workflows: bool,
    /// False for placeholder tables referenced but absent from the catalog.
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionMeta {
    pub schema: String,
    /// Exactly the targets of this function's `FunctionReads` edges.
    pub tables_used: BTreeSet<NodeId>,
    pub used_by_workflows: bool,
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalMeta {
    pub provider: Provider,
    pub identifier: String,
}

/// What kind of relationship this edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Workflow → Table | Function | ExternalResource
    WorkflowUses,
    /// Function → Table
    FunctionReads,
}

/// A directed edge in the stack graph. Unique per (source, target, kind).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
}

/// A summary edge shown when categories are collapsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedEdge {
    /// The visible (possibly collapsed) source node.
    pub source: NodeId,
    /// The visible (possibly collapsed) target node.
    pub target: NodeId,
    /// How many underlying edges this represents.
    pub count: u32,
    /// Breakdown by edge kind.
    pub kind_counts: BTreeMap<EdgeKind, u32>,
}
