//! The interchange document consumed by the display layer
//!
//! Field names are fixed by the display layer and keep the `n8n`/`supabase`
//! naming it expects.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stackmap_core::{Graph, GraphEdge, GraphNode, NodeData, NodeId, NodeKind};
use stackmap_merge::Summary;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Table names in this schema are written bare.
    pub default_schema: String,
    /// Emit the optional `graph` section.
    pub include_graph: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            default_schema: "public".to_string(),
            include_graph: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interchange {
    pub metadata: Metadata,
    /// Raw workflow records, passed through unchanged.
    pub workflows: Vec<Value>,
    pub supabase: CatalogSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph: Option<GraphSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub generated_at: String,
    pub workflow_count: usize,
    pub table_count: usize,
    pub function_count: usize,
    pub tables_used_by_n8n: usize,
    pub functions_used_by_n8n: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSection {
    pub tables: Vec<TableEntry>,
    pub functions: Vec<FunctionEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub name: String,
    pub schema: String,
    pub used_by_n8n: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionEntry {
    pub name: String,
    pub schema: String,
    /// Sorted; bare for the default schema, `schema.name` otherwise.
    pub tables_used: Vec<String>,
    pub used_by_n8n: bool,
    /// The subset of `tables_used` missing from the table catalog.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved_tables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSection {
    pub nodes: Vec<NodeEntry>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
}

impl Interchange {
    /// Pretty-printed JSON with a trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// Build the interchange document. `generated_at` is injected so repeated
/// runs over the same inputs produce identical bytes.
pub fn to_interchange(
    graph: &Graph,
    summary: &Summary,
    workflows_raw: &[Value],
    generated_at: DateTime<Utc>,
    options: &ExportOptions,
) -> Interchange {
    let tables = graph
        .all_nodes()
        .filter_map(|node| match &node.data {
            NodeData::Table(meta) if meta.resolved => Some(TableEntry {
                name: node.name.clone(),
                schema: meta.schema.clone(),
                used_by_n8n: meta.used_by_workflows,
            }),
            _ => None,
        })
        .collect();

    let functions = graph
        .all_nodes()
        .filter_map(|node| match &node.data {
            NodeData::Function(meta) if meta.resolved => {
                let mut tables_used = Vec::new();
                let mut unresolved_tables = Vec::new();
                for table in meta.tables_used.iter().filter_map(|id| graph.node(id)) {
                    let name = relative_name(table, &options.default_schema);
                    if matches!(&table.data, NodeData::Table(t) if !t.resolved) {
                        unresolved_tables.push(name.clone());
                    }
                    tables_used.push(name);
                }
                tables_used.sort();
                unresolved_tables.sort();
                Some(FunctionEntry {
                    name: node.name.clone(),
                    schema: meta.schema.clone(),
                    tables_used,
                    used_by_n8n: meta.used_by_workflows,
                    unresolved_tables,
                })
            }
            _ => None,
        })
        .collect();

    let graph_section = options.include_graph.then(|| GraphSection {
        nodes: graph
            .all_nodes()
            .map(|node| NodeEntry {
                id: node.id.clone(),
                kind: node.kind(),
                name: node.name.clone(),
            })
            .collect(),
        edges: graph.all_edges().collect(),
    });

    Interchange {
        metadata: Metadata {
            generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            workflow_count: summary.workflow_count,
            table_count: summary.table_count,
            function_count: summary.function_count,
            tables_used_by_n8n: summary.tables_used_by_workflows,
            functions_used_by_n8n: summary.functions_used_by_workflows,
        },
        workflows: workflows_raw.to_vec(),
        supabase: CatalogSection { tables, functions },
        graph: graph_section,
    }
}

fn relative_name(table: &GraphNode, default_schema: &str) -> String {
    match &table.data {
        NodeData::Table(meta) if meta.schema != default_schema => {
            format!("{}.{}", meta.schema, table.name)
        }
        _ => table.name.clone(),
    }
}
