//! Build the stack graph from both extracts

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use serde_json::Value;
use stackmap_core::{
    EdgeKind, Graph, GraphError, GraphNode, NameRef, NameTable, NodeData, NodeId, NodeKind,
};
use tracing::{debug, info, warn};

use crate::error::{MergeError, MergeWarning, Result};
use crate::extractor::{extract_references, ExtractionStats, ResourceRef};
use crate::input::{
    DependencyPair, FunctionRecord, SchemaExtract, TableRecord, WorkflowExtract, WorkflowRecord,
};
use crate::resolver::{
    find_orphan_tables, lookup, normalize_name, normalize_ref, resolve_function_dependencies,
    schema_allowed,
};

/// Options for a merge run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// Schema assumed for unqualified names.
    pub default_schema: String,
    /// When non-empty, catalog objects outside these schemas are ignored.
    pub schemas: Vec<String>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeOptions {
            default_schema: "public".to_string(),
            schemas: Vec::new(),
        }
    }
}

/// Headline numbers for a merge. Counts cover catalog objects only;
/// unresolved placeholders are excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub workflow_count: usize,
    pub table_count: usize,
    pub function_count: usize,
    pub tables_used_by_workflows: usize,
    pub functions_used_by_workflows: usize,
    pub external_resource_count: usize,
    pub unresolved_count: usize,
    pub steps: ExtractionStats,
    pub orphan_tables: BTreeSet<NodeId>,
}

#[derive(Debug, Clone)]
pub struct MergeOutput {
    pub graph: Graph,
    pub summary: Summary,
    pub warnings: Vec<MergeWarning>,
    /// Raw workflow records, deduplicated by id, in input order.
    pub workflows_raw: Vec<Value>,
}

/// Merge two loaded extracts.
pub fn merge_extracts(
    workflows: &WorkflowExtract,
    schema: &SchemaExtract,
    options: &MergeOptions,
) -> Result<MergeOutput> {
    merge(
        &workflows.workflows,
        &schema.tables,
        &schema.functions,
        &schema.dependencies,
        options,
    )
}

/// Build the unified graph. Deterministic: the same inputs always produce
/// the same node order, edge order and summary.
///
/// Pairs are taken from `dependencies` and from each function's bundled
/// `tables_used` list.
pub fn merge(
    workflows: &[WorkflowRecord],
    tables: &[TableRecord],
    functions: &[FunctionRecord],
    dependencies: &[DependencyPair],
    options: &MergeOptions,
) -> Result<MergeOutput> {
    let mut merger = Merger::new(options);

    let workflows_raw = merger.register_workflows(workflows)?;
    merger.register_catalog(tables, functions)?;

    let pairs: Vec<DependencyPair> = dependencies
        .iter()
        .cloned()
        .chain(bundled_pairs(functions))
        .collect();
    merger.add_function_reads(&pairs)?;
    merger.add_workflow_uses(workflows)?;
    merger.propagate_usage();

    let summary = merger.summary();
    info!(
        "Merged {} workflows, {} tables, {} functions ({} orphan tables, {} warnings)",
        summary.workflow_count,
        summary.table_count,
        summary.function_count,
        summary.orphan_tables.len(),
        merger.warnings.len()
    );
    for warning in &merger.warnings {
        warn!("{warning}");
    }

    Ok(MergeOutput {
        graph: merger.graph,
        summary,
        warnings: merger.warnings,
        workflows_raw,
    })
}

fn bundled_pairs(functions: &[FunctionRecord]) -> impl Iterator<Item = DependencyPair> + '_ {
    functions.iter().flat_map(|function| {
        function.tables_used.iter().map(move |table| DependencyPair {
            function_schema: function.schema.clone(),
            function_name: Some(function.name.clone()),
            referenced_schema: None,
            referenced_table: Some(table.clone()),
        })
    })
}

struct Merger<'a> {
    options: &'a MergeOptions,
    graph: Graph,
    names: NameTable,
    warnings: Vec<MergeWarning>,
    stats: ExtractionStats,
    /// Catalog objects in registration order.
    catalog_tables: Vec<NodeId>,
    catalog_functions: Vec<NodeId>,
}

impl<'a> Merger<'a> {
    fn new(options: &'a MergeOptions) -> Self {
        Merger {
            options,
            graph: Graph::new(),
            names: NameTable::new(),
            warnings: Vec::new(),
            stats: ExtractionStats::default(),
            catalog_tables: Vec::new(),
            catalog_functions: Vec::new(),
        }
    }

    fn register(&mut self, node: GraphNode, record: impl FnOnce() -> String) -> Result<bool> {
        self.graph.add_node(node).map_err(|e| match e {
            GraphError::DuplicateIdentity { detail, .. } => MergeError::DuplicateIdentity {
                record: record(),
                detail,
            },
            other => MergeError::Graph(other),
        })
    }

    fn register_workflows(&mut self, workflows: &[WorkflowRecord]) -> Result<Vec<Value>> {
        let mut raw = Vec::with_capacity(workflows.len());
        for (i, workflow) in workflows.iter().enumerate() {
            let node = GraphNode::workflow(&workflow.id, &workflow.name, workflow.active);
            if self.register(node, || format!("workflows[{i}] (id {})", workflow.id))? {
                raw.push(workflow.raw.clone());
            } else {
                debug!("Workflow {} listed twice, keeping the first", workflow.id);
            }
        }
        Ok(raw)
    }

    fn register_catalog(&mut self, tables: &[TableRecord], functions: &[FunctionRecord]) -> Result<()> {
        let default_schema = self.options.default_schema.as_str();

        for (i, table) in tables.iter().enumerate() {
            let raw = NameRef {
                schema: table.schema.clone(),
                name: table.name.clone(),
            };
            let name = normalize_name(&raw, default_schema)
                .ok_or_else(|| MergeError::malformed(format!("tables[{i}]"), "empty table name"))?;
            if !schema_allowed(&self.options.schemas, &name.schema) {
                continue;
            }
            if self.register(GraphNode::table(&name, true), || format!("tables[{i}] ({name})"))? {
                let id = NodeId::table(&name);
                self.names.insert(NodeKind::Table, &name, id.clone());
                self.catalog_tables.push(id);
            }
        }

        for (i, function) in functions.iter().enumerate() {
            let raw = NameRef {
                schema: function.schema.clone(),
                name: function.name.clone(),
            };
            let name = normalize_name(&raw, default_schema).ok_or_else(|| {
                MergeError::malformed(format!("functions[{i}]"), "empty function name")
            })?;
            if !schema_allowed(&self.options.schemas, &name.schema) {
                continue;
            }
            if self.register(GraphNode::function(&name, true), || {
                format!("functions[{i}] ({name})")
            })? {
                let id = NodeId::function(&name);
                self.names.insert(NodeKind::Function, &name, id.clone());
                self.catalog_functions.push(id);
            }
        }

        Ok(())
    }

    fn add_function_reads(&mut self, pairs: &[DependencyPair]) -> Result<()> {
        let deps = resolve_function_dependencies(
            pairs,
            &self.names,
            &self.options.default_schema,
            &self.options.schemas,
        );
        debug!(
            "Resolved {} function-table pairs across {} functions",
            deps.pair_count(),
            deps.functions.len()
        );

        for entry in &deps.functions {
            if !entry.resolved {
                self.graph.add_node(GraphNode::function(&entry.name, false))?;
            }
            for table in &entry.tables {
                if !table.resolved {
                    self.graph.add_node(GraphNode::table(&table.name, false))?;
                }
                self.graph
                    .add_edge(&entry.id, &table.id, EdgeKind::FunctionReads)?;
            }
        }
        self.warnings.extend(deps.warnings);
        Ok(())
    }

    fn add_workflow_uses(&mut self, workflows: &[WorkflowRecord]) -> Result<()> {
        let mut seen = HashSet::new();
        for workflow in workflows {
            if !seen.insert(workflow.id.as_str()) {
                continue;
            }
            let extraction = extract_references(workflow);
            self.stats += extraction.stats;

            let source = NodeId::workflow(&workflow.id);
            for reference in &extraction.references {
                let Some(target) = self.target_for(&workflow.id, reference)? else {
                    continue;
                };
                self.graph.add_edge(&source, &target, EdgeKind::WorkflowUses)?;
            }
        }
        Ok(())
    }

    /// Node id for a reference, registering external resources and
    /// unresolved placeholders as needed.
    fn target_for(&mut self, workflow: &str, reference: &ResourceRef) -> Result<Option<NodeId>> {
        let (kind, name) = match reference {
            ResourceRef::External {
                provider,
                identifier,
            } => {
                let node = GraphNode::external(*provider, identifier);
                let id = node.id.clone();
                self.graph.add_node(node)?;
                return Ok(Some(id));
            }
            ResourceRef::Table(name) => (NodeKind::Table, name),
            ResourceRef::Function(name) => (NodeKind::Function, name),
        };

        let Some(normalized) = normalize_ref(name) else {
            return Ok(None);
        };
        let (qualified, resolved) =
            lookup(&self.names, kind, &normalized, &self.options.default_schema);
        if resolved {
            return Ok(Some(NodeId::new(kind, &qualified.to_string())));
        }

        let placeholder = match kind {
            NodeKind::Function => GraphNode::function(&qualified, false),
            _ => GraphNode::table(&qualified, false),
        };
        let id = placeholder.id.clone();
        self.graph.add_node(placeholder)?;
        self.warnings.push(MergeWarning::UnresolvedReference {
            workflow: workflow.to_string(),
            kind,
            reference: qualified.to_string(),
        });
        Ok(Some(id))
    }

    /// Mark functions reached by a workflow, then every table they or a
    /// workflow read, and fill in each function's `tables_used`.
    fn propagate_usage(&mut self) {
        let used_functions: HashSet<NodeId> = self
            .graph
            .nodes_of_kind(NodeKind::Function)
            .filter(|f| self.used_directly(&f.id))
            .map(|f| f.id.clone())
            .collect();

        let mut used_tables: HashSet<NodeId> = HashSet::new();
        let mut reads: Vec<(NodeId, BTreeSet<NodeId>)> = Vec::new();
        for table in self.graph.nodes_of_kind(NodeKind::Table) {
            if self.used_directly(&table.id) {
                used_tables.insert(table.id.clone());
            }
        }
        for function in self.graph.nodes_of_kind(NodeKind::Function) {
            let targets: BTreeSet<NodeId> = self
                .graph
                .edges_from(&function.id)
                .filter(|(kind, _)| *kind == EdgeKind::FunctionReads)
                .map(|(_, table)| table.id.clone())
                .collect();
            if used_functions.contains(&function.id) {
                used_tables.extend(targets.iter().cloned());
            }
            reads.push((function.id.clone(), targets));
        }

        for (id, targets) in reads {
            let used = used_functions.contains(&id);
            if let Some(NodeData::Function(meta)) = self.graph.node_mut(&id).map(|n| &mut n.data) {
                meta.tables_used = targets;
                meta.used_by_workflows = used;
            }
        }
        for id in &used_tables {
            if let Some(NodeData::Table(meta)) = self.graph.node_mut(id).map(|n| &mut n.data) {
                meta.used_by_workflows = true;
            }
        }
    }

    fn used_directly(&self, id: &NodeId) -> bool {
        self.graph
            .edges_to(id)
            .any(|(kind, _)| kind == EdgeKind::WorkflowUses)
    }

    fn summary(&self) -> Summary {
        let is_used = |id: &NodeId| {
            self.graph
                .node(id)
                .and_then(GraphNode::used_by_workflows)
                .unwrap_or(false)
        };
        let used_tables: HashSet<NodeId> = self
            .catalog_tables
            .iter()
            .filter(|id| is_used(*id))
            .cloned()
            .collect();

        let unresolved_count = self
            .graph
            .all_nodes()
            .filter(|n| match &n.data {
                NodeData::Table(meta) => !meta.resolved,
                NodeData::Function(meta) => !meta.resolved,
                _ => false,
            })
            .count();

        Summary {
            workflow_count: self.graph.nodes_of_kind(NodeKind::Workflow).count(),
            table_count: self.catalog_tables.len(),
            function_count: self.catalog_functions.len(),
            tables_used_by_workflows: used_tables.len(),
            functions_used_by_workflows: self
                .catalog_functions
                .iter()
                .filter(|id| is_used(*id))
                .count(),
            external_resource_count: self.graph.nodes_of_kind(NodeKind::ExternalResource).count(),
            unresolved_count,
            steps: self.stats,
            orphan_tables: find_orphan_tables(&self.catalog_tables, &used_tables),
        }
    }
}
