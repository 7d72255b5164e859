//! Human-readable markdown report

use std::fmt::Write;

use stackmap_core::{EdgeKind, Graph, GraphNode, NodeData, NodeKind};
use stackmap_merge::{MergeWarning, Summary};

/// Render the report: a summary table, one section per node kind, then
/// orphan tables and warnings. Unresolved names are marked as such.
pub fn to_markdown_report(graph: &Graph, summary: &Summary, warnings: &[MergeWarning]) -> String {
    let mut out = String::new();

    out.push_str("# Stack report\n\n## Summary\n\n");
    out.push_str("| Kind | Count | Used by workflows |\n");
    out.push_str("|------|------:|------------------:|\n");
    let _ = writeln!(out, "| Workflows | {} | - |", summary.workflow_count);
    let _ = writeln!(
        out,
        "| Tables | {} | {} |",
        summary.table_count, summary.tables_used_by_workflows
    );
    let _ = writeln!(
        out,
        "| Functions | {} | {} |",
        summary.function_count, summary.functions_used_by_workflows
    );
    let _ = writeln!(
        out,
        "| External resources | {} | - |",
        summary.external_resource_count
    );
    let _ = writeln!(
        out,
        "\nSteps inspected: {} ({} skipped, {} unrecognized)",
        summary.steps.steps, summary.steps.skipped, summary.steps.unrecognized
    );

    for kind in NodeKind::ALL {
        let _ = writeln!(out, "\n## {}\n", kind.label());
        let lines: Vec<String> = graph
            .nodes_of_kind(kind)
            .map(|node| describe(graph, node))
            .collect();
        push_list(&mut out, lines);
    }

    out.push_str("\n## Orphan tables\n\n");
    push_list(
        &mut out,
        summary
            .orphan_tables
            .iter()
            .filter_map(|id| graph.node(id))
            .map(|node| node.qualified_name.clone())
            .collect(),
    );

    out.push_str("\n## Warnings\n\n");
    push_list(&mut out, warnings.iter().map(ToString::to_string).collect());

    out
}

fn push_list(out: &mut String, lines: Vec<String>) {
    if lines.is_empty() {
        out.push_str("_None_\n");
    }
    for line in lines {
        let _ = writeln!(out, "- {line}");
    }
}

fn describe(graph: &Graph, node: &GraphNode) -> String {
    match &node.data {
        NodeData::Workflow(meta) => {
            let state = if meta.active { "active" } else { "inactive" };
            let mut targets: Vec<&GraphNode> = graph
                .edges_from(&node.id)
                .filter(|(kind, _)| *kind == EdgeKind::WorkflowUses)
                .map(|(_, target)| target)
                .collect();
            targets.sort_by_key(|t| graph.position(&t.id));
            let line = format!("{} (`{}`, {state})", node.name, meta.source_id);
            with_targets(line, targets.into_iter().map(label))
        }
        NodeData::Table(meta) => {
            let status = match (meta.resolved, meta.used_by_workflows) {
                (true, true) => "used",
                (true, false) => "orphan",
                (false, true) => "used, unresolved",
                (false, false) => "unresolved",
            };
            format!("{} ({status})", node.qualified_name)
        }
        NodeData::Function(meta) => {
            let mut line = node.qualified_name.clone();
            match (meta.resolved, meta.used_by_workflows) {
                (true, true) => line.push_str(" (used)"),
                (true, false) => {}
                (false, true) => line.push_str(" (used, unresolved)"),
                (false, false) => line.push_str(" (unresolved)"),
            }
            let reads = meta
                .tables_used
                .iter()
                .filter_map(|id| graph.node(id))
                .map(label);
            with_targets(line, reads)
        }
        NodeData::ExternalResource(_) => node.name.clone(),
    }
}

fn with_targets(mut line: String, targets: impl Iterator<Item = String>) -> String {
    let targets: Vec<String> = targets.collect();
    if !targets.is_empty() {
        line.push_str(": ");
        line.push_str(&targets.join(", "));
    }
    line
}

/// Qualified name for database objects, display name otherwise, with
/// placeholders marked.
fn label(node: &GraphNode) -> String {
    match &node.data {
        NodeData::Table(meta) if !meta.resolved => format!("{} (unresolved)", node.qualified_name),
        NodeData::Function(meta) if !meta.resolved => {
            format!("{} (unresolved)", node.qualified_name)
        }
        NodeData::Table(_) | NodeData::Function(_) => node.qualified_name.clone(),
        _ => node.name.clone(),
    }
}
