//! CLI command implementations

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context as _};
use chrono::{DateTime, TimeZone, Utc};
use stackmap_core::{GraphNode, NodeId, QueryEngine};
use stackmap_export::{
    to_interchange, to_markdown_report, write_outputs, ExportOptions, Interchange, Outputs,
};
use stackmap_merge::config::parse_schema_list;
use stackmap_merge::{load_inputs, merge_extracts, MergeOutput, StackmapConfig};
use stackmap_server::ServerState;

use crate::InputArgs;

/// Global flags every command needs.
pub struct Context {
    pub root: PathBuf,
    pub config: Option<PathBuf>,
}

pub struct MergeFlags {
    pub output: Option<PathBuf>,
    pub report: Option<PathBuf>,
    pub no_report: bool,
    pub no_graph: bool,
    pub generated_at: Option<String>,
}

/// Configuration with command-line overrides applied on top.
fn load_config(ctx: &Context, inputs: &InputArgs) -> anyhow::Result<StackmapConfig> {
    let mut config = StackmapConfig::load(ctx.config.as_deref(), &ctx.root)?;

    if let Some(path) = &inputs.workflows {
        config.inputs.workflows = vec![path.clone()];
    }
    if let Some(path) = &inputs.schema {
        config.inputs.schema = vec![path.clone()];
    }
    if let Some(schema) = &inputs.default_schema {
        config.default_schema = schema.clone();
    }
    if let Some(schemas) = &inputs.schemas {
        config.schemas = parse_schema_list(schemas);
    }
    if inputs.allow_missing {
        config.allow_missing_inputs = true;
    }
    Ok(config)
}

/// Load both extracts, then merge. Loader warnings come first.
fn build(config: &StackmapConfig) -> anyhow::Result<MergeOutput> {
    let loaded = load_inputs(
        &config.inputs.workflows,
        &config.inputs.schema,
        config.allow_missing_inputs,
    )?;
    let mut output = merge_extracts(&loaded.workflows, &loaded.schema, &config.merge_options())?;
    if !loaded.warnings.is_empty() {
        let mut warnings = loaded.warnings;
        warnings.append(&mut output.warnings);
        output.warnings = warnings;
    }
    Ok(output)
}

/// Timestamp for the interchange document: the explicit flag, then
/// `SOURCE_DATE_EPOCH`, then the current time.
fn generated_at(flag: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
    if let Some(raw) = flag {
        let parsed = DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("invalid --generated-at '{raw}'"))?;
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(raw) = std::env::var("SOURCE_DATE_EPOCH") {
        let secs: i64 = raw
            .trim()
            .parse()
            .with_context(|| format!("invalid SOURCE_DATE_EPOCH '{raw}'"))?;
        return Utc
            .timestamp_opt(secs, 0)
            .single()
            .ok_or_else(|| anyhow!("SOURCE_DATE_EPOCH out of range: {secs}"));
    }
    Ok(Utc::now())
}

fn export(config: &StackmapConfig, output: &MergeOutput, at: DateTime<Utc>) -> Interchange {
    to_interchange(
        &output.graph,
        &output.summary,
        &output.workflows_raw,
        at,
        &ExportOptions {
            default_schema: config.default_schema.clone(),
            include_graph: config.output.include_graph,
        },
    )
}

pub fn merge(ctx: &Context, inputs: &InputArgs, flags: MergeFlags) -> anyhow::Result<()> {
    let mut config = load_config(ctx, inputs)?;
    if let Some(path) = flags.output {
        config.output.interchange = path;
    }
    if let Some(path) = flags.report {
        config.output.report = Some(path);
    }
    if flags.no_report {
        config.output.report = None;
    }
    if flags.no_graph {
        config.output.include_graph = false;
    }
    let at = generated_at(flags.generated_at.as_deref())?;

    let output = build(&config)?;

    // Render everything before touching the filesystem
    let mut outputs = Outputs::new();
    outputs.add(
        config.output.interchange.clone(),
        export(&config, &output, at).to_json()?,
    );
    if let Some(path) = &config.output.report {
        outputs.add(
            path.clone(),
            to_markdown_report(&output.graph, &output.summary, &output.warnings),
        );
    }
    write_outputs(&outputs)?;

    let summary = &output.summary;
    tracing::info!(
        "{} workflows, {} tables ({} used by workflows), {} functions ({} used by workflows)",
        summary.workflow_count,
        summary.table_count,
        summary.tables_used_by_workflows,
        summary.function_count,
        summary.functions_used_by_workflows
    );
    Ok(())
}

pub fn report(ctx: &Context, inputs: &InputArgs) -> anyhow::Result<()> {
    let config = load_config(ctx, inputs)?;
    let output = build(&config)?;
    print!(
        "{}",
        to_markdown_report(&output.graph, &output.summary, &output.warnings)
    );
    Ok(())
}

fn engine(ctx: &Context, inputs: &InputArgs) -> anyhow::Result<QueryEngine> {
    let config = load_config(ctx, inputs)?;
    Ok(QueryEngine::new(build(&config)?.graph))
}

fn find(engine: &QueryEngine, needle: &str) -> anyhow::Result<NodeId> {
    match engine.find(needle) {
        Some(node) => Ok(node.id.clone()),
        None => bail!("no node matches '{needle}'"),
    }
}

fn print_nodes(nodes: &[&GraphNode], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(nodes)?);
        return Ok(());
    }
    for node in nodes {
        println!("{}\t{}", node.id, node.name);
    }
    Ok(())
}

pub fn impact(ctx: &Context, inputs: &InputArgs, node: &str, json: bool) -> anyhow::Result<()> {
    let engine = engine(ctx, inputs)?;
    let id = find(&engine, node)?;
    let impact = engine.impact(&id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&impact)?);
        return Ok(());
    }
    if impact.is_empty() {
        println!("No workflow depends on {id}");
        return Ok(());
    }
    for workflow in &impact.workflows {
        let name = engine.node(workflow).map(|n| n.name.as_str())?;
        let how = if impact.direct_workflows.contains(workflow) {
            "direct"
        } else {
            "via function"
        };
        println!("{workflow}\t{name}\t{how}");
    }
    Ok(())
}

pub fn search(ctx: &Context, inputs: &InputArgs, query: &str, json: bool) -> anyhow::Result<()> {
    let engine = engine(ctx, inputs)?;
    print_nodes(&engine.filter_by_text(query), json)
}

pub fn neighbors(ctx: &Context, inputs: &InputArgs, node: &str, json: bool) -> anyhow::Result<()> {
    let engine = engine(ctx, inputs)?;
    let id = find(&engine, node)?;
    print_nodes(&engine.neighbors(&id)?, json)
}

pub async fn serve(
    ctx: &Context,
    inputs: &InputArgs,
    host: Option<String>,
    port: Option<u16>,
    open: bool,
) -> anyhow::Result<()> {
    let config = load_config(ctx, inputs)?;
    let output = build(&config)?;
    let interchange = export(&config, &output, generated_at(None)?);
    let state = Arc::new(ServerState::new(output.graph, interchange));

    let host = host.unwrap_or(config.server.host);
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid listen address {host}:{port}"))?;

    tracing::info!("Starting Stackmap server on {}", addr);
    if open {
        let url = format!("http://{addr}/api/stack");
        if let Err(e) = open::that(&url) {
            tracing::warn!("Could not open browser: {}", e);
        }
    }
    stackmap_server::serve(state, addr).await
}
