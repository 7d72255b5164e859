//! Integration tests for Stackmap
//!
//! These tests run the merge pipeline end to end over extracts on disk, both
//! through the library crates and through the `stackmap` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::{json, Value};
use stackmap_core::{NodeId, QualifiedName, QueryEngine};
use stackmap_export::{to_interchange, ExportOptions, Interchange};
use stackmap_merge::{load_inputs, merge_extracts, MergeOptions, StackmapConfig};

const GENERATED_AT: &str = "2024-05-01T00:00:00Z";

fn write_fixtures(root: &Path) {
    let workflows = json!({"workflows": [
        {
            "id": "wf1",
            "name": "Sync users",
            "active": true,
            "nodes": [{"type": "n8n-nodes-base.supabase", "parameters": {"tableName": "users"}}]
        },
        {
            "id": 2,
            "name": "Daily stats",
            "nodes": [{
                "type": "n8n-nodes-base.supabase",
                "parameters": {"operation": "call", "functionName": "get_user_stats"}
            }]
        }
    ]});
    let schema = json!({
        "tables": [
            {"schema_name": "public", "table_name": "users"},
            {"schema_name": "public", "table_name": "transactions"},
            {"schema_name": "public", "table_name": "legacy_data"}
        ],
        "functions": [
            {"schema_name": "public", "function_name": "get_user_stats", "tables_used": ["users", "transactions"]},
            {"schema_name": "public", "function_name": "rebuild_orders", "tables_used": ["orders_v2"]}
        ]
    });

    fs::write(root.join("n8n_data.json"), workflows.to_string()).unwrap();
    let nested = root.join("supabase_export_tables");
    fs::create_dir_all(&nested).unwrap();
    fs::write(nested.join("supabase_data.json"), schema.to_string()).unwrap();
}

fn stackmap(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stackmap"))
        .arg("--root")
        .arg(root)
        .args(args)
        .env_remove("SOURCE_DATE_EPOCH")
        .env_remove("SCHEMAS")
        .env_remove("STACKMAP_DEFAULT_SCHEMA")
        .env_remove("STACKMAP_ALLOW_MISSING_INPUTS")
        .output()
        .expect("failed to run stackmap")
}

fn read_interchange(path: &Path) -> Interchange {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

/// Test that the CLI can be invoked
#[test]
fn test_cli_invocation() {
    let output = Command::new(env!("CARGO_BIN_EXE_stackmap"))
        .arg("--help")
        .output()
        .expect("failed to run stackmap");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("merge"));
    assert!(stdout.contains("impact"));
}

#[test]
fn test_library_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());

    let config = StackmapConfig::load(None, dir.path()).unwrap();
    let loaded = load_inputs(&config.inputs.workflows, &config.inputs.schema, false).unwrap();
    let output = merge_extracts(&loaded.workflows, &loaded.schema, &MergeOptions::default()).unwrap();

    let transactions = NodeId::table(&QualifiedName::new("public", "transactions"));
    let engine = QueryEngine::new(output.graph.clone());
    let impact = engine.impact(&transactions).unwrap();
    assert_eq!(impact.workflows.len(), 1);
    assert!(impact.workflows.contains(&NodeId::workflow("2")));
    assert!(impact.direct_workflows.is_empty());

    let doc = to_interchange(
        &output.graph,
        &output.summary,
        &output.workflows_raw,
        chrono::Utc::now(),
        &ExportOptions::default(),
    );
    assert_eq!(doc.metadata.table_count, 3);
    assert_eq!(doc.metadata.tables_used_by_n8n, 2);
    assert_eq!(doc.workflows[1]["id"], json!(2));
}

#[test]
fn test_merge_command_writes_outputs() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());

    let output = stackmap(dir.path(), &["merge", "--generated-at", GENERATED_AT]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let doc = read_interchange(&dir.path().join("stack_data.json"));
    assert_eq!(doc.metadata.generated_at, GENERATED_AT);
    assert_eq!(doc.metadata.workflow_count, 2);
    assert_eq!(doc.metadata.function_count, 2);
    assert_eq!(doc.metadata.functions_used_by_n8n, 1);
    assert!(doc.graph.is_some());

    let rebuild = doc
        .supabase
        .functions
        .iter()
        .find(|f| f.name == "rebuild_orders")
        .unwrap();
    assert_eq!(rebuild.unresolved_tables, vec!["orders_v2"]);

    let report = fs::read_to_string(dir.path().join("stack_report.md")).unwrap();
    assert!(report.contains("public.legacy_data (orphan)"));
    assert!(report.contains("public.orders_v2 (unresolved)"));
}

#[test]
fn test_merge_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());
    let path = dir.path().join("stack_data.json");

    assert!(stackmap(dir.path(), &["merge", "--generated-at", GENERATED_AT]).status.success());
    let first = fs::read(&path).unwrap();
    assert!(stackmap(dir.path(), &["merge", "--generated-at", GENERATED_AT]).status.success());
    let second = fs::read(&path).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_missing_input_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("n8n_data.json"), "[]").unwrap();

    let output = stackmap(dir.path(), &["merge"]);
    assert!(!output.status.success());
    assert!(!dir.path().join("stack_data.json").exists());

    let output = stackmap(dir.path(), &["merge", "--allow-missing", "--no-report"]);
    assert!(output.status.success());
    let doc: Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("stack_data.json")).unwrap())
            .unwrap();
    assert_eq!(doc["metadata"]["table_count"], 0);
    assert!(!dir.path().join("stack_report.md").exists());
}

#[test]
fn test_config_file_controls_outputs() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());
    fs::write(
        dir.path().join("stackmap.toml"),
        "[output]\ninterchange = \"out/graph.json\"\ninclude_graph = false\n",
    )
    .unwrap();

    let output = stackmap(dir.path(), &["merge", "--generated-at", GENERATED_AT]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let doc: Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("out").join("graph.json")).unwrap(),
    )
    .unwrap();
    assert!(doc.get("graph").is_none());
}

#[test]
fn test_query_commands() {
    let dir = tempfile::tempdir().unwrap();
    write_fixtures(dir.path());

    let output = stackmap(dir.path(), &["impact", "transactions"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("workflow:2\tDaily stats\tvia function"));

    let output = stackmap(dir.path(), &["search", "USER", "--json"]);
    let hits: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(hits.as_array().unwrap().len(), 3);

    let output = stackmap(dir.path(), &["neighbors", "no_such_node"]);
    assert!(!output.status.success());
}
