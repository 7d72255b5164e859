//! Fixtures shared by the merge tests

use serde_json::{json, Value};

use crate::input::{SchemaExtract, WorkflowExtract};
use crate::merger::{merge_extracts, MergeOptions, MergeOutput};

pub fn workflows(value: Value) -> WorkflowExtract {
    WorkflowExtract::from_value(value).expect("valid workflow fixture")
}

pub fn schema(value: Value) -> SchemaExtract {
    SchemaExtract::from_value(value).expect("valid schema fixture")
}

/// Three workflows: one reading `users` directly, one calling
/// `get_user_stats` over HTTP, one talking to Notion and OpenAI.
pub fn sample_workflows() -> Value {
    json!([
        {
            "id": "wf1",
            "name": "Sync users",
            "active": true,
            "nodes": [
                {
                    "name": "Fetch users",
                    "type": "n8n-nodes-base.supabase",
                    "parameters": {"operation": "getAll", "tableName": "users"}
                }
            ]
        },
        {
            "id": "wf2",
            "name": "Daily stats",
            "active": false,
            "nodes": [
                {
                    "name": "Stats RPC",
                    "type": "n8n-nodes-base.httpRequest",
                    "parameters": {
                        "method": "POST",
                        "url": "=https://xyz.supabase.co/rest/v1/rpc/get_user_stats"
                    }
                }
            ]
        },
        {
            "id": "wf3",
            "name": "Notion digest",
            "nodes": [
                {
                    "type": "n8n-nodes-base.notion",
                    "parameters": {
                        "databaseId": {"__rl": true, "value": "db-123", "mode": "id"}
                    }
                },
                {
                    "type": "@n8n/n8n-nodes-langchain.openAi",
                    "parameters": {"model": "gpt-4o-mini"}
                },
                {"type": "n8n-nodes-base.set", "parameters": {"values": {}}},
                {
                    "type": "n8n-nodes-base.supabase",
                    "parameters": {"tableName": "Supabase"}
                },
                {
                    "type": "n8n-nodes-base.supabase",
                    "parameters": {"tableName": "={{ $json.table }}"}
                }
            ]
        }
    ])
}

/// Catalog with one used table, one read through a function, two orphans,
/// and a function reading a table that no longer exists.
pub fn sample_schema() -> Value {
    json!({
        "tables": [
            {"schema_name": "public", "table_name": "users"},
            {"schema_name": "public", "table_name": "transactions"},
            {"schema_name": "public", "table_name": "legacy_data"},
            {"schema_name": "public", "table_name": "orders"}
        ],
        "functions": [
            {"schema_name": "public", "function_name": "get_user_stats"},
            {"schema_name": "public", "function_name": "purge_legacy"},
            {"schema_name": "public", "function_name": "cleanup_orders", "tables_used": ["orders_v2"]}
        ],
        "dependencies": [
            {"function_schema": "public", "function_name": "get_user_stats", "referenced_schema": "public", "referenced_table": "users"},
            {"function_schema": "public", "function_name": "get_user_stats", "referenced_schema": "public", "referenced_table": "transactions"},
            {"function_schema": "public", "function_name": "purge_legacy", "referenced_table": "legacy_data"}
        ],
        "metadata": {"exported_at": "2024-05-01T00:00:00Z"}
    })
}

pub fn merge_sample() -> MergeOutput {
    merge_extracts(
        &workflows(sample_workflows()),
        &schema(sample_schema()),
        &MergeOptions::default(),
    )
    .expect("sample merges")
}
