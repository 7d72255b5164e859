//! Supabase steps: table operations and RPC calls

use stackmap_core::NameRef;

use super::{first_param, param, Param};
use crate::extractor::{ResourceRef, Step, StepExtractor, StepOutcome};

/// Value the platform shows before a table is chosen.
const PLACEHOLDER_TABLE: &str = "Supabase";

pub struct SupabaseExtractor;

impl StepExtractor for SupabaseExtractor {
    fn extract(&self, step: &Step<'_>) -> StepOutcome {
        let params = step.params;
        let schema = param(params, "schema").value();
        let mut found = Vec::new();

        if let Param::Value(table) = first_param(params, &["tableName", "tableId"]) {
            if table != PLACEHOLDER_TABLE {
                found.push(ResourceRef::Table(NameRef {
                    schema: schema.clone(),
                    name: table,
                }));
            }
        }

        if param(params, "operation").value().as_deref() == Some("call") {
            if let Param::Value(function) = first_param(params, &["functionName", "rpc"]) {
                found.push(ResourceRef::Function(NameRef {
                    schema,
                    name: function,
                }));
            }
        }

        if found.is_empty() {
            StepOutcome::Incomplete("no static table or function name")
        } else {
            StepOutcome::Found(found)
        }
    }
}
