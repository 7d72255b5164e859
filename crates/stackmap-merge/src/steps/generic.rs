//! Field-based fallback for steps that carry no `type`

use stackmap_core::{NameRef, Provider};

use super::{first_param, param, Param};
use crate::extractor::{ResourceRef, Step, StepExtractor, StepOutcome};

pub struct GenericExtractor;

impl StepExtractor for GenericExtractor {
    fn extract(&self, step: &Step<'_>) -> StepOutcome {
        let params = step.params;
        let mut found = Vec::new();
        let mut dynamic = false;

        match first_param(params, &["table", "tableName"]) {
            Param::Value(table) => found.push(ResourceRef::Table(NameRef {
                schema: param(params, "schema").value(),
                name: table,
            })),
            Param::Dynamic => dynamic = true,
            Param::Missing => {}
        }
        match first_param(params, &["function", "functionName", "rpc"]) {
            Param::Value(function) => found.push(ResourceRef::Function(NameRef::bare(function))),
            Param::Dynamic => dynamic = true,
            Param::Missing => {}
        }
        match param(params, "databaseId") {
            Param::Value(id) => found.push(ResourceRef::external(Provider::Notion, id)),
            Param::Dynamic => dynamic = true,
            Param::Missing => {}
        }

        if !found.is_empty() {
            StepOutcome::Found(found)
        } else if dynamic {
            StepOutcome::Incomplete("resource named by an expression")
        } else {
            StepOutcome::Unrecognized
        }
    }
}
