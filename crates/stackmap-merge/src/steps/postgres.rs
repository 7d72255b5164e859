//! Postgres steps addressing a single table

use stackmap_core::NameRef;

use super::{param, Param};
use crate::extractor::{ResourceRef, Step, StepExtractor, StepOutcome};

pub struct PostgresExtractor;

impl StepExtractor for PostgresExtractor {
    fn extract(&self, step: &Step<'_>) -> StepOutcome {
        match param(step.params, "table") {
            Param::Value(table) => StepOutcome::Found(vec![ResourceRef::Table(NameRef {
                schema: param(step.params, "schema").value(),
                name: table,
            })]),
            // Free-form queries are not parsed
            _ => StepOutcome::Incomplete("no static table name"),
        }
    }
}
