//! BigQuery steps, identified as `project.dataset.table`

use stackmap_core::Provider;

use super::param;
use crate::extractor::{ResourceRef, Step, StepExtractor, StepOutcome};

pub struct BigQueryExtractor;

impl StepExtractor for BigQueryExtractor {
    fn extract(&self, step: &Step<'_>) -> StepOutcome {
        let parts: Vec<String> = ["projectId", "datasetId", "tableId"]
            .iter()
            .filter_map(|key| param(step.params, key).value())
            .collect();

        if parts.is_empty() {
            return StepOutcome::Incomplete("no project, dataset or table id");
        }
        StepOutcome::Found(vec![ResourceRef::external(
            Provider::BigQuery,
            parts.join("."),
        )])
    }
}
