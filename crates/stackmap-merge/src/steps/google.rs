//! Google Workspace steps (Sheets, Docs, Drive, Gmail)

use stackmap_core::Provider;

use super::{first_param, type_suffix};
use crate::extractor::{ResourceRef, Step, StepExtractor, StepOutcome};

pub struct GoogleExtractor;

impl StepExtractor for GoogleExtractor {
    fn extract(&self, step: &Step<'_>) -> StepOutcome {
        let identifier = first_param(step.params, &["documentId", "fileId"])
            .value()
            .unwrap_or_else(|| type_suffix(step.node_type).to_string());
        StepOutcome::Found(vec![ResourceRef::external(Provider::Google, identifier)])
    }
}
