//! Microsoft 365 steps (Excel, Outlook, Teams, OneDrive)

use stackmap_core::Provider;

use super::{first_param, type_suffix};
use crate::extractor::{ResourceRef, Step, StepExtractor, StepOutcome};

pub struct MicrosoftExtractor;

impl StepExtractor for MicrosoftExtractor {
    fn extract(&self, step: &Step<'_>) -> StepOutcome {
        let identifier = first_param(step.params, &["workbook", "resource"])
            .value()
            .unwrap_or_else(|| type_suffix(step.node_type).to_string());
        StepOutcome::Found(vec![ResourceRef::external(Provider::Microsoft, identifier)])
    }
}
