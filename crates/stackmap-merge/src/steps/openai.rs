use stackmap_core::Provider;

use super::param;
use crate::extractor::{ResourceRef, Step, StepExtractor, StepOutcome};

pub struct OpenAiExtractor;

impl StepExtractor for OpenAiExtractor {
    fn extract(&self, step: &Step<'_>) -> StepOutcome {
        let model = param(step.params, "model")
            .value()
            .unwrap_or_else(|| Provider::OpenAI.tag().to_string());
        StepOutcome::Found(vec![ResourceRef::external(Provider::OpenAI, model)])
    }
}
