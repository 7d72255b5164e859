use stackmap_core::Provider;

use super::{first_param, Param};
use crate::extractor::{ResourceRef, Step, StepExtractor, StepOutcome};

pub struct NotionExtractor;

impl StepExtractor for NotionExtractor {
    fn extract(&self, step: &Step<'_>) -> StepOutcome {
        match first_param(step.params, &["databaseId", "pageId"]) {
            Param::Value(id) => StepOutcome::Found(vec![ResourceRef::external(Provider::Notion, id)]),
            _ => StepOutcome::Incomplete("no database or page id"),
        }
    }
}
