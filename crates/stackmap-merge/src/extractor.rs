//! Classify workflow steps into resource references

use std::collections::BTreeSet;
use std::ops::AddAssign;

use serde::Serialize;
use serde_json::{Map, Value};
use stackmap_core::{NameRef, Provider};
use tracing::debug;

use crate::input::WorkflowRecord;
use crate::steps::get_extractor;

/// Something a workflow step touches.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceRef {
    Table(NameRef),
    Function(NameRef),
    External { provider: Provider, identifier: String },
}

impl ResourceRef {
    pub fn external(provider: Provider, identifier: impl Into<String>) -> Self {
        ResourceRef::External {
            provider,
            identifier: identifier.into(),
        }
    }
}

/// Step counters for one or more workflows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    pub steps: usize,
    /// Malformed steps and resource steps without a usable static name.
    pub skipped: usize,
    /// Steps with no recognizable resource field at all.
    pub unrecognized: usize,
}

impl AddAssign for ExtractionStats {
    fn add_assign(&mut self, rhs: Self) {
        self.steps += rhs.steps;
        self.skipped += rhs.skipped;
        self.unrecognized += rhs.unrecognized;
    }
}

/// References found in one workflow, deduplicated and ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub references: BTreeSet<ResourceRef>,
    pub stats: ExtractionStats,
}

/// A step as seen by an extractor.
#[derive(Debug, Clone, Copy)]
pub struct Step<'a> {
    /// Step type exactly as written, e.g. `n8n-nodes-base.supabase`.
    pub node_type: &'a str,
    /// The step's `parameters` object, or the step itself when it has none.
    pub params: &'a Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Found(Vec<ResourceRef>),
    /// A resource step whose target could not be determined statically.
    Incomplete(&'static str),
    Unrecognized,
}

/// Trait for per-service step classifiers.
pub trait StepExtractor {
    fn extract(&self, step: &Step<'_>) -> StepOutcome;
}

/// Run the matching extractor over every step of a workflow. Never fails:
/// steps that cannot be classified are counted instead.
pub fn extract_references(workflow: &WorkflowRecord) -> Extraction {
    let mut extraction = Extraction::default();

    for (index, step) in workflow.steps.iter().enumerate() {
        extraction.stats.steps += 1;

        let Some(object) = step.as_object() else {
            debug!("workflow {} step {index}: not an object", workflow.id);
            extraction.stats.skipped += 1;
            continue;
        };
        let params = match object.get("parameters") {
            Some(Value::Object(params)) => params,
            None | Some(Value::Null) => object,
            Some(_) => {
                debug!("workflow {} step {index}: parameters is not an object", workflow.id);
                extraction.stats.skipped += 1;
                continue;
            }
        };
        let node_type = object.get("type").and_then(Value::as_str).unwrap_or("");

        let Some(extractor) = get_extractor(node_type) else {
            debug!("workflow {} step {index}: no extractor for {node_type}", workflow.id);
            extraction.stats.unrecognized += 1;
            continue;
        };
        let step = Step { node_type, params };
        match extractor.extract(&step) {
            StepOutcome::Found(references) => extraction.references.extend(references),
            StepOutcome::Incomplete(reason) => {
                debug!("workflow {} step {index} ({node_type}): {reason}", workflow.id);
                extraction.stats.skipped += 1;
            }
            StepOutcome::Unrecognized => extraction.stats.unrecognized += 1,
        }
    }

    extraction
}
