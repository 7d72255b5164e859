//! Step extractors for the services workflows talk to

pub mod bigquery;
pub mod generic;
pub mod google;
pub mod http;
pub mod microsoft;
pub mod notion;
pub mod openai;
pub mod postgres;
pub mod supabase;

use serde_json::{Map, Value};

use crate::extractor::StepExtractor;

/// Pick the extractor for a step type. Matching is a case-insensitive
/// substring test; BigQuery is checked before the other Google services.
///
/// Untyped steps get the field-based fallback. Typed steps from any other
/// service return `None`: their `table` fields name tables in that service,
/// not in the catalog.
pub fn get_extractor(node_type: &str) -> Option<Box<dyn StepExtractor>> {
    let t = node_type.trim().to_ascii_lowercase();

    if t.is_empty() {
        Some(Box::new(generic::GenericExtractor))
    } else if t.contains("bigquery") {
        Some(Box::new(bigquery::BigQueryExtractor))
    } else if t.contains("supabase") {
        Some(Box::new(supabase::SupabaseExtractor))
    } else if t.contains("postgres") {
        Some(Box::new(postgres::PostgresExtractor))
    } else if t.contains("notion") {
        Some(Box::new(notion::NotionExtractor))
    } else if t.contains("openai") {
        Some(Box::new(openai::OpenAiExtractor))
    } else if t.contains("microsoft") {
        Some(Box::new(microsoft::MicrosoftExtractor))
    } else if t.contains("google") || t.contains("gmail") {
        Some(Box::new(google::GoogleExtractor))
    } else if t.contains("http") {
        Some(Box::new(http::HttpExtractor))
    } else {
        None
    }
}

/// A parameter value after unwrapping resource locators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Param {
    Missing,
    /// An expression (`=...`), only known at run time.
    Dynamic,
    Value(String),
}

impl Param {
    pub(crate) fn value(self) -> Option<String> {
        match self {
            Param::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Read one parameter. Resource-locator objects resolve to their
/// `cachedResultName`, then their `value`.
pub(crate) fn param(params: &Map<String, Value>, key: &str) -> Param {
    params.get(key).map_or(Param::Missing, read_value)
}

/// First of `keys` holding a static value. Reports `Dynamic` if only
/// expressions were found.
pub(crate) fn first_param(params: &Map<String, Value>, keys: &[&str]) -> Param {
    let mut outcome = Param::Missing;
    for key in keys {
        match param(params, key) {
            Param::Value(v) => return Param::Value(v),
            Param::Dynamic => outcome = Param::Dynamic,
            Param::Missing => {}
        }
    }
    outcome
}

fn read_value(value: &Value) -> Param {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Param::Missing
            } else if s.starts_with('=') {
                Param::Dynamic
            } else {
                Param::Value(s.to_string())
            }
        }
        Value::Number(n) => Param::Value(n.to_string()),
        Value::Object(locator) => {
            let cached = locator.get("cachedResultName").map_or(Param::Missing, read_value);
            match cached {
                Param::Value(_) => cached,
                _ => locator.get("value").map_or(Param::Missing, read_value),
            }
        }
        _ => Param::Missing,
    }
}

/// The part of a step type after the package prefix,
/// `n8n-nodes-base.googleSheets` -> `googleSheets`.
pub(crate) fn type_suffix(node_type: &str) -> &str {
    node_type.rsplit('.').next().unwrap_or(node_type)
}
