//! Raw HTTP request steps
//!
//! The URL is matched even when it is an expression: the RPC or table path
//! segment is usually static while only the host or arguments vary. A
//! `/rest/v1/<table>` path only counts on a Supabase host or a templated one.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;
use stackmap_core::{NameRef, Provider};

use crate::extractor::{ResourceRef, Step, StepExtractor, StepOutcome};

static RPC_RE: OnceLock<Regex> = OnceLock::new();
static REST_TABLE_RE: OnceLock<Regex> = OnceLock::new();
static HOST_RE: OnceLock<Regex> = OnceLock::new();
static NOTION_ID_RE: OnceLock<Regex> = OnceLock::new();
static BIGQUERY_TABLE_RE: OnceLock<Regex> = OnceLock::new();

fn rpc_re() -> &'static Regex {
    RPC_RE.get_or_init(|| Regex::new(r"/rpc/([a-zA-Z_][a-zA-Z0-9_]*)").expect("valid regex"))
}

fn rest_table_re() -> &'static Regex {
    REST_TABLE_RE
        .get_or_init(|| Regex::new(r"/rest/v1/([a-zA-Z_][a-zA-Z0-9_]*)").expect("valid regex"))
}

fn host_re() -> &'static Regex {
    HOST_RE.get_or_init(|| Regex::new(r"https?://([^/:?#\s]+)").expect("valid regex"))
}

fn notion_id_re() -> &'static Regex {
    NOTION_ID_RE.get_or_init(|| {
        Regex::new(r"/(?:databases|pages)/([0-9a-fA-F-]{32,36})").expect("valid regex")
    })
}

fn bigquery_table_re() -> &'static Regex {
    BIGQUERY_TABLE_RE.get_or_init(|| {
        Regex::new(r"/projects/([^/]+)/datasets/([^/]+)/tables/([^/?]+)").expect("valid regex")
    })
}

pub struct HttpExtractor;

impl StepExtractor for HttpExtractor {
    fn extract(&self, step: &Step<'_>) -> StepOutcome {
        let Some(Value::String(url)) = step.params.get("url") else {
            return StepOutcome::Incomplete("no url");
        };

        if let Some(caps) = rpc_re().captures(url) {
            return StepOutcome::Found(vec![ResourceRef::Function(NameRef::bare(&caps[1]))]);
        }

        let host = host_re().captures(url).map(|c| c[1].to_ascii_lowercase());
        let supabase_host = host.as_deref().is_none_or(|h| h.contains("supabase"));
        if supabase_host {
            if let Some(caps) = rest_table_re().captures(url) {
                if &caps[1] != "rpc" {
                    return StepOutcome::Found(vec![ResourceRef::Table(NameRef::bare(&caps[1]))]);
                }
            }
        }

        match host.and_then(|h| classify_host(&h, url)) {
            Some(reference) => StepOutcome::Found(vec![reference]),
            None => StepOutcome::Unrecognized,
        }
    }
}

/// Map a well-known API host to its provider.
fn classify_host(host: &str, url: &str) -> Option<ResourceRef> {
    let reference = if host == "api.notion.com" {
        let id = notion_id_re()
            .captures(url)
            .map_or_else(|| host.to_string(), |c| c[1].to_string());
        ResourceRef::external(Provider::Notion, id)
    } else if host == "bigquery.googleapis.com" {
        let id = bigquery_table_re()
            .captures(url)
            .map_or_else(|| host.to_string(), |c| format!("{}.{}.{}", &c[1], &c[2], &c[3]));
        ResourceRef::external(Provider::BigQuery, id)
    } else if host.ends_with("googleapis.com") {
        ResourceRef::external(Provider::Google, host)
    } else if host == "graph.microsoft.com" {
        ResourceRef::external(Provider::Microsoft, host)
    } else if host == "api.openai.com" {
        ResourceRef::external(Provider::OpenAI, Provider::OpenAI.tag())
    } else {
        return None;
    };
    Some(reference)
}
