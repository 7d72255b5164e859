//! Configuration for merge runs and the query server
//!
//! Precedence, lowest first: built-in defaults, `stackmap.toml`, environment
//! (a `.env` file in the root is loaded first), then command-line flags
//! applied by the binary.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MergeError, Result};
use crate::merger::MergeOptions;

/// Configuration file looked up in the project root.
pub const CONFIG_FILE: &str = "stackmap.toml";

pub const ENV_DEFAULT_SCHEMA: &str = "STACKMAP_DEFAULT_SCHEMA";
/// Comma-separated schema allow-list, shared with the schema exporter.
pub const ENV_SCHEMAS: &str = "SCHEMAS";
pub const ENV_ALLOW_MISSING: &str = "STACKMAP_ALLOW_MISSING_INPUTS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StackmapConfig {
    /// Schema assumed for unqualified table and function names.
    pub default_schema: String,
    /// Schema allow-list. Empty means every schema.
    pub schemas: Vec<String>,
    /// Treat a missing extract as empty instead of failing.
    pub allow_missing_inputs: bool,
    pub inputs: InputConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

/// Candidate extract locations; the first existing file wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputConfig {
    pub workflows: Vec<PathBuf>,
    pub schema: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Interchange document consumed by the display layer.
    pub interchange: PathBuf,
    pub report: Option<PathBuf>,
    /// Add the `graph` section with explicit nodes and edges.
    pub include_graph: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for StackmapConfig {
    fn default() -> Self {
        StackmapConfig {
            default_schema: "public".to_string(),
            schemas: Vec::new(),
            allow_missing_inputs: false,
            inputs: InputConfig::default(),
            output: OutputConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            workflows: vec![
                PathBuf::from("n8n_data.json"),
                PathBuf::from("n8n_workflows_export/n8n_data.json"),
            ],
            schema: vec![
                PathBuf::from("supabase_data.json"),
                PathBuf::from("supabase_export_tables/supabase_data.json"),
            ],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            interchange: PathBuf::from("stack_data.json"),
            report: Some(PathBuf::from("stack_report.md")),
            include_graph: true,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 7890,
        }
    }
}

impl StackmapConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| MergeError::Config(e.to_string()))
    }

    /// Load configuration for a project root.
    ///
    /// An explicit `path` must exist; otherwise `stackmap.toml` in `root` is
    /// used when present. Environment overrides are applied afterwards and
    /// relative paths are anchored at `root`.
    pub fn load(path: Option<&Path>, root: &Path) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::read(path)?,
            None => {
                let default_path = root.join(CONFIG_FILE);
                if default_path.is_file() {
                    Self::read(&default_path)?
                } else {
                    debug!("No {CONFIG_FILE} in {}, using defaults", root.display());
                    Self::default()
                }
            }
        };

        match dotenvy::from_path(root.join(".env")) {
            Ok(()) => debug!("Loaded .env from {}", root.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(MergeError::Config(format!(".env: {e}"))),
        }
        config.apply_env(|key| std::env::var(key).ok());
        config.anchor_paths(root);
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| MergeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| MergeError::Config(format!("{}: {e}", path.display())))
    }

    /// Apply environment overrides read through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(schema) = var(ENV_DEFAULT_SCHEMA).filter(|s| !s.trim().is_empty()) {
            self.default_schema = schema.trim().to_string();
        }
        if let Some(schemas) = var(ENV_SCHEMAS) {
            self.schemas = parse_schema_list(&schemas);
        }
        if let Some(flag) = var(ENV_ALLOW_MISSING) {
            self.allow_missing_inputs = matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
    }

    /// Make relative input and output paths relative to `root`.
    pub fn anchor_paths(&mut self, root: &Path) {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = root.join(&*p);
            }
        };
        self.inputs.workflows.iter_mut().for_each(anchor);
        self.inputs.schema.iter_mut().for_each(anchor);
        anchor(&mut self.output.interchange);
        if let Some(report) = self.output.report.as_mut() {
            anchor(report);
        }
    }

    pub fn merge_options(&self) -> MergeOptions {
        MergeOptions {
            default_schema: self.default_schema.clone(),
            schemas: self.schemas.clone(),
        }
    }
}

/// Split a comma-separated schema list, dropping blanks.
pub fn parse_schema_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
