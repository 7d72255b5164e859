//! Function-to-table dependency resolution and orphan detection

use std::collections::{BTreeSet, HashMap, HashSet};

use stackmap_core::{NameRef, NameTable, NodeId, NodeKind, QualifiedName};
use tracing::debug;

use crate::error::MergeWarning;
use crate::input::DependencyPair;

/// Strip whitespace and double quotes, then split a dotted name on its first
/// dot. Returns `None` when nothing is left of the name.
pub fn normalize_ref(raw: &NameRef) -> Option<NameRef> {
    let schema = raw.schema.as_deref().map(clean).filter(|s| !s.is_empty());
    let name = clean(&raw.name);

    let (schema, name) = match schema {
        Some(schema) => (Some(schema), name),
        None => match name.split_once('.') {
            Some((schema, bare)) => (Some(clean(schema)), clean(bare)),
            None => (None, name),
        },
    };
    if name.is_empty() {
        return None;
    }
    Some(NameRef {
        schema: schema.filter(|s| !s.is_empty()),
        name,
    })
}

/// Normalize a reference and fill in the default schema.
pub fn normalize_name(raw: &NameRef, default_schema: &str) -> Option<QualifiedName> {
    let normalized = normalize_ref(raw)?;
    let schema = normalized
        .schema
        .unwrap_or_else(|| default_schema.to_string());
    Some(QualifiedName::new(schema, normalized.name))
}

fn clean(raw: &str) -> String {
    raw.trim().trim_matches('"').trim().to_string()
}

/// A table read by a function, with whether the catalog knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableTarget {
    pub id: NodeId,
    pub name: QualifiedName,
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntry {
    pub id: NodeId,
    pub name: QualifiedName,
    pub resolved: bool,
    /// Deduplicated, in order of first appearance.
    pub tables: Vec<TableTarget>,
}

/// Resolved dependencies keyed by function, in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct FunctionDependencies {
    pub functions: Vec<FunctionEntry>,
    pub warnings: Vec<MergeWarning>,
    slots: HashMap<NodeId, usize>,
}

impl FunctionDependencies {
    pub fn get(&self, function: &NodeId) -> Option<&FunctionEntry> {
        self.slots.get(function).map(|&slot| &self.functions[slot])
    }

    pub fn pair_count(&self) -> usize {
        self.functions.iter().map(|f| f.tables.len()).sum()
    }

    fn entry(&mut self, id: NodeId, name: QualifiedName, resolved: bool) -> &mut FunctionEntry {
        let slot = match self.slots.get(&id) {
            Some(&slot) => slot,
            None => {
                self.slots.insert(id.clone(), self.functions.len());
                self.functions.push(FunctionEntry {
                    id,
                    name,
                    resolved,
                    tables: Vec::new(),
                });
                self.functions.len() - 1
            }
        };
        &mut self.functions[slot]
    }
}

/// Resolve raw (function, table) pairs against the catalog name table.
///
/// Unknown functions and tables are kept with `resolved = false` and
/// reported once each; pairs missing either name are skipped. Pairs whose
/// function lies outside a non-empty `schemas` allow-list are ignored.
pub fn resolve_function_dependencies(
    pairs: &[DependencyPair],
    names: &NameTable,
    default_schema: &str,
    schemas: &[String],
) -> FunctionDependencies {
    let mut deps = FunctionDependencies::default();
    let mut reported: HashSet<(NodeId, Option<NodeId>)> = HashSet::new();

    for (index, pair) in pairs.iter().enumerate() {
        let function = pair.function_name.as_deref().and_then(|name| {
            normalize_ref(&NameRef {
                schema: pair.function_schema.clone(),
                name: name.to_string(),
            })
        });
        let table = pair.referenced_table.as_deref().and_then(|name| {
            normalize_ref(&NameRef {
                schema: pair.referenced_schema.clone(),
                name: name.to_string(),
            })
        });
        let (function, table) = match (function, table) {
            (Some(f), Some(t)) => (f, t),
            (None, _) => {
                deps.warnings.push(MergeWarning::MalformedDependency {
                    index,
                    reason: "missing function name".to_string(),
                });
                continue;
            }
            (_, None) => {
                deps.warnings.push(MergeWarning::MalformedDependency {
                    index,
                    reason: "missing table name".to_string(),
                });
                continue;
            }
        };

        let (function_name, function_resolved) =
            lookup(names, NodeKind::Function, &function, default_schema);
        if !schema_allowed(schemas, &function_name.schema) {
            debug!("Ignoring dependency of {function_name}: schema not selected");
            continue;
        }
        let function_id = NodeId::function(&function_name);
        if !function_resolved && reported.insert((function_id.clone(), None)) {
            deps.warnings.push(MergeWarning::UnknownFunction {
                function: function_name.to_string(),
            });
        }

        let (table_name, table_resolved) = lookup(names, NodeKind::Table, &table, default_schema);
        let table_id = NodeId::table(&table_name);
        if !table_resolved && reported.insert((function_id.clone(), Some(table_id.clone()))) {
            deps.warnings.push(MergeWarning::DanglingReference {
                function: function_name.to_string(),
                table: table_name.to_string(),
            });
        }

        let entry = deps.entry(function_id, function_name, function_resolved);
        if entry.tables.iter().all(|t| t.id != table_id) {
            entry.tables.push(TableTarget {
                id: table_id,
                name: table_name,
                resolved: table_resolved,
            });
        }
    }

    deps
}

/// Resolve through the name table, falling back to the reference itself
/// under the default schema.
pub(crate) fn lookup(
    names: &NameTable,
    kind: NodeKind,
    reference: &NameRef,
    default_schema: &str,
) -> (QualifiedName, bool) {
    match names.resolve_name(kind, reference, default_schema) {
        Some(name) => (name.clone(), true),
        None => {
            let schema = reference
                .schema
                .clone()
                .unwrap_or_else(|| default_schema.to_string());
            (QualifiedName::new(schema, reference.name.as_str()), false)
        }
    }
}

pub(crate) fn schema_allowed(schemas: &[String], schema: &str) -> bool {
    schemas.is_empty() || schemas.iter().any(|s| s == schema)
}

/// Catalog tables not marked as used.
pub fn find_orphan_tables<'a>(
    tables: impl IntoIterator<Item = &'a NodeId>,
    used: &HashSet<NodeId>,
) -> BTreeSet<NodeId> {
    tables
        .into_iter()
        .filter(|id| !used.contains(*id))
        .cloned()
        .collect()
}
