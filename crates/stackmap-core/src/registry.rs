//! Name table for resolving upstream references to registered node ids

use std::collections::HashMap;

use crate::model::{NameRef, NodeId, NodeKind, QualifiedName};

/// Maps schema-qualified and bare names of database objects to node ids.
///
/// Workflows usually reference tables and functions by bare name while the
/// schema catalog always carries a schema, so lookups fall back from the
/// qualified form to a bare-name match when the reference has no schema.
#[derive(Debug, Default)]
pub struct NameTable {
    qualified: HashMap<(NodeKind, QualifiedName), NodeId>,
    /// For bare-name fallback: (kind, bare name) -> names in registration order
    bare: HashMap<(NodeKind, String), Vec<QualifiedName>>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a name. Re-inserting the same name is a no-op.
    pub fn insert(&mut self, kind: NodeKind, name: &QualifiedName, id: NodeId) {
        if self.qualified.contains_key(&(kind, name.clone())) {
            return;
        }
        self.qualified.insert((kind, name.clone()), id);
        self.bare
            .entry((kind, name.name.clone()))
            .or_default()
            .push(name.clone());
    }

    /// Look up an exact schema-qualified name.
    pub fn lookup(&self, kind: NodeKind, name: &QualifiedName) -> Option<&NodeId> {
        self.qualified.get(&(kind, name.clone()))
    }

    /// All qualified names registered under a bare name, across schemas.
    pub fn lookup_bare(&self, kind: NodeKind, bare: &str) -> &[QualifiedName] {
        self.bare
            .get(&(kind, bare.to_string()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Resolve a reference to the registered qualified name. An explicit
    /// schema must match exactly; a bare name tries `default_schema` first,
    /// then a unique match in any schema.
    pub fn resolve_name(
        &self,
        kind: NodeKind,
        name: &NameRef,
        default_schema: &str,
    ) -> Option<&QualifiedName> {
        let registered = |schema: &str| {
            self.qualified
                .get_key_value(&(kind, QualifiedName::new(schema, name.name.as_str())))
                .map(|((_, q), _)| q)
        };
        match &name.schema {
            Some(schema) => registered(schema),
            None => registered(default_schema).or_else(|| match self.lookup_bare(kind, &name.name) {
                [only] => Some(only),
                _ => None,
            }),
        }
    }

    /// Resolve a reference to its node id. See [`NameTable::resolve_name`].
    pub fn resolve(&self, kind: NodeKind, name: &NameRef, default_schema: &str) -> Option<&NodeId> {
        self.resolve_name(kind, name, default_schema)
            .and_then(|q| self.lookup(kind, q))
    }

    pub fn len(&self) -> usize {
        self.qualified.len()
    }

    pub fn is_empty(&self) -> bool {
        self.qualified.is_empty()
    }
}
