//! Stackmap Core — graph data model, name registry, and query engine

pub mod aggregation;
pub mod error;
pub mod graph;
pub mod model;
pub mod query;
pub mod registry;

#[cfg(test)]
mod tests;

#[cfg(test)]
pub mod test_utils;

pub use aggregation::{ViewGraph, ViewNode, aggregate_edges, collapsed_view};
pub use error::{GraphError, Result};
pub use graph::Graph;
pub use model::{
    AggregatedEdge, EdgeKind, ExternalMeta, FunctionMeta, GraphEdge, GraphNode, NameRef, NodeData,
    NodeId, NodeKind, Provider, QualifiedName, TableMeta, WorkflowMeta,
};
pub use query::{Impact, QueryEngine};
pub use registry::NameTable;
