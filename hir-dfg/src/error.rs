//! Decomposition errors.
//!
//! Every variant here is, per spec.md §7, non-recoverable in practice: they
//! only fire when [`crate::DecompositionConfig::verify`] is enabled and one
//! of the collaborator contracts (Graph/Vertex/Edge) was violated by the
//! caller before the pass ran. Ordinary callers never see these; they exist
//! so debug builds and tests can catch a broken invariant with a diagnosable
//! message instead of a silently wrong partition.

use crate::ids::VertexId;

#[derive(Debug, thiserror::Error)]
pub enum DfgError {
    #[error("edge from {source} to {sink} crosses a component boundary after rewiring")]
    EdgeCrossesComponent { source: VertexId, sink: VertexId },

    #[error("vertex {vertex} is referenced by an edge in graph {graph} but is not a member of it")]
    NonMemberEdgeEndpoint { vertex: VertexId, graph: String },
}
