//! Per-vertex auxiliary state shared by [`crate::scc`], [`crate::merge`], and
//! [`crate::extract`]: Pearce's algorithm needs more than the one word a
//! vertex's [`crate::graph::Scratch`] slot holds directly, so each vertex's
//! scratch word instead carries a 1-based index into this side table (the
//! source pass's `getUser<VertexState*>()` indirection, spec.md §9).
//!
//! A single [`VertexStates`] table is allocated once per [`crate::extract_cyclic`]
//! call and threaded through coloring, merging, and extraction, exactly as
//! `ExtractCyclicComponents::m_stateStorage` is shared across its three
//! internal passes.

use crate::{
    graph::{Graph, Scratch},
    ids::VertexId,
};

/// Sentinel meaning "not yet assigned" for both [`VertexState::index`] and
/// [`VertexState::component`].
pub(crate) const UNASSIGNED: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
pub(crate) struct VertexState {
    /// Pearce's algorithm discovery index; `UNASSIGNED` until first visited.
    pub index: u32,
    /// Final (or provisional-root) SCC component id; `UNASSIGNED` until
    /// coloring resolves it, `0` for the residual (non-cyclic) partition.
    pub component: u32,
    /// Set once the SCC merge pass (C4) has visited this vertex.
    pub merged: bool,
}

impl Default for VertexState {
    fn default() -> Self {
        Self { index: UNASSIGNED, component: UNASSIGNED, merged: false }
    }
}

#[derive(Default)]
pub(crate) struct VertexStates(Vec<VertexState>);

impl VertexStates {
    fn index_of<M>(&mut self, graph: &mut Graph<M>, id: VertexId) -> usize {
        if let Some(i) = graph.scratch(id).as_state_index() {
            return i;
        }
        let i = self.0.len();
        self.0.push(VertexState::default());
        graph.set_scratch(id, Scratch::from_state_index(i));
        i
    }

    /// Allocate fresh state for `id`. Panics if `id` already has state, since
    /// every call site that uses `alloc` (rather than the lazy `get`) relies
    /// on this being the vertex's first visit.
    pub(crate) fn alloc<M>(&mut self, graph: &mut Graph<M>, id: VertexId) -> &mut VertexState {
        assert!(graph.scratch(id).as_state_index().is_none(), "vertex {id} state already allocated");
        let i = self.index_of(graph, id);
        &mut self.0[i]
    }

    /// Get this vertex's state, allocating a fresh (default) entry on first
    /// access.
    pub(crate) fn get<M>(&mut self, graph: &mut Graph<M>, id: VertexId) -> &mut VertexState {
        let i = self.index_of(graph, id);
        &mut self.0[i]
    }

    /// Read a vertex's resolved component id, assuming coloring has already
    /// run over the whole graph (every vertex has state by then).
    pub(crate) fn component<M>(&self, graph: &Graph<M>, id: VertexId) -> u32 {
        let i = graph
            .scratch(id)
            .as_state_index()
            .unwrap_or_else(|| panic!("vertex {id} has no SCC state"));
        self.0[i].component
    }
}
