//! The graph substrate (component C1): vertex/edge arenas, the three
//! intrusive-order vertex lists, and the scoped per-vertex scratch slot.
//!
//! Vertices and edges live in per-graph [`cranelift_entity::PrimaryMap`]
//! arenas, addressed by stable [`VertexId`]/[`EdgeId`] handles (see
//! spec.md §9's "arena with stable vertex ids" design note). Moving a vertex
//! to another graph does not relocate it in place (arenas are append-only,
//! like `cranelift_entity`'s); instead the destination graph allocates a
//! fresh id and copies the vertex's data across, remapping any edges that
//! move alongside it. This trades the original pointer-stable intrusive list
//! (which allows true O(1) in-place relocation) for arena-safety; see
//! `DESIGN.md` for the full rationale.

use cranelift_entity::{PrimaryMap, SecondaryMap};

use crate::{
    edge::EdgeData,
    ids::{ComponentId, EdgeId, VertexId},
    vertex::{VariableData, VariableSubKind, VertexData, VertexKind, VertexListKind},
};

/// One machine word of per-vertex scratch storage.
///
/// The word is reused for two distinct purposes across the pipeline, mirroring
/// the source pass's trick of storing either a `size_t` component number or a
/// pointer to auxiliary state in the same user-data word (spec.md §9):
///
/// * During [`crate::component::split`], the word directly holds a
///   [`ComponentId`] (`0` meaning "unvisited").
/// * During [`crate::scc`]/[`crate::merge`], the word holds a 1-based index
///   into a side table of richer per-vertex state (`0` meaning "no state
///   allocated yet"), since Pearce's algorithm needs more than one word of
///   state (`index`, `component`, `merged`) per vertex.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Scratch(u32);

impl Scratch {
    pub const ZERO: Scratch = Scratch(0);

    #[inline]
    pub fn component(self) -> ComponentId {
        self.0
    }

    #[inline]
    pub fn set_component(&mut self, component: ComponentId) {
        self.0 = component;
    }

    #[inline]
    pub fn is_unassigned(self) -> bool {
        self.0 == 0
    }

    /// Interpret the word as a 1-based index into a side state table, or
    /// `None` if no state has been allocated yet.
    #[inline]
    pub fn as_state_index(self) -> Option<usize> {
        (self.0 != 0).then(|| (self.0 - 1) as usize)
    }

    #[inline]
    pub fn from_state_index(index: usize) -> Self {
        let idx = u32::try_from(index).expect("state arena exceeded u32 capacity");
        Scratch(idx + 1)
    }
}

/// An RAII guard produced by [`Graph::scratch_scope`]. While live, every
/// vertex in the graph exposes a zero-initialized, user-assignable
/// [`Scratch`] word; on drop, every slot reverts to [`Scratch::ZERO`] (I5).
pub struct ScratchScope<'g, M> {
    graph: &'g mut Graph<M>,
}

impl<M> core::ops::Deref for ScratchScope<'_, M> {
    type Target = Graph<M>;

    fn deref(&self) -> &Graph<M> {
        self.graph
    }
}

impl<M> core::ops::DerefMut for ScratchScope<'_, M> {
    fn deref_mut(&mut self) -> &mut Graph<M> {
        self.graph
    }
}

impl<M> Drop for ScratchScope<'_, M> {
    fn drop(&mut self) {
        self.graph.scratch = SecondaryMap::new();
        self.graph.scratch_active = false;
    }
}

/// A named, mutable data-flow graph over [`VertexKind::Variable`],
/// [`VertexKind::Constant`], and [`VertexKind::Operator`] vertices, connected
/// by [`EdgeData`] edges.
///
/// `M` is the opaque "module handle" type a real front-end would use to
/// associate a graph with the design module it was lowered from; this crate
/// never inspects it beyond copying it into extracted sub-graphs.
pub struct Graph<M> {
    name: compact_str::CompactString,
    module: M,
    vertices: PrimaryMap<VertexId, VertexData>,
    edges: PrimaryMap<EdgeId, EdgeData>,
    variables: Vec<VertexId>,
    constants: Vec<VertexId>,
    operators: Vec<VertexId>,
    present: SecondaryMap<VertexId, bool>,
    scratch: SecondaryMap<VertexId, Scratch>,
    scratch_active: bool,
}

impl<M> Graph<M> {
    pub fn new(name: impl Into<compact_str::CompactString>, module: M) -> Self {
        Self {
            name: name.into(),
            module,
            vertices: PrimaryMap::new(),
            edges: PrimaryMap::new(),
            variables: Vec::new(),
            constants: Vec::new(),
            operators: Vec::new(),
            present: SecondaryMap::new(),
            scratch: SecondaryMap::new(),
            scratch_active: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modulep(&self) -> &M {
        &self.module
    }

    pub fn size(&self) -> usize {
        self.variables.len() + self.constants.len() + self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn variables(&self) -> &[VertexId] {
        &self.variables
    }

    pub fn constants(&self) -> &[VertexId] {
        &self.constants
    }

    pub fn operators(&self) -> &[VertexId] {
        &self.operators
    }

    /// All vertices currently resident in the graph, variables first, then
    /// constants, then operators (the order the decomposition passes
    /// themselves walk the graph in).
    pub fn all_vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.variables.iter().chain(&self.constants).chain(&self.operators).copied()
    }

    fn list(&self, kind: VertexListKind) -> &Vec<VertexId> {
        match kind {
            VertexListKind::Variable => &self.variables,
            VertexListKind::Constant => &self.constants,
            VertexListKind::Operator => &self.operators,
        }
    }

    fn list_mut(&mut self, kind: VertexListKind) -> &mut Vec<VertexId> {
        match kind {
            VertexListKind::Variable => &mut self.variables,
            VertexListKind::Constant => &mut self.constants,
            VertexListKind::Operator => &mut self.operators,
        }
    }

    /// Snapshot of a vertex list, safe to iterate while calling
    /// `remove_vertex`/`unlink_and_delete` on the current item (the source
    /// pass's `list.unlinkable()`).
    pub fn iterate_unlinkable(&self, kind: VertexListKind) -> Vec<VertexId> {
        self.list(kind).clone()
    }

    pub fn contains(&self, id: VertexId) -> bool {
        self.present.get(id).copied().unwrap_or(false)
    }

    fn vertex(&self, id: VertexId) -> &VertexData {
        debug_assert!(self.contains(id), "vertex {id} is not a member of graph {}", self.name);
        &self.vertices[id]
    }

    fn vertex_mut(&mut self, id: VertexId) -> &mut VertexData {
        debug_assert!(self.contains(id), "vertex {id} is not a member of graph {}", self.name);
        &mut self.vertices[id]
    }

    // ---------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------

    pub fn add_variable(
        &mut self,
        sub_kind: VariableSubKind,
        symbol: impl Into<crate::vertex::Symbol>,
        scope: Option<crate::vertex::Scope>,
    ) -> VertexId {
        let id = self.vertices.push(VertexData {
            kind: VertexKind::Variable(VariableData {
                sub_kind,
                symbol: symbol.into(),
                scope,
                visibility: Default::default(),
            }),
            inputs: Default::default(),
            uses: Default::default(),
        });
        let eid = self.edges.push(EdgeData::new(id, 0));
        self.vertices[id].inputs.push(eid);
        self.variables.push(id);
        self.present[id] = true;
        id
    }

    pub fn add_constant(&mut self) -> VertexId {
        let id = self
            .vertices
            .push(VertexData { kind: VertexKind::Constant, inputs: Default::default(), uses: Default::default() });
        self.constants.push(id);
        self.present[id] = true;
        id
    }

    pub fn add_operator(&mut self, arity: usize) -> VertexId {
        let id = self
            .vertices
            .push(VertexData { kind: VertexKind::Operator, inputs: Default::default(), uses: Default::default() });
        for slot in 0..arity {
            let eid = self.edges.push(EdgeData::new(id, slot as u8));
            self.vertices[id].inputs.push(eid);
        }
        self.operators.push(id);
        self.present[id] = true;
        id
    }

    /// Create an uninitialized variable clone bound to the same symbol,
    /// stamped with its own single (initially disconnected) driver slot.
    /// Used by [`crate::extract`] at cut points (I4).
    pub(crate) fn add_variable_clone(&mut self, original: &VariableData) -> VertexId {
        let id = self.vertices.push(VertexData {
            kind: VertexKind::Variable(original.clone()),
            inputs: Default::default(),
            uses: Default::default(),
        });
        let eid = self.edges.push(EdgeData::new(id, 0));
        self.vertices[id].inputs.push(eid);
        self.variables.push(id);
        self.present[id] = true;
        id
    }

    // ---------------------------------------------------------------
    // Teardown
    // ---------------------------------------------------------------

    /// Detach `id` from whichever list currently holds it, without
    /// destroying it. Used when migrating a vertex elsewhere.
    pub fn remove_vertex(&mut self, id: VertexId) {
        let kind = self.vertex(id).list_kind();
        let list = self.list_mut(kind);
        if let Some(pos) = list.iter().position(|&v| v == id) {
            list.remove(pos);
        }
        self.present[id] = false;
    }

    /// Detach `id` from every edge it participates in (as either endpoint)
    /// and remove it from the graph. Used for dead (unreachable) vertices.
    pub fn unlink_and_delete(&mut self, id: VertexId) {
        let inputs: smallvec::SmallVec<[EdgeId; 4]> = self.vertex(id).inputs.clone();
        for eid in inputs {
            self.unlink_source(eid);
        }
        let uses: smallvec::SmallVec<[EdgeId; 4]> = self.vertex(id).uses.clone();
        for eid in uses {
            self.unlink_source(eid);
        }
        self.remove_vertex(id);
    }

    // ---------------------------------------------------------------
    // Vertex contract
    // ---------------------------------------------------------------

    pub fn is_variable(&self, id: VertexId) -> bool {
        self.vertex(id).is_variable()
    }

    pub fn variable(&self, id: VertexId) -> Option<&VariableData> {
        self.vertex(id).as_variable()
    }

    pub fn variable_mut(&mut self, id: VertexId) -> Option<&mut VariableData> {
        self.vertex_mut(id).as_variable_mut()
    }

    pub fn arity(&self, id: VertexId) -> usize {
        self.vertex(id).inputs.len()
    }

    pub fn has_sinks(&self, id: VertexId) -> bool {
        !self.vertex(id).uses.is_empty()
    }

    pub fn find_sink(&self, id: VertexId, mut pred: impl FnMut(VertexId) -> bool) -> bool {
        self.vertex(id).uses.iter().any(|&eid| pred(self.edges[eid].sink))
    }

    /// True iff `id` appears among its own sinks (a direct self-assignment
    /// like `a = a`), the extra non-triviality test from spec.md §4.3.
    pub fn drives_self(&self, id: VertexId) -> bool {
        self.find_sink(id, |sink| sink == id)
    }

    pub fn for_each_source(&self, id: VertexId, mut f: impl FnMut(VertexId)) {
        for &eid in &self.vertex(id).inputs {
            if let Some(src) = self.edges[eid].source {
                f(src);
            }
        }
    }

    pub fn for_each_sink(&self, id: VertexId, mut f: impl FnMut(VertexId)) {
        for &eid in &self.vertex(id).uses {
            f(self.edges[eid].sink);
        }
    }

    pub fn for_each_source_edge(&self, id: VertexId, mut f: impl FnMut(EdgeId, usize)) {
        for (slot, &eid) in self.vertex(id).inputs.iter().enumerate() {
            f(eid, slot);
        }
    }

    pub fn for_each_sink_edge(&self, id: VertexId, mut f: impl FnMut(EdgeId)) {
        for &eid in &self.vertex(id).uses {
            f(eid);
        }
    }

    // ---------------------------------------------------------------
    // Edge contract
    // ---------------------------------------------------------------

    pub fn edge_source(&self, eid: EdgeId) -> Option<VertexId> {
        self.edges[eid].source
    }

    pub fn edge_sink(&self, eid: EdgeId) -> VertexId {
        self.edges[eid].sink
    }

    pub fn edge_slot(&self, eid: EdgeId) -> usize {
        self.edges[eid].slot as usize
    }

    /// Make `eid`'s source empty, removing it from its former source's use
    /// list if it had one.
    pub fn unlink_source(&mut self, eid: EdgeId) {
        if let Some(old_src) = self.edges[eid].source.take() {
            let uses = &mut self.vertices[old_src].uses;
            if let Some(pos) = uses.iter().position(|&e| e == eid) {
                uses.remove(pos);
            }
        }
    }

    /// Atomically swap `eid`'s source for `new_source`.
    pub fn relink_source(&mut self, eid: EdgeId, new_source: VertexId) {
        self.unlink_source(eid);
        self.edges[eid].source = Some(new_source);
        self.vertices[new_source].uses.push(eid);
    }

    /// Set (or clear) the source of the edge occupying `sink`'s `slot`-th
    /// input.
    pub fn set_source_at(&mut self, sink: VertexId, slot: usize, src: Option<VertexId>) {
        let eid = self.vertex(sink).inputs[slot];
        match src {
            Some(s) => self.relink_source(eid, s),
            None => self.unlink_source(eid),
        }
    }

    pub fn connect(&mut self, source: VertexId, sink: VertexId, slot: usize) {
        self.set_source_at(sink, slot, Some(source));
    }

    // ---------------------------------------------------------------
    // Scratch slot
    // ---------------------------------------------------------------

    /// Activate the per-vertex scratch slot for the duration of the
    /// returned guard. Panics (I5) if already active.
    pub fn scratch_scope(&mut self) -> ScratchScope<'_, M> {
        assert!(!self.scratch_active, "scratch already active for graph {}", self.name);
        self.scratch_active = true;
        ScratchScope { graph: self }
    }

    pub fn scratch(&self, id: VertexId) -> Scratch {
        assert!(self.scratch_active, "scratch slot is not active for graph {}", self.name);
        self.scratch.get(id).copied().unwrap_or_default()
    }

    pub fn set_scratch(&mut self, id: VertexId, value: Scratch) {
        assert!(self.scratch_active, "scratch slot is not active for graph {}", self.name);
        self.scratch[id] = value;
    }
}

/// Bulk-migrate a self-contained subset of `src`'s vertices into `dest`,
/// re-homing every vertex under a fresh id in `dest`'s arena and remapping
/// every edge that is entirely internal to the subset along with them
/// (spec.md §9: "moves across graphs transfer ids between arenas").
///
/// `ids_in_order` must list the *entire* subset destined for `dest` in
/// `src`'s intrinsic list order — variable, constant, and operator vertices
/// together, not one kind at a time. The id remap built below only covers
/// what's in `ids_in_order`, so a caller that migrates one kind per call
/// would leave the remap blind to any edge crossing kinds (an operator
/// driving a variable, the common case), and the "edge source escapes
/// migrated subset" panic a few lines down would fire on ordinary input.
/// Every edge whose *sink* lies in the subset is carried along, so the
/// subset must already be closed under "my source, if foreign, has been
/// cut" — true once [`crate::extract`]'s edge rewiring has run, or trivially
/// true for [`crate::component::split`], which never crosses variable
/// boundaries at all.
///
/// Leaves the migrated vertices detached (but not deleted) in `src`; the
/// caller is expected to have already decided `ids_in_order` are destined to
/// leave `src` for good.
pub(crate) fn migrate_subset<M>(src: &mut Graph<M>, dest: &mut Graph<M>, ids_in_order: &[VertexId]) {
    let mut old_to_new = rustc_hash::FxHashMap::default();

    for &old_id in ids_in_order {
        let kind = src.vertices[old_id].kind.clone();
        let new_id =
            dest.vertices.push(VertexData { kind, inputs: Default::default(), uses: Default::default() });
        dest.list_mut(src.vertices[old_id].list_kind()).push(new_id);
        dest.present[new_id] = true;
        old_to_new.insert(old_id, new_id);
    }

    for &old_id in ids_in_order {
        let new_sink = old_to_new[&old_id];
        let old_inputs = src.vertices[old_id].inputs.clone();
        for old_eid in old_inputs {
            let old_edge = src.edges[old_eid];
            let new_source = old_edge.source.map(|s| {
                *old_to_new
                    .get(&s)
                    .unwrap_or_else(|| panic!("edge source {s} escapes migrated subset"))
            });
            let new_eid = dest.edges.push(EdgeData { source: new_source, sink: new_sink, slot: old_edge.slot });
            dest.vertices[new_sink].inputs.push(new_eid);
            if let Some(new_source) = new_source {
                dest.vertices[new_source].uses.push(new_eid);
            }
        }
    }

    for &old_id in ids_in_order {
        src.remove_vertex(old_id);
    }
}
