//! Component extraction (C5): given a fully colored/merged graph, clones
//! variables at every component boundary, rewires edges that cross a
//! boundary to run through the clone, and bulk-migrates each component's
//! vertices into its own output graph.
//!
//! Grounded on `V3DfgDecomposition.cpp`'s `extractComponents`. Two asymmetric
//! rewiring rules apply per crossing edge, matched exactly from the source:
//!
//! * A variable's *source* edge that crosses into a foreign component is
//!   unlinked from the variable and relinked onto a clone that lives in the
//!   *source's* component (the producer keeps driving its own copy).
//! * A variable's *sink* edge that crosses into a foreign component is
//!   relinked to read from a clone that lives in the *sink's* component (the
//!   consumer reads its own copy).
//!
//! Newly created clones are appended to the live graph's variable list, so
//! the rewiring loop below snapshots the list length *before* iterating and
//! only walks that many entries — exactly the source's `lastp = varVertices().backp()`
//! trick for skipping vertices it creates as it goes.

use rustc_hash::FxHashMap;

use crate::{
    error::DfgError,
    graph::{migrate_subset, Graph},
    ids::{ComponentId, VertexId},
    state::VertexStates,
    vertex::VertexListKind,
};

/// Clone identity: an original variable paired with the foreign component it
/// now also needs to be visible in.
type CloneKey = (VertexId, ComponentId);

pub(crate) struct Extraction<M> {
    pub components: Vec<Graph<M>>,
}

pub(crate) fn extract_components<M: Clone>(
    graph: &mut Graph<M>,
    states: &mut VertexStates,
    non_trivial_sccs: u32,
    label: &str,
    verify: bool,
) -> Result<Extraction<M>, DfgError> {
    let parent_name = graph.name().to_string();
    let mut components: Vec<Graph<M>> = (0..non_trivial_sccs)
        .map(|i| Graph::new(crate::naming::component_name(&parent_name, label, i), graph.modulep().clone()))
        .collect();

    let mut clones: FxHashMap<CloneKey, VertexId> = FxHashMap::default();

    let boundary = graph.variables().len();
    for i in 0..boundary {
        let vtx = graph.variables()[i];
        fix_edges(graph, states, &mut clones, vtx);
    }

    if verify {
        check_edges(graph, states)?;
    }

    // As in `component::split`, snapshot all three kinds up front and migrate
    // each destination component's vertices in one `migrate_subset` call: an
    // edge commonly crosses kinds (a variable driven by an operator, an
    // operator reading a constant), so the id remap built inside
    // `migrate_subset` needs every vertex of the component visible at once.
    let mut snapshot = Vec::new();
    for kind in [VertexListKind::Variable, VertexListKind::Constant, VertexListKind::Operator] {
        snapshot.extend(graph.iterate_unlinkable(kind));
    }
    for (i, dest) in components.iter_mut().enumerate() {
        let target = (i + 1) as ComponentId;
        let subset: Vec<_> =
            snapshot.iter().copied().filter(|&id| states.component(graph, id) == target).collect();
        if !subset.is_empty() {
            migrate_subset(graph, dest, &subset);
        }
    }

    if verify {
        check_graph(graph, &components)?;
    }

    Ok(Extraction { components })
}

fn fix_edges<M>(
    graph: &mut Graph<M>,
    states: &mut VertexStates,
    clones: &mut FxHashMap<CloneKey, VertexId>,
    vtx: VertexId,
) {
    let component = states.component(graph, vtx);

    let mut source_edges = Vec::new();
    graph.for_each_source_edge(vtx, |eid, _slot| source_edges.push(eid));
    for eid in source_edges {
        let Some(src) = graph.edge_source(eid) else { continue };
        let src_component = states.component(graph, src);
        if src_component == component {
            continue;
        }
        graph.unlink_source(eid);
        let clone_id = get_clone(graph, states, clones, vtx, src_component);
        graph.set_source_at(clone_id, 0, Some(src));
    }

    let mut sink_edges = Vec::new();
    graph.for_each_sink_edge(vtx, |eid| sink_edges.push(eid));
    for eid in sink_edges {
        let sink = graph.edge_sink(eid);
        let sink_component = states.component(graph, sink);
        if sink_component == component {
            continue;
        }
        let clone_id = get_clone(graph, states, clones, vtx, sink_component);
        graph.relink_source(eid, clone_id);
    }
}

/// Return the clone of `original` that belongs to `foreign_component`,
/// creating it on first request. The clone is constructed in `graph` (the
/// still-undivided input graph) and migrated to its home component later,
/// alongside every other vertex of that component.
fn get_clone<M>(
    graph: &mut Graph<M>,
    states: &mut VertexStates,
    clones: &mut FxHashMap<CloneKey, VertexId>,
    original: VertexId,
    foreign_component: ComponentId,
) -> VertexId {
    debug_assert_ne!(
        states.component(graph, original),
        foreign_component,
        "vertex {original} is already in component {foreign_component}"
    );

    if let Some(&id) = clones.get(&(original, foreign_component)) {
        return id;
    }

    let binding = graph
        .variable(original)
        .unwrap_or_else(|| panic!("unhandled vertex variant during cloning: expected Variable"))
        .cloned_binding();
    let clone_id = graph.add_variable_clone(&binding);

    let state = states.alloc(graph, clone_id);
    state.index = 0;
    state.component = foreign_component;

    graph.variable_mut(original).expect("just checked is_variable").visibility.dfg_refs = true;
    graph.variable_mut(clone_id).expect("just created as a variable").visibility.dfg_refs = true;

    clones.insert((original, foreign_component), clone_id);
    clone_id
}

/// Consistency check run before migration: after `fix_edges` has rewired
/// every crossing edge through a same-component clone, no edge should span
/// two components any more.
fn check_edges<M>(graph: &Graph<M>, states: &VertexStates) -> Result<(), DfgError> {
    for id in graph.all_vertices() {
        let component = states.component(graph, id);
        let mut offender = None;
        graph.for_each_source(id, |src| {
            if offender.is_none() && states.component(graph, src) != component {
                offender = Some(src);
            }
        });
        if let Some(src) = offender {
            return Err(DfgError::EdgeCrossesComponent { source: src, sink: id });
        }
    }
    Ok(())
}

/// Consistency check run after migration: implements spec.md §4.5 step 5's
/// "graph closure check" (I1) for this arena-with-remapped-ids model.
///
/// An edge's `VertexId` source is always a valid index into *some* arena
/// slot in the graph it is observed in — `cranelift_entity` would panic on
/// an out-of-bounds index before this check could ever run — so indexing
/// validity alone proves nothing. What this model can still get wrong is
/// *membership*: a vertex can remain a live arena slot in a graph's
/// `PrimaryMap` after `Graph::remove_vertex` has delisted it (e.g. a vertex
/// that migrated elsewhere, or was otherwise detached), while an edge in
/// that same graph still numerically references its old slot. This check
/// walks every edge endpoint and confirms it is *present* (`Graph::contains`)
/// in the graph it is observed in, which is the literal translation of I1
/// into this arena's terms.
fn check_graph<M>(residual: &Graph<M>, components: &[Graph<M>]) -> Result<(), DfgError> {
    for g in core::iter::once(residual).chain(components.iter()) {
        for id in g.all_vertices() {
            let mut foreign = None;
            g.for_each_source(id, |src| {
                if foreign.is_none() && !g.contains(src) {
                    foreign = Some(src);
                }
            });
            if let Some(src) = foreign {
                return Err(DfgError::NonMemberEdgeEndpoint { vertex: src, graph: g.name().to_string() });
            }
        }
    }
    Ok(())
}
