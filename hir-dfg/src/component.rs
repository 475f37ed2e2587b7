//! Connected-component split (C2): partitions a graph into its weakly
//! connected components, one output graph per component.
//!
//! Grounded on `V3DfgDecomposition.cpp`'s `SplitIntoComponents`: a worklist
//! DFS over undirected adjacency (both `forEachSource` and `forEachSink`)
//! seeded from each uncolored variable, followed by three unlinkable passes
//! that either move a colored vertex into its destination or delete an
//! uncolored (unreachable from any variable) one.

use crate::{graph::{migrate_subset, Graph}, ids::ComponentId, naming, vertex::VertexListKind};

/// Split `graph` into its connected components, returning one output graph
/// per component in increasing discovery order (the order their seed
/// variables appear in `graph.variables()`).
///
/// `label` disambiguates the output names when a driver runs `split` more
/// than once over graphs sharing a base name; pass `""` when no
/// disambiguation is needed.
///
/// Leaves `graph` empty (I1): every vertex either lands in exactly one
/// output or is dropped as unreachable dead code.
pub fn split<M: Clone>(graph: &mut Graph<M>, label: &str) -> Vec<Graph<M>> {
    let mut scope = graph.scratch_scope();
    let g = &mut *scope;

    let mut next_component: ComponentId = 1;
    let seeds: Vec<_> = g.variables().to_vec();
    for seed in seeds {
        if !g.scratch(seed).is_unassigned() {
            continue;
        }
        color_component(g, seed, next_component);
        next_component += 1;
    }
    let count = next_component - 1;

    let parent_name = g.name().to_string();
    let mut components: Vec<Graph<M>> = (0..count)
        .map(|i| Graph::new(naming::component_name(&parent_name, label, i), g.modulep().clone()))
        .collect();

    // Snapshot all three lists up front and migrate each component's vertices
    // in a single `migrate_subset` call spanning variable/constant/operator
    // kinds together: an edge frequently crosses kinds (e.g. a variable
    // driven by an operator), so the id remap built inside `migrate_subset`
    // must see every vertex of the component at once, not just one kind's
    // worth of it.
    let mut snapshot = Vec::new();
    for kind in [VertexListKind::Variable, VertexListKind::Constant, VertexListKind::Operator] {
        snapshot.extend(g.iterate_unlinkable(kind));
    }

    for (i, dest) in components.iter_mut().enumerate() {
        let target = (i + 1) as ComponentId;
        let subset: Vec<_> = snapshot.iter().copied().filter(|&id| g.scratch(id).component() == target).collect();
        if !subset.is_empty() {
            migrate_subset(g, dest, &subset);
        }
    }

    for &id in &snapshot {
        if g.scratch(id).component() == 0 {
            g.unlink_and_delete(id);
        }
    }

    drop(scope);
    assert!(graph.is_empty(), "split left {} vertices behind in {}", graph.size(), graph.name());
    components
}

/// Worklist DFS over undirected adjacency, coloring every vertex reachable
/// from `seed` with `component`.
fn color_component<M>(g: &mut Graph<M>, seed: crate::ids::VertexId, component: ComponentId) {
    let mut worklist = vec![seed];
    while let Some(id) = worklist.pop() {
        if !g.scratch(id).is_unassigned() {
            continue;
        }
        let mut scratch = g.scratch(id);
        scratch.set_component(component);
        g.set_scratch(id, scratch);

        g.for_each_source(id, |src| worklist.push(src));
        g.for_each_sink(id, |sink| worklist.push(sink));
    }
}
