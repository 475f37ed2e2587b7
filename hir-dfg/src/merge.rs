//! SCC merge (C4): from every operator that Pearce's algorithm assigned to a
//! non-trivial SCC, flood-fills outward along both source and sink edges,
//! absorbing every reachable operator into the same component — but halts at
//! variable vertices, since a variable is always a legal cut boundary
//! (spec.md I3/I4) and the merge must never cross one.
//!
//! Grounded on `V3DfgDecomposition.cpp`'s `mergeSCCs`/`visitMergeSCCs`. The
//! source's recursion is a simple reachability flood-fill with a
//! visit-once guard; the final partition it computes does not depend on
//! traversal order, so this is implemented as an explicit worklist rather
//! than mirroring call-stack shape vertex-for-vertex (unlike [`crate::scc`],
//! whose *discovery order* is externally observable through component
//! numbering).

use crate::{graph::Graph, ids::VertexId, state::VertexStates};

pub(crate) fn merge_sccs<M>(graph: &mut Graph<M>, states: &mut VertexStates) {
    for id in graph.operators().to_vec() {
        let target = states.component(graph, id);
        if target != 0 {
            merge_from(graph, states, id, target);
        }
    }
}

fn merge_from<M>(graph: &mut Graph<M>, states: &mut VertexStates, seed: VertexId, target: u32) {
    let mut worklist = vec![seed];
    while let Some(id) = worklist.pop() {
        // Variables are cut boundaries (I3/I4): the merge never crosses one,
        // so it neither recurses past it nor overwrites the coloring it
        // already carries from `color_sccs`.
        if graph.is_variable(id) {
            continue;
        }

        let st = states.get(graph, id);
        if st.merged {
            continue;
        }
        st.merged = true;
        st.component = target;

        let mut neighbors = Vec::new();
        graph.for_each_source(id, |src| neighbors.push(src));
        graph.for_each_sink(id, |sink| neighbors.push(sink));
        for n in neighbors {
            if !states.get(graph, n).merged {
                worklist.push(n);
            }
        }
    }
}
