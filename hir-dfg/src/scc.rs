//! Strongly-connected-component coloring (C3): Pearce's algorithm, adapted
//! from `V3DfgDecomposition.cpp`'s `ExtractCyclicComponents::colorSCCs` /
//! `visitColorSCCs`.
//!
//! Three shortcuts avoid ever pushing a trivially-acyclic vertex onto the
//! traversal: constants (no inputs, I3) and "isolated" variables
//! (`arity() == 0 || !has_sinks()`) are colored `0` up front without
//! traversal, and any operator Pearce's DFS never reaches (because none of
//! its result is read, transitively, by a variable) is swept up afterwards.
//!
//! The recursive formulation in the source pass is rewritten here as an
//! explicit-stack traversal — spec.md's design notes license this rewrite
//! as long as the resulting color/merge order matches the recursive form,
//! which it does: each stack frame resumes exactly where the corresponding
//! recursive call would have, including the "after the recursive call
//! returns" index-adoption check against the still-open parent.

use crate::{
    graph::Graph,
    ids::VertexId,
    state::{VertexStates, UNASSIGNED},
};

/// Outcome of coloring: how many non-trivial SCCs (including self-looped
/// singletons) were discovered.
pub(crate) struct Coloring {
    pub non_trivial_sccs: u32,
}

pub(crate) fn color_sccs<M>(graph: &mut Graph<M>, states: &mut VertexStates) -> Coloring {
    let mut counter: u32 = 0;
    let mut non_trivial: u32 = 0;
    let mut scc_stack: Vec<VertexId> = Vec::new();

    for id in graph.constants().to_vec() {
        let st = states.alloc(graph, id);
        st.index = 0;
        st.component = 0;
    }

    for id in graph.variables().to_vec() {
        if graph.arity(id) == 0 || !graph.has_sinks(id) {
            let st = states.alloc(graph, id);
            st.index = 0;
            st.component = 0;
        } else if states.get(graph, id).index == UNASSIGNED {
            visit(graph, states, &mut counter, &mut non_trivial, &mut scc_stack, id);
        }
    }

    for id in graph.operators().to_vec() {
        if states.get(graph, id).index == UNASSIGNED {
            let st = states.get(graph, id);
            st.index = 0;
            st.component = 0;
        }
    }

    Coloring { non_trivial_sccs: non_trivial }
}

struct Frame {
    vtx: VertexId,
    root_index: u32,
    children: Vec<VertexId>,
    pos: usize,
}

fn visit<M>(
    graph: &mut Graph<M>,
    states: &mut VertexStates,
    counter: &mut u32,
    non_trivial: &mut u32,
    scc_stack: &mut Vec<VertexId>,
    seed: VertexId,
) {
    *counter += 1;
    states.get(graph, seed).index = *counter;
    let mut frames = vec![enter_frame(graph, seed, *counter)];

    while let Some(top) = frames.last_mut() {
        if top.pos < top.children.len() {
            let child = top.children[top.pos];
            top.pos += 1;

            let child_index = states.get(graph, child).index;
            if child_index == UNASSIGNED {
                *counter += 1;
                let new_index = *counter;
                states.get(graph, child).index = new_index;
                frames.push(enter_frame(graph, child, new_index));
            } else {
                adopt(graph, states, top.vtx, child);
            }
            continue;
        }

        let Frame { vtx, root_index, .. } = frames.pop().expect("frame present");
        finalize(graph, states, non_trivial, scc_stack, vtx, root_index);

        if let Some(parent) = frames.last() {
            adopt(graph, states, parent.vtx, vtx);
        }
    }
}

fn enter_frame<M>(graph: &Graph<M>, vtx: VertexId, root_index: u32) -> Frame {
    let mut children = Vec::new();
    graph.for_each_sink(vtx, |sink| children.push(sink));
    Frame { vtx, root_index, children, pos: 0 }
}

/// After visiting (or finding already-visited) `child` from `parent`, adopt
/// `child`'s index into `parent` if `child` is still an open (uncolored)
/// ancestor — the "if (childState.component == UNASSIGNED) { ... }" step.
fn adopt<M>(graph: &mut Graph<M>, states: &mut VertexStates, parent: VertexId, child: VertexId) {
    if states.get(graph, child).component != UNASSIGNED {
        return;
    }
    let child_index = states.get(graph, child).index;
    let parent_state = states.get(graph, parent);
    if parent_state.index > child_index {
        parent_state.index = child_index;
    }
}

fn finalize<M>(
    graph: &mut Graph<M>,
    states: &mut VertexStates,
    non_trivial: &mut u32,
    scc_stack: &mut Vec<VertexId>,
    vtx: VertexId,
    root_index: u32,
) {
    if states.get(graph, vtx).index != root_index {
        scc_stack.push(vtx);
        return;
    }

    let is_trivial = match scc_stack.last() {
        Some(&top) => states.get(graph, top).index < root_index,
        None => true,
    };
    let drives_self = graph.drives_self(vtx);

    if !is_trivial || drives_self {
        *non_trivial += 1;
        let component = *non_trivial;
        states.get(graph, vtx).component = component;
        while let Some(&top) = scc_stack.last() {
            if states.get(graph, top).index < root_index {
                break;
            }
            scc_stack.pop();
            states.get(graph, top).component = component;
        }
    } else {
        states.get(graph, vtx).component = 0;
    }
}
