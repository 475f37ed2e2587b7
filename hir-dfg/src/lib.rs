//! Data-flow-graph decomposition: splitting a [`Graph`] into its weakly
//! connected components, and extracting its strongly connected components
//! into their own sub-graphs so that combinational and sequential logic can
//! be scheduled separately downstream.
//!
//! The crate exposes two entry points, mirroring the two passes:
//!
//! * [`split`] partitions a graph along connectivity alone (C2).
//! * [`extract_cyclic`] additionally colors and extracts every strongly
//!   connected component (C3/C4/C5), leaving acyclic logic behind in the
//!   input graph.
//!
//! Both passes mutate the input graph down to empty or near-empty and hand
//! back the pieces as fresh [`Graph`] values; neither pass ever inspects a
//! vertex's payload beyond its discriminant (Variable/Constant/Operator) and
//! its edges, so any compiler IR that implements the arena contract in
//! [`graph`] can be decomposed this way.

mod component;
mod edge;
mod error;
mod extract;
mod graph;
mod ids;
mod merge;
mod naming;
mod scc;
mod state;
mod vertex;

#[cfg(test)]
mod tests;

pub use edge::EdgeData;
pub use error::DfgError;
pub use graph::{Graph, Scratch, ScratchScope};
pub use ids::{ComponentId, EdgeId, VertexId, RESIDUAL};
pub use vertex::{Scope, Symbol, VariableData, VariableSubKind, VertexKind, VertexListKind, VisibilityFlags};

use state::VertexStates;

/// Runtime knobs for [`extract_cyclic`].
///
/// Mirrors the shape of `midenc_hir_analysis::DataFlowConfig`: a small,
/// `Default`-able bag of flags rather than a builder, since this crate has
/// exactly one knob today.
#[derive(Debug, Clone, Copy)]
pub struct DecompositionConfig {
    /// Run the `checkEdges`/`checkGraph`-equivalent consistency checks
    /// around extraction. These walk every vertex and edge in the graph, so
    /// they cost real time on large designs; enable them in debug builds and
    /// tests, leave them off in release pipelines.
    pub verify: bool,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self { verify: cfg!(debug_assertions) }
    }
}

/// Partition `graph` into its weakly connected components (C2).
///
/// `label` disambiguates output graph names (pass `""` if the caller has no
/// need to); see [`component::split`] for the exact naming contract.
///
/// Every vertex in `graph` ends up in exactly one returned component, or is
/// dropped if it was unreachable from every variable (dead code). `graph`
/// itself is left empty.
pub fn split<M: Clone>(graph: &mut Graph<M>, label: &str) -> Vec<Graph<M>> {
    component::split(graph, label)
}

/// Extract every strongly connected component of `graph` into its own
/// sub-graph (C3 + C4 + C5), leaving purely acyclic logic behind.
///
/// Returns one [`Graph`] per non-trivial SCC found (a cyclic component that
/// is not wholly contained within a single variable's combinational fan-in,
/// per spec.md §4.3's triviality test). If none are found, returns an empty
/// vector and leaves `graph` completely untouched — the common case for a
/// design with no combinational-loop or latch-like feedback, and the reason
/// this short-circuits before paying for the merge/extract passes at all.
pub fn extract_cyclic<M: Clone>(
    graph: &mut Graph<M>,
    label: &str,
    config: &DecompositionConfig,
) -> Result<Vec<Graph<M>>, DfgError> {
    let mut scope = graph.scratch_scope();
    let g = &mut *scope;

    let mut states = VertexStates::default();
    let coloring = scc::color_sccs(g, &mut states);

    if coloring.non_trivial_sccs == 0 {
        log::debug!("no cyclic components found in {}", g.name());
        return Ok(Vec::new());
    }

    log::debug!("{} non-trivial SCC(s) found in {}", coloring.non_trivial_sccs, g.name());

    merge::merge_sccs(g, &mut states);
    let extraction =
        extract::extract_components(g, &mut states, coloring.non_trivial_sccs, label, config.verify)?;

    Ok(extraction.components)
}
