use cranelift_entity::entity_impl;

/// Identifies a vertex within a single [`Graph`](crate::graph::Graph).
///
/// Vertex ids are only meaningful relative to the arena that allocated them;
/// when a vertex migrates to another graph (see [`crate::extract`]) it is
/// re-homed under a fresh id in the destination arena.
// `entity_impl!` provides `Display`/`Debug` (as `v<N>`/`e<N>`) and
// `EntityRef`; we only need to derive the comparison/storage traits.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(u32);
entity_impl!(VertexId, "v");

/// Identifies an edge within a single [`Graph`](crate::graph::Graph).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u32);
entity_impl!(EdgeId, "e");

/// A component id as produced by the colorers in [`crate::component`] and
/// [`crate::scc`].
///
/// `0` is reserved as the "unassigned" / "stays in the residual graph"
/// marker, matching the source pass's use of `size_t` user data where `0` is
/// the default value. Non-zero values are 1-based component numbers.
pub type ComponentId = u32;

/// The reserved component id meaning "not part of any extracted component".
pub const RESIDUAL: ComponentId = 0;
