use compact_str::CompactString;

use crate::ids::EdgeId;

/// An interned-style handle for the external symbol a [`Variable`] is
/// anchored to.
///
/// A real compiler front-end would intern these against a single table; this
/// crate treats the bound symbol as an opaque, cloneable value, since
/// identity (not layout) is all the decomposition algorithms care about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol(CompactString);

impl Symbol {
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl core::fmt::Display for Symbol {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<CompactString> for Symbol {
    fn from(name: CompactString) -> Self {
        Self(name)
    }
}

/// An optional lexical scope a [`Variable`] may be anchored under, e.g. a
/// module instance path. Variables with no scope are anchored directly at
/// module scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope(CompactString);

impl Scope {
    pub fn new(path: impl Into<CompactString>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

/// Which concrete shape a [`Variable`] vertex has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableSubKind {
    /// A scalar or bit-vector variable.
    Packed,
    /// An array (unpacked) variable.
    Array,
}

/// Reference-visibility flags carried by a [`Variable`].
///
/// These are advisory to this crate (it only ever sets `dfg_refs` on
/// originals and clones created at a cut point, per I4) but are preserved
/// across cloning since downstream passes rely on them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityFlags {
    /// Referenced by other logic within the same module.
    pub mod_refs: bool,
    /// Referenced from outside the module (e.g. a port).
    pub ext_refs: bool,
    /// Referenced from more than one DFG-graph (set on originals and clones
    /// alike once a cut is realized across them).
    pub dfg_refs: bool,
}

/// Data carried by a [`VertexKind::Variable`].
#[derive(Debug, Clone)]
pub struct VariableData {
    pub sub_kind: VariableSubKind,
    pub symbol: Symbol,
    pub scope: Option<Scope>,
    pub visibility: VisibilityFlags,
}

impl VariableData {
    pub(crate) fn cloned_binding(&self) -> Self {
        Self {
            sub_kind: self.sub_kind,
            symbol: self.symbol.clone(),
            scope: self.scope.clone(),
            // mod_refs/ext_refs copy to the clone; dfg_refs is set separately
            // on both original and clone by the extractor once the cut is
            // realized (see crate::extract::ComponentExtractor::clone_of).
            visibility: VisibilityFlags {
                mod_refs: self.visibility.mod_refs,
                ext_refs: self.visibility.ext_refs,
                dfg_refs: false,
            },
        }
    }
}

/// The discriminated shape of a vertex. See the module-level docs in
/// [`crate::graph`] for how vertices relate to edges.
#[derive(Debug, Clone)]
pub enum VertexKind {
    Variable(VariableData),
    Constant,
    Operator,
}

/// The owning-list each vertex is carried in; used to dispatch
/// `add_vertex`/`remove_vertex` to the right intrusive-order list (I2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexListKind {
    Variable,
    Constant,
    Operator,
}

/// Storage for a single vertex inside a [`crate::graph::Graph`]'s arena.
///
/// `inputs` holds the vertex's source edges (its fan-in, indexed by input
/// slot); `uses` holds its sink edges (the edges for which this vertex is
/// the producer). Both are small in the common case (operators rarely have
/// more than a handful of operands, and most variables have few readers),
/// hence `SmallVec`.
#[derive(Debug, Clone)]
pub struct VertexData {
    pub(crate) kind: VertexKind,
    pub(crate) inputs: smallvec::SmallVec<[EdgeId; 4]>,
    pub(crate) uses: smallvec::SmallVec<[EdgeId; 4]>,
}

impl VertexData {
    pub(crate) fn list_kind(&self) -> VertexListKind {
        match self.kind {
            VertexKind::Variable(_) => VertexListKind::Variable,
            VertexKind::Constant => VertexListKind::Constant,
            VertexKind::Operator => VertexListKind::Operator,
        }
    }

    pub(crate) fn is_variable(&self) -> bool {
        matches!(self.kind, VertexKind::Variable(_))
    }

    pub(crate) fn as_variable(&self) -> Option<&VariableData> {
        match &self.kind {
            VertexKind::Variable(data) => Some(data),
            _ => None,
        }
    }

    pub(crate) fn as_variable_mut(&mut self) -> Option<&mut VariableData> {
        match &mut self.kind {
            VertexKind::Variable(data) => Some(data),
            _ => None,
        }
    }

    /// Build the data for a clone of this vertex, bound to the same symbol.
    ///
    /// # Panics
    ///
    /// Panics if called on a non-`Variable` vertex: only variables are legal
    /// clone sources (I4), and an unhandled variant reaching this point is
    /// the "unhandled variant" fatal case from the error taxonomy (spec.md
    /// §7).
    pub(crate) fn clone_as_variable(&self) -> VariableData {
        self.as_variable()
            .unwrap_or_else(|| panic!("attempted to clone a non-variable vertex"))
            .cloned_binding()
    }
}
