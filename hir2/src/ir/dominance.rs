mod info;
pub mod nca;
mod traits;
mod tree;

pub use self::{
    info::{DominanceInfo, PostDominanceInfo, RegionDominanceInfo},
    traits::{Dominates, PostDominates},
    tree::{
        DomTreeError, DomTreeVerificationLevel, DominanceTree, PostDominanceTree,
        PostOrderDomTreeIter, PreOrderDomTreeIter,
    },
};
use self::{
    nca::{BatchUpdateInfo, SemiNCA},
    tree::{DomTreeBase, DomTreeNode, DomTreeRoots},
};
