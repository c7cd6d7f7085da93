//! Spatial partitioning data structures
//!
//! Provides the OBB tree used to prune triangle candidates for swept
//! queries and ray picking against a mesh.

mod jacobi;
mod obb_tree;

pub use jacobi::{jacobi_eigen, SymmetricEigen3};
pub use obb_tree::{NodeId, ObbTree, ObbTreeNode, TreeConfig, TreeRayHit};
