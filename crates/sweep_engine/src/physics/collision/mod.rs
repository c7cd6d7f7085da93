//! Collision detection against triangle meshes
//!
//! Provides exact narrow-phase tests and swept box queries, with an OBB tree
//! for pruning mesh triangles.
//!
//! # Module Organization
//!
//! - [`primitives`] - Rays, axis-aligned boxes and triangles
//! - [`oriented_box`] - The moving collider value type
//! - [`triangle_intersection`] - Static triangle-triangle overlap
//! - [`sweep`] - Swept separating-axis tests
//! - [`tree_query`] - Tree-pruned swept queries
//!
//! # Frames
//!
//! Tree geometry stays in its authoring frame. Queries move the box and its
//! displacement into that frame and map the resulting normal back out, so
//! moving a mesh never requires a rebuild.

pub mod primitives;
pub mod oriented_box;
pub mod triangle_intersection;
pub mod sweep;
pub mod tree_query;

// Re-export commonly used types
pub use primitives::{Aabb, Ray, Triangle, TriangleRayHit};
pub use oriented_box::OrientedBox;
pub use triangle_intersection::triangles_intersect;
pub use sweep::{
    sweep, sweep_obb_obb, sweep_obb_triangle, sweep_obb_triangles,
    SweepConfig, SweepHit, SweepTarget,
};
pub use tree_query::{check_collision, QueryTrace};
