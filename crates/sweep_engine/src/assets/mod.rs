//! Mesh sources for collision geometry

pub mod obj_loader;
pub mod tessellator;

pub use obj_loader::{ObjError, ObjLoader};
pub use tessellator::{tessellate, tessellate_to_triangles, TessellationError};
