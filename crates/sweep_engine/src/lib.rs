//! # Sweep Engine
//!
//! Continuous collision detection for oriented boxes moving through static
//! triangle meshes.
//!
//! ## Features
//!
//! - **OBB Tree**: principal-axis box hierarchy over a triangle soup
//! - **Swept SAT**: time of impact and contact normal for a box moving one step
//! - **Static Tests**: triangle-triangle, ray-box and ray-triangle intersection
//! - **Tessellation**: ear clipping of authored polygons into triangles
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sweep_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let triangles = ObjLoader::load_triangles("level.obj")?;
//!     let tree = ObbTree::new(triangles);
//!
//!     let player = OrientedBox::axis_aligned(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.6, 1.8, 0.6));
//!     let step = Vec3::new(0.0, -0.5, 0.0);
//!     if let Some(hit) = check_collision(&player, &tree, &step, &SweepConfig::default(), None) {
//!         let allowed = step * hit.portion;
//!         println!("moved {allowed:?}, blocked by {:?}", hit.normal);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod physics;
pub mod spatial;
pub mod assets;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        assets::{ObjError, ObjLoader, TessellationError, tessellate, tessellate_to_triangles},
        config::{CollisionConfig, Config, ConfigError},
        foundation::math::{Quat, RigidTransform, Vec3},
        physics::collision::{
            check_collision, sweep, triangles_intersect, OrientedBox, QueryTrace, Ray, SweepConfig, SweepHit,
            SweepTarget, Triangle,
        },
        spatial::{ObbTree, TreeConfig, TreeRayHit},
    };
}
