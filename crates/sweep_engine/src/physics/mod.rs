//! Physics module for collision detection
//!
//! Answers whether and when a moving box hits a mesh or another box. Collision
//! response (clamping the step, sliding along the normal) is left to callers.

pub mod collision;

#[cfg(test)]
mod tests;

pub use collision::{
    check_collision,
    sweep,
    OrientedBox,
    QueryTrace,
    Ray,
    SweepConfig,
    SweepHit,
    SweepTarget,
    Triangle,
};
