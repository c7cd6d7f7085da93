//! Cross-module tests for the collision core
//!
//! Property checks of the swept test (symmetry, monotonicity) and mesh
//! scenarios run through the OBB tree.

mod mesh_scenarios;
