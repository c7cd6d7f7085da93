//! Swept box queries against an OBB tree
//!
//! The query box and its displacement are moved into the tree's frame, the
//! tree is walked to collect candidate triangles whose node boxes the sweep
//! can reach, and the exact swept test picks the earliest contact among them.

use crate::foundation::math::Vec3;
use crate::spatial::{NodeId, ObbTree};
use super::oriented_box::OrientedBox;
use super::sweep::{sweep_obb_obb, sweep_obb_triangle, SweepConfig, SweepHit};

/// Optional record of what a tree query touched
#[derive(Debug, Clone, Default)]
pub struct QueryTrace {
    /// Nodes whose box was tested
    pub visited: Vec<NodeId>,
    /// Nodes whose subtree was skipped because the sweep cannot reach its box
    pub pruned: Vec<NodeId>,
    /// Triangle indices handed to the exact test
    pub candidates: Vec<usize>,
}

impl QueryTrace {
    /// Create an empty trace
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything recorded so far
    pub fn clear(&mut self) {
        self.visited.clear();
        self.pruned.clear();
        self.candidates.clear();
    }
}

fn collect_candidates(
    tree: &ObbTree,
    id: NodeId,
    obb: &OrientedBox,
    displacement: &Vec3,
    config: &SweepConfig,
    candidates: &mut Vec<usize>,
    mut trace: Option<&mut QueryTrace>,
) {
    let node = tree.node(id);
    if let Some(trace) = trace.as_deref_mut() {
        trace.visited.push(id);
    }

    let node_box = node.bounding_box().inflated(tree.config().node_margin);
    if sweep_obb_obb(obb, displacement, &node_box, config).is_none() {
        if let Some(trace) = trace.as_deref_mut() {
            trace.pruned.push(id);
        }
        return;
    }

    match node.children() {
        Some([first, second]) => {
            collect_candidates(tree, first, obb, displacement, config, candidates, trace.as_deref_mut());
            collect_candidates(tree, second, obb, displacement, config, candidates, trace);
        }
        None => candidates.extend_from_slice(tree.triangle_indices(id)),
    }
}

/// Sweeps a world-space box by a world-space displacement against a mesh
///
/// Returns the earliest contact strictly inside the step, with its normal
/// in world space. `trace`, when given, receives the nodes visited and
/// pruned and the candidate triangles.
pub fn check_collision(
    obb: &OrientedBox,
    tree: &ObbTree,
    displacement: &Vec3,
    config: &SweepConfig,
    mut trace: Option<&mut QueryTrace>,
) -> Option<SweepHit> {
    let inverse = tree.inverse_transform();
    let local_box = obb.transformed(inverse);
    let local_displacement = inverse.transform_vector(displacement);
    // Distances shrink with the tree's scale; keep the tolerance in world units
    let local_config = SweepConfig {
        touch_epsilon: config.touch_epsilon * inverse.scale,
        ..*config
    };

    let mut candidates = Vec::new();
    collect_candidates(
        tree,
        tree.root(),
        &local_box,
        &local_displacement,
        &local_config,
        &mut candidates,
        trace.as_deref_mut(),
    );

    let mut earliest: Option<SweepHit> = None;
    for &index in &candidates {
        let triangle = tree.triangle(index);
        if let Some(hit) = sweep_obb_triangle(&local_box, &local_displacement, triangle, &local_config) {
            if earliest.map_or(true, |best| hit.portion < best.portion) {
                earliest = Some(hit);
            }
        }
    }

    if let Some(trace) = trace {
        trace.candidates.extend_from_slice(&candidates);
    }

    let hit = earliest.filter(|hit| hit.portion < SweepHit::NO_CONTACT)?;
    let world_normal = tree.transform().rotate_vector(&hit.normal);
    Some(SweepHit {
        portion: hit.portion,
        normal: world_normal.try_normalize(f32::EPSILON).unwrap_or(hit.normal),
    })
}
