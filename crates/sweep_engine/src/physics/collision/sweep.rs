//! Swept separating-axis tests
//!
//! A box `A` moves by a displacement `W` over the unit time interval while
//! the other shape stays put. Every candidate axis narrows a running
//! `[min_time, max_time]` window; if the window ever empties the shapes never
//! meet. Otherwise contact starts at `min_time`, and the axis that last raised
//! the entry time is the contact normal.
//!
//! Axes where the projected speed is zero do not move the window; they only
//! require the static projections to overlap by more than the touch epsilon,
//! so a box resting on a floor can slide along it.

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;
use crate::spatial::ObbTree;
use super::oriented_box::OrientedBox;
use super::primitives::Triangle;
use super::tree_query::check_collision;

/// Projected speeds below this are treated as no motion along an axis
const MIN_AXIS_SPEED: f32 = 1.0e-7;

/// Enough room for 3 box axes, 4 triangle vectors and 12 crosses
const MAX_AXES: usize = 19;

/// Tolerances of the swept separating-axis test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Shapes closer than this along an axis and moving apart (or at rest)
    /// are treated as separated on that axis
    pub touch_epsilon: f32,

    /// Squared length below which a cross-product axis is skipped
    pub axis_epsilon: f32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            touch_epsilon: 1.0e-5,
            axis_epsilon: 1.0e-6,
        }
    }
}

/// First contact of a swept box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepHit {
    /// Fraction of the displacement travelled before contact, in `[0, 1)`
    pub portion: f32,
    /// Unit contact normal, opposing the direction of travel
    pub normal: Vec3,
}

impl SweepHit {
    /// Portion reported for a step with no contact
    pub const NO_CONTACT: f32 = 1.0;

    /// Portion of an optional hit, `1.0` when there was none
    pub fn portion_or_full(hit: Option<&Self>) -> f32 {
        hit.map_or(Self::NO_CONTACT, |h| h.portion)
    }
}

/// The shape a box is swept against
#[derive(Debug, Clone, Copy)]
pub enum SweepTarget<'a> {
    /// A single stationary triangle
    Triangle(&'a Triangle),
    /// A list of stationary triangles, earliest contact wins
    Triangles(&'a [Triangle]),
    /// A stationary box
    Box(&'a OrientedBox),
    /// A whole mesh through its OBB tree, in world space
    Tree(&'a ObbTree),
}

/// Sweeps `obb` by `displacement` against any supported target
pub fn sweep(
    obb: &OrientedBox,
    displacement: &Vec3,
    target: SweepTarget<'_>,
    config: &SweepConfig,
) -> Option<SweepHit> {
    match target {
        SweepTarget::Triangle(triangle) => sweep_obb_triangle(obb, displacement, triangle, config),
        SweepTarget::Triangles(triangles) => {
            sweep_obb_triangles(obb, displacement, triangles, config).map(|(_, hit)| hit)
        }
        SweepTarget::Box(other) => sweep_obb_obb(obb, displacement, other, config),
        SweepTarget::Tree(tree) => check_collision(obb, tree, displacement, config, None),
    }
}

/// Candidate separating axes, normalized, degenerate ones dropped
struct AxisSet {
    axes: [Vec3; MAX_AXES],
    len: usize,
}

impl AxisSet {
    fn new() -> Self {
        Self {
            axes: [Vec3::zeros(); MAX_AXES],
            len: 0,
        }
    }

    fn push(&mut self, axis: Vec3, min_norm_squared: f32) {
        debug_assert!(self.len < MAX_AXES);
        let norm_squared = axis.norm_squared();
        if norm_squared > min_norm_squared {
            self.axes[self.len] = axis / norm_squared.sqrt();
            self.len += 1;
        }
    }

    fn as_slice(&self) -> &[Vec3] {
        &self.axes[..self.len]
    }
}

/// Running time window plus bookkeeping for the contact normal
struct SweepWindow {
    min_time: f32,
    max_time: f32,
    best_entry: f32,
    entry_axis: Option<Vec3>,
    least_depth: f32,
    depth_axis: Option<Vec3>,
}

impl SweepWindow {
    fn new() -> Self {
        Self {
            min_time: 0.0,
            max_time: 1.0,
            best_entry: f32::NEG_INFINITY,
            entry_axis: None,
            least_depth: f32::INFINITY,
            depth_axis: None,
        }
    }

    /// Narrows the window along one axis; `false` means separated for the whole step
    fn narrow(
        &mut self,
        axis: &Vec3,
        moving: (f32, f32),
        fixed: (f32, f32),
        speed: f32,
        touch_epsilon: f32,
    ) -> bool {
        let (min1, max1) = moving;
        let (min2, max2) = fixed;

        if speed.abs() < MIN_AXIS_SPEED {
            let depth = (max1 - min2).min(max2 - min1);
            if depth <= touch_epsilon {
                return false;
            }
            if depth < self.least_depth {
                self.least_depth = depth;
                self.depth_axis = Some(*axis);
            }
            return true;
        }

        // Distance A must travel along the motion to clear B entirely
        let (entry_gap, exit_gap) = if speed > 0.0 {
            (min2 - max1, max2 - min1)
        } else {
            (max2 - min1, min2 - max1)
        };
        if exit_gap.abs() <= touch_epsilon || exit_gap * speed < 0.0 {
            return false;
        }

        let entry = entry_gap / speed;
        let exit = exit_gap / speed;

        if entry > self.best_entry {
            self.best_entry = entry;
            self.entry_axis = Some(*axis);
        }
        self.min_time = self.min_time.max(entry);
        self.max_time = self.max_time.min(exit);

        self.min_time < self.max_time
    }

    fn finish(self, displacement: &Vec3, separation: &Vec3, fallback: &Vec3) -> SweepHit {
        let mut normal = self.entry_axis.or(self.depth_axis).unwrap_or(*fallback);

        let along_motion = normal.dot(displacement);
        if along_motion.abs() >= MIN_AXIS_SPEED {
            if along_motion > 0.0 {
                normal = -normal;
            }
        } else if normal.dot(separation) < 0.0 {
            normal = -normal;
        }

        SweepHit {
            portion: self.min_time,
            normal,
        }
    }
}

/// Runs the window over every axis in `axes`
fn sweep_axes<F>(
    obb: &OrientedBox,
    displacement: &Vec3,
    axes: &[Vec3],
    project_fixed: F,
    fixed_center: &Vec3,
    config: &SweepConfig,
) -> Option<SweepHit>
where
    F: Fn(&Vec3) -> (f32, f32),
{
    let mut window = SweepWindow::new();

    for axis in axes {
        let moving = obb.project(axis);
        let fixed = project_fixed(axis);
        let speed = displacement.dot(axis);
        if !window.narrow(axis, moving, fixed, speed, config.touch_epsilon) {
            return None;
        }
    }

    let fallback = obb.axes()[0];
    Some(window.finish(displacement, &(obb.center - fixed_center), &fallback))
}

/// Swept box against a single stationary triangle
pub fn sweep_obb_triangle(
    obb: &OrientedBox,
    displacement: &Vec3,
    triangle: &Triangle,
    config: &SweepConfig,
) -> Option<SweepHit> {
    let edges = triangle.edges();
    let face_normal = triangle.scaled_normal();
    // Zero-area triangles (slivers, coincident points) are never hit
    let longest = edges.iter().map(Vec3::norm_squared).fold(0.0, f32::max);
    if face_normal.norm_squared() <= config.axis_epsilon * longest * longest {
        return None;
    }

    let box_axes = obb.axes();
    let triangle_vectors = [edges[0], edges[1], edges[2], face_normal];

    let mut axes = AxisSet::new();
    for axis in &box_axes {
        axes.push(*axis, config.axis_epsilon);
    }
    for vector in &triangle_vectors {
        axes.push(*vector, config.axis_epsilon);
    }
    for axis in &box_axes {
        // Box axes, face normal and these 9 crosses already form the complete
        // box-triangle axis set; crosses with the face normal add nothing
        for edge in &edges {
            if let Some(direction) = edge.try_normalize(f32::EPSILON) {
                axes.push(axis.cross(&direction), config.axis_epsilon);
            }
        }
    }

    let vertices = triangle.vertices();
    let project = |axis: &Vec3| {
        let d0 = vertices[0].dot(axis);
        let d1 = vertices[1].dot(axis);
        let d2 = vertices[2].dot(axis);
        (d0.min(d1).min(d2), d0.max(d1).max(d2))
    };

    sweep_axes(obb, displacement, axes.as_slice(), project, &triangle.centroid(), config)
}

/// Swept box against a list of triangles
///
/// Returns the index of the triangle with the earliest contact, and that contact.
pub fn sweep_obb_triangles(
    obb: &OrientedBox,
    displacement: &Vec3,
    triangles: &[Triangle],
    config: &SweepConfig,
) -> Option<(usize, SweepHit)> {
    let mut earliest: Option<(usize, SweepHit)> = None;

    for (index, triangle) in triangles.iter().enumerate() {
        if let Some(hit) = sweep_obb_triangle(obb, displacement, triangle, config) {
            let is_earlier = earliest.map_or(true, |(_, best)| hit.portion < best.portion);
            if is_earlier {
                earliest = Some((index, hit));
            }
        }
    }

    earliest.filter(|(_, hit)| hit.portion < SweepHit::NO_CONTACT)
}

/// Swept box against a stationary box
pub fn sweep_obb_obb(
    obb: &OrientedBox,
    displacement: &Vec3,
    other: &OrientedBox,
    config: &SweepConfig,
) -> Option<SweepHit> {
    let a_axes = obb.axes();
    let b_axes = other.axes();

    let mut axes = AxisSet::new();
    for axis in a_axes.iter().chain(b_axes.iter()) {
        axes.push(*axis, config.axis_epsilon);
    }
    for a in &a_axes {
        for b in &b_axes {
            axes.push(a.cross(b), config.axis_epsilon);
        }
    }

    sweep_axes(
        obb,
        displacement,
        axes.as_slice(),
        |axis| other.project(axis),
        &other.center,
        config,
    )
}

impl OrientedBox {
    /// Static overlap test: a zero-displacement sweep
    ///
    /// Boxes that only touch within the touch epsilon do not overlap.
    pub fn intersects(&self, other: &Self) -> bool {
        sweep_obb_obb(self, &Vec3::zeros(), other, &SweepConfig::default()).is_some()
    }
}
