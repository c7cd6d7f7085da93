//! Oriented bounding box tree over a triangle soup
//!
//! Each node fits a box to its triangles along the principal axes of their
//! area-weighted covariance, then splits the triangles at the median of
//! their centroids along the longest box axis that actually separates them.
//! Nodes live in an arena and own a contiguous range of a shared
//! triangle-index permutation, so siblings never share triangles.

use std::ops::Range;

use log::{debug, warn};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::foundation::math::{Mat3, Quat, RigidTransform, Rotation3, Vec3};
use crate::physics::collision::{OrientedBox, Ray, Triangle};
use super::jacobi::jacobi_eigen;

/// Triangle area below which a soup is treated as having no area at all
const MIN_TOTAL_AREA: f64 = 1.0e-12;

/// Configuration for OBB tree construction and pruning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Jacobi sweeps before the best iterate is accepted as-is
    pub jacobi_max_sweeps: usize,

    /// Convergence threshold, relative to the covariance's Frobenius norm
    pub jacobi_tolerance: f64,

    /// Padding added around node boxes when pruning swept queries
    pub node_margin: f32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            jacobi_max_sweeps: 50,
            jacobi_tolerance: 1.0e-10,
            node_margin: 1.0e-4,
        }
    }
}

/// Handle to a node in an [`ObbTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the tree's arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// Single node in the tree hierarchy
#[derive(Debug, Clone)]
pub struct ObbTreeNode {
    /// Box center in the tree's local frame
    pub center: Vec3,

    /// Box axes as a rotation
    pub orientation: Quat,

    /// Half extents along the box's own axes
    pub half_dimensions: Vec3,

    /// Depth in the tree (0 = root)
    pub depth: u32,

    /// Slice of the tree's triangle permutation owned by this node
    range: Range<usize>,

    /// Both children or neither
    children: Option<[NodeId; 2]>,
}

impl ObbTreeNode {
    /// Check if this node is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// The two children of an internal node
    pub fn children(&self) -> Option<[NodeId; 2]> {
        self.children
    }

    /// Number of triangles under this node
    pub fn triangle_count(&self) -> usize {
        self.range.len()
    }

    /// The node's box as an [`OrientedBox`] in the tree's local frame
    pub fn bounding_box(&self) -> OrientedBox {
        OrientedBox::from_half_extents(self.center, self.orientation, self.half_dimensions)
    }
}

/// Nearest triangle hit by a ray cast through the tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeRayHit {
    /// World-space distance along the ray
    pub distance: f32,
    /// World-space hit point
    pub point: Vec3,
    /// Index of the triangle in the soup
    pub triangle: usize,
    /// World-space face normal, facing against the ray
    pub normal: Vec3,
}

/// Hierarchical OBB index over a triangle mesh
#[derive(Debug, Clone)]
pub struct ObbTree {
    triangles: Vec<Triangle>,
    areas: Vec<f32>,
    means: Vec<Vec3>,
    weighted_means: Vec<Vec3>,

    /// Permutation of triangle indices, partitioned by the nodes
    order: Vec<usize>,
    nodes: Vec<ObbTreeNode>,

    transform: RigidTransform,
    inverse: RigidTransform,
    config: TreeConfig,
    unconverged_fits: usize,
}

impl ObbTree {
    /// Build a tree with the default configuration
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Self::build(triangles, TreeConfig::default())
    }

    /// Build a tree over `triangles`, which it takes ownership of
    pub fn build(triangles: Vec<Triangle>, config: TreeConfig) -> Self {
        let areas: Vec<f32> = triangles.iter().map(Triangle::area).collect();
        let means: Vec<Vec3> = triangles.iter().map(Triangle::centroid).collect();
        let weighted_means = means.iter().zip(&areas).map(|(mean, area)| mean * *area).collect();

        let count = triangles.len();
        let mut tree = Self {
            triangles,
            areas,
            means,
            weighted_means,
            order: (0..count).collect(),
            nodes: Vec::with_capacity(count.saturating_mul(2).max(1)),
            transform: RigidTransform::identity(),
            inverse: RigidTransform::identity(),
            config,
            unconverged_fits: 0,
        };

        tree.build_node(0..count, 0);

        if tree.unconverged_fits > 0 {
            warn!(
                "OBB tree: {} node fits used an unconverged eigenbasis",
                tree.unconverged_fits
            );
        }
        debug!(
            "Built OBB tree: {} triangles, {} nodes, {} leaves, depth {}",
            count,
            tree.node_count(),
            tree.leaf_count(),
            tree.depth()
        );

        tree
    }

    fn build_node(&mut self, range: Range<usize>, depth: u32) -> NodeId {
        let (center, orientation, half_dimensions) = self.fit_box(range.clone());

        let id = NodeId(self.nodes.len());
        self.nodes.push(ObbTreeNode {
            center,
            orientation,
            half_dimensions,
            depth,
            range: range.clone(),
            children: None,
        });

        if range.len() > 1 {
            if let Some(split) = self.split(range.clone(), &orientation, &half_dimensions) {
                let first = self.build_node(range.start..split, depth + 1);
                let second = self.build_node(split..range.end, depth + 1);
                self.nodes[id.0].children = Some([first, second]);
            }
        }

        id
    }

    /// Area-weighted reference point of a triangle subset
    fn reference_point(&self, indices: &[usize]) -> (Vector3<f64>, f64) {
        let total_area: f64 = indices.iter().map(|&i| f64::from(self.areas[i])).sum();

        if total_area > MIN_TOTAL_AREA {
            let sum = indices
                .iter()
                .fold(Vector3::<f64>::zeros(), |acc, &i| acc + self.weighted_means[i].cast::<f64>());
            (sum / total_area, total_area)
        } else {
            let sum = indices
                .iter()
                .fold(Vector3::<f64>::zeros(), |acc, &i| acc + self.means[i].cast::<f64>());
            (sum / indices.len() as f64, total_area)
        }
    }

    /// Second-moment covariance of the triangles about `u`
    fn covariance(&self, indices: &[usize], u: &Vector3<f64>, total_area: f64) -> Matrix3<f64> {
        let mut covariance = Matrix3::<f64>::zeros();

        if total_area > MIN_TOTAL_AREA {
            // Integral over each triangle's surface, weighted by its area
            for &i in indices {
                let area = f64::from(self.areas[i]);
                let m = self.means[i].cast::<f64>() - u;
                let mut moment = m * m.transpose() * 9.0;
                for vertex in self.triangles[i].vertices() {
                    let d = vertex.cast::<f64>() - u;
                    moment += d * d.transpose();
                }
                covariance += moment * (area / 12.0);
            }
            covariance / total_area
        } else {
            // Zero-area soup: plain covariance of the vertices
            for &i in indices {
                for vertex in self.triangles[i].vertices() {
                    let d = vertex.cast::<f64>() - u;
                    covariance += d * d.transpose();
                }
            }
            covariance / (3 * indices.len()) as f64
        }
    }

    /// Principal axes of a subset as a proper rotation
    fn principal_axes(&mut self, indices: &[usize]) -> Quat {
        let (u, total_area) = self.reference_point(indices);
        let covariance = self.covariance(indices, &u, total_area);

        let eigen = jacobi_eigen(&covariance, self.config.jacobi_max_sweeps, self.config.jacobi_tolerance);
        if !eigen.converged {
            self.unconverged_fits += 1;
        }

        let basis: Mat3 = eigen.eigenvectors.cast::<f32>();
        orthonormal_rotation(&basis).unwrap_or_else(Quat::identity)
    }

    fn fit_box(&mut self, range: Range<usize>) -> (Vec3, Quat, Vec3) {
        if range.is_empty() {
            return (Vec3::zeros(), Quat::identity(), Vec3::zeros());
        }

        let indices: Vec<usize> = self.order[range].to_vec();
        let orientation = self.principal_axes(&indices);

        let mut min = Vec3::repeat(f32::INFINITY);
        let mut max = Vec3::repeat(f32::NEG_INFINITY);
        for &i in &indices {
            for vertex in self.triangles[i].vertices() {
                let local = orientation.inverse_transform_vector(&vertex);
                min = min.inf(&local);
                max = max.sup(&local);
            }
        }

        let center = orientation * ((min + max) * 0.5);
        let half_dimensions = (max - min) * 0.5;
        (center, orientation, half_dimensions)
    }

    /// Partitions the range at the median centroid projection
    ///
    /// Axes are tried from the longest box dimension down; returns the split
    /// point of the first axis leaving both sides non-empty.
    fn split(&mut self, range: Range<usize>, orientation: &Quat, half_dimensions: &Vec3) -> Option<usize> {
        let rotation = orientation.to_rotation_matrix();
        let mut axis_order = [0usize, 1, 2];
        axis_order.sort_by(|&a, &b| half_dimensions[b].total_cmp(&half_dimensions[a]));

        for axis_index in axis_order {
            let axis: Vec3 = rotation.matrix().column(axis_index).into_owned();
            let means = &self.means;
            let slice = &mut self.order[range.clone()];

            let mut projections: Vec<f32> = slice.iter().map(|&i| means[i].dot(&axis)).collect();
            let mid = projections.len() / 2;
            let (_, median, _) = projections.select_nth_unstable_by(mid, f32::total_cmp);
            let median = *median;

            let mut below = 0;
            for j in 0..slice.len() {
                if means[slice[j]].dot(&axis) < median {
                    slice.swap(below, j);
                    below += 1;
                }
            }

            if below > 0 && below < slice.len() {
                return Some(range.start + below);
            }
        }

        None
    }

    /// Replace the tree-to-world transform; the tree itself is not rebuilt
    pub fn set_transform(&mut self, transform: RigidTransform) {
        debug_assert!(
            transform.scale.is_finite() && transform.scale > 0.0,
            "OBB tree transform needs a positive uniform scale"
        );
        self.transform = transform;
        self.inverse = transform.inverse();
    }

    /// Tree-to-world transform
    pub fn transform(&self) -> &RigidTransform {
        &self.transform
    }

    /// World-to-tree transform
    pub fn inverse_transform(&self) -> &RigidTransform {
        &self.inverse
    }

    /// Construction settings
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// The triangle soup, in the tree's local frame
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// One triangle of the soup
    pub fn triangle(&self, index: usize) -> &Triangle {
        &self.triangles[index]
    }

    /// Area of a triangle
    pub fn area(&self, index: usize) -> f32 {
        self.areas[index]
    }

    /// Centroid of a triangle
    pub fn mean(&self, index: usize) -> Vec3 {
        self.means[index]
    }

    /// The root node's handle
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> &ObbTreeNode {
        &self.nodes[id.0]
    }

    /// Every node in build order (parents before children)
    pub fn nodes(&self) -> &[ObbTreeNode] {
        &self.nodes
    }

    /// Triangle indices owned by a node
    pub fn triangle_indices(&self, id: NodeId) -> &[usize] {
        &self.order[self.nodes[id.0].range.clone()]
    }

    /// Total node count
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Leaf node count
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    /// Depth of the deepest node
    pub fn depth(&self) -> u32 {
        self.nodes.iter().map(|node| node.depth).max().unwrap_or(0)
    }

    /// Node fits that stopped at the sweep cap
    pub fn unconverged_fits(&self) -> usize {
        self.unconverged_fits
    }

    /// Handles of all leaf nodes
    pub fn leaves(&self) -> Vec<NodeId> {
        (0..self.nodes.len())
            .map(NodeId)
            .filter(|&id| self.nodes[id.0].is_leaf())
            .collect()
    }

    /// Checks the partition and coverage invariants
    ///
    /// Every internal node's triangles are exactly its children's, and the
    /// leaves together hold every triangle once.
    pub fn validate(&self) -> bool {
        for node in &self.nodes {
            if let Some([first, second]) = node.children {
                let a = &self.nodes[first.0].range;
                let b = &self.nodes[second.0].range;
                let disjoint_union = a.start == node.range.start && a.end == b.start && b.end == node.range.end;
                if !disjoint_union || a.is_empty() || b.is_empty() {
                    return false;
                }
            }
        }

        let mut seen = vec![false; self.triangles.len()];
        for leaf in self.leaves() {
            for &index in self.triangle_indices(leaf) {
                if index >= seen.len() || seen[index] {
                    return false;
                }
                seen[index] = true;
            }
        }
        seen.into_iter().all(|covered| covered)
    }

    /// Nearest triangle along a world-space ray
    pub fn intersect_ray(&self, ray: &Ray) -> Option<TreeRayHit> {
        if self.triangles.is_empty() {
            return None;
        }

        let local_ray = Ray {
            origin: self.inverse.transform_point(&ray.origin),
            direction: self.inverse.rotate_vector(&ray.direction),
        };

        let mut nearest: Option<(f32, usize)> = None;
        let mut stack = vec![self.root()];

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            let Some(entry) = node.bounding_box().intersect_ray(&local_ray) else {
                continue;
            };
            if nearest.is_some_and(|(best, _)| entry > best) {
                continue;
            }

            match node.children {
                Some(children) => stack.extend(children),
                None => {
                    for &index in self.triangle_indices(id) {
                        if let Some(hit) = self.triangles[index].intersect_ray(&local_ray, true) {
                            if nearest.map_or(true, |(best, _)| hit.t < best) {
                                nearest = Some((hit.t, index));
                            }
                        }
                    }
                }
            }
        }

        let (local_t, index) = nearest?;
        let distance = local_t * self.transform.scale;
        let mut normal = self.transform.rotate_vector(&self.triangles[index].normal());
        if normal.dot(&ray.direction) > 0.0 {
            normal = -normal;
        }

        Some(TreeRayHit {
            distance,
            point: ray.point_at(distance),
            triangle: index,
            normal,
        })
    }
}

/// Turns a near-orthonormal basis into a rotation, fixing handedness
fn orthonormal_rotation(basis: &Mat3) -> Option<Quat> {
    let x = basis.column(0).into_owned().try_normalize(f32::EPSILON)?;
    let y_raw: Vec3 = basis.column(1).into_owned();
    let y = (y_raw - x * x.dot(&y_raw)).try_normalize(f32::EPSILON)?;
    let z = x.cross(&y);

    let rotation = Rotation3::from_matrix_unchecked(Mat3::from_columns(&[x, y, z]));
    Some(Quat::from_rotation_matrix(&rotation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// A flat grid of `n * n` quads (two triangles each) in the XZ plane
    fn grid(n: usize, spacing: f32) -> Vec<Triangle> {
        let mut triangles = Vec::new();
        for i in 0..n {
            for j in 0..n {
                let x = i as f32 * spacing;
                let z = j as f32 * spacing;
                let a = Vec3::new(x, 0.0, z);
                let b = Vec3::new(x + spacing, 0.0, z);
                let c = Vec3::new(x + spacing, 0.0, z + spacing);
                let d = Vec3::new(x, 0.0, z + spacing);
                triangles.push(Triangle::new(a, b, c));
                triangles.push(Triangle::new(a, c, d));
            }
        }
        triangles
    }

    /// Closed axis-aligned box surface
    fn box_mesh(half: Vec3) -> Vec<Triangle> {
        let corner = |sx: f32, sy: f32, sz: f32| Vec3::new(sx * half.x, sy * half.y, sz * half.z);
        let quads = [
            [corner(-1.0, -1.0, -1.0), corner(1.0, -1.0, -1.0), corner(1.0, 1.0, -1.0), corner(-1.0, 1.0, -1.0)],
            [corner(-1.0, -1.0, 1.0), corner(-1.0, 1.0, 1.0), corner(1.0, 1.0, 1.0), corner(1.0, -1.0, 1.0)],
            [corner(-1.0, -1.0, -1.0), corner(-1.0, 1.0, -1.0), corner(-1.0, 1.0, 1.0), corner(-1.0, -1.0, 1.0)],
            [corner(1.0, -1.0, -1.0), corner(1.0, -1.0, 1.0), corner(1.0, 1.0, 1.0), corner(1.0, 1.0, -1.0)],
            [corner(-1.0, -1.0, -1.0), corner(-1.0, -1.0, 1.0), corner(1.0, -1.0, 1.0), corner(1.0, -1.0, -1.0)],
            [corner(-1.0, 1.0, -1.0), corner(1.0, 1.0, -1.0), corner(1.0, 1.0, 1.0), corner(-1.0, 1.0, 1.0)],
        ];
        quads
            .iter()
            .flat_map(|q| [Triangle::new(q[0], q[1], q[2]), Triangle::new(q[0], q[2], q[3])])
            .collect()
    }

    fn assert_containment(tree: &ObbTree) {
        for (index, node) in tree.nodes().iter().enumerate() {
            let obb = node.bounding_box();
            for &tri in tree.triangle_indices(NodeId(index)) {
                for vertex in tree.triangle(tri).vertices() {
                    assert!(
                        obb.contains_point(&vertex, 1e-3),
                        "vertex {vertex:?} escapes node {index}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_empty_mesh_is_single_leaf() {
        let tree = ObbTree::new(Vec::new());
        assert_eq!(tree.node_count(), 1);
        assert!(tree.node(tree.root()).is_leaf());
        assert!(tree.validate());
        assert!(tree.intersect_ray(&Ray::new(Vec3::zeros(), Vec3::x())).is_none());
    }

    #[test]
    fn test_single_triangle_is_leaf() {
        let tree = ObbTree::new(vec![Triangle::new(Vec3::zeros(), Vec3::x(), Vec3::y())]);
        let root = tree.node(tree.root());

        assert!(root.is_leaf());
        assert_eq!(root.triangle_count(), 1);
        assert_containment(&tree);
    }

    #[test]
    fn test_grid_partition_and_coverage() {
        let tree = ObbTree::new(grid(8, 1.0));

        assert!(tree.validate());
        assert_eq!(tree.triangle_indices(tree.root()).len(), 128);
        // Full binary tree: every split produces exactly two children
        assert_eq!(tree.node_count(), 2 * tree.leaf_count() - 1);
        let covered: usize = tree.leaves().iter().map(|&leaf| tree.node(leaf).triangle_count()).sum();
        assert_eq!(covered, 128);
        assert!(tree.leaf_count() > 32);
        assert!(tree.depth() >= 5);
    }

    #[test]
    fn test_every_internal_node_has_two_children() {
        let tree = ObbTree::new(box_mesh(Vec3::new(1.0, 2.0, 3.0)));
        for node in tree.nodes() {
            match node.children() {
                Some([a, b]) => {
                    assert!(tree.node(a).triangle_count() >= 1);
                    assert!(tree.node(b).triangle_count() >= 1);
                    assert_eq!(
                        tree.node(a).triangle_count() + tree.node(b).triangle_count(),
                        node.triangle_count()
                    );
                }
                None => assert!(node.triangle_count() >= 1),
            }
        }
    }

    #[test]
    fn test_unconverged_fits_still_bound_their_triangles() {
        let config = TreeConfig {
            jacobi_max_sweeps: 0,
            ..Default::default()
        };
        let mut triangles = box_mesh(Vec3::new(1.0, 2.0, 3.0));
        let tilt = Quat::from_axis_angle(&Vec3::x_axis(), 0.4);
        for triangle in &mut triangles {
            let [a, b, c] = triangle.vertices();
            *triangle = Triangle::new(tilt * a, tilt * b, tilt * c);
        }
        let tree = ObbTree::build(triangles, config);

        assert!(tree.unconverged_fits() > 0);
        assert!(tree.validate());
        assert_containment(&tree);
    }

    #[test]
    fn test_node_boxes_contain_their_triangles() {
        assert_containment(&ObbTree::new(box_mesh(Vec3::new(1.0, 2.0, 3.0))));
        assert_containment(&ObbTree::new(grid(5, 0.5)));
    }

    #[test]
    fn test_root_box_follows_long_axis() {
        // A long thin strip rotated 30 degrees in the XZ plane
        let rotation = Quat::from_axis_angle(&Vec3::y_axis(), std::f32::consts::FRAC_PI_6);
        let triangles: Vec<Triangle> = (0..20)
            .map(|i| {
                let x = i as f32;
                Triangle::new(
                    rotation * Vec3::new(x, 0.0, 0.0),
                    rotation * Vec3::new(x + 1.0, 0.0, 0.0),
                    rotation * Vec3::new(x + 0.5, 0.0, 0.5),
                )
            })
            .collect();
        let tree = ObbTree::new(triangles);
        let root = tree.node(tree.root());

        let longest = root.half_dimensions.imax();
        let axis: Vec3 = root.orientation.to_rotation_matrix().matrix().column(longest).into_owned();
        let expected = rotation * Vec3::x();
        assert_relative_eq!(axis.dot(&expected).abs(), 1.0, epsilon = 1e-4);
        assert_relative_eq!(root.half_dimensions[longest], 10.0, epsilon = 1e-3);
    }

    #[test]
    fn test_coincident_triangles_stay_in_one_leaf() {
        let tri = Triangle::new(Vec3::zeros(), Vec3::x(), Vec3::z());
        let tree = ObbTree::new(vec![tri; 4]);
        let root = tree.node(tree.root());

        assert!(root.is_leaf());
        assert_eq!(root.triangle_count(), 4);
        assert!(tree.validate());
    }

    #[test]
    fn test_degenerate_soup_still_builds() {
        // Zero-area slivers along a line
        let triangles: Vec<Triangle> = (0..6)
            .map(|i| {
                let x = i as f32;
                Triangle::new(Vec3::new(x, 0.0, 0.0), Vec3::new(x + 0.5, 0.0, 0.0), Vec3::new(x + 1.0, 0.0, 0.0))
            })
            .collect();
        let tree = ObbTree::new(triangles);
        assert!(tree.validate());
        assert_containment(&tree);
    }

    #[test]
    fn test_derived_arrays_are_parallel() {
        let triangles = box_mesh(Vec3::new(1.0, 1.0, 1.0));
        let tree = ObbTree::new(triangles.clone());
        for (i, tri) in triangles.iter().enumerate() {
            assert_relative_eq!(tree.area(i), tri.area(), epsilon = 1e-6);
            assert_relative_eq!(tree.mean(i), tri.centroid(), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_ray_picks_nearest_face() {
        let mut tree = ObbTree::new(box_mesh(Vec3::new(1.0, 1.0, 1.0)));
        let ray = Ray::new(Vec3::new(0.2, 0.1, -10.0), Vec3::z());
        let hit = tree.intersect_ray(&ray).unwrap();

        assert_relative_eq!(hit.distance, 9.0, epsilon = 1e-4);
        assert_relative_eq!(hit.normal, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-5);

        // Move the mesh: shift 5 along z and double its size
        tree.set_transform(RigidTransform::new(Quat::identity(), 2.0, Vec3::new(0.0, 0.0, 5.0)));
        let moved = tree.intersect_ray(&ray).unwrap();
        assert_relative_eq!(moved.distance, 13.0, epsilon = 1e-3);
        assert_relative_eq!(moved.point, Vec3::new(0.2, 0.1, 3.0), epsilon = 1e-3);
    }

    #[test]
    fn test_ray_misses_mesh() {
        let tree = ObbTree::new(box_mesh(Vec3::new(1.0, 1.0, 1.0)));
        let ray = Ray::new(Vec3::new(5.0, 5.0, -10.0), Vec3::z());
        assert!(tree.intersect_ray(&ray).is_none());
    }
}
