//! Static triangle-triangle intersection (Möller 1997)
//!
//! Each triangle's vertices are classified against the other's plane; if
//! either triangle properly crosses the other's plane, both are clipped to
//! the planes' line of intersection and the two intervals compared.
//!
//! Contact convention: touching is not intersecting. A vertex or edge that
//! merely rests on the other triangle, triangles that share an edge or a
//! vertex, and intervals that meet at a single point all report `false`.
//! Coplanar triangles intersect only when their interiors overlap.

use crate::foundation::math::{Vec2, Vec3};
use super::primitives::Triangle;

/// Plane distances closer than this snap to exactly zero
const PLANE_SNAP_EPSILON: f32 = 1.0e-6;

/// Signed distances of `triangle`'s vertices to the plane of `other`
///
/// `None` when `other` is degenerate and has no plane.
fn plane_distances(triangle: &Triangle, other: &Triangle) -> Option<[f32; 3]> {
    let normal = other.scaled_normal().try_normalize(f32::EPSILON)?;
    let offset = -normal.dot(&other.p0);

    let mut distances = triangle.vertices().map(|v| normal.dot(&v) + offset);
    for d in &mut distances {
        if d.abs() < PLANE_SNAP_EPSILON {
            *d = 0.0;
        }
    }
    Some(distances)
}

/// Whether the distances have vertices strictly on both sides
fn crosses_plane(distances: &[f32; 3]) -> bool {
    distances.iter().any(|&d| d > 0.0) && distances.iter().any(|&d| d < 0.0)
}

/// Interval where a triangle crosses the line, given vertex projections
/// onto the line and signed distances to the other plane
fn line_interval(projections: [f32; 3], distances: [f32; 3]) -> (f32, f32) {
    let [d0, d1, d2] = distances;

    // The vertex alone on its side of the plane
    let lone = if d0 * d1 > 0.0 {
        2
    } else if d0 * d2 > 0.0 {
        1
    } else if d1 * d2 > 0.0 || d0 != 0.0 {
        0
    } else if d1 != 0.0 {
        1
    } else {
        2
    };
    let others = [(lone + 1) % 3, (lone + 2) % 3];

    let [t0, t1] = others.map(|other| {
        let p = projections[lone];
        p + (projections[other] - p) * distances[lone] / (distances[lone] - distances[other])
    });
    (t0.min(t1), t0.max(t1))
}

/// 2D orientation of `c` relative to the directed line `a -> b`
fn orient(a: &Vec2, b: &Vec2, c: &Vec2) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn strictly_inside(point: &Vec2, tri: &[Vec2; 3]) -> bool {
    let o0 = orient(&tri[0], &tri[1], point);
    let o1 = orient(&tri[1], &tri[2], point);
    let o2 = orient(&tri[2], &tri[0], point);
    (o0 > 0.0 && o1 > 0.0 && o2 > 0.0) || (o0 < 0.0 && o1 < 0.0 && o2 < 0.0)
}

fn segments_cross(a: &Vec2, b: &Vec2, c: &Vec2, d: &Vec2) -> bool {
    orient(a, b, c) * orient(a, b, d) < 0.0 && orient(c, d, a) * orient(c, d, b) < 0.0
}

/// Interior overlap of two triangles lying in the same plane
fn coplanar_overlap(first: &Triangle, second: &Triangle) -> bool {
    let normal = first.scaled_normal();
    let abs = normal.abs();
    // Drop the dominant normal component
    let (i, j) = if abs.x >= abs.y && abs.x >= abs.z {
        (1, 2)
    } else if abs.y >= abs.z {
        (0, 2)
    } else {
        (0, 1)
    };
    let project = |v: Vec3| Vec2::new(v[i], v[j]);
    let a = first.vertices().map(project);
    let b = second.vertices().map(project);

    for k in 0..3 {
        for l in 0..3 {
            if segments_cross(&a[k], &a[(k + 1) % 3], &b[l], &b[(l + 1) % 3]) {
                return true;
            }
        }
    }

    let centroid_a = (a[0] + a[1] + a[2]) / 3.0;
    let centroid_b = (b[0] + b[1] + b[2]) / 3.0;
    a.iter().any(|p| strictly_inside(p, &b))
        || b.iter().any(|p| strictly_inside(p, &a))
        || strictly_inside(&centroid_a, &b)
        || strictly_inside(&centroid_b, &a)
}

/// Whether two triangles intersect (see the module docs for touching contacts)
pub fn triangles_intersect(first: &Triangle, second: &Triangle) -> bool {
    let Some(du) = plane_distances(first, second) else {
        return false;
    };
    if du == [0.0; 3] {
        return first.area() > 0.0 && coplanar_overlap(first, second);
    }
    if !crosses_plane(&du) {
        return false;
    }

    let Some(dv) = plane_distances(second, first) else {
        return false;
    };
    if !crosses_plane(&dv) {
        return false;
    }

    // Project onto the line through its largest component
    let direction = first.scaled_normal().cross(&second.scaled_normal());
    let axis = direction.iamax();
    let first_projection = first.vertices().map(|v| v[axis]);
    let second_projection = second.vertices().map(|v| v[axis]);

    let (min1, max1) = line_interval(first_projection, du);
    let (min2, max2) = line_interval(second_projection, dv);

    max1.min(max2) - min1.max(min2) > 0.0
}

impl Triangle {
    /// Static intersection test against another triangle
    pub fn intersects_triangle(&self, other: &Self) -> bool {
        triangles_intersect(self, other)
    }
}
