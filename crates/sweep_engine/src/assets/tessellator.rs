//! Ear-clipping triangulation of planar polygons
//!
//! The contour is rotated so its plane faces +Z, projected to 2D and
//! clipped one ear at a time. Output triangles index into the input contour
//! and keep its winding.

use log::debug;
use thiserror::Error;

use crate::foundation::math::{Quat, Vec2, Vec3};
use crate::physics::collision::Triangle;

/// Cross products shorter than this (relative to the contour's size) are collinear
const COLLINEAR_EPSILON: f32 = 1.0e-6;

/// Reasons a contour could not be triangulated
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TessellationError {
    /// Fewer than three vertices
    #[error("Polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),
    /// All vertices are collinear or coincident
    #[error("Polygon has no area")]
    DegenerateContour,
    /// Clipping stalled in both windings
    #[error("No clippable ear found; polygon is probably self-intersecting")]
    NoEarFound,
}

/// Turn at `b` along `a -> b -> c`; positive for a left (counter-clockwise) turn
fn turn(a: &Vec2, b: &Vec2, c: &Vec2) -> f32 {
    let ab = b - a;
    let bc = c - b;
    ab.x * bc.y - ab.y * bc.x
}

/// Inclusive point test against a counter-clockwise triangle
fn in_triangle(point: &Vec2, a: &Vec2, b: &Vec2, c: &Vec2) -> bool {
    let edge = |from: &Vec2, to: &Vec2| (to.x - from.x) * (point.y - from.y) - (to.y - from.y) * (point.x - from.x);
    edge(a, b) >= 0.0 && edge(b, c) >= 0.0 && edge(c, a) >= 0.0
}

/// First non-degenerate normal found from consecutive edge pairs
fn contour_normal(contour: &[Vec3], epsilon: f32) -> Option<Vec3> {
    let n = contour.len();
    (0..n).find_map(|i| {
        let first = contour[(i + 1) % n] - contour[i];
        let second = contour[(i + 2) % n] - contour[(i + 1) % n];
        let normal = first.cross(&second);
        (normal.norm() > epsilon).then(|| normal.normalize())
    })
}

fn signed_area(points: &[Vec2]) -> f32 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum::<f32>()
        * 0.5
}

/// One clipping pass over counter-clockwise points
///
/// `None` when a full scan of the remaining vertices finds no ear.
fn clip_ears(points: &[Vec2], epsilon: f32) -> Option<Vec<[usize; 3]>> {
    let mut remaining: Vec<usize> = (0..points.len()).collect();
    let mut triangles = Vec::with_capacity(points.len().saturating_sub(2));

    while remaining.len() > 3 {
        let count = remaining.len();
        let mut clipped = false;

        for i in 0..count {
            let prev = remaining[(i + count - 1) % count];
            let current = remaining[i];
            let next = remaining[(i + 1) % count];
            let (a, b, c) = (&points[prev], &points[current], &points[next]);

            let bend = turn(a, b, c);
            if bend.abs() <= epsilon {
                // Collinear: the vertex adds nothing
                remaining.remove(i);
                clipped = true;
                break;
            }
            if bend < 0.0 {
                continue;
            }

            let blocked = remaining
                .iter()
                .filter(|&&other| other != prev && other != current && other != next)
                .any(|&other| in_triangle(&points[other], a, b, c));
            if blocked {
                continue;
            }

            triangles.push([prev, current, next]);
            remaining.remove(i);
            clipped = true;
            break;
        }

        if !clipped {
            return None;
        }
    }

    if let [a, b, c] = remaining[..] {
        if turn(&points[a], &points[b], &points[c]).abs() > epsilon {
            triangles.push([a, b, c]);
        }
    }
    Some(triangles)
}

/// Triangulates a simple, (nearly) planar closed contour
///
/// Returns index triples into `contour`, wound the same way as the contour.
pub fn tessellate(contour: &[Vec3]) -> Result<Vec<[usize; 3]>, TessellationError> {
    if contour.len() < 3 {
        return Err(TessellationError::TooFewVertices(contour.len()));
    }

    let (min, max) = contour.iter().fold((contour[0], contour[0]), |(min, max), p| (min.inf(p), max.sup(p)));
    let size = (max - min).norm_squared();
    let epsilon = COLLINEAR_EPSILON * size;

    let normal = contour_normal(contour, epsilon).ok_or(TessellationError::DegenerateContour)?;
    let rotation = Quat::rotation_between(&normal, &Vec3::z())
        .unwrap_or_else(|| Quat::from_axis_angle(&Vec3::x_axis(), std::f32::consts::PI));

    let mut points: Vec<Vec2> = contour.iter().map(|p| (rotation * p).xy()).collect();
    let area = signed_area(&points);
    if area.abs() <= epsilon {
        return Err(TessellationError::DegenerateContour);
    }
    // Clockwise in the projection; flipping Y makes it counter-clockwise
    // while the emitted index order still follows the contour
    if area < 0.0 {
        points.iter_mut().for_each(|p| p.y = -p.y);
    }

    if let Some(triangles) = clip_ears(&points, epsilon) {
        return Ok(triangles);
    }

    debug!("Ear clipping stalled on {} vertices, retrying with flipped winding", contour.len());
    points.iter_mut().for_each(|p| p.y = -p.y);
    let triangles = clip_ears(&points, epsilon).ok_or(TessellationError::NoEarFound)?;
    Ok(triangles.into_iter().map(|[a, b, c]| [a, c, b]).collect())
}

/// Triangulates `contour` straight into [`Triangle`]s
pub fn tessellate_to_triangles(contour: &[Vec3]) -> Result<Vec<Triangle>, TessellationError> {
    let indices = tessellate(contour)?;
    Ok(indices
        .into_iter()
        .map(|[a, b, c]| Triangle::new(contour[a], contour[b], contour[c]))
        .collect())
}
