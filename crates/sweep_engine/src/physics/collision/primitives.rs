//! Primitive collision shapes and intersection algorithms
//!
//! Provides basic geometric primitives (rays, axis-aligned boxes, triangles)
//! with exact intersection tests used for picking and validation.

use crate::foundation::math::Vec3;

/// Determinant magnitude below which a ray counts as parallel to a triangle
const PARALLEL_EPSILON: f32 = 1.0e-6;

/// Slack applied when validating a slab-test candidate against the other axes
const SLAB_EPSILON: f32 = 1.0e-5;

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// The origin point of the ray
    pub origin: Vec3,
    /// The direction of the ray (normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given half extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Slab test
    ///
    /// Returns the ray parameter of the entry point, `0.0` when the origin is
    /// already inside. Each axis facing the origin from outside proposes its
    /// near plane; the largest proposal wins and is then checked against the
    /// other two slabs.
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let mut inside = true;
        let mut candidate_plane = [0.0f32; 3];
        let mut outside_axis = [false; 3];

        for axis in 0..3 {
            if ray.origin[axis] < self.min[axis] {
                candidate_plane[axis] = self.min[axis];
                outside_axis[axis] = true;
                inside = false;
            } else if ray.origin[axis] > self.max[axis] {
                candidate_plane[axis] = self.max[axis];
                outside_axis[axis] = true;
                inside = false;
            }
        }

        if inside {
            return Some(0.0);
        }

        let mut best_axis = 0;
        let mut best_t = -1.0f32;
        for axis in 0..3 {
            if outside_axis[axis] && ray.direction[axis] != 0.0 {
                let t = (candidate_plane[axis] - ray.origin[axis]) / ray.direction[axis];
                if t > best_t {
                    best_t = t;
                    best_axis = axis;
                }
            }
        }

        if best_t < 0.0 {
            return None;
        }

        let hit = ray.point_at(best_t);
        for axis in 0..3 {
            if axis == best_axis {
                continue;
            }
            if hit[axis] < self.min[axis] - SLAB_EPSILON || hit[axis] > self.max[axis] + SLAB_EPSILON {
                return None;
            }
        }

        Some(best_t)
    }
}

/// Hit reported by [`Triangle::intersect_ray`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleRayHit {
    /// Ray parameter of the hit
    pub t: f32,
    /// Weight of `p1`
    pub u: f32,
    /// Weight of `p2`
    pub v: f32,
}

/// A triangle of the collision soup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// First vertex
    pub p0: Vec3,
    /// Second vertex
    pub p1: Vec3,
    /// Third vertex
    pub p2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(p0: Vec3, p1: Vec3, p2: Vec3) -> Self {
        Self { p0, p1, p2 }
    }

    /// The three vertices in order
    pub fn vertices(&self) -> [Vec3; 3] {
        [self.p0, self.p1, self.p2]
    }

    /// Edge vectors `p1-p0`, `p2-p1`, `p0-p2`
    pub fn edges(&self) -> [Vec3; 3] {
        [self.p1 - self.p0, self.p2 - self.p1, self.p0 - self.p2]
    }

    /// Unnormalized face normal (right-hand rule), length is twice the area
    pub fn scaled_normal(&self) -> Vec3 {
        (self.p1 - self.p0).cross(&(self.p2 - self.p0))
    }

    /// Unit face normal, zero for a degenerate triangle
    pub fn normal(&self) -> Vec3 {
        self.scaled_normal()
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vec3::zeros)
    }

    /// Surface area
    pub fn area(&self) -> f32 {
        0.5 * self.scaled_normal().norm()
    }

    /// Calculates the centroid (center point) of the triangle
    pub fn centroid(&self) -> Vec3 {
        (self.p0 + self.p1 + self.p2) / 3.0
    }

    /// Möller-Trumbore ray-triangle intersection
    ///
    /// With `two_sided` false, hits from behind the face (against the
    /// winding) are culled. Hits behind the ray origin never count.
    pub fn intersect_ray(&self, ray: &Ray, two_sided: bool) -> Option<TriangleRayHit> {
        let edge1 = self.p1 - self.p0;
        let edge2 = self.p2 - self.p0;

        let h = ray.direction.cross(&edge2);
        let det = edge1.dot(&h);

        if two_sided {
            if det.abs() < PARALLEL_EPSILON {
                return None;
            }
        } else if det < PARALLEL_EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = ray.origin - self.p0;
        let u = inv_det * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = inv_det * ray.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = inv_det * edge2.dot(&q);
        if t >= 0.0 {
            Some(TriangleRayHit { t, u, v })
        } else {
            None
        }
    }

    /// Get the closest point on the triangle to a given point
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        let edge1 = self.p1 - self.p0;
        let edge2 = self.p2 - self.p0;
        let p0_to_point = point - self.p0;

        let d1 = edge1.dot(&p0_to_point);
        let d2 = edge2.dot(&p0_to_point);
        if d1 <= 0.0 && d2 <= 0.0 {
            return self.p0;
        }

        let p1_to_point = point - self.p1;
        let d3 = edge1.dot(&p1_to_point);
        let d4 = edge2.dot(&p1_to_point);
        if d3 >= 0.0 && d4 <= d3 {
            return self.p1;
        }

        let p2_to_point = point - self.p2;
        let d5 = edge1.dot(&p2_to_point);
        let d6 = edge2.dot(&p2_to_point);
        if d6 >= 0.0 && d5 <= d6 {
            return self.p2;
        }

        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v = d1 / (d1 - d3);
            return self.p0 + edge1 * v;
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return self.p0 + edge2 * w;
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return self.p1 + (self.p2 - self.p1) * w;
        }

        // Inside the face
        let denom = 1.0 / (va + vb + vc);
        let v = vb * denom;
        let w = vc * denom;
        self.p0 + edge1 * v + edge2 * w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn upright_triangle() -> Triangle {
        Triangle::new(
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn test_ray_hits_triangle_head_on() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0));
        let hit = upright_triangle().intersect_ray(&ray, true).unwrap();

        assert_relative_eq!(hit.t, 5.0, epsilon = 1e-5);
        assert!(hit.u >= 0.0 && hit.v >= 0.0 && hit.u + hit.v <= 1.0);
    }

    #[test]
    fn test_back_face_culling() {
        // Normal of the upright triangle is +Z, ray travels +Z: it sees the back
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(upright_triangle().intersect_ray(&ray, false).is_none());

        let front = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(upright_triangle().intersect_ray(&front, false).is_some());
    }

    #[test]
    fn test_parallel_ray_misses() {
        let ray = Ray::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(upright_triangle().intersect_ray(&ray, true).is_none());
    }

    #[test]
    fn test_ray_outside_triangle_misses() {
        let ray = Ray::new(Vec3::new(3.0, 3.0, -5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(upright_triangle().intersect_ray(&ray, true).is_none());
    }

    #[test]
    fn test_triangle_behind_ray_misses() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 1.0));
        assert!(upright_triangle().intersect_ray(&ray, true).is_none());
    }

    #[test]
    fn test_area_and_centroid() {
        let tri = upright_triangle();
        assert_relative_eq!(tri.area(), 2.0, epsilon = 1e-6);
        assert_relative_eq!(tri.centroid(), Vec3::new(0.0, -1.0 / 3.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(tri.normal(), Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_triangle_has_zero_normal() {
        let tri = Triangle::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(tri.normal(), Vec3::zeros());
        assert_eq!(tri.area(), 0.0);
    }

    #[test]
    fn test_closest_point_regions() {
        let tri = upright_triangle();
        assert_relative_eq!(
            tri.closest_point(Vec3::new(0.0, 0.0, 3.0)),
            Vec3::new(0.0, 0.0, 0.0),
            epsilon = 1e-6
        );
        assert_relative_eq!(tri.closest_point(Vec3::new(-5.0, -5.0, 0.0)), tri.p0, epsilon = 1e-6);
    }

    #[test]
    fn test_slab_entry_distance() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(aabb.intersect_ray(&ray).unwrap(), 4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_slab_origin_inside() {
        let aabb = Aabb::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Vec3::new(0.5, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(aabb.intersect_ray(&ray), Some(0.0));
    }

    #[test]
    fn test_slab_miss_and_pointing_away() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let passing = Ray::new(Vec3::new(-5.0, 3.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(aabb.intersect_ray(&passing).is_none());

        let away = Ray::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        assert!(aabb.intersect_ray(&away).is_none());
    }

    #[test]
    fn test_slab_diagonal_entry() {
        let aabb = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        let ray = Ray::new(Vec3::new(-1.0, -1.0, 0.5), Vec3::new(1.0, 1.0, 0.0));
        let t = aabb.intersect_ray(&ray).unwrap();
        assert_relative_eq!(t, 2.0f32.sqrt(), epsilon = 1e-5);
    }
}
