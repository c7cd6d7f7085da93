//! Oriented box value type
//!
//! Moving colliders are described as oriented boxes. Dimensions are full
//! extents; the sweep math works from [`OrientedBox::half_extents`].

use crate::foundation::math::{Quat, RigidTransform, Vec3};
use super::primitives::{Aabb, Ray};

/// A box with arbitrary center, orientation and full extents
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedBox {
    /// Center of the box
    pub center: Vec3,
    /// Rotation from box-local axes to the containing frame
    pub orientation: Quat,
    /// Full width, height and depth along the box's local axes
    pub dimensions: Vec3,
}

impl OrientedBox {
    /// Creates a box from center, orientation and full dimensions
    pub fn new(center: Vec3, orientation: Quat, dimensions: Vec3) -> Self {
        Self {
            center,
            orientation,
            dimensions,
        }
    }

    /// Creates a box from center, orientation and half extents
    pub fn from_half_extents(center: Vec3, orientation: Quat, half_extents: Vec3) -> Self {
        Self::new(center, orientation, half_extents * 2.0)
    }

    /// Creates an axis-aligned box
    pub fn axis_aligned(center: Vec3, dimensions: Vec3) -> Self {
        Self::new(center, Quat::identity(), dimensions)
    }

    /// Half of the dimensions
    pub fn half_extents(&self) -> Vec3 {
        self.dimensions * 0.5
    }

    /// The box's local X, Y and Z axes expressed in the containing frame
    pub fn axes(&self) -> [Vec3; 3] {
        let rotation = self.orientation.to_rotation_matrix();
        let m = rotation.matrix();
        [
            m.column(0).into_owned(),
            m.column(1).into_owned(),
            m.column(2).into_owned(),
        ]
    }

    /// Face vectors: each axis scaled by its half extent
    pub fn face_vectors(&self) -> [Vec3; 3] {
        let [x, y, z] = self.axes();
        let h = self.half_extents();
        [x * h.x, y * h.y, z * h.z]
    }

    /// The eight corners, ordered by the sign bits of x, y, z (bit 0 = x)
    pub fn corners(&self) -> [Vec3; 8] {
        let [fx, fy, fz] = self.face_vectors();
        let mut corners = [Vec3::zeros(); 8];
        for (index, corner) in corners.iter_mut().enumerate() {
            let sx = if index & 1 != 0 { 1.0 } else { -1.0 };
            let sy = if index & 2 != 0 { 1.0 } else { -1.0 };
            let sz = if index & 4 != 0 { 1.0 } else { -1.0 };
            *corner = self.center + fx * sx + fy * sy + fz * sz;
        }
        corners
    }

    /// Expresses a point in box-local coordinates (origin at the center)
    pub fn to_local(&self, point: &Vec3) -> Vec3 {
        self.orientation.inverse_transform_vector(&(point - self.center))
    }

    /// Whether `point` lies inside the box, inflated by `tolerance` on every side
    pub fn contains_point(&self, point: &Vec3, tolerance: f32) -> bool {
        let local = self.to_local(point);
        let h = self.half_extents();
        local.x.abs() <= h.x + tolerance
            && local.y.abs() <= h.y + tolerance
            && local.z.abs() <= h.z + tolerance
    }

    /// Projects the box onto `axis`, returning `(min, max)`
    pub fn project(&self, axis: &Vec3) -> (f32, f32) {
        let [fx, fy, fz] = self.face_vectors();
        let c = self.center.dot(axis);
        let r = fx.dot(axis).abs() + fy.dot(axis).abs() + fz.dot(axis).abs();
        (c - r, c + r)
    }

    /// The same box grown by `margin` along every local axis
    pub fn inflated(&self, margin: f32) -> Self {
        let grow = Vec3::repeat(margin * 2.0);
        Self::new(self.center, self.orientation, self.dimensions + grow)
    }

    /// Maps the box through a rigid transform
    pub fn transformed(&self, transform: &RigidTransform) -> Self {
        Self {
            center: transform.transform_point(&self.center),
            orientation: transform.rotation * self.orientation,
            dimensions: self.dimensions * transform.scale,
        }
    }

    /// Maps the box through the inverse of `transform`
    pub fn inverse_transformed(&self, transform: &RigidTransform) -> Self {
        self.transformed(&transform.inverse())
    }

    /// Ray parameter where `ray` enters the box, `0.0` if it starts inside
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let local_ray = Ray {
            origin: self.to_local(&ray.origin),
            direction: self.orientation.inverse_transform_vector(&ray.direction),
        };
        let h = self.half_extents();
        Aabb::new(-h, h).intersect_ray(&local_ray)
    }
}
