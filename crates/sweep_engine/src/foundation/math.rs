//! Math utilities and types
//!
//! Provides the fundamental math types used by the collision core, plus the
//! rigid transform that relates a tree's authoring frame to world space.

pub use nalgebra::{
    Vector2, Vector3,
    Matrix3, Matrix4,
    Quaternion,
    Rotation3,
    Unit,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Relative tolerance when deciding whether a matrix carries uniform scale
const UNIFORM_SCALE_TOLERANCE: f32 = 1.0e-4;

/// Errors raised when converting an arbitrary matrix into a [`RigidTransform`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// The matrix scales its axes by different amounts
    #[error("non-uniform scale ({0}, {1}, {2}) is not supported")]
    NonUniformScale(f32, f32, f32),

    /// Zero, negative or non-finite scale
    #[error("degenerate scale factor {0}")]
    DegenerateScale(f32),

    /// The basis is mirrored
    #[error("transform contains a reflection")]
    Reflection,
}

/// Rotation, uniform scale and translation
///
/// Points map as `rotation * (scale * p) + translation`. Scale is a single
/// scalar: box-axis math relies on scale commuting with rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    /// Rotation quaternion
    pub rotation: Quat,

    /// Uniform scale factor
    pub scale: f32,

    /// Translation in world space
    pub translation: Vec3,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self {
            rotation: Quat::identity(),
            scale: 1.0,
            translation: Vec3::zeros(),
        }
    }
}

impl RigidTransform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform from its parts
    pub fn new(rotation: Quat, scale: f32, translation: Vec3) -> Self {
        debug_assert!(
            scale.is_finite() && scale > 0.0,
            "rigid transform scale must be positive and finite, got {scale}"
        );
        Self {
            rotation,
            scale,
            translation,
        }
    }

    /// Create a transform with only a translation
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: &Vec3) -> Vec3 {
        self.rotation * (point * self.scale) + self.translation
    }

    /// Apply this transform to a direction or displacement (no translation)
    pub fn transform_vector(&self, vector: &Vec3) -> Vec3 {
        self.rotation * (vector * self.scale)
    }

    /// Rotate a vector without scaling it (normals, axes)
    pub fn rotate_vector(&self, vector: &Vec3) -> Vec3 {
        self.rotation * vector
    }

    /// Get the inverse transform
    pub fn inverse(&self) -> Self {
        let inv_scale = 1.0 / self.scale;
        let inv_rotation = self.rotation.inverse();
        Self {
            rotation: inv_rotation,
            scale: inv_scale,
            translation: inv_rotation * (-self.translation * inv_scale),
        }
    }

    /// Apply `other` first, then `self`
    pub fn combine(&self, other: &Self) -> Self {
        Self {
            rotation: self.rotation * other.rotation,
            scale: self.scale * other.scale,
            translation: self.transform_point(&other.translation),
        }
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.translation)
            * self.rotation.to_homogeneous()
            * Mat4::new_scaling(self.scale)
    }

    /// Decompose an affine matrix, rejecting anything that is not a
    /// rotation, uniform scale and translation
    pub fn from_matrix(matrix: &Mat4) -> Result<Self, TransformError> {
        let translation = Vec3::new(matrix.m14, matrix.m24, matrix.m34);

        let col_x = Vec3::new(matrix.m11, matrix.m21, matrix.m31);
        let col_y = Vec3::new(matrix.m12, matrix.m22, matrix.m32);
        let col_z = Vec3::new(matrix.m13, matrix.m23, matrix.m33);
        let (sx, sy, sz) = (col_x.norm(), col_y.norm(), col_z.norm());

        let scale = (sx + sy + sz) / 3.0;
        if !scale.is_finite() || scale <= f32::EPSILON {
            return Err(TransformError::DegenerateScale(scale));
        }

        let tolerance = UNIFORM_SCALE_TOLERANCE * scale;
        if (sx - scale).abs() > tolerance
            || (sy - scale).abs() > tolerance
            || (sz - scale).abs() > tolerance
        {
            return Err(TransformError::NonUniformScale(sx, sy, sz));
        }

        let basis = Mat3::from_columns(&[col_x / scale, col_y / scale, col_z / scale]);
        if basis.determinant() < 0.0 {
            return Err(TransformError::Reflection);
        }
        let rotation = Quat::from_rotation_matrix(&Rotation3::from_matrix_unchecked(basis));

        Ok(Self {
            rotation,
            scale,
            translation,
        })
    }
}
