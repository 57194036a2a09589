//! Math utilities and types
//!
//! Provides the math types used by transform nodes and the display list.

pub use nalgebra::{Matrix4, Quaternion, Unit, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Axes shorter than this are treated as "no rotation"
const MIN_AXIS_LENGTH: f32 = 1.0e-6;

/// Build a translation matrix
pub fn translation(offset: &Vec3) -> Mat4 {
    Mat4::new_translation(offset)
}

/// Build a non-uniform scaling matrix
pub fn scaling(factors: &Vec3) -> Mat4 {
    Mat4::new_nonuniform_scaling(factors)
}

/// Build a rotation of `angle_degrees` about `axis`
///
/// The axis does not need to be normalized. A degenerate (zero-length) axis
/// yields the identity rotation.
pub fn rotation(axis: &Vec3, angle_degrees: f32) -> Mat4 {
    Unit::try_new(*axis, MIN_AXIS_LENGTH).map_or_else(Mat4::identity, |axis| {
        Quat::from_axis_angle(&axis, angle_degrees.to_radians()).to_homogeneous()
    })
}
