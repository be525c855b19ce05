// src/engine_lib/transform.rs

use glam::{Mat4, Quat, Vec3, Vec4, Vec4Swizzles};

/// Local axis a surface faces along. Portal surfaces are quads in their local XY plane.
pub const SURFACE_FORWARD: Vec3 = Vec3::Z;

/// An oriented plane stored as `normal · p + d = 0`, with a unit-length normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self { normal, d: -normal.dot(point) }
    }

    /// Plane through the surface's world position, facing along its rotated local +Z.
    /// The normal is renormalized so scaled surfaces still give metric distances.
    pub fn from_surface(surface_transform: &Mat4) -> Self {
        let normal = surface_transform.transform_vector3(SURFACE_FORWARD);
        Self::from_point_normal(surface_transform.w_axis.xyz(), normal)
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }

    pub fn to_vec4(&self) -> Vec4 {
        self.normal.extend(self.d)
    }

    /// Moves the plane into another space. Planes are covectors, so `normal_matrix` is the
    /// inverse-transpose of the point transform (see `Camera::normal_matrix`). The result
    /// is renormalized.
    pub fn transformed(&self, normal_matrix: &Mat4) -> Self {
        let v = *normal_matrix * self.to_vec4();
        let len = v.xyz().length();
        if len <= f32::EPSILON {
            return *self;
        }
        Self { normal: v.xyz() / len, d: v.w / len }
    }
}

pub fn plane_from_surface(surface_transform: &Mat4) -> Plane {
    Plane::from_surface(surface_transform)
}

pub fn signed_distance(plane: &Plane, point: Vec3) -> f32 {
    plane.signed_distance(point)
}

/// Half turn about the vertical axis. Reconciles a surface's outward-facing +Z with the
/// inward-looking viewer when it is re-expressed relative to the reference point.
pub fn half_turn_y() -> Mat4 {
    Mat4::from_rotation_y(std::f32::consts::PI)
}

/// Rigid placement of a camera or marker: position plus orientation, no scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self { position: Vec3::ZERO, orientation: Quat::IDENTITY }
    }
}

impl Pose {
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self { position, orientation }
    }

    /// Decomposes an affine transform, discarding any scale.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let (_scale, orientation, position) = matrix.to_scale_rotation_translation();
        Self { position, orientation: orientation.normalize() }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position)
    }

    pub fn abs_diff_eq(&self, other: &Pose, max_abs_diff: f32) -> bool {
        // q and -q describe the same rotation
        self.position.abs_diff_eq(other.position, max_abs_diff)
            && self.orientation.dot(other.orientation).abs() >= 1.0 - max_abs_diff
    }
}
