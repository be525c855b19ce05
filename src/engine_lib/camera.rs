// src/engine_lib/camera.rs

use glam::{Mat4, Quat, Vec3};

use crate::engine_lib::transform::Pose;

/// Clip-space depth convention of a projection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DepthRange {
    /// wgpu / D3D / Metal: near maps to 0, far to 1.
    #[default]
    ZeroToOne,
    /// OpenGL: near maps to -1, far to 1.
    NegativeOneToOne,
}

impl DepthRange {
    /// NDC depth of the near plane.
    pub fn near_ndc(self) -> f32 {
        match self {
            DepthRange::ZeroToOne => 0.0,
            DepthRange::NegativeOneToOne => -1.0,
        }
    }
}

/// Perspective camera with a right-handed, -Z forward view space.
///
/// The projection is normally derived from the perspective parameters. Portal cameras
/// replace it with an oblique projection each frame; copying parameters from another
/// camera drops that override again.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub orientation: Quat,
    pub fov_y_rad: f32,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
    pub depth_range: DepthRange,
    projection_override: Option<Mat4>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(75.0, 4.0 / 3.0, 0.1, 100.0)
    }
}

impl Camera {
    pub fn new(fov_y_deg: f32, aspect: f32, znear: f32, zfar: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            fov_y_rad: fov_y_deg.to_radians(),
            aspect,
            znear,
            zfar,
            depth_range: DepthRange::default(),
            projection_override: None,
        }
    }

    pub fn with_pose(mut self, position: Vec3, orientation: Quat) -> Self {
        self.set_pose(Pose::new(position, orientation));
        self
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.orientation)
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.position = pose.position;
        self.orientation = pose.orientation.normalize();
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// Camera -> world.
    pub fn world_transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position)
    }

    /// World -> camera.
    pub fn view_matrix(&self) -> Mat4 {
        self.world_transform().inverse()
    }

    /// Transforms world-space planes into view space (inverse-transpose of the view matrix).
    pub fn normal_matrix(&self) -> Mat4 {
        self.world_transform().transpose()
    }

    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    pub fn perspective_matrix(&self) -> Mat4 {
        let aspect = self.aspect.max(0.0001);
        let znear = self.znear.max(0.0001);
        let zfar = self.zfar.max(znear + 0.0001);
        match self.depth_range {
            DepthRange::ZeroToOne => Mat4::perspective_rh(self.fov_y_rad, aspect, znear, zfar),
            DepthRange::NegativeOneToOne => Mat4::perspective_rh_gl(self.fov_y_rad, aspect, znear, zfar),
        }
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_override.unwrap_or_else(|| self.perspective_matrix())
    }

    pub fn inverse_projection_matrix(&self) -> Mat4 {
        self.projection_matrix().inverse()
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn set_projection_matrix(&mut self, projection: Mat4) {
        self.projection_override = Some(projection);
    }

    pub fn has_custom_projection(&self) -> bool {
        self.projection_override.is_some()
    }

    /// Takes fov, aspect, clip distances and depth convention from `other` verbatim and
    /// drops any custom projection. A portal camera must match its viewer exactly, or the
    /// nested image zooms relative to the frame around it.
    pub fn copy_projection_from(&mut self, other: &Camera) {
        self.fov_y_rad = other.fov_y_rad;
        self.aspect = other.aspect;
        self.znear = other.znear;
        self.zfar = other.zfar;
        self.depth_range = other.depth_range;
        self.projection_override = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_matrix_inverts_world_transform() {
        let camera = Camera::default()
            .with_pose(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_y(0.6));
        let round_trip = camera.view_matrix() * camera.world_transform();
        assert!(round_trip.abs_diff_eq(Mat4::IDENTITY, 1e-5));
    }

    #[test]
    fn forward_follows_orientation() {
        let camera = Camera::default()
            .with_pose(Vec3::ZERO, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        assert!(camera.forward().abs_diff_eq(Vec3::NEG_X, 1e-6));
    }

    #[test]
    fn normal_matrix_is_inverse_transpose_of_view() {
        let camera = Camera::default()
            .with_pose(Vec3::new(-4.0, 0.5, 2.0), Quat::from_rotation_x(0.3));
        let expected = camera.view_matrix().inverse().transpose();
        assert!(camera.normal_matrix().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn copy_projection_clears_override() {
        let source = Camera::new(60.0, 16.0 / 9.0, 0.2, 50.0);
        let mut target = Camera::default();
        target.set_projection_matrix(Mat4::IDENTITY);

        target.copy_projection_from(&source);

        assert!(!target.has_custom_projection());
        assert_eq!(target.fov_y_rad, source.fov_y_rad);
        assert_eq!(target.aspect, source.aspect);
        assert!(target.projection_matrix().abs_diff_eq(source.projection_matrix(), 1e-6));
    }

    #[test]
    fn near_plane_maps_to_convention() {
        for range in [DepthRange::ZeroToOne, DepthRange::NegativeOneToOne] {
            let mut camera = Camera::new(70.0, 1.0, 0.5, 20.0);
            camera.depth_range = range;
            let clip = camera.projection_matrix() * glam::Vec4::new(0.0, 0.0, -0.5, 1.0);
            assert!((clip.z / clip.w - range.near_ndc()).abs() < 1e-5);
        }
    }

    #[test]
    fn inverse_projection_follows_override() {
        let mut camera = Camera::new(70.0, 1.0, 0.5, 20.0);
        let far_center = camera.inverse_projection_matrix() * glam::Vec4::new(0.0, 0.0, 1.0, 1.0);
        assert!((far_center.z / far_center.w + 20.0).abs() < 1e-3);

        let skewed = camera.projection_matrix() * Mat4::from_rotation_x(0.2);
        camera.set_projection_matrix(skewed);
        assert!((camera.inverse_projection_matrix() * skewed).abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }
}
