// src/engine_lib/portal_camera.rs

use glam::Mat4;

use crate::engine_lib::camera::Camera;
use crate::engine_lib::transform::{half_turn_y, Pose};

/// World transform of the virtual camera looking out of `reference` the way `viewer_world`
/// looks into `surface`:
///
/// `reference · rotate180(Y) · inverse(surface) · viewer`
pub fn portal_camera_transform(viewer_world: &Mat4, surface: &Mat4, reference: &Mat4) -> Mat4 {
    debug_assert!(
        surface.determinant().abs() > f32::EPSILON,
        "portal surface transform must be invertible"
    );
    *reference * half_turn_y() * surface.inverse() * *viewer_world
}

pub fn compute_portal_camera_pose(viewer: &Camera, surface: &Mat4, reference: &Mat4) -> Pose {
    Pose::from_matrix(&portal_camera_transform(&viewer.world_transform(), surface, reference))
}

/// Places `target` at the virtual pose and gives it the viewer's projection parameters.
/// Any oblique projection left over from the previous frame is discarded here.
pub fn solve_portal_camera(viewer: &Camera, surface: &Mat4, reference: &Mat4, target: &mut Camera) {
    target.set_pose(compute_portal_camera_pose(viewer, surface, reference));
    target.copy_projection_from(viewer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};
    use std::f32::consts::{FRAC_PI_2, PI};

    fn viewer() -> Camera {
        Camera::new(70.0, 1.5, 0.1, 100.0)
            .with_pose(Vec3::new(0.5, 1.2, 3.0), Quat::from_euler(glam::EulerRot::YXZ, 0.4, -0.2, 0.0))
    }

    #[test]
    fn identity_portal_reproduces_viewer_pose() {
        let surface = Mat4::from_rotation_translation(Quat::from_rotation_y(0.7), Vec3::new(1.0, 2.0, -4.0));
        let reference = surface * half_turn_y();
        let main = viewer();

        let pose = compute_portal_camera_pose(&main, &surface, &reference);

        assert!(pose.abs_diff_eq(&main.pose(), 1e-4), "{pose:?} vs {:?}", main.pose());
    }

    #[test]
    fn identity_portal_at_origin_uses_bare_half_turn() {
        let surface = Mat4::IDENTITY;
        let reference = half_turn_y() * surface.inverse();
        let main = viewer();

        let pose = compute_portal_camera_pose(&main, &surface, &reference);

        assert!(pose.abs_diff_eq(&main.pose(), 1e-4));
    }

    #[test]
    fn straight_pair_translates_and_keeps_heading() {
        let surface = Mat4::from_rotation_translation(Quat::from_rotation_y(FRAC_PI_2), Vec3::new(-3.0, 0.0, 0.0));
        let reference = Mat4::from_rotation_translation(Quat::from_rotation_y(-FRAC_PI_2), Vec3::new(3.0, 0.0, 0.0));
        let main = Camera::default().with_pose(Vec3::ZERO, Quat::from_rotation_y(FRAC_PI_2));

        let pose = compute_portal_camera_pose(&main, &surface, &reference);

        assert!(pose.position.abs_diff_eq(Vec3::new(6.0, 0.0, 0.0), 1e-5));
        assert!((pose.orientation * Vec3::NEG_Z).abs_diff_eq(Vec3::NEG_X, 1e-5));
    }

    #[test]
    fn solve_copies_projection_and_clears_override() {
        let main = viewer();
        let mut target = Camera::new(30.0, 1.0, 1.0, 10.0);
        target.set_projection_matrix(Mat4::IDENTITY);

        let surface = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
        let reference = Mat4::from_rotation_translation(Quat::from_rotation_y(PI), Vec3::new(10.0, 0.0, 0.0));
        solve_portal_camera(&main, &surface, &reference, &mut target);

        assert!(!target.has_custom_projection());
        assert_eq!(target.fov_y_rad, main.fov_y_rad);
        assert_eq!(target.aspect, main.aspect);
        assert_eq!(target.znear, main.znear);
        assert_eq!(target.zfar, main.zfar);
    }

    #[test]
    fn distance_to_surface_carries_over_behind_reference() {
        let surface = Mat4::from_rotation_translation(Quat::from_rotation_x(0.3), Vec3::new(2.0, 1.0, -6.0));
        let reference = Mat4::from_rotation_translation(Quat::from_rotation_y(1.1), Vec3::new(-8.0, 0.0, 4.0));
        let main = viewer();

        let surface_plane = crate::engine_lib::transform::plane_from_surface(&surface);
        let reference_plane = crate::engine_lib::transform::plane_from_surface(&reference);
        let pose = compute_portal_camera_pose(&main, &surface, &reference);

        let in_front = surface_plane.signed_distance(main.position);
        let behind = reference_plane.signed_distance(pose.position);
        assert!((in_front + behind).abs() < 1e-4);
    }
}
