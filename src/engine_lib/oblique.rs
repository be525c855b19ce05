// src/engine_lib/oblique.rs
//
// Oblique near-plane clipping (Lengyel). The projection's depth row is rewritten so the
// near plane coincides with an arbitrary view-space plane, here the portal's exit plane.

use glam::{Mat4, Vec4};

use crate::engine_lib::camera::{Camera, DepthRange};
use crate::engine_lib::transform::Plane;

const DEGENERATE_DOT: f32 = 1e-6;

/// Returns `projection` with its near plane replaced by `clip_plane_view`.
///
/// The plane is in view space, as `(n, d)`, and must face away from the camera: the eye
/// sits on its negative side and everything kept lies on the positive side.
/// `inverse_projection` must be the inverse of `projection`. Returns `None` when the
/// far-corner dot product is degenerate.
pub fn oblique_projection(
    projection: &Mat4,
    inverse_projection: &Mat4,
    clip_plane_view: Vec4,
    depth_range: DepthRange,
) -> Option<Mat4> {
    let q = *inverse_projection
        * Vec4::new(
            clip_plane_view.x.signum(),
            clip_plane_view.y.signum(),
            1.0,
            1.0,
        );
    let c_dot_q = clip_plane_view.dot(q);
    if c_dot_q.abs() < DEGENERATE_DOT {
        return None;
    }

    let w_row = projection.row(3);
    let depth_row = match depth_range {
        // z/w = 0 on the plane, 1 at the far corner
        DepthRange::ZeroToOne => clip_plane_view * (w_row.dot(q) / c_dot_q),
        // z/w = -1 on the plane, 1 at the far corner
        DepthRange::NegativeOneToOne => clip_plane_view * (2.0 * w_row.dot(q) / c_dot_q) - w_row,
    };

    let mut rows = projection.transpose();
    rows.z_axis = depth_row;
    Some(rows.transpose())
}

/// Rewrites the camera's projection so nothing between the camera and `destination` is drawn.
/// `destination` is a world-space plane whose normal points away from the camera.
pub fn apply_oblique_clip(camera: &mut Camera, destination: &Plane) {
    debug_assert!(
        destination.signed_distance(camera.position) < 0.0,
        "oblique clip plane must lie in front of the camera"
    );

    let clip_plane_view = destination.transformed(&camera.normal_matrix()).to_vec4();
    let projection = camera.projection_matrix();
    let inverse_projection = camera.inverse_projection_matrix();
    match oblique_projection(&projection, &inverse_projection, clip_plane_view, camera.depth_range) {
        Some(clipped) => camera.set_projection_matrix(clipped),
        None => {
            log::warn!(
                "Oblique clip skipped: destination plane {:?} is degenerate for camera at {:?}",
                destination,
                camera.position
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3, Vec4Swizzles};

    fn clip_depth(camera: &Camera, world_point: Vec3) -> f32 {
        let clip = camera.view_projection_matrix() * world_point.extend(1.0);
        clip.z / clip.w
    }

    /// Planes facing away from a camera at the origin looking down -Z.
    fn destination_planes() -> Vec<Plane> {
        [
            (Vec3::new(0.0, 0.0, -3.0), Vec3::new(0.0, 0.0, -1.0)),
            (Vec3::new(0.5, 0.0, -2.0), Vec3::new(0.3, 0.0, -1.0)),
            (Vec3::new(-0.4, 0.3, -4.0), Vec3::new(-0.5, 0.4, -1.0)),
            (Vec3::new(0.0, -0.6, -2.5), Vec3::new(0.2, -0.7, -1.0)),
            (Vec3::new(1.0, 0.2, -3.5), Vec3::new(0.9, 0.1, -0.4)),
            (Vec3::new(0.0, 0.8, -5.0), Vec3::new(0.0, 0.6, -0.8)),
        ]
        .into_iter()
        .map(|(point, normal)| Plane::from_point_normal(point, normal))
        .collect()
    }

    fn coplanar_points(plane: &Plane) -> Vec<Vec3> {
        let origin = -plane.normal * plane.d;
        let tangent = plane.normal.any_orthonormal_vector();
        let bitangent = plane.normal.cross(tangent);
        vec![
            origin,
            origin + tangent * 0.3,
            origin - bitangent * 0.2,
            origin + tangent * 0.1 + bitangent * 0.15,
        ]
    }

    #[test]
    fn coplanar_points_land_on_near_plane_zero_to_one() {
        for plane in destination_planes() {
            let mut camera = Camera::new(70.0, 1.0, 0.1, 100.0);
            apply_oblique_clip(&mut camera, &plane);
            assert!(camera.has_custom_projection());

            for point in coplanar_points(&plane) {
                let z = clip_depth(&camera, point);
                assert!(z.abs() < 1e-3, "plane {plane:?}, point {point:?}, z/w = {z}");
            }
        }
    }

    #[test]
    fn coplanar_points_land_on_near_plane_gl() {
        for plane in destination_planes() {
            let mut camera = Camera::new(70.0, 1.0, 0.1, 100.0);
            camera.depth_range = DepthRange::NegativeOneToOne;
            apply_oblique_clip(&mut camera, &plane);

            for point in coplanar_points(&plane) {
                let z = clip_depth(&camera, point);
                assert!((z + 1.0).abs() < 1e-3, "plane {plane:?}, point {point:?}, z/w = {z}");
            }
        }
    }

    #[test]
    fn geometry_between_camera_and_plane_is_clipped() {
        for plane in destination_planes() {
            let mut camera = Camera::new(70.0, 1.0, 0.1, 100.0);
            apply_oblique_clip(&mut camera, &plane);

            let origin = -plane.normal * plane.d;
            let before = origin - plane.normal * 0.5;
            let beyond = origin + plane.normal * 0.5;
            assert!(clip_depth(&camera, before) < 0.0);
            let z_beyond = clip_depth(&camera, beyond);
            assert!(z_beyond > 0.0 && z_beyond < 1.0, "z/w beyond plane = {z_beyond}");
        }
    }

    #[test]
    fn clipped_projection_stays_invertible() {
        for plane in destination_planes() {
            let mut camera = Camera::new(70.0, 1.0, 0.1, 100.0);
            apply_oblique_clip(&mut camera, &plane);
            assert!(camera.projection_matrix().determinant().abs() > 1e-9);
        }
    }

    #[test]
    fn moved_camera_clips_world_plane() {
        let mut camera = Camera::new(60.0, 1.6, 0.1, 100.0)
            .with_pose(Vec3::new(6.0, 1.0, 2.0), Quat::from_rotation_y(0.9));
        let forward = camera.forward();
        let point = camera.position + forward * 4.0;
        let plane = Plane::from_point_normal(point, forward + Vec3::new(0.0, 0.2, 0.0));

        apply_oblique_clip(&mut camera, &plane);

        assert!(clip_depth(&camera, point).abs() < 1e-3);
    }

    #[test]
    fn side_rows_are_untouched() {
        let plane = destination_planes()[2];
        let mut camera = Camera::new(70.0, 1.3, 0.1, 100.0);
        let original = camera.projection_matrix();
        apply_oblique_clip(&mut camera, &plane);
        let clipped = camera.projection_matrix();

        for i in [0, 1, 3] {
            assert!(clipped.row(i).abs_diff_eq(original.row(i), 1e-6));
        }
        assert!(clipped.row(2).xyz().normalize().abs_diff_eq(plane.normal, 1e-4));
    }
}
