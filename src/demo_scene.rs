// src/demo_scene.rs

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Quat, Vec3};

use crate::engine_lib::scene_types::{MeshKind, Scene};
use crate::engine_lib::transform::Pose;

const EYE_HEIGHT: f32 = 1.5;
const PORTAL_WIDTH: f32 = 2.0;
const PORTAL_HEIGHT: f32 = 2.6;
const FRAME_THICKNESS: f32 = 0.2;

const FLOOR_COLOR: [f32; 4] = [0.35, 0.55, 0.35, 1.0];
const FRAME_COLOR: [f32; 4] = [0.9, 0.5, 0.2, 1.0];
const REFERENCE_MARKER_COLOR: [f32; 4] = [0.3, 0.3, 0.8, 1.0];

/// Placement of the demo's single portal. The surface object itself is created by
/// `PortalRenderer::create_portal`.
#[derive(Clone, Copy, Debug)]
pub struct DemoPortal {
    pub width: f32,
    pub height: f32,
    pub surface_transform: Mat4,
    pub reference_transform: Mat4,
}

pub struct DemoScene {
    pub scene: Scene,
    pub portal: DemoPortal,
    pub camera_pose: Pose,
    /// Yaw/pitch matching `camera_pose`, for the controller.
    pub camera_yaw_rad: f32,
    pub camera_pitch_rad: f32,
}

/// A corridor along X: the portal surface stands at x = -3 facing +X, its reference point
/// at x = +3 facing -X. Looking into the surface shows the corridor again from beyond the
/// reference point, nested once per recursion level.
pub fn create_corridor_scene() -> DemoScene {
    let mut scene = Scene::new();

    scene.add_object(
        "floor",
        MeshKind::Cube,
        Mat4::from_translation(Vec3::new(0.0, -0.05, 0.0)),
        Vec3::new(24.0, 0.1, 8.0),
        FLOOR_COLOR,
    );

    let surface_rotation = Quat::from_rotation_y(FRAC_PI_2);
    let surface_center = Vec3::new(-3.0, PORTAL_HEIGHT * 0.5, 0.0);
    add_portal_frame(&mut scene, surface_center, surface_rotation);

    let reference_rotation = Quat::from_rotation_y(-FRAC_PI_2);
    let reference_center = Vec3::new(3.0, PORTAL_HEIGHT * 0.5, 0.0);
    scene.add_object(
        "reference_marker",
        MeshKind::Cube,
        Mat4::from_rotation_translation(reference_rotation, Vec3::new(3.0, 0.05, 0.0)),
        Vec3::new(PORTAL_WIDTH, 0.1, 0.6),
        REFERENCE_MARKER_COLOR,
    );

    let crates = [
        (Vec3::new(-1.0, 0.4, 1.8), 0.8, [0.8, 0.2, 0.2, 1.0]),
        (Vec3::new(1.5, 0.3, -1.6), 0.6, [0.9, 0.9, 0.3, 1.0]),
        (Vec3::new(0.5, 0.25, 2.5), 0.5, [0.2, 0.7, 0.8, 1.0]),
        (Vec3::new(-6.0, 0.5, -1.0), 1.0, [0.7, 0.3, 0.7, 1.0]),
    ];
    for (index, (position, size, color)) in crates.into_iter().enumerate() {
        scene.add_object(
            format!("crate_{index}"),
            MeshKind::Cube,
            Mat4::from_rotation_translation(Quat::from_rotation_y(index as f32 * 0.4), position),
            Vec3::splat(size),
            color,
        );
    }

    for (index, z) in [-3.5f32, 3.5].into_iter().enumerate() {
        for x in [-9.0f32, -3.0, 3.0, 9.0] {
            scene.add_object(
                format!("pillar_{index}_{x}"),
                MeshKind::Cube,
                Mat4::from_translation(Vec3::new(x, 1.5, z)),
                Vec3::new(0.4, 3.0, 0.4),
                [0.6, 0.6, 0.65, 1.0],
            );
        }
    }

    let camera_yaw_rad = FRAC_PI_2;
    DemoScene {
        scene,
        portal: DemoPortal {
            width: PORTAL_WIDTH,
            height: PORTAL_HEIGHT,
            surface_transform: Mat4::from_rotation_translation(surface_rotation, surface_center),
            reference_transform: Mat4::from_rotation_translation(reference_rotation, reference_center),
        },
        camera_pose: Pose::new(Vec3::new(0.0, EYE_HEIGHT, 0.0), Quat::from_rotation_y(camera_yaw_rad)),
        camera_yaw_rad,
        camera_pitch_rad: 0.0,
    }
}

/// Two posts and a lintel around a portal opening, in the portal's local frame.
fn add_portal_frame(scene: &mut Scene, center: Vec3, rotation: Quat) {
    let half_width = (PORTAL_WIDTH + FRAME_THICKNESS) * 0.5;
    let half_height = (PORTAL_HEIGHT + FRAME_THICKNESS) * 0.5;
    let pieces = [
        ("frame_left", Vec3::new(-half_width, 0.0, 0.0), Vec3::new(FRAME_THICKNESS, PORTAL_HEIGHT, FRAME_THICKNESS)),
        ("frame_right", Vec3::new(half_width, 0.0, 0.0), Vec3::new(FRAME_THICKNESS, PORTAL_HEIGHT, FRAME_THICKNESS)),
        (
            "frame_top",
            Vec3::new(0.0, half_height, 0.0),
            Vec3::new(PORTAL_WIDTH + 2.0 * FRAME_THICKNESS, FRAME_THICKNESS, FRAME_THICKNESS),
        ),
    ];
    for (name, local_offset, size) in pieces {
        scene.add_object(
            name,
            MeshKind::Cube,
            Mat4::from_rotation_translation(rotation, center + rotation * local_offset),
            size,
            FRAME_COLOR,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::transform::Plane;

    #[test]
    fn camera_starts_in_front_of_the_surface() {
        let demo = create_corridor_scene();
        let plane = Plane::from_surface(&demo.portal.surface_transform);
        assert!(plane.signed_distance(demo.camera_pose.position) > 0.0);
        let forward = demo.camera_pose.orientation * Vec3::NEG_Z;
        assert!(forward.abs_diff_eq(Vec3::NEG_X, 1e-6));
    }

    #[test]
    fn scene_has_no_portal_surface_yet() {
        let demo = create_corridor_scene();
        assert!(demo.scene.objects().iter().all(|o| o.mesh == MeshKind::Cube));
    }
}
