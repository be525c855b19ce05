// src/engine_lib/stencil_recursion.rs

use glam::{Mat4, Vec3};

use crate::engine_lib::camera::Camera;
use crate::engine_lib::frustum::Frustum;
use crate::engine_lib::oblique::apply_oblique_clip;
use crate::engine_lib::portal_camera::{compute_portal_camera_pose, solve_portal_camera};
use crate::engine_lib::scene_types::{ObjectId, Scene, SceneObject};
use crate::engine_lib::transform::{Plane, Pose};
use crate::rendering_lib::backend::{ClearFlags, ClearRegion, PassState, RenderBackend};

/// A viewer this close to the portal plane counts as behind it. The same margin is
/// required between a solved portal camera and the destination plane.
const FRONT_EPSILON: f32 = 1e-5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FallbackReason {
    Disabled,
    NoPortal,
    ViewerBehindPortal,
    PortalOffScreen,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Portal,
    Plain(FallbackReason),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelReport {
    pub level: u32,
    pub camera: Pose,
}

/// What the last `render()` did.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    pub mode: RenderMode,
    pub levels: Vec<LevelReport>,
}

impl Default for FrameReport {
    fn default() -> Self {
        Self { mode: RenderMode::Plain(FallbackReason::NoPortal), levels: Vec::new() }
    }
}

impl FrameReport {
    pub fn reset(&mut self, mode: RenderMode) {
        self.mode = mode;
        self.levels.clear();
    }

    pub fn levels_rendered(&self) -> usize {
        self.levels.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PortalVisibility {
    Visible,
    Behind,
    OffScreen,
}

/// Per-frame snapshot of a portal: the surface as currently placed in the scene plus its
/// reference point, with the planes and bounds the recursion needs.
#[derive(Clone, Copy, Debug)]
pub struct ResolvedPortal {
    pub surface: ObjectId,
    pub surface_transform: Mat4,
    pub reference_transform: Mat4,
    /// Plane of the visible surface, facing the viewer side.
    pub surface_plane: Plane,
    /// Plane of the reference point; portal cameras sit on its negative side.
    pub destination_plane: Plane,
    pub bounds_center: Vec3,
    pub bounds_radius: f32,
}

impl ResolvedPortal {
    pub fn new(surface: &SceneObject, reference_transform: Mat4) -> Self {
        Self {
            surface: surface.id,
            surface_transform: surface.transform,
            reference_transform,
            surface_plane: Plane::from_surface(&surface.transform),
            destination_plane: Plane::from_surface(&reference_transform),
            bounds_center: surface.position(),
            bounds_radius: surface.bounding_radius(),
        }
    }

    pub fn visibility_from(&self, camera: &Camera) -> PortalVisibility {
        if self.surface_plane.signed_distance(camera.position) <= FRONT_EPSILON {
            return PortalVisibility::Behind;
        }
        // Far from the origin, rounding in the solve can put a viewer that is barely in
        // front of the surface onto the destination plane, where no oblique clip exists.
        if !self.exit_is_clippable(camera) {
            return PortalVisibility::Behind;
        }
        let frustum = Frustum::from_view_projection(&camera.view_projection_matrix());
        if !frustum.intersects_sphere(self.bounds_center, self.bounds_radius) {
            return PortalVisibility::OffScreen;
        }
        PortalVisibility::Visible
    }

    /// Whether the portal camera solved for `viewer` ends up strictly behind the
    /// destination plane.
    pub fn exit_is_clippable(&self, viewer: &Camera) -> bool {
        let exit = compute_portal_camera_pose(viewer, &self.surface_transform, &self.reference_transform);
        self.destination_plane.signed_distance(exit.position) < -FRONT_EPSILON
    }
}

impl PortalVisibility {
    pub fn fallback_reason(self) -> Option<FallbackReason> {
        match self {
            PortalVisibility::Visible => None,
            PortalVisibility::Behind => Some(FallbackReason::ViewerBehindPortal),
            PortalVisibility::OffScreen => Some(FallbackReason::PortalOffScreen),
        }
    }
}

/// Ordinary frame: full clear, whole scene from the main camera.
pub fn render_plain<B: RenderBackend>(backend: &mut B, scene: &Scene, camera: &Camera) {
    backend.clear(ClearFlags::ALL, ClearRegion::Full);
    backend.draw_scene(scene, camera, &PassState::default());
}

/// Drives the per-level mark / solve / draw / recurse / restore sequence.
///
/// The stencil value of a pixel counts the portal boundaries crossed to reach its visible
/// content. Level `L` only ever touches pixels holding `L` or `L + 1`, and leaves every
/// pixel it raised back at `L` before returning.
pub struct StencilRecursion<'a, B: RenderBackend> {
    backend: &'a mut B,
    scene: &'a Scene,
    portal: &'a ResolvedPortal,
    max_depth: u32,
    report: &'a mut FrameReport,
}

impl<'a, B: RenderBackend> StencilRecursion<'a, B> {
    pub fn new(
        backend: &'a mut B,
        scene: &'a Scene,
        portal: &'a ResolvedPortal,
        max_depth: u32,
        report: &'a mut FrameReport,
    ) -> Self {
        Self { backend, scene, portal, max_depth, report }
    }

    /// Renders the full portal frame. `cameras` is the per-level pool; recursion never goes
    /// deeper than its length.
    pub fn run(mut self, main_camera: &Camera, cameras: &mut [Camera]) {
        debug_assert!(cameras.len() as u32 >= self.max_depth, "camera pool smaller than recursion depth");
        self.report.reset(RenderMode::Portal);

        self.backend.clear(ClearFlags::ALL, ClearRegion::Full);
        self.draw_level(0, main_camera, cameras);

        let main_pass = PassState::masked(0, Some(self.portal.surface));
        self.backend.draw_scene(self.scene, main_camera, &main_pass);
    }

    fn draw_level(&mut self, level: u32, viewer: &Camera, cameras: &mut [Camera]) {
        let Some((camera, deeper)) = cameras.split_first_mut() else {
            return;
        };
        let surface = self.portal.surface;

        self.backend
            .draw_object(self.scene, surface, viewer, &PassState::stencil_mark(level));

        solve_portal_camera(
            viewer,
            &self.portal.surface_transform,
            &self.portal.reference_transform,
            camera,
        );
        apply_oblique_clip(camera, &self.portal.destination_plane);
        self.report.levels.push(LevelReport { level, camera: camera.pose() });

        let nested = level + 1;
        self.backend
            .clear(ClearFlags::DEPTH, ClearRegion::StencilEqual(nested));
        self.backend
            .draw_scene(self.scene, camera, &PassState::masked(nested, Some(surface)));

        if nested < self.max_depth {
            match self.portal.visibility_from(camera) {
                PortalVisibility::Visible => self.draw_level(nested, camera, deeper),
                visibility => {
                    log::trace!("Portal recursion stops after level {level}: {visibility:?}");
                }
            }
        }

        self.backend
            .draw_object(self.scene, surface, viewer, &PassState::depth_restore(level));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::scene_types::MeshKind;
    use crate::rendering_lib::backend::{StencilOp, StencilTest};
    use crate::rendering_lib::recorder::{DrawTarget, FrameRecorder, RenderCommand};
    use glam::Quat;
    use std::f32::consts::FRAC_PI_2;

    struct Fixture {
        scene: Scene,
        portal: ResolvedPortal,
        main: Camera,
    }

    fn corridor(reference_x: f32) -> Fixture {
        let mut scene = Scene::new();
        scene.add_object("floor", MeshKind::Cube, Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0)), Vec3::new(20.0, 0.1, 20.0), [0.4; 4]);
        let surface_transform = Mat4::from_rotation_translation(Quat::from_rotation_y(FRAC_PI_2), Vec3::new(-3.0, 0.0, 0.0));
        let surface = scene.add_object("portal", MeshKind::Quad, surface_transform, Vec3::new(2.0, 2.0, 1.0), [1.0; 4]);
        let reference = Mat4::from_rotation_translation(Quat::from_rotation_y(-FRAC_PI_2), Vec3::new(reference_x, 0.0, 0.0));
        let portal = scene.object(surface).map(|o| ResolvedPortal::new(o, reference)).expect("portal surface");
        let main = Camera::new(70.0, 1.0, 0.1, 100.0).with_pose(Vec3::ZERO, Quat::from_rotation_y(FRAC_PI_2));
        Fixture { scene, portal, main }
    }

    fn run(fixture: &Fixture, max_depth: u32) -> (FrameRecorder, FrameReport) {
        let mut recorder = FrameRecorder::new(true);
        let mut report = FrameReport::default();
        let mut cameras = vec![Camera::default(); max_depth as usize];
        StencilRecursion::new(&mut recorder, &fixture.scene, &fixture.portal, max_depth, &mut report)
            .run(&fixture.main, &mut cameras);
        (recorder, report)
    }

    /// Replays the recording for a pixel covered by the portal at every level, assuming all
    /// depth tests pass. Returns the final stencil value and the deepest value seen.
    fn simulate_covered_pixel(recorder: &FrameRecorder, surface: ObjectId) -> (u32, u32) {
        let mut stencil = 0u32;
        let mut deepest = 0u32;
        for command in recorder.commands() {
            match command {
                RenderCommand::Clear { buffers, region: ClearRegion::Full } if buffers.stencil => stencil = 0,
                RenderCommand::Clear { .. } => {}
                RenderCommand::Draw(draw) => {
                    if draw.target != DrawTarget::Object(surface) {
                        continue;
                    }
                    let passes = match draw.pass.stencil_test {
                        StencilTest::Always => true,
                        StencilTest::Equal(reference) => reference == stencil,
                    };
                    if passes {
                        match draw.pass.stencil_op {
                            StencilOp::Keep => {}
                            StencilOp::IncrementClamp => stencil += 1,
                            StencilOp::DecrementClamp => stencil = stencil.saturating_sub(1),
                        }
                    }
                    deepest = deepest.max(stencil);
                }
            }
        }
        (stencil, deepest)
    }

    #[test]
    fn marks_and_restores_balance_at_every_depth() {
        let fixture = corridor(3.0);
        for depth in 1..=10u32 {
            let (recorder, report) = run(&fixture, depth);
            assert_eq!(report.levels_rendered(), depth as usize);

            for level in 0..depth {
                let marks = recorder
                    .draws()
                    .filter(|d| d.pass == PassState::stencil_mark(level))
                    .count();
                let restores = recorder
                    .draws()
                    .filter(|d| d.pass == PassState::depth_restore(level))
                    .count();
                assert_eq!(marks, 1, "depth {depth}, level {level}");
                assert_eq!(restores, marks, "depth {depth}, level {level}");
            }

            let (final_stencil, deepest) = simulate_covered_pixel(&recorder, fixture.portal.surface);
            assert_eq!(final_stencil, 0, "depth {depth}");
            assert_eq!(deepest, depth, "depth {depth}");
        }
    }

    #[test]
    fn single_level_follows_pass_order() {
        let fixture = corridor(3.0);
        let (recorder, _) = run(&fixture, 1);
        let surface = fixture.portal.surface;
        let commands = recorder.commands();

        assert_eq!(commands.len(), 6);
        assert!(matches!(commands[0], RenderCommand::Clear { buffers: ClearFlags::ALL, region: ClearRegion::Full }));
        assert!(matches!(commands[1], RenderCommand::Draw(d) if d.target == DrawTarget::Object(surface) && d.pass == PassState::stencil_mark(0)));
        assert!(matches!(commands[2], RenderCommand::Clear { buffers: ClearFlags::DEPTH, region: ClearRegion::StencilEqual(1) }));
        assert!(matches!(commands[3], RenderCommand::Draw(d) if d.target == DrawTarget::Scene && d.pass == PassState::masked(1, Some(surface))));
        assert!(matches!(commands[4], RenderCommand::Draw(d) if d.pass == PassState::depth_restore(0)));
        assert!(matches!(commands[5], RenderCommand::Draw(d) if d.target == DrawTarget::Scene && d.pass == PassState::masked(0, Some(surface))));
    }

    #[test]
    fn nested_levels_are_drawn_from_parent_portal_camera() {
        let fixture = corridor(3.0);
        let (recorder, report) = run(&fixture, 2);

        let marks: Vec<_> = recorder
            .draws()
            .filter(|d| d.pass.stencil_op == StencilOp::IncrementClamp)
            .collect();
        assert_eq!(marks.len(), 2);
        assert!(marks[0].camera_position.abs_diff_eq(fixture.main.position, 1e-6));
        assert!(marks[1].camera_position.abs_diff_eq(report.levels[0].camera.position, 1e-6));
    }

    #[test]
    fn recursion_is_pruned_when_portal_camera_falls_behind_portal() {
        // Reference behind the portal plane: portal camera 0 ends up at x = -7.
        let fixture = corridor(-10.0);
        let (recorder, report) = run(&fixture, 10);

        assert_eq!(report.levels_rendered(), 1);
        assert!(report.levels[0].camera.position.abs_diff_eq(Vec3::new(-7.0, 0.0, 0.0), 1e-4));
        let (final_stencil, deepest) = simulate_covered_pixel(&recorder, fixture.portal.surface);
        assert_eq!((final_stencil, deepest), (0, 1));
    }

    #[test]
    fn visibility_classifies_viewer_side() {
        let fixture = corridor(3.0);
        assert_eq!(fixture.portal.visibility_from(&fixture.main), PortalVisibility::Visible);

        let behind = fixture.main.clone().with_pose(Vec3::new(-5.0, 0.0, 0.0), Quat::from_rotation_y(FRAC_PI_2));
        assert_eq!(fixture.portal.visibility_from(&behind), PortalVisibility::Behind);

        let looking_away = fixture.main.clone().with_pose(Vec3::ZERO, Quat::from_rotation_y(-FRAC_PI_2));
        assert_eq!(fixture.portal.visibility_from(&looking_away), PortalVisibility::OffScreen);
    }

    #[test]
    fn exit_camera_must_clear_the_destination_plane() {
        let fixture = corridor(3.0);
        assert!(fixture.portal.exit_is_clippable(&fixture.main));

        let on_surface = fixture.main.clone().with_pose(Vec3::new(-3.0, 0.0, 0.0), Quat::from_rotation_y(FRAC_PI_2));
        assert!(!fixture.portal.exit_is_clippable(&on_surface));
    }

    #[test]
    fn plain_render_is_clear_then_scene() {
        let fixture = corridor(3.0);
        let mut recorder = FrameRecorder::new(true);
        render_plain(&mut recorder, &fixture.scene, &fixture.main);

        assert_eq!(recorder.len(), 2);
        let draw = recorder.draws().next().map(|d| (d.target, d.pass));
        assert_eq!(draw, Some((DrawTarget::Scene, PassState::default())));
    }
}
