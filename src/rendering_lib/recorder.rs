// src/rendering_lib/recorder.rs

use glam::{Mat4, Vec3};

use super::backend::{ClearFlags, ClearRegion, PassState, RenderBackend};
use crate::engine_lib::camera::Camera;
use crate::engine_lib::scene_types::{ObjectId, Scene};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawTarget {
    /// Every drawable object except `PassState::exclude`.
    Scene,
    Object(ObjectId),
}

/// A draw with the camera already reduced to what the GPU needs.
#[derive(Clone, Copy, Debug)]
pub struct DrawCommand {
    pub target: DrawTarget,
    pub view_proj: Mat4,
    pub camera_position: Vec3,
    pub pass: PassState,
}

#[derive(Clone, Copy, Debug)]
pub enum RenderCommand {
    Clear { buffers: ClearFlags, region: ClearRegion },
    Draw(DrawCommand),
}

/// Backend that records one frame's submissions in order. The wgpu renderer replays the
/// recording; tests and benches inspect it directly.
#[derive(Debug)]
pub struct FrameRecorder {
    commands: Vec<RenderCommand>,
    stencil_supported: bool,
}

impl FrameRecorder {
    pub fn new(stencil_supported: bool) -> Self {
        Self { commands: Vec::with_capacity(64), stencil_supported }
    }

    /// Drops the previous frame's commands, keeping the allocation.
    pub fn begin_frame(&mut self) {
        self.commands.clear();
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn draws(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands.iter().filter_map(|command| match command {
            RenderCommand::Draw(draw) => Some(draw),
            RenderCommand::Clear { .. } => None,
        })
    }

    pub fn draw_count(&self) -> usize {
        self.draws().count()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl RenderBackend for FrameRecorder {
    fn supports_stencil(&self) -> bool {
        self.stencil_supported
    }

    fn clear(&mut self, buffers: ClearFlags, region: ClearRegion) {
        self.commands.push(RenderCommand::Clear { buffers, region });
    }

    fn draw_scene(&mut self, _scene: &Scene, camera: &Camera, pass: &PassState) {
        self.commands.push(RenderCommand::Draw(DrawCommand {
            target: DrawTarget::Scene,
            view_proj: camera.view_projection_matrix(),
            camera_position: camera.position,
            pass: *pass,
        }));
    }

    fn draw_object(&mut self, scene: &Scene, object: ObjectId, camera: &Camera, pass: &PassState) {
        if scene.object(object).is_none() {
            log::debug!("Skipping draw of object {object}: not in scene");
            return;
        }
        self.commands.push(RenderCommand::Draw(DrawCommand {
            target: DrawTarget::Object(object),
            view_proj: camera.view_projection_matrix(),
            camera_position: camera.position,
            pass: *pass,
        }));
    }
}
