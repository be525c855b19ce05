// src/rendering_lib/backend.rs

use crate::engine_lib::camera::Camera;
use crate::engine_lib::scene_types::{ObjectId, Scene};

/// Which planes of the framebuffer a clear touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClearFlags {
    pub color: bool,
    pub depth: bool,
    pub stencil: bool,
}

impl ClearFlags {
    pub const ALL: ClearFlags = ClearFlags { color: true, depth: true, stencil: true };
    pub const DEPTH: ClearFlags = ClearFlags { color: false, depth: true, stencil: false };
    pub const NONE: ClearFlags = ClearFlags { color: false, depth: false, stencil: false };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearRegion {
    Full,
    /// Only pixels whose stencil value equals the reference.
    StencilEqual(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StencilTest {
    Always,
    Equal(u32),
}

impl StencilTest {
    pub fn reference(self) -> u32 {
        match self {
            StencilTest::Always => 0,
            StencilTest::Equal(reference) => reference,
        }
    }
}

/// Applied to the stencil value where both stencil and depth tests pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    IncrementClamp,
    DecrementClamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DepthTest {
    Less,
    Always,
}

/// Fixed-function state for one draw submission.
///
/// `exclude` hides one object for this draw only; scene objects carry no visibility
/// state that would need restoring afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassState {
    pub stencil_test: StencilTest,
    pub stencil_op: StencilOp,
    pub depth_test: DepthTest,
    pub color_write: bool,
    pub depth_write: bool,
    pub exclude: Option<ObjectId>,
}

impl Default for PassState {
    fn default() -> Self {
        Self {
            stencil_test: StencilTest::Always,
            stencil_op: StencilOp::Keep,
            depth_test: DepthTest::Less,
            color_write: true,
            depth_write: true,
            exclude: None,
        }
    }
}

impl PassState {
    /// Regular color + depth draw restricted to one stencil value.
    pub fn masked(reference: u32, exclude: Option<ObjectId>) -> Self {
        Self { stencil_test: StencilTest::Equal(reference), exclude, ..Self::default() }
    }

    /// Invisible draw that bumps the stencil from `level` to `level + 1` where the geometry
    /// is visible.
    pub fn stencil_mark(level: u32) -> Self {
        Self {
            stencil_test: StencilTest::Equal(level),
            stencil_op: StencilOp::IncrementClamp,
            depth_test: DepthTest::Less,
            color_write: false,
            depth_write: false,
            exclude: None,
        }
    }

    /// Invisible draw that writes the geometry's depth over the nested view and returns the
    /// stencil from `level + 1` to `level`.
    pub fn depth_restore(level: u32) -> Self {
        Self {
            stencil_test: StencilTest::Equal(level + 1),
            stencil_op: StencilOp::DecrementClamp,
            depth_test: DepthTest::Always,
            color_write: false,
            depth_write: true,
            exclude: None,
        }
    }
}

/// The engine layer a portal frame is submitted to.
pub trait RenderBackend {
    fn supports_stencil(&self) -> bool;

    fn clear(&mut self, buffers: ClearFlags, region: ClearRegion);

    /// Draws every object of `scene` except `pass.exclude`.
    fn draw_scene(&mut self, scene: &Scene, camera: &Camera, pass: &PassState);

    fn draw_object(&mut self, scene: &Scene, object: ObjectId, camera: &Camera, pass: &PassState);
}
