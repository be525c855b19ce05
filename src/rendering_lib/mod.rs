// src/rendering_lib/mod.rs

pub mod backend;
pub mod geometry;
pub mod recorder;
pub mod renderer;
pub mod shader;
pub mod vertex;

pub use backend::{ClearFlags, ClearRegion, DepthTest, PassState, RenderBackend, StencilOp, StencilTest};
pub use recorder::{DrawCommand, DrawTarget, FrameRecorder, RenderCommand};
pub use renderer::{Renderer, RendererConfig};
pub use shader::WGSL_SHADER_SOURCE;
pub use vertex::Vertex;
