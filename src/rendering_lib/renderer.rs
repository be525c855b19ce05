// src/rendering_lib/renderer.rs

use std::collections::HashMap;
use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::backend::{ClearFlags, ClearRegion, DepthTest, PassState, StencilOp, StencilTest};
use super::geometry::MeshLibrary;
use super::recorder::{DrawCommand, DrawTarget, FrameRecorder, RenderCommand};
use super::vertex::Vertex;
use crate::engine_lib::scene_types::{Scene, SceneObject};

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct DrawUniform {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

const DRAW_UNIFORM_SIZE: u64 = std::mem::size_of::<DrawUniform>() as u64;
const INITIAL_UNIFORM_SLOTS: u64 = 256;

#[derive(Clone, Copy, Debug)]
pub struct RendererConfig {
    /// Needs a stencil aspect for portal views to be masked to the portal silhouette.
    pub depth_format: wgpu::TextureFormat,
    pub clear_color: wgpu::Color,
    pub present_mode: wgpu::PresentMode,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            depth_format: wgpu::TextureFormat::Depth24PlusStencil8,
            clear_color: wgpu::Color { r: 0.05, g: 0.05, b: 0.1, a: 1.0 },
            present_mode: wgpu::PresentMode::Fifo,
        }
    }
}

impl RendererConfig {
    pub fn supports_stencil(&self) -> bool {
        self.depth_format.has_stencil_aspect()
    }
}

/// Everything that distinguishes one pipeline from another. The stencil reference is
/// dynamic pass state and is not part of the key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct PipelineKey {
    stencil_equal: bool,
    stencil_op: StencilOp,
    depth_test: DepthTest,
    color_write: bool,
    depth_write: bool,
    fullscreen: bool,
}

impl PipelineKey {
    fn for_pass(pass: &PassState) -> Self {
        Self {
            stencil_equal: matches!(pass.stencil_test, StencilTest::Equal(_)),
            stencil_op: pass.stencil_op,
            depth_test: pass.depth_test,
            color_write: pass.color_write,
            depth_write: pass.depth_write,
            fullscreen: false,
        }
    }

    /// Writes far depth over every pixel matching the stencil reference.
    fn depth_reset() -> Self {
        Self {
            stencil_equal: true,
            stencil_op: StencilOp::Keep,
            depth_test: DepthTest::Always,
            color_write: false,
            depth_write: true,
            fullscreen: true,
        }
    }
}

#[derive(Clone, Debug)]
enum DrawKind {
    Mesh { indices: std::ops::Range<u32>, base_vertex: i32, uniform_slot: u32 },
    Fullscreen,
}

#[derive(Clone, Debug)]
struct DrawItem {
    key: PipelineKey,
    stencil_reference: u32,
    kind: DrawKind,
}

/// Replay steps. A full clear can only happen as a load op, so it starts a new pass.
#[derive(Clone, Debug)]
enum Step {
    BeginPass(ClearFlags),
    Draw(DrawItem),
}

struct DepthTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl DepthTexture {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Portal Depth Stencil Texture"),
            size: wgpu::Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { _texture: texture, view }
    }
}

/// Replays a recorded portal frame with wgpu.
pub struct Renderer {
    config: RendererConfig,
    surface_format: wgpu::TextureFormat,
    shader_module: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    meshes: MeshLibrary,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,

    uniform_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_stride: u64,
    uniform_slots: u64,
    uniform_staging: Vec<u8>,

    depth: DepthTexture,
    steps: Vec<Step>,
}

impl Renderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        shader_source: &str,
        config: RendererConfig,
        width: u32,
        height: u32,
    ) -> Self {
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Portal Shader Module"),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(DRAW_UNIFORM_SIZE),
                },
                count: None,
            }],
            label: Some("draw_uniform_bind_group_layout"),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Portal Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });

        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let uniform_stride = DRAW_UNIFORM_SIZE.div_ceil(alignment) * alignment;
        let uniform_buffer = create_uniform_buffer(device, uniform_stride * INITIAL_UNIFORM_SLOTS);
        let uniform_bind_group = create_uniform_bind_group(device, &uniform_layout, &uniform_buffer);

        let meshes = MeshLibrary::build();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&meshes.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let mut index_data = meshes.indices.clone();
        // Keep the upload a multiple of four bytes for webgl.
        if index_data.len() % 2 == 1 {
            index_data.push(0);
        }
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: bytemuck::cast_slice(&index_data),
            usage: wgpu::BufferUsages::INDEX,
        });

        let depth = DepthTexture::new(device, config.depth_format, width, height);

        Self {
            config,
            surface_format,
            shader_module,
            pipeline_layout,
            pipelines: HashMap::new(),
            meshes,
            vertex_buffer,
            index_buffer,
            uniform_layout,
            uniform_buffer,
            uniform_bind_group,
            uniform_stride,
            uniform_slots: INITIAL_UNIFORM_SLOTS,
            uniform_staging: Vec::new(),
            depth,
            steps: Vec::new(),
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn supports_stencil(&self) -> bool {
        self.config.supports_stencil()
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth = DepthTexture::new(device, self.config.depth_format, width, height);
    }

    /// Encodes the recorded frame into `encoder`, targeting `color_view` and the renderer's
    /// own depth-stencil texture.
    pub fn encode(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        frame: &FrameRecorder,
        scene: &Scene,
    ) {
        self.build_steps(frame, scene);
        self.prepare_pipelines(device);
        self.upload_uniforms(device, queue);

        if self.steps.is_empty() {
            self.encode_pass(encoder, color_view, ClearFlags::ALL, &[]);
            return;
        }

        let mut start = 0;
        while start < self.steps.len() {
            let load = match &self.steps[start] {
                Step::BeginPass(flags) => {
                    start += 1;
                    *flags
                }
                Step::Draw(_) => ClearFlags::NONE,
            };
            let end = self.steps[start..]
                .iter()
                .position(|step| matches!(step, Step::BeginPass(_)))
                .map_or(self.steps.len(), |offset| start + offset);
            self.encode_pass(encoder, color_view, load, &self.steps[start..end]);
            start = end;
        }
    }

    /// Flattens recorded commands into per-object draws and fills the uniform staging area.
    fn build_steps(&mut self, frame: &FrameRecorder, scene: &Scene) {
        self.steps.clear();
        self.uniform_staging.clear();
        let mut slot = 0u32;

        for command in frame.commands() {
            match command {
                RenderCommand::Clear { buffers, region: ClearRegion::Full } => {
                    self.steps.push(Step::BeginPass(*buffers));
                }
                RenderCommand::Clear { buffers, region: ClearRegion::StencilEqual(reference) } => {
                    if buffers.color || buffers.stencil {
                        log::warn!("Stencil-region clear only resets depth; ignoring {:?}", buffers);
                    }
                    if buffers.depth {
                        self.steps.push(Step::Draw(DrawItem {
                            key: PipelineKey::depth_reset(),
                            stencil_reference: *reference,
                            kind: DrawKind::Fullscreen,
                        }));
                    }
                }
                RenderCommand::Draw(draw) => match draw.target {
                    DrawTarget::Scene => {
                        for object in scene.drawable(draw.pass.exclude) {
                            self.push_mesh_draw(draw, object, slot);
                            slot += 1;
                        }
                    }
                    DrawTarget::Object(id) => match scene.object(id) {
                        Some(object) => {
                            self.push_mesh_draw(draw, object, slot);
                            slot += 1;
                        }
                        None => log::debug!("Object {id} vanished before replay"),
                    },
                },
            }
        }
    }

    fn push_mesh_draw(&mut self, draw: &DrawCommand, object: &SceneObject, slot: u32) {
        let uniform = DrawUniform {
            view_proj: draw.view_proj.to_cols_array_2d(),
            model: object.model_matrix().to_cols_array_2d(),
            color: object.color,
        };
        let offset = slot as usize * self.uniform_stride as usize;
        self.uniform_staging.resize(offset + self.uniform_stride as usize, 0);
        self.uniform_staging[offset..offset + DRAW_UNIFORM_SIZE as usize].copy_from_slice(bytemuck::bytes_of(&uniform));

        let range = self.meshes.range(object.mesh);
        self.steps.push(Step::Draw(DrawItem {
            key: PipelineKey::for_pass(&draw.pass),
            stencil_reference: draw.pass.stencil_test.reference(),
            kind: DrawKind::Mesh { indices: range.indices.clone(), base_vertex: range.base_vertex, uniform_slot: slot },
        }));
    }

    fn prepare_pipelines(&mut self, device: &wgpu::Device) {
        let keys: Vec<PipelineKey> = self
            .steps
            .iter()
            .filter_map(|step| match step {
                Step::Draw(item) => Some(item.key),
                Step::BeginPass(_) => None,
            })
            .collect();
        for key in keys {
            if !self.pipelines.contains_key(&key) {
                let pipeline = self.create_pipeline(device, key);
                self.pipelines.insert(key, pipeline);
            }
        }
    }

    fn upload_uniforms(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        if self.uniform_staging.is_empty() {
            return;
        }
        let needed_slots = self.uniform_staging.len() as u64 / self.uniform_stride;
        if needed_slots > self.uniform_slots {
            let slots = needed_slots.next_power_of_two();
            log::debug!("Growing draw uniform buffer to {slots} slots");
            self.uniform_buffer = create_uniform_buffer(device, self.uniform_stride * slots);
            self.uniform_bind_group = create_uniform_bind_group(device, &self.uniform_layout, &self.uniform_buffer);
            self.uniform_slots = slots;
        }
        queue.write_buffer(&self.uniform_buffer, 0, &self.uniform_staging);
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        clear: ClearFlags,
        steps: &[Step],
    ) {
        let color_load = if clear.color { wgpu::LoadOp::Clear(self.config.clear_color) } else { wgpu::LoadOp::Load };
        let depth_load = if clear.depth { wgpu::LoadOp::Clear(1.0) } else { wgpu::LoadOp::Load };
        let stencil_ops = self.supports_stencil().then(|| wgpu::Operations {
            load: if clear.stencil { wgpu::LoadOp::Clear(0) } else { wgpu::LoadOp::Load },
            store: wgpu::StoreOp::Store,
        });

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Portal Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations { load: color_load, store: wgpu::StoreOp::Store },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth.view,
                depth_ops: Some(wgpu::Operations { load: depth_load, store: wgpu::StoreOp::Store }),
                stencil_ops,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);

        let mut bound: Option<PipelineKey> = None;
        for step in steps {
            let Step::Draw(item) = step else { continue };
            let Some(pipeline) = self.pipelines.get(&item.key) else {
                log::warn!("No pipeline prepared for {:?}", item.key);
                continue;
            };
            if bound != Some(item.key) {
                render_pass.set_pipeline(pipeline);
                bound = Some(item.key);
            }
            render_pass.set_stencil_reference(item.stencil_reference);
            match &item.kind {
                DrawKind::Mesh { indices, base_vertex, uniform_slot } => {
                    let offset = (*uniform_slot as u64 * self.uniform_stride) as u32;
                    render_pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
                    render_pass.draw_indexed(indices.clone(), *base_vertex, 0..1);
                }
                DrawKind::Fullscreen => {
                    render_pass.set_bind_group(0, &self.uniform_bind_group, &[0]);
                    render_pass.draw(0..3, 0..1);
                }
            }
        }
    }

    fn create_pipeline(&self, device: &wgpu::Device, key: PipelineKey) -> wgpu::RenderPipeline {
        let stencil = if self.supports_stencil() {
            let face = wgpu::StencilFaceState {
                compare: if key.stencil_equal { wgpu::CompareFunction::Equal } else { wgpu::CompareFunction::Always },
                fail_op: wgpu::StencilOperation::Keep,
                depth_fail_op: wgpu::StencilOperation::Keep,
                pass_op: match key.stencil_op {
                    StencilOp::Keep => wgpu::StencilOperation::Keep,
                    StencilOp::IncrementClamp => wgpu::StencilOperation::IncrementClamp,
                    StencilOp::DecrementClamp => wgpu::StencilOperation::DecrementClamp,
                },
            };
            wgpu::StencilState { front: face, back: face, read_mask: 0xff, write_mask: 0xff }
        } else {
            wgpu::StencilState::default()
        };

        let depth_compare = match key.depth_test {
            DepthTest::Less => wgpu::CompareFunction::Less,
            DepthTest::Always => wgpu::CompareFunction::Always,
        };
        let write_mask = if key.color_write { wgpu::ColorWrites::ALL } else { wgpu::ColorWrites::empty() };
        let (vs_entry, fs_entry, buffers): (&str, &str, &[wgpu::VertexBufferLayout]) = if key.fullscreen {
            ("vs_fullscreen", "fs_fullscreen", &[])
        } else {
            ("vs_main", "fs_main", &[Vertex::desc()])
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Portal Pass Pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState { module: &self.shader_module, entry_point: vs_entry, buffers },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader_module,
                entry_point: fs_entry,
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: self.config.depth_format,
                depth_write_enabled: key.depth_write,
                depth_compare,
                stencil,
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
            multiview: None,
        })
    }
}

fn create_uniform_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Draw Uniform Buffer"),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_uniform_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: NonZeroU64::new(DRAW_UNIFORM_SIZE),
            }),
        }],
        label: Some("draw_uniform_bind_group"),
    })
}
