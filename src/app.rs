// src/app.rs

use thiserror::Error;
use winit::{
    event::{DeviceEvent, WindowEvent},
    window::{CursorGrabMode, Window},
};

use crate::ui::{build_ui, UiState};
use portal_engine::demo_scene;
use portal_engine::engine_lib::{Camera, CameraController, PortalConfig, PortalError, PortalRenderer, Scene};
use portal_engine::rendering_lib::{FrameRecorder, Renderer, RendererConfig, WGSL_SHADER_SOURCE};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("could not create a rendering surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible graphics adapter")]
    NoAdapter,
    #[error("could not open the graphics device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("could not set up the demo portal: {0}")]
    Portal(#[from] PortalError),
}

pub struct PortalApp {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    renderer: Renderer,
    recorder: FrameRecorder,
    scene: Scene,
    portal_renderer: PortalRenderer,
    camera_controller: CameraController,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
    is_focused: bool,
}

impl PortalApp {
    pub async fn new(window: std::sync::Arc<Window>) -> Result<Self, AppError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window.clone())?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(AppError::NoAdapter)?;
        log::info!("Using adapter {:?}", adapter.get_info().name);
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    label: None,
                },
                None,
            )
            .await?;

        let renderer_config = RendererConfig::default();
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: renderer_config.present_mode,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let renderer = Renderer::new(&device, config.format, WGSL_SHADER_SOURCE, renderer_config, config.width, config.height);
        let recorder = FrameRecorder::new(renderer.supports_stencil());

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, config.format, None, 1);

        let demo_scene::DemoScene { mut scene, portal, camera_pose, camera_yaw_rad, camera_pitch_rad } =
            demo_scene::create_corridor_scene();

        let aspect = config.width as f32 / config.height as f32;
        let camera = Camera::new(75.0, aspect, 0.1, 100.0).with_pose(camera_pose.position, camera_pose.orientation);
        let mut portal_renderer = PortalRenderer::new(camera, PortalConfig::default());
        portal_renderer.create_portal(
            &mut scene,
            portal.width,
            portal.height,
            portal.surface_transform,
            portal.reference_transform,
        )?;

        let initial_focus = window.has_focus();
        let mut initial_grab = false;
        if initial_focus {
            if window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_e| window.set_cursor_grab(CursorGrabMode::Locked))
                .is_ok()
            {
                window.set_cursor_visible(false);
                initial_grab = true;
            } else {
                log::warn!("Could not grab cursor on init");
            }
        }

        let camera_controller = CameraController::new(camera_yaw_rad, camera_pitch_rad, initial_grab, 0.002);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            renderer,
            recorder,
            scene,
            portal_renderer,
            camera_controller,
            egui_ctx,
            egui_state,
            egui_renderer,
            is_focused: initial_focus,
        })
    }

    pub fn get_size(&self) -> winit::dpi::PhysicalSize<u32> {
        self.size
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.renderer.resize(&self.device, new_size.width, new_size.height);
            self.portal_renderer
                .main_camera_mut()
                .set_aspect(new_size.width as f32 / new_size.height as f32);
        }
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.is_focused = focused;
    }

    pub fn update(&mut self, dt: f32) {
        self.camera_controller.apply_to_camera(self.portal_renderer.main_camera_mut(), dt);

        let requests = self.camera_controller.take_portal_requests();
        if requests.toggle_enabled {
            self.portal_renderer.toggle_enabled();
        }
        if requests.depth_delta != 0 {
            let current = self.portal_renderer.recursion_depth() as i32;
            let applied = self
                .portal_renderer
                .set_recursion_depth((current + requests.depth_delta).max(0) as u32);
            log::debug!("Recursion depth now {applied}");
        }
    }

    pub fn render(&mut self, window: &Window) -> Result<(), wgpu::SurfaceError> {
        let output_texture = self.surface.get_current_texture()?;
        let view = output_texture.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Main Command Encoder"),
        });

        self.recorder.begin_frame();
        self.portal_renderer.render(&mut self.recorder, &self.scene);
        self.renderer.encode(&self.device, &self.queue, &mut encoder, &view, &self.recorder, &self.scene);

        let mut ui_state = UiState {
            portals_enabled: self.portal_renderer.is_enabled(),
            recursion_depth: self.portal_renderer.recursion_depth(),
            report: self.portal_renderer.last_report().clone(),
            draw_commands: self.recorder.draw_count(),
            stencil_supported: self.portal_renderer.stencil_supported().unwrap_or(true),
        };
        let raw_input = self.egui_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, |ctx| build_ui(ctx, &mut ui_state));
        self.portal_renderer.set_enabled(ui_state.portals_enabled);
        self.portal_renderer.set_recursion_depth(ui_state.recursion_depth);

        self.egui_state.handle_platform_output(window, full_output.platform_output);
        let tris = self.egui_ctx.tessellate(full_output.shapes, self.egui_ctx.pixels_per_point());
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, image_delta);
        }
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };
        self.egui_renderer.update_buffers(&self.device, &self.queue, &mut encoder, &tris, &screen_descriptor);
        {
            let mut gui_render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("GUI Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.egui_renderer.render(&mut gui_render_pass, &tris, &screen_descriptor);
        }
        for tex_id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(tex_id);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output_texture.present();
        Ok(())
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent, window: &Window) -> bool {
        if self.egui_state.on_window_event(window, event).consumed {
            return true;
        }
        if self.camera_controller.handle_window_event(event, window) {
            return true;
        }
        match event {
            WindowEvent::Focused(focused) => {
                self.is_focused = *focused;
                false
            }
            _ => false,
        }
    }

    pub fn handle_device_event(&mut self, event: &DeviceEvent, _window: &Window) {
        if self.is_focused {
            self.camera_controller.handle_device_event(event);
        }
    }
}
