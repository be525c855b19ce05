// src/engine_lib/portal_renderer.rs

use glam::{Mat4, Vec3};

use crate::engine_lib::camera::Camera;
use crate::engine_lib::config::PortalConfig;
use crate::engine_lib::error::PortalError;
use crate::engine_lib::scene_types::{MeshKind, ObjectId, Scene};
use crate::engine_lib::stencil_recursion::{
    render_plain, FallbackReason, FrameReport, ResolvedPortal, RenderMode, StencilRecursion,
};
use crate::rendering_lib::backend::RenderBackend;

const PORTAL_SURFACE_COLOR: [f32; 4] = [0.6, 0.8, 1.0, 1.0];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortalHandle(u32);

#[derive(Clone, Debug)]
struct Portal {
    handle: PortalHandle,
    surface: ObjectId,
    reference_transform: Mat4,
}

/// Entry point the application calls once per frame in place of a plain scene render.
pub struct PortalRenderer {
    config: PortalConfig,
    main_camera: Camera,
    camera_pool: Vec<Camera>,
    portal: Option<Portal>,
    next_handle: u32,
    /// What the backend reported on the last `render()`; `None` before the first frame.
    stencil_supported: Option<bool>,
    report: FrameReport,
}

impl PortalRenderer {
    pub fn new(main_camera: Camera, config: PortalConfig) -> Self {
        let camera_pool = vec![main_camera.clone(); config.max_depth() as usize];
        Self {
            config,
            main_camera,
            camera_pool,
            portal: None,
            next_handle: 0,
            stencil_supported: None,
            report: FrameReport::default(),
        }
    }

    /// Adds a `width × height` portal surface to `scene` and pairs it with a reference point.
    /// Any previously created portal is removed first.
    pub fn create_portal(
        &mut self,
        scene: &mut Scene,
        width: f32,
        height: f32,
        surface_transform: Mat4,
        reference_transform: Mat4,
    ) -> Result<PortalHandle, PortalError> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(PortalError::InvalidExtent { width, height });
        }
        check_invertible(&surface_transform)?;
        check_invertible(&reference_transform)?;

        if let Some(previous) = self.portal.take() {
            log::info!("Replacing portal {:?}", previous.handle);
            scene.remove_object(previous.surface);
        }

        let handle = PortalHandle(self.next_handle);
        self.next_handle += 1;
        let surface = scene.add_object(
            format!("portal_surface_{}", handle.0),
            MeshKind::Quad,
            surface_transform,
            Vec3::new(width, height, 1.0),
            PORTAL_SURFACE_COLOR,
        );
        self.portal = Some(Portal { handle, surface, reference_transform });
        log::info!("Created portal {handle:?} ({width} x {height}) as scene object {surface}");
        Ok(handle)
    }

    pub fn remove_portal(&mut self, scene: &mut Scene, handle: PortalHandle) -> Result<(), PortalError> {
        match self.portal.take() {
            Some(portal) if portal.handle == handle => {
                scene.remove_object(portal.surface);
                log::info!("Removed portal {handle:?}");
                Ok(())
            }
            other => {
                self.portal = other;
                Err(PortalError::UnknownPortal(handle))
            }
        }
    }

    /// Moves an existing portal's surface and reference point.
    pub fn set_portal_transforms(
        &mut self,
        scene: &mut Scene,
        handle: PortalHandle,
        surface_transform: Mat4,
        reference_transform: Mat4,
    ) -> Result<(), PortalError> {
        let portal = self
            .portal
            .as_mut()
            .filter(|p| p.handle == handle)
            .ok_or(PortalError::UnknownPortal(handle))?;
        check_invertible(&surface_transform)?;
        check_invertible(&reference_transform)?;

        let object = scene
            .object_mut(portal.surface)
            .ok_or(PortalError::UnknownPortal(handle))?;
        object.transform = surface_transform;
        portal.reference_transform = reference_transform;
        Ok(())
    }

    pub fn portal_surface(&self) -> Option<ObjectId> {
        self.portal.as_ref().map(|p| p.surface)
    }

    /// Renders one frame into `backend`: the recursive portal composition when it applies,
    /// a plain scene render otherwise.
    pub fn render<B: RenderBackend>(&mut self, backend: &mut B, scene: &Scene) -> &FrameReport {
        self.check_stencil(backend.supports_stencil());
        let portal = match self.resolve_portal(scene) {
            Ok(portal) => portal,
            Err(reason) => {
                log::trace!("Plain render: {reason:?}");
                self.report.reset(RenderMode::Plain(reason));
                render_plain(backend, scene, &self.main_camera);
                return &self.report;
            }
        };

        let max_depth = self.config.max_depth();
        StencilRecursion::new(backend, scene, &portal, max_depth, &mut self.report)
            .run(&self.main_camera, &mut self.camera_pool[..max_depth as usize]);
        &self.report
    }

    fn resolve_portal(&self, scene: &Scene) -> Result<ResolvedPortal, FallbackReason> {
        if !self.config.enabled {
            return Err(FallbackReason::Disabled);
        }
        let portal = self.portal.as_ref().ok_or(FallbackReason::NoPortal)?;
        let Some(surface) = scene.object(portal.surface) else {
            log::debug!("Portal surface {} is no longer in the scene", portal.surface);
            return Err(FallbackReason::NoPortal);
        };

        let resolved = ResolvedPortal::new(surface, portal.reference_transform);
        match resolved.visibility_from(&self.main_camera).fallback_reason() {
            Some(reason) => Err(reason),
            None => Ok(resolved),
        }
    }

    pub fn last_report(&self) -> &FrameReport {
        &self.report
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.config.enabled != enabled {
            log::debug!("Portal rendering {}", if enabled { "enabled" } else { "disabled" });
        }
        self.config.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn toggle_enabled(&mut self) -> bool {
        self.set_enabled(!self.config.enabled);
        self.config.enabled
    }

    /// Clamps to `[1, 10]` and returns the depth applied. The camera pool only ever grows.
    pub fn set_recursion_depth(&mut self, depth: u32) -> u32 {
        let applied = self.config.set_max_depth(depth);
        if self.camera_pool.len() < applied as usize {
            self.camera_pool.resize(applied as usize, self.main_camera.clone());
        }
        applied
    }

    pub fn recursion_depth(&self) -> u32 {
        self.config.max_depth()
    }

    pub fn set_main_camera(&mut self, camera: Camera) {
        self.main_camera = camera;
    }

    pub fn main_camera(&self) -> &Camera {
        &self.main_camera
    }

    pub fn main_camera_mut(&mut self) -> &mut Camera {
        &mut self.main_camera
    }

    /// The portal camera used for `level` during the last portal frame.
    pub fn portal_camera(&self, level: u32) -> Option<&Camera> {
        self.camera_pool.get(level as usize)
    }

    pub fn camera_pool_len(&self) -> usize {
        self.camera_pool.len()
    }

    pub fn stencil_supported(&self) -> Option<bool> {
        self.stencil_supported
    }

    /// Warns once whenever the backend starts reporting no stencil buffer.
    fn check_stencil(&mut self, supported: bool) {
        if self.stencil_supported == Some(supported) {
            return;
        }
        if !supported {
            log::warn!("Render target has no stencil buffer; portals will render without silhouette masking");
        }
        self.stencil_supported = Some(supported);
    }
}

fn check_invertible(transform: &Mat4) -> Result<(), PortalError> {
    let det = transform.determinant();
    if !det.is_finite() || det.abs() <= f32::EPSILON {
        return Err(PortalError::SingularTransform);
    }
    Ok(())
}
