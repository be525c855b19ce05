// src/engine_lib/mod.rs
pub mod camera;
pub mod config;
pub mod controller;
pub mod error;
pub mod frustum;
pub mod oblique;
pub mod portal_camera;
pub mod portal_renderer;
pub mod scene_types;
pub mod stencil_recursion;
pub mod transform;

pub use camera::{Camera, DepthRange};
pub use config::PortalConfig;
pub use controller::{CameraController, PortalRequests};
pub use error::PortalError;
pub use portal_renderer::{PortalHandle, PortalRenderer};
pub use scene_types::{MeshKind, ObjectId, Scene, SceneObject};
pub use stencil_recursion::{FallbackReason, FrameReport, RenderMode};
pub use transform::{Plane, Pose};
