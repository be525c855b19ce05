// src/engine_lib/error.rs

use thiserror::Error;

use crate::engine_lib::portal_renderer::PortalHandle;

#[derive(Debug, Error, PartialEq)]
pub enum PortalError {
    #[error("portal extent must be positive and finite, got {width} x {height}")]
    InvalidExtent { width: f32, height: f32 },
    #[error("portal surface transform is not invertible")]
    SingularTransform,
    #[error("unknown portal handle {0:?}")]
    UnknownPortal(PortalHandle),
}
