// src/engine_lib/config.rs

pub const MIN_RECURSION_DEPTH: u32 = 1;
pub const MAX_RECURSION_DEPTH: u32 = 10;
pub const DEFAULT_RECURSION_DEPTH: u32 = 3;

/// Per-frame portal settings. Read at the start of every `render()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortalConfig {
    pub enabled: bool,
    max_depth: u32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self { enabled: true, max_depth: DEFAULT_RECURSION_DEPTH }
    }
}

impl PortalConfig {
    pub fn new(enabled: bool, max_depth: u32) -> Self {
        Self { enabled, max_depth: clamp_depth(max_depth) }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Returns the depth actually applied.
    pub fn set_max_depth(&mut self, depth: u32) -> u32 {
        self.max_depth = clamp_depth(depth);
        self.max_depth
    }
}

pub fn clamp_depth(depth: u32) -> u32 {
    depth.clamp(MIN_RECURSION_DEPTH, MAX_RECURSION_DEPTH)
}
