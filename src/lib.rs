// src/lib.rs

pub mod demo_scene;
pub mod engine_lib;
pub mod rendering_lib;
