// src/lib.rs
//! Lumen3D
//!
//! A minimal real-time rendering core: vector and matrix math, transforms,
//! meshes and materials, cube and plane primitives, and a graphics engine
//! that drives a GL-style GPU context (shader programs, buffers, vertex
//! arrays, uniforms, draw calls and frame timing).
//!
//! Rendering goes through the [`gpu::GpuContext`] trait. The crate ships an
//! in-memory [`gpu::recording::RecordingContext`] and a wgpu backend,
//! [`wgpu_utils::WgpuContext`].

pub mod driver;
pub mod gfx;
pub mod gpu;
pub mod math;
pub mod performance;
pub mod prelude;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use driver::{DriverConfig, FrameDriver, FrameHandler, RunHandle};
pub use gfx::GraphicsEngine;
