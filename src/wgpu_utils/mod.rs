//! wgpu backend
//!
//! Maps the GL-style [`crate::gpu::GpuContext`] interface onto wgpu, with
//! WGSL reflection for attribute and uniform lookups.

pub mod context;
pub mod reflect;
pub mod uniform_buffer;

pub use context::{HeadlessSurfaces, WgpuContext};
pub use reflect::ShaderInterface;
pub use uniform_buffer::{UniformBlock, UniformLayout};
