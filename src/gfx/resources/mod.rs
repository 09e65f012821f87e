//! GPU-facing resources
//!
//! Materials (plain uniform data) and the render target textures used by
//! the wgpu backend.

pub mod material;
pub mod texture_resource;

pub use material::Material;
pub use texture_resource::TextureResource;
