//! # Graphics Module
//!
//! Scene data and the engine that puts it on the GPU.
//!
//! ## Architecture Overview
//!
//! - **Scene** ([`scene`]) - [`Object3D`] transforms and CPU-side [`Mesh`]es
//! - **Geometry** ([`geometry`]) - cube and plane generators
//! - **Resources** ([`resources`]) - materials and render target textures
//! - **Engine** ([`engine`]) - program, buffer, vertex array, uniform and
//!   draw management over any [`crate::gpu::GpuContext`]
//! - **Shapes** ([`shape`]) - drawable instances of loaded meshes
//!
//! ## Usage
//!
//! ```
//! use lumen3d::gfx::{engine::EngineConfig, geometry::generate_plane, scene::Object3D, GraphicsEngine};
//! use lumen3d::gpu::recording::RecordingContext;
//!
//! let mut engine = GraphicsEngine::new(RecordingContext::new(), 800, 600, EngineConfig::default());
//! engine.load_program(
//!     "uniform mat4 matWorld; uniform mat4 matViewProj; in vec3 vertexPosition;
//!      void main() { gl_Position = matViewProj * matWorld * vec4(vertexPosition, 1.0); }",
//!     "out vec4 color; void main() { color = vec4(1.0); }",
//! )?;
//! let plane = engine.load_mesh(generate_plane(10.0, Object3D::default()))?;
//! engine.clear()?;
//! engine.draw_mesh(&plane)?;
//! # Ok::<(), lumen3d::gfx::engine::EngineError>(())
//! ```

pub mod engine;
pub mod geometry;
pub mod resources;
pub mod scene;
pub mod shape;

// Re-export commonly used types
pub use engine::GraphicsEngine;
pub use resources::material::Material;
pub use scene::{Mesh, Object3D};
pub use shape::{Renderable, Shape};
