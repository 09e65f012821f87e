//! # Lumen3D Prelude
//!
//! Commonly used types in one import:
//!
//! ```rust
//! use lumen3d::prelude::*;
//!
//! let cube = generate_cube(1.0, Object3D::default());
//! assert_eq!(cube.triangle_count(), 12);
//! ```

// Math
pub use crate::math::{ClipDepth, Matrix4x4, Vector3};

// Scene and geometry
pub use crate::gfx::geometry::{generate_cube, generate_plane};
pub use crate::gfx::resources::Material;
pub use crate::gfx::scene::{Mesh, Object3D};
pub use crate::gfx::shape::{Renderable, Shape};

// Engine
pub use crate::gfx::engine::{
    DrawConfig, EngineConfig, EngineError, EngineResult, EngineState, GraphicsEngine, LoadedMesh,
    ShaderBindings, StaticShaders, VaoConfig, VertexAttribute,
};

// GPU interface and backends
pub use crate::gpu::recording::{RecordingContext, RecordingSurfaces};
pub use crate::gpu::{BufferKind, BufferUsage, GpuContext, PrimitiveMode, SurfaceProvider, UniformValue};
pub use crate::wgpu_utils::{HeadlessSurfaces, WgpuContext};

// Frame loop
pub use crate::driver::{DriverConfig, FrameDriver, FrameHandler, FrameSummary, RunHandle};
pub use crate::performance::{PerformanceMetrics, PerformanceMonitor};
