//! # GPU Command Interface
//!
//! The engine never talks to a graphics API directly. Everything it needs
//! (buffers, shaders, programs, vertex arrays, uniforms, draw submission and
//! fixed render state) goes through the [`GpuContext`] trait, a GL-style
//! immediate interface over opaque integer handles.
//!
//! Binding state (current buffer per target, current vertex array, current
//! program) is global to a context, exactly as in GL. Callers are expected to
//! restore it after use; see [`crate::gfx::engine::BindScope`].
//!
//! Two implementations ship with the crate:
//!
//! - [`recording::RecordingContext`] keeps everything in memory and records
//!   the command stream. It is what the test-suite renders against.
//! - [`crate::wgpu_utils::WgpuContext`] maps the interface onto wgpu with an
//!   offscreen color and depth target.

pub mod recording;
pub mod source;
pub mod uniform;

use thiserror::Error;

pub use crate::math::ClipDepth;
pub use uniform::{UniformKind, UniformValue};

/// Result alias for backend operations
pub type GpuResult<T> = Result<T, GpuError>;

/// Failures reported by a [`GpuContext`] implementation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GpuError {
    #[error("failed to allocate {0}")]
    Allocation(&'static str),
    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u32 },
    #[error("no {0} is bound")]
    NothingBound(&'static str),
    #[error("unsupported {0}")]
    Unsupported(String),
    #[error("{0}")]
    Backend(String),
}

/// Failures while turning a named surface into a usable context
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AcquireError {
    #[error("surface \"{0}\" not found")]
    SurfaceNotFound(String),
    #[error("GPU context unavailable: {0}")]
    ContextUnavailable(String),
}

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

handle!(
    /// GPU buffer handle
    BufferId
);
handle!(
    /// Shader object handle
    ShaderId
);
handle!(
    /// Linked program handle
    ProgramId
);
handle!(
    /// Vertex array object handle
    VertexArrayId
);

/// Location of a uniform inside a specific program.
///
/// The index is backend defined and only meaningful together with the
/// program it was resolved from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct UniformLocation {
    pub program: ProgramId,
    pub index: u32,
}

/// Bind target of a buffer
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Per-vertex attribute data (GL `ARRAY_BUFFER`)
    Vertex,
    /// Triangle indices (GL `ELEMENT_ARRAY_BUFFER`)
    Index,
}

impl BufferKind {
    pub const ALL: [BufferKind; 2] = [BufferKind::Vertex, BufferKind::Index];

    pub fn name(self) -> &'static str {
        match self {
            BufferKind::Vertex => "vertex",
            BufferKind::Index => "index",
        }
    }
}

/// Placement hint for buffer storage; never affects correctness
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum BufferUsage {
    #[default]
    Static,
    Dynamic,
    Stream,
}

impl BufferUsage {
    pub const ALL: [BufferUsage; 3] = [BufferUsage::Static, BufferUsage::Dynamic, BufferUsage::Stream];
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

/// Fixed-function render state toggles
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    DepthTest,
    CullFace,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum CullFace {
    Front,
    #[default]
    Back,
}

/// Winding that identifies a front face
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum FrontFace {
    #[default]
    Ccw,
    Cw,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
}

/// Scalar type of one attribute component
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum ComponentType {
    #[default]
    Float,
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
}

impl ComponentType {
    pub fn size_in_bytes(self) -> u32 {
        match self {
            ComponentType::Byte | ComponentType::UnsignedByte => 1,
            ComponentType::Short | ComponentType::UnsignedShort => 2,
            ComponentType::Float | ComponentType::Int | ComponentType::UnsignedInt => 4,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum IndexType {
    UnsignedShort,
    #[default]
    UnsignedInt,
}

impl IndexType {
    pub fn size_in_bytes(self) -> usize {
        match self {
            IndexType::UnsignedShort => 2,
            IndexType::UnsignedInt => 4,
        }
    }
}

/// How one attribute is read from the buffer bound to [`BufferKind::Vertex`]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AttributeLayout {
    pub components: u32,
    pub component_type: ComponentType,
    pub normalized: bool,
    /// Bytes between consecutive vertices, 0 for tightly packed
    pub stride: u32,
    /// Byte offset of the first component
    pub offset: u32,
}

impl AttributeLayout {
    /// Bytes consumed by one vertex's worth of this attribute
    pub fn element_size(&self) -> u32 {
        self.components * self.component_type.size_in_bytes()
    }

    /// Stride with 0 resolved to the tightly packed size
    pub fn effective_stride(&self) -> u32 {
        if self.stride == 0 {
            self.element_size()
        } else {
            self.stride
        }
    }
}

/// A context together with the pixel size of the surface it renders to
pub struct AcquiredSurface<C> {
    pub context: C,
    pub width: u32,
    pub height: u32,
}

/// Hands out GPU contexts for named surfaces (canvases, windows, offscreen targets)
pub trait SurfaceProvider {
    type Context: GpuContext;

    fn acquire(&mut self, surface: &str) -> Result<AcquiredSurface<Self::Context>, AcquireError>;
}

/// GL-style GPU command interface.
///
/// Compile and link report the backend's diagnostic log as the error string.
/// Lookups return `None` for names the linked program does not expose.
pub trait GpuContext {
    /// Clip-space depth range this backend's rasterizer expects
    fn clip_depth(&self) -> ClipDepth;

    fn enable(&mut self, capability: Capability);
    fn disable(&mut self, capability: Capability);
    fn cull_face(&mut self, face: CullFace);
    fn front_face(&mut self, winding: FrontFace);
    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);
    /// Clears color to `rgba` (0-1 floats) and depth to the far plane
    fn clear(&mut self, rgba: [f32; 4]) -> GpuResult<()>;

    fn create_buffer(&mut self) -> GpuResult<BufferId>;
    fn bind_buffer(&mut self, target: BufferKind, buffer: Option<BufferId>);
    /// Replaces the storage of the buffer bound to `target`
    fn buffer_data(&mut self, target: BufferKind, data: &[u8], usage: BufferUsage)
        -> GpuResult<()>;
    fn delete_buffer(&mut self, buffer: BufferId);

    fn create_shader(&mut self, stage: ShaderStage) -> GpuResult<ShaderId>;
    fn compile_shader(&mut self, shader: ShaderId, source: &str) -> Result<(), String>;
    fn delete_shader(&mut self, shader: ShaderId);

    fn create_program(&mut self) -> GpuResult<ProgramId>;
    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId);
    fn link_program(&mut self, program: ProgramId) -> Result<(), String>;
    fn use_program(&mut self, program: Option<ProgramId>);
    fn delete_program(&mut self, program: ProgramId);

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32>;
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation>;
    /// Writes a uniform of the program currently in use
    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue);

    fn create_vertex_array(&mut self) -> GpuResult<VertexArrayId>;
    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>);
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId);
    fn enable_vertex_attrib(&mut self, location: u32);
    /// Records `layout` for `location` in the bound vertex array, reading
    /// from the buffer currently bound to [`BufferKind::Vertex`]
    fn vertex_attrib_pointer(&mut self, location: u32, layout: AttributeLayout) -> GpuResult<()>;

    fn draw_arrays(&mut self, mode: PrimitiveMode, first: u32, count: u32) -> GpuResult<()>;
    fn draw_elements(
        &mut self,
        mode: PrimitiveMode,
        count: u32,
        index_type: IndexType,
        offset: usize,
    ) -> GpuResult<()>;
}
