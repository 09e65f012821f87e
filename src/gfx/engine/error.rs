use thiserror::Error;

use crate::gpu::{AcquireError, BufferKind, GpuError, ShaderStage};

use super::shader_source::ShaderSourceError;

pub type EngineResult<T> = Result<T, EngineError>;

/// Fatal engine failures.
///
/// Recoverable conditions (missing uniforms, unknown uniform tags) never
/// show up here; they are logged and skipped where they happen.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Acquire(#[from] AcquireError),

    #[error("failed to compile {} shader: {log}", stage.name())]
    ShaderCompile { stage: ShaderStage, log: String },

    #[error("failed to link GPU program: {log}")]
    ProgramLink { log: String },

    #[error(transparent)]
    ShaderSource(#[from] ShaderSourceError),

    #[error("refusing to create an empty {} buffer", kind.name())]
    EmptyBuffer { kind: BufferKind },

    #[error("index data must hold non-negative integers, got {value}")]
    InvalidIndexData { value: f32 },

    #[error("vertex data of {len} floats is not a whole number of 3-component positions")]
    InvalidVertexData { len: usize },

    #[error("attribute \"{name}\" does not exist in the linked program")]
    MissingAttribute { name: String },

    #[error("no program is in use")]
    NoActiveProgram,

    #[error("draw count must be positive, got {count}")]
    InvalidDrawCount { count: i32 },

    #[error("first vertex {offset} does not fit in 32 bits")]
    InvalidDrawOffset { offset: usize },

    #[error(transparent)]
    Gpu(#[from] GpuError),
}
