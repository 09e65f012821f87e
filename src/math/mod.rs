//! # Transform Math
//!
//! Small, self-contained vector and matrix types used by the scene and the
//! engine. Matrices are column-major `f32` so they can be uploaded to the GPU
//! without conversion; both types convert to and from their `cgmath`
//! counterparts for interop with the wider ecosystem.

pub mod matrix4x4;
pub mod vector3;

pub use matrix4x4::{ClipDepth, Matrix4x4};
pub use vector3::Vector3;
