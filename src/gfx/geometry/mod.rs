//! # Procedural Geometry Generation
//!
//! Functions that build common primitive meshes without external model files.
//!
//! ## Supported Primitives
//!
//! - **Cube**: 24 vertices (4 per face, not shared) and 36 indices
//! - **Plane**: 4 vertices and 6 indices in the XZ plane
//!
//! ## Usage
//!
//! ```rust
//! use lumen3d::gfx::geometry::{generate_cube, generate_plane};
//! use lumen3d::gfx::scene::Object3D;
//! use lumen3d::math::Vector3;
//!
//! let floor = generate_plane(10.0, Object3D::default());
//! let crate_box = generate_cube(
//!     1.0,
//!     Object3D::new(Vector3::new(0.0, 0.5, 0.0), Vector3::new(0.0, 45.0, 0.0), Vector3::ONE),
//! );
//! assert_eq!(floor.vertex_count(), 4);
//! assert_eq!(crate_box.vertex_count(), 24);
//! ```

pub mod primitives;

pub use primitives::*;
