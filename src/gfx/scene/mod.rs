//! # Scene Module
//!
//! Entities hold their transform by value: a [`Mesh`] embeds an
//! [`Object3D`] next to its vertex data and material. There is no parent /
//! child hierarchy; every world matrix comes straight from one transform.

pub mod mesh;
pub mod object;

pub use mesh::{Mesh, COMPONENTS_PER_VERTEX};
pub use object::Object3D;
