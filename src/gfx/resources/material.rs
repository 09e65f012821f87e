//! Flat material description
//!
//! A material is plain data uploaded as uniforms when a mesh is drawn. There
//! is no lighting model attached to it; shaders decide what to do with the
//! values.

use crate::math::Vector3;

/// Material definition with classic ambient/diffuse/specular terms
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Material {
    pub ambient: Vector3,
    pub diffuse: Vector3,
    pub specular: Vector3,
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vector3::splat(0.1),
            diffuse: Vector3::splat(0.8),
            specular: Vector3::ONE,
            shininess: 32.0,
        }
    }
}

impl Material {
    /// Creates a material with explicit terms
    ///
    /// # Arguments
    /// * `ambient` - Ambient color (0.0-1.0 per channel)
    /// * `diffuse` - Diffuse color
    /// * `specular` - Specular color
    /// * `shininess` - Specular exponent, clamped to be non-negative
    pub fn new(ambient: Vector3, diffuse: Vector3, specular: Vector3, shininess: f32) -> Self {
        Self {
            ambient,
            diffuse,
            specular,
            shininess: shininess.max(0.0),
        }
    }

    /// Convenience constructor: default material with a custom diffuse color
    pub fn with_diffuse(r: f32, g: f32, b: f32) -> Self {
        Self {
            diffuse: Vector3::new(r, g, b),
            ..Self::default()
        }
    }
}
