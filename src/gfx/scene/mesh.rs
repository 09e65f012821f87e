use crate::gfx::resources::material::Material;
use crate::math::Vector3;

use super::object::Object3D;

/// Number of floats describing one vertex position
pub const COMPONENTS_PER_VERTEX: usize = 3;

/// CPU-side triangle mesh.
///
/// Vertex positions (3 floats each) and triangle indices (3 per triangle) are
/// fixed once the mesh is built; the transform and material stay mutable so
/// applications can animate them every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<f32>,
    indices: Vec<u32>,
    pub transform: Object3D,
    pub material: Material,
}

impl Mesh {
    pub fn new(vertices: Vec<f32>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            transform: Object3D::default(),
            material: Material::default(),
        }
    }

    pub fn with_transform(mut self, transform: Object3D) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Flat vertex positions, `x, y, z` per vertex
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    /// Triangle indices, three per triangle
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / COMPONENTS_PER_VERTEX
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Position of vertex `index`, if it exists
    pub fn vertex(&self, index: usize) -> Option<Vector3> {
        let start = index * COMPONENTS_PER_VERTEX;
        let slice = self.vertices.get(start..start + COMPONENTS_PER_VERTEX)?;
        Some(Vector3::new(slice[0], slice[1], slice[2]))
    }

    /// Iterates triangles as index triples; a trailing partial triple is ignored
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|triangle| [triangle[0], triangle[1], triangle[2]])
    }
}
