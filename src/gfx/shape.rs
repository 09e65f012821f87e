//! Drawable instances
//!
//! A [`Shape`] reuses the GPU objects of a [`LoadedMesh`] with its own
//! transform and material, so one uploaded cube can be drawn many times per
//! frame at different places.

use crate::gfx::engine::{EngineResult, GraphicsEngine, LoadedMesh};
use crate::gfx::resources::material::Material;
use crate::gfx::scene::Object3D;
use crate::gpu::{GpuContext, VertexArrayId};

/// Anything that can submit itself to a [`GraphicsEngine`]
pub trait Renderable {
    fn draw<C: GpuContext>(&self, engine: &mut GraphicsEngine<C>) -> EngineResult<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub transform: Object3D,
    pub material: Material,
    vertex_array: VertexArrayId,
    index_count: u32,
}

impl Shape {
    /// Instance of `loaded` starting with the mesh's own transform and material
    pub fn from_loaded(loaded: &LoadedMesh) -> Self {
        Self {
            transform: loaded.mesh.transform,
            material: loaded.mesh.material,
            vertex_array: loaded.vertex_array(),
            index_count: loaded.index_count(),
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

    pub fn vertex_array(&self) -> VertexArrayId {
        self.vertex_array
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

impl Renderable for Shape {
    fn draw<C: GpuContext>(&self, engine: &mut GraphicsEngine<C>) -> EngineResult<()> {
        engine.draw_instance(
            &self.transform,
            &self.material,
            self.vertex_array,
            self.index_count,
        )
    }
}

impl Renderable for LoadedMesh {
    fn draw<C: GpuContext>(&self, engine: &mut GraphicsEngine<C>) -> EngineResult<()> {
        engine.draw_mesh(self)
    }
}
