use crate::gfx::scene::Mesh;
use crate::gpu::{BufferId, VertexArrayId};

/// A mesh together with the GPU objects created for it.
///
/// The handles belong to the engine's resource table; dropping a
/// `LoadedMesh` does not free them. Use `GraphicsEngine::release_mesh` or
/// `GraphicsEngine::teardown`.
#[derive(Debug, Clone)]
pub struct LoadedMesh {
    /// CPU-side mesh; its transform and material may change every frame
    pub mesh: Mesh,
    vertex_buffer: BufferId,
    index_buffer: BufferId,
    vertex_array: VertexArrayId,
    index_count: u32,
}

impl LoadedMesh {
    pub(crate) fn new(
        mesh: Mesh,
        vertex_buffer: BufferId,
        index_buffer: BufferId,
        vertex_array: VertexArrayId,
    ) -> Self {
        let index_count = mesh.indices().len() as u32;
        Self {
            mesh,
            vertex_buffer,
            index_buffer,
            vertex_array,
            index_count,
        }
    }

    pub fn vertex_buffer(&self) -> BufferId {
        self.vertex_buffer
    }

    pub fn index_buffer(&self) -> BufferId {
        self.index_buffer
    }

    pub fn vertex_array(&self) -> VertexArrayId {
        self.vertex_array
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}
