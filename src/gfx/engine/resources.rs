use crate::gpu::{BufferId, GpuContext, ProgramId, VertexArrayId};

/// GPU objects created by the engine and not yet released
#[derive(Debug, Default)]
pub struct ResourceTable {
    buffers: Vec<BufferId>,
    vertex_arrays: Vec<VertexArrayId>,
    programs: Vec<ProgramId>,
}

impl ResourceTable {
    pub fn track_buffer(&mut self, buffer: BufferId) {
        self.buffers.push(buffer);
    }

    pub fn track_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.vertex_arrays.push(vertex_array);
    }

    pub fn track_program(&mut self, program: ProgramId) {
        self.programs.push(program);
    }

    /// Forgets `buffer`; returns false if it was not tracked
    pub fn forget_buffer(&mut self, buffer: BufferId) -> bool {
        remove(&mut self.buffers, buffer)
    }

    pub fn forget_vertex_array(&mut self, vertex_array: VertexArrayId) -> bool {
        remove(&mut self.vertex_arrays, vertex_array)
    }

    pub fn forget_program(&mut self, program: ProgramId) -> bool {
        remove(&mut self.programs, program)
    }

    pub fn buffers(&self) -> &[BufferId] {
        &self.buffers
    }

    pub fn vertex_arrays(&self) -> &[VertexArrayId] {
        &self.vertex_arrays
    }

    pub fn programs(&self) -> &[ProgramId] {
        &self.programs
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty() && self.vertex_arrays.is_empty() && self.programs.is_empty()
    }

    /// Deletes every tracked object, vertex arrays first
    pub fn release_all<C: GpuContext>(&mut self, context: &mut C) {
        for vertex_array in self.vertex_arrays.drain(..) {
            context.delete_vertex_array(vertex_array);
        }
        for buffer in self.buffers.drain(..) {
            context.delete_buffer(buffer);
        }
        for program in self.programs.drain(..) {
            context.delete_program(program);
        }
    }
}

fn remove<T: PartialEq>(items: &mut Vec<T>, item: T) -> bool {
    match items.iter().position(|i| *i == item) {
        Some(index) => {
            items.swap_remove(index);
            true
        }
        None => false,
    }
}
