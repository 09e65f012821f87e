use crate::gpu::{AttributeLayout, BufferId, ComponentType, IndexType, PrimitiveMode, VertexArrayId};

/// One shader attribute fed from a vertex buffer
#[derive(Debug, Clone, PartialEq)]
pub struct VertexAttribute {
    /// Attribute name as declared in the vertex shader
    pub name: String,
    pub buffer: BufferId,
    pub components: u32,
    pub component_type: ComponentType,
    pub normalized: bool,
    pub stride: u32,
    pub offset: u32,
}

impl VertexAttribute {
    /// Tightly packed float attribute starting at the beginning of `buffer`
    pub fn float(name: impl Into<String>, buffer: BufferId, components: u32) -> Self {
        Self {
            name: name.into(),
            buffer,
            components,
            component_type: ComponentType::Float,
            normalized: false,
            stride: 0,
            offset: 0,
        }
    }

    pub fn with_stride(mut self, stride: u32, offset: u32) -> Self {
        self.stride = stride;
        self.offset = offset;
        self
    }

    pub fn layout(&self) -> AttributeLayout {
        AttributeLayout {
            components: self.components,
            component_type: self.component_type,
            normalized: self.normalized,
            stride: self.stride,
            offset: self.offset,
        }
    }
}

/// Everything needed to build a vertex array object
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VaoConfig {
    pub attributes: Vec<VertexAttribute>,
    pub index_buffer: Option<BufferId>,
}

impl VaoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, attribute: VertexAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn indexed_by(mut self, buffer: BufferId) -> Self {
        self.index_buffer = Some(buffer);
        self
    }
}

/// A single draw submission.
///
/// `count` is signed so callers computing it can pass through bad values;
/// the engine rejects anything not positive. For non-indexed draws `offset`
/// is the first vertex, for indexed draws it is a byte offset into the
/// index buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawConfig {
    pub vertex_array: VertexArrayId,
    pub mode: PrimitiveMode,
    pub count: i32,
    pub indexed: bool,
    pub index_type: IndexType,
    pub offset: usize,
}

impl DrawConfig {
    pub fn arrays(vertex_array: VertexArrayId, mode: PrimitiveMode, count: i32) -> Self {
        Self {
            vertex_array,
            mode,
            count,
            indexed: false,
            index_type: IndexType::default(),
            offset: 0,
        }
    }

    /// Indexed triangle list with 32-bit indices
    pub fn triangles(vertex_array: VertexArrayId, index_count: i32) -> Self {
        Self {
            vertex_array,
            mode: PrimitiveMode::Triangles,
            count: index_count,
            indexed: true,
            index_type: IndexType::UnsignedInt,
            offset: 0,
        }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}
