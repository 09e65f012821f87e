//! Engine configuration
//!
//! Fixed render state applied when the engine is created, plus the shader
//! variable names the mesh helpers bind to.

use crate::gpu::{CullFace, FrontFace};

/// Names of the shader inputs used by `load_mesh`, `draw_mesh` and
/// `set_view_projection`
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderBindings {
    /// Vertex attribute receiving mesh positions
    pub position_attribute: String,
    /// Per-object model matrix
    pub world_uniform: String,
    /// Combined view-projection matrix, set once per frame
    pub view_projection_uniform: String,
    /// Prefix of the material struct uniform (`material.diffuse`, ...)
    pub material_uniform: String,
}

impl Default for ShaderBindings {
    fn default() -> Self {
        Self {
            position_attribute: "vertexPosition".to_string(),
            world_uniform: "matWorld".to_string(),
            view_projection_uniform: "matViewProj".to_string(),
            material_uniform: "material".to_string(),
        }
    }
}

impl ShaderBindings {
    /// Fully qualified name of a material member, e.g. `material.diffuse`
    pub fn material_member(&self, member: &str) -> String {
        format!("{}.{}", self.material_uniform, member)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub depth_test: bool,
    pub cull_face: bool,
    pub cull_mode: CullFace,
    pub front_face: FrontFace,
    /// Color used by `GraphicsEngine::clear`, 0-255 per channel
    pub clear_color: [u8; 4],
    pub bindings: ShaderBindings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            depth_test: true,
            cull_face: true,
            cull_mode: CullFace::Back,
            front_face: FrontFace::Ccw,
            clear_color: [128, 128, 128, 255],
            bindings: ShaderBindings::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_depth_test(mut self, enabled: bool) -> Self {
        self.depth_test = enabled;
        self
    }

    pub fn with_cull_face(mut self, enabled: bool) -> Self {
        self.cull_face = enabled;
        self
    }

    pub fn with_clear_color(mut self, rgba: [u8; 4]) -> Self {
        self.clear_color = rgba;
        self
    }

    pub fn with_bindings(mut self, bindings: ShaderBindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// `clear_color` as normalized floats
    pub fn clear_color_f32(&self) -> [f32; 4] {
        self.clear_color.map(|c| c as f32 / 255.0)
    }
}
