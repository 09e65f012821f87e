//! GPU resource orchestration
//!
//! [`GraphicsEngine`] owns a [`GpuContext`] and turns CPU-side data into GPU
//! objects: it compiles and links programs, uploads vertex and index
//! buffers, builds vertex arrays from named attributes, writes uniforms and
//! dispatches draws. Every operation that touches binding state goes through
//! a [`BindScope`], so nothing stays bound once a call returns, whether it
//! succeeded or not.

pub mod binding;
pub mod config;
pub mod error;
pub mod loaded_mesh;
pub mod resources;
pub mod shader_source;
pub mod timing;
pub mod vertex_array;

pub use binding::BindScope;
pub use config::{EngineConfig, ShaderBindings};
pub use error::{EngineError, EngineResult};
pub use loaded_mesh::LoadedMesh;
pub use resources::ResourceTable;
pub use shader_source::{ShaderDirectory, ShaderSourceError, ShaderSourceProvider, StaticShaders};
pub use timing::FrameClock;
pub use vertex_array::{DrawConfig, VaoConfig, VertexAttribute};

use crate::gfx::resources::material::Material;
use crate::gfx::scene::{Mesh, Object3D};
use crate::gpu::{
    BufferId, BufferKind, BufferUsage, Capability, GpuContext, ProgramId, ShaderId, ShaderStage,
    SurfaceProvider, UniformValue, VertexArrayId,
};
use crate::math::Matrix4x4;

/// Lifecycle of an engine. There is no `Uninitialized` variant: an engine
/// value only exists once its context has been acquired.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EngineState {
    ContextAcquired,
    ProgramBound,
    Rendering,
}

/// Draw submissions since the last [`GraphicsEngine::take_draw_stats`]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub draw_calls: u32,
    /// Vertices (or indices, for indexed draws) submitted
    pub vertices: u64,
}

pub struct GraphicsEngine<C: GpuContext> {
    context: C,
    config: EngineConfig,
    width: u32,
    height: u32,
    state: EngineState,
    active_program: Option<ProgramId>,
    resources: ResourceTable,
    clock: FrameClock,
    draw_stats: DrawStats,
}

impl<C: GpuContext> GraphicsEngine<C> {
    /// Wraps an already acquired context and applies the fixed render state
    ///
    /// # Arguments
    /// * `context` - GPU context the engine takes ownership of
    /// * `width`, `height` - Drawable size in pixels, used for the viewport and aspect ratio
    /// * `config` - Clear color, render state and shader binding names
    ///
    /// # Returns
    /// An engine in [`EngineState::ContextAcquired`] with depth testing and culling applied
    pub fn new(mut context: C, width: u32, height: u32, config: EngineConfig) -> Self {
        if config.depth_test {
            context.enable(Capability::DepthTest);
        }
        if config.cull_face {
            context.enable(Capability::CullFace);
            context.cull_face(config.cull_mode);
            context.front_face(config.front_face);
        }
        context.viewport(0, 0, width, height);
        log::info!("Graphics engine initialized at {width}x{height}");

        Self {
            context,
            config,
            width,
            height,
            state: EngineState::ContextAcquired,
            active_program: None,
            resources: ResourceTable::default(),
            clock: FrameClock::new(),
            draw_stats: DrawStats::default(),
        }
    }

    /// Acquires the context for `surface` from `provider`
    ///
    /// # Arguments
    /// * `provider` - Source of drawable surfaces and their contexts
    /// * `surface` - Identifier of the surface to render into
    /// * `config` - Engine configuration
    ///
    /// # Returns
    /// The engine, or [`EngineError::Acquire`] when the surface is missing or
    /// has no usable context
    pub fn from_surface<P>(provider: &mut P, surface: &str, config: EngineConfig) -> EngineResult<Self>
    where
        P: SurfaceProvider<Context = C>,
    {
        let acquired = provider.acquire(surface)?;
        Ok(Self::new(acquired.context, acquired.width, acquired.height, config))
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    /// Direct context access; callers must leave binding state clean
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn into_context(self) -> C {
        self.context
    }

    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    pub fn active_program(&self) -> Option<ProgramId> {
        self.active_program
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Height over width, the factor the perspective projection scales x by
    pub fn aspect_ratio(&self) -> f32 {
        if self.width == 0 {
            return 1.0;
        }
        self.height as f32 / self.width as f32
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::warn!("Ignoring resize to {width}x{height}");
            return;
        }
        self.width = width;
        self.height = height;
        self.context.viewport(0, 0, width, height);
        log::debug!("Viewport resized to {width}x{height}");
    }

    /// Perspective projection for the current surface and backend depth range
    ///
    /// # Arguments
    /// * `fov_degrees` - Vertical field of view
    /// * `z_far`, `z_near` - Clip plane distances, both positive
    pub fn projection(&self, fov_degrees: f32, z_far: f32, z_near: f32) -> Matrix4x4 {
        Matrix4x4::perspective_with_depth(
            self.aspect_ratio(),
            fov_degrees,
            z_far,
            z_near,
            self.context.clip_depth(),
        )
    }

    /// Seconds since the previous call (or since construction)
    pub fn delta_time(&mut self) -> f32 {
        self.clock.tick().as_secs_f32()
    }

    pub fn clock_mut(&mut self) -> &mut FrameClock {
        &mut self.clock
    }

    pub fn draw_stats(&self) -> DrawStats {
        self.draw_stats
    }

    pub fn take_draw_stats(&mut self) -> DrawStats {
        std::mem::take(&mut self.draw_stats)
    }

    // Frame clearing

    /// Clears color and depth. Color channels are 0-255, alpha 0-1.
    pub fn clear_viewport(&mut self, r: u8, g: u8, b: u8, a: f32) -> EngineResult<()> {
        let rgba = [
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a.clamp(0.0, 1.0),
        ];
        self.context.clear(rgba)?;
        self.state = EngineState::Rendering;
        Ok(())
    }

    /// Clears with the configured clear color
    pub fn clear(&mut self) -> EngineResult<()> {
        let rgba = self.config.clear_color_f32();
        self.context.clear(rgba)?;
        self.state = EngineState::Rendering;
        Ok(())
    }

    // Programs

    /// Compiles both stages and links them into a program.
    ///
    /// Shader objects are deleted once linking finishes; on failure every
    /// object created here is deleted before the error is returned.
    ///
    /// # Arguments
    /// * `vertex_source` - Vertex stage source in the backend's shading language
    /// * `fragment_source` - Fragment stage source
    ///
    /// # Returns
    /// The linked program, or the compiler/linker log on failure
    pub fn create_program(&mut self, vertex_source: &str, fragment_source: &str) -> EngineResult<ProgramId> {
        let vertex = self.compile_shader(ShaderStage::Vertex, vertex_source)?;
        let fragment = match self.compile_shader(ShaderStage::Fragment, fragment_source) {
            Ok(shader) => shader,
            Err(err) => {
                self.context.delete_shader(vertex);
                return Err(err);
            }
        };

        let linked = self.link(vertex, fragment);
        self.context.delete_shader(vertex);
        self.context.delete_shader(fragment);
        let program = linked?;

        self.resources.track_program(program);
        log::debug!("Linked program {}", program.raw());
        Ok(program)
    }

    /// Loads both stages from `provider` before any GPU object is created
    pub fn create_program_from<P>(&mut self, provider: &P, vertex_id: &str, fragment_id: &str) -> EngineResult<ProgramId>
    where
        P: ShaderSourceProvider + ?Sized,
    {
        let vertex_source = provider.load(vertex_id)?;
        let fragment_source = provider.load(fragment_id)?;
        self.create_program(&vertex_source, &fragment_source)
    }

    pub fn use_program(&mut self, program: ProgramId) {
        self.context.use_program(Some(program));
        self.active_program = Some(program);
        if self.state == EngineState::ContextAcquired {
            self.state = EngineState::ProgramBound;
        }
    }

    /// [`Self::create_program`] followed by [`Self::use_program`]
    pub fn load_program(&mut self, vertex_source: &str, fragment_source: &str) -> EngineResult<ProgramId> {
        let program = self.create_program(vertex_source, fragment_source)?;
        self.use_program(program);
        Ok(program)
    }

    pub fn delete_program(&mut self, program: ProgramId) {
        if self.active_program == Some(program) {
            self.context.use_program(None);
            self.active_program = None;
            self.state = EngineState::ContextAcquired;
        }
        self.context.delete_program(program);
        if !self.resources.forget_program(program) {
            log::warn!("Deleted program {} that the engine did not create", program.raw());
        }
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> EngineResult<ShaderId> {
        let shader = self.context.create_shader(stage)?;
        if let Err(log) = self.context.compile_shader(shader, source) {
            self.context.delete_shader(shader);
            log::error!("Failed to compile {} shader: {log}", stage.name());
            return Err(EngineError::ShaderCompile { stage, log });
        }
        Ok(shader)
    }

    fn link(&mut self, vertex: ShaderId, fragment: ShaderId) -> EngineResult<ProgramId> {
        let program = self.context.create_program()?;
        self.context.attach_shader(program, vertex);
        self.context.attach_shader(program, fragment);
        if let Err(log) = self.context.link_program(program) {
            self.context.delete_program(program);
            log::error!("Failed to link GPU program: {log}");
            return Err(EngineError::ProgramLink { log });
        }
        Ok(program)
    }

    // Buffers

    /// Uploads `data` into a new buffer.
    ///
    /// Vertex data is stored as 32-bit floats, index data as 32-bit unsigned
    /// integers; every index value must be a non-negative whole number.
    ///
    /// # Arguments
    /// * `kind` - Vertex or index buffer
    /// * `usage` - Update frequency hint
    /// * `data` - Values to upload; must not be empty
    ///
    /// # Returns
    /// Handle of the new buffer, tracked until deleted or torn down
    pub fn create_buffer(&mut self, kind: BufferKind, usage: BufferUsage, data: &[f32]) -> EngineResult<BufferId> {
        if data.is_empty() {
            return Err(EngineError::EmptyBuffer { kind });
        }
        match kind {
            BufferKind::Vertex => self.upload(kind, usage, bytemuck::cast_slice(data)),
            BufferKind::Index => {
                let indices = data
                    .iter()
                    .map(|&value| index_from_f32(value).ok_or(EngineError::InvalidIndexData { value }))
                    .collect::<EngineResult<Vec<u32>>>()?;
                self.upload(kind, usage, bytemuck::cast_slice(&indices))
            }
        }
    }

    /// Static vertex buffer of 32-bit floats
    pub fn create_vertex_buffer(&mut self, data: &[f32]) -> EngineResult<BufferId> {
        self.create_buffer(BufferKind::Vertex, BufferUsage::Static, data)
    }

    /// Static index buffer of 32-bit unsigned integers
    pub fn create_index_buffer(&mut self, data: &[u32]) -> EngineResult<BufferId> {
        if data.is_empty() {
            return Err(EngineError::EmptyBuffer { kind: BufferKind::Index });
        }
        self.upload(BufferKind::Index, BufferUsage::Static, bytemuck::cast_slice(data))
    }

    pub fn delete_buffer(&mut self, buffer: BufferId) {
        self.context.delete_buffer(buffer);
        self.resources.forget_buffer(buffer);
    }

    fn upload(&mut self, kind: BufferKind, usage: BufferUsage, bytes: &[u8]) -> EngineResult<BufferId> {
        let buffer = self.context.create_buffer()?;
        let uploaded = {
            let mut scope = BindScope::new(&mut self.context);
            scope.bind_buffer(kind, Some(buffer));
            scope.buffer_data(kind, bytes, usage)
        };
        if let Err(err) = uploaded {
            self.context.delete_buffer(buffer);
            return Err(err.into());
        }
        self.resources.track_buffer(buffer);
        log::debug!("Uploaded {} bytes to {} buffer {}", bytes.len(), kind.name(), buffer.raw());
        Ok(buffer)
    }

    // Vertex arrays

    /// Builds a vertex array from named attributes of the active program.
    ///
    /// An attribute the program does not expose is fatal; the partially
    /// built vertex array is deleted and no binding is left behind.
    pub fn create_vao(&mut self, config: &VaoConfig) -> EngineResult<VertexArrayId> {
        let program = self.active_program.ok_or(EngineError::NoActiveProgram)?;
        let vertex_array = self.context.create_vertex_array()?;

        let built = {
            let mut scope = BindScope::new(&mut self.context);
            configure_vertex_array(&mut scope, program, vertex_array, config)
        };
        if let Err(err) = built {
            self.context.delete_vertex_array(vertex_array);
            return Err(err);
        }

        self.resources.track_vertex_array(vertex_array);
        log::debug!(
            "Created vertex array {} with {} attribute(s)",
            vertex_array.raw(),
            config.attributes.len()
        );
        Ok(vertex_array)
    }

    pub fn delete_vao(&mut self, vertex_array: VertexArrayId) {
        self.context.delete_vertex_array(vertex_array);
        self.resources.forget_vertex_array(vertex_array);
    }

    // Uniforms

    /// Writes a uniform of the active program.
    ///
    /// A name the program does not expose (compilers strip unused uniforms)
    /// is logged and skipped, as is a call with no program in use.
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) {
        let Some(program) = self.active_program else {
            log::warn!("No program in use; skipping uniform \"{name}\"");
            return;
        };
        match self.context.uniform_location(program, name) {
            Some(location) => self.context.set_uniform(location, &value.into()),
            None => log::warn!("Uniform \"{name}\" not found in program {}; skipping", program.raw()),
        }
    }

    /// String-tagged form of [`Self::set_uniform`].
    ///
    /// Accepts `mat4`, `mat3`, `vec4`, `vec3`, `vec2`, `float`, `int` and
    /// `bool`. An unknown tag or a value count that does not match the tag
    /// is logged and ignored.
    pub fn set_uniform_tagged(&mut self, name: &str, tag: &str, values: &[f32]) {
        match UniformValue::from_tagged(tag, values) {
            Some(value) => self.set_uniform(name, value),
            None => log::warn!(
                "Ignoring uniform \"{name}\": unsupported type tag \"{tag}\" for {} value(s)",
                values.len()
            ),
        }
    }

    /// Sets the per-frame view-projection matrix
    pub fn set_view_projection(&mut self, view_projection: Matrix4x4) {
        let name = self.config.bindings.view_projection_uniform.clone();
        self.set_uniform(&name, view_projection);
    }

    /// Like [`Self::set_uniform`] but silent when the uniform is absent
    fn set_optional_uniform(&mut self, name: &str, value: impl Into<UniformValue>) {
        let Some(program) = self.active_program else {
            return;
        };
        if let Some(location) = self.context.uniform_location(program, name) {
            self.context.set_uniform(location, &value.into());
        }
    }

    // Drawing

    /// Binds the vertex array, draws, and unbinds it again even if the draw
    /// fails
    pub fn draw(&mut self, config: &DrawConfig) -> EngineResult<()> {
        if config.count <= 0 {
            return Err(EngineError::InvalidDrawCount { count: config.count });
        }
        let count = config.count as u32;

        let drawn = {
            let mut scope = BindScope::new(&mut self.context);
            scope.bind_vertex_array(Some(config.vertex_array));
            if config.indexed {
                scope
                    .draw_elements(config.mode, count, config.index_type, config.offset)
                    .map_err(EngineError::from)
            } else {
                match u32::try_from(config.offset) {
                    Ok(first) => scope.draw_arrays(config.mode, first, count).map_err(EngineError::from),
                    Err(_) => Err(EngineError::InvalidDrawOffset { offset: config.offset }),
                }
            }
        };
        drawn?;

        self.draw_stats.draw_calls += 1;
        self.draw_stats.vertices += count as u64;
        self.state = EngineState::Rendering;
        Ok(())
    }

    /// Sets the world matrix and material uniforms, then draws an indexed
    /// triangle list from `vertex_array`
    pub fn draw_instance(
        &mut self,
        transform: &Object3D,
        material: &Material,
        vertex_array: VertexArrayId,
        index_count: u32,
    ) -> EngineResult<()> {
        let world = self.config.bindings.world_uniform.clone();
        self.set_uniform(&world, transform.world_matrix());
        self.upload_material(material);
        self.draw(&DrawConfig::triangles(vertex_array, index_count as i32))
    }

    fn upload_material(&mut self, material: &Material) {
        let bindings = self.config.bindings.clone();
        self.set_optional_uniform(&bindings.material_member("ambient"), material.ambient);
        self.set_optional_uniform(&bindings.material_member("diffuse"), material.diffuse);
        self.set_optional_uniform(&bindings.material_member("specular"), material.specular);
        self.set_optional_uniform(&bindings.material_member("shininess"), material.shininess);
    }

    // Meshes

    /// Uploads a mesh and builds its vertex array against the active program
    pub fn load_mesh(&mut self, mesh: Mesh) -> EngineResult<LoadedMesh> {
        if mesh.vertices().len() % crate::gfx::scene::COMPONENTS_PER_VERTEX != 0 {
            return Err(EngineError::InvalidVertexData { len: mesh.vertices().len() });
        }
        if self.active_program.is_none() {
            return Err(EngineError::NoActiveProgram);
        }

        let vertex_buffer = self.create_vertex_buffer(mesh.vertices())?;
        let index_buffer = match self.create_index_buffer(mesh.indices()) {
            Ok(buffer) => buffer,
            Err(err) => {
                self.delete_buffer(vertex_buffer);
                return Err(err);
            }
        };

        let config = VaoConfig::new()
            .attribute(VertexAttribute::float(
                self.config.bindings.position_attribute.clone(),
                vertex_buffer,
                crate::gfx::scene::COMPONENTS_PER_VERTEX as u32,
            ))
            .indexed_by(index_buffer);
        let vertex_array = match self.create_vao(&config) {
            Ok(vertex_array) => vertex_array,
            Err(err) => {
                self.delete_buffer(vertex_buffer);
                self.delete_buffer(index_buffer);
                return Err(err);
            }
        };

        Ok(LoadedMesh::new(mesh, vertex_buffer, index_buffer, vertex_array))
    }

    /// Loads every mesh, stopping at the first failure
    pub fn load_meshes(&mut self, meshes: impl IntoIterator<Item = Mesh>) -> EngineResult<Vec<LoadedMesh>> {
        meshes.into_iter().map(|mesh| self.load_mesh(mesh)).collect()
    }

    pub fn draw_mesh(&mut self, loaded: &LoadedMesh) -> EngineResult<()> {
        self.draw_instance(
            &loaded.mesh.transform,
            &loaded.mesh.material,
            loaded.vertex_array(),
            loaded.index_count(),
        )
    }

    /// Frees the GPU objects of `loaded`
    pub fn release_mesh(&mut self, loaded: LoadedMesh) -> Mesh {
        self.delete_vao(loaded.vertex_array());
        self.delete_buffer(loaded.vertex_buffer());
        self.delete_buffer(loaded.index_buffer());
        loaded.mesh
    }

    /// Releases every GPU object the engine created. The engine stays
    /// usable; new programs and buffers can be created afterwards.
    pub fn teardown(&mut self) {
        if self.active_program.take().is_some() {
            self.context.use_program(None);
        }
        let (buffers, vertex_arrays, programs) = (
            self.resources.buffers().len(),
            self.resources.vertex_arrays().len(),
            self.resources.programs().len(),
        );
        self.resources.release_all(&mut self.context);
        self.state = EngineState::ContextAcquired;
        log::info!(
            "Released {buffers} buffer(s), {vertex_arrays} vertex array(s) and {programs} program(s)"
        );
    }
}

fn configure_vertex_array<C: GpuContext>(
    scope: &mut BindScope<'_, C>,
    program: ProgramId,
    vertex_array: VertexArrayId,
    config: &VaoConfig,
) -> EngineResult<()> {
    scope.bind_vertex_array(Some(vertex_array));
    for attribute in &config.attributes {
        let location = scope.attrib_location(program, &attribute.name).ok_or_else(|| {
            log::error!("Attribute \"{}\" not found in program {}", attribute.name, program.raw());
            EngineError::MissingAttribute {
                name: attribute.name.clone(),
            }
        })?;
        scope.bind_buffer(BufferKind::Vertex, Some(attribute.buffer));
        scope.enable_vertex_attrib(location);
        scope.vertex_attrib_pointer(location, attribute.layout())?;
    }
    if let Some(index_buffer) = config.index_buffer {
        scope.bind_buffer(BufferKind::Index, Some(index_buffer));
    }
    Ok(())
}

fn index_from_f32(value: f32) -> Option<u32> {
    // u32::MAX rounds up to 2^32 as f32, so the bound must be strict
    let valid = value >= 0.0 && value.fract() == 0.0 && value < 4_294_967_296.0_f32;
    valid.then_some(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::generate_cube;
    use crate::gpu::recording::{Command, RecordingContext};
    use crate::gpu::{GpuError, IndexType, PrimitiveMode};

    const VERTEX: &str = "#version 300 es
        uniform mat4 matWorld;
        uniform mat4 matViewProj;
        in vec3 vertexPosition;
        void main() {
            gl_Position = matViewProj * matWorld * vec4(vertexPosition, 1.0);
        }";

    const FRAGMENT: &str = "#version 300 es
        precision mediump float;
        out vec4 outputColor;
        void main() {
            outputColor = vec4(1.0);
        }";

    fn engine() -> GraphicsEngine<RecordingContext> {
        GraphicsEngine::new(RecordingContext::new(), 800, 600, EngineConfig::default())
    }

    fn engine_with_program() -> (GraphicsEngine<RecordingContext>, ProgramId) {
        let mut engine = engine();
        let program = engine.load_program(VERTEX, FRAGMENT).unwrap();
        (engine, program)
    }

    #[test]
    fn test_initialization_applies_render_state() {
        let engine = engine();
        let ctx = engine.context();
        assert!(ctx.is_enabled(Capability::DepthTest));
        assert!(ctx.is_enabled(Capability::CullFace));
        assert_eq!(ctx.current_viewport(), (0, 0, 800, 600));
        assert_eq!(engine.state(), EngineState::ContextAcquired);
        assert_eq!(engine.aspect_ratio(), 0.75);
    }

    #[test]
    fn test_render_state_follows_config() {
        let config = EngineConfig::default().with_cull_face(false);
        let engine = GraphicsEngine::new(RecordingContext::new(), 1, 1, config);
        assert!(!engine.context().is_enabled(Capability::CullFace));
    }

    #[test]
    fn test_compile_failure_reports_log_and_cleans_up() {
        let mut engine = engine();
        engine
            .context_mut()
            .fail_next_compile(ShaderStage::Fragment, "ERROR: 0:2: syntax error");

        let err = engine.create_program(VERTEX, FRAGMENT).unwrap_err();
        match err {
            EngineError::ShaderCompile { stage, log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(log, "ERROR: 0:2: syntax error");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(engine.context().live_shaders(), 0);
        assert_eq!(engine.context().live_programs(), 0);
    }

    #[test]
    fn test_link_failure_is_fatal() {
        let mut engine = engine();
        engine.context_mut().fail_next_link("attribute layout mismatch");
        let err = engine.create_program(VERTEX, FRAGMENT).unwrap_err();
        assert!(matches!(err, EngineError::ProgramLink { ref log } if log == "attribute layout mismatch"));
        assert_eq!(engine.context().live_programs(), 0);
        assert!(engine.resources().is_empty());
    }

    #[test]
    fn test_program_shaders_are_released_after_link() {
        let (engine, program) = engine_with_program();
        assert_eq!(engine.context().live_shaders(), 0);
        assert_eq!(engine.active_program(), Some(program));
        assert_eq!(engine.state(), EngineState::ProgramBound);
    }

    #[test]
    fn test_missing_shader_source_fails_before_gpu_work() {
        let mut engine = engine();
        let shaders = StaticShaders::new().with("cube.vert", VERTEX);
        let err = engine
            .create_program_from(&shaders, "cube.vert", "cube.frag")
            .unwrap_err();
        assert!(matches!(err, EngineError::ShaderSource(ShaderSourceError::NotFound(_))));
        assert_eq!(engine.context().live_shaders(), 0);
    }

    #[test]
    fn test_empty_buffer_rejected_for_every_kind_and_usage() {
        let mut engine = engine();
        for kind in BufferKind::ALL {
            for usage in BufferUsage::ALL {
                let err = engine.create_buffer(kind, usage, &[]).unwrap_err();
                assert!(matches!(err, EngineError::EmptyBuffer { kind: k } if k == kind));
            }
        }
        assert_eq!(engine.context().live_buffers(), 0);
    }

    #[test]
    fn test_buffer_payload_layout() {
        let mut engine = engine();
        let vertices = engine
            .create_buffer(BufferKind::Vertex, BufferUsage::Dynamic, &[1.0, 2.5])
            .unwrap();
        let indices = engine
            .create_buffer(BufferKind::Index, BufferUsage::Static, &[0.0, 1.0, 2.0])
            .unwrap();

        let ctx = engine.context();
        assert_eq!(ctx.buffer_contents(vertices).unwrap(), bytemuck::cast_slice::<f32, u8>(&[1.0, 2.5]));
        assert_eq!(ctx.buffer_contents(indices).unwrap(), bytemuck::cast_slice::<u32, u8>(&[0, 1, 2]));
        assert_eq!(ctx.buffer_usage(vertices), Some(BufferUsage::Dynamic));
        assert!(ctx.is_unbound());
    }

    #[test]
    fn test_index_data_must_be_whole_non_negative() {
        let mut engine = engine();
        for value in [-1.0, 0.5, f32::NAN, 4_294_967_296.0, f32::INFINITY] {
            let err = engine
                .create_buffer(BufferKind::Index, BufferUsage::Static, &[0.0, value])
                .unwrap_err();
            assert!(matches!(err, EngineError::InvalidIndexData { .. }));
        }
        assert_eq!(engine.context().live_buffers(), 0);
    }

    #[test]
    fn test_create_vao_requires_program() {
        let mut engine = engine();
        let buffer = engine.create_vertex_buffer(&[0.0; 9]).unwrap();
        let config = VaoConfig::new().attribute(VertexAttribute::float("vertexPosition", buffer, 3));
        assert!(matches!(engine.create_vao(&config), Err(EngineError::NoActiveProgram)));
    }

    #[test]
    fn test_create_vao_binds_attributes_and_unbinds() {
        let (mut engine, _) = engine_with_program();
        let vertices = engine.create_vertex_buffer(&[0.0; 9]).unwrap();
        let indices = engine.create_index_buffer(&[0, 1, 2]).unwrap();
        let config = VaoConfig::new()
            .attribute(VertexAttribute::float("vertexPosition", vertices, 3))
            .indexed_by(indices);

        let vao = engine.create_vao(&config).unwrap();
        let ctx = engine.context();
        assert!(ctx.is_unbound());
        assert_eq!(ctx.vertex_array_element_buffer(vao), Some(indices));
        let attributes = ctx.vertex_array_attributes(vao);
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].0, 0);
        assert_eq!(attributes[0].1, vertices);
        assert_eq!(attributes[0].2.components, 3);
    }

    #[test]
    fn test_missing_attribute_is_fatal_and_leaves_nothing_bound() {
        let (mut engine, _) = engine_with_program();
        let buffer = engine.create_vertex_buffer(&[0.0; 9]).unwrap();
        let config = VaoConfig::new()
            .attribute(VertexAttribute::float("vertexPosition", buffer, 3))
            .attribute(VertexAttribute::float("vertexNormal", buffer, 3));

        let err = engine.create_vao(&config).unwrap_err();
        assert!(matches!(err, EngineError::MissingAttribute { ref name } if name == "vertexNormal"));
        assert!(engine.context().is_unbound());
        assert_eq!(engine.context().live_vertex_arrays(), 0);
    }

    #[test]
    fn test_missing_uniform_is_skipped() {
        let (mut engine, program) = engine_with_program();
        engine.context_mut().clear_commands();

        engine.set_uniform("doesNotExist", 1.0_f32);
        engine.set_uniform("matWorld", Matrix4x4::IDENTITY);

        let ctx = engine.context();
        assert_eq!(ctx.commands().len(), 1);
        assert_eq!(
            ctx.uniform_value(program, "matWorld"),
            Some(UniformValue::Mat4(Matrix4x4::IDENTITY.to_array()))
        );
        assert!(ctx.errors().is_empty());
    }

    #[test]
    fn test_tagged_uniform_dispatch() {
        let (mut engine, program) = engine_with_program();
        let identity = Matrix4x4::IDENTITY.to_array();
        engine.set_uniform_tagged("matViewProj", "mat4", &identity);
        assert_eq!(engine.context().uniform_value(program, "matViewProj"), Some(UniformValue::Mat4(identity)));

        engine.context_mut().clear_commands();
        engine.set_uniform_tagged("matViewProj", "dmat4", &identity);
        engine.set_uniform_tagged("matViewProj", "mat4", &identity[..9]);
        assert!(engine.context().commands().is_empty());
    }

    #[test]
    fn test_uniform_without_program_is_skipped() {
        let mut engine = engine();
        engine.context_mut().clear_commands();
        engine.set_uniform("matWorld", Matrix4x4::IDENTITY);
        assert!(engine.context().commands().is_empty());
    }

    fn triangle_vao(engine: &mut GraphicsEngine<RecordingContext>) -> VertexArrayId {
        let vertices = engine.create_vertex_buffer(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]).unwrap();
        let indices = engine.create_index_buffer(&[0, 1, 2]).unwrap();
        let config = VaoConfig::new()
            .attribute(VertexAttribute::float("vertexPosition", vertices, 3))
            .indexed_by(indices);
        engine.create_vao(&config).unwrap()
    }

    #[test]
    fn test_draw_rejects_non_positive_counts() {
        let (mut engine, _) = engine_with_program();
        let vao = triangle_vao(&mut engine);
        for count in [0, -3] {
            let err = engine
                .draw(&DrawConfig::arrays(vao, PrimitiveMode::Triangles, count))
                .unwrap_err();
            assert!(matches!(err, EngineError::InvalidDrawCount { count: c } if c == count));
        }
        assert!(engine.context().draw_calls().is_empty());
    }

    #[test]
    fn test_draw_rejects_out_of_range_offsets() {
        let (mut engine, _) = engine_with_program();
        let vao = triangle_vao(&mut engine);

        let err = engine
            .draw(&DrawConfig::arrays(vao, PrimitiveMode::Triangles, 3).with_offset(u32::MAX as usize + 1))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidDrawOffset { offset } if offset == u32::MAX as usize + 1));

        let err = engine
            .draw(&DrawConfig::triangles(vao, 3).with_offset(usize::MAX))
            .unwrap_err();
        assert!(matches!(err, EngineError::Gpu(GpuError::Backend(_))));

        assert!(engine.context().draw_calls().is_empty());
        assert_eq!(engine.context().bound_vertex_array(), None);
        assert_eq!(engine.draw_stats().draw_calls, 0);
    }

    #[test]
    fn test_deleting_active_program_leaves_rendering_state() {
        let (mut engine, program) = engine_with_program();
        let vao = triangle_vao(&mut engine);
        engine.draw(&DrawConfig::triangles(vao, 3)).unwrap();
        assert_eq!(engine.state(), EngineState::Rendering);

        engine.delete_program(program);
        assert_eq!(engine.state(), EngineState::ContextAcquired);
        assert!(matches!(engine.create_vao(&VaoConfig::new()), Err(EngineError::NoActiveProgram)));
    }

    #[test]
    fn test_non_indexed_draw_issues_single_call() {
        let (mut engine, program) = engine_with_program();
        let vao = triangle_vao(&mut engine);

        engine.draw(&DrawConfig::arrays(vao, PrimitiveMode::Triangles, 3)).unwrap();

        let draws = engine.context().draw_calls();
        assert_eq!(draws.len(), 1);
        assert_eq!(
            draws[0],
            &Command::DrawArrays {
                mode: PrimitiveMode::Triangles,
                first: 0,
                count: 3,
                vertex_array: vao,
                program,
            }
        );
        assert_eq!(engine.context().bound_vertex_array(), None);
        assert_eq!(engine.state(), EngineState::Rendering);
        assert_eq!(engine.draw_stats(), DrawStats { draw_calls: 1, vertices: 3 });
    }

    #[test]
    fn test_indexed_draw_uses_element_buffer() {
        let (mut engine, _) = engine_with_program();
        let vao = triangle_vao(&mut engine);
        engine.draw(&DrawConfig::triangles(vao, 3)).unwrap();
        assert!(matches!(
            engine.context().draw_calls()[0],
            Command::DrawElements { count: 3, index_type: IndexType::UnsignedInt, .. }
        ));
    }

    #[test]
    fn test_failed_draw_still_unbinds() {
        let (mut engine, _) = engine_with_program();
        let vao = triangle_vao(&mut engine);
        engine.context_mut().fail_next_draw("device lost");

        let err = engine.draw(&DrawConfig::triangles(vao, 3)).unwrap_err();
        assert!(matches!(err, EngineError::Gpu(_)));
        assert_eq!(engine.context().bound_vertex_array(), None);
        assert_eq!(engine.draw_stats().draw_calls, 0);
    }

    #[test]
    fn test_clear_viewport_normalizes_color() {
        let mut engine = engine();
        engine.clear_viewport(255, 0, 51, 0.5).unwrap();
        assert_eq!(engine.context().commands().last(), Some(&Command::Clear([1.0, 0.0, 0.2, 0.5])));
    }

    #[test]
    fn test_load_and_draw_mesh() {
        let (mut engine, program) = engine_with_program();
        let mut transform = Object3D::default();
        transform.set_position(crate::math::Vector3::new(0.0, 0.5, 0.0));
        let loaded = engine.load_mesh(generate_cube(1.0, transform)).unwrap();
        assert_eq!(loaded.index_count(), 36);

        engine.draw_mesh(&loaded).unwrap();
        let ctx = engine.context();
        assert_eq!(
            ctx.uniform_value(program, "matWorld"),
            Some(UniformValue::Mat4(transform.world_matrix().to_array()))
        );
        assert!(matches!(ctx.draw_calls()[0], Command::DrawElements { count: 36, .. }));
        assert!(ctx.errors().is_empty());
    }

    #[test]
    fn test_load_mesh_rejects_ragged_vertices() {
        let (mut engine, _) = engine_with_program();
        let err = engine.load_mesh(Mesh::new(vec![0.0; 4], vec![0])).unwrap_err();
        assert!(matches!(err, EngineError::InvalidVertexData { len: 4 }));
    }

    #[test]
    fn test_load_mesh_failure_releases_buffers() {
        let bindings = ShaderBindings {
            position_attribute: "aPosition".into(),
            ..ShaderBindings::default()
        };
        let mut engine = GraphicsEngine::new(
            RecordingContext::new(),
            10,
            10,
            EngineConfig::default().with_bindings(bindings),
        );
        engine.load_program(VERTEX, FRAGMENT).unwrap();

        let err = engine.load_mesh(generate_cube(1.0, Object3D::default())).unwrap_err();
        assert!(matches!(err, EngineError::MissingAttribute { .. }));
        assert_eq!(engine.context().live_buffers(), 0);
        assert!(engine.resources().buffers().is_empty());
    }

    #[test]
    fn test_release_and_teardown_free_everything() {
        let (mut engine, _) = engine_with_program();
        let cube = engine.load_mesh(generate_cube(1.0, Object3D::default())).unwrap();
        let _plane = engine
            .load_mesh(crate::gfx::geometry::generate_plane(10.0, Object3D::default()))
            .unwrap();

        engine.release_mesh(cube);
        assert_eq!(engine.context().live_buffers(), 2);
        assert_eq!(engine.context().live_vertex_arrays(), 1);

        engine.teardown();
        let ctx = engine.context();
        assert_eq!(ctx.live_buffers(), 0);
        assert_eq!(ctx.live_vertex_arrays(), 0);
        assert_eq!(ctx.live_programs(), 0);
        assert_eq!(ctx.current_program(), None);
        assert!(engine.resources().is_empty());
    }

    #[test]
    fn test_projection_uses_backend_depth_range() {
        let gl = engine();
        let wgpu_like = GraphicsEngine::new(
            RecordingContext::new().with_clip_depth(crate::math::ClipDepth::ZeroToOne),
            800,
            600,
            EngineConfig::default(),
        );
        let a = gl.projection(90.0, 100.0, 0.1);
        let b = wgpu_like.projection(90.0, 100.0, 0.1);
        assert_eq!(a, Matrix4x4::perspective(0.75, 90.0, 100.0, 0.1));
        assert_ne!(a.get(2, 2), b.get(2, 2));
    }
}
