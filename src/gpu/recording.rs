//! In-memory GPU backend that records every command it receives.
//!
//! [`RecordingContext`] behaves like a strict GL implementation without a
//! rasterizer: it tracks objects and binding state, "compiles" GLSL by
//! reading its `in`/`out`/`uniform` declarations, links programs by matching
//! those declarations across stages, and validates draws against the bound
//! vertex array and program. Uniforms that are declared but never referenced
//! are stripped at compile time, the way real drivers do.
//!
//! It is used by the test-suite and is handy for dry runs on machines
//! without a GPU.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::{
    AcquireError, AcquiredSurface, AttributeLayout, BufferId, BufferKind, BufferUsage,
    Capability, ClipDepth, CullFace, FrontFace, GpuContext, GpuError, GpuResult, IndexType,
    PrimitiveMode, ProgramId, ShaderId, ShaderStage, SurfaceProvider, UniformKind,
    UniformLocation, UniformValue, VertexArrayId,
};
use super::source::{find_keyword, identifiers, is_identifier, strip_comments};

/// One call received by a [`RecordingContext`]
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Enable(Capability),
    Disable(Capability),
    CullFace(CullFace),
    FrontFace(FrontFace),
    Viewport { x: i32, y: i32, width: u32, height: u32 },
    Clear([f32; 4]),
    CreateBuffer(BufferId),
    BindBuffer(BufferKind, Option<BufferId>),
    BufferData { buffer: BufferId, target: BufferKind, bytes: usize, usage: BufferUsage },
    DeleteBuffer(BufferId),
    CreateShader(ShaderId, ShaderStage),
    CompileShader(ShaderId),
    DeleteShader(ShaderId),
    CreateProgram(ProgramId),
    AttachShader(ProgramId, ShaderId),
    LinkProgram(ProgramId),
    UseProgram(Option<ProgramId>),
    DeleteProgram(ProgramId),
    SetUniform { program: ProgramId, name: String, value: UniformValue },
    CreateVertexArray(VertexArrayId),
    BindVertexArray(Option<VertexArrayId>),
    DeleteVertexArray(VertexArrayId),
    EnableVertexAttrib(u32),
    VertexAttribPointer { location: u32, buffer: BufferId, layout: AttributeLayout },
    DrawArrays {
        mode: PrimitiveMode,
        first: u32,
        count: u32,
        vertex_array: VertexArrayId,
        program: ProgramId,
    },
    DrawElements {
        mode: PrimitiveMode,
        count: u32,
        index_type: IndexType,
        offset: usize,
        vertex_array: VertexArrayId,
        program: ProgramId,
    },
}

impl Command {
    pub fn is_draw(&self) -> bool {
        matches!(self, Command::DrawArrays { .. } | Command::DrawElements { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Qualifier {
    In,
    Out,
    Uniform,
}

#[derive(Debug, Clone)]
struct Declaration {
    qualifier: Qualifier,
    ty: String,
    name: String,
}

#[derive(Debug)]
struct RecordedBuffer {
    data: Vec<u8>,
    usage: BufferUsage,
}

#[derive(Debug)]
struct RecordedShader {
    stage: ShaderStage,
    compiled: bool,
    declarations: Vec<Declaration>,
}

#[derive(Debug, Default)]
struct RecordedProgram {
    shaders: Vec<ShaderId>,
    linked: bool,
    attributes: Vec<String>,
    uniforms: Vec<(String, Option<UniformKind>)>,
    uniform_values: HashMap<String, UniformValue>,
}

#[derive(Debug, Default)]
struct RecordedVertexArray {
    attributes: BTreeMap<u32, (BufferId, AttributeLayout)>,
    enabled: HashSet<u32>,
    element_buffer: Option<BufferId>,
}

/// Headless [`GpuContext`] that records commands and validates usage
#[derive(Debug)]
pub struct RecordingContext {
    clip_depth: ClipDepth,
    next_id: u32,
    commands: Vec<Command>,
    errors: Vec<String>,

    capabilities: HashSet<Capability>,
    cull_face: CullFace,
    front_face: FrontFace,
    viewport: (i32, i32, u32, u32),

    buffers: HashMap<BufferId, RecordedBuffer>,
    shaders: HashMap<ShaderId, RecordedShader>,
    programs: HashMap<ProgramId, RecordedProgram>,
    vertex_arrays: HashMap<VertexArrayId, RecordedVertexArray>,

    bound_vertex_buffer: Option<BufferId>,
    bound_index_buffer: Option<BufferId>,
    bound_vertex_array: Option<VertexArrayId>,
    current_program: Option<ProgramId>,

    compile_failures: HashMap<ShaderStage, String>,
    link_failure: Option<String>,
    draw_failure: Option<String>,
}

impl Default for RecordingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingContext {
    pub fn new() -> Self {
        Self {
            clip_depth: ClipDepth::NegativeOneToOne,
            next_id: 1,
            commands: Vec::new(),
            errors: Vec::new(),
            capabilities: HashSet::new(),
            cull_face: CullFace::Back,
            front_face: FrontFace::Ccw,
            viewport: (0, 0, 0, 0),
            buffers: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            vertex_arrays: HashMap::new(),
            bound_vertex_buffer: None,
            bound_index_buffer: None,
            bound_vertex_array: None,
            current_program: None,
            compile_failures: HashMap::new(),
            link_failure: None,
            draw_failure: None,
        }
    }

    pub fn with_clip_depth(mut self, clip_depth: ClipDepth) -> Self {
        self.clip_depth = clip_depth;
        self
    }

    /// Makes the next compile of a `stage` shader fail with `log`
    pub fn fail_next_compile(&mut self, stage: ShaderStage, log: impl Into<String>) {
        self.compile_failures.insert(stage, log.into());
    }

    /// Makes the next link fail with `log`
    pub fn fail_next_link(&mut self, log: impl Into<String>) {
        self.link_failure = Some(log.into());
    }

    /// Makes the next draw call fail with `message`
    pub fn fail_next_draw(&mut self, message: impl Into<String>) {
        self.draw_failure = Some(message.into());
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn draw_calls(&self) -> Vec<&Command> {
        self.commands.iter().filter(|c| c.is_draw()).collect()
    }

    /// Usage errors a real driver would have flagged (GL error queue)
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Buffer bound to `kind`; for indices this is the bound vertex array's
    /// element buffer while a vertex array is bound
    pub fn bound_buffer(&self, kind: BufferKind) -> Option<BufferId> {
        match kind {
            BufferKind::Vertex => self.bound_vertex_buffer,
            BufferKind::Index => match self.bound_vertex_array {
                Some(vao) => self
                    .vertex_arrays
                    .get(&vao)
                    .and_then(|v| v.element_buffer),
                None => self.bound_index_buffer,
            },
        }
    }

    pub fn bound_vertex_array(&self) -> Option<VertexArrayId> {
        self.bound_vertex_array
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }

    /// True when no buffer, vertex array or program is bound
    pub fn is_unbound(&self) -> bool {
        self.bound_vertex_buffer.is_none()
            && self.bound_index_buffer.is_none()
            && self.bound_vertex_array.is_none()
    }

    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn cull_face_mode(&self) -> CullFace {
        self.cull_face
    }

    pub fn front_face_winding(&self) -> FrontFace {
        self.front_face
    }

    pub fn current_viewport(&self) -> (i32, i32, u32, u32) {
        self.viewport
    }

    pub fn buffer_contents(&self, buffer: BufferId) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.data.as_slice())
    }

    pub fn buffer_usage(&self, buffer: BufferId) -> Option<BufferUsage> {
        self.buffers.get(&buffer).map(|b| b.usage)
    }

    pub fn uniform_value(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        self.programs
            .get(&program)
            .and_then(|p| p.uniform_values.get(name).copied())
    }

    /// Attribute slots recorded in `vertex_array`, ordered by location
    pub fn vertex_array_attributes(
        &self,
        vertex_array: VertexArrayId,
    ) -> Vec<(u32, BufferId, AttributeLayout)> {
        self.vertex_arrays
            .get(&vertex_array)
            .map(|v| {
                v.attributes
                    .iter()
                    .map(|(location, (buffer, layout))| (*location, *buffer, *layout))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn vertex_array_element_buffer(&self, vertex_array: VertexArrayId) -> Option<BufferId> {
        self.vertex_arrays
            .get(&vertex_array)
            .and_then(|v| v.element_buffer)
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.vertex_arrays.len()
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn draw_target(&mut self) -> GpuResult<(VertexArrayId, ProgramId)> {
        let program = self.current_program.ok_or(GpuError::NothingBound("program"))?;
        let vertex_array = self
            .bound_vertex_array
            .ok_or(GpuError::NothingBound("vertex array"))?;
        if !self.programs.get(&program).is_some_and(|p| p.linked) {
            return Err(GpuError::Backend(format!(
                "program {} is not linked",
                program.raw()
            )));
        }
        if let Some(message) = self.draw_failure.take() {
            return Err(GpuError::Backend(message));
        }
        Ok((vertex_array, program))
    }
}

impl GpuContext for RecordingContext {
    fn clip_depth(&self) -> ClipDepth {
        self.clip_depth
    }

    fn enable(&mut self, capability: Capability) {
        self.capabilities.insert(capability);
        self.commands.push(Command::Enable(capability));
    }

    fn disable(&mut self, capability: Capability) {
        self.capabilities.remove(&capability);
        self.commands.push(Command::Disable(capability));
    }

    fn cull_face(&mut self, face: CullFace) {
        self.cull_face = face;
        self.commands.push(Command::CullFace(face));
    }

    fn front_face(&mut self, winding: FrontFace) {
        self.front_face = winding;
        self.commands.push(Command::FrontFace(winding));
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.viewport = (x, y, width, height);
        self.commands.push(Command::Viewport { x, y, width, height });
    }

    fn clear(&mut self, rgba: [f32; 4]) -> GpuResult<()> {
        self.commands.push(Command::Clear(rgba));
        Ok(())
    }

    fn create_buffer(&mut self) -> GpuResult<BufferId> {
        let id = BufferId(self.allocate_id());
        self.buffers.insert(
            id,
            RecordedBuffer {
                data: Vec::new(),
                usage: BufferUsage::Static,
            },
        );
        self.commands.push(Command::CreateBuffer(id));
        Ok(id)
    }

    fn bind_buffer(&mut self, target: BufferKind, buffer: Option<BufferId>) {
        if let Some(id) = buffer {
            if !self.buffers.contains_key(&id) {
                self.errors.push(format!("bind of unknown buffer {}", id.raw()));
                return;
            }
        }
        match target {
            BufferKind::Vertex => self.bound_vertex_buffer = buffer,
            BufferKind::Index => match self.bound_vertex_array {
                Some(vao) => {
                    if let Some(state) = self.vertex_arrays.get_mut(&vao) {
                        state.element_buffer = buffer;
                    }
                }
                None => self.bound_index_buffer = buffer,
            },
        }
        self.commands.push(Command::BindBuffer(target, buffer));
    }

    fn buffer_data(
        &mut self,
        target: BufferKind,
        data: &[u8],
        usage: BufferUsage,
    ) -> GpuResult<()> {
        let id = self
            .bound_buffer(target)
            .ok_or(GpuError::NothingBound(target.name()))?;
        let buffer = self.buffers.get_mut(&id).ok_or(GpuError::UnknownHandle {
            kind: "buffer",
            id: id.raw(),
        })?;
        buffer.data = data.to_vec();
        buffer.usage = usage;
        self.commands.push(Command::BufferData {
            buffer: id,
            target,
            bytes: data.len(),
            usage,
        });
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if self.buffers.remove(&buffer).is_none() {
            self.errors.push(format!("delete of unknown buffer {}", buffer.raw()));
            return;
        }
        if self.bound_vertex_buffer == Some(buffer) {
            self.bound_vertex_buffer = None;
        }
        if self.bound_index_buffer == Some(buffer) {
            self.bound_index_buffer = None;
        }
        self.commands.push(Command::DeleteBuffer(buffer));
    }

    fn create_shader(&mut self, stage: ShaderStage) -> GpuResult<ShaderId> {
        let id = ShaderId(self.allocate_id());
        self.shaders.insert(
            id,
            RecordedShader {
                stage,
                compiled: false,
                declarations: Vec::new(),
            },
        );
        self.commands.push(Command::CreateShader(id, stage));
        Ok(id)
    }

    fn compile_shader(&mut self, shader: ShaderId, source: &str) -> Result<(), String> {
        let state = self
            .shaders
            .get_mut(&shader)
            .ok_or_else(|| format!("unknown shader {}", shader.raw()))?;
        self.commands.push(Command::CompileShader(shader));

        if let Some(log) = self.compile_failures.remove(&state.stage) {
            state.compiled = false;
            return Err(log);
        }

        let source = strip_comments(source);
        if !identifiers(&source).any(|ident| ident == "main") {
            state.compiled = false;
            return Err("ERROR: 0:1: 'main' : no entry point defined".to_string());
        }

        // Uniforms never referenced outside their declaration are inactive
        state.declarations = declarations(&source)
            .into_iter()
            .filter(|d| {
                let base = d.name.split('.').next().unwrap_or_default();
                d.qualifier != Qualifier::Uniform
                    || identifiers(&source).filter(|i| *i == base).count() > 1
            })
            .collect();
        state.compiled = true;
        Ok(())
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        if self.shaders.remove(&shader).is_some() {
            self.commands.push(Command::DeleteShader(shader));
        }
    }

    fn create_program(&mut self) -> GpuResult<ProgramId> {
        let id = ProgramId(self.allocate_id());
        self.programs.insert(id, RecordedProgram::default());
        self.commands.push(Command::CreateProgram(id));
        Ok(id)
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        match self.programs.get_mut(&program) {
            Some(state) => {
                state.shaders.push(shader);
                self.commands.push(Command::AttachShader(program, shader));
            }
            None => self
                .errors
                .push(format!("attach to unknown program {}", program.raw())),
        }
    }

    fn link_program(&mut self, program: ProgramId) -> Result<(), String> {
        self.commands.push(Command::LinkProgram(program));
        let shader_ids = self
            .programs
            .get(&program)
            .map(|p| p.shaders.clone())
            .ok_or_else(|| format!("unknown program {}", program.raw()))?;

        if let Some(log) = self.link_failure.take() {
            return Err(log);
        }

        let mut vertex = None;
        let mut fragment = None;
        for id in shader_ids {
            let shader = self
                .shaders
                .get(&id)
                .ok_or_else(|| format!("attached shader {} was deleted", id.raw()))?;
            if !shader.compiled {
                return Err(format!(
                    "{} shader {} is not compiled",
                    shader.stage.name(),
                    id.raw()
                ));
            }
            match shader.stage {
                ShaderStage::Vertex => vertex = Some(shader),
                ShaderStage::Fragment => fragment = Some(shader),
            }
        }
        let vertex = vertex.ok_or("link error: missing vertex shader")?;
        let fragment = fragment.ok_or("link error: missing fragment shader")?;

        let varyings: HashSet<&str> = vertex
            .declarations
            .iter()
            .filter(|d| d.qualifier == Qualifier::Out)
            .map(|d| d.name.as_str())
            .collect();
        for input in fragment
            .declarations
            .iter()
            .filter(|d| d.qualifier == Qualifier::In)
        {
            if !varyings.contains(input.name.as_str()) {
                return Err(format!(
                    "link error: fragment input '{}' is not written by the vertex shader",
                    input.name
                ));
            }
        }

        let mut uniforms: Vec<(String, String)> = Vec::new();
        for declaration in vertex
            .declarations
            .iter()
            .chain(fragment.declarations.iter())
            .filter(|d| d.qualifier == Qualifier::Uniform)
        {
            match uniforms.iter().find(|(name, _)| *name == declaration.name) {
                Some((_, ty)) if *ty != declaration.ty => {
                    return Err(format!(
                        "link error: uniform '{}' declared as {} and {}",
                        declaration.name, ty, declaration.ty
                    ));
                }
                Some(_) => {}
                None => uniforms.push((declaration.name.clone(), declaration.ty.clone())),
            }
        }

        let attributes: Vec<String> = vertex
            .declarations
            .iter()
            .filter(|d| d.qualifier == Qualifier::In)
            .map(|d| d.name.clone())
            .collect();

        if let Some(state) = self.programs.get_mut(&program) {
            state.linked = true;
            state.attributes = attributes;
            state.uniforms = uniforms
                .into_iter()
                .map(|(name, ty)| {
                    let kind = glsl_kind(&ty);
                    (name, kind)
                })
                .collect();
            state.uniform_values.clear();
        }
        Ok(())
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        if let Some(id) = program {
            if !self.programs.get(&id).is_some_and(|p| p.linked) {
                self.errors
                    .push(format!("use of unlinked program {}", id.raw()));
                return;
            }
        }
        self.current_program = program;
        self.commands.push(Command::UseProgram(program));
    }

    fn delete_program(&mut self, program: ProgramId) {
        if self.programs.remove(&program).is_some() {
            if self.current_program == Some(program) {
                self.current_program = None;
            }
            self.commands.push(Command::DeleteProgram(program));
        }
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        let state = self.programs.get(&program).filter(|p| p.linked)?;
        state
            .attributes
            .iter()
            .position(|a| a == name)
            .map(|i| i as u32)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let state = self.programs.get(&program).filter(|p| p.linked)?;
        state
            .uniforms
            .iter()
            .position(|(n, _)| n == name)
            .map(|index| UniformLocation {
                program,
                index: index as u32,
            })
    }

    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue) {
        if self.current_program != Some(location.program) {
            self.errors.push(format!(
                "uniform of program {} written while {:?} is current",
                location.program.raw(),
                self.current_program.map(|p| p.raw())
            ));
            return;
        }
        let Some(state) = self.programs.get_mut(&location.program) else {
            self.errors
                .push(format!("unknown program {}", location.program.raw()));
            return;
        };
        let Some((name, kind)) = state.uniforms.get(location.index as usize).cloned() else {
            self.errors
                .push(format!("invalid uniform location {}", location.index));
            return;
        };
        if let Some(kind) = kind {
            if kind != value.kind() {
                self.errors.push(format!(
                    "uniform '{}' is {} but received {}",
                    name,
                    kind.tag(),
                    value.kind().tag()
                ));
                return;
            }
        }
        state.uniform_values.insert(name.clone(), *value);
        self.commands.push(Command::SetUniform {
            program: location.program,
            name,
            value: *value,
        });
    }

    fn create_vertex_array(&mut self) -> GpuResult<VertexArrayId> {
        let id = VertexArrayId(self.allocate_id());
        self.vertex_arrays
            .insert(id, RecordedVertexArray::default());
        self.commands.push(Command::CreateVertexArray(id));
        Ok(id)
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        if let Some(id) = vertex_array {
            if !self.vertex_arrays.contains_key(&id) {
                self.errors
                    .push(format!("bind of unknown vertex array {}", id.raw()));
                return;
            }
        }
        self.bound_vertex_array = vertex_array;
        self.commands.push(Command::BindVertexArray(vertex_array));
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        if self.vertex_arrays.remove(&vertex_array).is_some() {
            if self.bound_vertex_array == Some(vertex_array) {
                self.bound_vertex_array = None;
            }
            self.commands.push(Command::DeleteVertexArray(vertex_array));
        }
    }

    fn enable_vertex_attrib(&mut self, location: u32) {
        let Some(state) = self
            .bound_vertex_array
            .and_then(|vao| self.vertex_arrays.get_mut(&vao))
        else {
            self.errors
                .push(format!("enable of attribute {location} without a vertex array"));
            return;
        };
        state.enabled.insert(location);
        self.commands.push(Command::EnableVertexAttrib(location));
    }

    fn vertex_attrib_pointer(&mut self, location: u32, layout: AttributeLayout) -> GpuResult<()> {
        let buffer = self
            .bound_vertex_buffer
            .ok_or(GpuError::NothingBound("vertex buffer"))?;
        let vao = self
            .bound_vertex_array
            .ok_or(GpuError::NothingBound("vertex array"))?;
        if layout.components == 0 || layout.components > 4 {
            return Err(GpuError::Unsupported(format!(
                "{} components per attribute",
                layout.components
            )));
        }
        let state = self.vertex_arrays.get_mut(&vao).ok_or(GpuError::UnknownHandle {
            kind: "vertex array",
            id: vao.raw(),
        })?;
        state.attributes.insert(location, (buffer, layout));
        self.commands.push(Command::VertexAttribPointer {
            location,
            buffer,
            layout,
        });
        Ok(())
    }

    fn draw_arrays(&mut self, mode: PrimitiveMode, first: u32, count: u32) -> GpuResult<()> {
        let (vertex_array, program) = self.draw_target()?;
        if first.checked_add(count).is_none() {
            return Err(GpuError::Backend(format!("vertex range of {count} from {first} overflows")));
        }
        self.commands.push(Command::DrawArrays {
            mode,
            first,
            count,
            vertex_array,
            program,
        });
        Ok(())
    }

    fn draw_elements(
        &mut self,
        mode: PrimitiveMode,
        count: u32,
        index_type: IndexType,
        offset: usize,
    ) -> GpuResult<()> {
        let (vertex_array, program) = self.draw_target()?;
        let element_buffer = self
            .vertex_array_element_buffer(vertex_array)
            .ok_or(GpuError::NothingBound("index buffer"))?;
        let available = self
            .buffers
            .get(&element_buffer)
            .map(|b| b.data.len())
            .unwrap_or(0);
        let required = (count as usize)
            .checked_mul(index_type.size_in_bytes())
            .and_then(|len| len.checked_add(offset))
            .ok_or_else(|| GpuError::Backend(format!("index range of {count} from byte {offset} overflows")))?;
        if required > available {
            return Err(GpuError::Backend(format!(
                "index range of {required} bytes exceeds buffer of {available} bytes"
            )));
        }
        self.commands.push(Command::DrawElements {
            mode,
            count,
            index_type,
            offset,
            vertex_array,
            program,
        });
        Ok(())
    }
}

/// Named surfaces backed by fresh [`RecordingContext`]s
#[derive(Debug, Default)]
pub struct RecordingSurfaces {
    surfaces: HashMap<String, (u32, u32)>,
    unavailable: HashSet<String>,
    clip_depth: ClipDepth,
}

impl RecordingSurfaces {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_surface(mut self, name: &str, width: u32, height: u32) -> Self {
        self.surfaces.insert(name.to_string(), (width, height));
        self
    }

    /// Registers a surface whose context can never be created
    pub fn with_unavailable_context(mut self, name: &str) -> Self {
        self.surfaces.insert(name.to_string(), (0, 0));
        self.unavailable.insert(name.to_string());
        self
    }

    pub fn with_clip_depth(mut self, clip_depth: ClipDepth) -> Self {
        self.clip_depth = clip_depth;
        self
    }
}

impl SurfaceProvider for RecordingSurfaces {
    type Context = RecordingContext;

    fn acquire(&mut self, surface: &str) -> Result<AcquiredSurface<RecordingContext>, AcquireError> {
        let (width, height) = *self
            .surfaces
            .get(surface)
            .ok_or_else(|| AcquireError::SurfaceNotFound(surface.to_string()))?;
        if self.unavailable.contains(surface) {
            return Err(AcquireError::ContextUnavailable(format!(
                "surface \"{surface}\" has no rendering context"
            )));
        }
        Ok(AcquiredSurface {
            context: RecordingContext::new().with_clip_depth(self.clip_depth),
            width,
            height,
        })
    }
}

fn glsl_kind(ty: &str) -> Option<UniformKind> {
    match ty {
        "mat4" => Some(UniformKind::Mat4),
        "mat3" => Some(UniformKind::Mat3),
        "vec4" => Some(UniformKind::Vec4),
        "vec3" => Some(UniformKind::Vec3),
        "vec2" => Some(UniformKind::Vec2),
        "float" => Some(UniformKind::Float),
        "int" => Some(UniformKind::Int),
        "bool" => Some(UniformKind::Bool),
        _ => None,
    }
}

const IGNORED_QUALIFIERS: &[&str] = &[
    "flat",
    "smooth",
    "noperspective",
    "centroid",
    "highp",
    "mediump",
    "lowp",
];

/// Top-level `in`/`attribute`/`out`/`varying`/`uniform` declarations.
///
/// A uniform of a struct type expands to one `name.member` entry per member.
fn declarations(source: &str) -> Vec<Declaration> {
    let without_directives: String = source
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect::<Vec<_>>()
        .join("\n");
    let (body, structs) = extract_structs(&without_directives);

    let mut result = Vec::new();
    for statement in body.split(';') {
        let statement = strip_layout(statement.trim());
        let mut tokens = statement
            .split_whitespace()
            .filter(|t| !IGNORED_QUALIFIERS.contains(t))
            .peekable();

        let qualifier = match tokens.next() {
            Some("in" | "attribute") => Qualifier::In,
            Some("out" | "varying") => Qualifier::Out,
            Some("uniform") => Qualifier::Uniform,
            _ => continue,
        };
        let Some(ty) = tokens.next() else { continue };
        let names: String = tokens.collect::<Vec<_>>().join("");
        for name in names.split(',') {
            let name = name.split('[').next().unwrap_or("").trim();
            if !is_identifier(name) {
                continue;
            }
            match structs.get(ty) {
                Some(members) if qualifier == Qualifier::Uniform => {
                    result.extend(members.iter().map(|(member_ty, member)| Declaration {
                        qualifier,
                        ty: member_ty.clone(),
                        name: format!("{name}.{member}"),
                    }));
                }
                _ => result.push(Declaration {
                    qualifier,
                    ty: ty.to_string(),
                    name: name.to_string(),
                }),
            }
        }
    }
    result
}

/// Removes `struct Name { ... };` blocks, returning the remaining source and
/// the members of each struct as `(type, name)` pairs
fn extract_structs(source: &str) -> (String, HashMap<String, Vec<(String, String)>>) {
    let mut structs = HashMap::new();
    let mut body = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = find_keyword(rest, "struct") {
        let after = &rest[start + "struct".len()..];
        let (Some(open), Some(close)) = (after.find('{'), after.find('}')) else {
            break;
        };
        if close < open {
            break;
        }
        let name = after[..open].trim().to_string();
        let members = after[open + 1..close]
            .split(';')
            .filter_map(|member| {
                let mut tokens = member
                    .split_whitespace()
                    .filter(|t| !IGNORED_QUALIFIERS.contains(t));
                Some((tokens.next()?.to_string(), tokens.next()?.to_string()))
            })
            .collect();
        structs.insert(name, members);

        body.push_str(&rest[..start]);
        rest = &after[close + 1..];
    }
    body.push_str(rest);
    (body, structs)
}

fn strip_layout(statement: &str) -> &str {
    match statement.strip_prefix("layout") {
        Some(rest) => rest.find(')').map_or(statement, |i| rest[i + 1..].trim_start()),
        None => statement,
    }
}
