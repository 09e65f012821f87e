//! wgpu implementation of the GPU command interface
//!
//! GL semantics on top of wgpu:
//!
//! - Shaders are WGSL, one module per stage. Attribute and uniform names
//!   come from [`ShaderInterface`] reflection; the uniform block must live at
//!   `@group(0) @binding(0)`.
//! - Uniform writes land in a shadow copy that is uploaded right before the
//!   next draw.
//! - Render pipelines are built lazily per program, vertex array, topology
//!   and fixed render state, and cached.
//! - Every attribute gets its own vertex buffer slot; the attribute offset
//!   becomes the slot's buffer offset.
//! - Each clear and draw is its own render pass and submission, targeting an
//!   offscreen color texture with a depth buffer.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::gfx::resources::TextureResource;
use crate::gpu::source::strip_comments;
use crate::gpu::{
    AcquireError, AcquiredSurface, AttributeLayout, BufferId, BufferKind, BufferUsage, Capability,
    ClipDepth, ComponentType, CullFace, FrontFace, GpuContext, GpuError, GpuResult, IndexType,
    PrimitiveMode, ProgramId, ShaderId, ShaderStage, SurfaceProvider, UniformLocation,
    UniformValue, VertexArrayId,
};

use super::reflect::{ShaderInterface, VertexInput};
use super::uniform_buffer::{UniformBlock, UniformLayout};

struct CompiledShader {
    module: wgpu::ShaderModule,
    entry: String,
    interface: ShaderInterface,
}

struct Shader {
    stage: ShaderStage,
    compiled: Option<CompiledShader>,
}

struct LinkedProgram {
    vertex_module: wgpu::ShaderModule,
    vertex_entry: String,
    fragment_module: wgpu::ShaderModule,
    fragment_entry: String,
    inputs: Vec<VertexInput>,
    pipeline_layout: wgpu::PipelineLayout,
    uniforms: Option<UniformBlock>,
}

struct Program {
    shaders: Vec<ShaderId>,
    linked: Option<LinkedProgram>,
}

#[derive(Default)]
struct VertexArray {
    attributes: BTreeMap<u32, (BufferId, AttributeLayout)>,
    enabled: HashSet<u32>,
    element_buffer: Option<BufferId>,
}

impl VertexArray {
    fn active_attributes(&self) -> impl Iterator<Item = (&u32, &(BufferId, AttributeLayout))> {
        self.attributes
            .iter()
            .filter(|(location, _)| self.enabled.contains(location))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramId,
    vertex_array: VertexArrayId,
    mode: PrimitiveMode,
    strip_index: Option<IndexType>,
    depth_test: bool,
    cull: Option<CullFace>,
    front_face: FrontFace,
}

#[derive(Debug, Clone, Copy)]
enum DrawRange {
    Arrays { first: u32, count: u32 },
    Elements { count: u32, index_type: IndexType, offset: usize },
}

/// [`GpuContext`] rendering through wgpu into an offscreen target
pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    color_target: TextureResource,
    depth_target: TextureResource,

    depth_test: bool,
    cull_enabled: bool,
    cull_face: CullFace,
    front_face: FrontFace,
    viewport: (i32, i32, u32, u32),

    next_id: u32,
    buffers: HashMap<BufferId, Option<wgpu::Buffer>>,
    shaders: HashMap<ShaderId, Shader>,
    programs: HashMap<ProgramId, Program>,
    vertex_arrays: HashMap<VertexArrayId, VertexArray>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,

    bound_vertex_buffer: Option<BufferId>,
    bound_index_buffer: Option<BufferId>,
    bound_vertex_array: Option<VertexArrayId>,
    current_program: Option<ProgramId>,
}

impl WgpuContext {
    /// Wraps an existing device, rendering into a `width` x `height` target
    ///
    /// # Arguments
    /// * `device` - WGPU device for creating resources
    /// * `queue` - WGPU queue for uploads and submissions
    /// * `width`, `height` - Size of the offscreen color and depth targets
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, width: u32, height: u32) -> Self {
        device.on_uncaptured_error(Box::new(|error: wgpu::Error| {
            log::error!("Uncaptured wgpu error: {error}");
        }));
        let color_target = TextureResource::create_color_target(&device, width, height, "Color Target");
        let depth_target = TextureResource::create_depth_texture(&device, width, height, "Depth Target");

        Self {
            device,
            queue,
            color_target,
            depth_target,
            depth_test: false,
            cull_enabled: false,
            cull_face: CullFace::Back,
            front_face: FrontFace::Ccw,
            viewport: (0, 0, width, height),
            next_id: 1,
            buffers: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            vertex_arrays: HashMap::new(),
            pipelines: HashMap::new(),
            bound_vertex_buffer: None,
            bound_index_buffer: None,
            bound_vertex_array: None,
            current_program: None,
        }
    }

    /// Requests an adapter and device without any window surface
    ///
    /// # Arguments
    /// * `backends` - Backends the instance may pick an adapter from
    /// * `force_fallback_adapter` - Restrict the request to a software adapter
    /// * `width`, `height` - Size of the offscreen targets
    ///
    /// # Returns
    /// The context, or [`AcquireError::ContextUnavailable`] when no adapter or
    /// device could be obtained
    pub async fn headless(
        backends: wgpu::Backends,
        force_fallback_adapter: bool,
        width: u32,
        height: u32,
    ) -> Result<Self, AcquireError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter,
            })
            .await
            .map_err(|e| AcquireError::ContextUnavailable(e.to_string()))?;
        log::info!("Using adapter {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| AcquireError::ContextUnavailable(e.to_string()))?;

        Ok(Self::new(device, queue, width, height))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Texture every clear and draw renders into
    pub fn color_target(&self) -> &TextureResource {
        &self.color_target
    }

    /// Recreates the color and depth targets at a new size
    pub fn resize_targets(&mut self, width: u32, height: u32) {
        self.color_target = TextureResource::create_color_target(&self.device, width, height, "Color Target");
        self.depth_target = TextureResource::create_depth_texture(&self.device, width, height, "Depth Target");
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn bound(&self, target: BufferKind) -> Option<BufferId> {
        match target {
            BufferKind::Vertex => self.bound_vertex_buffer,
            BufferKind::Index => match self.bound_vertex_array {
                Some(vao) => self.vertex_arrays.get(&vao).and_then(|v| v.element_buffer),
                None => self.bound_index_buffer,
            },
        }
    }

    fn storage(&self, buffer: BufferId) -> GpuResult<wgpu::Buffer> {
        self.buffers
            .get(&buffer)
            .ok_or(GpuError::UnknownHandle {
                kind: "buffer",
                id: buffer.raw(),
            })?
            .clone()
            .ok_or_else(|| GpuError::Backend(format!("buffer {} has no storage", buffer.raw())))
    }

    /// Runs `f` inside a validation error scope
    fn validated<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T, String> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(error.to_string()),
            None => Ok(value),
        }
    }

    /// Viewport clamped to the render target
    fn clamped_viewport(&self) -> (f32, f32, f32, f32) {
        let (target_width, target_height) = self.color_target.size();
        let (x, y, width, height) = self.viewport;
        let x = x.clamp(0, target_width as i32 - 1) as u32;
        let y = y.clamp(0, target_height as i32 - 1) as u32;
        let width = width.min(target_width - x).max(1);
        let height = height.min(target_height - y).max(1);
        (x as f32, y as f32, width as f32, height as f32)
    }

    fn pipeline(&mut self, key: PipelineKey) -> GpuResult<wgpu::RenderPipeline> {
        if let Some(pipeline) = self.pipelines.get(&key) {
            return Ok(pipeline.clone());
        }

        let linked = self
            .programs
            .get(&key.program)
            .and_then(|p| p.linked.as_ref())
            .ok_or_else(|| GpuError::Backend(format!("program {} is not linked", key.program.raw())))?;
        let vertex_array = self.vertex_arrays.get(&key.vertex_array).ok_or(GpuError::UnknownHandle {
            kind: "vertex array",
            id: key.vertex_array.raw(),
        })?;

        for input in &linked.inputs {
            if !vertex_array.enabled.contains(&input.location)
                || !vertex_array.attributes.contains_key(&input.location)
            {
                return Err(GpuError::Backend(format!(
                    "attribute \"{}\" at location {} has no enabled vertex buffer",
                    input.name, input.location
                )));
            }
        }

        let mut slots = Vec::new();
        for (location, (_, layout)) in vertex_array.active_attributes() {
            let attribute = wgpu::VertexAttribute {
                format: vertex_format(layout)?,
                offset: 0,
                shader_location: *location,
            };
            slots.push((layout.effective_stride() as wgpu::BufferAddress, [attribute]));
        }
        let buffers: Vec<wgpu::VertexBufferLayout> = slots
            .iter()
            .map(|(stride, attributes)| wgpu::VertexBufferLayout {
                array_stride: *stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes,
            })
            .collect();

        let label = format!("Pipeline p{} v{}", key.program.raw(), key.vertex_array.raw());
        let descriptor = wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(&linked.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &linked.vertex_module,
                entry_point: Some(&linked.vertex_entry),
                buffers: &buffers,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &linked.fragment_module,
                entry_point: Some(&linked.fragment_entry),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TextureResource::COLOR_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: topology(key.mode),
                strip_index_format: key.strip_index.map(index_format),
                front_face: match key.front_face {
                    FrontFace::Ccw => wgpu::FrontFace::Ccw,
                    FrontFace::Cw => wgpu::FrontFace::Cw,
                },
                cull_mode: key.cull.map(|face| match face {
                    CullFace::Front => wgpu::Face::Front,
                    CullFace::Back => wgpu::Face::Back,
                }),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: TextureResource::DEPTH_FORMAT,
                depth_write_enabled: key.depth_test,
                depth_compare: if key.depth_test {
                    wgpu::CompareFunction::Less
                } else {
                    wgpu::CompareFunction::Always
                },
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        };

        let pipeline = self
            .validated(|device| device.create_render_pipeline(&descriptor))
            .map_err(GpuError::Backend)?;
        log::debug!("Created {label}");
        self.pipelines.insert(key, pipeline.clone());
        Ok(pipeline)
    }

    fn submit_draw(&mut self, mode: PrimitiveMode, range: DrawRange) -> GpuResult<()> {
        let program = self.current_program.ok_or(GpuError::NothingBound("program"))?;
        let vertex_array_id = self
            .bound_vertex_array
            .ok_or(GpuError::NothingBound("vertex array"))?;
        let bounds = draw_bounds(range)?;

        let strip_index = match (range, mode) {
            (DrawRange::Elements { index_type, .. }, PrimitiveMode::LineStrip | PrimitiveMode::TriangleStrip) => {
                Some(index_type)
            }
            _ => None,
        };
        let pipeline = self.pipeline(PipelineKey {
            program,
            vertex_array: vertex_array_id,
            mode,
            strip_index,
            depth_test: self.depth_test,
            cull: self.cull_enabled.then_some(self.cull_face),
            front_face: self.front_face,
        })?;

        let vertex_array = self.vertex_arrays.get(&vertex_array_id).ok_or(GpuError::UnknownHandle {
            kind: "vertex array",
            id: vertex_array_id.raw(),
        })?;
        let mut vertex_buffers = Vec::new();
        for (_, (buffer, layout)) in vertex_array.active_attributes() {
            vertex_buffers.push((self.storage(*buffer)?, layout.offset as wgpu::BufferAddress));
        }
        let index_buffer = match range {
            DrawRange::Elements { .. } => {
                let id = vertex_array
                    .element_buffer
                    .ok_or(GpuError::NothingBound("index buffer"))?;
                Some(self.storage(id)?)
            }
            DrawRange::Arrays { .. } => None,
        };

        let bind_group = match self
            .programs
            .get_mut(&program)
            .and_then(|p| p.linked.as_mut())
            .and_then(|l| l.uniforms.as_mut())
        {
            Some(uniforms) => {
                uniforms.flush(&self.queue);
                Some(uniforms.bind_group().clone())
            }
            None => None,
        };

        let (x, y, width, height) = self.clamped_viewport();
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Draw Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Draw Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.color_target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_target.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            pass.set_viewport(x, y, width, height, 0.0, 1.0);
            pass.set_pipeline(&pipeline);
            if let Some(bind_group) = &bind_group {
                pass.set_bind_group(0, bind_group, &[]);
            }
            for (slot, (buffer, offset)) in vertex_buffers.iter().enumerate() {
                pass.set_vertex_buffer(slot as u32, buffer.slice(*offset..));
            }
            match range {
                DrawRange::Arrays { .. } => pass.draw(bounds, 0..1),
                DrawRange::Elements { index_type, .. } => {
                    if let Some(index_buffer) = &index_buffer {
                        pass.set_index_buffer(index_buffer.slice(..), index_format(index_type));
                    }
                    pass.draw_indexed(bounds, 0, 0..1);
                }
            }
        }
        self.queue.submit(Some(encoder.finish()));

        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(GpuError::Backend(error.to_string())),
            None => Ok(()),
        }
    }
}

/// Vertex or index range a draw covers; indexed offsets are in bytes
fn draw_bounds(range: DrawRange) -> GpuResult<Range<u32>> {
    let (first, count) = match range {
        DrawRange::Arrays { first, count } => (first, count),
        DrawRange::Elements {
            count,
            index_type,
            offset,
        } => {
            let first = u32::try_from(offset / index_type.size_in_bytes())
                .map_err(|_| GpuError::Backend(format!("index offset of {offset} bytes is out of range")))?;
            (first, count)
        }
    };
    let end = first
        .checked_add(count)
        .ok_or_else(|| GpuError::Backend(format!("draw of {count} from {first} overflows")))?;
    Ok(first..end)
}

fn topology(mode: PrimitiveMode) -> wgpu::PrimitiveTopology {
    match mode {
        PrimitiveMode::Points => wgpu::PrimitiveTopology::PointList,
        PrimitiveMode::Lines => wgpu::PrimitiveTopology::LineList,
        PrimitiveMode::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        PrimitiveMode::Triangles => wgpu::PrimitiveTopology::TriangleList,
        PrimitiveMode::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}

fn index_format(index_type: IndexType) -> wgpu::IndexFormat {
    match index_type {
        IndexType::UnsignedShort => wgpu::IndexFormat::Uint16,
        IndexType::UnsignedInt => wgpu::IndexFormat::Uint32,
    }
}

/// Vertex format for an attribute layout, if wgpu has one
pub fn vertex_format(layout: &AttributeLayout) -> GpuResult<wgpu::VertexFormat> {
    use wgpu::VertexFormat as F;
    use ComponentType as C;

    let format = match (layout.component_type, layout.components, layout.normalized) {
        (C::Float, 1, _) => F::Float32,
        (C::Float, 2, _) => F::Float32x2,
        (C::Float, 3, _) => F::Float32x3,
        (C::Float, 4, _) => F::Float32x4,
        (C::Int, 1, false) => F::Sint32,
        (C::Int, 2, false) => F::Sint32x2,
        (C::Int, 3, false) => F::Sint32x3,
        (C::Int, 4, false) => F::Sint32x4,
        (C::UnsignedInt, 1, false) => F::Uint32,
        (C::UnsignedInt, 2, false) => F::Uint32x2,
        (C::UnsignedInt, 3, false) => F::Uint32x3,
        (C::UnsignedInt, 4, false) => F::Uint32x4,
        (C::UnsignedByte, 2, true) => F::Unorm8x2,
        (C::UnsignedByte, 4, true) => F::Unorm8x4,
        (C::UnsignedByte, 2, false) => F::Uint8x2,
        (C::UnsignedByte, 4, false) => F::Uint8x4,
        (C::Byte, 2, true) => F::Snorm8x2,
        (C::Byte, 4, true) => F::Snorm8x4,
        (C::Byte, 2, false) => F::Sint8x2,
        (C::Byte, 4, false) => F::Sint8x4,
        (C::UnsignedShort, 2, true) => F::Unorm16x2,
        (C::UnsignedShort, 4, true) => F::Unorm16x4,
        (C::UnsignedShort, 2, false) => F::Uint16x2,
        (C::UnsignedShort, 4, false) => F::Uint16x4,
        (C::Short, 2, true) => F::Snorm16x2,
        (C::Short, 4, true) => F::Snorm16x4,
        (C::Short, 2, false) => F::Sint16x2,
        (C::Short, 4, false) => F::Sint16x4,
        (component_type, components, normalized) => {
            return Err(GpuError::Unsupported(format!(
                "vertex format {components} x {component_type:?} (normalized: {normalized})"
            )))
        }
    };
    Ok(format)
}

impl GpuContext for WgpuContext {
    fn clip_depth(&self) -> ClipDepth {
        ClipDepth::ZeroToOne
    }

    fn enable(&mut self, capability: Capability) {
        match capability {
            Capability::DepthTest => self.depth_test = true,
            Capability::CullFace => self.cull_enabled = true,
        }
    }

    fn disable(&mut self, capability: Capability) {
        match capability {
            Capability::DepthTest => self.depth_test = false,
            Capability::CullFace => self.cull_enabled = false,
        }
    }

    fn cull_face(&mut self, face: CullFace) {
        self.cull_face = face;
    }

    fn front_face(&mut self, winding: FrontFace) {
        self.front_face = winding;
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.viewport = (x, y, width, height);
    }

    fn clear(&mut self, rgba: [f32; 4]) -> GpuResult<()> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Clear Encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.color_target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: rgba[0] as f64,
                            g: rgba[1] as f64,
                            b: rgba[2] as f64,
                            a: rgba[3] as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_target.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    fn create_buffer(&mut self) -> GpuResult<BufferId> {
        let id = BufferId(self.allocate_id());
        self.buffers.insert(id, None);
        Ok(id)
    }

    fn bind_buffer(&mut self, target: BufferKind, buffer: Option<BufferId>) {
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
    }

    fn buffer_data(&mut self, target: BufferKind, data: &[u8], usage: BufferUsage) -> GpuResult<()> {
        let id = self.bound(target).ok_or(GpuError::NothingBound(target.name()))?;
        if !self.buffers.contains_key(&id) {
            return Err(GpuError::UnknownHandle {
                kind: "buffer",
                id: id.raw(),
            });
        }
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} buffer {} ({usage:?})", target.name(), id.raw())),
            contents: data,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        });
        if let Some(Some(previous)) = self.buffers.insert(id, Some(buffer)) {
            previous.destroy();
        }
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        if let Some(Some(storage)) = self.buffers.remove(&buffer) {
            storage.destroy();
        }
        if self.bound_vertex_buffer == Some(buffer) {
            self.bound_vertex_buffer = None;
        }
        if self.bound_index_buffer == Some(buffer) {
            self.bound_index_buffer = None;
        }
    }

    fn create_shader(&mut self, stage: ShaderStage) -> GpuResult<ShaderId> {
        let id = ShaderId(self.allocate_id());
        self.shaders.insert(id, Shader { stage, compiled: None });
        Ok(id)
    }

    fn compile_shader(&mut self, shader: ShaderId, source: &str) -> Result<(), String> {
        let stage = self
            .shaders
            .get(&shader)
            .map(|s| s.stage)
            .ok_or_else(|| format!("unknown shader {}", shader.raw()))?;

        let label = format!("{} shader {}", stage.name(), shader.raw());
        let module = self.validated(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&label),
                source: wgpu::ShaderSource::Wgsl(Cow::Owned(source.to_string())),
            })
        })?;

        let interface = ShaderInterface::reflect(&strip_comments(source))?;
        let entry = match stage {
            ShaderStage::Vertex => interface.vertex_entry.clone(),
            ShaderStage::Fragment => interface.fragment_entry.clone(),
        }
        .ok_or_else(|| format!("{label} has no @{} entry point", stage.name()))?;

        if let Some(state) = self.shaders.get_mut(&shader) {
            state.compiled = Some(CompiledShader {
                module,
                entry,
                interface,
            });
        }
        Ok(())
    }

    fn delete_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
    }

    fn create_program(&mut self) -> GpuResult<ProgramId> {
        let id = ProgramId(self.allocate_id());
        self.programs.insert(
            id,
            Program {
                shaders: Vec::new(),
                linked: None,
            },
        );
        Ok(id)
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) {
        if let Some(state) = self.programs.get_mut(&program) {
            state.shaders.push(shader);
        }
    }

    fn link_program(&mut self, program: ProgramId) -> Result<(), String> {
        let shader_ids = self
            .programs
            .get(&program)
            .map(|p| p.shaders.clone())
            .ok_or_else(|| format!("unknown program {}", program.raw()))?;

        let mut vertex = None;
        let mut fragment = None;
        for id in shader_ids {
            let shader = self
                .shaders
                .get(&id)
                .ok_or_else(|| format!("attached shader {} was deleted", id.raw()))?;
            let compiled = shader
                .compiled
                .as_ref()
                .ok_or_else(|| format!("{} shader {} is not compiled", shader.stage.name(), id.raw()))?;
            match shader.stage {
                ShaderStage::Vertex => vertex = Some(compiled),
                ShaderStage::Fragment => fragment = Some(compiled),
            }
        }
        let vertex = vertex.ok_or("link error: missing vertex shader")?;
        let fragment = fragment.ok_or("link error: missing fragment shader")?;

        let vertex_block = uniform_layout(&vertex.interface)?;
        let fragment_block = uniform_layout(&fragment.interface)?;
        let layout = match (vertex_block, fragment_block) {
            (Some(a), Some(b)) if a != b => {
                return Err("link error: uniform block differs between stages".to_string());
            }
            (Some(a), _) => Some(a),
            (None, b) => b,
        };

        let label = format!("Program {}", program.raw());
        let (bind_group_layouts, uniforms) = match layout {
            Some(layout) => {
                let bind_group_layout = self.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(&label),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    }],
                });
                let block = UniformBlock::new(&self.device, &bind_group_layout, layout, &label);
                (vec![bind_group_layout], Some(block))
            }
            None => (Vec::new(), None),
        };
        let layout_refs: Vec<&wgpu::BindGroupLayout> = bind_group_layouts.iter().collect();
        let pipeline_layout = self.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&label),
            bind_group_layouts: &layout_refs,
            push_constant_ranges: &[],
        });

        let linked = LinkedProgram {
            vertex_module: vertex.module.clone(),
            vertex_entry: vertex.entry.clone(),
            fragment_module: fragment.module.clone(),
            fragment_entry: fragment.entry.clone(),
            inputs: vertex.interface.vertex_inputs.clone(),
            pipeline_layout,
            uniforms,
        };
        if let Some(state) = self.programs.get_mut(&program) {
            state.linked = Some(linked);
        }
        self.pipelines.retain(|key, _| key.program != program);
        Ok(())
    }

    fn use_program(&mut self, program: Option<ProgramId>) {
        self.current_program = program;
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        self.pipelines.retain(|key, _| key.program != program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> Option<u32> {
        let linked = self.programs.get(&program)?.linked.as_ref()?;
        linked
            .inputs
            .iter()
            .find(|input| input.name == name)
            .map(|input| input.location)
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformLocation> {
        let linked = self.programs.get(&program)?.linked.as_ref()?;
        let index = linked.uniforms.as_ref()?.layout().index_of(name)?;
        Some(UniformLocation {
            program,
            index: index as u32,
        })
    }

    fn set_uniform(&mut self, location: UniformLocation, value: &UniformValue) {
        if self.current_program != Some(location.program) {
            log::warn!(
                "Uniform write for program {} while another program is in use",
                location.program.raw()
            );
            return;
        }
        let Some(uniforms) = self
            .programs
            .get_mut(&location.program)
            .and_then(|p| p.linked.as_mut())
            .and_then(|l| l.uniforms.as_mut())
        else {
            log::warn!("Program {} has no uniform block", location.program.raw());
            return;
        };
        if let Err(message) = uniforms.write(location.index as usize, value) {
            log::warn!("{message}");
        }
    }

    fn create_vertex_array(&mut self) -> GpuResult<VertexArrayId> {
        let id = VertexArrayId(self.allocate_id());
        self.vertex_arrays.insert(id, VertexArray::default());
        Ok(id)
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayId>) {
        self.bound_vertex_array = vertex_array;
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.vertex_arrays.remove(&vertex_array);
        self.pipelines.retain(|key, _| key.vertex_array != vertex_array);
        if self.bound_vertex_array == Some(vertex_array) {
            self.bound_vertex_array = None;
        }
    }

    fn enable_vertex_attrib(&mut self, location: u32) {
        if let Some(vao) = self.bound_vertex_array {
            if let Some(state) = self.vertex_arrays.get_mut(&vao) {
                state.enabled.insert(location);
            }
            self.pipelines.retain(|key, _| key.vertex_array != vao);
        }
    }

    fn vertex_attrib_pointer(&mut self, location: u32, layout: AttributeLayout) -> GpuResult<()> {
        vertex_format(&layout)?;
        let buffer = self
            .bound_vertex_buffer
            .ok_or(GpuError::NothingBound("vertex buffer"))?;
        let vao = self
            .bound_vertex_array
            .ok_or(GpuError::NothingBound("vertex array"))?;
        let state = self.vertex_arrays.get_mut(&vao).ok_or(GpuError::UnknownHandle {
            kind: "vertex array",
            id: vao.raw(),
        })?;
        state.attributes.insert(location, (buffer, layout));
        self.pipelines.retain(|key, _| key.vertex_array != vao);
        Ok(())
    }

    fn draw_arrays(&mut self, mode: PrimitiveMode, first: u32, count: u32) -> GpuResult<()> {
        self.submit_draw(mode, DrawRange::Arrays { first, count })
    }

    fn draw_elements(
        &mut self,
        mode: PrimitiveMode,
        count: u32,
        index_type: IndexType,
        offset: usize,
    ) -> GpuResult<()> {
        self.submit_draw(
            mode,
            DrawRange::Elements {
                count,
                index_type,
                offset,
            },
        )
    }
}

fn uniform_layout(interface: &ShaderInterface) -> Result<Option<UniformLayout>, String> {
    match interface.uniform_struct() {
        Some(block) => UniformLayout::from_struct(block, &interface.structs).map(Some),
        None => Ok(None),
    }
}

/// Named offscreen surfaces, each backed by its own wgpu device
pub struct HeadlessSurfaces {
    surfaces: HashMap<String, (u32, u32)>,
    backends: wgpu::Backends,
    force_fallback_adapter: bool,
}

impl Default for HeadlessSurfaces {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessSurfaces {
    pub fn new() -> Self {
        Self {
            surfaces: HashMap::new(),
            backends: wgpu::Backends::all(),
            force_fallback_adapter: false,
        }
    }

    pub fn with_surface(mut self, name: &str, width: u32, height: u32) -> Self {
        self.surfaces.insert(name.to_string(), (width, height));
        self
    }

    pub fn with_backends(mut self, backends: wgpu::Backends) -> Self {
        self.backends = backends;
        self
    }

    /// Prefer a software adapter, for machines without a GPU
    pub fn with_fallback_adapter(mut self, force: bool) -> Self {
        self.force_fallback_adapter = force;
        self
    }
}

impl SurfaceProvider for HeadlessSurfaces {
    type Context = WgpuContext;

    fn acquire(&mut self, surface: &str) -> Result<AcquiredSurface<WgpuContext>, AcquireError> {
        let (width, height) = *self
            .surfaces
            .get(surface)
            .ok_or_else(|| AcquireError::SurfaceNotFound(surface.to_string()))?;
        let context = pollster::block_on(WgpuContext::headless(
            self.backends,
            self.force_fallback_adapter,
            width,
            height,
        ))?;
        Ok(AcquiredSurface {
            context,
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(component_type: ComponentType, components: u32, normalized: bool) -> AttributeLayout {
        AttributeLayout {
            components,
            component_type,
            normalized,
            stride: 0,
            offset: 0,
        }
    }

    #[test]
    fn test_vertex_formats() {
        assert_eq!(
            vertex_format(&layout(ComponentType::Float, 3, false)).unwrap(),
            wgpu::VertexFormat::Float32x3
        );
        assert_eq!(
            vertex_format(&layout(ComponentType::UnsignedByte, 4, true)).unwrap(),
            wgpu::VertexFormat::Unorm8x4
        );
        assert!(matches!(
            vertex_format(&layout(ComponentType::UnsignedByte, 3, true)),
            Err(GpuError::Unsupported(_))
        ));
    }

    #[test]
    fn test_draw_bounds() {
        assert_eq!(draw_bounds(DrawRange::Arrays { first: 2, count: 3 }).unwrap(), 2..5);
        let indexed = DrawRange::Elements {
            count: 6,
            index_type: IndexType::UnsignedShort,
            offset: 12,
        };
        assert_eq!(draw_bounds(indexed).unwrap(), 6..12);

        assert!(matches!(
            draw_bounds(DrawRange::Arrays { first: u32::MAX, count: 3 }),
            Err(GpuError::Backend(_))
        ));
        let far = DrawRange::Elements {
            count: 3,
            index_type: IndexType::UnsignedShort,
            offset: usize::MAX,
        };
        assert!(matches!(draw_bounds(far), Err(GpuError::Backend(_))));
    }

    #[test]
    fn test_unknown_surface_fails_before_touching_the_gpu() {
        let mut surfaces = HeadlessSurfaces::new().with_surface("offscreen", 64, 64);
        assert!(matches!(
            surfaces.acquire("glCanvas"),
            Err(AcquireError::SurfaceNotFound(_))
        ));
    }
}
