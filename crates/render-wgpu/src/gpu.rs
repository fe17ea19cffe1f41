use std::collections::BTreeMap;
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use groundwork_render::{
    GraphicsBackend, MeshHandle, RenderError, ShaderHandle, Topology, VertexFormat,
};
use wgpu::util::DeviceExt;

use crate::shaders;

/// Uniform name accepted by every shader this backend creates.
pub const MVP_UNIFORM: &str = "mvp";

const TOPOLOGIES: [Topology; 3] = [
    Topology::TriangleList,
    Topology::LineList,
    Topology::PointList,
];

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    mvp: [[f32; 4]; 4],
    color: [f32; 4],
}

const UNIFORM_SIZE: u64 = std::mem::size_of::<Uniforms>() as u64;

/// Round `size` up to the next multiple of `alignment`.
pub(crate) fn align_to(size: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return size;
    }
    size.div_ceil(alignment) * alignment
}

fn primitive_topology(topology: Topology) -> wgpu::PrimitiveTopology {
    match topology {
        Topology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
        Topology::LineList => wgpu::PrimitiveTopology::LineList,
        Topology::PointList => wgpu::PrimitiveTopology::PointList,
    }
}

struct GpuMesh {
    buffer: wgpu::Buffer,
    vertex_count: u32,
    topology: Topology,
}

struct GpuShader {
    pipelines: Vec<(Topology, wgpu::RenderPipeline)>,
    color: [f32; 4],
    mvp: Mat4,
}

impl GpuShader {
    fn pipeline(&self, topology: Topology) -> Option<&wgpu::RenderPipeline> {
        self.pipelines
            .iter()
            .find(|(t, _)| *t == topology)
            .map(|(_, p)| p)
    }
}

struct QueuedDraw {
    mesh: MeshHandle,
    shader: ShaderHandle,
    uniforms: Uniforms,
}

/// [`GraphicsBackend`] on top of wgpu.
///
/// Meshes become vertex buffers. Draws are queued during the frame and
/// submitted by [`WgpuBackend::render`], each reading its own slot of a
/// dynamic-offset uniform buffer so per-draw `mvp` values survive until
/// submission.
pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    surface_format: wgpu::TextureFormat,
    pipeline_layout: wgpu::PipelineLayout,
    shader_module: wgpu::ShaderModule,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_stride: u64,
    max_draws: usize,
    meshes: BTreeMap<MeshHandle, GpuMesh>,
    shaders: BTreeMap<ShaderHandle, GpuShader>,
    queued: Vec<QueuedDraw>,
    next_mesh: u32,
    next_shader: u32,
    pub clear_color: wgpu::Color,
}

impl WgpuBackend {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        surface_format: wgpu::TextureFormat,
        max_draws: usize,
    ) -> Self {
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let uniform_stride = align_to(UNIFORM_SIZE, alignment);
        let max_draws = max_draws.max(1);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ground_uniforms"),
            size: uniform_stride * max_draws as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ground_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(UNIFORM_SIZE),
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ground_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &uniform_buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(UNIFORM_SIZE),
                }),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ground_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ground_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::GROUND_SHADER.into()),
        });

        tracing::debug!(uniform_stride, max_draws, "wgpu backend created");

        Self {
            device,
            queue,
            surface_format,
            pipeline_layout,
            shader_module,
            uniform_buffer,
            uniform_bind_group,
            uniform_stride,
            max_draws,
            meshes: BTreeMap::new(),
            shaders: BTreeMap::new(),
            queued: Vec::new(),
            next_mesh: 0,
            next_shader: 0,
            clear_color: wgpu::Color {
                r: 0.05,
                g: 0.07,
                b: 0.12,
                a: 1.0,
            },
        }
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Draws waiting for the next [`WgpuBackend::render`].
    pub fn queued_draws(&self) -> usize {
        self.queued.len()
    }

    /// Drop queued draws without submitting them, e.g. when a frame is skipped.
    pub fn discard_queued(&mut self) {
        self.queued.clear();
    }

    /// Create a solid-color shader with a single `mvp` uniform.
    pub fn create_ground_shader(&mut self, color: [f32; 4]) -> ShaderHandle {
        let pipelines = TOPOLOGIES
            .iter()
            .map(|&t| (t, self.create_pipeline(t)))
            .collect();
        let handle = ShaderHandle(self.next_shader);
        self.next_shader += 1;
        self.shaders.insert(
            handle,
            GpuShader {
                pipelines,
                color,
                mvp: Mat4::IDENTITY,
            },
        );
        handle
    }

    fn create_pipeline(&self, topology: Topology) -> wgpu::RenderPipeline {
        let stride = VertexFormat::position_2d().stride();
        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("ground_pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.shader_module,
                    entry_point: Some("vs_ground"),
                    compilation_options: Default::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: stride,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x2],
                    }],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &self.shader_module,
                    entry_point: Some("fs_ground"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.surface_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: primitive_topology(topology),
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: Default::default(),
                multiview: None,
                cache: None,
            })
    }

    /// Submit every queued draw into `view`, clearing it first.
    /// Returns the number of draws submitted.
    pub fn render(&mut self, view: &wgpu::TextureView) -> usize {
        let draws = std::mem::take(&mut self.queued);

        for (i, draw) in draws.iter().enumerate() {
            self.queue.write_buffer(
                &self.uniform_buffer,
                i as u64 * self.uniform_stride,
                bytemuck::bytes_of(&draw.uniforms),
            );
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("ground_encoder"),
            });

        let mut submitted = 0;
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ground_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });

            for (i, draw) in draws.iter().enumerate() {
                // Meshes destroyed after being queued are skipped.
                let Some(mesh) = self.meshes.get(&draw.mesh) else {
                    tracing::trace!(mesh = draw.mesh.0, "skipping draw of released mesh");
                    continue;
                };
                let Some(pipeline) = self
                    .shaders
                    .get(&draw.shader)
                    .and_then(|s| s.pipeline(mesh.topology))
                else {
                    continue;
                };
                if mesh.vertex_count == 0 {
                    continue;
                }
                let offset = (i as u64 * self.uniform_stride) as u32;
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
                pass.set_vertex_buffer(0, mesh.buffer.slice(..));
                pass.draw(0..mesh.vertex_count, 0..1);
                submitted += 1;
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        tracing::trace!(submitted, "frame rendered");
        submitted
    }
}

impl GraphicsBackend for WgpuBackend {
    fn create_mesh(
        &mut self,
        format: &VertexFormat,
        topology: Topology,
        vertices: &[[f32; 2]],
    ) -> Result<MeshHandle, RenderError> {
        if format.components() != 2 {
            return Err(RenderError::UnsupportedFormat(format.clone()));
        }
        topology.check_vertex_count(vertices.len())?;

        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("ground_mesh"),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let handle = MeshHandle(self.next_mesh);
        self.next_mesh += 1;
        self.meshes.insert(
            handle,
            GpuMesh {
                buffer,
                vertex_count: vertices.len() as u32,
                topology,
            },
        );
        tracing::trace!(mesh = handle.0, vertices = vertices.len(), "mesh uploaded");
        Ok(handle)
    }

    fn destroy_mesh(&mut self, mesh: MeshHandle) -> Result<(), RenderError> {
        let gpu = self
            .meshes
            .remove(&mesh)
            .ok_or(RenderError::MeshNotFound(mesh))?;
        gpu.buffer.destroy();
        Ok(())
    }

    fn set_uniform(
        &mut self,
        shader: ShaderHandle,
        name: &str,
        value: Mat4,
    ) -> Result<(), RenderError> {
        let entry = self
            .shaders
            .get_mut(&shader)
            .ok_or(RenderError::ShaderNotFound(shader))?;
        if name != MVP_UNIFORM {
            return Err(RenderError::UnknownUniform {
                shader,
                name: name.to_string(),
            });
        }
        entry.mvp = value;
        Ok(())
    }

    fn draw(&mut self, mesh: MeshHandle, shader: ShaderHandle) -> Result<(), RenderError> {
        if !self.meshes.contains_key(&mesh) {
            return Err(RenderError::MeshNotFound(mesh));
        }
        let entry = self
            .shaders
            .get(&shader)
            .ok_or(RenderError::ShaderNotFound(shader))?;
        if self.queued.len() >= self.max_draws {
            return Err(RenderError::FrameCapacity(self.max_draws));
        }
        self.queued.push(QueuedDraw {
            mesh,
            shader,
            uniforms: Uniforms {
                mvp: entry.mvp.to_cols_array_2d(),
                color: entry.color,
            },
        });
        Ok(())
    }
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("surface_format", &self.surface_format)
            .field("meshes", &self.meshes.len())
            .field("shaders", &self.shaders.len())
            .field("queued", &self.queued.len())
            .field("max_draws", &self.max_draws)
            .finish()
    }
}
