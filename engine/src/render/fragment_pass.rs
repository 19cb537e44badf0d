//! Instanced Trixel Fragment Pass
//!
//! Draws every fragment as a textured unit cube scaled by its instance
//! record. The cube's 36 vertices are generated in the shader from
//! `vertex_index`; the only vertex buffer is the per-system instance buffer
//! at slot 0 (locations 1..=5, see [`fragment_instance_layout`]).
//!
//! One GPU buffer per explosion system, created on first draw, re-uploaded
//! only when the system's [`InstanceBuffer`] is dirty, destroyed on
//! [`FragmentRenderer::release_system`].

use std::collections::HashMap;

use super::FragmentRenderer;
use super::instancing::{InstanceBuffer, fragment_instance_layout};
use crate::debris::SystemId;

/// Vertices of the generated unit cube (6 faces, 2 triangles each).
pub const CUBE_VERTEX_COUNT: u32 = 36;

/// Uniforms of the fragment pass (64 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FragmentUniforms {
    /// Combined view-projection matrix
    pub view_proj: [[f32; 4]; 4],
}

const _: () = {
    assert!(
        std::mem::size_of::<FragmentUniforms>() == 64,
        "FragmentUniforms must be exactly 64 bytes"
    );
};

impl Default for FragmentUniforms {
    fn default() -> Self {
        Self {
            view_proj: glam::Mat4::IDENTITY.to_cols_array_2d(),
        }
    }
}

struct SystemBuffer {
    buffer: wgpu::Buffer,
    instance_count: u32,
}

/// wgpu renderer for explosion systems.
pub struct FragmentPass {
    queue: wgpu::Queue,
    device: wgpu::Device,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    buffers: HashMap<SystemId, SystemBuffer>,
    /// Systems queued by `draw_system` since the last `encode`
    frame: Vec<SystemId>,
}

impl FragmentPass {
    /// Create the pass.
    ///
    /// # Arguments
    /// * `atlas` - View of the block texture atlas fragments sample from
    /// * `surface_format` - The format of the render target
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        atlas: &wgpu::TextureView,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Fragment Uniform Buffer"),
            size: std::mem::size_of::<FragmentUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&uniform_buffer, 0, bytemuck::bytes_of(&FragmentUniforms::default()));

        // Pixel-art atlas: no filtering between trixels.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Fragment Atlas Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Fragment Bind Group Layout"),
            entries: &[
                // Binding 0: view-projection uniforms
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // Binding 1: atlas texture
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Binding 2: atlas sampler
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Fragment Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(atlas),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let shader_source = include_str!("../../../shaders/trixel_fragment.wgsl");
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Trixel Fragment Shader"),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Fragment Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Fragment Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader_module,
                entry_point: Some("vs_fragment"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[fragment_instance_layout()],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: wgpu::TextureFormat::Depth32Float,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader_module,
                entry_point: Some("fs_fragment"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    // Fading systems blend out over the scene
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
            cache: None,
        });

        Self {
            queue: queue.clone(),
            device: device.clone(),
            pipeline,
            uniform_buffer,
            bind_group,
            buffers: HashMap::new(),
            frame: Vec::new(),
        }
    }

    /// Upload the camera matrix for the next frame.
    pub fn update_camera(&self, view_proj: glam::Mat4) {
        let uniforms = FragmentUniforms {
            view_proj: view_proj.to_cols_array_2d(),
        };
        self.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
    }

    /// Record draw calls for every system queued since the last encode.
    pub fn encode(&mut self, render_pass: &mut wgpu::RenderPass<'_>) {
        if self.frame.is_empty() {
            return;
        }
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        for id in self.frame.drain(..) {
            let Some(system) = self.buffers.get(&id) else {
                continue;
            };
            render_pass.set_vertex_buffer(0, system.buffer.slice(..));
            render_pass.draw(0..CUBE_VERTEX_COUNT, 0..system.instance_count);
        }
    }

    /// Number of systems holding a GPU buffer.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }
}

impl FragmentRenderer for FragmentPass {
    fn draw_system(&mut self, id: SystemId, instances: &InstanceBuffer) {
        if instances.is_empty() {
            return;
        }
        let device = &self.device;
        let mut created = false;
        let system = self.buffers.entry(id).or_insert_with(|| {
            created = true;
            SystemBuffer {
                buffer: device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("Fragment Instance Buffer"),
                    size: instances.as_bytes().len() as u64,
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }),
                instance_count: instances.len() as u32,
            }
        });
        if created || instances.is_dirty() {
            self.queue.write_buffer(&system.buffer, 0, instances.as_bytes());
        }
        self.frame.push(id);
    }

    fn release_system(&mut self, id: SystemId) {
        if let Some(system) = self.buffers.remove(&id) {
            system.buffer.destroy();
        }
        self.frame.retain(|queued| *queued != id);
    }
}
